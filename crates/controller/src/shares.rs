//! Share lifecycle: create, delete, expand and snapshot.

use crate::{
  account::{AccountConstraint, AccountResolver, AccountSelection, NetworkRules, ResolvedAccount},
  cloud::{AccountRef, Cloud, CloudError, CloudResult, Share, ShareOptions, ShareSnapshot, ShareTarget, Tags},
  copy::{CopyOrchestrator, CopyRequest, ShareLocation},
  credentials,
  error::{Error, Result},
  lock::{OperationGuard, OperationLocks},
  parameters::{
    is_premium_sku, Protocol, StorageClassParameters, ValidationContext, DEFAULT_SECRET_NAMESPACE,
  },
  vhd,
  volume_id::{SnapshotId, VolumeId},
};
use azurefile_csi_proto::controller::{
  AccessMode, CapacityRange, ControllerExpandVolumeRequest, ControllerExpandVolumeResponse,
  CreateSnapshotRequest, CreateVolumeRequest, DeleteSnapshotRequest, DeleteVolumeRequest,
  Snapshot, ValidateVolumeCapabilitiesRequest, Volume, VolumeCapability, VolumeContentSource,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::{collections::HashMap, convert::TryFrom, fmt, str::FromStr, time::SystemTime};
use tracing::{debug, info, warn};

pub const GIB: u64 = 1 << 30;
pub const DEFAULT_QUOTA_GIB: u32 = 100;
pub const MINIMUM_PREMIUM_QUOTA_GIB: u32 = 100;
const MAX_SHARE_NAME_LEN: usize = 63;
const DEFAULT_SHARE_NAME_PREFIX: &str = "pvc-";
const PREMIUM_SKU: &str = "Premium_LRS";
const SNAPSHOT_NAME_METADATA: &str = "snapshotname";

/// What to do when a share does not fit its account any more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitFallback {
  /// Tag the full account `skip-matching` and pick another one.
  Disjoint,
  /// Retry on the same account.
  Same,
}

impl FromStr for LimitFallback {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s {
      "disjoint" => Ok(LimitFallback::Disjoint),
      "same" => Ok(LimitFallback::Same),
      other => Err(format!(
        "invalid account limit fallback {:?}, expected one of: disjoint, same",
        other
      )),
    }
  }
}

impl fmt::Display for LimitFallback {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      LimitFallback::Disjoint => "disjoint",
      LimitFallback::Same => "same",
    })
  }
}

/// Driver-wide defaults that requests fall back to.
#[derive(Debug, Clone)]
pub struct Settings {
  pub subscription_id: String,
  pub resource_group: String,
  pub location: Option<String>,
  pub endpoint_suffix: String,
  pub vnet_resource_group: Option<String>,
  pub vnet_name: Option<String>,
  pub subnet_name: Option<String>,
  pub enable_vhd: bool,
  pub account_limit_retries: u32,
  pub account_limit_fallback: LimitFallback,
}

impl Default for Settings {
  fn default() -> Self {
    Settings {
      subscription_id: String::new(),
      resource_group: String::new(),
      location: None,
      endpoint_suffix: "core.windows.net".to_owned(),
      vnet_resource_group: None,
      vnet_name: None,
      subnet_name: None,
      enable_vhd: false,
      account_limit_retries: 1,
      account_limit_fallback: LimitFallback::Disjoint,
    }
  }
}

/// Smallest whole number of GiB holding `bytes`. Sizes whose quota does not
/// fit a share quota are rejected rather than truncated.
pub fn bytes_to_gib(bytes: u64) -> Result<u32> {
  let gib = bytes / GIB + u64::from(bytes % GIB != 0);
  u32::try_from(gib).map_err(|_| {
    Error::validation(format!(
      "requested capacity {} bytes exceeds the largest share quota of {} GiB",
      bytes,
      u32::MAX
    ))
  })
}

fn requested_gib(range: Option<&CapacityRange>) -> Result<u32> {
  match range.map(CapacityRange::required_bytes) {
    Some(bytes) if bytes > 0 => bytes_to_gib(bytes),
    _ => Ok(DEFAULT_QUOTA_GIB),
  }
}

fn is_supported_mode(mode: AccessMode) -> bool {
  !matches!(mode, AccessMode::Unknown)
}

/// Share name for a volume: lower case, alphanumerics and hyphens.
fn share_name_for(volume_name: &str, prefix: Option<&str>) -> String {
  let base = match prefix {
    Some(prefix) => format!(
      "{}-{}",
      prefix,
      volume_name
        .strip_prefix(DEFAULT_SHARE_NAME_PREFIX)
        .unwrap_or(volume_name)
    ),
    None => volume_name.to_owned(),
  };

  let mut name: String = base
    .to_lowercase()
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
    .collect();
  name.truncate(MAX_SHARE_NAME_LEN);
  name.trim_end_matches('-').to_owned()
}

/// How a share is reached: through the management API in the driver's
/// subscription, or through the data plane with an account key. Keys come
/// from request secrets or from the secret a volume id names, so volumes in
/// other subscriptions stay reachable.
#[derive(Debug)]
enum ShareAccess {
  Management { account: AccountRef, share: String },
  SharedKey(ShareTarget),
}

impl ShareAccess {
  async fn get(&self, cloud: &Cloud) -> CloudResult<Share> {
    match self {
      ShareAccess::Management { account, share } => cloud.shares.get_share(account, share).await,
      ShareAccess::SharedKey(target) => cloud.files.share_properties(target).await,
    }
  }

  async fn delete(&self, cloud: &Cloud) -> CloudResult<()> {
    match self {
      ShareAccess::Management { account, share } => cloud.shares.delete_share(account, share).await,
      ShareAccess::SharedKey(target) => cloud.files.remove_share(target).await,
    }
  }

  async fn resize(&self, cloud: &Cloud, quota_gib: u32) -> CloudResult<u32> {
    match self {
      ShareAccess::Management { account, share } => {
        cloud.shares.resize_share(account, share, quota_gib).await
      }
      ShareAccess::SharedKey(target) => cloud.files.set_share_quota(target, quota_gib).await,
    }
  }

  async fn snapshots(&self, cloud: &Cloud) -> CloudResult<Vec<ShareSnapshot>> {
    match self {
      ShareAccess::Management { account, share } => cloud.shares.list_snapshots(account, share).await,
      ShareAccess::SharedKey(target) => cloud.files.share_snapshots(target).await,
    }
  }

  async fn snapshot(&self, cloud: &Cloud, metadata: &Tags) -> CloudResult<ShareSnapshot> {
    match self {
      ShareAccess::Management { account, share } => {
        cloud.shares.create_snapshot(account, share, metadata).await
      }
      ShareAccess::SharedKey(target) => cloud.files.snapshot_share(target, metadata).await,
    }
  }

  async fn delete_snapshot(&self, cloud: &Cloud, tag: &str) -> CloudResult<()> {
    match self {
      ShareAccess::Management { account, share } => {
        cloud.shares.delete_snapshot(account, share, tag).await
      }
      ShareAccess::SharedKey(target) => cloud.files.remove_share_snapshot(target, tag).await,
    }
  }
}

pub struct ShareManager {
  cloud: Cloud,
  resolver: AccountResolver,
  locks: OperationLocks,
  copier: CopyOrchestrator,
  settings: Settings,
}

impl ShareManager {
  pub fn new(
    cloud: Cloud,
    resolver: AccountResolver,
    locks: OperationLocks,
    copier: CopyOrchestrator,
    settings: Settings,
  ) -> Self {
    ShareManager {
      cloud,
      resolver,
      locks,
      copier,
      settings,
    }
  }

  #[inline]
  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  fn lock(&self, key: &str) -> Result<OperationGuard> {
    self
      .locks
      .lock(key)
      .ok_or_else(|| Error::Pending(key.to_owned()))
  }

  fn account_ref(&self, id: &VolumeId) -> AccountRef {
    let resource_group = if id.resource_group.is_empty() {
      &self.settings.resource_group
    } else {
      &id.resource_group
    };

    AccountRef::new(&self.settings.subscription_id, resource_group, &id.account)
  }

  /// Account key from the request secrets, else from the secret the volume id
  /// names. `None` when neither carries one.
  async fn secret_key(&self, id: &VolumeId, secrets: &HashMap<String, String>) -> Result<Option<String>> {
    if let Ok((name, key)) = credentials::account_key_from_secrets(secrets) {
      match name {
        Some(name) if name != id.account => {
          debug!(account = %id.account, secret_account = %name, "request secrets belong to another account");
        }
        _ => return Ok(Some(key)),
      }
    }

    let name = match id.secret_name.as_deref() {
      Some(name) => name,
      None => return Ok(None),
    };
    let store = match self.cloud.secrets.as_deref() {
      Some(store) => store,
      None => {
        debug!(secret = name, "no secret store configured, using the management api");
        return Ok(None);
      }
    };
    let namespace = id
      .secret_namespace
      .as_deref()
      .unwrap_or(DEFAULT_SECRET_NAMESPACE);

    credentials::account_key_from_store(store, namespace, name)
      .await
      .map(Some)
      .map_err(|err| {
        Error::not_found(format!(
          "could not get account key from secret({}): {}",
          name, err
        ))
      })
  }

  async fn share_access(&self, id: &VolumeId, secrets: &HashMap<String, String>) -> Result<ShareAccess> {
    Ok(match self.secret_key(id, secrets).await? {
      Some(key) => ShareAccess::SharedKey(ShareTarget {
        account: id.account.clone(),
        account_key: key,
        endpoint_suffix: self.settings.endpoint_suffix.clone(),
        share: id.share.clone(),
      }),
      None => ShareAccess::Management {
        account: self.account_ref(id),
        share: id.share.clone(),
      },
    })
  }

  fn check_capabilities(&self, capabilities: &[VolumeCapability]) -> Result<()> {
    if capabilities.is_empty() {
      return Err(Error::validation(
        "CreateVolume Volume capabilities not valid: CreateVolume Volume capabilities must be provided",
      ));
    }

    for capability in capabilities {
      if !is_supported_mode(capability.access_mode()) {
        return Err(Error::validation(format!(
          "CreateVolume Volume capabilities not valid: driver does not support access mode: {}",
          capability.access_mode()
        )));
      }

      if capability.is_block() && !self.settings.enable_vhd {
        return Err(Error::validation(
          "CreateVolume Volume capabilities not valid: driver does not support block volumes",
        ));
      }
    }

    Ok(())
  }

  fn network_rules(&self, params: &StorageClassParameters, resource_group: &str) -> Result<NetworkRules> {
    let vnet_resource_group = params
      .vnet_resource_group
      .clone()
      .or_else(|| self.settings.vnet_resource_group.clone())
      .unwrap_or_else(|| resource_group.to_owned());
    let vnet = params
      .vnet_name
      .clone()
      .or_else(|| self.settings.vnet_name.clone());
    let mut subnets = params.subnets();
    if subnets.is_empty() {
      subnets.extend(
        self
          .settings
          .subnet_name
          .iter()
          .flat_map(|s| s.split(','))
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .map(str::to_owned),
      );
    }

    if params.use_private_endpoint() {
      return match (vnet, subnets.into_iter().next()) {
        (Some(vnet), Some(subnet)) => Ok(NetworkRules::PrivateEndpoint {
          resource_group: vnet_resource_group,
          vnet,
          subnet,
        }),
        _ => Err(Error::validation(
          "vnetName and subnetName must be provided for private endpoint",
        )),
      };
    }

    let requested = params.vnet_name.is_some()
      || params.subnet_name.is_some()
      || params.protocol() == Protocol::Nfs;
    match (requested, vnet) {
      (true, Some(vnet)) if !subnets.is_empty() => Ok(NetworkRules::ServiceEndpoints {
        resource_group: vnet_resource_group,
        vnet,
        subnets,
      }),
      (true, _) => {
        debug!("no virtual network configured, skipping network rules");
        Ok(NetworkRules::None)
      }
      _ => Ok(NetworkRules::None),
    }
  }

  /// Quota of an existing share that is big enough, `None` when there is no
  /// such share.
  async fn existing_share(&self, account: &AccountRef, share: &str, requested: u32) -> Result<Option<u32>> {
    match self.cloud.shares.get_share(account, share).await {
      Ok(existing) => match existing.quota_gib {
        None => Err(Error::backend(
          "FileShareProperties or FileShareProperties.ShareQuota is nil",
        )),
        Some(quota) if quota < requested => Err(Error::Conflict(format!(
          "request file share({}) already exists, but its capacity {} is smaller than {}",
          share, quota, requested
        ))),
        Some(quota) => {
          info!(share, quota, "file share already exists");
          Ok(Some(quota))
        }
      },
      Err(CloudError::NotFound(_)) => Ok(None),
      Err(err) => Err(Error::backend(format!(
        "failed to get file share({}) on account({}): {}",
        share, account.name, err
      ))),
    }
  }

  /// Resolves an account and makes sure the share exists on it, moving to
  /// another account when the first one is full.
  async fn provision_share(
    &self,
    mut constraint: AccountConstraint,
    mut options: ShareOptions,
  ) -> Result<(ResolvedAccount, u32)> {
    let mut attempts = 0;

    loop {
      let resolved = self.resolver.resolve(&constraint).await?;
      if resolved.sku.as_deref().map_or(false, is_premium_sku) {
        options.quota_gib = options.quota_gib.max(MINIMUM_PREMIUM_QUOTA_GIB);
      }

      if let Some(quota) = self
        .existing_share(&resolved.account, &options.name, options.quota_gib)
        .await?
      {
        return Ok((resolved, quota));
      }

      info!(
        share = %options.name,
        account = %resolved.account.name,
        quota = options.quota_gib,
        protocol = %options.protocol,
        "creating file share"
      );
      match self.cloud.shares.create_share(&resolved.account, &options).await {
        Ok(share) => return Ok((resolved, share.quota_gib.unwrap_or(options.quota_gib))),
        Err(err) if err.is_account_limit() && attempts < self.settings.account_limit_retries => {
          attempts += 1;
          warn!(
            account = %resolved.account.name,
            attempt = attempts,
            fallback = %self.settings.account_limit_fallback,
            %err,
            "account limit exceeded"
          );

          if self.settings.account_limit_fallback == LimitFallback::Disjoint {
            self.resolver.mark_skip_matching(&resolved.account).await?;
            if let AccountSelection::Fixed(_) = constraint.selection {
              constraint.selection = AccountSelection::CreateNew;
            }
          }
        }
        Err(err) => {
          return Err(Error::backend(format!(
            "failed to create file share({}) on account({}) type({}) rg({}) location({}) size({}), error: {}",
            options.name,
            resolved.account.name,
            resolved.sku.as_deref().unwrap_or_default(),
            resolved.account.resource_group,
            resolved.location.as_deref().unwrap_or_default(),
            options.quota_gib,
            err
          )))
        }
      }
    }
  }

  async fn copy_content(
    &self,
    source: &VolumeContentSource,
    secrets: &HashMap<String, String>,
    destination: &ShareTarget,
  ) -> Result<()> {
    let (volume, snapshot) = match source {
      VolumeContentSource::Snapshot(id) => {
        let snapshot = SnapshotId::decode(id).map_err(|err| Error::not_found(err.to_string()))?;
        (snapshot.volume(), Some(snapshot.tag))
      }
      VolumeContentSource::Volume(id) => {
        (VolumeId::decode(id).map_err(|err| Error::not_found(err.to_string()))?, None)
      }
    };

    let source_key = match self.secret_key(&volume, secrets).await? {
      Some(key) => key,
      None if volume.account == destination.account => destination.account_key.clone(),
      None => {
        self
          .resolver
          .account_key(&self.account_ref(&volume), false)
          .await?
      }
    };

    let request = CopyRequest {
      source: ShareLocation {
        account: volume.account,
        share: volume.share,
        key: source_key,
      },
      snapshot,
      destination: ShareLocation {
        account: destination.account.clone(),
        share: destination.share.clone(),
        key: destination.account_key.clone(),
      },
      endpoint_suffix: destination.endpoint_suffix.clone(),
    };

    self.copier.copy(&request).await
  }

  async fn create_disk(&self, resolved: &ResolvedAccount, share: &ShareTarget, disk: &str, size: u64) -> Result<()> {
    STANDARD.decode(share.account_key.trim()).map_err(|err| {
      Error::backend(format!(
        "failed to create VHD disk: NewSharedKeyCredential({}) failed with error: {}",
        share.account, err
      ))
    })?;

    vhd::create_disk(self.cloud.files.as_ref(), &share.file(disk), size)
      .await
      .map_err(|err| {
        if err.is_unauthorized() {
          warn!(account = %share.account, "account key rejected, dropping it from the cache");
          self.resolver.forget_key(&resolved.account);
        }
        Error::backend(format!("failed to create VHD disk: {}", err))
      })
  }

  pub async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume> {
    if request.name().is_empty() {
      return Err(Error::validation("CreateVolume Name must be provided"));
    }
    self.check_capabilities(request.volume_capabilities())?;

    let mut params = StorageClassParameters::parse(request.parameters())?;
    params.validate(&ValidationContext {
      enable_vhd: self.settings.enable_vhd,
      subscription_id: &self.settings.subscription_id,
    })?;

    let protocol = params.protocol();
    if let (Protocol::Nfs, Some(source)) = (protocol, request.content_source()) {
      return Err(Error::validation(match source {
        VolumeContentSource::Snapshot(_) => "protocol nfs is not supported for snapshot restore",
        VolumeContentSource::Volume(_) => "protocol nfs is not supported for volume cloning",
      }));
    }

    if protocol == Protocol::Nfs && params.sku.is_none() {
      params.sku = Some(PREMIUM_SKU.to_owned());
    }

    let mut quota = requested_gib(request.capacity_range())?;
    if params.is_premium() {
      quota = quota.max(MINIMUM_PREMIUM_QUOTA_GIB);
    }

    let _guard = self.lock(request.name())?;

    let subscription_id = params
      .subscription_id
      .clone()
      .unwrap_or_else(|| self.settings.subscription_id.clone());
    let resource_group = params
      .resource_group
      .clone()
      .unwrap_or_else(|| self.settings.resource_group.clone());
    let share_name = params
      .share_name
      .clone()
      .unwrap_or_else(|| share_name_for(request.name(), params.share_name_prefix.as_deref()));

    let selection = match (&params.storage_account, params.select_random_matching_account) {
      (Some(account), _) => AccountSelection::Fixed(account.clone()),
      (None, true) => AccountSelection::RandomMatching,
      (None, false) => AccountSelection::CreateNew,
    };

    let constraint = AccountConstraint {
      subscription_id,
      network: self.network_rules(&params, &resource_group)?,
      resource_group,
      location: params.location.clone().or_else(|| self.settings.location.clone()),
      sku: params.sku.clone(),
      kind: None,
      tags: params.tags.clone(),
      match_tags: params.match_tags,
      enable_large_file_shares: params.enable_large_file_shares,
      allow_shared_key_access: params.allow_shared_key_access,
      enable_nfs: protocol == Protocol::Nfs,
      account_quota_gib: params.account_quota,
      requested_gib: quota,
      disable_delete_retention: params.disable_delete_retention_policy,
      latest_key: params.get_latest_account_key,
      selection,
    };

    let options = ShareOptions {
      name: share_name.clone(),
      protocol: protocol.to_string(),
      quota_gib: quota,
      access_tier: params.access_tier.clone(),
      root_squash: params.root_squash.clone(),
      metadata: params.share_metadata(),
    };

    let (resolved, quota) = self.provision_share(constraint, options).await?;
    let target = ShareTarget {
      account: resolved.account.name.clone(),
      account_key: resolved.key.clone(),
      endpoint_suffix: params
        .storage_endpoint_suffix
        .clone()
        .unwrap_or_else(|| self.settings.endpoint_suffix.clone()),
      share: share_name.clone(),
    };

    let disk_name = if params.is_disk() {
      let disk = params
        .disk_name
        .clone()
        .unwrap_or_else(|| format!("{}{}", share_name, vhd::VHD_SUFFIX));
      self
        .create_disk(&resolved, &target, &disk, u64::from(quota) * GIB)
        .await?;
      Some(disk)
    } else {
      None
    };

    let mut secret = (params.secret_name.clone(), None);
    if params.store_account_key {
      let name = credentials::secret_name(params.secret_name.as_deref(), &resolved.account.name);
      let stored = credentials::store_account_key(
        self.cloud.secrets.as_deref(),
        params.secret_namespace(),
        &name,
        &resolved.account.name,
        &resolved.key,
      )
      .await?;
      if !stored.is_empty() {
        secret = (Some(stored), Some(params.secret_namespace().to_owned()));
      }
    } else if params.secret_name.is_some() {
      secret.1 = Some(params.secret_namespace().to_owned());
    }

    if let Some(source) = request.content_source() {
      self.copy_content(source, request.secrets(), &target).await?;
    }

    let id = VolumeId::new(
      &resolved.account.resource_group,
      &resolved.account.name,
      &share_name,
    )
    .with_disk_name(disk_name)
    .with_secret(secret.1, secret.0);

    info!(volume = %id, quota, "volume created");
    Ok(
      Volume::new(id.encode(), u64::from(quota) * GIB)
        .with_context(request.parameters().clone())
        .with_content_source(request.content_source().cloned()),
    )
  }

  pub async fn delete_volume(&self, request: &DeleteVolumeRequest) -> Result<()> {
    let volume_id = request.volume_id();
    if volume_id.is_empty() {
      return Err(Error::validation("Volume ID missing in request"));
    }

    let id = match VolumeId::decode(volume_id) {
      Ok(id) if !id.account.is_empty() && !id.share.is_empty() => id,
      Ok(_) => {
        warn!(volume_id, "volume id without account or share, nothing to delete");
        return Ok(());
      }
      Err(err) => {
        warn!(volume_id, %err, "invalid volume id, nothing to delete");
        return Ok(());
      }
    };

    let _guard = self.lock(volume_id)?;
    let access = self
      .share_access(&id, request.secrets())
      .await
      .map_err(|err| {
        Error::not_found(format!(
          "get account info from({}) failed with error: {}",
          volume_id, err
        ))
      })?;

    info!(share = %id.share, account = %id.account, "deleting file share");
    match access.delete(&self.cloud).await {
      Ok(()) => Ok(()),
      Err(CloudError::NotFound(_)) => {
        info!(share = %id.share, "file share already deleted");
        Ok(())
      }
      Err(err) => Err(Error::backend(format!(
        "DeleteFileShare {} under account({}) rg({}) failed with error: {}",
        id.share,
        id.account,
        self.account_ref(&id).resource_group,
        err
      ))),
    }
  }

  pub async fn expand_volume(
    &self,
    request: &ControllerExpandVolumeRequest,
  ) -> Result<ControllerExpandVolumeResponse> {
    let volume_id = request.volume_id();
    if volume_id.is_empty() {
      return Err(Error::validation("Volume ID missing in request"));
    }

    let id = VolumeId::decode(volume_id).map_err(|err| {
      Error::validation(format!("GetFileShareInfo({}) failed with error: {}", volume_id, err))
    })?;

    if let Some(disk) = &id.disk_name {
      return Err(Error::Unimplemented(format!(
        "vhd disk volume({}, diskName:{}) is not supported on ControllerExpandVolume",
        volume_id, disk
      )));
    }

    let requested = requested_gib(Some(request.capacity_range()))?;
    let _guard = self.lock(volume_id)?;
    let access = self.share_access(&id, request.secrets()).await?;

    let reported = access
      .resize(&self.cloud, requested)
      .await
      .map_err(|err| Error::backend(format!("expand volume error: {}", err)))?;

    let quota = reported.max(requested);
    info!(share = %id.share, quota, "volume expanded");
    Ok(ControllerExpandVolumeResponse::new(
      u64::from(quota) * GIB,
      false,
    ))
  }

  pub async fn create_snapshot(&self, request: &CreateSnapshotRequest) -> Result<Snapshot> {
    if request.name().is_empty() {
      return Err(Error::validation("Snapshot name must be provided"));
    }

    let source_id = request.source_volume_id();
    if source_id.is_empty() {
      return Err(Error::validation("CreateSnapshot Source Volume ID must be provided"));
    }

    let volume = VolumeId::decode(source_id).map_err(|err| {
      Error::backend(format!("GetFileShareInfo({}) failed with error: {}", source_id, err))
    })?;

    let _guard = self.lock(request.name())?;
    let access = self.share_access(&volume, request.secrets()).await?;
    let failed = |err: CloudError| {
      Error::backend(format!(
        "failed to create snapshot from({}) with error: {}",
        source_id, err
      ))
    };

    let existing = access
      .snapshots(&self.cloud)
      .await
      .map_err(failed)?
      .into_iter()
      .find(|s| s.metadata.get(SNAPSHOT_NAME_METADATA).map(String::as_str) == Some(request.name()));

    let snapshot = match existing {
      Some(snapshot) => {
        info!(tag = %snapshot.tag, name = request.name(), "snapshot already exists");
        snapshot
      }
      None => {
        let mut metadata = Tags::new();
        metadata.insert(SNAPSHOT_NAME_METADATA.to_owned(), request.name().to_owned());
        access.snapshot(&self.cloud, &metadata).await.map_err(failed)?
      }
    };

    let quota = access
      .get(&self.cloud)
      .await
      .map_err(failed)?
      .quota_gib
      .unwrap_or_default();

    let id = SnapshotId::new(&volume, &snapshot.tag);
    info!(snapshot = %id, "snapshot created");
    Ok(Snapshot::new(
      id.encode(),
      source_id,
      u64::from(quota) * GIB,
      SystemTime::from(snapshot.created),
    ))
  }

  pub async fn delete_snapshot(&self, request: &DeleteSnapshotRequest) -> Result<()> {
    let snapshot_id = request.snapshot_id();
    if snapshot_id.is_empty() {
      return Err(Error::validation("Snapshot ID must be provided"));
    }

    match VolumeId::decode(snapshot_id) {
      Ok(id) if !id.share.is_empty() => (),
      _ => {
        warn!(snapshot_id, "invalid snapshot id, nothing to delete");
        return Ok(());
      }
    }

    let snapshot = SnapshotId::decode(snapshot_id).map_err(|err| {
      Error::backend(format!(
        "failed to get snapshot name with ({}): {}",
        snapshot_id, err
      ))
    })?;

    let _guard = self.lock(snapshot_id)?;
    let access = self
      .share_access(&snapshot.volume(), request.secrets())
      .await?;

    match access.delete_snapshot(&self.cloud, &snapshot.tag).await {
      Ok(()) => Ok(()),
      Err(CloudError::NotFound(_)) => {
        info!(snapshot_id, "snapshot already deleted");
        Ok(())
      }
      Err(err) => Err(Error::backend(format!(
        "failed to delete snapshot({}): {}",
        snapshot_id, err
      ))),
    }
  }

  /// `None` when every capability is supported, otherwise the reason why not.
  pub async fn validate_capabilities(
    &self,
    request: &ValidateVolumeCapabilitiesRequest,
  ) -> Result<Option<String>> {
    let volume_id = request.volume_id();
    let id = VolumeId::decode(volume_id).map_err(|err| {
      Error::not_found(format!(
        "get account info from({}) failed with error: {}",
        volume_id, err
      ))
    })?;

    let access = self.share_access(&id, request.secrets()).await?;
    match access.get(&self.cloud).await {
      Ok(_) => (),
      Err(CloudError::NotFound(_)) => {
        return Err(Error::not_found(format!(
          "the requested volume({}) does not exist.",
          volume_id
        )))
      }
      Err(err) => {
        return Err(Error::backend(format!(
          "error checking if volume({}) exists: {}",
          volume_id, err
        )))
      }
    }

    for capability in request.volume_capabilities() {
      if !is_supported_mode(capability.access_mode()) {
        return Ok(Some(format!(
          "driver does not support access mode: {}",
          capability.access_mode()
        )));
      }

      if capability.is_block() && id.disk_name.is_none() {
        return Ok(Some("driver does not support block volumes".to_owned()));
      }
    }

    Ok(None)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  #[test_case(0 => Some(0) ; "zero")]
  #[test_case(1 => Some(1) ; "one byte")]
  #[test_case(GIB => Some(1) ; "exact")]
  #[test_case(GIB + 1 => Some(2) ; "just over")]
  #[test_case(5 * GIB => Some(5) ; "five")]
  #[test_case(u64::from(u32::MAX) * GIB => Some(u32::MAX) ; "largest quota")]
  #[test_case(u64::from(u32::MAX) * GIB + 1 => None ; "past largest quota")]
  #[test_case(u64::MAX => None ; "max bytes")]
  fn gib(bytes: u64) -> Option<u32> {
    bytes_to_gib(bytes).ok()
  }

  #[test]
  fn oversized_capacity_is_invalid() {
    let err = bytes_to_gib(u64::MAX).unwrap_err();
    assert_eq!(err.code(), tonic::Code::InvalidArgument);
    assert!(err.to_string().starts_with("requested capacity 18446744073709551615 bytes"));
  }

  #[test_case(None => 100 ; "no range")]
  #[test_case(Some(CapacityRange::new(0, 0)) => 100 ; "zero required")]
  #[test_case(Some(CapacityRange::new(5 * GIB, 0)) => 5 ; "five gib")]
  fn default_quota(range: Option<CapacityRange>) -> u32 {
    requested_gib(range.as_ref()).unwrap()
  }

  #[test_case("pvc-3f2a", None => "pvc-3f2a" ; "volume name")]
  #[test_case("pvc-3f2a", Some("team") => "team-3f2a" ; "prefix replaces pvc")]
  #[test_case("Unit_Test", None => "unit-test" ; "sanitized")]
  fn share_names(volume: &str, prefix: Option<&str>) -> String {
    share_name_for(volume, prefix)
  }

  #[test]
  fn share_names_are_bounded() {
    let name = share_name_for(&"a".repeat(100), None);
    assert_eq!(name.len(), MAX_SHARE_NAME_LEN);
  }

  #[test_case("disjoint" => Ok(LimitFallback::Disjoint) ; "disjoint")]
  #[test_case("same" => Ok(LimitFallback::Same) ; "same")]
  #[test_case("other" => Err("invalid account limit fallback \"other\", expected one of: disjoint, same".to_owned()) ; "invalid")]
  fn fallback(value: &str) -> std::result::Result<LimitFallback, String> {
    value.parse()
  }

  #[test]
  fn settings_default_to_one_retry() {
    let settings = Settings::default();
    assert_eq!(settings.account_limit_retries, 1);
    assert_eq!(settings.account_limit_fallback, LimitFallback::Disjoint);
  }
}
