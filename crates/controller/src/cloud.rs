//! Collaborators the controller drives: the storage management plane, the
//! network management plane, the file data plane and the secret store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
  collections::{BTreeMap, HashMap},
  fmt,
  sync::Arc,
};
use thiserror::Error;

mod arm;
mod auth;
pub mod fake;
mod file;

pub use arm::ArmClient;
pub use auth::{Credential, TokenProvider};
pub use file::SasFileClient;

pub type Tags = BTreeMap<String, String>;

/// Tag that removes an account from automatic matching.
pub const SKIP_MATCHING_TAG: &str = "skip-matching";

const ACCOUNT_LIMIT_CODES: [&str; 2] = [
  "TotalSharesProvisionedCapacityExceedsAccountLimit",
  "TotalSharesCountExceedsAccountLimit",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CloudError {
  #[error("{0}")]
  NotFound(String),

  /// The account cannot hold another share of the requested size.
  #[error("{0}")]
  AccountLimitExceeded(String),

  /// The credential was rejected, typically after a key rotation.
  #[error("{0}")]
  Unauthorized(String),

  #[error("{0}")]
  Other(String),
}

impl CloudError {
  /// Classifies a raw backend error message.
  pub fn from_message(message: impl Into<String>) -> Self {
    let message = message.into();
    if ACCOUNT_LIMIT_CODES.iter().any(|c| message.contains(c)) {
      CloudError::AccountLimitExceeded(message)
    } else {
      CloudError::Other(message)
    }
  }

  #[inline]
  pub fn is_not_found(&self) -> bool {
    matches!(self, CloudError::NotFound(_))
  }

  #[inline]
  pub fn is_account_limit(&self) -> bool {
    matches!(self, CloudError::AccountLimitExceeded(_))
  }

  #[inline]
  pub fn is_unauthorized(&self) -> bool {
    matches!(self, CloudError::Unauthorized(_))
  }
}

pub type CloudResult<T> = Result<T, CloudError>;

/// Resource id of a subnet.
pub fn subnet_id(subscription_id: &str, resource_group: &str, vnet: &str, subnet: &str) -> String {
  format!(
    "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/{}/subnets/{}",
    subscription_id, resource_group, vnet, subnet
  )
}

/// Where an account lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AccountRef {
  pub subscription_id: String,
  pub resource_group: String,
  pub name: String,
}

impl AccountRef {
  pub fn new(
    subscription_id: impl Into<String>,
    resource_group: impl Into<String>,
    name: impl Into<String>,
  ) -> Self {
    AccountRef {
      subscription_id: subscription_id.into(),
      resource_group: resource_group.into(),
      name: name.into(),
    }
  }
}

impl fmt::Display for AccountRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.resource_group, self.name)
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Account {
  pub name: String,
  pub location: Option<String>,
  pub sku: Option<String>,
  pub kind: Option<String>,
  pub tags: Tags,
  pub enable_large_file_shares: Option<bool>,
  pub allow_shared_key_access: Option<bool>,
  pub enable_https_traffic_only: Option<bool>,
  /// Subnet resource ids admitted by the account's network ACLs.
  pub subnet_ids: Vec<String>,
  pub private_endpoint: bool,
}

/// Properties of an account to be created.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewAccount {
  pub name: String,
  pub location: Option<String>,
  pub sku: String,
  pub kind: String,
  pub tags: Tags,
  pub enable_large_file_shares: bool,
  pub allow_shared_key_access: Option<bool>,
  pub enable_nfs: bool,
  pub subnet_ids: Vec<String>,
}

#[derive(Clone, PartialEq)]
pub struct AccountKey {
  pub name: String,
  pub value: String,
  pub created: Option<DateTime<Utc>>,
}

impl fmt::Debug for AccountKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AccountKey")
      .field("name", &self.name)
      .field("value", &"<redacted>")
      .field("created", &self.created)
      .finish()
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Share {
  pub name: String,
  pub quota_gib: Option<u32>,
  pub protocol: Option<String>,
  pub access_tier: Option<String>,
  pub metadata: Tags,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShareOptions {
  pub name: String,
  pub protocol: String,
  pub quota_gib: u32,
  pub access_tier: Option<String>,
  pub root_squash: Option<String>,
  pub metadata: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareSnapshot {
  /// Snapshot timestamp, as the backend reports it. Identifies the snapshot.
  pub tag: String,
  pub created: DateTime<Utc>,
  pub metadata: Tags,
}

/// A share addressed through the data plane with its account key.
#[derive(Clone)]
pub struct ShareTarget {
  pub account: String,
  pub account_key: String,
  pub endpoint_suffix: String,
  pub share: String,
}

impl ShareTarget {
  pub fn file(&self, path: impl Into<String>) -> FileTarget {
    FileTarget {
      account: self.account.clone(),
      account_key: self.account_key.clone(),
      endpoint_suffix: self.endpoint_suffix.clone(),
      share: self.share.clone(),
      path: path.into(),
    }
  }
}

impl fmt::Debug for ShareTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShareTarget")
      .field("account", &self.account)
      .field("account_key", &"<redacted>")
      .field("endpoint_suffix", &self.endpoint_suffix)
      .field("share", &self.share)
      .finish()
  }
}

/// A file inside a share, addressed through the data plane.
#[derive(Clone)]
pub struct FileTarget {
  pub account: String,
  pub account_key: String,
  pub endpoint_suffix: String,
  pub share: String,
  pub path: String,
}

impl fmt::Debug for FileTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FileTarget")
      .field("account", &self.account)
      .field("account_key", &"<redacted>")
      .field("endpoint_suffix", &self.endpoint_suffix)
      .field("share", &self.share)
      .field("path", &self.path)
      .finish()
  }
}

#[async_trait]
pub trait AccountClient: Send + Sync + 'static {
  async fn list_accounts(&self, subscription_id: &str, resource_group: &str)
    -> CloudResult<Vec<Account>>;

  async fn get_account(&self, account: &AccountRef) -> CloudResult<Account>;

  /// Creates the account, or returns it unchanged when it already exists.
  async fn create_account(
    &self,
    subscription_id: &str,
    resource_group: &str,
    account: &NewAccount,
  ) -> CloudResult<Account>;

  async fn list_keys(&self, account: &AccountRef) -> CloudResult<Vec<AccountKey>>;

  /// Merges `tags` into the account's tags.
  async fn add_tags(&self, account: &AccountRef, tags: &Tags) -> CloudResult<()>;

  async fn add_network_rules(&self, account: &AccountRef, subnet_ids: &[String]) -> CloudResult<()>;

  async fn disable_delete_retention(&self, account: &AccountRef) -> CloudResult<()>;
}

#[async_trait]
pub trait ShareClient: Send + Sync + 'static {
  async fn get_share(&self, account: &AccountRef, share: &str) -> CloudResult<Share>;

  async fn create_share(&self, account: &AccountRef, options: &ShareOptions) -> CloudResult<Share>;

  async fn delete_share(&self, account: &AccountRef, share: &str) -> CloudResult<()>;

  /// Sets the quota and returns the quota the backend reports afterwards.
  async fn resize_share(&self, account: &AccountRef, share: &str, quota_gib: u32)
    -> CloudResult<u32>;

  async fn list_shares(&self, account: &AccountRef) -> CloudResult<Vec<Share>>;

  async fn list_snapshots(&self, account: &AccountRef, share: &str)
    -> CloudResult<Vec<ShareSnapshot>>;

  async fn create_snapshot(
    &self,
    account: &AccountRef,
    share: &str,
    metadata: &Tags,
  ) -> CloudResult<ShareSnapshot>;

  async fn delete_snapshot(&self, account: &AccountRef, share: &str, tag: &str) -> CloudResult<()>;
}

#[async_trait]
pub trait NetworkClient: Send + Sync + 'static {
  /// Makes sure the subnet carries the storage service endpoint and returns
  /// its resource id.
  async fn ensure_service_endpoint(
    &self,
    subscription_id: &str,
    resource_group: &str,
    vnet: &str,
    subnet: &str,
  ) -> CloudResult<String>;

  async fn create_private_endpoint(
    &self,
    account: &AccountRef,
    location: Option<&str>,
    subnet_id: &str,
  ) -> CloudResult<()>;
}

/// The file data plane, authorized with an account key instead of the
/// management identity. Reaches accounts outside the driver's subscription.
#[async_trait]
pub trait FileClient: Send + Sync + 'static {
  /// Creates an empty file of `size` bytes.
  async fn create_file(&self, target: &FileTarget, size: u64) -> CloudResult<()>;

  async fn put_range(&self, target: &FileTarget, offset: u64, data: &[u8]) -> CloudResult<()>;

  async fn share_properties(&self, share: &ShareTarget) -> CloudResult<Share>;

  /// Deletes the share together with its snapshots.
  async fn remove_share(&self, share: &ShareTarget) -> CloudResult<()>;

  /// Sets the quota and returns the quota the backend reports afterwards.
  async fn set_share_quota(&self, share: &ShareTarget, quota_gib: u32) -> CloudResult<u32>;

  async fn share_snapshots(&self, share: &ShareTarget) -> CloudResult<Vec<ShareSnapshot>>;

  async fn snapshot_share(&self, share: &ShareTarget, metadata: &Tags) -> CloudResult<ShareSnapshot>;

  async fn remove_share_snapshot(&self, share: &ShareTarget, tag: &str) -> CloudResult<()>;
}

#[async_trait]
pub trait SecretStore: Send + Sync + 'static {
  async fn get_secret(&self, namespace: &str, name: &str) -> CloudResult<HashMap<String, String>>;

  /// Creates the secret. An existing secret is left as is.
  async fn put_secret(
    &self,
    namespace: &str,
    name: &str,
    data: HashMap<String, String>,
  ) -> CloudResult<()>;
}

/// The set of collaborators a driver talks to.
#[derive(Clone)]
pub struct Cloud {
  pub accounts: Arc<dyn AccountClient>,
  pub shares: Arc<dyn ShareClient>,
  pub network: Arc<dyn NetworkClient>,
  pub files: Arc<dyn FileClient>,
  pub secrets: Option<Arc<dyn SecretStore>>,
}

impl Cloud {
  /// One management client serving accounts, shares and networks.
  pub fn from_arm(arm: ArmClient, files: SasFileClient) -> Self {
    let arm = Arc::new(arm);
    Cloud {
      accounts: arm.clone(),
      shares: arm.clone(),
      network: arm,
      files: Arc::new(files),
      secrets: None,
    }
  }

  pub fn with_secrets(mut self, secrets: Arc<dyn SecretStore>) -> Self {
    self.secrets = Some(secrets);
    self
  }
}

impl fmt::Debug for Cloud {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Cloud")
      .field("secrets", &self.secrets.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  #[test_case("ShareNotFound" => false ; "other")]
  #[test_case("code: TotalSharesProvisionedCapacityExceedsAccountLimit" => true ; "capacity")]
  #[test_case("TotalSharesCountExceedsAccountLimit, too many" => true ; "count")]
  fn account_limit(message: &str) -> bool {
    CloudError::from_message(message).is_account_limit()
  }

  #[test]
  fn share_target_hides_key() {
    let target = ShareTarget {
      account: "acct".into(),
      account_key: "c2VjcmV0".into(),
      endpoint_suffix: "core.windows.net".into(),
      share: "share".into(),
    };

    let file = target.file("disk.vhd");
    assert_eq!(file.share, "share");
    assert_eq!(file.account_key, "c2VjcmV0");
    assert!(!format!("{:?}", target).contains("c2VjcmV0"));
  }

  #[test]
  fn keys_are_redacted() {
    let key = AccountKey {
      name: "key1".into(),
      value: "c2VjcmV0".into(),
      created: None,
    };

    let debug = format!("{:?}", key);
    assert!(debug.contains("<redacted>"));
    assert!(!debug.contains("c2VjcmV0"));
  }
}
