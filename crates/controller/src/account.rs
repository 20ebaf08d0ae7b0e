//! Picks the storage account a share lands in.

use crate::{
  cache::TtlCache,
  cloud::{
    subnet_id, Account, AccountRef, Cloud, CloudError, NewAccount, Tags, SKIP_MATCHING_TAG,
  },
  error::{Error, Result},
  parameters::is_premium_sku,
};
use rand::seq::SliceRandom;
use std::{fmt, time::Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_SKU: &str = "Standard_LRS";
pub const CREATED_BY_TAG: &str = "k8s-azure-created-by";
const CREATED_BY_VALUE: &str = "azure";
const MAX_ACCOUNT_NAME_LEN: usize = 24;

/// How the account is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelection {
  /// Use this account, whatever its properties.
  Fixed(String),
  /// Pick among matching accounts. No match is an error.
  RandomMatching,
  /// Pick among matching accounts, creating one when none matches.
  CreateNew,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkRules {
  None,
  /// Admit the subnets through service endpoints on the account ACLs.
  ServiceEndpoints {
    resource_group: String,
    vnet: String,
    subnets: Vec<String>,
  },
  PrivateEndpoint {
    resource_group: String,
    vnet: String,
    subnet: String,
  },
}

impl Default for NetworkRules {
  fn default() -> Self {
    NetworkRules::None
  }
}

#[derive(Debug, Clone)]
pub struct AccountConstraint {
  pub subscription_id: String,
  pub resource_group: String,
  pub location: Option<String>,
  pub sku: Option<String>,
  pub kind: Option<String>,
  pub tags: Tags,
  pub match_tags: bool,
  pub enable_large_file_shares: Option<bool>,
  pub allow_shared_key_access: Option<bool>,
  pub enable_nfs: bool,
  pub network: NetworkRules,
  pub account_quota_gib: Option<u64>,
  pub requested_gib: u32,
  pub disable_delete_retention: bool,
  pub latest_key: bool,
  pub selection: AccountSelection,
}

impl Default for AccountConstraint {
  fn default() -> Self {
    AccountConstraint {
      subscription_id: String::new(),
      resource_group: String::new(),
      location: None,
      sku: None,
      kind: None,
      tags: Tags::new(),
      match_tags: false,
      enable_large_file_shares: None,
      allow_shared_key_access: None,
      enable_nfs: false,
      network: NetworkRules::None,
      account_quota_gib: None,
      requested_gib: 0,
      disable_delete_retention: false,
      latest_key: false,
      selection: AccountSelection::CreateNew,
    }
  }
}

/// The chosen account and its key.
#[derive(Clone)]
pub struct ResolvedAccount {
  pub account: AccountRef,
  pub key: String,
  pub sku: Option<String>,
  pub location: Option<String>,
}

impl fmt::Debug for ResolvedAccount {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResolvedAccount")
      .field("account", &self.account)
      .field("key", &"<redacted>")
      .field("sku", &self.sku)
      .field("location", &self.location)
      .finish()
  }
}

fn normalize_location(location: &str) -> String {
  location.replace(' ', "").to_lowercase()
}

fn kind_for(sku: &str) -> &'static str {
  if is_premium_sku(sku) {
    "FileStorage"
  } else {
    "StorageV2"
  }
}

/// Checks an account against everything but quota headroom.
fn is_match(account: &Account, c: &AccountConstraint, subnet_ids: &[String]) -> bool {
  if account.tags.contains_key(SKIP_MATCHING_TAG) {
    return false;
  }

  if let Some(sku) = &c.sku {
    match &account.sku {
      Some(actual) if actual.eq_ignore_ascii_case(sku) => (),
      _ => return false,
    }
  }

  if let Some(kind) = &c.kind {
    match &account.kind {
      Some(actual) if actual.eq_ignore_ascii_case(kind) => (),
      _ => return false,
    }
  }

  if let Some(location) = &c.location {
    match &account.location {
      Some(actual) if normalize_location(actual) == normalize_location(location) => (),
      _ => return false,
    }
  }

  if c.enable_large_file_shares == Some(true) && account.enable_large_file_shares != Some(true) {
    return false;
  }

  if let Some(allow) = c.allow_shared_key_access {
    if account.allow_shared_key_access.unwrap_or(true) != allow {
      return false;
    }
  }

  if account.enable_https_traffic_only.unwrap_or(true) == c.enable_nfs {
    return false;
  }

  if !subnet_ids.iter().all(|id| account.subnet_ids.contains(id)) {
    return false;
  }

  if let NetworkRules::PrivateEndpoint { .. } = c.network {
    if !account.private_endpoint {
      return false;
    }
  }

  if c.match_tags {
    let tags_match = c
      .tags
      .iter()
      .all(|(k, v)| account.tags.get(k).map_or(false, |actual| actual == v));
    if !tags_match {
      return false;
    }
  }

  true
}

/// Resolves accounts and caches their keys.
pub struct AccountResolver {
  cloud: Cloud,
  keys: TtlCache<String>,
  name_prefix: String,
}

impl AccountResolver {
  pub fn new(cloud: Cloud, key_ttl: Duration, name_prefix: impl Into<String>) -> Self {
    AccountResolver {
      cloud,
      keys: TtlCache::new(key_ttl),
      name_prefix: name_prefix.into(),
    }
  }

  /// New account name: the prefix followed by random hex.
  pub fn generate_name(&self) -> String {
    let mut name = self.name_prefix.to_lowercase();
    name.push_str(&Uuid::new_v4().simple().to_string());
    name.truncate(MAX_ACCOUNT_NAME_LEN);
    name
  }

  pub async fn resolve(&self, c: &AccountConstraint) -> Result<ResolvedAccount> {
    let subnet_ids = self.ensure_subnets(c).await?;

    let (account, sku, location) = match &c.selection {
      AccountSelection::Fixed(name) => {
        let account = AccountRef::new(&c.subscription_id, &c.resource_group, name);
        if !subnet_ids.is_empty() {
          self
            .cloud
            .accounts
            .add_network_rules(&account, &subnet_ids)
            .await
            .map_err(|err| Error::backend(format!("failed to update network rules: {}", err)))?;
        }

        let (sku, location) = match &c.sku {
          Some(sku) => (Some(sku.clone()), c.location.clone()),
          None => match self.cloud.accounts.get_account(&account).await {
            Ok(a) => (a.sku, a.location),
            Err(err) => {
              warn!(account = %name, %err, "could not load account properties");
              (None, c.location.clone())
            }
          },
        };

        (account, sku, location)
      }
      selection => match self.find_matching(c, &subnet_ids).await? {
        Some(found) => {
          let account = AccountRef::new(&c.subscription_id, &c.resource_group, &found.name);
          (account, found.sku, found.location)
        }
        None if *selection == AccountSelection::RandomMatching => {
          return Err(Error::not_found(format!(
            "no storage account matching the requested properties found in resource group({})",
            c.resource_group
          )));
        }
        None => {
          let created = self.create(c, &subnet_ids).await?;
          let account = AccountRef::new(&c.subscription_id, &c.resource_group, &created.name);
          (account, created.sku, created.location)
        }
      },
    };

    let key = self.account_key(&account, c.latest_key).await?;
    Ok(ResolvedAccount {
      account,
      key,
      sku,
      location,
    })
  }

  async fn ensure_subnets(&self, c: &AccountConstraint) -> Result<Vec<String>> {
    let (resource_group, vnet, subnets) = match &c.network {
      NetworkRules::ServiceEndpoints {
        resource_group,
        vnet,
        subnets,
      } => (resource_group, vnet, subnets),
      _ => return Ok(Vec::new()),
    };

    let mut ids = Vec::with_capacity(subnets.len());
    for subnet in subnets {
      let id = self
        .cloud
        .network
        .ensure_service_endpoint(&c.subscription_id, resource_group, vnet, subnet)
        .await
        .map_err(|err| {
          Error::backend(format!("update service endpoints failed with error: {}", err))
        })?;
      ids.push(id);
    }

    Ok(ids)
  }

  async fn find_matching(&self, c: &AccountConstraint, subnet_ids: &[String]) -> Result<Option<Account>> {
    let accounts = self
      .cloud
      .accounts
      .list_accounts(&c.subscription_id, &c.resource_group)
      .await
      .map_err(|err| {
        Error::backend(format!(
          "failed to list storage accounts in rg({}): {}",
          c.resource_group, err
        ))
      })?;

    let mut candidates = Vec::new();
    for account in accounts.into_iter().filter(|a| is_match(a, c, subnet_ids)) {
      if self.has_quota_headroom(&account, c).await {
        candidates.push(account);
      }
    }

    debug!(count = candidates.len(), "matching storage accounts");
    Ok(candidates.choose(&mut rand::thread_rng()).cloned())
  }

  async fn has_quota_headroom(&self, account: &Account, c: &AccountConstraint) -> bool {
    let limit = match c.account_quota_gib {
      Some(limit) => limit,
      None => return true,
    };

    let target = AccountRef::new(&c.subscription_id, &c.resource_group, &account.name);
    match self.cloud.shares.list_shares(&target).await {
      Ok(shares) => {
        let used: u64 = shares.iter().filter_map(|s| s.quota_gib).map(u64::from).sum();
        used + u64::from(c.requested_gib) <= limit
      }
      Err(err) => {
        warn!(account = %account.name, %err, "skipping account, could not list shares");
        false
      }
    }
  }

  async fn create(&self, c: &AccountConstraint, subnet_ids: &[String]) -> Result<Account> {
    let sku = c.sku.clone().unwrap_or_else(|| DEFAULT_SKU.to_owned());
    let mut tags = c.tags.clone();
    tags
      .entry(CREATED_BY_TAG.to_owned())
      .or_insert_with(|| CREATED_BY_VALUE.to_owned());

    let new = NewAccount {
      name: self.generate_name(),
      location: c.location.clone(),
      kind: c.kind.clone().unwrap_or_else(|| kind_for(&sku).to_owned()),
      sku,
      tags,
      enable_large_file_shares: c.enable_large_file_shares.unwrap_or(false),
      allow_shared_key_access: c.allow_shared_key_access,
      enable_nfs: c.enable_nfs,
      subnet_ids: subnet_ids.to_vec(),
    };

    info!(account = %new.name, rg = %c.resource_group, sku = %new.sku, "no matching account, creating one");
    let created = self
      .cloud
      .accounts
      .create_account(&c.subscription_id, &c.resource_group, &new)
      .await
      .map_err(|err| {
        Error::backend(format!(
          "failed to create storage account {}, error: {}",
          new.name, err
        ))
      })?;
    let account = AccountRef::new(&c.subscription_id, &c.resource_group, &created.name);

    if let NetworkRules::PrivateEndpoint {
      resource_group,
      vnet,
      subnet,
    } = &c.network
    {
      let id = subnet_id(&c.subscription_id, resource_group, vnet, subnet);
      self
        .cloud
        .network
        .create_private_endpoint(&account, created.location.as_deref(), &id)
        .await
        .map_err(|err| Error::backend(format!("create private endpoint failed with error: {}", err)))?;
    }

    if c.disable_delete_retention {
      self
        .cloud
        .accounts
        .disable_delete_retention(&account)
        .await
        .map_err(|err| {
          Error::backend(format!(
            "failed to disable delete retention policy on account({}): {}",
            created.name, err
          ))
        })?;
    }

    Ok(created)
  }

  async fn load_key(&self, account: &AccountRef, latest: bool) -> Result<String, CloudError> {
    let keys = self.cloud.accounts.list_keys(account).await?;
    let key = if latest {
      keys.into_iter().max_by_key(|k| k.created)
    } else {
      keys.into_iter().next()
    };

    key
      .map(|k| k.value)
      .ok_or_else(|| CloudError::Other("no valid keys".to_owned()))
  }

  /// The account key, read through the cache unless the latest key is
  /// requested.
  pub async fn account_key(&self, account: &AccountRef, latest: bool) -> Result<String> {
    let result = if latest {
      let key = self.load_key(account, true).await;
      if let Ok(key) = &key {
        self.keys.set(account.name.clone(), key.clone());
      }
      key
    } else {
      self
        .keys
        .get_or_load(&account.name, || self.load_key(account, false))
        .await
    };

    result.map_err(|err| {
      Error::backend(format!(
        "failed to GetStorageAccesskey on account({}) rg({}), error: {}",
        account.name, account.resource_group, err
      ))
    })
  }

  /// Drops the cached key so the next lookup lists the keys again.
  pub fn forget_key(&self, account: &AccountRef) {
    self.keys.invalidate(&account.name);
  }

  /// Excludes the account from future matching.
  pub async fn mark_skip_matching(&self, account: &AccountRef) -> Result<()> {
    let mut tags = Tags::new();
    tags.insert(SKIP_MATCHING_TAG.to_owned(), "true".to_owned());
    self
      .cloud
      .accounts
      .add_tags(account, &tags)
      .await
      .map_err(|err| {
        Error::backend(format!(
          "failed to tag account({}) as {}: {}",
          account.name, SKIP_MATCHING_TAG, err
        ))
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cloud::{fake::FakeCloud, AccountKey};
  use chrono::{TimeZone, Utc};

  fn resolver(fake: &FakeCloud) -> AccountResolver {
    AccountResolver::new(fake.cloud(), Duration::from_secs(60), "f")
  }

  fn account(name: &str, sku: &str) -> Account {
    Account {
      name: name.to_owned(),
      location: Some("westus".to_owned()),
      sku: Some(sku.to_owned()),
      kind: Some("StorageV2".to_owned()),
      ..Default::default()
    }
  }

  fn constraint(selection: AccountSelection) -> AccountConstraint {
    AccountConstraint {
      subscription_id: "sub".into(),
      resource_group: "rg".into(),
      location: Some("West US".into()),
      sku: Some("Standard_LRS".into()),
      selection,
      ..Default::default()
    }
  }

  #[test]
  fn generated_names_fit() {
    let fake = FakeCloud::new();
    let name = AccountResolver::new(fake.cloud(), Duration::from_secs(1), "FPrefix").generate_name();
    assert_eq!(name.len(), 24);
    assert!(name.starts_with("fprefix"));
    assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
  }

  #[test]
  fn matching_rules() {
    let mut c = constraint(AccountSelection::CreateNew);
    let plain = account("a", "Standard_LRS");
    assert!(is_match(&plain, &c, &[]));

    let mut skipped = plain.clone();
    skipped.tags.insert(SKIP_MATCHING_TAG.into(), "true".into());
    assert!(!is_match(&skipped, &c, &[]));

    assert!(!is_match(&account("b", "Premium_LRS"), &c, &[]));
    assert!(!is_match(&plain, &c, &["subnet".to_owned()]));

    c.match_tags = true;
    c.tags.insert("team".into(), "storage".into());
    assert!(!is_match(&plain, &c, &[]));
    let mut tagged = plain.clone();
    tagged.tags.insert("team".into(), "storage".into());
    assert!(is_match(&tagged, &c, &[]));

    c.enable_nfs = true;
    assert!(!is_match(&tagged, &c, &[]));
    tagged.enable_https_traffic_only = Some(false);
    assert!(is_match(&tagged, &c, &[]));
  }

  #[tokio::test]
  async fn picks_an_existing_match() {
    let fake = FakeCloud::new();
    fake
      .add_account("rg", account("match", "Standard_LRS"))
      .add_account("rg", account("other", "Premium_LRS"));

    let resolved = resolver(&fake)
      .resolve(&constraint(AccountSelection::CreateNew))
      .await
      .unwrap();

    assert_eq!(resolved.account.name, "match");
    assert!(fake.calls("create_account").is_empty());
  }

  #[tokio::test]
  async fn creates_when_nothing_matches() {
    let fake = FakeCloud::new();
    fake.add_account("rg", account("other", "Premium_LRS"));

    let resolved = resolver(&fake)
      .resolve(&constraint(AccountSelection::CreateNew))
      .await
      .unwrap();

    let created = fake.account("rg", &resolved.account.name).unwrap();
    assert_eq!(created.sku.as_deref(), Some("Standard_LRS"));
    assert_eq!(created.kind.as_deref(), Some("StorageV2"));
    assert_eq!(
      created.tags.get(CREATED_BY_TAG).map(String::as_str),
      Some("azure")
    );
    assert!(!resolved.key.is_empty());
  }

  #[tokio::test]
  async fn random_matching_without_match_is_not_found() {
    let fake = FakeCloud::new();
    let err = resolver(&fake)
      .resolve(&constraint(AccountSelection::RandomMatching))
      .await
      .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
  }

  #[tokio::test]
  async fn fixed_account_skips_listing() {
    let fake = FakeCloud::new();
    fake.add_account("rg", account("fixed", "Premium_LRS"));
    let mut c = constraint(AccountSelection::Fixed("fixed".into()));
    c.sku = None;

    let resolved = resolver(&fake).resolve(&c).await.unwrap();

    assert_eq!(resolved.account.name, "fixed");
    assert_eq!(resolved.sku.as_deref(), Some("Premium_LRS"));
    assert!(fake.calls("list_accounts").is_empty());
  }

  #[tokio::test]
  async fn account_quota_headroom() {
    let fake = FakeCloud::new();
    fake
      .add_account("rg", account("full", "Standard_LRS"))
      .add_share("full", crate::cloud::Share {
        name: "big".into(),
        quota_gib: Some(95),
        ..Default::default()
      });
    let mut c = constraint(AccountSelection::RandomMatching);
    c.account_quota_gib = Some(100);
    c.requested_gib = 10;

    let err = resolver(&fake).resolve(&c).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    c.requested_gib = 5;
    let resolved = resolver(&fake).resolve(&c).await.unwrap();
    assert_eq!(resolved.account.name, "full");
  }

  #[tokio::test]
  async fn service_endpoints_are_added_to_fixed_accounts() {
    let fake = FakeCloud::new();
    fake.add_account("rg", account("fixed", "Standard_LRS"));
    let mut c = constraint(AccountSelection::Fixed("fixed".into()));
    c.network = NetworkRules::ServiceEndpoints {
      resource_group: "vnet-rg".into(),
      vnet: "vnet".into(),
      subnets: vec!["a".into(), "b".into()],
    };

    resolver(&fake).resolve(&c).await.unwrap();

    assert_eq!(fake.calls("ensure_service_endpoint").len(), 2);
    assert_eq!(fake.account("rg", "fixed").unwrap().subnet_ids.len(), 2);
  }

  #[tokio::test]
  async fn service_endpoint_failure() {
    let fake = FakeCloud::new();
    fake.fail("ensure_service_endpoint", CloudError::Other("test error".into()));
    let mut c = constraint(AccountSelection::CreateNew);
    c.network = NetworkRules::ServiceEndpoints {
      resource_group: "rg".into(),
      vnet: "vnet".into(),
      subnets: vec!["subnet".into()],
    };

    let err = resolver(&fake).resolve(&c).await.unwrap_err();
    assert_eq!(err.to_string(), "update service endpoints failed with error: test error");
  }

  #[tokio::test]
  async fn private_endpoint_and_retention_on_create() {
    let fake = FakeCloud::new();
    let mut c = constraint(AccountSelection::CreateNew);
    c.network = NetworkRules::PrivateEndpoint {
      resource_group: "rg".into(),
      vnet: "vnet".into(),
      subnet: "subnet".into(),
    };
    c.disable_delete_retention = true;

    let resolved = resolver(&fake).resolve(&c).await.unwrap();

    assert_eq!(fake.private_endpoints(), vec![resolved.account.name.clone()]);
    assert_eq!(fake.retention_disabled(), vec![resolved.account.name]);
  }

  #[tokio::test]
  async fn keys_are_cached_unless_latest() {
    let fake = FakeCloud::new();
    fake.add_account("rg", account("acct", "Standard_LRS"));
    let resolver = resolver(&fake);
    let account = AccountRef::new("sub", "rg", "acct");

    resolver.account_key(&account, false).await.unwrap();
    resolver.account_key(&account, false).await.unwrap();
    assert_eq!(fake.calls("list_keys").len(), 1);

    fake.set_keys("acct", vec![
      AccountKey {
        name: "key1".into(),
        value: "old".into(),
        created: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
      },
      AccountKey {
        name: "key2".into(),
        value: "new".into(),
        created: Some(Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()),
      },
    ]);
    assert_eq!(resolver.account_key(&account, true).await.unwrap(), "new");
    assert_eq!(fake.calls("list_keys").len(), 2);
  }

  #[tokio::test]
  async fn forgotten_key_is_listed_again() {
    let fake = FakeCloud::new();
    fake.add_account("rg", account("acct", "Standard_LRS"));
    let resolver = resolver(&fake);
    let account = AccountRef::new("sub", "rg", "acct");

    resolver.account_key(&account, false).await.unwrap();
    resolver.forget_key(&account);
    resolver.account_key(&account, false).await.unwrap();

    assert_eq!(fake.calls("list_keys").len(), 2);
  }

  #[tokio::test]
  async fn key_failure_message() {
    let fake = FakeCloud::new();
    fake.fail("list_keys", CloudError::Other("boom".into()));

    let err = resolver(&fake)
      .account_key(&AccountRef::new("sub", "rg", "acct"), false)
      .await
      .unwrap_err();

    assert_eq!(
      err.to_string(),
      "failed to GetStorageAccesskey on account(acct) rg(rg), error: boom"
    );
  }

  #[tokio::test]
  async fn skip_matching_tag_excludes_account() {
    let fake = FakeCloud::new();
    fake.add_account("rg", account("acct", "Standard_LRS"));
    let resolver = resolver(&fake);

    resolver
      .mark_skip_matching(&AccountRef::new("sub", "rg", "acct"))
      .await
      .unwrap();
    let err = resolver
      .resolve(&constraint(AccountSelection::RandomMatching))
      .await
      .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
  }
}
