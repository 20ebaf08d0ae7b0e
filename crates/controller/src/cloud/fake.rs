//! In-memory cloud for tests.
//!
//! Every trait call is appended to a log as `op:arg,arg`. Failures are queued
//! per operation with [`FakeCloud::fail`] and consumed one call at a time.

use super::{
  Account, AccountClient, AccountKey, AccountRef, Cloud, CloudError, CloudResult, FileClient,
  FileTarget, NetworkClient, NewAccount, SecretStore, Share, ShareClient, ShareOptions,
  ShareSnapshot, ShareTarget, Tags, subnet_id,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::{
  collections::{BTreeMap, HashMap, VecDeque},
  sync::Arc,
};

/// Bytes written to a fake file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeFile {
  pub size: u64,
  pub ranges: Vec<(u64, Vec<u8>)>,
}

#[derive(Default)]
struct State {
  accounts: BTreeMap<(String, String), Account>,
  keys: HashMap<String, Vec<AccountKey>>,
  shares: BTreeMap<(String, String), Share>,
  snapshots: BTreeMap<(String, String), Vec<ShareSnapshot>>,
  service_endpoints: Vec<String>,
  private_endpoints: Vec<String>,
  retention_disabled: Vec<String>,
  files: BTreeMap<(String, String, String), FakeFile>,
  secrets: HashMap<(String, String), HashMap<String, String>>,
  failures: HashMap<&'static str, VecDeque<CloudError>>,
  log: Vec<String>,
  snapshot_counter: i64,
}

impl State {
  fn call(&mut self, op: &'static str, args: &[&str]) -> CloudResult<()> {
    self.log.push(format!("{}:{}", op, args.join(",")));
    match self.failures.get_mut(op).and_then(VecDeque::pop_front) {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  /// Data-plane calls must present one of the account's keys.
  fn authorize(&self, account: &str, key: &str) -> CloudResult<()> {
    let known = self
      .keys
      .get(account)
      .map_or(false, |keys| keys.iter().any(|k| k.value == key));
    if known {
      Ok(())
    } else {
      Err(CloudError::Unauthorized(format!(
        "AuthenticationFailed: key rejected by account {}",
        account
      )))
    }
  }

  fn remove_share(&mut self, account: &str, share: &str) -> CloudResult<()> {
    self
      .snapshots
      .remove(&(account.to_owned(), share.to_owned()));
    self
      .shares
      .remove(&(account.to_owned(), share.to_owned()))
      .map(drop)
      .ok_or_else(|| share_not_found(share))
  }

  fn resize_share(&mut self, account: &str, share: &str, quota_gib: u32) -> CloudResult<u32> {
    let existing = self
      .shares
      .get_mut(&(account.to_owned(), share.to_owned()))
      .ok_or_else(|| share_not_found(share))?;
    existing.quota_gib = Some(quota_gib);
    Ok(quota_gib)
  }

  fn snapshot_share(&mut self, account: &str, share: &str, metadata: &Tags) -> CloudResult<ShareSnapshot> {
    if !self.shares.contains_key(&(account.to_owned(), share.to_owned())) {
      return Err(share_not_found(share));
    }

    self.snapshot_counter += 1;
    let created = fake_time(self.snapshot_counter);
    let snapshot = ShareSnapshot {
      tag: created.format("%Y-%m-%dT%H:%M:%S%.7fZ").to_string(),
      created,
      metadata: metadata.clone(),
    };
    self
      .snapshots
      .entry((account.to_owned(), share.to_owned()))
      .or_default()
      .push(snapshot.clone());
    Ok(snapshot)
  }

  fn remove_snapshot(&mut self, account: &str, share: &str, tag: &str) -> CloudResult<()> {
    let snapshots = self
      .snapshots
      .get_mut(&(account.to_owned(), share.to_owned()))
      .ok_or_else(|| share_not_found(share))?;
    let before = snapshots.len();
    snapshots.retain(|s| s.tag != tag);
    if snapshots.len() == before {
      return Err(CloudError::NotFound(format!("snapshot {} not found", tag)));
    }

    Ok(())
  }
}

#[derive(Clone, Default)]
pub struct FakeCloud(Arc<Mutex<State>>);

/// 2021-01-01T00:00:00Z plus `offset` seconds.
fn fake_time(offset: i64) -> DateTime<Utc> {
  DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_609_459_200 + offset)
}

fn default_key(account: &str) -> AccountKey {
  AccountKey {
    name: "key1".into(),
    value: base64::Engine::encode(
      &base64::engine::general_purpose::STANDARD,
      format!("{}-key", account),
    ),
    created: Some(fake_time(0)),
  }
}

impl FakeCloud {
  pub fn new() -> Self {
    Self::default()
  }

  /// All collaborators, the secret store included, backed by this fake.
  pub fn cloud(&self) -> Cloud {
    let this = Arc::new(self.clone());
    Cloud {
      accounts: this.clone(),
      shares: this.clone(),
      network: this.clone(),
      files: this.clone(),
      secrets: Some(this),
    }
  }

  /// Same as [`FakeCloud::cloud`] without a secret store.
  pub fn cloud_without_secrets(&self) -> Cloud {
    Cloud {
      secrets: None,
      ..self.cloud()
    }
  }

  pub fn add_account(&self, resource_group: &str, account: Account) -> &Self {
    let mut state = self.0.lock();
    state
      .keys
      .entry(account.name.clone())
      .or_insert_with(|| vec![default_key(&account.name)]);
    state
      .accounts
      .insert((resource_group.to_owned(), account.name.clone()), account);
    self
  }

  pub fn set_keys(&self, account: &str, keys: Vec<AccountKey>) -> &Self {
    self.0.lock().keys.insert(account.to_owned(), keys);
    self
  }

  pub fn add_share(&self, account: &str, share: Share) -> &Self {
    self
      .0
      .lock()
      .shares
      .insert((account.to_owned(), share.name.clone()), share);
    self
  }

  pub fn add_snapshot(&self, account: &str, share: &str, snapshot: ShareSnapshot) -> &Self {
    self
      .0
      .lock()
      .snapshots
      .entry((account.to_owned(), share.to_owned()))
      .or_default()
      .push(snapshot);
    self
  }

  pub fn add_secret(&self, namespace: &str, name: &str, data: HashMap<String, String>) -> &Self {
    self
      .0
      .lock()
      .secrets
      .insert((namespace.to_owned(), name.to_owned()), data);
    self
  }

  /// Fails the next call of `op` with `err`.
  pub fn fail(&self, op: &'static str, err: CloudError) -> &Self {
    self
      .0
      .lock()
      .failures
      .entry(op)
      .or_default()
      .push_back(err);
    self
  }

  pub fn account(&self, resource_group: &str, name: &str) -> Option<Account> {
    self
      .0
      .lock()
      .accounts
      .get(&(resource_group.to_owned(), name.to_owned()))
      .cloned()
  }

  pub fn accounts(&self) -> Vec<Account> {
    self.0.lock().accounts.values().cloned().collect()
  }

  pub fn share(&self, account: &str, share: &str) -> Option<Share> {
    self
      .0
      .lock()
      .shares
      .get(&(account.to_owned(), share.to_owned()))
      .cloned()
  }

  pub fn snapshots(&self, account: &str, share: &str) -> Vec<ShareSnapshot> {
    self
      .0
      .lock()
      .snapshots
      .get(&(account.to_owned(), share.to_owned()))
      .cloned()
      .unwrap_or_default()
  }

  pub fn file(&self, account: &str, share: &str, path: &str) -> Option<FakeFile> {
    self
      .0
      .lock()
      .files
      .get(&(account.to_owned(), share.to_owned(), path.to_owned()))
      .cloned()
  }

  pub fn secret(&self, namespace: &str, name: &str) -> Option<HashMap<String, String>> {
    self
      .0
      .lock()
      .secrets
      .get(&(namespace.to_owned(), name.to_owned()))
      .cloned()
  }

  pub fn private_endpoints(&self) -> Vec<String> {
    self.0.lock().private_endpoints.clone()
  }

  pub fn retention_disabled(&self) -> Vec<String> {
    self.0.lock().retention_disabled.clone()
  }

  pub fn get_log(&self) -> Vec<String> {
    self.0.lock().log.clone()
  }

  /// Logged calls of one operation.
  pub fn calls(&self, op: &str) -> Vec<String> {
    let prefix = format!("{}:", op);
    self
      .0
      .lock()
      .log
      .iter()
      .filter(|c| c.starts_with(&prefix))
      .cloned()
      .collect()
  }
}

fn share_not_found(share: &str) -> CloudError {
  CloudError::NotFound(format!("ShareNotFound: the specified share {} does not exist", share))
}

#[async_trait]
impl AccountClient for FakeCloud {
  async fn list_accounts(&self, _: &str, resource_group: &str) -> CloudResult<Vec<Account>> {
    let mut state = self.0.lock();
    state.call("list_accounts", &[resource_group])?;
    Ok(
      state
        .accounts
        .iter()
        .filter(|((rg, _), _)| rg == resource_group)
        .map(|(_, a)| a.clone())
        .collect(),
    )
  }

  async fn get_account(&self, account: &AccountRef) -> CloudResult<Account> {
    let mut state = self.0.lock();
    state.call("get_account", &[&account.resource_group, &account.name])?;
    state
      .accounts
      .get(&(account.resource_group.clone(), account.name.clone()))
      .cloned()
      .ok_or_else(|| CloudError::NotFound(format!("account {} not found", account.name)))
  }

  async fn create_account(
    &self,
    _: &str,
    resource_group: &str,
    account: &NewAccount,
  ) -> CloudResult<Account> {
    let mut state = self.0.lock();
    state.call("create_account", &[resource_group, &account.name])?;
    let key = (resource_group.to_owned(), account.name.clone());
    if let Some(existing) = state.accounts.get(&key) {
      return Ok(existing.clone());
    }

    let created = Account {
      name: account.name.clone(),
      location: account.location.clone(),
      sku: Some(account.sku.clone()),
      kind: Some(account.kind.clone()),
      tags: account.tags.clone(),
      enable_large_file_shares: Some(account.enable_large_file_shares),
      allow_shared_key_access: account.allow_shared_key_access,
      enable_https_traffic_only: Some(!account.enable_nfs),
      subnet_ids: account.subnet_ids.clone(),
      private_endpoint: false,
    };
    state
      .keys
      .insert(account.name.clone(), vec![default_key(&account.name)]);
    state.accounts.insert(key, created.clone());
    Ok(created)
  }

  async fn list_keys(&self, account: &AccountRef) -> CloudResult<Vec<AccountKey>> {
    let mut state = self.0.lock();
    state.call("list_keys", &[&account.name])?;
    state
      .keys
      .get(&account.name)
      .cloned()
      .ok_or_else(|| CloudError::NotFound(format!("account {} not found", account.name)))
  }

  async fn add_tags(&self, account: &AccountRef, tags: &Tags) -> CloudResult<()> {
    let mut state = self.0.lock();
    let names = tags.keys().map(String::as_str).collect::<Vec<_>>().join("+");
    state.call("add_tags", &[&account.name, &names])?;
    let key = (account.resource_group.clone(), account.name.clone());
    match state.accounts.get_mut(&key) {
      Some(a) => {
        a.tags.extend(tags.clone());
        Ok(())
      }
      None => Err(CloudError::NotFound(format!("account {} not found", account.name))),
    }
  }

  async fn add_network_rules(&self, account: &AccountRef, subnet_ids: &[String]) -> CloudResult<()> {
    let mut state = self.0.lock();
    state.call("add_network_rules", &[&account.name, &subnet_ids.join("+")])?;
    let key = (account.resource_group.clone(), account.name.clone());
    if let Some(a) = state.accounts.get_mut(&key) {
      for id in subnet_ids {
        if !a.subnet_ids.contains(id) {
          a.subnet_ids.push(id.clone());
        }
      }
    }

    Ok(())
  }

  async fn disable_delete_retention(&self, account: &AccountRef) -> CloudResult<()> {
    let mut state = self.0.lock();
    state.call("disable_delete_retention", &[&account.name])?;
    state.retention_disabled.push(account.name.clone());
    Ok(())
  }
}

#[async_trait]
impl ShareClient for FakeCloud {
  async fn get_share(&self, account: &AccountRef, share: &str) -> CloudResult<Share> {
    let mut state = self.0.lock();
    state.call("get_share", &[&account.name, share])?;
    state
      .shares
      .get(&(account.name.clone(), share.to_owned()))
      .cloned()
      .ok_or_else(|| share_not_found(share))
  }

  async fn create_share(&self, account: &AccountRef, options: &ShareOptions) -> CloudResult<Share> {
    let mut state = self.0.lock();
    let quota = options.quota_gib.to_string();
    state.call("create_share", &[&account.name, &options.name, &quota])?;
    let share = Share {
      name: options.name.clone(),
      quota_gib: Some(options.quota_gib),
      protocol: Some(options.protocol.clone()),
      access_tier: options.access_tier.clone(),
      metadata: options.metadata.clone(),
    };
    state
      .shares
      .insert((account.name.clone(), options.name.clone()), share.clone());
    Ok(share)
  }

  async fn delete_share(&self, account: &AccountRef, share: &str) -> CloudResult<()> {
    let mut state = self.0.lock();
    state.call("delete_share", &[&account.name, share])?;
    state.remove_share(&account.name, share)
  }

  async fn resize_share(&self, account: &AccountRef, share: &str, quota_gib: u32) -> CloudResult<u32> {
    let mut state = self.0.lock();
    state.call("resize_share", &[&account.name, share, &quota_gib.to_string()])?;
    state.resize_share(&account.name, share, quota_gib)
  }

  async fn list_shares(&self, account: &AccountRef) -> CloudResult<Vec<Share>> {
    let mut state = self.0.lock();
    state.call("list_shares", &[&account.name])?;
    Ok(
      state
        .shares
        .iter()
        .filter(|((a, _), _)| *a == account.name)
        .map(|(_, s)| s.clone())
        .collect(),
    )
  }

  async fn list_snapshots(&self, account: &AccountRef, share: &str) -> CloudResult<Vec<ShareSnapshot>> {
    let mut state = self.0.lock();
    state.call("list_snapshots", &[&account.name, share])?;
    Ok(
      state
        .snapshots
        .get(&(account.name.clone(), share.to_owned()))
        .cloned()
        .unwrap_or_default(),
    )
  }

  async fn create_snapshot(
    &self,
    account: &AccountRef,
    share: &str,
    metadata: &Tags,
  ) -> CloudResult<ShareSnapshot> {
    let mut state = self.0.lock();
    state.call("create_snapshot", &[&account.name, share])?;
    state.snapshot_share(&account.name, share, metadata)
  }

  async fn delete_snapshot(&self, account: &AccountRef, share: &str, tag: &str) -> CloudResult<()> {
    let mut state = self.0.lock();
    state.call("delete_snapshot", &[&account.name, share, tag])?;
    state.remove_snapshot(&account.name, share, tag)
  }
}

#[async_trait]
impl NetworkClient for FakeCloud {
  async fn ensure_service_endpoint(
    &self,
    subscription_id: &str,
    resource_group: &str,
    vnet: &str,
    subnet: &str,
  ) -> CloudResult<String> {
    let mut state = self.0.lock();
    state.call("ensure_service_endpoint", &[resource_group, vnet, subnet])?;
    let id = subnet_id(subscription_id, resource_group, vnet, subnet);
    if !state.service_endpoints.contains(&id) {
      state.service_endpoints.push(id.clone());
    }

    Ok(id)
  }

  async fn create_private_endpoint(
    &self,
    account: &AccountRef,
    _: Option<&str>,
    subnet_id: &str,
  ) -> CloudResult<()> {
    let mut state = self.0.lock();
    state.call("create_private_endpoint", &[&account.name, subnet_id])?;
    state.private_endpoints.push(account.name.clone());
    let key = (account.resource_group.clone(), account.name.clone());
    if let Some(a) = state.accounts.get_mut(&key) {
      a.private_endpoint = true;
    }

    Ok(())
  }
}

#[async_trait]
impl FileClient for FakeCloud {
  async fn create_file(&self, target: &FileTarget, size: u64) -> CloudResult<()> {
    let mut state = self.0.lock();
    state.call("create_file", &[&target.account, &target.share, &target.path])?;
    state.files.insert(
      (target.account.clone(), target.share.clone(), target.path.clone()),
      FakeFile {
        size,
        ranges: Vec::new(),
      },
    );
    Ok(())
  }

  async fn put_range(&self, target: &FileTarget, offset: u64, data: &[u8]) -> CloudResult<()> {
    let mut state = self.0.lock();
    state.call("put_range", &[&target.path, &offset.to_string()])?;
    let file = state
      .files
      .get_mut(&(target.account.clone(), target.share.clone(), target.path.clone()))
      .ok_or_else(|| CloudError::NotFound(format!("file {} not found", target.path)))?;
    if offset + data.len() as u64 > file.size {
      return Err(CloudError::Other("InvalidRange".into()));
    }

    file.ranges.push((offset, data.to_vec()));
    Ok(())
  }

  async fn share_properties(&self, target: &ShareTarget) -> CloudResult<Share> {
    let mut state = self.0.lock();
    state.call("share_properties", &[&target.account, &target.share])?;
    state.authorize(&target.account, &target.account_key)?;
    state
      .shares
      .get(&(target.account.clone(), target.share.clone()))
      .cloned()
      .ok_or_else(|| share_not_found(&target.share))
  }

  async fn remove_share(&self, target: &ShareTarget) -> CloudResult<()> {
    let mut state = self.0.lock();
    state.call("remove_share", &[&target.account, &target.share])?;
    state.authorize(&target.account, &target.account_key)?;
    state.remove_share(&target.account, &target.share)
  }

  async fn set_share_quota(&self, target: &ShareTarget, quota_gib: u32) -> CloudResult<u32> {
    let mut state = self.0.lock();
    state.call(
      "set_share_quota",
      &[&target.account, &target.share, &quota_gib.to_string()],
    )?;
    state.authorize(&target.account, &target.account_key)?;
    state.resize_share(&target.account, &target.share, quota_gib)
  }

  async fn share_snapshots(&self, target: &ShareTarget) -> CloudResult<Vec<ShareSnapshot>> {
    let mut state = self.0.lock();
    state.call("share_snapshots", &[&target.account, &target.share])?;
    state.authorize(&target.account, &target.account_key)?;
    Ok(
      state
        .snapshots
        .get(&(target.account.clone(), target.share.clone()))
        .cloned()
        .unwrap_or_default(),
    )
  }

  async fn snapshot_share(&self, target: &ShareTarget, metadata: &Tags) -> CloudResult<ShareSnapshot> {
    let mut state = self.0.lock();
    state.call("snapshot_share", &[&target.account, &target.share])?;
    state.authorize(&target.account, &target.account_key)?;
    state.snapshot_share(&target.account, &target.share, metadata)
  }

  async fn remove_share_snapshot(&self, target: &ShareTarget, tag: &str) -> CloudResult<()> {
    let mut state = self.0.lock();
    state.call("remove_share_snapshot", &[&target.account, &target.share, tag])?;
    state.authorize(&target.account, &target.account_key)?;
    state.remove_snapshot(&target.account, &target.share, tag)
  }
}

#[async_trait]
impl SecretStore for FakeCloud {
  async fn get_secret(&self, namespace: &str, name: &str) -> CloudResult<HashMap<String, String>> {
    let mut state = self.0.lock();
    state.call("get_secret", &[namespace, name])?;
    state
      .secrets
      .get(&(namespace.to_owned(), name.to_owned()))
      .cloned()
      .ok_or_else(|| CloudError::NotFound(format!("secrets \"{}\" not found", name)))
  }

  async fn put_secret(
    &self,
    namespace: &str,
    name: &str,
    data: HashMap<String, String>,
  ) -> CloudResult<()> {
    let mut state = self.0.lock();
    state.call("put_secret", &[namespace, name])?;
    state
      .secrets
      .entry((namespace.to_owned(), name.to_owned()))
      .or_insert(data);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn account_ref(name: &str) -> AccountRef {
    AccountRef::new("sub", "rg", name)
  }

  #[tokio::test]
  async fn injected_failures_are_consumed_once() {
    let fake = FakeCloud::new();
    fake.fail("list_accounts", CloudError::Other("boom".into()));

    let first = fake.list_accounts("sub", "rg").await;
    let second = fake.list_accounts("sub", "rg").await;

    assert_eq!(first, Err(CloudError::Other("boom".into())));
    assert_eq!(second, Ok(Vec::new()));
    assert_eq!(fake.calls("list_accounts").len(), 2);
  }

  #[tokio::test]
  async fn create_account_is_idempotent() {
    let fake = FakeCloud::new();
    let new = NewAccount {
      name: "acct".into(),
      sku: "Standard_LRS".into(),
      kind: "StorageV2".into(),
      ..Default::default()
    };

    fake.create_account("sub", "rg", &new).await.unwrap();
    fake
      .add_tags(&account_ref("acct"), &vec![("k".to_owned(), "v".to_owned())].into_iter().collect())
      .await
      .unwrap();
    let again = fake.create_account("sub", "rg", &new).await.unwrap();

    assert_eq!(again.tags.get("k").map(String::as_str), Some("v"));
    assert_eq!(fake.list_keys(&account_ref("acct")).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn snapshots_get_distinct_tags() {
    let fake = FakeCloud::new();
    fake.add_share("acct", Share {
      name: "share".into(),
      quota_gib: Some(10),
      ..Default::default()
    });

    let a = fake
      .create_snapshot(&account_ref("acct"), "share", &Tags::new())
      .await
      .unwrap();
    let b = fake
      .create_snapshot(&account_ref("acct"), "share", &Tags::new())
      .await
      .unwrap();

    assert_ne!(a.tag, b.tag);
    fake
      .delete_snapshot(&account_ref("acct"), "share", &a.tag)
      .await
      .unwrap();
    assert_eq!(fake.snapshots("acct", "share"), vec![b]);
  }

  #[tokio::test]
  async fn data_plane_checks_the_key() {
    let fake = FakeCloud::new();
    fake.add_account("rg", Account {
      name: "acct".into(),
      ..Default::default()
    });
    fake.add_share("acct", Share {
      name: "share".into(),
      quota_gib: Some(10),
      ..Default::default()
    });
    let key = fake.list_keys(&account_ref("acct")).await.unwrap()[0].value.clone();
    let target = |account_key: &str| ShareTarget {
      account: "acct".into(),
      account_key: account_key.into(),
      endpoint_suffix: "core.windows.net".into(),
      share: "share".into(),
    };

    let err = fake.remove_share(&target("wrong")).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(fake.share("acct", "share").is_some());

    assert_eq!(fake.set_share_quota(&target(&key), 20).await.unwrap(), 20);
    fake.remove_share(&target(&key)).await.unwrap();
    assert!(fake.share("acct", "share").is_none());
  }

  #[tokio::test]
  async fn deleting_missing_share_is_not_found() {
    let fake = FakeCloud::new();
    let err = fake
      .delete_share(&account_ref("acct"), "missing")
      .await
      .unwrap_err();
    assert!(err.is_not_found());
  }
}
