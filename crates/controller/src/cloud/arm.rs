//! Management-plane client over the resource manager REST API.

use super::{
  Account, AccountClient, AccountKey, AccountRef, CloudError, CloudResult, NetworkClient,
  NewAccount, Share, ShareClient, ShareOptions, ShareSnapshot, Tags, TokenProvider,
  subnet_id,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

const STORAGE_API_VERSION: &str = "2021-09-01";
const NETWORK_API_VERSION: &str = "2022-07-01";
const STORAGE_SERVICE_ENDPOINT: &str = "Microsoft.Storage";
const PROVISIONING_POLL_INTERVAL: Duration = Duration::from_secs(5);
const PROVISIONING_POLL_ATTEMPTS: u32 = 60;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct List<T> {
  #[serde(default = "Vec::new")]
  value: Vec<T>,
  next_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Sku {
  name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VirtualNetworkRule {
  id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkAcls {
  #[serde(default)]
  virtual_network_rules: Vec<VirtualNetworkRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountProperties {
  large_file_shares_state: Option<String>,
  allow_shared_key_access: Option<bool>,
  supports_https_traffic_only: Option<bool>,
  network_acls: Option<NetworkAcls>,
  #[serde(default)]
  private_endpoint_connections: Vec<Value>,
  provisioning_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageAccount {
  name: String,
  location: Option<String>,
  sku: Option<Sku>,
  kind: Option<String>,
  #[serde(default)]
  tags: Tags,
  #[serde(default)]
  properties: AccountProperties,
}

impl From<StorageAccount> for Account {
  fn from(value: StorageAccount) -> Self {
    let properties = value.properties;
    Account {
      name: value.name,
      location: value.location,
      sku: value.sku.and_then(|s| s.name),
      kind: value.kind,
      tags: value.tags,
      enable_large_file_shares: properties
        .large_file_shares_state
        .map(|s| s.eq_ignore_ascii_case("enabled")),
      allow_shared_key_access: properties.allow_shared_key_access,
      enable_https_traffic_only: properties.supports_https_traffic_only,
      subnet_ids: properties
        .network_acls
        .map(|acls| acls.virtual_network_rules.into_iter().map(|r| r.id).collect())
        .unwrap_or_default(),
      private_endpoint: !properties.private_endpoint_connections.is_empty(),
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Key {
  key_name: String,
  value: String,
  creation_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Keys {
  #[serde(default)]
  keys: Vec<Key>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShareProperties {
  share_quota: Option<u32>,
  enabled_protocols: Option<String>,
  access_tier: Option<String>,
  snapshot_time: Option<DateTime<Utc>>,
  #[serde(default)]
  metadata: Tags,
}

#[derive(Debug, Deserialize)]
struct FileShare {
  name: String,
  #[serde(default)]
  properties: ShareProperties,
}

impl From<FileShare> for Share {
  fn from(value: FileShare) -> Self {
    Share {
      name: value.name,
      quota_gib: value.properties.share_quota,
      protocol: value.properties.enabled_protocols.map(|p| p.to_lowercase()),
      access_tier: value.properties.access_tier,
      metadata: value.properties.metadata,
    }
  }
}

fn snapshot_of(share: FileShare) -> Option<ShareSnapshot> {
  let created = share.properties.snapshot_time?;
  Some(ShareSnapshot {
    tag: created.format("%Y-%m-%dT%H:%M:%S%.7fZ").to_string(),
    created,
    metadata: share.properties.metadata,
  })
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> CloudResult<T> {
  serde_json::from_value(value)
    .map_err(|err| CloudError::Other(format!("unexpected response body: {}", err)))
}

/// Resource manager client. Serves the account, share and network traits.
#[derive(Debug)]
pub struct ArmClient {
  endpoint: String,
  token: TokenProvider,
  http: reqwest::Client,
}

impl ArmClient {
  pub fn new(endpoint: impl Into<String>, token: TokenProvider, http: reqwest::Client) -> Self {
    ArmClient {
      endpoint: endpoint.into().trim_end_matches('/').to_owned(),
      token,
      http,
    }
  }

  fn account_path(account: &AccountRef) -> String {
    format!(
      "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}",
      account.subscription_id, account.resource_group, account.name
    )
  }

  fn share_path(account: &AccountRef, share: &str) -> String {
    format!(
      "{}/fileServices/default/shares/{}",
      Self::account_path(account),
      share
    )
  }

  /// Sends one request. `path` may already carry a query string. Returns
  /// `Value::Null` for empty bodies.
  async fn send(
    &self,
    method: Method,
    path: &str,
    api_version: &str,
    body: Option<&Value>,
    headers: &[(&str, &str)],
  ) -> CloudResult<Value> {
    let url = if path.starts_with("http") {
      path.to_owned()
    } else {
      let separator = if path.contains('?') { '&' } else { '?' };
      format!(
        "{}{}{}api-version={}",
        self.endpoint, path, separator, api_version
      )
    };

    let token = self.token.token().await?;
    let mut request = self.http.request(method.clone(), &url).bearer_auth(token);
    for (name, value) in headers {
      request = request.header(*name, *value);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    debug!(%method, %url, "management request");
    let response = request
      .send()
      .await
      .map_err(|err| CloudError::Other(err.to_string()))?;
    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|err| CloudError::Other(err.to_string()))?;

    if status == StatusCode::NOT_FOUND {
      return Err(CloudError::NotFound(text));
    }

    if !status.is_success() {
      return Err(CloudError::from_message(format!(
        "{} {} failed with status {}: {}",
        method, url, status, text
      )));
    }

    if text.trim().is_empty() {
      return Ok(Value::Null);
    }

    serde_json::from_str(&text)
      .map_err(|err| CloudError::Other(format!("unexpected response body: {}", err)))
  }

  /// Follows `nextLink` until the listing is exhausted.
  async fn list<T: serde::de::DeserializeOwned>(&self, path: &str, api_version: &str) -> CloudResult<Vec<T>> {
    let mut items = Vec::new();
    let mut next = Some(path.to_owned());
    while let Some(path) = next.take() {
      let page: List<T> = decode(self.send(Method::GET, &path, api_version, None, &[]).await?)?;
      items.extend(page.value);
      next = page.next_link;
    }

    Ok(items)
  }

  async fn get_storage_account(&self, account: &AccountRef) -> CloudResult<StorageAccount> {
    decode(
      self
        .send(Method::GET, &Self::account_path(account), STORAGE_API_VERSION, None, &[])
        .await?,
    )
  }

  async fn wait_provisioned(&self, account: &AccountRef) -> CloudResult<StorageAccount> {
    for _ in 0..PROVISIONING_POLL_ATTEMPTS {
      match self.get_storage_account(account).await {
        Ok(a) if a.properties.provisioning_state.as_deref() == Some("Succeeded") => return Ok(a),
        Ok(_) | Err(CloudError::NotFound(_)) => sleep(PROVISIONING_POLL_INTERVAL).await,
        Err(err) => return Err(err),
      }
    }

    Err(CloudError::Other(format!(
      "storage account {} was not provisioned in time",
      account.name
    )))
  }
}

#[async_trait]
impl AccountClient for ArmClient {
  async fn list_accounts(&self, subscription_id: &str, resource_group: &str) -> CloudResult<Vec<Account>> {
    let path = format!(
      "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts",
      subscription_id, resource_group
    );
    let accounts: Vec<StorageAccount> = self.list(&path, STORAGE_API_VERSION).await?;
    Ok(accounts.into_iter().map(Account::from).collect())
  }

  async fn get_account(&self, account: &AccountRef) -> CloudResult<Account> {
    self.get_storage_account(account).await.map(Account::from)
  }

  async fn create_account(
    &self,
    subscription_id: &str,
    resource_group: &str,
    account: &NewAccount,
  ) -> CloudResult<Account> {
    let target = AccountRef::new(subscription_id, resource_group, &account.name);
    match self.get_storage_account(&target).await {
      Ok(existing) => return Ok(existing.into()),
      Err(CloudError::NotFound(_)) => (),
      Err(err) => return Err(err),
    }

    let rules: Vec<Value> = account
      .subnet_ids
      .iter()
      .map(|id| json!({ "id": id, "action": "Allow" }))
      .collect();
    let default_action = if rules.is_empty() { "Allow" } else { "Deny" };
    let mut properties = json!({
      "supportsHttpsTrafficOnly": !account.enable_nfs,
      "networkAcls": {
        "bypass": "AzureServices",
        "defaultAction": default_action,
        "virtualNetworkRules": rules,
      },
    });
    if account.enable_large_file_shares {
      properties["largeFileSharesState"] = json!("Enabled");
    }
    if let Some(allow) = account.allow_shared_key_access {
      properties["allowSharedKeyAccess"] = json!(allow);
    }

    let body = json!({
      "sku": { "name": account.sku },
      "kind": account.kind,
      "location": account.location,
      "tags": account.tags,
      "properties": properties,
    });

    info!(account = %account.name, resource_group, sku = %account.sku, "creating storage account");
    self
      .send(Method::PUT, &Self::account_path(&target), STORAGE_API_VERSION, Some(&body), &[])
      .await?;
    self.wait_provisioned(&target).await.map(Account::from)
  }

  async fn list_keys(&self, account: &AccountRef) -> CloudResult<Vec<AccountKey>> {
    let path = format!("{}/listKeys", Self::account_path(account));
    let keys: Keys = decode(
      self
        .send(Method::POST, &path, STORAGE_API_VERSION, None, &[])
        .await?,
    )?;

    Ok(
      keys
        .keys
        .into_iter()
        .map(|k| AccountKey {
          name: k.key_name,
          value: k.value,
          created: k.creation_time,
        })
        .collect(),
    )
  }

  async fn add_tags(&self, account: &AccountRef, tags: &Tags) -> CloudResult<()> {
    let mut merged = self.get_storage_account(account).await?.tags;
    merged.extend(tags.clone());
    let body = json!({ "tags": merged });
    self
      .send(Method::PATCH, &Self::account_path(account), STORAGE_API_VERSION, Some(&body), &[])
      .await
      .map(drop)
  }

  async fn add_network_rules(&self, account: &AccountRef, subnet_ids: &[String]) -> CloudResult<()> {
    let mut current = Account::from(self.get_storage_account(account).await?).subnet_ids;
    let missing: Vec<&String> = subnet_ids.iter().filter(|id| !current.contains(id)).collect();
    if missing.is_empty() {
      return Ok(());
    }

    current.extend(missing.into_iter().cloned());
    let rules: Vec<Value> = current
      .iter()
      .map(|id| json!({ "id": id, "action": "Allow" }))
      .collect();
    let body = json!({
      "properties": {
        "networkAcls": {
          "bypass": "AzureServices",
          "defaultAction": "Deny",
          "virtualNetworkRules": rules,
        },
      },
    });

    self
      .send(Method::PATCH, &Self::account_path(account), STORAGE_API_VERSION, Some(&body), &[])
      .await
      .map(drop)
  }

  async fn disable_delete_retention(&self, account: &AccountRef) -> CloudResult<()> {
    let path = format!("{}/fileServices/default", Self::account_path(account));
    let body = json!({
      "properties": { "shareDeleteRetentionPolicy": { "enabled": false } },
    });
    self
      .send(Method::PUT, &path, STORAGE_API_VERSION, Some(&body), &[])
      .await
      .map(drop)
  }
}

#[async_trait]
impl ShareClient for ArmClient {
  async fn get_share(&self, account: &AccountRef, share: &str) -> CloudResult<Share> {
    let share: FileShare = decode(
      self
        .send(Method::GET, &Self::share_path(account, share), STORAGE_API_VERSION, None, &[])
        .await?,
    )?;
    Ok(share.into())
  }

  async fn create_share(&self, account: &AccountRef, options: &ShareOptions) -> CloudResult<Share> {
    let mut properties = json!({
      "shareQuota": options.quota_gib,
      "enabledProtocols": options.protocol.to_uppercase(),
      "metadata": options.metadata,
    });
    if let Some(tier) = &options.access_tier {
      properties["accessTier"] = json!(tier);
    }
    if let Some(squash) = &options.root_squash {
      properties["rootSquash"] = json!(squash);
    }

    let body = json!({ "properties": properties });
    let share: FileShare = decode(
      self
        .send(
          Method::PUT,
          &Self::share_path(account, &options.name),
          STORAGE_API_VERSION,
          Some(&body),
          &[],
        )
        .await?,
    )?;
    Ok(share.into())
  }

  async fn delete_share(&self, account: &AccountRef, share: &str) -> CloudResult<()> {
    self
      .send(Method::DELETE, &Self::share_path(account, share), STORAGE_API_VERSION, None, &[])
      .await
      .map(drop)
  }

  async fn resize_share(&self, account: &AccountRef, share: &str, quota_gib: u32) -> CloudResult<u32> {
    let body = json!({ "properties": { "shareQuota": quota_gib } });
    let updated: FileShare = decode(
      self
        .send(
          Method::PATCH,
          &Self::share_path(account, share),
          STORAGE_API_VERSION,
          Some(&body),
          &[],
        )
        .await?,
    )?;
    Ok(updated.properties.share_quota.unwrap_or(quota_gib))
  }

  async fn list_shares(&self, account: &AccountRef) -> CloudResult<Vec<Share>> {
    let path = format!("{}/fileServices/default/shares", Self::account_path(account));
    let shares: Vec<FileShare> = self.list(&path, STORAGE_API_VERSION).await?;
    Ok(shares.into_iter().map(Share::from).collect())
  }

  async fn list_snapshots(&self, account: &AccountRef, share: &str) -> CloudResult<Vec<ShareSnapshot>> {
    let path = format!(
      "{}/fileServices/default/shares?$expand=snapshots",
      Self::account_path(account)
    );
    let shares: Vec<FileShare> = self.list(&path, STORAGE_API_VERSION).await?;
    Ok(
      shares
        .into_iter()
        .filter(|s| s.name == share)
        .filter_map(snapshot_of)
        .collect(),
    )
  }

  async fn create_snapshot(
    &self,
    account: &AccountRef,
    share: &str,
    metadata: &Tags,
  ) -> CloudResult<ShareSnapshot> {
    let path = format!("{}?$expand=snapshots", Self::share_path(account, share));
    let body = json!({ "properties": { "metadata": metadata } });
    let created: FileShare = decode(
      self
        .send(Method::PUT, &path, STORAGE_API_VERSION, Some(&body), &[])
        .await?,
    )?;

    snapshot_of(created).ok_or_else(|| {
      CloudError::Other(format!("snapshot of share {} carries no snapshot time", share))
    })
  }

  async fn delete_snapshot(&self, account: &AccountRef, share: &str, tag: &str) -> CloudResult<()> {
    self
      .send(
        Method::DELETE,
        &Self::share_path(account, share),
        STORAGE_API_VERSION,
        None,
        &[("x-ms-snapshot", tag)],
      )
      .await
      .map(drop)
  }
}

#[async_trait]
impl NetworkClient for ArmClient {
  async fn ensure_service_endpoint(
    &self,
    subscription_id: &str,
    resource_group: &str,
    vnet: &str,
    subnet: &str,
  ) -> CloudResult<String> {
    let path = subnet_id(subscription_id, resource_group, vnet, subnet);
    let mut current = self
      .send(Method::GET, &path, NETWORK_API_VERSION, None, &[])
      .await?;
    let id = current["id"]
      .as_str()
      .map(str::to_owned)
      .unwrap_or_else(|| path.clone());

    let endpoints = &current["properties"]["serviceEndpoints"];
    let present = endpoints
      .as_array()
      .map(|e| e.iter().any(|e| e["service"] == STORAGE_SERVICE_ENDPOINT))
      .unwrap_or(false);
    if present {
      return Ok(id);
    }

    let mut updated = endpoints.as_array().cloned().unwrap_or_default();
    updated.push(json!({ "service": STORAGE_SERVICE_ENDPOINT, "locations": ["*"] }));
    current["properties"]["serviceEndpoints"] = Value::Array(updated);

    info!(vnet, subnet, "adding storage service endpoint");
    self
      .send(Method::PUT, &path, NETWORK_API_VERSION, Some(&current), &[])
      .await?;
    Ok(id)
  }

  async fn create_private_endpoint(
    &self,
    account: &AccountRef,
    location: Option<&str>,
    subnet_id: &str,
  ) -> CloudResult<()> {
    let path = format!(
      "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/privateEndpoints/{}-pvtendpoint",
      account.subscription_id, account.resource_group, account.name
    );
    let body = json!({
      "location": location,
      "properties": {
        "subnet": { "id": subnet_id },
        "privateLinkServiceConnections": [{
          "name": format!("{}-pvtconnection", account.name),
          "properties": {
            "privateLinkServiceId": Self::account_path(account),
            "groupIds": ["file"],
          },
        }],
      },
    });

    info!(account = %account.name, "creating private endpoint");
    self
      .send(Method::PUT, &path, NETWORK_API_VERSION, Some(&body), &[])
      .await
      .map(drop)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn account_from_response() {
    let body = json!({
      "name": "acct",
      "location": "westus",
      "sku": { "name": "Premium_LRS" },
      "kind": "FileStorage",
      "tags": { "k8s-azure-created-by": "azurefile" },
      "properties": {
        "largeFileSharesState": "Enabled",
        "networkAcls": { "virtualNetworkRules": [{ "id": "subnet-1", "action": "Allow" }] },
        "privateEndpointConnections": [{}],
      },
    });

    let account = Account::from(decode::<StorageAccount>(body).unwrap());
    assert_eq!(account.sku.as_deref(), Some("Premium_LRS"));
    assert_eq!(account.enable_large_file_shares, Some(true));
    assert_eq!(account.subnet_ids, vec!["subnet-1".to_owned()]);
    assert!(account.private_endpoint);
    assert_eq!(account.allow_shared_key_access, None);
  }

  #[test]
  fn share_from_response() {
    let body = json!({
      "name": "share",
      "properties": { "shareQuota": 100, "enabledProtocols": "NFS", "metadata": { "pvname": "pv" } },
    });

    let share = Share::from(decode::<FileShare>(body).unwrap());
    assert_eq!(share.quota_gib, Some(100));
    assert_eq!(share.protocol.as_deref(), Some("nfs"));
    assert_eq!(share.metadata.get("pvname").map(String::as_str), Some("pv"));
  }

  #[test]
  fn snapshots_need_a_time() {
    let live = decode::<FileShare>(json!({ "name": "share", "properties": {} })).unwrap();
    let snapshot = decode::<FileShare>(json!({
      "name": "share",
      "properties": { "snapshotTime": "2021-06-01T10:00:00.1234567Z" },
    }))
    .unwrap();

    assert!(snapshot_of(live).is_none());
    assert_eq!(
      snapshot_of(snapshot).map(|s| s.tag),
      Some("2021-06-01T10:00:00.1234567Z".to_owned())
    );
  }
}
