//! Storage class parameters.
//!
//! Keys are matched case-insensitively against [`PARAMETERS`]; a key that is
//! not in the table fails the request.

use crate::error::{Error, Result};
use lazy_static::lazy_static;
use std::{
  collections::{BTreeMap, HashMap},
  fmt,
};

pub const PVC_NAME_KEY: &str = "csi.storage.k8s.io/pvc/name";
pub const PVC_NAMESPACE_KEY: &str = "csi.storage.k8s.io/pvc/namespace";
pub const PV_NAME_KEY: &str = "csi.storage.k8s.io/pv/name";

pub const DEFAULT_SECRET_NAMESPACE: &str = "default";
pub const MINIMUM_ACCOUNT_QUOTA_GIB: u64 = 100;

const SUPPORTED_FS_TYPES: [&str; 7] = ["cifs", "smb", "nfs", "ext4", "ext3", "ext2", "xfs"];
const DISK_FS_TYPES: [&str; 4] = ["ext4", "ext3", "ext2", "xfs"];
const ACCESS_TIERS: [&str; 4] = ["Cool", "Hot", "Premium", "TransactionOptimized"];
const ROOT_SQUASH_TYPES: [&str; 3] = ["AllSquash", "NoRootSquash", "RootSquash"];
const FS_GROUP_CHANGE_POLICIES: [&str; 3] = ["None", "Always", "OnRootMismatch"];
const PRIVATE_ENDPOINT: &str = "privateendpoint";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
  Smb,
  Nfs,
}

impl fmt::Display for Protocol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Protocol::Smb => "smb",
      Protocol::Nfs => "nfs",
    })
  }
}

/// Storage class parameters after parsing, before validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StorageClassParameters {
  pub sku: Option<String>,
  pub location: Option<String>,
  pub storage_account: Option<String>,
  pub resource_group: Option<String>,
  pub subscription_id: Option<String>,
  pub share_name: Option<String>,
  pub share_name_prefix: Option<String>,
  pub disk_name: Option<String>,
  pub fs_type: Option<String>,
  pub protocol: Option<String>,
  pub account_quota: Option<u64>,
  pub mount_permissions: Option<u32>,
  pub root_squash: Option<String>,
  pub access_tier: Option<String>,
  pub fs_group_change_policy: Option<String>,
  pub store_account_key: bool,
  pub secret_name: Option<String>,
  pub secret_namespace: Option<String>,
  pub tags: BTreeMap<String, String>,
  pub match_tags: bool,
  pub select_random_matching_account: bool,
  pub get_latest_account_key: bool,
  pub network_endpoint_type: Option<String>,
  pub vnet_resource_group: Option<String>,
  pub vnet_name: Option<String>,
  pub subnet_name: Option<String>,
  pub allow_shared_key_access: Option<bool>,
  pub disable_delete_retention_policy: bool,
  pub enable_large_file_shares: Option<bool>,
  pub storage_endpoint_suffix: Option<String>,
  pub pvc_name: Option<String>,
  pub pvc_namespace: Option<String>,
  pub pv_name: Option<String>,
}

type Setter = fn(&mut StorageClassParameters, &str, String) -> Result<()>;

fn text(value: String) -> Option<String> {
  Some(value).filter(|v| !v.is_empty())
}

fn invalid_value(key: &str, value: &str) -> Error {
  Error::validation(format!("invalid {}: {} in storage class", key, value))
}

/// Accepts the spellings `strconv.ParseBool` style configs use.
pub fn parse_bool(key: &str, value: &str) -> Result<bool> {
  match value {
    "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
    "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
    _ => Err(invalid_value(key, value)),
  }
}

/// Parses `key1=value1,key2=value2`.
pub fn parse_tags(value: &str) -> Result<BTreeMap<String, String>> {
  let invalid = || {
    Error::validation(format!(
      "Tags '{}' are invalid, the format should like: 'key1=value1,key2=value2'",
      value
    ))
  };

  let mut tags = BTreeMap::new();
  for pair in value.split(',').filter(|p| !p.trim().is_empty()) {
    let mut kv = pair.splitn(2, '=');
    match (kv.next().map(str::trim), kv.next().map(str::trim)) {
      (Some(k), Some(v)) if !k.is_empty() => {
        tags.insert(k.to_owned(), v.to_owned());
      }
      _ => return Err(invalid()),
    }
  }

  Ok(tags)
}

lazy_static! {
  /// Recognized keys, lower-cased, and how each one lands in the record.
  pub static ref PARAMETERS: HashMap<&'static str, Setter> = {
    let mut m: HashMap<&'static str, Setter> = HashMap::new();
    m.insert("skuname", |p, _, v| { p.sku = text(v); Ok(()) });
    m.insert("storageaccounttype", |p, _, v| { p.sku = text(v); Ok(()) });
    m.insert("location", |p, _, v| { p.location = text(v); Ok(()) });
    m.insert("storageaccount", |p, _, v| { p.storage_account = text(v); Ok(()) });
    m.insert("resourcegroup", |p, _, v| { p.resource_group = text(v); Ok(()) });
    m.insert("subscriptionid", |p, _, v| { p.subscription_id = text(v); Ok(()) });
    m.insert("sharename", |p, _, v| { p.share_name = text(v); Ok(()) });
    m.insert("sharenameprefix", |p, _, v| { p.share_name_prefix = text(v); Ok(()) });
    m.insert("diskname", |p, _, v| { p.disk_name = text(v); Ok(()) });
    m.insert("fstype", |p, _, v| { p.fs_type = text(v.to_lowercase()); Ok(()) });
    m.insert("protocol", |p, _, v| { p.protocol = text(v.to_lowercase()); Ok(()) });
    m.insert("accountquota", |p, k, v| {
      p.account_quota = Some(v.parse().map_err(|_| invalid_value(k, &v))?);
      Ok(())
    });
    m.insert("mountpermissions", |p, _, v| {
      let perm = u32::from_str_radix(&v, 8).map_err(|_| {
        Error::validation(format!("invalid mountPermissions {} in storage class", v))
      })?;
      p.mount_permissions = Some(perm);
      Ok(())
    });
    m.insert("rootsquashtype", |p, _, v| { p.root_squash = text(v); Ok(()) });
    m.insert("accesstier", |p, _, v| { p.access_tier = text(v); Ok(()) });
    m.insert("shareaccesstier", |p, _, v| { p.access_tier = text(v); Ok(()) });
    m.insert("fsgroupchangepolicy", |p, _, v| { p.fs_group_change_policy = text(v); Ok(()) });
    m.insert("storeaccountkey", |p, k, v| { p.store_account_key = parse_bool(k, &v)?; Ok(()) });
    m.insert("secretname", |p, _, v| { p.secret_name = text(v); Ok(()) });
    m.insert("secretnamespace", |p, _, v| { p.secret_namespace = text(v); Ok(()) });
    m.insert("tags", |p, _, v| { p.tags = parse_tags(&v)?; Ok(()) });
    m.insert("matchtags", |p, k, v| { p.match_tags = parse_bool(k, &v)?; Ok(()) });
    m.insert("selectrandommatchingaccount", |p, k, v| {
      p.select_random_matching_account = parse_bool(k, &v)?;
      Ok(())
    });
    m.insert("getlatestaccountkey", |p, k, v| {
      p.get_latest_account_key = parse_bool(k, &v)?;
      Ok(())
    });
    m.insert("networkendpointtype", |p, _, v| { p.network_endpoint_type = text(v.to_lowercase()); Ok(()) });
    m.insert("vnetresourcegroup", |p, _, v| { p.vnet_resource_group = text(v); Ok(()) });
    m.insert("vnetname", |p, _, v| { p.vnet_name = text(v); Ok(()) });
    m.insert("subnetname", |p, _, v| { p.subnet_name = text(v); Ok(()) });
    m.insert("allowsharedkeyaccess", |p, k, v| {
      p.allow_shared_key_access = Some(parse_bool(k, &v)?);
      Ok(())
    });
    m.insert("disabledeleteretentionpolicy", |p, k, v| {
      p.disable_delete_retention_policy = parse_bool(k, &v)?;
      Ok(())
    });
    m.insert("enablelargefileshares", |p, k, v| {
      p.enable_large_file_shares = Some(parse_bool(k, &v)?);
      Ok(())
    });
    m.insert("storageendpointsuffix", |p, _, v| { p.storage_endpoint_suffix = text(v); Ok(()) });
    m.insert(PVC_NAME_KEY, |p, _, v| { p.pvc_name = text(v); Ok(()) });
    m.insert(PVC_NAMESPACE_KEY, |p, _, v| { p.pvc_namespace = text(v); Ok(()) });
    m.insert(PV_NAME_KEY, |p, _, v| { p.pv_name = text(v); Ok(()) });
    m
  };
}

/// Driver-level settings that decide whether a parameter set is acceptable.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext<'a> {
  pub enable_vhd: bool,
  pub subscription_id: &'a str,
}

impl StorageClassParameters {
  /// Parses keys in sorted order so the first reported error is stable.
  pub fn parse(parameters: &HashMap<String, String>) -> Result<Self> {
    let sorted: BTreeMap<String, &String> = parameters
      .iter()
      .map(|(k, v)| (k.to_lowercase(), v))
      .collect();

    let mut parsed = StorageClassParameters {
      store_account_key: true,
      ..Default::default()
    };

    for (key, value) in sorted {
      let setter = PARAMETERS.get(key.as_str()).ok_or_else(|| {
        Error::validation(format!("invalid parameter {:?} in storage class", key))
      })?;
      setter(&mut parsed, &key, value.clone())?;
    }

    Ok(parsed)
  }

  pub fn protocol(&self) -> Protocol {
    match (self.protocol.as_deref(), self.fs_type.as_deref()) {
      (Some("nfs"), _) | (_, Some("nfs")) => Protocol::Nfs,
      _ => Protocol::Smb,
    }
  }

  /// True when the volume is a raw disk image inside the share.
  pub fn is_disk(&self) -> bool {
    self
      .fs_type
      .as_deref()
      .map_or(false, |fs| DISK_FS_TYPES.contains(&fs))
  }

  pub fn is_premium(&self) -> bool {
    self.sku.as_deref().map_or(false, is_premium_sku)
  }

  pub fn use_private_endpoint(&self) -> bool {
    self.network_endpoint_type.as_deref() == Some(PRIVATE_ENDPOINT)
  }

  pub fn secret_namespace(&self) -> &str {
    self
      .secret_namespace
      .as_deref()
      .unwrap_or(DEFAULT_SECRET_NAMESPACE)
  }

  pub fn subnets(&self) -> Vec<String> {
    self
      .subnet_name
      .as_deref()
      .map(|s| {
        s.split(',')
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .map(str::to_owned)
          .collect()
      })
      .unwrap_or_default()
  }

  /// Metadata recorded on the share for the orchestrator-injected keys.
  pub fn share_metadata(&self) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    let entries = [
      ("pvcname", &self.pvc_name),
      ("pvcnamespace", &self.pvc_namespace),
      ("pvname", &self.pv_name),
    ];
    for (key, value) in entries.iter() {
      if let Some(value) = value {
        metadata.insert((*key).to_owned(), value.clone());
      }
    }

    metadata
  }

  /// Checks cross-field constraints. The first failure wins.
  pub fn validate(&self, ctx: &ValidationContext<'_>) -> Result<()> {
    if let (true, Some(account)) = (self.match_tags, &self.storage_account) {
      return Err(Error::validation(format!(
        "matchTags must set as false when storageAccount({}) is provided",
        account
      )));
    }

    if let Some(fs) = self.fs_type.as_deref() {
      if DISK_FS_TYPES.contains(&fs) && !ctx.enable_vhd {
        return Err(Error::validation(
          "fsType storage class parameter enables experimental VDH disk feature which is currently disabled, use --enable-vhd driver option to enable it",
        ));
      }

      if !SUPPORTED_FS_TYPES.contains(&fs) {
        return Err(Error::validation(format!(
          "fsType({}) is not supported, supported fsType list: [{}]",
          fs,
          SUPPORTED_FS_TYPES.join(" ")
        )));
      }

      if self.protocol.as_deref() == Some("nfs") && fs != "nfs" {
        return Err(Error::validation(format!(
          "fsType({}) is not supported with protocol(nfs)",
          fs
        )));
      }
    }

    if let Some(protocol) = self.protocol.as_deref() {
      if protocol != "smb" && protocol != "nfs" {
        return Err(Error::validation(format!(
          "protocol({}) is not supported, supported protocol list: [smb nfs]",
          protocol
        )));
      }
    }

    if let (Protocol::Nfs, Some(sku)) = (self.protocol(), self.sku.as_deref()) {
      if !is_premium_sku(sku) {
        return Err(Error::validation(format!(
          "nfs protocol only supports premium storage, current account type: {}",
          sku
        )));
      }
    }

    one_of("shareAccessTier", "ShareAccessTier", &self.access_tier, &ACCESS_TIERS)?;
    one_of("rootSquashType", "RootSquashType", &self.root_squash, &ROOT_SQUASH_TYPES)?;
    one_of(
      "fsGroupChangePolicy",
      "fsGroupChangePolicy",
      &self.fs_group_change_policy,
      &FS_GROUP_CHANGE_POLICIES,
    )?;

    if let Some(prefix) = self.share_name_prefix.as_deref() {
      if !is_valid_share_name_prefix(prefix) {
        return Err(Error::validation(format!(
          "shareNamePrefix({}) can only contain lowercase letters, numbers, hyphens, and length should be less than 21",
          prefix
        )));
      }
    }

    if let Some(quota) = self.account_quota {
      if quota < MINIMUM_ACCOUNT_QUOTA_GIB {
        return Err(Error::validation(format!(
          "invalid accountQuota {} in storage class, minimum quota: {}",
          quota, MINIMUM_ACCOUNT_QUOTA_GIB
        )));
      }
    }

    if let Some(endpoint) = self.network_endpoint_type.as_deref() {
      if endpoint != PRIVATE_ENDPOINT {
        return Err(Error::validation(format!(
          "networkEndpointType({}) is not supported, supported networkEndpointType list: [{}]",
          endpoint, PRIVATE_ENDPOINT
        )));
      }

      if self.subnets().len() > 1 {
        return Err(Error::validation(format!(
          "subnetName({}) can only contain one subnet for private endpoint",
          self.subnet_name.as_deref().unwrap_or_default()
        )));
      }
    }

    if let Some(subscription) = self.subscription_id.as_deref() {
      if subscription != ctx.subscription_id {
        if self.resource_group.is_none() {
          return Err(Error::validation(format!(
            "resourceGroup must be provided in cross subscription({})",
            subscription
          )));
        }

        if !self.store_account_key {
          return Err(Error::validation(format!(
            "storeAccountKey must set as true in cross subscription({})",
            subscription
          )));
        }
      }
    }

    if self.allow_shared_key_access == Some(false) && self.store_account_key {
      return Err(Error::validation(
        "storeAccountKey is not supported for account with shared access key disabled",
      ));
    }

    Ok(())
  }
}

pub fn is_premium_sku(sku: &str) -> bool {
  sku.to_lowercase().starts_with("premium")
}

fn one_of(field: &str, list: &str, value: &Option<String>, allowed: &[&str]) -> Result<()> {
  match value.as_deref() {
    Some(v) if !allowed.contains(&v) => Err(Error::validation(format!(
      "{}({}) is not supported, supported {} list: [{}]",
      field,
      v,
      list,
      allowed.join(" ")
    ))),
    _ => Ok(()),
  }
}

fn is_valid_share_name_prefix(prefix: &str) -> bool {
  prefix.len() < 21
    && prefix
      .chars()
      .next()
      .map_or(false, |c| c.is_ascii_lowercase() || c.is_ascii_digit())
    && prefix
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
      .iter()
      .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
      .collect()
  }

  fn validate(pairs: &[(&str, &str)]) -> std::result::Result<(), String> {
    StorageClassParameters::parse(&params(pairs))
      .and_then(|p| {
        p.validate(&ValidationContext {
          enable_vhd: false,
          subscription_id: "sub",
        })
      })
      .map_err(|e| e.to_string())
  }

  #[test]
  fn keys_are_case_insensitive() {
    let p = StorageClassParameters::parse(&params(&[
      ("SkuName", "Premium_LRS"),
      ("storageAccountType", "Premium_ZRS"),
      ("ShareName", "share"),
    ]))
    .unwrap();

    // Keys are applied in sorted order, so the alias wins.
    assert_eq!(p.sku.as_deref(), Some("Premium_ZRS"));
    assert_eq!(p.share_name.as_deref(), Some("share"));
    assert!(p.store_account_key);
  }

  #[test]
  fn defaults() {
    let p = StorageClassParameters::parse(&HashMap::new()).unwrap();
    assert_eq!(p.protocol(), Protocol::Smb);
    assert_eq!(p.secret_namespace(), "default");
    assert!(!p.is_disk());
  }

  #[test]
  fn orchestrator_keys_become_metadata() {
    let p = StorageClassParameters::parse(&params(&[
      (PVC_NAME_KEY, "pvc"),
      (PV_NAME_KEY, "pv"),
    ]))
    .unwrap();

    let metadata = p.share_metadata();
    assert_eq!(metadata.get("pvcname").map(String::as_str), Some("pvc"));
    assert_eq!(metadata.get("pvname").map(String::as_str), Some("pv"));
    assert!(!metadata.contains_key("pvcnamespace"));
  }

  #[test_case(&[("invalidparameter", "x")] => r#"invalid parameter "invalidparameter" in storage class"# ; "unknown key")]
  #[test_case(&[("selectRandomMatchingAccount", "invalid")] => "invalid selectrandommatchingaccount: invalid in storage class" ; "bad bool")]
  #[test_case(&[("getLatestAccountKey", "invalid")] => "invalid getlatestaccountkey: invalid in storage class" ; "bad latest key flag")]
  #[test_case(&[("mountPermissions", "0abc")] => "invalid mountPermissions 0abc in storage class" ; "bad permissions")]
  #[test_case(&[("tags", "tags")] => "Tags 'tags' are invalid, the format should like: 'key1=value1,key2=value2'" ; "bad tags")]
  #[test_case(&[("storageAccount", "abc"), ("matchTags", "true")] => "matchTags must set as false when storageAccount(abc) is provided" ; "match tags with account")]
  #[test_case(&[("fsType", "ext4")] => "fsType storage class parameter enables experimental VDH disk feature which is currently disabled, use --enable-vhd driver option to enable it" ; "vhd disabled")]
  #[test_case(&[("fsType", "test_fs")] => "fsType(test_fs) is not supported, supported fsType list: [cifs smb nfs ext4 ext3 ext2 xfs]" ; "unknown fs")]
  #[test_case(&[("protocol", "test_protocol")] => "protocol(test_protocol) is not supported, supported protocol list: [smb nfs]" ; "unknown protocol")]
  #[test_case(&[("protocol", "nfs"), ("skuName", "Standard_LRS")] => "nfs protocol only supports premium storage, current account type: Standard_LRS" ; "nfs on standard")]
  #[test_case(&[("shareAccessTier", "test_accessTier")] => "shareAccessTier(test_accessTier) is not supported, supported ShareAccessTier list: [Cool Hot Premium TransactionOptimized]" ; "access tier")]
  #[test_case(&[("rootSquashType", "test_rootSquashType")] => "rootSquashType(test_rootSquashType) is not supported, supported RootSquashType list: [AllSquash NoRootSquash RootSquash]" ; "root squash")]
  #[test_case(&[("fsGroupChangePolicy", "test_fsGroupChangePolicy")] => "fsGroupChangePolicy(test_fsGroupChangePolicy) is not supported, supported fsGroupChangePolicy list: [None Always OnRootMismatch]" ; "fs group policy")]
  #[test_case(&[("shareNamePrefix", "-invalid")] => "shareNamePrefix(-invalid) can only contain lowercase letters, numbers, hyphens, and length should be less than 21" ; "share prefix")]
  #[test_case(&[("accountQuota", "10")] => "invalid accountQuota 10 in storage class, minimum quota: 100" ; "account quota")]
  #[test_case(&[("networkEndpointType", "privateEndpoint"), ("subnetName", "subnet1,subnet2")] => "subnetName(subnet1,subnet2) can only contain one subnet for private endpoint" ; "private endpoint subnets")]
  #[test_case(&[("subscriptionID", "abc"), ("storeAccountKey", "false")] => "resourceGroup must be provided in cross subscription(abc)" ; "cross subscription rg")]
  #[test_case(&[("subscriptionID", "abc"), ("resourceGroup", "rg"), ("storeAccountKey", "false")] => "storeAccountKey must set as true in cross subscription(abc)" ; "cross subscription key")]
  #[test_case(&[("allowSharedKeyAccess", "false")] => "storeAccountKey is not supported for account with shared access key disabled" ; "shared key disabled")]
  fn rejects(pairs: &[(&str, &str)]) -> String {
    validate(pairs).unwrap_err()
  }

  #[test_case(&[] ; "empty")]
  #[test_case(&[("protocol", "nfs"), ("skuName", "Premium_LRS")] ; "nfs on premium")]
  #[test_case(&[("protocol", "nfs")] ; "nfs without sku")]
  #[test_case(&[("subscriptionID", "sub")] ; "same subscription")]
  #[test_case(&[("tags", "a=b, c=d"), ("matchTags", "true")] ; "match tags")]
  #[test_case(&[("allowSharedKeyAccess", "false"), ("storeAccountKey", "false")] ; "shared key disabled without storing")]
  fn accepts(pairs: &[(&str, &str)]) {
    validate(pairs).unwrap();
  }

  #[test]
  fn nfs_rejects_disk_filesystems_when_vhd_enabled() {
    let p = StorageClassParameters::parse(&params(&[("protocol", "nfs"), ("fsType", "ext4")]))
      .unwrap();
    let err = p
      .validate(&ValidationContext {
        enable_vhd: true,
        subscription_id: "",
      })
      .unwrap_err();

    assert_eq!(err.to_string(), "fsType(ext4) is not supported with protocol(nfs)");
  }

  #[test_case("a=b,c=d" => vec![("a".to_owned(), "b".to_owned()), ("c".to_owned(), "d".to_owned())] ; "two pairs")]
  #[test_case("" => Vec::<(String, String)>::new() ; "empty")]
  #[test_case("k=" => vec![("k".to_owned(), String::new())] ; "empty value")]
  fn tags(value: &str) -> Vec<(String, String)> {
    parse_tags(value).unwrap().into_iter().collect()
  }
}
