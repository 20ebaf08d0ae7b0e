//! Command line options and the cloud configuration file.

use crate::{
  cloud::Credential,
  copy::{CopyOptions, IdentitySettings},
  driver::DEFAULT_DRIVER_NAME,
  shares::{LimitFallback, Settings},
};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::{fs, io, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "unix:///csi/csi.sock";
pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "azurefile-controller")]
#[command(about = "CSI controller provisioning Azure file shares")]
pub struct DriverOptions {
  /// gRPC endpoint, unix://<path> or tcp://<host:port>.
  #[arg(long, env = "CSI_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
  pub endpoint: String,

  #[arg(long, env = "DRIVER_NAME", default_value = DEFAULT_DRIVER_NAME)]
  pub driver_name: String,

  /// Path to the JSON cloud configuration.
  #[arg(long, env = "AZURE_CREDENTIAL_FILE", default_value = "/etc/kubernetes/azure.json")]
  pub cloud_config: PathBuf,

  /// Allow ext4/ext3/ext2/xfs volumes backed by a VHD inside the share.
  #[arg(long, env = "ENABLE_VHD", default_value_t = false)]
  pub enable_vhd: bool,

  #[arg(long, env = "ACCOUNT_NAME_PREFIX", default_value = "f")]
  pub account_name_prefix: String,

  /// Seconds an account key stays cached.
  #[arg(long, env = "ACCOUNT_CACHE_TTL", default_value_t = 600)]
  pub account_cache_ttl: u64,

  /// Seconds between azcopy job status checks.
  #[arg(long, env = "COPY_POLL_INTERVAL", default_value_t = 5)]
  pub copy_poll_interval: u64,

  /// Seconds a volume copy may take before CreateVolume gives up on it.
  #[arg(long, env = "COPY_TIMEOUT", default_value_t = 300)]
  pub copy_timeout: u64,

  #[arg(long, env = "AZCOPY_PATH", default_value = "azcopy")]
  pub azcopy_path: String,

  #[arg(long, env = "AZCOPY_EXTRA_ARGS", value_delimiter = ' ', allow_hyphen_values = true)]
  pub azcopy_extra_args: Vec<String>,

  /// Authorize azcopy with SAS tokens instead of the controller identity.
  #[arg(long, env = "USE_SAS_TOKEN", default_value_t = true, action = clap::ArgAction::Set)]
  pub use_sas_token: bool,

  /// Extra share creation attempts after an account reports it is full.
  #[arg(long, env = "ACCOUNT_LIMIT_RETRIES", default_value_t = 1)]
  pub account_limit_retries: u32,

  #[arg(long, env = "ACCOUNT_LIMIT_FALLBACK", default_value = "disjoint")]
  pub account_limit_fallback: LimitFallback,

  #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
  pub log_format: LogFormat,
}

impl DriverOptions {
  pub fn account_cache_ttl(&self) -> Duration {
    Duration::from_secs(self.account_cache_ttl)
  }

  pub fn copy_options(&self) -> CopyOptions {
    CopyOptions {
      azcopy: self.azcopy_path.clone(),
      extra_args: self.azcopy_extra_args.clone(),
      poll_interval: Duration::from_secs(self.copy_poll_interval),
      timeout: Duration::from_secs(self.copy_timeout),
      use_sas_token: self.use_sas_token,
    }
  }

  pub fn settings(&self, cloud: &CloudConfig) -> Settings {
    Settings {
      subscription_id: cloud.subscription_id.clone(),
      resource_group: cloud.resource_group.clone(),
      location: non_empty(&cloud.location),
      endpoint_suffix: cloud.storage_endpoint_suffix.clone(),
      vnet_resource_group: non_empty(&cloud.vnet_resource_group),
      vnet_name: non_empty(&cloud.vnet_name),
      subnet_name: non_empty(&cloud.subnet_name),
      enable_vhd: self.enable_vhd,
      account_limit_retries: self.account_limit_retries,
      account_limit_fallback: self.account_limit_fallback,
    }
  }
}

fn non_empty(value: &str) -> Option<String> {
  Some(value.trim())
    .filter(|v| !v.is_empty())
    .map(str::to_owned)
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read cloud config {path:?}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse cloud config: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("cloud config has no credentials: set aadClientId and aadClientSecret, or useManagedIdentityExtension")]
  MissingCredential,
}

fn default_endpoint_suffix() -> String {
  DEFAULT_ENDPOINT_SUFFIX.to_owned()
}

fn default_resource_manager_endpoint() -> String {
  DEFAULT_RESOURCE_MANAGER_ENDPOINT.to_owned()
}

/// The cloud provider configuration file.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudConfig {
  pub tenant_id: String,
  pub subscription_id: String,
  pub aad_client_id: String,
  pub aad_client_secret: String,
  pub use_managed_identity_extension: bool,
  #[serde(rename = "userAssignedIdentityID")]
  pub user_assigned_identity_id: String,
  pub resource_group: String,
  pub location: String,
  pub vnet_name: String,
  pub vnet_resource_group: String,
  pub subnet_name: String,
  pub storage_endpoint_suffix: String,
  pub resource_manager_endpoint: String,
}

impl std::fmt::Debug for CloudConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CloudConfig")
      .field("tenant_id", &self.tenant_id)
      .field("subscription_id", &self.subscription_id)
      .field("aad_client_id", &self.aad_client_id)
      .field("aad_client_secret", &"<redacted>")
      .field("use_managed_identity_extension", &self.use_managed_identity_extension)
      .field("user_assigned_identity_id", &self.user_assigned_identity_id)
      .field("resource_group", &self.resource_group)
      .field("location", &self.location)
      .field("vnet_name", &self.vnet_name)
      .field("vnet_resource_group", &self.vnet_resource_group)
      .field("subnet_name", &self.subnet_name)
      .field("storage_endpoint_suffix", &self.storage_endpoint_suffix)
      .field("resource_manager_endpoint", &self.resource_manager_endpoint)
      .finish()
  }
}

impl CloudConfig {
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    let mut config: CloudConfig = serde_json::from_str(json)?;
    if config.storage_endpoint_suffix.is_empty() {
      config.storage_endpoint_suffix = default_endpoint_suffix();
    }
    if config.resource_manager_endpoint.is_empty() {
      config.resource_manager_endpoint = default_resource_manager_endpoint();
    }

    Ok(config)
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_owned(),
      source,
    })?;

    CloudConfig::from_json(&json)
  }

  /// Management plane credential. Managed identity wins when enabled.
  pub fn credential(&self) -> Result<Credential, ConfigError> {
    if self.use_managed_identity_extension {
      return Ok(Credential::ManagedIdentity {
        client_id: non_empty(&self.user_assigned_identity_id),
      });
    }

    if self.aad_client_id.is_empty() || self.aad_client_secret.is_empty() {
      return Err(ConfigError::MissingCredential);
    }

    Ok(Credential::ClientSecret {
      tenant_id: self.tenant_id.clone(),
      client_id: self.aad_client_id.clone(),
      client_secret: self.aad_client_secret.clone(),
    })
  }

  pub fn identity(&self) -> IdentitySettings {
    IdentitySettings {
      tenant_id: self.tenant_id.clone(),
      client_id: self.aad_client_id.clone(),
      client_secret: self.aad_client_secret.clone(),
      use_managed_identity: self.use_managed_identity_extension,
      user_assigned_identity_id: self.user_assigned_identity_id.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  fn parse(args: &[&str]) -> DriverOptions {
    let mut argv = vec!["azurefile-controller"];
    argv.extend_from_slice(args);
    DriverOptions::try_parse_from(argv).unwrap()
  }

  #[test]
  fn defaults() {
    let options = parse(&[]);
    assert_eq!(options.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(options.driver_name, "file.csi.azure.com");
    assert!(!options.enable_vhd);
    assert!(options.use_sas_token);
    assert_eq!(options.account_limit_retries, 1);
    assert_eq!(options.account_limit_fallback, LimitFallback::Disjoint);
    assert_eq!(options.log_format, LogFormat::Text);
    assert_eq!(options.copy_options().timeout, Duration::from_secs(300));
    assert_eq!(options.account_cache_ttl(), Duration::from_secs(600));
  }

  #[test]
  fn overrides() {
    let options = parse(&[
      "--enable-vhd",
      "--use-sas-token",
      "false",
      "--account-limit-fallback",
      "same",
      "--log-format",
      "json",
      "--azcopy-extra-args",
      "--log-level=ERROR --cap-mbps=100",
    ]);

    assert!(options.enable_vhd);
    assert!(!options.use_sas_token);
    assert_eq!(options.account_limit_fallback, LimitFallback::Same);
    assert_eq!(options.log_format, LogFormat::Json);
    assert_eq!(
      options.copy_options().extra_args,
      vec!["--log-level=ERROR", "--cap-mbps=100"]
    );
  }

  #[test]
  fn invalid_fallback_is_rejected() {
    let err = DriverOptions::try_parse_from(vec![
      "azurefile-controller",
      "--account-limit-fallback",
      "random",
    ])
    .unwrap_err();
    assert!(err.to_string().contains("invalid account limit fallback"));
  }

  #[test]
  fn cloud_config_fields() {
    let config = CloudConfig::from_json(
      r#"{
        "tenantId": "tenant",
        "subscriptionId": "sub",
        "aadClientId": "client",
        "aadClientSecret": "secret",
        "resourceGroup": "rg",
        "location": "westeurope",
        "vnetName": "vnet",
        "subnetName": "subnet",
        "userAssignedIdentityID": "identity",
        "cloud": "AzurePublicCloud"
      }"#,
    )
    .unwrap();

    assert_eq!(config.storage_endpoint_suffix, DEFAULT_ENDPOINT_SUFFIX);
    assert_eq!(config.resource_manager_endpoint, DEFAULT_RESOURCE_MANAGER_ENDPOINT);
    assert_eq!(config.user_assigned_identity_id, "identity");
    assert!(!format!("{:?}", config).contains("\"secret\""));

    let settings = parse(&[]).settings(&config);
    assert_eq!(settings.subscription_id, "sub");
    assert_eq!(settings.location.as_deref(), Some("westeurope"));
    assert_eq!(settings.vnet_resource_group, None);
    assert_eq!(settings.subnet_name.as_deref(), Some("subnet"));
  }

  #[test_case(r#"{"aadClientId": "c", "aadClientSecret": "s", "tenantId": "t"}"# => "ClientSecret" ; "service principal")]
  #[test_case(r#"{"useManagedIdentityExtension": true, "aadClientSecret": "s"}"# => "ManagedIdentity" ; "managed identity wins")]
  fn credential_kind(json: &str) -> &'static str {
    match CloudConfig::from_json(json).unwrap().credential().unwrap() {
      Credential::ClientSecret { .. } => "ClientSecret",
      Credential::ManagedIdentity { .. } => "ManagedIdentity",
    }
  }

  #[test]
  fn missing_credential() {
    let err = CloudConfig::from_json("{}").unwrap().credential().unwrap_err();
    assert!(matches!(err, ConfigError::MissingCredential));
  }
}
