//! Account shared access signatures for the file service.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use url::form_urlencoded::byte_serialize;

pub const SAS_VERSION: &str = "2020-02-10";
const SERVICES: &str = "f";
const RESOURCE_TYPES: &str = "sco";
const PERMISSIONS: &str = "rwdlc";
const PROTOCOL: &str = "https";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SasError {
  #[error("decode account key: {0}")]
  DecodeKey(String),

  #[error("sign: {0}")]
  Sign(String),
}

fn encode(value: &str) -> String {
  byte_serialize(value.as_bytes()).collect()
}

/// Builds a query string granting read/write/delete/list/create on every
/// share of `account` until `expiry`.
pub fn account_sas(account: &str, key: &str, expiry: DateTime<Utc>) -> Result<String, SasError> {
  let key = STANDARD
    .decode(key.trim())
    .map_err(|err| SasError::DecodeKey(err.to_string()))?;
  let expiry = expiry.format("%Y-%m-%dT%H:%M:%SZ").to_string();

  let string_to_sign = [
    account,
    PERMISSIONS,
    SERVICES,
    RESOURCE_TYPES,
    "",
    &expiry,
    "",
    PROTOCOL,
    SAS_VERSION,
    "",
  ]
  .join("\n");

  let mut mac =
    Hmac::<Sha256>::new_from_slice(&key).map_err(|err| SasError::Sign(err.to_string()))?;
  mac.update(string_to_sign.as_bytes());
  let signature = STANDARD.encode(mac.finalize().into_bytes());

  Ok(format!(
    "sv={}&ss={}&srt={}&sp={}&se={}&spr={}&sig={}",
    SAS_VERSION,
    SERVICES,
    RESOURCE_TYPES,
    PERMISSIONS,
    encode(&expiry),
    PROTOCOL,
    encode(&signature)
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn signs_account_sas() {
    let expiry = Utc.with_ymd_and_hms(2021, 1, 1, 1, 0, 0).unwrap();
    let sas = account_sas("acct", "c2VjcmV0LWtleQ==", expiry).unwrap();

    assert_eq!(
      sas,
      "sv=2020-02-10&ss=f&srt=sco&sp=rwdlc&se=2021-01-01T01%3A00%3A00Z&spr=https\
       &sig=01%2Fb5Hh8iGL4dWF6D2vrhjCmCs%2BTGwyNpuCsbV%2FM4F4%3D"
    );
  }

  #[test]
  fn rejects_malformed_key() {
    let err = account_sas("acct", "not base64!", Utc::now()).unwrap_err();
    assert!(err.to_string().starts_with("decode account key: "));
  }
}
