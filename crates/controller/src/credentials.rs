//! Account keys carried in request secrets or kept in the secret store.

use crate::{
  cloud::SecretStore,
  error::{Error, Result},
};
use std::collections::HashMap;
use tracing::{debug, info};

pub const ACCOUNT_NAME_FIELD: &str = "azurestorageaccountname";
pub const ACCOUNT_KEY_FIELD: &str = "azurestorageaccountkey";
const SHORT_ACCOUNT_NAME_FIELD: &str = "accountname";
const SHORT_ACCOUNT_KEY_FIELD: &str = "accountkey";

const SECRET_NAME_PREFIX: &str = "azure-storage-account-";
const SECRET_NAME_SUFFIX: &str = "-secret";

/// Name of the secret holding the key of `account`, unless one is given.
pub fn secret_name(explicit: Option<&str>, account: &str) -> String {
  match explicit {
    Some(name) if !name.is_empty() => name.to_owned(),
    _ => format!("{}{}{}", SECRET_NAME_PREFIX, account, SECRET_NAME_SUFFIX),
  }
}

fn field<'a>(secrets: &'a HashMap<String, String>, long: &str, short: &str) -> Option<&'a str> {
  secrets
    .iter()
    .find(|(k, v)| {
      !v.is_empty() && (k.eq_ignore_ascii_case(long) || k.eq_ignore_ascii_case(short))
    })
    .map(|(_, v)| v.as_str())
}

/// Account name, when present, and key from a secret map.
pub fn account_key_from_secrets(secrets: &HashMap<String, String>) -> Result<(Option<String>, String)> {
  let key = field(secrets, ACCOUNT_KEY_FIELD, SHORT_ACCOUNT_KEY_FIELD).ok_or_else(|| {
    Error::validation(format!(
      "could not find {} or {} field in secrets",
      SHORT_ACCOUNT_KEY_FIELD, ACCOUNT_KEY_FIELD
    ))
  })?;
  let name = field(secrets, ACCOUNT_NAME_FIELD, SHORT_ACCOUNT_NAME_FIELD).map(str::to_owned);

  Ok((name, key.to_owned()))
}

pub async fn account_key_from_store(
  store: &dyn SecretStore,
  namespace: &str,
  name: &str,
) -> Result<String> {
  let secrets = store.get_secret(namespace, name).await.map_err(|err| {
    Error::backend(format!(
      "could not get secret({}) in namespace({}): {}",
      name, namespace, err
    ))
  })?;

  account_key_from_secrets(&secrets).map(|(_, key)| key)
}

/// Writes the account key as a secret and returns the secret name. Without a
/// store nothing is written and the returned name is empty.
pub async fn store_account_key(
  store: Option<&dyn SecretStore>,
  namespace: &str,
  name: &str,
  account: &str,
  key: &str,
) -> Result<String> {
  let store = match store {
    Some(store) => store,
    None => {
      debug!(account, "no secret store configured, not storing account key");
      return Ok(String::new());
    }
  };

  if account.is_empty() || key.is_empty() {
    return Err(Error::validation(format!(
      "the account info is not enough, accountName({}), accountKey({})",
      account,
      if key.is_empty() { "" } else { "<redacted>" }
    )));
  }

  let mut data = HashMap::new();
  data.insert(ACCOUNT_NAME_FIELD.to_owned(), account.to_owned());
  data.insert(ACCOUNT_KEY_FIELD.to_owned(), key.to_owned());

  store
    .put_secret(namespace, name, data)
    .await
    .map_err(|err| {
      Error::backend(format!(
        "failed to store storage account key: {}",
        err
      ))
    })?;

  info!(account, namespace, secret = name, "stored account key");
  Ok(name.to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cloud::fake::FakeCloud;
  use test_case::test_case;

  fn secrets(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
      .iter()
      .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
      .collect()
  }

  #[test_case(None, "acct" => "azure-storage-account-acct-secret" ; "templated")]
  #[test_case(Some(""), "acct" => "azure-storage-account-acct-secret" ; "empty override")]
  #[test_case(Some("mine"), "acct" => "mine" ; "override")]
  fn names(explicit: Option<&str>, account: &str) -> String {
    secret_name(explicit, account)
  }

  #[test_case(&[("azurestorageaccountname", "a"), ("azurestorageaccountkey", "k")] => Ok((Some("a".to_owned()), "k".to_owned())) ; "long fields")]
  #[test_case(&[("AccountName", "a"), ("AccountKey", "k")] => Ok((Some("a".to_owned()), "k".to_owned())) ; "short fields")]
  #[test_case(&[("accountkey", "k")] => Ok((None, "k".to_owned())) ; "key only")]
  #[test_case(&[("accountname", "a")] => Err("could not find accountkey or azurestorageaccountkey field in secrets".to_owned()) ; "missing key")]
  fn from_secrets(pairs: &[(&str, &str)]) -> std::result::Result<(Option<String>, String), String> {
    account_key_from_secrets(&secrets(pairs)).map_err(|e| e.to_string())
  }

  #[tokio::test]
  async fn store_without_secret_store_is_skipped() {
    let name = store_account_key(None, "default", "secret", "", "").await.unwrap();
    assert_eq!(name, "");
  }

  #[tokio::test]
  async fn store_requires_account_info() {
    let fake = FakeCloud::new();
    let err = store_account_key(Some(&fake), "default", "secret", "acct", "")
      .await
      .unwrap_err();

    assert_eq!(
      err.to_string(),
      "the account info is not enough, accountName(acct), accountKey()"
    );
  }

  #[tokio::test]
  async fn stored_key_round_trips() {
    let fake = FakeCloud::new();
    store_account_key(Some(&fake), "ns", "secret", "acct", "key")
      .await
      .unwrap();

    let key = account_key_from_store(&fake, "ns", "secret").await.unwrap();
    assert_eq!(key, "key");
  }
}
