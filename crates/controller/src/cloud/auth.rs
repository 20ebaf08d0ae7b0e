use super::{CloudError, CloudResult};
use crate::cache::TtlCache;
use serde::Deserialize;
use std::{fmt, time::Duration};
use tracing::debug;

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const TOKEN_KEY: &str = "token";
const EXPIRY_SLACK: Duration = Duration::from_secs(300);

/// How the controller authenticates against the management plane.
#[derive(Clone)]
pub enum Credential {
  ClientSecret {
    tenant_id: String,
    client_id: String,
    client_secret: String,
  },
  ManagedIdentity {
    client_id: Option<String>,
  },
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Credential::ClientSecret {
        tenant_id,
        client_id,
        ..
      } => f
        .debug_struct("ClientSecret")
        .field("tenant_id", tenant_id)
        .field("client_id", client_id)
        .field("client_secret", &"<redacted>")
        .finish(),
      Credential::ManagedIdentity { client_id } => f
        .debug_struct("ManagedIdentity")
        .field("client_id", client_id)
        .finish(),
    }
  }
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
  // The identity endpoint sends a string, the login endpoint a number.
  expires_in: serde_json::Value,
}

impl TokenResponse {
  fn lifetime(&self) -> Duration {
    let seconds = match &self.expires_in {
      serde_json::Value::Number(n) => n.as_u64(),
      serde_json::Value::String(s) => s.parse().ok(),
      _ => None,
    };

    Duration::from_secs(seconds.unwrap_or(3600))
  }
}

/// Fetches bearer tokens and keeps them until shortly before they expire.
#[derive(Debug)]
pub struct TokenProvider {
  credential: Credential,
  resource: String,
  authority: String,
  http: reqwest::Client,
  cache: TtlCache<String>,
}

impl TokenProvider {
  pub fn new(credential: Credential, resource: impl Into<String>, http: reqwest::Client) -> Self {
    TokenProvider {
      credential,
      resource: resource.into(),
      authority: DEFAULT_AUTHORITY.to_owned(),
      http,
      cache: TtlCache::new(Duration::from_secs(3600)),
    }
  }

  pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
    self.authority = authority.into();
    self
  }

  pub async fn token(&self) -> CloudResult<String> {
    if let Some(token) = self.cache.get(TOKEN_KEY) {
      return Ok(token);
    }

    let response = self.fetch().await?;
    let ttl = response.lifetime().saturating_sub(EXPIRY_SLACK);
    debug!(?ttl, "acquired management token");
    self
      .cache
      .set_with_ttl(TOKEN_KEY, response.access_token.clone(), ttl);
    Ok(response.access_token)
  }

  async fn fetch(&self) -> CloudResult<TokenResponse> {
    let request = match &self.credential {
      Credential::ClientSecret {
        tenant_id,
        client_id,
        client_secret,
      } => {
        let scope = format!("{}/.default", self.resource.trim_end_matches('/'));
        self
          .http
          .post(format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            tenant_id
          ))
          .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("scope", scope.as_str()),
          ])
      }
      Credential::ManagedIdentity { client_id } => {
        let mut query = vec![
          ("api-version", IMDS_API_VERSION),
          ("resource", self.resource.as_str()),
        ];
        if let Some(id) = client_id {
          query.push(("client_id", id.as_str()));
        }

        self
          .http
          .get(IMDS_TOKEN_ENDPOINT)
          .header("Metadata", "true")
          .query(&query)
      }
    };

    let response = request
      .send()
      .await
      .map_err(|err| CloudError::Other(format!("token request failed: {}", err)))?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(CloudError::Other(format!(
        "token request failed with status {}: {}",
        status, body
      )));
    }

    response
      .json()
      .await
      .map_err(|err| CloudError::Other(format!("invalid token response: {}", err)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  #[test_case(serde_json::json!(3599) => 3599 ; "number")]
  #[test_case(serde_json::json!("86399") => 86399 ; "string")]
  #[test_case(serde_json::json!(null) => 3600 ; "missing")]
  fn lifetime(expires_in: serde_json::Value) -> u64 {
    TokenResponse {
      access_token: String::new(),
      expires_in,
    }
    .lifetime()
    .as_secs()
  }

  #[test]
  fn client_secret_is_redacted() {
    let credential = Credential::ClientSecret {
      tenant_id: "tenant".into(),
      client_id: "client".into(),
      client_secret: "hunter2".into(),
    };

    let debug = format!("{:?}", credential);
    assert!(debug.contains("client"));
    assert!(!debug.contains("hunter2"));
  }

  #[tokio::test]
  async fn cached_token_is_reused() {
    let provider = TokenProvider::new(
      Credential::ManagedIdentity { client_id: None },
      "https://management.azure.com/",
      reqwest::Client::new(),
    );
    provider.cache.set(TOKEN_KEY, "cached".to_owned());

    assert_eq!(provider.token().await.unwrap(), "cached");
  }
}
