use super::{CloudError, CloudResult, FileClient, FileTarget, Share, ShareSnapshot, ShareTarget, Tags};
use crate::sas::{account_sas, SAS_VERSION};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::form_urlencoded::byte_serialize;

const SAS_LIFETIME_MINUTES: i64 = 30;
const META_PREFIX: &str = "x-ms-meta-";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
  #[serde(default)]
  shares: SharesXml,
  #[serde(default)]
  next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SharesXml {
  #[serde(rename = "Share", default)]
  items: Vec<ShareXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShareXml {
  name: String,
  #[serde(default)]
  snapshot: Option<String>,
  #[serde(default)]
  metadata: Tags,
}

fn encode(value: &str) -> String {
  byte_serialize(value.as_bytes()).collect()
}

/// Snapshot times are RFC 3339 with seven fractional digits.
fn snapshot_time(tag: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(tag)
    .map(|t| t.with_timezone(&Utc))
    .unwrap_or_else(|_| Utc::now())
}

/// Snapshots of `share` in one page of a share listing, and the marker of
/// the next page.
fn parse_snapshot_page(xml: &str, share: &str) -> CloudResult<(Vec<ShareSnapshot>, Option<String>)> {
  let page: EnumerationResults = quick_xml::de::from_str(xml)
    .map_err(|err| CloudError::Other(format!("unexpected share listing: {}", err)))?;

  let snapshots = page
    .shares
    .items
    .into_iter()
    .filter(|s| s.name == share)
    .filter_map(|s| {
      let tag = s.snapshot.filter(|t| !t.is_empty())?;
      Some(ShareSnapshot {
        created: snapshot_time(&tag),
        tag,
        metadata: s.metadata,
      })
    })
    .collect();

  Ok((snapshots, page.next_marker.filter(|m| !m.is_empty())))
}

fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
  response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// File data-plane client authenticated with a short-lived account SAS.
#[derive(Debug, Clone)]
pub struct SasFileClient {
  http: reqwest::Client,
}

impl SasFileClient {
  pub fn new(http: reqwest::Client) -> Self {
    SasFileClient { http }
  }

  fn url(account: &str, key: &str, suffix: &str, path: &str, query: &str) -> CloudResult<String> {
    let sas = account_sas(
      account,
      key,
      Utc::now() + Duration::minutes(SAS_LIFETIME_MINUTES),
    )
    .map_err(|err| CloudError::Other(err.to_string()))?;

    Ok(format!(
      "https://{}.file.{}/{}?{}{}",
      account, suffix, path, query, sas
    ))
  }

  fn file_url(target: &FileTarget, query: &str) -> CloudResult<String> {
    Self::url(
      &target.account,
      &target.account_key,
      &target.endpoint_suffix,
      &format!("{}/{}", target.share, target.path),
      query,
    )
  }

  fn share_url(share: &ShareTarget, query: &str) -> CloudResult<String> {
    Self::url(
      &share.account,
      &share.account_key,
      &share.endpoint_suffix,
      &share.share,
      query,
    )
  }

  async fn send(&self, what: &str, request: RequestBuilder) -> CloudResult<Response> {
    let response = request
      .header("x-ms-version", SAS_VERSION)
      .send()
      .await
      .map_err(|err| CloudError::Other(err.to_string()))?;

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
      StatusCode::NOT_FOUND => Err(CloudError::NotFound(body)),
      StatusCode::FORBIDDEN => Err(CloudError::Unauthorized(format!(
        "{} was not authorized: {}",
        what, body
      ))),
      _ => Err(CloudError::from_message(format!(
        "{} failed with status {}: {}",
        what, status, body
      ))),
    }
  }

  async fn execute(&self, target: &FileTarget, request: RequestBuilder) -> CloudResult<()> {
    let what = format!("file {} in share {}", target.path, target.share);
    self.send(&what, request).await.map(drop)
  }
}

#[async_trait]
impl FileClient for SasFileClient {
  async fn create_file(&self, target: &FileTarget, size: u64) -> CloudResult<()> {
    debug!(?target, size, "creating file");
    let request = self
      .http
      .put(Self::file_url(target, "")?)
      .header("x-ms-type", "file")
      .header("x-ms-content-length", size.to_string())
      .header("Content-Length", "0");
    self.execute(target, request).await
  }

  async fn put_range(&self, target: &FileTarget, offset: u64, data: &[u8]) -> CloudResult<()> {
    if data.is_empty() {
      return Ok(());
    }

    let end = offset + data.len() as u64 - 1;
    let request = self
      .http
      .put(Self::file_url(target, "comp=range&")?)
      .header("x-ms-write", "update")
      .header("x-ms-range", format!("bytes={}-{}", offset, end))
      .body(data.to_vec());
    self.execute(target, request).await
  }

  async fn share_properties(&self, share: &ShareTarget) -> CloudResult<Share> {
    let request = self.http.get(Self::share_url(share, "restype=share&")?);
    let response = self.send(&format!("share {}", share.share), request).await?;

    let metadata = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        let key = name.as_str().strip_prefix(META_PREFIX)?;
        Some((key.to_owned(), value.to_str().ok()?.to_owned()))
      })
      .collect();

    Ok(Share {
      name: share.share.clone(),
      quota_gib: header(&response, "x-ms-share-quota").and_then(|q| q.parse().ok()),
      protocol: header(&response, "x-ms-enabled-protocols").map(str::to_lowercase),
      access_tier: header(&response, "x-ms-access-tier").map(str::to_owned),
      metadata,
    })
  }

  async fn remove_share(&self, share: &ShareTarget) -> CloudResult<()> {
    debug!(?share, "deleting share");
    let request = self
      .http
      .delete(Self::share_url(share, "restype=share&")?)
      .header("x-ms-delete-snapshots", "include");
    self
      .send(&format!("share {}", share.share), request)
      .await
      .map(drop)
  }

  async fn set_share_quota(&self, share: &ShareTarget, quota_gib: u32) -> CloudResult<u32> {
    let request = self
      .http
      .put(Self::share_url(share, "restype=share&comp=properties&")?)
      .header("x-ms-share-quota", quota_gib.to_string())
      .header("Content-Length", "0");
    self.send(&format!("share {}", share.share), request).await?;
    Ok(quota_gib)
  }

  async fn share_snapshots(&self, share: &ShareTarget) -> CloudResult<Vec<ShareSnapshot>> {
    let mut snapshots = Vec::new();
    let mut marker: Option<String> = None;

    loop {
      let mut query = format!(
        "comp=list&include=snapshots,metadata&prefix={}&",
        encode(&share.share)
      );
      if let Some(marker) = &marker {
        query.push_str(&format!("marker={}&", encode(marker)));
      }

      let request = self.http.get(Self::url(
        &share.account,
        &share.account_key,
        &share.endpoint_suffix,
        "",
        &query,
      )?);
      let body = self
        .send(&format!("listing shares of {}", share.account), request)
        .await?
        .text()
        .await
        .map_err(|err| CloudError::Other(err.to_string()))?;

      let (page, next) = parse_snapshot_page(&body, &share.share)?;
      snapshots.extend(page);
      match next {
        Some(next) => marker = Some(next),
        None => return Ok(snapshots),
      }
    }
  }

  async fn snapshot_share(&self, share: &ShareTarget, metadata: &Tags) -> CloudResult<ShareSnapshot> {
    let mut request = self
      .http
      .put(Self::share_url(share, "restype=share&comp=snapshot&")?)
      .header("Content-Length", "0");
    for (key, value) in metadata {
      request = request.header(format!("{}{}", META_PREFIX, key).as_str(), value.as_str());
    }

    let response = self.send(&format!("share {}", share.share), request).await?;
    let tag = header(&response, "x-ms-snapshot")
      .map(str::to_owned)
      .ok_or_else(|| {
        CloudError::Other(format!("snapshot of share {} carries no snapshot time", share.share))
      })?;

    Ok(ShareSnapshot {
      created: snapshot_time(&tag),
      tag,
      metadata: metadata.clone(),
    })
  }

  async fn remove_share_snapshot(&self, share: &ShareTarget, tag: &str) -> CloudResult<()> {
    let query = format!("restype=share&sharesnapshot={}&", encode(tag));
    let request = self.http.delete(Self::share_url(share, &query)?);
    self
      .send(&format!("snapshot {} of share {}", tag, share.share), request)
      .await
      .map(drop)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const LISTING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://acct.file.core.windows.net/">
  <Prefix>share</Prefix>
  <Shares>
    <Share>
      <Name>share</Name>
      <Properties><Quota>10</Quota></Properties>
    </Share>
    <Share>
      <Name>share</Name>
      <Snapshot>2021-01-01T00:00:01.0000000Z</Snapshot>
      <Properties><Quota>10</Quota></Properties>
      <Metadata><snapshotname>snap-1</snapshotname></Metadata>
    </Share>
    <Share>
      <Name>share-other</Name>
      <Snapshot>2021-01-01T00:00:02.0000000Z</Snapshot>
    </Share>
  </Shares>
  <NextMarker>page-2</NextMarker>
</EnumerationResults>"#;

  #[test]
  fn snapshot_page_keeps_snapshots_of_the_share() {
    let (snapshots, next) = parse_snapshot_page(LISTING, "share").unwrap();

    assert_eq!(next.as_deref(), Some("page-2"));
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].tag, "2021-01-01T00:00:01.0000000Z");
    assert_eq!(
      snapshots[0].metadata.get("snapshotname").map(String::as_str),
      Some("snap-1")
    );
    assert_eq!(snapshots[0].created.timestamp(), 1_609_459_201);
  }

  #[test]
  fn last_page_has_no_marker() {
    let xml = "<EnumerationResults><Shares /><NextMarker /></EnumerationResults>";
    let (snapshots, next) = parse_snapshot_page(xml, "share").unwrap();

    assert!(snapshots.is_empty());
    assert_eq!(next, None);
  }

  #[test]
  fn garbage_listing_is_an_error() {
    let xml = "<EnumerationResults><Shares><Share></Share></Shares></EnumerationResults>";
    let err = parse_snapshot_page(xml, "share").unwrap_err();
    assert!(err.to_string().starts_with("unexpected share listing: "));
  }
}
