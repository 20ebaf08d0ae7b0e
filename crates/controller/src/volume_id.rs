//! The opaque handles handed to the orchestrator.
//!
//! A volume handle is `rg#account#share#disk#secretNamespace#secretName`,
//! a snapshot handle is `rg#account#share#snapshotTag`. Optional trailing
//! fields are written as empty positions so field order never shifts.

use std::{fmt, str::FromStr};
use thiserror::Error;

pub const SEPARATOR: &str = "#";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error parsing volume id: {id:?}, should at least contain {minimum} #")]
pub struct ParseError {
  id: String,
  minimum: &'static str,
}

impl ParseError {
  fn new(id: &str, minimum: &'static str) -> Self {
    ParseError {
      id: id.to_owned(),
      minimum,
    }
  }
}

fn optional(field: Option<&str>) -> Option<String> {
  field.filter(|f| !f.is_empty()).map(str::to_owned)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeId {
  pub resource_group: String,
  pub account: String,
  pub share: String,
  pub disk_name: Option<String>,
  pub secret_namespace: Option<String>,
  pub secret_name: Option<String>,
}

impl VolumeId {
  pub fn new(
    resource_group: impl Into<String>,
    account: impl Into<String>,
    share: impl Into<String>,
  ) -> Self {
    VolumeId {
      resource_group: resource_group.into(),
      account: account.into(),
      share: share.into(),
      ..Default::default()
    }
  }

  pub fn with_disk_name(mut self, disk_name: Option<String>) -> Self {
    self.disk_name = disk_name.filter(|d| !d.is_empty());
    self
  }

  pub fn with_secret(mut self, namespace: Option<String>, name: Option<String>) -> Self {
    self.secret_namespace = namespace.filter(|n| !n.is_empty());
    self.secret_name = name.filter(|n| !n.is_empty());
    self
  }

  pub fn encode(&self) -> String {
    let fields = [
      self.resource_group.as_str(),
      self.account.as_str(),
      self.share.as_str(),
      self.disk_name.as_deref().unwrap_or_default(),
      self.secret_namespace.as_deref().unwrap_or_default(),
      self.secret_name.as_deref().unwrap_or_default(),
    ];

    fields.join(SEPARATOR)
  }

  /// Requires at least the resource group and account positions.
  pub fn decode(id: &str) -> Result<Self, ParseError> {
    let fields: Vec<&str> = id.split(SEPARATOR).collect();
    if fields.len() < 2 {
      return Err(ParseError::new(id, "two"));
    }

    let field = |i: usize| fields.get(i).copied();
    Ok(VolumeId {
      resource_group: fields[0].to_owned(),
      account: fields[1].to_owned(),
      share: field(2).unwrap_or_default().to_owned(),
      disk_name: optional(field(3)),
      secret_namespace: optional(field(4)),
      secret_name: optional(field(5)),
    })
  }
}

impl fmt::Display for VolumeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.encode())
  }
}

impl FromStr for VolumeId {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    VolumeId::decode(s)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotId {
  pub resource_group: String,
  pub account: String,
  pub share: String,
  pub tag: String,
}

impl SnapshotId {
  pub fn new(volume: &VolumeId, tag: impl Into<String>) -> Self {
    SnapshotId {
      resource_group: volume.resource_group.clone(),
      account: volume.account.clone(),
      share: volume.share.clone(),
      tag: tag.into(),
    }
  }

  pub fn encode(&self) -> String {
    [
      self.resource_group.as_str(),
      self.account.as_str(),
      self.share.as_str(),
      self.tag.as_str(),
    ]
    .join(SEPARATOR)
  }

  /// Requires all four positions and a non-empty snapshot tag.
  pub fn decode(id: &str) -> Result<Self, ParseError> {
    let fields: Vec<&str> = id.split(SEPARATOR).collect();
    match fields.as_slice() {
      [rg, account, share, tag, ..] if !tag.is_empty() => Ok(SnapshotId {
        resource_group: (*rg).to_owned(),
        account: (*account).to_owned(),
        share: (*share).to_owned(),
        tag: (*tag).to_owned(),
      }),
      _ => Err(ParseError::new(id, "four")),
    }
  }

  pub fn volume(&self) -> VolumeId {
    VolumeId::new(&self.resource_group, &self.account, &self.share)
  }
}

impl fmt::Display for SnapshotId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.encode())
  }
}
