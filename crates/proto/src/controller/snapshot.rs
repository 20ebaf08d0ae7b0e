use crate::proto;
use std::{
  convert::{TryFrom, TryInto},
  time::SystemTime,
};

/// A cut snapshot of a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
  snapshot_id: String,
  source_volume_id: String,
  size_bytes: u64,
  creation_time: SystemTime,
  ready_to_use: bool,
}

impl Snapshot {
  pub fn new(
    snapshot_id: impl Into<String>,
    source_volume_id: impl Into<String>,
    size_bytes: u64,
    creation_time: SystemTime,
  ) -> Self {
    Snapshot {
      snapshot_id: snapshot_id.into(),
      source_volume_id: source_volume_id.into(),
      size_bytes,
      creation_time,
      ready_to_use: true,
    }
  }

  /// Marks a snapshot that is cut but still post-processed by the backend.
  pub fn pending(mut self) -> Self {
    self.ready_to_use = false;
    self
  }

  #[inline]
  pub fn snapshot_id(&self) -> &str {
    &self.snapshot_id
  }

  #[inline]
  pub fn source_volume_id(&self) -> &str {
    &self.source_volume_id
  }

  #[inline]
  pub fn size_bytes(&self) -> u64 {
    self.size_bytes
  }

  #[inline]
  pub fn creation_time(&self) -> SystemTime {
    self.creation_time
  }

  #[inline]
  pub fn ready_to_use(&self) -> bool {
    self.ready_to_use
  }
}

impl TryFrom<Snapshot> for proto::Snapshot {
  type Error = tonic::Status;

  fn try_from(value: Snapshot) -> Result<Self, Self::Error> {
    let size_bytes = i64::try_from(value.size_bytes)
      .map_err(|_| tonic::Status::internal("snapshot size does not fit in int64"))?;

    Ok(proto::Snapshot {
      size_bytes,
      snapshot_id: value.snapshot_id,
      source_volume_id: value.source_volume_id,
      creation_time: Some(value.creation_time.into()),
      ready_to_use: value.ready_to_use,
    })
  }
}

impl TryFrom<Snapshot> for proto::CreateSnapshotResponse {
  type Error = tonic::Status;

  fn try_from(value: Snapshot) -> Result<Self, Self::Error> {
    Ok(proto::CreateSnapshotResponse {
      snapshot: Some(value.try_into()?),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::{Duration, UNIX_EPOCH};

  #[test]
  fn converts_creation_time() {
    let snapshot = Snapshot::new(
      "rg#acct#share#2021-01-01T00:00:00.0000000Z",
      "rg#acct#share",
      100 << 30,
      UNIX_EPOCH + Duration::from_secs(1_609_459_200),
    );

    let proto = proto::Snapshot::try_from(snapshot).unwrap();
    let creation_time = proto.creation_time.unwrap();
    assert_eq!(creation_time.seconds, 1_609_459_200);
    assert_eq!(proto.size_bytes, 100 << 30);
    assert!(proto.ready_to_use);
  }
}
