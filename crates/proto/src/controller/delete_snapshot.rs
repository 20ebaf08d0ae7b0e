use super::Secrets;
use crate::{proto, utils::required};
use std::{collections::HashMap, convert::TryFrom};
use thiserror::Error;

#[derive(Debug)]
pub struct DeleteSnapshotRequest {
  snapshot_id: String,
  secrets: Secrets,
}

impl DeleteSnapshotRequest {
  pub fn new(snapshot_id: impl Into<String>) -> Self {
    DeleteSnapshotRequest {
      snapshot_id: snapshot_id.into(),
      secrets: HashMap::new().into(),
    }
  }

  pub fn with_secrets(mut self, secrets: HashMap<String, String>) -> Self {
    self.secrets = secrets.into();
    self
  }

  #[inline]
  pub fn snapshot_id(&self) -> &str {
    &self.snapshot_id
  }

  #[inline]
  pub fn secrets(&self) -> &HashMap<String, String> {
    self.secrets.as_ref()
  }
}

impl TryFrom<proto::DeleteSnapshotRequest> for DeleteSnapshotRequest {
  type Error = tonic::Status;

  fn try_from(value: proto::DeleteSnapshotRequest) -> Result<Self, Self::Error> {
    Ok(DeleteSnapshotRequest {
      snapshot_id: required(value.snapshot_id, "Snapshot ID must be provided")?,
      secrets: value.secrets.into(),
    })
  }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DeleteSnapshotError {
  /// Another operation on the same snapshot is in flight.
  #[error("{0}")]
  Pending(String),

  #[error(transparent)]
  #[doc(hidden)]
  Other(#[from] tonic::Status),
}

impl From<DeleteSnapshotError> for tonic::Status {
  fn from(value: DeleteSnapshotError) -> Self {
    use tonic::{Code, Status};

    match value {
      DeleteSnapshotError::Pending(v) => Status::new(Code::Aborted, v),
      DeleteSnapshotError::Other(v) => v,
    }
  }
}
