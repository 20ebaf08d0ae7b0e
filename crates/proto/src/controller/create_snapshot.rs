use super::Secrets;
use crate::proto;
use std::{collections::HashMap, convert::TryFrom};
use thiserror::Error;

#[derive(Debug)]
pub struct CreateSnapshotRequest {
  source_volume_id: String,
  name: String,
  secrets: Secrets,
  parameters: HashMap<String, String>,
}

impl CreateSnapshotRequest {
  pub fn new(name: impl Into<String>, source_volume_id: impl Into<String>) -> Self {
    CreateSnapshotRequest {
      source_volume_id: source_volume_id.into(),
      name: name.into(),
      secrets: HashMap::new().into(),
      parameters: HashMap::new(),
    }
  }

  pub fn with_secrets(mut self, secrets: HashMap<String, String>) -> Self {
    self.secrets = secrets.into();
    self
  }

  /// The volume to snapshot.
  #[inline]
  pub fn source_volume_id(&self) -> &str {
    &self.source_volume_id
  }

  /// Suggested snapshot name, used for idempotency.
  #[inline]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[inline]
  pub fn secrets(&self) -> &HashMap<String, String> {
    self.secrets.as_ref()
  }

  #[inline]
  pub fn parameters(&self) -> &HashMap<String, String> {
    &self.parameters
  }
}

impl TryFrom<proto::CreateSnapshotRequest> for CreateSnapshotRequest {
  type Error = tonic::Status;

  fn try_from(value: proto::CreateSnapshotRequest) -> Result<Self, Self::Error> {
    if value.name.is_empty() {
      return Err(tonic::Status::invalid_argument(
        "Snapshot name must be provided",
      ));
    }

    if value.source_volume_id.is_empty() {
      return Err(tonic::Status::invalid_argument(
        "CreateSnapshot Source Volume ID must be provided",
      ));
    }

    Ok(CreateSnapshotRequest {
      source_volume_id: value.source_volume_id,
      name: value.name,
      secrets: value.secrets.into(),
      parameters: value.parameters,
    })
  }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CreateSnapshotError {
  /// A snapshot with this name exists for a different source volume.
  #[error("{0}")]
  AlreadyExists(String),

  /// Another operation on the same snapshot name is in flight.
  #[error("{0}")]
  Pending(String),

  #[error(transparent)]
  #[doc(hidden)]
  Other(#[from] tonic::Status),
}

impl From<CreateSnapshotError> for tonic::Status {
  fn from(value: CreateSnapshotError) -> Self {
    use tonic::{Code, Status};

    match value {
      CreateSnapshotError::AlreadyExists(v) => Status::new(Code::AlreadyExists, v),
      CreateSnapshotError::Pending(v) => Status::new(Code::Aborted, v),
      CreateSnapshotError::Other(v) => v,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  #[test_case("", "vol_1" => "Snapshot name must be provided" ; "missing name")]
  #[test_case("snap", "" => "CreateSnapshot Source Volume ID must be provided" ; "missing source")]
  fn required_fields(name: &str, source_volume_id: &str) -> String {
    CreateSnapshotRequest::try_from(proto::CreateSnapshotRequest {
      name: name.into(),
      source_volume_id: source_volume_id.into(),
      ..Default::default()
    })
    .unwrap_err()
    .message()
    .to_string()
  }
}
