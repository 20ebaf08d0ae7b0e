use super::Secrets;
use crate::{proto, utils::required};
use std::{collections::HashMap, convert::TryFrom};
use thiserror::Error;

#[derive(Debug)]
pub struct DeleteVolumeRequest {
  volume_id: String,
  secrets: Secrets,
}

impl DeleteVolumeRequest {
  pub fn new(volume_id: impl Into<String>) -> Self {
    DeleteVolumeRequest {
      volume_id: volume_id.into(),
      secrets: HashMap::new().into(),
    }
  }

  pub fn with_secrets(mut self, secrets: HashMap<String, String>) -> Self {
    self.secrets = secrets.into();
    self
  }

  #[inline]
  pub fn volume_id(&self) -> &str {
    &self.volume_id
  }

  #[inline]
  pub fn secrets(&self) -> &HashMap<String, String> {
    self.secrets.as_ref()
  }
}

impl TryFrom<proto::DeleteVolumeRequest> for DeleteVolumeRequest {
  type Error = tonic::Status;

  fn try_from(value: proto::DeleteVolumeRequest) -> Result<Self, Self::Error> {
    Ok(DeleteVolumeRequest {
      volume_id: required(value.volume_id, "Volume ID missing in request")?,
      secrets: value.secrets.into(),
    })
  }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DeleteVolumeError {
  /// Another operation on the same volume is in flight.
  #[error("{0}")]
  Pending(String),

  #[error(transparent)]
  #[doc(hidden)]
  Other(#[from] tonic::Status),
}

impl From<DeleteVolumeError> for tonic::Status {
  fn from(value: DeleteVolumeError) -> tonic::Status {
    use tonic::{Code, Status};

    match value {
      DeleteVolumeError::Pending(v) => Status::new(Code::Aborted, v),
      DeleteVolumeError::Other(v) => v,
    }
  }
}
