use super::Secrets;
use crate::{proto, utils::required, volume::CapacityRange};
use std::{
  collections::HashMap,
  convert::{TryFrom, TryInto},
};
use thiserror::Error;

#[derive(Debug)]
pub struct ControllerExpandVolumeRequest {
  volume_id: String,
  capacity_range: CapacityRange,
  secrets: Secrets,
}

impl ControllerExpandVolumeRequest {
  pub fn new(volume_id: impl Into<String>, capacity_range: CapacityRange) -> Self {
    ControllerExpandVolumeRequest {
      volume_id: volume_id.into(),
      capacity_range,
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

  /// Size the volume must have after expansion.
  #[inline]
  pub fn capacity_range(&self) -> &CapacityRange {
    &self.capacity_range
  }

  #[inline]
  pub fn secrets(&self) -> &HashMap<String, String> {
    self.secrets.as_ref()
  }
}

impl TryFrom<proto::ControllerExpandVolumeRequest> for ControllerExpandVolumeRequest {
  type Error = tonic::Status;

  fn try_from(value: proto::ControllerExpandVolumeRequest) -> Result<Self, Self::Error> {
    let volume_id = required(value.volume_id, "Volume ID missing in request")?;
    let capacity_range = value
      .capacity_range
      .ok_or_else(|| tonic::Status::invalid_argument("volume capacity range missing in request"))?
      .try_into()?;

    Ok(ControllerExpandVolumeRequest {
      volume_id,
      capacity_range,
      secrets: value.secrets.into(),
    })
  }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ControllerExpandVolumeResponse {
  capacity_bytes: u64,
  node_expansion_required: bool,
}

impl ControllerExpandVolumeResponse {
  pub fn new(capacity_bytes: u64, node_expansion_required: bool) -> Self {
    ControllerExpandVolumeResponse {
      capacity_bytes,
      node_expansion_required,
    }
  }

  /// Capacity of the volume after expansion.
  #[inline]
  pub fn capacity_bytes(&self) -> u64 {
    self.capacity_bytes
  }

  /// Whether the orchestrator must follow up with `NodeExpandVolume`.
  #[inline]
  pub fn node_expansion_required(&self) -> bool {
    self.node_expansion_required
  }
}

impl TryFrom<ControllerExpandVolumeResponse> for proto::ControllerExpandVolumeResponse {
  type Error = tonic::Status;

  fn try_from(value: ControllerExpandVolumeResponse) -> Result<Self, Self::Error> {
    let capacity_bytes = i64::try_from(value.capacity_bytes)
      .map_err(|_| tonic::Status::internal("volume capacity does not fit in int64"))?;

    Ok(proto::ControllerExpandVolumeResponse {
      capacity_bytes,
      node_expansion_required: value.node_expansion_required,
    })
  }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ControllerExpandVolumeError {
  /// The volume id does not name a volume of this plugin.
  #[error("{0}")]
  InvalidVolumeId(String),

  /// The volume exists but cannot be resized.
  #[error("{0}")]
  Unsupported(String),

  /// Another operation on the same volume is in flight.
  #[error("{0}")]
  Pending(String),

  #[error(transparent)]
  #[doc(hidden)]
  Other(#[from] tonic::Status),
}

impl From<ControllerExpandVolumeError> for tonic::Status {
  fn from(value: ControllerExpandVolumeError) -> Self {
    use tonic::{Code, Status};

    match value {
      ControllerExpandVolumeError::InvalidVolumeId(v) => Status::new(Code::InvalidArgument, v),
      ControllerExpandVolumeError::Unsupported(v) => Status::new(Code::Unimplemented, v),
      ControllerExpandVolumeError::Pending(v) => Status::new(Code::Aborted, v),
      ControllerExpandVolumeError::Other(v) => v,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn volume_id_is_required() {
    let err =
      ControllerExpandVolumeRequest::try_from(proto::ControllerExpandVolumeRequest::default())
        .unwrap_err();

    assert_eq!(err.code(), tonic::Code::InvalidArgument);
    assert_eq!(err.message(), "Volume ID missing in request");
  }

  #[test]
  fn capacity_range_is_required() {
    let err = ControllerExpandVolumeRequest::try_from(proto::ControllerExpandVolumeRequest {
      volume_id: "rg#acct#share".into(),
      ..Default::default()
    })
    .unwrap_err();

    assert_eq!(err.code(), tonic::Code::InvalidArgument);
    assert_eq!(err.message(), "volume capacity range missing in request");
  }
}
