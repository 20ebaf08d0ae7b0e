use azurefile_csi_proto::controller::{
  ControllerExpandVolumeError, CreateSnapshotError, CreateVolumeError, DeleteSnapshotError,
  DeleteVolumeError, ValidateVolumeCapabilitiesError,
};
use std::result;
use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T, E = Error> = result::Result<T, E>;

/// Failure of a lifecycle operation, classified by how the orchestrator
/// should react to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// The request itself is wrong; retrying it unchanged will fail again.
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  NotFound(String),

  /// An existing object is incompatible with the request.
  #[error("{0}")]
  Conflict(String),

  /// Another mutating operation holds the key.
  #[error("An operation with the given Volume ID {0} already exists")]
  Pending(String),

  #[error("{0}")]
  Backend(String),

  #[error("{0}")]
  Unimplemented(String),

  #[error("{0}")]
  Timeout(String),
}

impl Error {
  #[inline]
  pub fn validation(message: impl Into<String>) -> Self {
    Error::Validation(message.into())
  }

  #[inline]
  pub fn not_found(message: impl Into<String>) -> Self {
    Error::NotFound(message.into())
  }

  #[inline]
  pub fn backend(message: impl Into<String>) -> Self {
    Error::Backend(message.into())
  }

  pub fn code(&self) -> Code {
    match self {
      Error::Validation(_) => Code::InvalidArgument,
      Error::NotFound(_) => Code::NotFound,
      Error::Conflict(_) => Code::AlreadyExists,
      Error::Pending(_) => Code::Aborted,
      Error::Backend(_) | Error::Timeout(_) => Code::Internal,
      Error::Unimplemented(_) => Code::Unimplemented,
    }
  }
}

impl From<Error> for Status {
  fn from(value: Error) -> Self {
    Status::new(value.code(), value.to_string())
  }
}

impl From<Error> for CreateVolumeError {
  fn from(value: Error) -> Self {
    match value {
      Error::Conflict(v) => CreateVolumeError::AlreadyExists(v),
      Error::NotFound(v) => CreateVolumeError::SourceNotFound(v),
      Error::Timeout(v) => CreateVolumeError::Timeout(v),
      e @ Error::Pending(_) => CreateVolumeError::Pending(e.to_string()),
      e => CreateVolumeError::Other(e.into()),
    }
  }
}

impl From<Error> for DeleteVolumeError {
  fn from(value: Error) -> Self {
    match value {
      e @ Error::Pending(_) => DeleteVolumeError::Pending(e.to_string()),
      e => DeleteVolumeError::Other(e.into()),
    }
  }
}

impl From<Error> for ControllerExpandVolumeError {
  fn from(value: Error) -> Self {
    match value {
      Error::Validation(v) => ControllerExpandVolumeError::InvalidVolumeId(v),
      Error::Unimplemented(v) => ControllerExpandVolumeError::Unsupported(v),
      e @ Error::Pending(_) => ControllerExpandVolumeError::Pending(e.to_string()),
      e => ControllerExpandVolumeError::Other(e.into()),
    }
  }
}

impl From<Error> for CreateSnapshotError {
  fn from(value: Error) -> Self {
    match value {
      Error::Conflict(v) => CreateSnapshotError::AlreadyExists(v),
      e @ Error::Pending(_) => CreateSnapshotError::Pending(e.to_string()),
      e => CreateSnapshotError::Other(e.into()),
    }
  }
}

impl From<Error> for DeleteSnapshotError {
  fn from(value: Error) -> Self {
    match value {
      e @ Error::Pending(_) => DeleteSnapshotError::Pending(e.to_string()),
      e => DeleteSnapshotError::Other(e.into()),
    }
  }
}

impl From<Error> for ValidateVolumeCapabilitiesError {
  fn from(value: Error) -> Self {
    match value {
      Error::NotFound(v) => ValidateVolumeCapabilitiesError::VolumeNotFound(v),
      e => ValidateVolumeCapabilitiesError::Other(e.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  #[test_case(Error::validation("bad") => Code::InvalidArgument)]
  #[test_case(Error::not_found("gone") => Code::NotFound)]
  #[test_case(Error::Conflict("smaller".into()) => Code::AlreadyExists)]
  #[test_case(Error::Pending("vol".into()) => Code::Aborted)]
  #[test_case(Error::backend("boom") => Code::Internal)]
  #[test_case(Error::Timeout("slow".into()) => Code::Internal)]
  #[test_case(Error::Unimplemented("vhd".into()) => Code::Unimplemented)]
  fn status_codes(e: Error) -> Code {
    Status::from(CreateVolumeError::from(e)).code()
  }

  #[test]
  fn pending_message_names_key() {
    let status = Status::from(DeleteVolumeError::from(Error::Pending("vol-1".into())));
    assert_eq!(status.code(), Code::Aborted);
    assert_eq!(
      status.message(),
      "An operation with the given Volume ID vol-1 already exists"
    );
  }

  #[test]
  fn expand_validation_is_invalid_argument() {
    let status = Status::from(ControllerExpandVolumeError::from(Error::validation("x")));
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "x");
  }
}
