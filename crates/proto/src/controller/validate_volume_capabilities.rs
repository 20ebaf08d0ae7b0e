use super::Secrets;
use crate::{proto, utils::required, volume::VolumeCapability};
use std::{
  collections::HashMap,
  convert::{TryFrom, TryInto},
};
use thiserror::Error;

#[derive(Debug)]
pub struct ValidateVolumeCapabilitiesRequest {
  volume_id: String,
  volume_context: HashMap<String, String>,
  volume_capabilities: Vec<VolumeCapability>,
  parameters: HashMap<String, String>,
  secrets: Secrets,
}

impl ValidateVolumeCapabilitiesRequest {
  pub fn new(volume_id: impl Into<String>, volume_capabilities: Vec<VolumeCapability>) -> Self {
    ValidateVolumeCapabilitiesRequest {
      volume_id: volume_id.into(),
      volume_context: HashMap::new(),
      volume_capabilities,
      parameters: HashMap::new(),
      secrets: HashMap::new().into(),
    }
  }

  #[inline]
  pub fn volume_id(&self) -> &str {
    &self.volume_id
  }

  #[inline]
  pub fn volume_context(&self) -> &HashMap<String, String> {
    &self.volume_context
  }

  /// Confirmed only if every capability in this list is supported.
  #[inline]
  pub fn volume_capabilities(&self) -> &[VolumeCapability] {
    &self.volume_capabilities
  }

  #[inline]
  pub fn parameters(&self) -> &HashMap<String, String> {
    &self.parameters
  }

  #[inline]
  pub fn secrets(&self) -> &HashMap<String, String> {
    self.secrets.as_ref()
  }
}

impl TryFrom<proto::ValidateVolumeCapabilitiesRequest> for ValidateVolumeCapabilitiesRequest {
  type Error = tonic::Status;

  fn try_from(value: proto::ValidateVolumeCapabilitiesRequest) -> Result<Self, Self::Error> {
    let volume_id = required(value.volume_id, "Volume ID not provided")?;

    if value.volume_capabilities.is_empty() {
      return Err(tonic::Status::invalid_argument(
        "Volume capabilities not provided",
      ));
    }

    let volume_capabilities = value
      .volume_capabilities
      .into_iter()
      .map(TryInto::try_into)
      .collect::<Result<_, _>>()?;

    Ok(ValidateVolumeCapabilitiesRequest {
      volume_id,
      volume_context: value.volume_context,
      volume_capabilities,
      parameters: value.parameters,
      secrets: value.secrets.into(),
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Confirmed {
  volume_context: HashMap<String, String>,
  volume_capabilities: Vec<VolumeCapability>,
  parameters: HashMap<String, String>,
}

impl Confirmed {
  /// Confirms the given capabilities, echoing back context and parameters.
  pub fn new(
    volume_capabilities: Vec<VolumeCapability>,
    volume_context: HashMap<String, String>,
    parameters: HashMap<String, String>,
  ) -> Self {
    Confirmed {
      volume_context,
      volume_capabilities,
      parameters,
    }
  }

  #[inline]
  pub fn volume_capabilities(&self) -> &[VolumeCapability] {
    &self.volume_capabilities
  }
}

impl From<Confirmed> for proto::validate_volume_capabilities_response::Confirmed {
  fn from(value: Confirmed) -> Self {
    proto::validate_volume_capabilities_response::Confirmed {
      volume_context: value.volume_context,
      volume_capabilities: value
        .volume_capabilities
        .into_iter()
        .map(Into::into)
        .collect(),
      parameters: value.parameters,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidateVolumeCapabilitiesResponse {
  Confirmed(Confirmed),
  /// Not confirmed, with the reason.
  Message(String),
}

impl TryFrom<ValidateVolumeCapabilitiesResponse> for proto::ValidateVolumeCapabilitiesResponse {
  type Error = tonic::Status;

  fn try_from(value: ValidateVolumeCapabilitiesResponse) -> Result<Self, Self::Error> {
    Ok(match value {
      ValidateVolumeCapabilitiesResponse::Confirmed(confirmed) => {
        proto::ValidateVolumeCapabilitiesResponse {
          confirmed: Some(confirmed.into()),
          message: Default::default(),
        }
      }

      ValidateVolumeCapabilitiesResponse::Message(message) => {
        proto::ValidateVolumeCapabilitiesResponse {
          confirmed: None,
          message,
        }
      }
    })
  }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ValidateVolumeCapabilitiesError {
  /// The volume does not exist.
  #[error("{0}")]
  VolumeNotFound(String),

  #[error(transparent)]
  #[doc(hidden)]
  Other(#[from] tonic::Status),
}

impl From<ValidateVolumeCapabilitiesError> for tonic::Status {
  fn from(value: ValidateVolumeCapabilitiesError) -> Self {
    use tonic::{Code, Status};

    match value {
      ValidateVolumeCapabilitiesError::VolumeNotFound(v) => Status::new(Code::NotFound, v),
      ValidateVolumeCapabilitiesError::Other(v) => v,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  #[test_case("", 0 => "Volume ID not provided" ; "missing volume id")]
  #[test_case("vol_1", 0 => "Volume capabilities not provided" ; "missing capabilities")]
  fn required_fields(volume_id: &str, capabilities: usize) -> String {
    let capability = proto::VolumeCapability {
      access_mode: Some(proto::volume_capability::AccessMode { mode: 1 }),
      access_type: Some(proto::volume_capability::AccessType::Block(
        proto::volume_capability::BlockVolume {},
      )),
    };

    ValidateVolumeCapabilitiesRequest::try_from(proto::ValidateVolumeCapabilitiesRequest {
      volume_id: volume_id.into(),
      volume_capabilities: vec![capability; capabilities],
      ..Default::default()
    })
    .unwrap_err()
    .message()
    .to_string()
  }
}
