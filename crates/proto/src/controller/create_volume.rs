use super::Secrets;
use crate::{
  proto,
  volume::{CapacityRange, VolumeCapability, VolumeContentSource},
};
use std::{
  collections::HashMap,
  convert::{TryFrom, TryInto},
};
use thiserror::Error;

#[derive(Debug)]
pub struct CreateVolumeRequest {
  name: String,
  capacity_range: Option<CapacityRange>,
  volume_capabilities: Vec<VolumeCapability>,
  parameters: HashMap<String, String>,
  secrets: Secrets,
  content_source: Option<VolumeContentSource>,
}

impl CreateVolumeRequest {
  pub fn new(name: impl Into<String>, volume_capabilities: Vec<VolumeCapability>) -> Self {
    CreateVolumeRequest {
      name: name.into(),
      capacity_range: None,
      volume_capabilities,
      parameters: HashMap::new(),
      secrets: HashMap::new().into(),
      content_source: None,
    }
  }

  pub fn with_capacity_range(mut self, capacity_range: CapacityRange) -> Self {
    self.capacity_range = Some(capacity_range);
    self
  }

  pub fn with_parameters(mut self, parameters: HashMap<String, String>) -> Self {
    self.parameters = parameters;
    self
  }

  pub fn with_secrets(mut self, secrets: HashMap<String, String>) -> Self {
    self.secrets = secrets.into();
    self
  }

  pub fn with_content_source(mut self, content_source: VolumeContentSource) -> Self {
    self.content_source = Some(content_source);
    self
  }

  /// Suggested name, used by the plugin for idempotency.
  #[inline]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[inline]
  pub fn capacity_range(&self) -> Option<&CapacityRange> {
    self.capacity_range.as_ref()
  }

  #[inline]
  pub fn volume_capabilities(&self) -> &[VolumeCapability] {
    &self.volume_capabilities
  }

  /// Storage class parameters. Opaque to the orchestrator.
  #[inline]
  pub fn parameters(&self) -> &HashMap<String, String> {
    &self.parameters
  }

  #[inline]
  pub fn secrets(&self) -> &HashMap<String, String> {
    self.secrets.as_ref()
  }

  #[inline]
  pub fn content_source(&self) -> Option<&VolumeContentSource> {
    self.content_source.as_ref()
  }
}

impl TryFrom<proto::CreateVolumeRequest> for CreateVolumeRequest {
  type Error = tonic::Status;

  fn try_from(value: proto::CreateVolumeRequest) -> Result<Self, Self::Error> {
    if value.name.is_empty() {
      return Err(tonic::Status::invalid_argument(
        "CreateVolume Name must be provided",
      ));
    }

    if value.volume_capabilities.is_empty() {
      return Err(tonic::Status::invalid_argument(
        "CreateVolume Volume capabilities not valid: CreateVolume Volume capabilities must be provided",
      ));
    }

    let volume_capabilities = value
      .volume_capabilities
      .into_iter()
      .map(TryInto::try_into)
      .collect::<Result<_, _>>()?;
    let capacity_range = value.capacity_range.map(TryInto::try_into).transpose()?;
    let content_source = match value.volume_content_source {
      None => None,
      Some(v) => v.try_into()?,
    };

    Ok(CreateVolumeRequest {
      name: value.name,
      capacity_range,
      volume_capabilities,
      parameters: value.parameters,
      secrets: value.secrets.into(),
      content_source,
    })
  }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CreateVolumeError {
  /// A volume with the same name exists but is incompatible with the request.
  #[error("{0}")]
  AlreadyExists(String),

  /// Another operation on the same volume name is in flight.
  #[error("{0}")]
  Pending(String),

  /// The content source could not be found.
  #[error("{0}")]
  SourceNotFound(String),

  /// Copying the content source did not finish in time.
  #[error("{0}")]
  Timeout(String),

  #[error(transparent)]
  #[doc(hidden)]
  Other(#[from] tonic::Status),
}

impl From<CreateVolumeError> for tonic::Status {
  fn from(value: CreateVolumeError) -> Self {
    use tonic::{Code, Status};

    match value {
      CreateVolumeError::AlreadyExists(v) => Status::new(Code::AlreadyExists, v),
      CreateVolumeError::Pending(v) => Status::new(Code::Aborted, v),
      CreateVolumeError::SourceNotFound(v) => Status::new(Code::NotFound, v),
      CreateVolumeError::Timeout(v) => Status::new(Code::Internal, v),
      CreateVolumeError::Other(v) => v,
    }
  }
}
