use crate::shares::ShareManager;
use async_trait::async_trait;
use azurefile_csi_proto::{
  controller::{
    Confirmed, ControllerCapabilities, ControllerExpandVolumeError, ControllerExpandVolumeRequest,
    ControllerExpandVolumeResponse, CreateSnapshotError, CreateSnapshotRequest, CreateVolumeError,
    CreateVolumeRequest, DeleteSnapshotError, DeleteSnapshotRequest, DeleteVolumeError,
    DeleteVolumeRequest, Snapshot, ValidateVolumeCapabilitiesError,
    ValidateVolumeCapabilitiesRequest, ValidateVolumeCapabilitiesResponse, Volume,
  },
  ControllerService, IdentityService, VolumeExpansionSupport,
};

pub const DEFAULT_DRIVER_NAME: &str = "file.csi.azure.com";

/// The CSI controller: identity answers plus the share lifecycle.
pub struct Driver {
  name: String,
  version: String,
  shares: ShareManager,
}

impl Driver {
  pub fn new(name: impl Into<String>, shares: ShareManager) -> Self {
    Driver {
      name: name.into(),
      version: env!("CARGO_PKG_VERSION").to_owned(),
      shares,
    }
  }

  #[inline]
  pub fn shares(&self) -> &ShareManager {
    &self.shares
  }
}

impl IdentityService for Driver {
  #[inline]
  fn name(&self) -> &str {
    &self.name
  }

  #[inline]
  fn version(&self) -> &str {
    &self.version
  }

  #[inline]
  fn volume_expansion_support(&self) -> VolumeExpansionSupport {
    VolumeExpansionSupport::Online
  }
}

#[async_trait]
impl ControllerService for Driver {
  fn capabilities(&self) -> ControllerCapabilities {
    ControllerCapabilities::CREATE_DELETE_VOLUME
      | ControllerCapabilities::CREATE_DELETE_SNAPSHOT
      | ControllerCapabilities::EXPAND_VOLUME
      | ControllerCapabilities::CLONE_VOLUME
  }

  async fn create_volume(&self, request: CreateVolumeRequest) -> Result<Volume, CreateVolumeError> {
    Ok(self.shares.create_volume(&request).await?)
  }

  async fn delete_volume(&self, request: DeleteVolumeRequest) -> Result<(), DeleteVolumeError> {
    Ok(self.shares.delete_volume(&request).await?)
  }

  async fn validate_volume_capabilities(
    &self,
    request: ValidateVolumeCapabilitiesRequest,
  ) -> Result<ValidateVolumeCapabilitiesResponse, ValidateVolumeCapabilitiesError> {
    Ok(match self.shares.validate_capabilities(&request).await? {
      None => ValidateVolumeCapabilitiesResponse::Confirmed(Confirmed::new(
        request.volume_capabilities().to_vec(),
        request.volume_context().clone(),
        request.parameters().clone(),
      )),
      Some(message) => ValidateVolumeCapabilitiesResponse::Message(message),
    })
  }

  async fn create_snapshot(
    &self,
    request: CreateSnapshotRequest,
  ) -> Result<Snapshot, CreateSnapshotError> {
    Ok(self.shares.create_snapshot(&request).await?)
  }

  async fn delete_snapshot(&self, request: DeleteSnapshotRequest) -> Result<(), DeleteSnapshotError> {
    Ok(self.shares.delete_snapshot(&request).await?)
  }

  async fn controller_expand_volume(
    &self,
    request: ControllerExpandVolumeRequest,
  ) -> Result<ControllerExpandVolumeResponse, ControllerExpandVolumeError> {
    Ok(self.shares.expand_volume(&request).await?)
  }
}
