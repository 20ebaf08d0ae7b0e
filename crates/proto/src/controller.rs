mod capabilities;
mod create_snapshot;
mod create_volume;
mod delete_snapshot;
mod delete_volume;
mod expand_volume;
mod secrets;
mod snapshot;
mod validate_volume_capabilities;

use crate::{
  plugin, proto,
  utils::{record_request, Record},
  IdentityService,
};
use async_trait::async_trait;
use secrets::Secrets;
use std::{
  convert::{TryFrom, TryInto},
  sync::Arc,
};
use tracing::instrument;

pub use crate::volume::*;
pub use capabilities::*;
pub use create_snapshot::*;
pub use create_volume::*;
pub use delete_snapshot::*;
pub use delete_volume::*;
pub use expand_volume::*;
pub use snapshot::*;
pub use validate_volume_capabilities::*;

/// The controller half of a CSI plugin. Listing, capacity and attach RPCs
/// are always answered with `Unimplemented`.
#[async_trait]
pub trait ControllerService: IdentityService {
  /// RPC groups advertised through `ControllerGetCapabilities`.
  #[inline]
  fn capabilities(&self) -> ControllerCapabilities {
    ControllerCapabilities::empty()
  }

  /// Provisions a volume: empty, cloned from another volume, or restored from
  /// a snapshot. Repeating a request with the same name must be idempotent.
  #[allow(unused_variables)]
  async fn create_volume(&self, request: CreateVolumeRequest) -> Result<Volume, CreateVolumeError> {
    unsupported!("CreateVolume")
  }

  /// Deprovisions a volume. A volume that is already gone is a success.
  #[allow(unused_variables)]
  async fn delete_volume(&self, request: DeleteVolumeRequest) -> Result<(), DeleteVolumeError> {
    unsupported!("DeleteVolume")
  }

  /// Checks whether a pre-provisioned volume supports every requested
  /// capability.
  async fn validate_volume_capabilities(
    &self,
    request: ValidateVolumeCapabilitiesRequest,
  ) -> Result<ValidateVolumeCapabilitiesResponse, ValidateVolumeCapabilitiesError>;

  /// Cuts a snapshot of a source volume. Must block until the snapshot is
  /// cut; set `ready_to_use` to false while it is still being processed.
  #[allow(unused_variables)]
  async fn create_snapshot(
    &self,
    request: CreateSnapshotRequest,
  ) -> Result<Snapshot, CreateSnapshotError> {
    unsupported!("CreateSnapshot")
  }

  /// Deletes a snapshot. A snapshot that is already gone is a success.
  #[allow(unused_variables)]
  async fn delete_snapshot(&self, request: DeleteSnapshotRequest) -> Result<(), DeleteSnapshotError> {
    unsupported!("DeleteSnapshot")
  }

  /// Grows a volume. Requests for a size the volume already has must succeed.
  #[allow(unused_variables)]
  async fn controller_expand_volume(
    &self,
    request: ControllerExpandVolumeRequest,
  ) -> Result<ControllerExpandVolumeResponse, ControllerExpandVolumeError> {
    unsupported!("ControllerExpandVolume")
  }
}

pub(crate) struct Controller<T: ControllerService>(pub(crate) Arc<T>);

impl<T: ControllerService> Clone for Controller<T> {
  fn clone(&self) -> Self {
    Controller(self.0.clone())
  }
}

#[async_trait]
impl<T: ControllerService> proto::identity_server::Identity for Controller<T> {
  #[instrument(
    name = "identity.get_plugin_info",
    skip(self, _request),
    fields(name, vendor_version, manifest)
  )]
  async fn get_plugin_info(
    &self,
    _request: tonic::Request<proto::GetPluginInfoRequest>,
  ) -> Result<tonic::Response<proto::GetPluginInfoResponse>, tonic::Status> {
    let response = proto::GetPluginInfoResponse {
      name: self.0.name().record_field("name").into(),
      vendor_version: self.0.version().record_field("vendor_version").into(),
      manifest: self.0.manifest().record_field("manifest").clone(),
    };

    Ok(tonic::Response::new(response))
  }

  #[instrument(
    name = "identity.get_plugin_capabilities",
    skip(self, _request),
    fields(response)
  )]
  async fn get_plugin_capabilities(
    &self,
    _request: tonic::Request<proto::GetPluginCapabilitiesRequest>,
  ) -> Result<tonic::Response<proto::GetPluginCapabilitiesResponse>, tonic::Status> {
    let response = plugin::get_capabilities(&*self.0).record_response();
    Ok(tonic::Response::new(response))
  }

  #[instrument(name = "identity.probe", skip(self, _request), fields(ready))]
  async fn probe(
    &self,
    _request: tonic::Request<proto::ProbeRequest>,
  ) -> Result<tonic::Response<proto::ProbeResponse>, tonic::Status> {
    let response = proto::ProbeResponse {
      ready: Some(self.0.ready().record_field("ready")),
    };

    Ok(tonic::Response::new(response))
  }
}

#[async_trait]
impl<T: ControllerService> proto::controller_server::Controller for Controller<T> {
  #[instrument(
    name = "controller.create_volume",
    skip(self, request),
    fields(request, response)
  )]
  async fn create_volume(
    &self,
    request: tonic::Request<proto::CreateVolumeRequest>,
  ) -> Result<tonic::Response<proto::CreateVolumeResponse>, tonic::Status> {
    let request = record_request(CreateVolumeRequest::try_from(request.into_inner())?);
    let response = self
      .0
      .create_volume(request)
      .await?
      .record_response()
      .try_into()?;
    Ok(tonic::Response::new(response))
  }

  #[instrument(
    name = "controller.delete_volume",
    skip(self, request),
    fields(request)
  )]
  async fn delete_volume(
    &self,
    request: tonic::Request<proto::DeleteVolumeRequest>,
  ) -> Result<tonic::Response<proto::DeleteVolumeResponse>, tonic::Status> {
    let request = record_request(DeleteVolumeRequest::try_from(request.into_inner())?);
    self.0.delete_volume(request).await?;
    Ok(tonic::Response::new(proto::DeleteVolumeResponse {}))
  }

  async fn controller_publish_volume(
    &self,
    _request: tonic::Request<proto::ControllerPublishVolumeRequest>,
  ) -> Result<tonic::Response<proto::ControllerPublishVolumeResponse>, tonic::Status> {
    unsupported!("ControllerPublishVolume")
  }

  async fn controller_unpublish_volume(
    &self,
    _request: tonic::Request<proto::ControllerUnpublishVolumeRequest>,
  ) -> Result<tonic::Response<proto::ControllerUnpublishVolumeResponse>, tonic::Status> {
    unsupported!("ControllerUnpublishVolume")
  }

  #[instrument(
    name = "controller.validate_volume_capabilities",
    skip(self, request),
    fields(request, response)
  )]
  async fn validate_volume_capabilities(
    &self,
    request: tonic::Request<proto::ValidateVolumeCapabilitiesRequest>,
  ) -> Result<tonic::Response<proto::ValidateVolumeCapabilitiesResponse>, tonic::Status> {
    let request = record_request(ValidateVolumeCapabilitiesRequest::try_from(
      request.into_inner(),
    )?);
    let response = self
      .0
      .validate_volume_capabilities(request)
      .await?
      .record_response()
      .try_into()?;
    Ok(tonic::Response::new(response))
  }

  async fn list_volumes(
    &self,
    _request: tonic::Request<proto::ListVolumesRequest>,
  ) -> Result<tonic::Response<proto::ListVolumesResponse>, tonic::Status> {
    unsupported!("ListVolumes")
  }

  async fn get_capacity(
    &self,
    _request: tonic::Request<proto::GetCapacityRequest>,
  ) -> Result<tonic::Response<proto::GetCapacityResponse>, tonic::Status> {
    unsupported!("GetCapacity")
  }

  #[instrument(
    name = "controller.controller_get_capabilities",
    skip(self, _request),
    fields(response)
  )]
  async fn controller_get_capabilities(
    &self,
    _request: tonic::Request<proto::ControllerGetCapabilitiesRequest>,
  ) -> Result<tonic::Response<proto::ControllerGetCapabilitiesResponse>, tonic::Status> {
    let response = self.0.capabilities().record_response().try_into()?;
    Ok(tonic::Response::new(response))
  }

  #[instrument(
    name = "controller.create_snapshot",
    skip(self, request),
    fields(request, response)
  )]
  async fn create_snapshot(
    &self,
    request: tonic::Request<proto::CreateSnapshotRequest>,
  ) -> Result<tonic::Response<proto::CreateSnapshotResponse>, tonic::Status> {
    let request = record_request(CreateSnapshotRequest::try_from(request.into_inner())?);
    let response = self
      .0
      .create_snapshot(request)
      .await?
      .record_response()
      .try_into()?;
    Ok(tonic::Response::new(response))
  }

  #[instrument(
    name = "controller.delete_snapshot",
    skip(self, request),
    fields(request)
  )]
  async fn delete_snapshot(
    &self,
    request: tonic::Request<proto::DeleteSnapshotRequest>,
  ) -> Result<tonic::Response<proto::DeleteSnapshotResponse>, tonic::Status> {
    let request = record_request(DeleteSnapshotRequest::try_from(request.into_inner())?);
    self.0.delete_snapshot(request).await?;
    Ok(tonic::Response::new(proto::DeleteSnapshotResponse {}))
  }

  async fn list_snapshots(
    &self,
    _request: tonic::Request<proto::ListSnapshotsRequest>,
  ) -> Result<tonic::Response<proto::ListSnapshotsResponse>, tonic::Status> {
    unsupported!("ListSnapshots")
  }

  #[instrument(
    name = "controller.controller_expand_volume",
    skip(self, request),
    fields(request, response)
  )]
  async fn controller_expand_volume(
    &self,
    request: tonic::Request<proto::ControllerExpandVolumeRequest>,
  ) -> Result<tonic::Response<proto::ControllerExpandVolumeResponse>, tonic::Status> {
    let request = record_request(ControllerExpandVolumeRequest::try_from(
      request.into_inner(),
    )?);
    let response = self
      .0
      .controller_expand_volume(request)
      .await?
      .record_response()
      .try_into()?;
    Ok(tonic::Response::new(response))
  }

  async fn controller_get_volume(
    &self,
    _request: tonic::Request<proto::ControllerGetVolumeRequest>,
  ) -> Result<tonic::Response<proto::ControllerGetVolumeResponse>, tonic::Status> {
    unsupported!("ControllerGetVolume")
  }
}
