// Generated by tonic-build from the CSI v1 protobuf definition.
// Only the Identity and Controller services are kept; the Node service
// is served by a separate plugin.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPluginInfoRequest {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPluginInfoResponse {
  #[prost(string, tag = "1")]
  pub name: ::prost::alloc::string::String,
  #[prost(string, tag = "2")]
  pub vendor_version: ::prost::alloc::string::String,
  #[prost(map = "string, string", tag = "3")]
  pub manifest:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPluginCapabilitiesRequest {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPluginCapabilitiesResponse {
  #[prost(message, repeated, tag = "1")]
  pub capabilities: ::prost::alloc::vec::Vec<PluginCapability>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PluginCapability {
  #[prost(oneof = "plugin_capability::Type", tags = "1, 2")]
  pub r#type: ::core::option::Option<plugin_capability::Type>,
}
pub mod plugin_capability {
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct Service {
    #[prost(enumeration = "service::Type", tag = "1")]
    pub r#type: i32,
  }
  pub mod service {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
      Unknown = 0,
      ControllerService = 1,
      VolumeAccessibilityConstraints = 2,
    }
  }
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct VolumeExpansion {
    #[prost(enumeration = "volume_expansion::Type", tag = "1")]
    pub r#type: i32,
  }
  pub mod volume_expansion {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
      Unknown = 0,
      Online = 1,
      Offline = 2,
    }
  }
  #[derive(Clone, PartialEq, ::prost::Oneof)]
  pub enum Type {
    #[prost(message, tag = "1")]
    Service(Service),
    #[prost(message, tag = "2")]
    VolumeExpansion(VolumeExpansion),
  }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProbeRequest {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProbeResponse {
  #[prost(message, optional, tag = "1")]
  pub ready: ::core::option::Option<bool>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateVolumeRequest {
  #[prost(string, tag = "1")]
  pub name: ::prost::alloc::string::String,
  #[prost(message, optional, tag = "2")]
  pub capacity_range: ::core::option::Option<CapacityRange>,
  #[prost(message, repeated, tag = "3")]
  pub volume_capabilities: ::prost::alloc::vec::Vec<VolumeCapability>,
  #[prost(map = "string, string", tag = "4")]
  pub parameters:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
  #[prost(map = "string, string", tag = "5")]
  pub secrets:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
  #[prost(message, optional, tag = "6")]
  pub volume_content_source: ::core::option::Option<VolumeContentSource>,
  #[prost(message, optional, tag = "7")]
  pub accessibility_requirements: ::core::option::Option<TopologyRequirement>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VolumeContentSource {
  #[prost(oneof = "volume_content_source::Type", tags = "1, 2")]
  pub r#type: ::core::option::Option<volume_content_source::Type>,
}
pub mod volume_content_source {
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct SnapshotSource {
    #[prost(string, tag = "1")]
    pub snapshot_id: ::prost::alloc::string::String,
  }
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct VolumeSource {
    #[prost(string, tag = "1")]
    pub volume_id: ::prost::alloc::string::String,
  }
  #[derive(Clone, PartialEq, ::prost::Oneof)]
  pub enum Type {
    #[prost(message, tag = "1")]
    Snapshot(SnapshotSource),
    #[prost(message, tag = "2")]
    Volume(VolumeSource),
  }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateVolumeResponse {
  #[prost(message, optional, tag = "1")]
  pub volume: ::core::option::Option<Volume>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VolumeCapability {
  #[prost(message, optional, tag = "3")]
  pub access_mode: ::core::option::Option<volume_capability::AccessMode>,
  #[prost(oneof = "volume_capability::AccessType", tags = "1, 2")]
  pub access_type: ::core::option::Option<volume_capability::AccessType>,
}
pub mod volume_capability {
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct BlockVolume {}
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct MountVolume {
    #[prost(string, tag = "1")]
    pub fs_type: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "2")]
    pub mount_flags: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
  }
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct AccessMode {
    #[prost(enumeration = "access_mode::Mode", tag = "1")]
    pub mode: i32,
  }
  pub mod access_mode {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Mode {
      Unknown = 0,
      SingleNodeWriter = 1,
      SingleNodeReaderOnly = 2,
      MultiNodeReaderOnly = 3,
      MultiNodeSingleWriter = 4,
      MultiNodeMultiWriter = 5,
    }
  }
  #[derive(Clone, PartialEq, ::prost::Oneof)]
  pub enum AccessType {
    #[prost(message, tag = "1")]
    Block(BlockVolume),
    #[prost(message, tag = "2")]
    Mount(MountVolume),
  }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CapacityRange {
  #[prost(int64, tag = "1")]
  pub required_bytes: i64,
  #[prost(int64, tag = "2")]
  pub limit_bytes: i64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Volume {
  #[prost(int64, tag = "1")]
  pub capacity_bytes: i64,
  #[prost(string, tag = "2")]
  pub volume_id: ::prost::alloc::string::String,
  #[prost(map = "string, string", tag = "3")]
  pub volume_context:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
  #[prost(message, optional, tag = "4")]
  pub content_source: ::core::option::Option<VolumeContentSource>,
  #[prost(message, repeated, tag = "5")]
  pub accessible_topology: ::prost::alloc::vec::Vec<Topology>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TopologyRequirement {
  #[prost(message, repeated, tag = "1")]
  pub requisite: ::prost::alloc::vec::Vec<Topology>,
  #[prost(message, repeated, tag = "2")]
  pub preferred: ::prost::alloc::vec::Vec<Topology>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Topology {
  #[prost(map = "string, string", tag = "1")]
  pub segments:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteVolumeRequest {
  #[prost(string, tag = "1")]
  pub volume_id: ::prost::alloc::string::String,
  #[prost(map = "string, string", tag = "2")]
  pub secrets:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteVolumeResponse {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerPublishVolumeRequest {
  #[prost(string, tag = "1")]
  pub volume_id: ::prost::alloc::string::String,
  #[prost(string, tag = "2")]
  pub node_id: ::prost::alloc::string::String,
  #[prost(message, optional, tag = "3")]
  pub volume_capability: ::core::option::Option<VolumeCapability>,
  #[prost(bool, tag = "4")]
  pub readonly: bool,
  #[prost(map = "string, string", tag = "5")]
  pub secrets:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
  #[prost(map = "string, string", tag = "6")]
  pub volume_context:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerPublishVolumeResponse {
  #[prost(map = "string, string", tag = "1")]
  pub publish_context:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerUnpublishVolumeRequest {
  #[prost(string, tag = "1")]
  pub volume_id: ::prost::alloc::string::String,
  #[prost(string, tag = "2")]
  pub node_id: ::prost::alloc::string::String,
  #[prost(map = "string, string", tag = "3")]
  pub secrets:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerUnpublishVolumeResponse {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateVolumeCapabilitiesRequest {
  #[prost(string, tag = "1")]
  pub volume_id: ::prost::alloc::string::String,
  #[prost(map = "string, string", tag = "2")]
  pub volume_context:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
  #[prost(message, repeated, tag = "3")]
  pub volume_capabilities: ::prost::alloc::vec::Vec<VolumeCapability>,
  #[prost(map = "string, string", tag = "4")]
  pub parameters:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
  #[prost(map = "string, string", tag = "5")]
  pub secrets:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateVolumeCapabilitiesResponse {
  #[prost(message, optional, tag = "1")]
  pub confirmed: ::core::option::Option<validate_volume_capabilities_response::Confirmed>,
  #[prost(string, tag = "2")]
  pub message: ::prost::alloc::string::String,
}
pub mod validate_volume_capabilities_response {
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct Confirmed {
    #[prost(map = "string, string", tag = "1")]
    pub volume_context:
      ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
    #[prost(message, repeated, tag = "2")]
    pub volume_capabilities: ::prost::alloc::vec::Vec<super::VolumeCapability>,
    #[prost(map = "string, string", tag = "3")]
    pub parameters:
      ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
  }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListVolumesRequest {
  #[prost(int32, tag = "1")]
  pub max_entries: i32,
  #[prost(string, tag = "2")]
  pub starting_token: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListVolumesResponse {
  #[prost(message, repeated, tag = "1")]
  pub entries: ::prost::alloc::vec::Vec<list_volumes_response::Entry>,
  #[prost(string, tag = "2")]
  pub next_token: ::prost::alloc::string::String,
}
pub mod list_volumes_response {
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct VolumeStatus {
    #[prost(string, repeated, tag = "1")]
    pub published_node_ids: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "2")]
    pub volume_condition: ::core::option::Option<super::VolumeCondition>,
  }
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct Entry {
    #[prost(message, optional, tag = "1")]
    pub volume: ::core::option::Option<super::Volume>,
    #[prost(message, optional, tag = "2")]
    pub status: ::core::option::Option<VolumeStatus>,
  }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerGetVolumeRequest {
  #[prost(string, tag = "1")]
  pub volume_id: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerGetVolumeResponse {
  #[prost(message, optional, tag = "1")]
  pub volume: ::core::option::Option<Volume>,
  #[prost(message, optional, tag = "2")]
  pub status: ::core::option::Option<controller_get_volume_response::VolumeStatus>,
}
pub mod controller_get_volume_response {
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct VolumeStatus {
    #[prost(string, repeated, tag = "1")]
    pub published_node_ids: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "2")]
    pub volume_condition: ::core::option::Option<super::VolumeCondition>,
  }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetCapacityRequest {
  #[prost(message, repeated, tag = "1")]
  pub volume_capabilities: ::prost::alloc::vec::Vec<VolumeCapability>,
  #[prost(map = "string, string", tag = "2")]
  pub parameters:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
  #[prost(message, optional, tag = "3")]
  pub accessible_topology: ::core::option::Option<Topology>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetCapacityResponse {
  #[prost(int64, tag = "1")]
  pub available_capacity: i64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerGetCapabilitiesRequest {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerGetCapabilitiesResponse {
  #[prost(message, repeated, tag = "1")]
  pub capabilities: ::prost::alloc::vec::Vec<ControllerServiceCapability>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerServiceCapability {
  #[prost(oneof = "controller_service_capability::Type", tags = "1")]
  pub r#type: ::core::option::Option<controller_service_capability::Type>,
}
pub mod controller_service_capability {
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct Rpc {
    #[prost(enumeration = "rpc::Type", tag = "1")]
    pub r#type: i32,
  }
  pub mod rpc {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
      Unknown = 0,
      CreateDeleteVolume = 1,
      PublishUnpublishVolume = 2,
      ListVolumes = 3,
      GetCapacity = 4,
      CreateDeleteSnapshot = 5,
      ListSnapshots = 6,
      CloneVolume = 7,
      PublishReadonly = 8,
      ExpandVolume = 9,
      ListVolumesPublishedNodes = 10,
      VolumeCondition = 11,
      GetVolume = 12,
    }
  }
  #[derive(Clone, PartialEq, ::prost::Oneof)]
  pub enum Type {
    #[prost(message, tag = "1")]
    Rpc(Rpc),
  }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateSnapshotRequest {
  #[prost(string, tag = "1")]
  pub source_volume_id: ::prost::alloc::string::String,
  #[prost(string, tag = "2")]
  pub name: ::prost::alloc::string::String,
  #[prost(map = "string, string", tag = "3")]
  pub secrets:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
  #[prost(map = "string, string", tag = "4")]
  pub parameters:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateSnapshotResponse {
  #[prost(message, optional, tag = "1")]
  pub snapshot: ::core::option::Option<Snapshot>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Snapshot {
  #[prost(int64, tag = "1")]
  pub size_bytes: i64,
  #[prost(string, tag = "2")]
  pub snapshot_id: ::prost::alloc::string::String,
  #[prost(string, tag = "3")]
  pub source_volume_id: ::prost::alloc::string::String,
  #[prost(message, optional, tag = "4")]
  pub creation_time: ::core::option::Option<::prost_types::Timestamp>,
  #[prost(bool, tag = "5")]
  pub ready_to_use: bool,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteSnapshotRequest {
  #[prost(string, tag = "1")]
  pub snapshot_id: ::prost::alloc::string::String,
  #[prost(map = "string, string", tag = "2")]
  pub secrets:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteSnapshotResponse {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListSnapshotsRequest {
  #[prost(int32, tag = "1")]
  pub max_entries: i32,
  #[prost(string, tag = "2")]
  pub starting_token: ::prost::alloc::string::String,
  #[prost(string, tag = "3")]
  pub source_volume_id: ::prost::alloc::string::String,
  #[prost(string, tag = "4")]
  pub snapshot_id: ::prost::alloc::string::String,
  #[prost(map = "string, string", tag = "5")]
  pub secrets:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListSnapshotsResponse {
  #[prost(message, repeated, tag = "1")]
  pub entries: ::prost::alloc::vec::Vec<list_snapshots_response::Entry>,
  #[prost(string, tag = "2")]
  pub next_token: ::prost::alloc::string::String,
}
pub mod list_snapshots_response {
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct Entry {
    #[prost(message, optional, tag = "1")]
    pub snapshot: ::core::option::Option<super::Snapshot>,
  }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerExpandVolumeRequest {
  #[prost(string, tag = "1")]
  pub volume_id: ::prost::alloc::string::String,
  #[prost(message, optional, tag = "2")]
  pub capacity_range: ::core::option::Option<CapacityRange>,
  #[prost(map = "string, string", tag = "3")]
  pub secrets:
    ::std::collections::HashMap<::prost::alloc::string::String, ::prost::alloc::string::String>,
  #[prost(message, optional, tag = "4")]
  pub volume_capability: ::core::option::Option<VolumeCapability>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControllerExpandVolumeResponse {
  #[prost(int64, tag = "1")]
  pub capacity_bytes: i64,
  #[prost(bool, tag = "2")]
  pub node_expansion_required: bool,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VolumeCondition {
  #[prost(bool, tag = "1")]
  pub abnormal: bool,
  #[prost(string, tag = "2")]
  pub message: ::prost::alloc::string::String,
}
#[doc = r" Generated server implementations."]
pub mod identity_server {
  #![allow(unused_variables, dead_code, missing_docs)]
  use tonic::codegen::*;
  #[doc = "Generated trait containing gRPC methods that should be implemented for use with IdentityServer."]
  #[async_trait]
  pub trait Identity: Send + Sync + 'static {
    async fn get_plugin_info(
      &self,
      request: tonic::Request<super::GetPluginInfoRequest>,
    ) -> Result<tonic::Response<super::GetPluginInfoResponse>, tonic::Status>;
    async fn get_plugin_capabilities(
      &self,
      request: tonic::Request<super::GetPluginCapabilitiesRequest>,
    ) -> Result<tonic::Response<super::GetPluginCapabilitiesResponse>, tonic::Status>;
    async fn probe(
      &self,
      request: tonic::Request<super::ProbeRequest>,
    ) -> Result<tonic::Response<super::ProbeResponse>, tonic::Status>;
  }
  #[derive(Debug)]
  pub struct IdentityServer<T: Identity> {
    inner: _Inner<T>,
  }
  struct _Inner<T>(Arc<T>, Option<tonic::Interceptor>);
  impl<T: Identity> IdentityServer<T> {
    pub fn new(inner: T) -> Self {
      let inner = Arc::new(inner);
      let inner = _Inner(inner, None);
      Self { inner }
    }
    pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
      let inner = Arc::new(inner);
      let inner = _Inner(inner, Some(interceptor.into()));
      Self { inner }
    }
  }
  impl<T, B> Service<http::Request<B>> for IdentityServer<T>
  where
    T: Identity,
    B: HttpBody + Send + Sync + 'static,
    B::Error: Into<StdError> + Send + 'static,
  {
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = Never;
    type Future = BoxFuture<Self::Response, Self::Error>;
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
      Poll::Ready(Ok(()))
    }
    fn call(&mut self, req: http::Request<B>) -> Self::Future {
      let inner = self.inner.clone();
      match req.uri().path() {
        "/csi.v1.Identity/GetPluginInfo" => {
          #[allow(non_camel_case_types)]
          struct GetPluginInfoSvc<T: Identity>(pub Arc<T>);
          impl<T: Identity> tonic::server::UnaryService<super::GetPluginInfoRequest> for GetPluginInfoSvc<T> {
            type Response = super::GetPluginInfoResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::GetPluginInfoRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).get_plugin_info(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = GetPluginInfoSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Identity/GetPluginCapabilities" => {
          #[allow(non_camel_case_types)]
          struct GetPluginCapabilitiesSvc<T: Identity>(pub Arc<T>);
          impl<T: Identity> tonic::server::UnaryService<super::GetPluginCapabilitiesRequest>
            for GetPluginCapabilitiesSvc<T>
          {
            type Response = super::GetPluginCapabilitiesResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::GetPluginCapabilitiesRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).get_plugin_capabilities(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = GetPluginCapabilitiesSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Identity/Probe" => {
          #[allow(non_camel_case_types)]
          struct ProbeSvc<T: Identity>(pub Arc<T>);
          impl<T: Identity> tonic::server::UnaryService<super::ProbeRequest> for ProbeSvc<T> {
            type Response = super::ProbeResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(&mut self, request: tonic::Request<super::ProbeRequest>) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).probe(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = ProbeSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        _ => Box::pin(async move {
          Ok(
            http::Response::builder()
              .status(200)
              .header("grpc-status", "12")
              .header("content-type", "application/grpc")
              .body(tonic::body::BoxBody::empty())
              .unwrap(),
          )
        }),
      }
    }
  }
  impl<T: Identity> Clone for IdentityServer<T> {
    fn clone(&self) -> Self {
      let inner = self.inner.clone();
      Self { inner }
    }
  }
  impl<T: Identity> Clone for _Inner<T> {
    fn clone(&self) -> Self {
      Self(self.0.clone(), self.1.clone())
    }
  }
  impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      write!(f, "{:?}", self.0)
    }
  }
  impl<T: Identity> tonic::transport::NamedService for IdentityServer<T> {
    const NAME: &'static str = "csi.v1.Identity";
  }
}
#[doc = r" Generated server implementations."]
pub mod controller_server {
  #![allow(unused_variables, dead_code, missing_docs)]
  use tonic::codegen::*;
  #[doc = "Generated trait containing gRPC methods that should be implemented for use with ControllerServer."]
  #[async_trait]
  pub trait Controller: Send + Sync + 'static {
    async fn create_volume(
      &self,
      request: tonic::Request<super::CreateVolumeRequest>,
    ) -> Result<tonic::Response<super::CreateVolumeResponse>, tonic::Status>;
    async fn delete_volume(
      &self,
      request: tonic::Request<super::DeleteVolumeRequest>,
    ) -> Result<tonic::Response<super::DeleteVolumeResponse>, tonic::Status>;
    async fn controller_publish_volume(
      &self,
      request: tonic::Request<super::ControllerPublishVolumeRequest>,
    ) -> Result<tonic::Response<super::ControllerPublishVolumeResponse>, tonic::Status>;
    async fn controller_unpublish_volume(
      &self,
      request: tonic::Request<super::ControllerUnpublishVolumeRequest>,
    ) -> Result<tonic::Response<super::ControllerUnpublishVolumeResponse>, tonic::Status>;
    async fn validate_volume_capabilities(
      &self,
      request: tonic::Request<super::ValidateVolumeCapabilitiesRequest>,
    ) -> Result<tonic::Response<super::ValidateVolumeCapabilitiesResponse>, tonic::Status>;
    async fn list_volumes(
      &self,
      request: tonic::Request<super::ListVolumesRequest>,
    ) -> Result<tonic::Response<super::ListVolumesResponse>, tonic::Status>;
    async fn get_capacity(
      &self,
      request: tonic::Request<super::GetCapacityRequest>,
    ) -> Result<tonic::Response<super::GetCapacityResponse>, tonic::Status>;
    async fn controller_get_capabilities(
      &self,
      request: tonic::Request<super::ControllerGetCapabilitiesRequest>,
    ) -> Result<tonic::Response<super::ControllerGetCapabilitiesResponse>, tonic::Status>;
    async fn create_snapshot(
      &self,
      request: tonic::Request<super::CreateSnapshotRequest>,
    ) -> Result<tonic::Response<super::CreateSnapshotResponse>, tonic::Status>;
    async fn delete_snapshot(
      &self,
      request: tonic::Request<super::DeleteSnapshotRequest>,
    ) -> Result<tonic::Response<super::DeleteSnapshotResponse>, tonic::Status>;
    async fn list_snapshots(
      &self,
      request: tonic::Request<super::ListSnapshotsRequest>,
    ) -> Result<tonic::Response<super::ListSnapshotsResponse>, tonic::Status>;
    async fn controller_expand_volume(
      &self,
      request: tonic::Request<super::ControllerExpandVolumeRequest>,
    ) -> Result<tonic::Response<super::ControllerExpandVolumeResponse>, tonic::Status>;
    async fn controller_get_volume(
      &self,
      request: tonic::Request<super::ControllerGetVolumeRequest>,
    ) -> Result<tonic::Response<super::ControllerGetVolumeResponse>, tonic::Status>;
  }
  #[derive(Debug)]
  pub struct ControllerServer<T: Controller> {
    inner: _Inner<T>,
  }
  struct _Inner<T>(Arc<T>, Option<tonic::Interceptor>);
  impl<T: Controller> ControllerServer<T> {
    pub fn new(inner: T) -> Self {
      let inner = Arc::new(inner);
      let inner = _Inner(inner, None);
      Self { inner }
    }
    pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
      let inner = Arc::new(inner);
      let inner = _Inner(inner, Some(interceptor.into()));
      Self { inner }
    }
  }
  impl<T, B> Service<http::Request<B>> for ControllerServer<T>
  where
    T: Controller,
    B: HttpBody + Send + Sync + 'static,
    B::Error: Into<StdError> + Send + 'static,
  {
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = Never;
    type Future = BoxFuture<Self::Response, Self::Error>;
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
      Poll::Ready(Ok(()))
    }
    fn call(&mut self, req: http::Request<B>) -> Self::Future {
      let inner = self.inner.clone();
      match req.uri().path() {
        "/csi.v1.Controller/CreateVolume" => {
          #[allow(non_camel_case_types)]
          struct CreateVolumeSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::CreateVolumeRequest> for CreateVolumeSvc<T> {
            type Response = super::CreateVolumeResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::CreateVolumeRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).create_volume(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = CreateVolumeSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/DeleteVolume" => {
          #[allow(non_camel_case_types)]
          struct DeleteVolumeSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::DeleteVolumeRequest> for DeleteVolumeSvc<T> {
            type Response = super::DeleteVolumeResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::DeleteVolumeRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).delete_volume(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = DeleteVolumeSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/ControllerPublishVolume" => {
          #[allow(non_camel_case_types)]
          struct ControllerPublishVolumeSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::ControllerPublishVolumeRequest>
            for ControllerPublishVolumeSvc<T>
          {
            type Response = super::ControllerPublishVolumeResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::ControllerPublishVolumeRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).controller_publish_volume(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = ControllerPublishVolumeSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/ControllerUnpublishVolume" => {
          #[allow(non_camel_case_types)]
          struct ControllerUnpublishVolumeSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::ControllerUnpublishVolumeRequest>
            for ControllerUnpublishVolumeSvc<T>
          {
            type Response = super::ControllerUnpublishVolumeResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::ControllerUnpublishVolumeRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).controller_unpublish_volume(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = ControllerUnpublishVolumeSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/ValidateVolumeCapabilities" => {
          #[allow(non_camel_case_types)]
          struct ValidateVolumeCapabilitiesSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::ValidateVolumeCapabilitiesRequest>
            for ValidateVolumeCapabilitiesSvc<T>
          {
            type Response = super::ValidateVolumeCapabilitiesResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::ValidateVolumeCapabilitiesRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).validate_volume_capabilities(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = ValidateVolumeCapabilitiesSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/ListVolumes" => {
          #[allow(non_camel_case_types)]
          struct ListVolumesSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::ListVolumesRequest> for ListVolumesSvc<T> {
            type Response = super::ListVolumesResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(&mut self, request: tonic::Request<super::ListVolumesRequest>) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).list_volumes(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = ListVolumesSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/GetCapacity" => {
          #[allow(non_camel_case_types)]
          struct GetCapacitySvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::GetCapacityRequest> for GetCapacitySvc<T> {
            type Response = super::GetCapacityResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(&mut self, request: tonic::Request<super::GetCapacityRequest>) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).get_capacity(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = GetCapacitySvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/ControllerGetCapabilities" => {
          #[allow(non_camel_case_types)]
          struct ControllerGetCapabilitiesSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::ControllerGetCapabilitiesRequest>
            for ControllerGetCapabilitiesSvc<T>
          {
            type Response = super::ControllerGetCapabilitiesResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::ControllerGetCapabilitiesRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).controller_get_capabilities(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = ControllerGetCapabilitiesSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/CreateSnapshot" => {
          #[allow(non_camel_case_types)]
          struct CreateSnapshotSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::CreateSnapshotRequest>
            for CreateSnapshotSvc<T>
          {
            type Response = super::CreateSnapshotResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::CreateSnapshotRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).create_snapshot(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = CreateSnapshotSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/DeleteSnapshot" => {
          #[allow(non_camel_case_types)]
          struct DeleteSnapshotSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::DeleteSnapshotRequest>
            for DeleteSnapshotSvc<T>
          {
            type Response = super::DeleteSnapshotResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::DeleteSnapshotRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).delete_snapshot(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = DeleteSnapshotSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/ListSnapshots" => {
          #[allow(non_camel_case_types)]
          struct ListSnapshotsSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::ListSnapshotsRequest>
            for ListSnapshotsSvc<T>
          {
            type Response = super::ListSnapshotsResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::ListSnapshotsRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).list_snapshots(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = ListSnapshotsSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/ControllerExpandVolume" => {
          #[allow(non_camel_case_types)]
          struct ControllerExpandVolumeSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::ControllerExpandVolumeRequest>
            for ControllerExpandVolumeSvc<T>
          {
            type Response = super::ControllerExpandVolumeResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::ControllerExpandVolumeRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).controller_expand_volume(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = ControllerExpandVolumeSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        "/csi.v1.Controller/ControllerGetVolume" => {
          #[allow(non_camel_case_types)]
          struct ControllerGetVolumeSvc<T: Controller>(pub Arc<T>);
          impl<T: Controller> tonic::server::UnaryService<super::ControllerGetVolumeRequest>
            for ControllerGetVolumeSvc<T>
          {
            type Response = super::ControllerGetVolumeResponse;
            type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
            fn call(
              &mut self,
              request: tonic::Request<super::ControllerGetVolumeRequest>,
            ) -> Self::Future {
              let inner = self.0.clone();
              let fut = async move { (*inner).controller_get_volume(request).await };
              Box::pin(fut)
            }
          }
          let inner = self.inner.clone();
          let fut = async move {
            let interceptor = inner.1.clone();
            let inner = inner.0;
            let method = ControllerGetVolumeSvc(inner);
            let codec = tonic::codec::ProstCodec::default();
            let mut grpc = if let Some(interceptor) = interceptor {
              tonic::server::Grpc::with_interceptor(codec, interceptor)
            } else {
              tonic::server::Grpc::new(codec)
            };
            let res = grpc.unary(method, req).await;
            Ok(res)
          };
          Box::pin(fut)
        }
        _ => Box::pin(async move {
          Ok(
            http::Response::builder()
              .status(200)
              .header("grpc-status", "12")
              .header("content-type", "application/grpc")
              .body(tonic::body::BoxBody::empty())
              .unwrap(),
          )
        }),
      }
    }
  }
  impl<T: Controller> Clone for ControllerServer<T> {
    fn clone(&self) -> Self {
      let inner = self.inner.clone();
      Self { inner }
    }
  }
  impl<T: Controller> Clone for _Inner<T> {
    fn clone(&self) -> Self {
      Self(self.0.clone(), self.1.clone())
    }
  }
  impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      write!(f, "{:?}", self.0)
    }
  }
  impl<T: Controller> tonic::transport::NamedService for ControllerServer<T> {
    const NAME: &'static str = "csi.v1.Controller";
  }
}
