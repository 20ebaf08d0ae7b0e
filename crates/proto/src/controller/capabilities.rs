use std::convert::TryFrom;

use bitflags::bitflags;

use crate::proto;

#[rustfmt::skip]
bitflags! {
  /// Controller RPC groups a plugin can advertise.
  pub struct ControllerCapabilities: u32 {
    const CREATE_DELETE_VOLUME   = 0b_0000_0001;

    /// Snapshots are consumed by creating a volume from them, so this
    /// implies restore support.
    const CREATE_DELETE_SNAPSHOT = 0b_0000_0010;

    /// The source volume must be managed by the same plugin.
    const CLONE_VOLUME           = 0b_0000_0100;

    const EXPAND_VOLUME          = 0b_0000_1000;
  }
}

use proto::controller_service_capability::rpc::Type;

const RPC_TYPES: [(ControllerCapabilities, Type); 4] = [
  (
    ControllerCapabilities::CREATE_DELETE_VOLUME,
    Type::CreateDeleteVolume,
  ),
  (
    ControllerCapabilities::CREATE_DELETE_SNAPSHOT,
    Type::CreateDeleteSnapshot,
  ),
  (ControllerCapabilities::CLONE_VOLUME, Type::CloneVolume),
  (ControllerCapabilities::EXPAND_VOLUME, Type::ExpandVolume),
];

impl TryFrom<ControllerCapabilities> for proto::ControllerGetCapabilitiesResponse {
  type Error = tonic::Status;

  fn try_from(value: ControllerCapabilities) -> Result<Self, Self::Error> {
    let capabilities = RPC_TYPES
      .iter()
      .filter(|(flag, _)| value.contains(*flag))
      .map(|(_, rpc)| proto::ControllerServiceCapability {
        r#type: Some(proto::controller_service_capability::Type::Rpc(
          proto::controller_service_capability::Rpc {
            r#type: *rpc as i32,
          },
        )),
      })
      .collect();

    Ok(proto::ControllerGetCapabilitiesResponse { capabilities })
  }
}
