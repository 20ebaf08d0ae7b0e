macro_rules! unsupported {
  ($name:expr) => {{
    ::tracing::error!("Unsupported method {} called", $name);
    return Err(
      ::tonic::Status::new(
        ::tonic::Code::Unimplemented,
        format!("Unsupported method {} called", $name),
      )
      .into(),
    );
  }};
}

pub mod controller;
pub mod server;
pub mod volume;

mod plugin;
mod proto;
mod utils;

use std::collections::HashMap;

use lazy_static::lazy_static;

pub use controller::ControllerService;
pub use server::{serve, Endpoint, ServeError};

#[derive(Eq, Clone, Copy, PartialEq, Debug, Hash)]
pub enum VolumeExpansionSupport {
  None,
  Offline,
  Online,
}

pub trait IdentityService: Send + Sync + 'static {
  /// Plugin name in domain name notation, at most 63 characters.
  fn name(&self) -> &str;

  /// Plugin version. Opaque to the orchestrator.
  fn version(&self) -> &str;

  #[inline]
  fn volume_accessibility_constraints_support(&self) -> bool {
    false
  }

  #[inline]
  fn volume_expansion_support(&self) -> VolumeExpansionSupport {
    VolumeExpansionSupport::None
  }

  /// Answer for `Probe`. A controller that has not finished wiring its
  /// cloud clients should report `false`.
  #[inline]
  fn ready(&self) -> bool {
    true
  }

  #[inline]
  fn manifest(&self) -> &HashMap<String, String> {
    lazy_static! {
      static ref EMPTY_MANIFEST: HashMap<String, String> = HashMap::new();
    }

    &EMPTY_MANIFEST
  }
}
