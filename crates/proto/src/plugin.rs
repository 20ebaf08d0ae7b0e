use crate::{proto, IdentityService, VolumeExpansionSupport};
use proto::plugin_capability::{service, volume_expansion, Service, Type, VolumeExpansion};
use tracing::debug;

fn service_capability(r#type: service::Type) -> proto::PluginCapability {
  proto::PluginCapability {
    r#type: Some(Type::Service(Service {
      r#type: r#type.into(),
    })),
  }
}

fn expansion_capability(r#type: volume_expansion::Type) -> proto::PluginCapability {
  proto::PluginCapability {
    r#type: Some(Type::VolumeExpansion(VolumeExpansion {
      r#type: r#type.into(),
    })),
  }
}

/// Plugin capabilities of a controller plugin: the controller service itself
/// plus whatever the identity reports.
pub(crate) fn get_capabilities(s: &impl IdentityService) -> proto::GetPluginCapabilitiesResponse {
  let mut capabilities = vec![service_capability(service::Type::ControllerService)];

  let volume_accessibility_constraints_support = s.volume_accessibility_constraints_support();
  if volume_accessibility_constraints_support {
    capabilities.push(service_capability(service::Type::VolumeAccessibilityConstraints));
  }

  let volume_expansion_support = s.volume_expansion_support();
  match volume_expansion_support {
    VolumeExpansionSupport::None => (),
    VolumeExpansionSupport::Offline => {
      capabilities.push(expansion_capability(volume_expansion::Type::Offline))
    }
    VolumeExpansionSupport::Online => {
      capabilities.push(expansion_capability(volume_expansion::Type::Online))
    }
  }

  debug!(
    ?volume_accessibility_constraints_support,
    ?volume_expansion_support
  );
  proto::GetPluginCapabilitiesResponse { capabilities }
}
