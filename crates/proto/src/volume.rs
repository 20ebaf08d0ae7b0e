use std::{
  collections::HashMap,
  convert::{TryFrom, TryInto},
  fmt,
};

use crate::proto;

/// Where the data of a new volume comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeContentSource {
  Snapshot(String),
  Volume(String),
}

impl VolumeContentSource {
  /// Identifier of the snapshot or volume the content is copied from.
  #[inline]
  pub fn id(&self) -> &str {
    match self {
      VolumeContentSource::Snapshot(id) | VolumeContentSource::Volume(id) => id,
    }
  }
}

impl TryFrom<proto::VolumeContentSource> for Option<VolumeContentSource> {
  type Error = tonic::Status;

  fn try_from(value: proto::VolumeContentSource) -> Result<Self, Self::Error> {
    use crate::utils::required;

    Ok(match value.r#type {
      None => None,
      Some(proto::volume_content_source::Type::Volume(v)) => Some(VolumeContentSource::Volume(
        required(v.volume_id, "VolumeContentSource volume_id cannot be empty")?,
      )),
      Some(proto::volume_content_source::Type::Snapshot(v)) => Some(
        VolumeContentSource::Snapshot(required(
          v.snapshot_id,
          "VolumeContentSource snapshot_id cannot be empty",
        )?),
      ),
    })
  }
}

impl From<VolumeContentSource> for proto::VolumeContentSource {
  fn from(value: VolumeContentSource) -> Self {
    use proto::volume_content_source::{SnapshotSource, Type, VolumeSource};

    let r#type = match value {
      VolumeContentSource::Snapshot(snapshot_id) => Type::Snapshot(SnapshotSource { snapshot_id }),
      VolumeContentSource::Volume(volume_id) => Type::Volume(VolumeSource { volume_id }),
    };

    proto::VolumeContentSource {
      r#type: Some(r#type),
    }
  }
}

/// A provisioned volume as reported back to the orchestrator.
#[derive(Debug)]
pub struct Volume {
  capacity_bytes: u64,
  volume_id: String,
  volume_context: HashMap<String, String>,
  content_source: Option<VolumeContentSource>,
}

impl Volume {
  pub fn new(volume_id: impl Into<String>, capacity_bytes: u64) -> Self {
    Volume {
      capacity_bytes,
      volume_id: volume_id.into(),
      volume_context: HashMap::new(),
      content_source: None,
    }
  }

  /// Attributes handed to the node plugin on publish.
  pub fn with_context(mut self, volume_context: HashMap<String, String>) -> Self {
    self.volume_context = volume_context;
    self
  }

  pub fn with_content_source(mut self, content_source: Option<VolumeContentSource>) -> Self {
    self.content_source = content_source;
    self
  }

  #[inline]
  pub fn volume_id(&self) -> &str {
    &self.volume_id
  }

  #[inline]
  pub fn capacity_bytes(&self) -> u64 {
    self.capacity_bytes
  }

  #[inline]
  pub fn volume_context(&self) -> &HashMap<String, String> {
    &self.volume_context
  }

  #[inline]
  pub fn content_source(&self) -> Option<&VolumeContentSource> {
    self.content_source.as_ref()
  }
}

impl TryFrom<Volume> for proto::Volume {
  type Error = tonic::Status;

  fn try_from(value: Volume) -> Result<Self, Self::Error> {
    let capacity_bytes = i64::try_from(value.capacity_bytes)
      .map_err(|_| tonic::Status::internal("volume capacity does not fit in int64"))?;

    Ok(proto::Volume {
      capacity_bytes,
      volume_id: value.volume_id,
      volume_context: value.volume_context,
      content_source: value.content_source.map(Into::into),
      accessible_topology: Vec::new(),
    })
  }
}

impl TryFrom<Volume> for proto::CreateVolumeResponse {
  type Error = tonic::Status;

  fn try_from(value: Volume) -> Result<Self, Self::Error> {
    let volume = Some(value.try_into()?);

    Ok(proto::CreateVolumeResponse { volume })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeCapability {
  access_mode: AccessMode,
  access_type: AccessType,
}

impl VolumeCapability {
  pub fn new(access_mode: AccessMode, access_type: AccessType) -> Self {
    VolumeCapability {
      access_mode,
      access_type,
    }
  }

  #[inline]
  pub fn access_mode(&self) -> AccessMode {
    self.access_mode
  }

  #[inline]
  pub fn access_type(&self) -> &AccessType {
    &self.access_type
  }

  #[inline]
  pub fn is_block(&self) -> bool {
    matches!(self.access_type, AccessType::Block)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AccessMode {
  Unknown,
  /// Published once as read/write on a single node.
  SingleNodeWriter,
  /// Published once as readonly on a single node.
  SingleNodeReaderOnly,
  /// Published as readonly on many nodes.
  MultiNodeReaderOnly,
  /// Published on many nodes, only one of which may write.
  MultiNodeSingleWriter,
  /// Published as read/write on many nodes.
  MultiNodeMultiWriter,
}

impl From<proto::volume_capability::AccessMode> for AccessMode {
  fn from(value: proto::volume_capability::AccessMode) -> Self {
    use proto::volume_capability::access_mode::Mode;

    match Mode::from_i32(value.mode) {
      Some(Mode::SingleNodeWriter) => AccessMode::SingleNodeWriter,
      Some(Mode::SingleNodeReaderOnly) => AccessMode::SingleNodeReaderOnly,
      Some(Mode::MultiNodeReaderOnly) => AccessMode::MultiNodeReaderOnly,
      Some(Mode::MultiNodeSingleWriter) => AccessMode::MultiNodeSingleWriter,
      Some(Mode::MultiNodeMultiWriter) => AccessMode::MultiNodeMultiWriter,
      _ => AccessMode::Unknown,
    }
  }
}

impl From<AccessMode> for proto::volume_capability::AccessMode {
  fn from(value: AccessMode) -> Self {
    use proto::volume_capability::access_mode::Mode;

    let mode = match value {
      AccessMode::Unknown => Mode::Unknown,
      AccessMode::SingleNodeWriter => Mode::SingleNodeWriter,
      AccessMode::SingleNodeReaderOnly => Mode::SingleNodeReaderOnly,
      AccessMode::MultiNodeReaderOnly => Mode::MultiNodeReaderOnly,
      AccessMode::MultiNodeSingleWriter => Mode::MultiNodeSingleWriter,
      AccessMode::MultiNodeMultiWriter => Mode::MultiNodeMultiWriter,
    } as i32;

    proto::volume_capability::AccessMode { mode }
  }
}

impl fmt::Display for AccessMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      AccessMode::Unknown => "UNKNOWN",
      AccessMode::SingleNodeWriter => "SINGLE_NODE_WRITER",
      AccessMode::SingleNodeReaderOnly => "SINGLE_NODE_READER_ONLY",
      AccessMode::MultiNodeReaderOnly => "MULTI_NODE_READER_ONLY",
      AccessMode::MultiNodeSingleWriter => "MULTI_NODE_SINGLE_WRITER",
      AccessMode::MultiNodeMultiWriter => "MULTI_NODE_MULTI_WRITER",
    };

    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccessType {
  /// Accessed through the block device API.
  Block,

  /// Accessed through a mounted filesystem.
  Mount(MountVolume),
}

impl From<proto::volume_capability::AccessType> for AccessType {
  fn from(value: proto::volume_capability::AccessType) -> Self {
    match value {
      proto::volume_capability::AccessType::Block(_) => AccessType::Block,
      proto::volume_capability::AccessType::Mount(v) => AccessType::Mount(v.into()),
    }
  }
}

impl From<AccessType> for proto::volume_capability::AccessType {
  fn from(value: AccessType) -> Self {
    match value {
      AccessType::Block => {
        proto::volume_capability::AccessType::Block(proto::volume_capability::BlockVolume {})
      }
      AccessType::Mount(v) => proto::volume_capability::AccessType::Mount(v.into()),
    }
  }
}

#[derive(Clone, PartialEq, Default)]
pub struct MountVolume {
  fs_type: Option<String>,
  mount_flags: Vec<String>,
}

impl MountVolume {
  pub fn new(fs_type: Option<String>, mount_flags: Vec<String>) -> Self {
    MountVolume {
      fs_type,
      mount_flags,
    }
  }

  #[inline]
  pub fn fs_type(&self) -> Option<&str> {
    self.fs_type.as_deref()
  }

  /// Mount options. These may carry credentials and must not be logged.
  pub fn mount_flags(&self) -> impl Iterator<Item = &str> + ExactSizeIterator {
    self.mount_flags.iter().map(|v| &**v)
  }
}

impl From<proto::volume_capability::MountVolume> for MountVolume {
  fn from(value: proto::volume_capability::MountVolume) -> Self {
    MountVolume {
      fs_type: crate::utils::non_empty(value.fs_type),
      mount_flags: value.mount_flags,
    }
  }
}

impl From<MountVolume> for proto::volume_capability::MountVolume {
  fn from(value: MountVolume) -> Self {
    proto::volume_capability::MountVolume {
      fs_type: value.fs_type.unwrap_or_default(),
      mount_flags: value.mount_flags,
    }
  }
}

impl fmt::Debug for MountVolume {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MountVolume")
      .field("fs_type", &self.fs_type)
      .field(
        "mount_flags",
        &format!("REDACTED ({} items)", self.mount_flags.len()),
      )
      .finish()
  }
}

impl TryFrom<proto::VolumeCapability> for VolumeCapability {
  type Error = tonic::Status;

  fn try_from(value: proto::VolumeCapability) -> Result<Self, Self::Error> {
    let access_mode = value
      .access_mode
      .ok_or_else(|| tonic::Status::invalid_argument("Missing access_mode for VolumeCapability"))?
      .into();

    let access_type = value
      .access_type
      .ok_or_else(|| tonic::Status::invalid_argument("Missing access_type for VolumeCapability"))?
      .into();

    Ok(VolumeCapability {
      access_mode,
      access_type,
    })
  }
}

impl From<VolumeCapability> for proto::VolumeCapability {
  fn from(value: VolumeCapability) -> Self {
    proto::VolumeCapability {
      access_mode: Some(value.access_mode.into()),
      access_type: Some(value.access_type.into()),
    }
  }
}

/// Requested size bounds in bytes. Zero means "not specified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapacityRange {
  required_bytes: u64,
  limit_bytes: u64,
}

impl CapacityRange {
  pub fn new(required_bytes: u64, limit_bytes: u64) -> Self {
    CapacityRange {
      required_bytes,
      limit_bytes,
    }
  }

  /// The volume must be at least this big.
  #[inline]
  pub fn required_bytes(&self) -> u64 {
    self.required_bytes
  }

  /// The volume must not be bigger than this.
  #[inline]
  pub fn limit_bytes(&self) -> u64 {
    self.limit_bytes
  }
}

impl TryFrom<proto::CapacityRange> for CapacityRange {
  type Error = tonic::Status;

  fn try_from(value: proto::CapacityRange) -> Result<Self, Self::Error> {
    let required_bytes = u64::try_from(value.required_bytes).map_err(|_| {
      tonic::Status::invalid_argument("CapacityRange.required_bytes cannot be negative")
    })?;
    let limit_bytes = u64::try_from(value.limit_bytes).map_err(|_| {
      tonic::Status::invalid_argument("CapacityRange.limit_bytes cannot be negative")
    })?;

    if limit_bytes != 0 && limit_bytes < required_bytes {
      return Err(tonic::Status::out_of_range(format!(
        "CapacityRange.limit_bytes ({}) is smaller than required_bytes ({})",
        limit_bytes, required_bytes
      )));
    }

    Ok(CapacityRange {
      required_bytes,
      limit_bytes,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  #[test_case(5, 0 => Ok(CapacityRange::new(5, 0)) ; "required only")]
  #[test_case(0, 0 => Ok(CapacityRange::new(0, 0)) ; "unspecified")]
  #[test_case(5, 10 => Ok(CapacityRange::new(5, 10)) ; "between")]
  #[test_case(-1, 0 => Err(tonic::Code::InvalidArgument) ; "negative required")]
  #[test_case(0, -1 => Err(tonic::Code::InvalidArgument) ; "negative limit")]
  #[test_case(10, 5 => Err(tonic::Code::OutOfRange) ; "limit below required")]
  fn capacity_range(required_bytes: i64, limit_bytes: i64) -> Result<CapacityRange, tonic::Code> {
    CapacityRange::try_from(proto::CapacityRange {
      required_bytes,
      limit_bytes,
    })
    .map_err(|e| e.code())
  }

  #[test]
  fn mount_flags_are_redacted() {
    let mount = MountVolume::new(Some("cifs".into()), vec!["password=hunter2".into()]);
    let debug = format!("{:?}", mount);

    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("REDACTED (1 items)"));
  }

  #[test]
  fn empty_fs_type_is_none() {
    let mount = MountVolume::from(proto::volume_capability::MountVolume {
      fs_type: String::new(),
      mount_flags: Vec::new(),
    });

    assert_eq!(mount.fs_type(), None);
  }
}
