//! Fixed-format VHD images: raw bytes followed by a 512 byte footer.

use crate::cloud::{CloudResult, FileClient, FileTarget};
use chrono::{DateTime, TimeZone, Utc};
use tracing::info;
use uuid::Uuid;

pub const FOOTER_SIZE: usize = 512;
pub const VHD_SUFFIX: &str = ".vhd";

const COOKIE: &[u8; 8] = b"conectix";
const FEATURES: u32 = 0x0000_0002;
const FORMAT_VERSION: u32 = 0x0001_0000;
const FIXED_DATA_OFFSET: u64 = u64::MAX;
const CREATOR_APPLICATION: &[u8; 4] = b"vpc ";
const CREATOR_VERSION: u32 = 0x0005_0003;
const CREATOR_HOST_OS: &[u8; 4] = b"Wi2k";
const DISK_TYPE_FIXED: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
  pub cylinders: u16,
  pub heads: u8,
  pub sectors_per_track: u8,
}

/// CHS geometry as the VHD format defines it for a disk of `size` bytes.
pub fn geometry(size: u64) -> Geometry {
  let mut total_sectors = size / 512;
  if total_sectors > 65535 * 16 * 255 {
    total_sectors = 65535 * 16 * 255;
  }

  let (sectors_per_track, heads, cylinder_times_heads) = if total_sectors >= 65535 * 16 * 63 {
    (255, 16, total_sectors / 255)
  } else {
    let mut spt = 17;
    let mut cth = total_sectors / spt;
    let mut heads = ((cth + 1023) / 1024).max(4);

    if cth >= heads * 1024 || heads > 16 {
      spt = 31;
      heads = 16;
      cth = total_sectors / spt;
    }

    if cth >= heads * 1024 {
      spt = 63;
      heads = 16;
      cth = total_sectors / spt;
    }

    (spt, heads, cth)
  };

  Geometry {
    cylinders: (cylinder_times_heads / heads) as u16,
    heads: heads as u8,
    sectors_per_track: sectors_per_track as u8,
  }
}

fn checksum(footer: &[u8]) -> u32 {
  !footer.iter().fold(0u32, |sum, b| sum.wrapping_add(u32::from(*b)))
}

/// Builds the footer of a fixed disk holding `size` bytes of data.
pub fn footer(size: u64, created: DateTime<Utc>, id: Uuid) -> [u8; FOOTER_SIZE] {
  let vhd_epoch = Utc.timestamp_opt(946_684_800, 0).single().unwrap_or(created);
  let timestamp = created.signed_duration_since(vhd_epoch).num_seconds().max(0) as u32;
  let geometry = geometry(size);

  let mut footer = [0u8; FOOTER_SIZE];
  footer[0..8].copy_from_slice(COOKIE);
  footer[8..12].copy_from_slice(&FEATURES.to_be_bytes());
  footer[12..16].copy_from_slice(&FORMAT_VERSION.to_be_bytes());
  footer[16..24].copy_from_slice(&FIXED_DATA_OFFSET.to_be_bytes());
  footer[24..28].copy_from_slice(&timestamp.to_be_bytes());
  footer[28..32].copy_from_slice(CREATOR_APPLICATION);
  footer[32..36].copy_from_slice(&CREATOR_VERSION.to_be_bytes());
  footer[36..40].copy_from_slice(CREATOR_HOST_OS);
  footer[40..48].copy_from_slice(&size.to_be_bytes());
  footer[48..56].copy_from_slice(&size.to_be_bytes());
  footer[56..58].copy_from_slice(&geometry.cylinders.to_be_bytes());
  footer[58] = geometry.heads;
  footer[59] = geometry.sectors_per_track;
  footer[60..64].copy_from_slice(&DISK_TYPE_FIXED.to_be_bytes());
  footer[68..84].copy_from_slice(id.as_bytes());

  let sum = checksum(&footer);
  footer[64..68].copy_from_slice(&sum.to_be_bytes());
  footer
}

/// Creates `target` as a fixed VHD with `size` bytes of data.
pub async fn create_disk(files: &dyn FileClient, target: &FileTarget, size: u64) -> CloudResult<()> {
  info!(share = %target.share, disk = %target.path, size, "creating vhd disk");
  files
    .create_file(target, size + FOOTER_SIZE as u64)
    .await?;
  files
    .put_range(target, size, &footer(size, Utc::now(), Uuid::new_v4()))
    .await
}
