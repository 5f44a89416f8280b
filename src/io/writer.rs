/// Alto disk image writer

use crate::error::{AltoError, Result};
use crate::format::constants::*;
use crate::format::ImageByteOrder;
use crate::image::DiskImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Serialize one physical disk of `image` to image-file bytes
///
/// # Panics
///
/// Panics if `disk` is not loaded.
pub fn encode_disk(image: &DiskImage, disk: usize, byte_order: ImageByteOrder) -> Vec<u8> {
    let per_disk = PAGES_PER_DISK * PAGE_WORDS;
    let words = &image.words()[disk * per_disk..(disk + 1) * per_disk];
    words.iter().flat_map(|&w| byte_order.encode(w)).collect()
}

/// Write one physical disk of `image` to a file
pub fn write_disk<P: AsRef<Path>>(
    image: &DiskImage,
    disk: usize,
    path: P,
    byte_order: ImageByteOrder,
) -> Result<()> {
    if disk >= image.disk_count() {
        return Err(AltoError::invalid_argument(format!(
            "disk {} not loaded",
            disk
        )));
    }
    let mut file = File::create(&path)?;
    file.write_all(&encode_disk(image, disk, byte_order))?;
    debug!("wrote disk {} to {}", disk, path.as_ref().display());
    Ok(())
}
