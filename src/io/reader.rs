/// Alto disk image reader
///
/// An image file is the raw page array of one physical disk:
/// - 4872 pages of 267 words (page number, header, label, data)
/// - 2,601,648 bytes exactly
/// - each word stored in the configured byte order
///
/// A dual-disk file system is given as two paths separated by `,`.

use crate::error::{AltoError, Result};
use crate::finding::log_all;
use crate::format::constants::*;
use crate::format::ImageByteOrder;
use crate::image::DiskImage;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Separator between the two paths of a dual-disk source
pub const SOURCE_SEPARATOR: char = ',';

/// Options controlling how an image is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Byte order of the words in the image file
    pub byte_order: ImageByteOrder,
    /// Pipe every path through the decompressor
    pub compressed: bool,
    /// Check page headers against their own addresses
    pub verify_headers: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            byte_order: ImageByteOrder::default(),
            compressed: false,
            verify_headers: true,
        }
    }
}

impl LoadOptions {
    /// Set the stored byte order
    pub fn byte_order(mut self, byte_order: ImageByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Force decompression
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Enable or disable the header check
    pub fn verify_headers(mut self, verify_headers: bool) -> Self {
        self.verify_headers = verify_headers;
        self
    }
}

/// Check if a path names a compressed image based on extension
pub fn is_compressed<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gz") || e == "Z")
        .unwrap_or(false)
}

/// Split an image source into one path per disk
pub fn split_source(source: &str) -> Result<Vec<&str>> {
    let paths: Vec<&str> = source.split(SOURCE_SEPARATOR).map(str::trim).collect();
    if paths.iter().any(|p| p.is_empty()) {
        return Err(AltoError::invalid_source(format!(
            "empty path in '{}'",
            source
        )));
    }
    if paths.len() > MAX_DISKS {
        return Err(AltoError::invalid_source(format!(
            "at most {} disks, got {}",
            MAX_DISKS,
            paths.len()
        )));
    }
    Ok(paths)
}

/// Load an image source into a page array
pub fn read_image(source: &str, options: &LoadOptions) -> Result<DiskImage> {
    let paths = split_source(source)?;
    let mut words = Vec::with_capacity(paths.len() * PAGES_PER_DISK * PAGE_WORDS);

    for path in &paths {
        let bytes = read_disk_bytes(path, options.compressed || is_compressed(path))?;
        words.extend(
            bytes
                .chunks_exact(2)
                .map(|pair| options.byte_order.decode([pair[0], pair[1]])),
        );
        debug!("loaded {} ({})", path, options.byte_order);
    }

    let mut image = DiskImage::from_words(words, paths.len())?;
    image.source = Some(source.to_string());
    image.byte_order = options.byte_order;

    if options.verify_headers {
        log_all(&image.check_headers());
    }
    Ok(image)
}

/// Read one disk's bytes, failing unless exactly one disk's worth
fn read_disk_bytes(path: &str, compressed: bool) -> Result<Vec<u8>> {
    let bytes = if compressed {
        decompress(path)?
    } else {
        let mut file = File::open(path)?;
        let mut bytes = Vec::with_capacity(DISK_IMAGE_BYTES);
        file.read_to_end(&mut bytes)?;
        bytes
    };

    if bytes.len() != DISK_IMAGE_BYTES {
        return Err(AltoError::ImageSize {
            path: path.to_string(),
            expected: DISK_IMAGE_BYTES,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Run `gzip -dc` over a file and collect its output
fn decompress(path: &str) -> Result<Vec<u8>> {
    if !Path::new(path).exists() {
        return Err(AltoError::invalid_source(format!("{} not found", path)));
    }
    debug!("decompressing {}", path);
    let output = Command::new("gzip")
        .arg("-dc")
        .arg(path)
        .output()
        .map_err(|e| AltoError::Decompress(format!("cannot run gzip: {}", e)))?;
    if !output.status.success() {
        return Err(AltoError::Decompress(format!(
            "gzip failed on {}: {}",
            path,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(output.stdout)
}
