/// Alto disk format constants and image byte order

/// Geometry and layout constants
pub mod constants;

pub use constants::*;

/// Order of the two bytes of each 16-bit word in an image file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageByteOrder {
    /// Low byte first (images produced by PC-hosted tools and emulators)
    #[default]
    Little,
    /// High byte first (the Alto's own order)
    Big,
}

impl ImageByteOrder {
    /// Decode one word from its stored bytes
    pub fn decode(&self, bytes: [u8; 2]) -> u16 {
        match self {
            ImageByteOrder::Little => u16::from_le_bytes(bytes),
            ImageByteOrder::Big => u16::from_be_bytes(bytes),
        }
    }

    /// Encode one word into its stored bytes
    pub fn encode(&self, word: u16) -> [u8; 2] {
        match self {
            ImageByteOrder::Little => word.to_le_bytes(),
            ImageByteOrder::Big => word.to_be_bytes(),
        }
    }

    /// Get a human-readable name for this byte order
    pub fn name(&self) -> &'static str {
        match self {
            ImageByteOrder::Little => "little-endian",
            ImageByteOrder::Big => "big-endian",
        }
    }
}

impl std::fmt::Display for ImageByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Total pages addressable with the given number of disks
pub fn total_pages(disks: usize) -> usize {
    disks * PAGES_PER_DISK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(PAGES_PER_DISK, 4872);
        assert_eq!(PAGE_WORDS, 267);
        assert_eq!(PAGE_BYTES, 534);
        assert_eq!(DISK_IMAGE_BYTES, 2_601_648);
        assert_eq!(DATA_OFFSET + DATA_WORDS, PAGE_WORDS);
    }

    #[test]
    fn test_byte_order() {
        assert_eq!(ImageByteOrder::Little.decode([0x34, 0x12]), 0x1234);
        assert_eq!(ImageByteOrder::Big.decode([0x12, 0x34]), 0x1234);
        assert_eq!(ImageByteOrder::Little.encode(0x1234), [0x34, 0x12]);
        assert_eq!(ImageByteOrder::default(), ImageByteOrder::Little);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(1), 4872);
        assert_eq!(total_pages(2), 9744);
    }
}
