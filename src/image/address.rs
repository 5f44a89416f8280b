/// Physical (RDA) and logical (VDA) disk addressing
///
/// An RDA packs a physical location into one word:
///
/// ```text
///  15  12 11            3   2    1    0
/// +------+---------------+----+----+----+
/// |sector|   cylinder    |head|disk| -- |
/// +------+---------------+----+----+----+
/// ```
///
/// A VDA is the page's index in the flat page array, disk 0 first.

use crate::error::{AltoError, Result};
use crate::format::constants::*;

/// Decoded physical disk address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiskAddress {
    /// Physical disk (0 or 1)
    pub disk: u8,
    /// Cylinder (0-202)
    pub cylinder: u16,
    /// Head (0 or 1)
    pub head: u8,
    /// Sector (0-11)
    pub sector: u8,
}

impl DiskAddress {
    /// Create a new disk address
    pub fn new(disk: u8, cylinder: u16, head: u8, sector: u8) -> Self {
        Self {
            disk,
            cylinder,
            head,
            sector,
        }
    }

    /// Unpack a raw address word
    pub fn from_rda(rda: u16) -> Self {
        Self {
            disk: ((rda >> 1) & 1) as u8,
            cylinder: (rda >> 3) & 0x1FF,
            head: ((rda >> 2) & 1) as u8,
            sector: ((rda >> 12) & 0xF) as u8,
        }
    }

    /// Pack into a raw address word
    pub fn to_rda(&self) -> u16 {
        ((self.sector as u16 & 0xF) << 12)
            | ((self.cylinder & 0x1FF) << 3)
            | ((self.head as u16 & 1) << 2)
            | ((self.disk as u16 & 1) << 1)
    }

    /// Locate a logical page index on the physical disks
    pub fn from_vda(vda: usize) -> Self {
        let disk = vda / PAGES_PER_DISK;
        let within = vda % PAGES_PER_DISK;
        Self {
            disk: disk as u8,
            cylinder: (within / (HEADS * SECTORS)) as u16,
            head: ((within / SECTORS) % HEADS) as u8,
            sector: (within % SECTORS) as u8,
        }
    }

    /// Logical page index of this address
    pub fn to_vda(&self) -> usize {
        self.disk as usize * PAGES_PER_DISK
            + self.cylinder as usize * HEADS * SECTORS
            + self.head as usize * SECTORS
            + self.sector as usize
    }

    /// Check the address lies inside the fixed geometry of `disks` disks
    pub fn is_valid(&self, disks: usize) -> bool {
        (self.disk as usize) < disks
            && (self.cylinder as usize) < CYLINDERS
            && (self.head as usize) < HEADS
            && (self.sector as usize) < SECTORS
    }
}

impl std::fmt::Display for DiskAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "D{}:C{}:H{}:S{}",
            self.disk, self.cylinder, self.head, self.sector
        )
    }
}

/// Translate a raw address word to a page index
///
/// No validation: an address outside the geometry yields a meaningless
/// index. Use [`try_rda_to_vda`] for addresses read from labels.
pub fn rda_to_vda(rda: u16) -> usize {
    DiskAddress::from_rda(rda).to_vda()
}

/// Translate a page index to a raw address word
pub fn vda_to_rda(vda: usize) -> u16 {
    DiskAddress::from_vda(vda).to_rda()
}

/// Translate a raw address word, rejecting addresses outside `disks` disks
pub fn try_rda_to_vda(rda: u16, disks: usize) -> Result<usize> {
    let address = DiskAddress::from_rda(rda);
    if address.is_valid(disks) {
        Ok(address.to_vda())
    } else {
        Err(AltoError::InvalidAddress { rda })
    }
}
