/// Disk descriptor and free-page bitmap
///
/// The file `DiskDescriptor` holds a 16-word header followed by the
/// allocation bitmap, one bit per page, most significant bit first. A set
/// bit means the page is in use. The same information can be derived
/// independently from the page labels, which makes the two checkable
/// against each other.

use crate::error::{AltoError, Result};
use crate::filesystem::chain::WordCursor;
use crate::filesystem::leader::{leader_pages, read_leader};
use crate::finding::{log_all, Finding};
use crate::format::constants::*;
use crate::image::DiskImage;
use tracing::{debug, info};

/// Decoded disk descriptor header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeader {
    /// Number of disks in the file system
    pub n_disks: u16,
    /// Cylinders per disk
    pub n_tracks: u16,
    /// Heads per cylinder
    pub n_heads: u16,
    /// Sectors per track
    pub n_sectors: u16,
    /// Last serial number handed out
    pub last_serial: u32,
    /// Unused word after the serial number
    pub blank: u16,
    /// Bitmap size in words
    pub bitmap_words: u16,
    /// Versions kept per file (0 = no versioning)
    pub default_versions_kept: u16,
    /// Free pages
    pub free_pages: u16,
}

impl DescriptorHeader {
    /// Header describing an empty file system of `disks` disks
    pub fn for_disks(disks: usize) -> Self {
        let pages = disks * PAGES_PER_DISK;
        Self {
            n_disks: disks as u16,
            n_tracks: CYLINDERS as u16,
            n_heads: HEADS as u16,
            n_sectors: SECTORS as u16,
            last_serial: 0,
            blank: 0,
            bitmap_words: pages.div_ceil(16) as u16,
            default_versions_kept: 0,
            free_pages: pages as u16,
        }
    }

    /// Decode from the first header words
    pub fn decode(words: &[u16]) -> Self {
        Self {
            n_disks: words[0],
            n_tracks: words[1],
            n_heads: words[2],
            n_sectors: words[3],
            last_serial: ((words[4] as u32) << 16) | words[5] as u32,
            blank: words[6],
            bitmap_words: words[7],
            default_versions_kept: words[8],
            free_pages: words[9],
        }
    }

    /// Encode as a full header
    pub fn encode(&self) -> [u16; DESCRIPTOR_HEADER_WORDS] {
        let mut words = [0u16; DESCRIPTOR_HEADER_WORDS];
        words[0] = self.n_disks;
        words[1] = self.n_tracks;
        words[2] = self.n_heads;
        words[3] = self.n_sectors;
        words[4] = (self.last_serial >> 16) as u16;
        words[5] = (self.last_serial & 0xFFFF) as u16;
        words[6] = self.blank;
        words[7] = self.bitmap_words;
        words[8] = self.default_versions_kept;
        words[9] = self.free_pages;
        words
    }

    /// Compare against the supported geometry for `disks` loaded disks
    pub fn geometry_findings(&self, disks: usize) -> Vec<Finding> {
        let checks: [(&'static str, u16, u16); 5] = [
            ("disk count", disks as u16, self.n_disks),
            ("track count", CYLINDERS as u16, self.n_tracks),
            ("head count", HEADS as u16, self.n_heads),
            ("sector count", SECTORS as u16, self.n_sectors),
            ("versions kept", 0, self.default_versions_kept),
        ];
        checks
            .into_iter()
            .filter(|(_, expected, found)| expected != found)
            .map(|(field, expected, found)| Finding::GeometryMismatch {
                field,
                expected,
                found,
            })
            .collect()
    }
}

/// Free-page bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    words: Vec<u16>,
}

impl Bitmap {
    /// Wrap stored bitmap words
    pub fn new(words: Vec<u16>) -> Self {
        Self { words }
    }

    /// Derive a bitmap from the page labels alone
    pub fn from_labels(image: &DiskImage) -> Self {
        let mut bitmap = Bitmap::new(vec![0; image.page_count().div_ceil(16)]);
        for page in image.pages() {
            if !page.label().fid.is_free() {
                bitmap.set_used(page.vda(), true);
            }
        }
        bitmap
    }

    /// Bitmap words
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Pages covered by the bitmap
    pub fn capacity(&self) -> usize {
        self.words.len() * 16
    }

    /// Page is marked free; pages beyond the bitmap count as used
    pub fn is_free(&self, vda: usize) -> bool {
        match self.words.get(vda / 16) {
            Some(word) => word & (0x8000 >> (vda % 16)) == 0,
            None => false,
        }
    }

    /// Mark a page used or free
    pub fn set_used(&mut self, vda: usize, used: bool) {
        if let Some(word) = self.words.get_mut(vda / 16) {
            let bit = 0x8000 >> (vda % 16);
            if used {
                *word |= bit;
            } else {
                *word &= !bit;
            }
        }
    }

    /// Free pages among the first `pages` pages
    pub fn free_count(&self, pages: usize) -> usize {
        (0..pages.min(self.capacity()))
            .filter(|&vda| self.is_free(vda))
            .count()
    }
}

/// Outcome of an allocation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationReport {
    /// Free pages according to the descriptor header
    pub declared_free: usize,
    /// Free pages according to the bitmap
    pub bitmap_free: usize,
    /// Free pages according to the labels
    pub label_free: usize,
    /// Everything that did not match
    pub findings: Vec<Finding>,
}

impl AllocationReport {
    /// All three counts agree and nothing else was found
    pub fn is_consistent(&self) -> bool {
        self.findings.is_empty()
    }

    /// Pages where the bitmap and labels disagree
    pub fn disagreements(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| matches!(f, Finding::AllocationDisagreement { .. }))
            .count()
    }
}

/// Decoded disk descriptor file
#[derive(Debug, Clone)]
pub struct DiskDescriptor {
    /// Leader page of the descriptor file
    pub leader_vda: usize,
    /// Header
    pub header: DescriptorHeader,
    /// Allocation bitmap
    pub bitmap: Bitmap,
}

impl DiskDescriptor {
    /// Find the descriptor's leader page by name
    pub fn locate(image: &DiskImage) -> Result<usize> {
        leader_pages(image)
            .into_iter()
            .find(|&vda| read_leader(image, vda).0.display_name() == DISK_DESCRIPTOR_NAME)
            .ok_or_else(|| AltoError::FileNotFound(DISK_DESCRIPTOR_NAME.to_string()))
    }

    /// Locate and decode the descriptor
    pub fn load(image: &DiskImage) -> Result<Self> {
        let leader_vda = Self::locate(image)?;
        let mut cursor = WordCursor::new(image, leader_vda)?;

        let header_words = cursor.read_words(DESCRIPTOR_HEADER_WORDS)?;
        if header_words.len() < DESCRIPTOR_HEADER_WORDS {
            return Err(AltoError::DescriptorCorrupt(format!(
                "header is {} words, expected {}",
                header_words.len(),
                DESCRIPTOR_HEADER_WORDS
            )));
        }
        let header = DescriptorHeader::decode(&header_words);

        let bitmap_words = cursor.read_words(header.bitmap_words as usize)?;
        if bitmap_words.len() < header.bitmap_words as usize {
            return Err(AltoError::DescriptorCorrupt(format!(
                "bitmap is {} words, header declares {}",
                bitmap_words.len(),
                header.bitmap_words
            )));
        }
        debug!(
            "disk descriptor at page {}: {} bitmap words, {} free pages declared",
            leader_vda, header.bitmap_words, header.free_pages
        );

        Ok(Self {
            leader_vda,
            header,
            bitmap: Bitmap::new(bitmap_words),
        })
    }

    /// Cross-check header, bitmap and labels
    pub fn validate(&self, image: &DiskImage) -> AllocationReport {
        let pages = image.page_count();
        let declared_free = self.header.free_pages as usize;
        let mut findings = self.header.geometry_findings(image.disk_count());

        let bitmap_free = self.bitmap.free_count(pages);
        if bitmap_free != declared_free {
            findings.push(Finding::BitmapFreeCount {
                declared: declared_free,
                counted: bitmap_free,
            });
        }

        let label_free = image.free_pages();
        if label_free != declared_free {
            findings.push(Finding::LabelFreeCount {
                declared: declared_free,
                counted: label_free,
            });
        }

        for page in image.pages() {
            let label_free = page.label().fid.is_free();
            let bitmap_free = self.bitmap.is_free(page.vda());
            if label_free != bitmap_free {
                findings.push(Finding::AllocationDisagreement {
                    vda: page.vda(),
                    bitmap_free,
                });
            }
        }

        log_all(&findings);
        AllocationReport {
            declared_free,
            bitmap_free,
            label_free,
            findings,
        }
    }

    /// Replace the bitmap and free count with values derived from labels
    ///
    /// The stored bitmap is ignored. Returns the new free count.
    pub fn rebuild(&mut self, image: &DiskImage) -> usize {
        self.bitmap = Bitmap::from_labels(image);
        let free = self.bitmap.free_count(image.page_count());
        self.header.bitmap_words = self.bitmap.words().len() as u16;
        self.header.free_pages = free as u16;
        info!("rebuilt bitmap: {} free pages", free);
        free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{FileId, Label};

    #[test]
    fn test_header_round_trip() {
        let mut header = DescriptorHeader::for_disks(1);
        header.last_serial = 0x0001_0203;
        assert_eq!(header.bitmap_words, 305);
        assert_eq!(DescriptorHeader::decode(&header.encode()), header);
        assert!(header.geometry_findings(1).is_empty());
    }

    #[test]
    fn test_geometry_mismatch() {
        let mut header = DescriptorHeader::for_disks(1);
        header.n_sectors = 14;
        header.default_versions_kept = 2;
        let findings = header.geometry_findings(1);
        assert_eq!(findings.len(), 2);
        assert_eq!(
            findings[0],
            Finding::GeometryMismatch {
                field: "sector count",
                expected: 12,
                found: 14,
            }
        );
        assert_eq!(header.geometry_findings(2).len(), 3);
    }

    #[test]
    fn test_bitmap_bit_order() {
        let mut bitmap = Bitmap::new(vec![0; 2]);
        bitmap.set_used(0, true);
        bitmap.set_used(17, true);
        assert_eq!(bitmap.words(), &[0x8000, 0x4000]);
        assert!(!bitmap.is_free(0));
        assert!(bitmap.is_free(1));
        assert!(!bitmap.is_free(40));
        assert_eq!(bitmap.free_count(32), 30);
        assert_eq!(bitmap.free_count(20), 18);

        bitmap.set_used(0, false);
        assert!(bitmap.is_free(0));
    }

    #[test]
    fn test_label_free_count() {
        let mut builder = DiskImage::builder(1);
        let used = Label {
            fid: FileId::new(false, 3),
            ..Label::free()
        };
        for vda in 0..PAGES_PER_DISK {
            builder.set_label(vda, used);
        }
        let free = [5usize, 77, 1000, 4871];
        for &vda in &free {
            builder.set_label(vda, Label::free());
        }
        let image = builder.build().unwrap();

        assert_eq!(image.free_pages(), free.len());
        let bitmap = Bitmap::from_labels(&image);
        assert_eq!(bitmap.free_count(image.page_count()), free.len());
    }

    #[test]
    fn test_consistent_file_system() {
        let mut builder = DiskImage::builder(1).with_filesystem();
        builder.add_file("Data", &[1u8; 3000]).unwrap();
        let image = builder.build().unwrap();

        let descriptor = DiskDescriptor::load(&image).unwrap();
        let report = descriptor.validate(&image);
        assert!(report.is_consistent(), "{:?}", report.findings);
        assert_eq!(report.bitmap_free, report.label_free);
        assert_eq!(report.declared_free, image.free_pages());
    }

    #[test]
    fn test_wrong_bitmap_reported() {
        let mut builder = DiskImage::builder(1).with_filesystem();
        builder.add_file("Data", &[1u8; 3000]).unwrap();
        builder.flip_bitmap(4000);
        builder.declared_free_pages(10);
        let image = builder.build().unwrap();

        let descriptor = DiskDescriptor::load(&image).unwrap();
        let report = descriptor.validate(&image);
        assert!(!report.is_consistent());
        assert_eq!(report.disagreements(), 1);
        assert!(report.findings.contains(&Finding::AllocationDisagreement {
            vda: 4000,
            bitmap_free: false,
        }));
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, Finding::BitmapFreeCount { declared: 10, .. })));
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, Finding::LabelFreeCount { declared: 10, .. })));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut builder = DiskImage::builder(1).with_filesystem();
        builder.add_file("Data", &[1u8; 3000]).unwrap();
        builder.flip_bitmap(4000);
        builder.flip_bitmap(12);
        let image = builder.build().unwrap();

        let mut descriptor = DiskDescriptor::load(&image).unwrap();
        let first = descriptor.rebuild(&image);
        let bitmap = descriptor.bitmap.clone();
        let second = descriptor.rebuild(&image);

        assert_eq!(first, second);
        assert_eq!(descriptor.bitmap, bitmap);
        assert_eq!(first, image.free_pages());
        assert!(descriptor.validate(&image).is_consistent());
    }

    #[test]
    fn test_missing_descriptor() {
        let image = DiskImage::builder(1).build().unwrap();
        assert!(matches!(
            DiskDescriptor::load(&image),
            Err(AltoError::FileNotFound(_))
        ));
    }
}
