/// Alto disk image session and page access

/// Physical and logical addressing
pub mod address;
/// Builder for assembling in-memory images
pub mod builder;
/// Page views and label records
pub mod page;

pub use address::{rda_to_vda, try_rda_to_vda, vda_to_rda, DiskAddress};
pub use builder::DiskImageBuilder;
pub use page::{FileId, Label, Page};

use crate::error::{AltoError, Result};
use crate::finding::Finding;
use crate::format::{total_pages, ImageByteOrder, MAX_DISKS, PAGE_WORDS};
use crate::io::LoadOptions;
use tracing::debug;

/// One loaded file system: the page array of one or two disks
///
/// All interpretation borrows this immutably; it is only written while
/// loading or building.
#[derive(Debug, Clone)]
pub struct DiskImage {
    /// Every page of every disk, native word order
    pub(crate) words: Vec<u16>,
    /// Number of physical disks loaded
    pub(crate) disks: usize,
    /// Source the image was loaded from
    pub(crate) source: Option<String>,
    /// Byte order the image was stored in
    pub(crate) byte_order: ImageByteOrder,
}

impl DiskImage {
    /// Open an image source: a path, or two paths separated by `,`
    pub fn open(source: &str, options: &LoadOptions) -> Result<Self> {
        crate::io::read_image(source, options)
    }

    /// Wrap an existing page array of `disks` disks
    pub fn from_words(words: Vec<u16>, disks: usize) -> Result<Self> {
        if disks == 0 || disks > MAX_DISKS {
            return Err(AltoError::invalid_argument(format!(
                "disk count must be 1 or 2, got {}",
                disks
            )));
        }
        let expected = total_pages(disks) * PAGE_WORDS;
        if words.len() != expected {
            return Err(AltoError::invalid_argument(format!(
                "page array should be {} words, got {}",
                expected,
                words.len()
            )));
        }
        Ok(Self {
            words,
            disks,
            source: None,
            byte_order: ImageByteOrder::default(),
        })
    }

    /// Create a new builder for assembling an image in memory
    pub fn builder(disks: usize) -> DiskImageBuilder {
        DiskImageBuilder::new(disks)
    }

    /// Get the number of physical disks
    pub fn disk_count(&self) -> usize {
        self.disks
    }

    /// Get the number of pages across all disks
    pub fn page_count(&self) -> usize {
        total_pages(self.disks)
    }

    /// Get the source the image was loaded from
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Get the byte order the image was stored in
    pub fn byte_order(&self) -> ImageByteOrder {
        self.byte_order
    }

    /// Fail unless `vda` names a page of the loaded image
    pub fn check_page(&self, vda: usize) -> Result<()> {
        if vda < self.page_count() {
            Ok(())
        } else {
            Err(AltoError::PageOutOfRange {
                vda,
                pages: self.page_count(),
            })
        }
    }

    /// Get a view of one page
    ///
    /// # Panics
    ///
    /// Panics if `vda` is outside the loaded image.
    pub fn page(&self, vda: usize) -> Page<'_> {
        let start = vda * PAGE_WORDS;
        Page::new(vda, &self.words[start..start + PAGE_WORDS])
    }

    /// Get a page's decoded label
    pub fn label(&self, vda: usize) -> Label {
        self.page(vda).label()
    }

    /// Iterate over every page in disk order
    pub fn pages(&self) -> impl Iterator<Item = Page<'_>> {
        self.words
            .chunks_exact(PAGE_WORDS)
            .enumerate()
            .map(|(vda, words)| Page::new(vda, words))
    }

    /// Raw page array
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Count pages whose label marks them free
    pub fn free_pages(&self) -> usize {
        self.pages().filter(|p| p.label().fid.is_free()).count()
    }

    /// Check every page header names the page it is stored in
    pub fn check_headers(&self) -> Vec<Finding> {
        let findings: Vec<Finding> = self
            .pages()
            .filter_map(|page| {
                let header_rda = page.header()[1];
                let header_vda = rda_to_vda(header_rda);
                (header_vda != page.vda()).then_some(Finding::HeaderMismatch {
                    vda: page.vda(),
                    header_rda,
                    header_vda,
                })
            })
            .collect();
        debug!(
            "header check: {} of {} pages inconsistent",
            findings.len(),
            self.page_count()
        );
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{HEADER_OFFSET, PAGES_PER_DISK};

    #[test]
    fn test_from_words_checks_length() {
        assert!(DiskImage::from_words(vec![0; 10], 1).is_err());
        assert!(DiskImage::from_words(vec![0; PAGES_PER_DISK * PAGE_WORDS], 3).is_err());

        let image = DiskImage::from_words(vec![0; PAGES_PER_DISK * PAGE_WORDS], 1).unwrap();
        assert_eq!(image.disk_count(), 1);
        assert_eq!(image.page_count(), PAGES_PER_DISK);
    }

    #[test]
    fn test_blank_image_headers_are_consistent() {
        let image = DiskImage::builder(1).build().unwrap();
        assert!(image.check_headers().is_empty());
        assert_eq!(image.free_pages(), PAGES_PER_DISK);
    }

    #[test]
    fn test_header_mismatch_reported() {
        let image = DiskImage::builder(1).build().unwrap();
        let mut words = image.words().to_vec();
        words[5 * PAGE_WORDS + HEADER_OFFSET + 1] = vda_to_rda(6);
        let image = DiskImage::from_words(words, 1).unwrap();

        let findings = image.check_headers();
        assert_eq!(
            findings,
            vec![Finding::HeaderMismatch {
                vda: 5,
                header_rda: vda_to_rda(6),
                header_vda: 6,
            }]
        );
    }

    #[test]
    fn test_pages_iterator() {
        let image = DiskImage::builder(2).build().unwrap();
        assert_eq!(image.pages().count(), 2 * PAGES_PER_DISK);
        assert_eq!(image.page(PAGES_PER_DISK).vda(), PAGES_PER_DISK);
    }
}
