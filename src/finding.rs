/// Non-fatal integrity findings
///
/// Findings describe damage or inconsistency that does not prevent the
/// requested operation from finishing. They are returned to the caller
/// and logged; they never change the outcome of an operation.

use tracing::warn;

/// One integrity finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Page header address does not translate back to the page's own index
    HeaderMismatch {
        /// Page being checked
        vda: usize,
        /// Address recorded in header word 1
        header_rda: u16,
        /// Index that address translates to
        header_vda: usize,
    },

    /// Disk descriptor geometry differs from the supported geometry
    GeometryMismatch {
        /// Descriptor field name
        field: &'static str,
        /// Supported value
        expected: u16,
        /// Stored value
        found: u16,
    },

    /// Free pages counted in the bitmap differ from the descriptor's count
    BitmapFreeCount {
        /// Count stored in the descriptor header
        declared: usize,
        /// Zero bits in the bitmap
        counted: usize,
    },

    /// Free pages counted from labels differ from the descriptor's count
    LabelFreeCount {
        /// Count stored in the descriptor header
        declared: usize,
        /// Pages whose label identifier is all ones
        counted: usize,
    },

    /// Bitmap and label disagree about one page
    AllocationDisagreement {
        /// Page in question
        vda: usize,
        /// Bitmap marks the page free
        bitmap_free: bool,
    },

    /// Filename longer than its field; the stored name was cut
    NameTruncated {
        /// Page or directory word offset holding the name
        location: usize,
        /// Length byte as stored
        declared: usize,
        /// Characters kept
        kept: usize,
    },

    /// Directory entry longer than the record buffer
    EntryTruncated {
        /// Word offset of the entry in the directory stream
        offset: usize,
        /// Declared entry length in words
        declared: usize,
        /// Words kept
        kept: usize,
    },
}

impl Finding {
    /// Emit this finding through the log
    pub fn log(&self) {
        warn!("{}", self);
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::HeaderMismatch {
                vda,
                header_rda,
                header_vda,
            } => write!(
                f,
                "page {} header address 0x{:04X} points at page {}",
                vda, header_rda, header_vda
            ),
            Finding::GeometryMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "disk descriptor {} is {}, expected {}",
                field, found, expected
            ),
            Finding::BitmapFreeCount { declared, counted } => write!(
                f,
                "bitmap shows {} free pages, descriptor says {}",
                counted, declared
            ),
            Finding::LabelFreeCount { declared, counted } => write!(
                f,
                "labels show {} free pages, descriptor says {}",
                counted, declared
            ),
            Finding::AllocationDisagreement { vda, bitmap_free } => write!(
                f,
                "page {} is {} in the bitmap but {} by its label",
                vda,
                if *bitmap_free { "free" } else { "used" },
                if *bitmap_free { "used" } else { "free" }
            ),
            Finding::NameTruncated {
                location,
                declared,
                kept,
            } => write!(
                f,
                "name at {} declares {} bytes, kept {}",
                location, declared, kept
            ),
            Finding::EntryTruncated {
                offset,
                declared,
                kept,
            } => write!(
                f,
                "directory entry at word {} is {} words, kept {}",
                offset, declared, kept
            ),
        }
    }
}

/// Log every finding in a slice
pub fn log_all(findings: &[Finding]) {
    for finding in findings {
        finding.log();
    }
}
