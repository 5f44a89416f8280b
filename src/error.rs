use thiserror::Error;

/// Result type alias for Alto disk operations
pub type Result<T> = std::result::Result<T, AltoError>;

/// Fatal errors that stop an operation on an Alto disk image
#[derive(Debug, Error)]
pub enum AltoError {
    /// I/O error occurred while reading an image or writing an extracted file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image file is not exactly one disk's worth of pages
    #[error("Image {path} should be {expected} bytes, got {actual}")]
    ImageSize {
        /// Path of the offending image
        path: String,
        /// Expected byte count
        expected: usize,
        /// Bytes actually read
        actual: usize,
    },

    /// Image source string could not be interpreted
    #[error("Invalid image source: {0}")]
    InvalidSource(String),

    /// External decompression filter failed
    #[error("Decompression failed: {0}")]
    Decompress(String),

    /// Physical disk address outside the loaded geometry
    #[error("Invalid disk address 0x{rda:04X}")]
    InvalidAddress {
        /// The raw address word
        rda: u16,
    },

    /// Page index outside the loaded image
    #[error("Page {vda} outside image of {pages} pages")]
    PageOutOfRange {
        /// The offending page index
        vda: usize,
        /// Pages in the loaded image
        pages: usize,
    },

    /// A page's recorded position in its file does not match the chain
    #[error("Chain corrupt at page {vda}: expected file page {expected}, found {found}")]
    ChainPosition {
        /// Page where the mismatch was seen
        vda: usize,
        /// Position the walker expected
        expected: u16,
        /// Position recorded in the label
        found: u16,
    },

    /// Directory stream ended in the middle of an entry
    #[error("Directory ended inside an entry at word {offset} (needed {needed} more words)")]
    DirectoryExhausted {
        /// Word offset of the entry start
        offset: usize,
        /// Words still missing
        needed: usize,
    },

    /// Directory entry that can never be consumed
    #[error("Corrupt directory entry at word {offset}: {message}")]
    DirectoryCorrupt {
        /// Word offset of the entry start
        offset: usize,
        /// Description
        message: String,
    },

    /// Page expected to lead a directory does not
    #[error("Page {0} is not a directory leader page")]
    NotADirectory(usize),

    /// Disk descriptor file too short to hold its header and bitmap
    #[error("Corrupt disk descriptor: {0}")]
    DescriptorCorrupt(String),

    /// File not found in the file system
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Output sink accepted fewer bytes than the page carried
    #[error("Short write at page {vda}: wrote {written} of {expected} bytes")]
    ShortWrite {
        /// Page being written
        vda: usize,
        /// Bytes the page carries
        expected: usize,
        /// Bytes accepted by the sink
        written: usize,
    },

    /// Malformed request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AltoError {
    /// Create an invalid source error
    pub fn invalid_source<S: Into<String>>(message: S) -> Self {
        AltoError::InvalidSource(message.into())
    }

    /// Create a directory corruption error
    pub fn directory_corrupt<S: Into<String>>(offset: usize, message: S) -> Self {
        AltoError::DirectoryCorrupt {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        AltoError::InvalidArgument(message.into())
    }
}
