/// Alto file system interpretation

pub mod alto;
pub mod chain;
pub mod descriptor;
pub mod directory;
pub mod leader;

pub use alto::{AltoFileSystem, FsOptions, NameMatch};
pub use chain::{chain_stats, extract_to, file_length, ChainCursor, ChainPage, ChainStats, WordCursor};
pub use descriptor::{AllocationReport, Bitmap, DescriptorHeader, DiskDescriptor};
pub use directory::{DirectoryEntry, DirectoryReader};
pub use leader::{AltoTime, FilePointer, LastPageHint, LeaderPage};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Metadata for one file, gathered from its leader page and chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// VDA of the leader page
    pub leader_vda: usize,
    /// Name without the trailing separator
    pub name: String,
    /// Content length in bytes
    pub length: usize,
    /// Pages in the chain, leader included
    pub pages: usize,
    /// File identifier word 2
    pub serial: u16,
    /// File is a directory
    pub directory: bool,
    /// Creation time
    pub created: AltoTime,
    /// Last write time
    pub written: AltoTime,
    /// Last read time
    pub read: AltoTime,
}

/// Filesystem information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemInfo {
    /// Filesystem type name
    pub fs_type: String,
    /// Physical disks loaded
    pub disks: usize,
    /// Total pages on disk
    pub total_pages: usize,
    /// Pages whose label marks them free
    pub free_pages: usize,
    /// Live files found by leader scan
    pub files: usize,
}

/// Read-only access to the files on a disk image
pub trait FileSystem {
    /// List every file on the image
    fn list_files(&self) -> Result<Vec<FileInfo>>;

    /// Read a file's contents
    fn read_file(&self, name: &str) -> Result<Vec<u8>>;

    /// Write one file into `dir`, returning the path written
    fn extract_file(&self, leader_vda: usize, dir: &Path) -> Result<PathBuf>;

    /// Get filesystem information
    fn info(&self) -> FileSystemInfo;
}
