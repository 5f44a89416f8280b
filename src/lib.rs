/*!
# altofs

A Rust library for reading Xerox Alto disk images and the files stored on them.

## Features

- Load single and dual-disk images, optionally gzip-compressed, in either byte order
- Physical/logical disk address translation
- Typed page, label and leader page views
- File chain traversal with position checking, length and extraction
- Root directory reading with truncation reporting
- Disk descriptor and free-page bitmap validation, bitmap rebuild
- Idiomatic Rust API with comprehensive error handling

## Quick Start

```rust,no_run
use altofs::{AltoFileSystem, DiskImage, FileSystem, LoadOptions};

// Open an image
let image = DiskImage::open("alto.dsk", &LoadOptions::default())?;

// List every file found by leader scan
let fs = AltoFileSystem::from_image(&image);
for file in fs.list_files()? {
    println!("{}: {} bytes", file.name, file.length);
}

// Read a file through the root directory
let contents = fs.read_file("User.cm")?;

// Cross-check the free-page bitmap
let report = fs.check_allocation()?;
println!("{} free pages", report.label_free);
# Ok::<(), altofs::AltoError>(())
```

## Disk Format

A disk holds 203 cylinders, 2 heads and 12 sectors per track: 4872 pages.
Each page carries a page number, a 2-word header, an 8-word label and 256
data words. Files are chains of pages linked through their labels; the
first page of each file, the leader, holds its name and timestamps.

## Modules

- `format`: geometry constants and image byte order
- `image`: the loaded page array, addressing, page views and the image builder
- `filesystem`: leader pages, chains, directory, disk descriptor, file system
- `finding`: non-fatal integrity findings
- `io`: image loading and writing
- `map`: allocation map visualization
- `error`: Error types and Result alias
*/

#![warn(missing_docs)]

/// Error types and Result alias
pub mod error;
/// Alto file system interpretation
pub mod filesystem;
/// Non-fatal integrity findings
pub mod finding;
/// Alto disk format constants
pub mod format;
/// Core image data structures (DiskImage, Page, Label)
pub mod image;
/// I/O operations for reading and writing Alto images
pub mod io;
/// Allocation map visualization
pub mod map;

// Re-export common types
pub use error::{AltoError, Result};
pub use filesystem::{
    AllocationReport, AltoFileSystem, AltoTime, Bitmap, DescriptorHeader, DirectoryEntry,
    DirectoryReader, DiskDescriptor, FileInfo, FilePointer, FileSystem, FileSystemInfo,
    FsOptions, LeaderPage, NameMatch,
};
pub use finding::Finding;
pub use format::ImageByteOrder;
pub use image::{DiskAddress, DiskImage, DiskImageBuilder, FileId, Label, Page};
pub use io::LoadOptions;
