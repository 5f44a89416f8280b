/// I/O operations for reading and writing Alto disk images

/// Reader implementation for Alto images
pub mod reader;
/// Writer implementation for Alto images
pub mod writer;

pub use reader::{is_compressed, read_image, split_source, LoadOptions};
pub use writer::{encode_disk, write_disk};
