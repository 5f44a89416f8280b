/// Alto disk geometry and on-disk layout constants

/// Cylinders on one Diablo 31 pack
pub const CYLINDERS: usize = 203;

/// Heads (surfaces) per cylinder
pub const HEADS: usize = 2;

/// Sectors per track
pub const SECTORS: usize = 12;

/// Pages on one physical disk
pub const PAGES_PER_DISK: usize = CYLINDERS * HEADS * SECTORS;

/// Maximum number of physical disks in one file system
pub const MAX_DISKS: usize = 2;

/// Words in the page-number field that prefixes each page in an image
pub const PAGE_NUMBER_WORDS: usize = 1;

/// Words in a page header
pub const HEADER_WORDS: usize = 2;

/// Words in a page label
pub const LABEL_WORDS: usize = 8;

/// Words in a page data payload
pub const DATA_WORDS: usize = 256;

/// Words in one page as stored in an image
pub const PAGE_WORDS: usize = PAGE_NUMBER_WORDS + HEADER_WORDS + LABEL_WORDS + DATA_WORDS;

/// Bytes in one page as stored in an image
pub const PAGE_BYTES: usize = PAGE_WORDS * 2;

/// Bytes in one physical disk image
pub const DISK_IMAGE_BYTES: usize = PAGES_PER_DISK * PAGE_BYTES;

/// Maximum payload bytes in a page
pub const DATA_BYTES: usize = DATA_WORDS * 2;

/// Word offset of the header inside a page
pub const HEADER_OFFSET: usize = PAGE_NUMBER_WORDS;

/// Word offset of the label inside a page
pub const LABEL_OFFSET: usize = HEADER_OFFSET + HEADER_WORDS;

/// Word offset of the data payload inside a page
pub const DATA_OFFSET: usize = LABEL_OFFSET + LABEL_WORDS;

/// File identifier word 0 for a page in use
pub const FID_IN_USE: u16 = 1;

/// File identifier word value marking a free page (all three words)
pub const FID_FREE: u16 = 0xFFFF;

/// File identifier word 1 for directory files
pub const FID_DIRECTORY: u16 = 0x8000;

/// VDA of the root directory's leader page
pub const ROOT_DIRECTORY_VDA: usize = 1;

/// Name of the disk descriptor file
pub const DISK_DESCRIPTOR_NAME: &str = "DiskDescriptor";

/// Seconds between the Alto epoch (1901-01-01) and the Unix epoch
pub const ALTO_EPOCH_OFFSET: i64 = 2_177_452_800;

/// Filename separator that terminates every stored name
pub const NAME_SEPARATOR: u8 = b'.';

/// Bytes in a leader page's filename field
pub const LEADER_NAME_BYTES: usize = 40;

/// Capacity of the directory record buffer in words
pub const DIR_RECORD_WORDS: usize = 64;

/// Directory entry type tag for a file entry
pub const DIR_TYPE_FILE: u16 = 1;

/// Words in the disk descriptor header
pub const DESCRIPTOR_HEADER_WORDS: usize = 16;
