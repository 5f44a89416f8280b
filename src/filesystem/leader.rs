/// Leader page decoding
///
/// Every file starts with a leader page (file page 0) whose payload holds
/// the file's metadata rather than content:
///
/// | words   | field                                        |
/// |---------|----------------------------------------------|
/// | 0-1     | created                                      |
/// | 2-3     | written                                      |
/// | 4-5     | read                                         |
/// | 6-25    | name (length-prefixed string, 40 bytes)      |
/// | 26-235  | leader properties                            |
/// | 236-245 | spare                                        |
/// | 246     | property begin, property length              |
/// | 247     | consecutive, change serial                   |
/// | 248-252 | directory file pointer                       |
/// | 253-255 | last page hint                               |

use crate::finding::Finding;
use crate::format::constants::*;
use crate::image::page::{byte_at, pack_bytes};
use crate::image::DiskImage;
use chrono::DateTime;

const CREATED_OFFSET: usize = 0;
const WRITTEN_OFFSET: usize = 2;
const READ_OFFSET: usize = 4;
const NAME_OFFSET: usize = 6;
const NAME_WORDS: usize = LEADER_NAME_BYTES / 2;
const PROPS_OFFSET: usize = NAME_OFFSET + NAME_WORDS;
const PROPS_WORDS: usize = 210;
const PROP_INFO_OFFSET: usize = 246;
const SERIAL_INFO_OFFSET: usize = 247;
const DIR_FP_OFFSET: usize = 248;
const LAST_PAGE_OFFSET: usize = 253;

/// Words in a file pointer
pub const FILE_POINTER_WORDS: usize = 5;

/// Timestamp in seconds since 1901-01-01 00:00 UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AltoTime(pub u32);

impl AltoTime {
    /// Decode from two words, high word first
    pub fn decode(words: &[u16]) -> Self {
        AltoTime(((words[0] as u32) << 16) | words[1] as u32)
    }

    /// Encode into two words, high word first
    pub fn encode(&self) -> [u16; 2] {
        [(self.0 >> 16) as u16, (self.0 & 0xFFFF) as u16]
    }

    /// Build from a Unix timestamp
    pub fn from_unix(seconds: i64) -> Self {
        AltoTime((seconds + ALTO_EPOCH_OFFSET).clamp(0, u32::MAX as i64) as u32)
    }

    /// Time was never set
    pub fn is_never(&self) -> bool {
        self.0 == 0
    }

    /// Seconds since the Unix epoch, `None` if never set
    pub fn unix_seconds(&self) -> Option<i64> {
        (!self.is_never()).then(|| self.0 as i64 - ALTO_EPOCH_OFFSET)
    }
}

impl std::fmt::Display for AltoTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unix_seconds().and_then(|s| DateTime::from_timestamp(s, 0)) {
            Some(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "never"),
        }
    }
}

/// Reference to a file: serial number, version and leader page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilePointer {
    /// 32-bit serial number; the top bit of the high word marks directories
    pub serial: u32,
    /// File version
    pub version: u16,
    /// Unused word
    pub blank: u16,
    /// VDA of the file's leader page
    pub leader_vda: u16,
}

impl FilePointer {
    /// Decode from five words
    pub fn decode(words: &[u16]) -> Self {
        Self {
            serial: ((words[0] as u32) << 16) | words[1] as u32,
            version: words[2],
            blank: words[3],
            leader_vda: words[4],
        }
    }

    /// Encode into five words
    pub fn encode(&self) -> [u16; FILE_POINTER_WORDS] {
        [
            (self.serial >> 16) as u16,
            (self.serial & 0xFFFF) as u16,
            self.version,
            self.blank,
            self.leader_vda,
        ]
    }

    /// Pointer names a directory
    pub fn is_directory(&self) -> bool {
        (self.serial >> 16) as u16 & FID_DIRECTORY != 0
    }
}

/// Hint to a file's last page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LastPageHint {
    /// VDA of the last page
    pub vda: u16,
    /// File page number of the last page
    pub page_number: u16,
    /// Bytes used in the last page
    pub char_pos: u16,
}

/// Decoded leader page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderPage {
    /// Creation time
    pub created: AltoTime,
    /// Last write time
    pub written: AltoTime,
    /// Last read time
    pub read: AltoTime,
    /// Name as stored, including the trailing separator
    pub name: String,
    /// Leader property area, uninterpreted
    pub properties: Vec<u16>,
    /// Offset of the first property
    pub prop_begin: u8,
    /// Length of the property area in use
    pub prop_length: u8,
    /// File pages are consecutive on disk
    pub consecutive: u8,
    /// Change serial
    pub change_serial: u8,
    /// Directory containing this file
    pub dir_fp: FilePointer,
    /// Last page hint
    pub last_page: LastPageHint,
}

impl LeaderPage {
    /// Create a leader for a file called `name` (separator appended if missing)
    pub fn new(name: &str, time: AltoTime) -> Self {
        Self {
            created: time,
            written: time,
            read: time,
            name: with_separator(name),
            properties: vec![0; PROPS_WORDS],
            prop_begin: 0,
            prop_length: 0,
            consecutive: 0,
            change_serial: 0,
            dir_fp: FilePointer::default(),
            last_page: LastPageHint::default(),
        }
    }

    /// Decode the payload of leader page `vda`
    pub fn decode(vda: usize, data: &[u16]) -> (Self, Option<Finding>) {
        let (name, finding) = decode_name(
            &data[NAME_OFFSET..NAME_OFFSET + NAME_WORDS],
            LEADER_NAME_BYTES,
            vda,
        );
        let leader = Self {
            created: AltoTime::decode(&data[CREATED_OFFSET..]),
            written: AltoTime::decode(&data[WRITTEN_OFFSET..]),
            read: AltoTime::decode(&data[READ_OFFSET..]),
            name,
            properties: data[PROPS_OFFSET..PROPS_OFFSET + PROPS_WORDS].to_vec(),
            prop_begin: (data[PROP_INFO_OFFSET] >> 8) as u8,
            prop_length: (data[PROP_INFO_OFFSET] & 0xFF) as u8,
            consecutive: (data[SERIAL_INFO_OFFSET] >> 8) as u8,
            change_serial: (data[SERIAL_INFO_OFFSET] & 0xFF) as u8,
            dir_fp: FilePointer::decode(&data[DIR_FP_OFFSET..DIR_FP_OFFSET + FILE_POINTER_WORDS]),
            last_page: LastPageHint {
                vda: data[LAST_PAGE_OFFSET],
                page_number: data[LAST_PAGE_OFFSET + 1],
                char_pos: data[LAST_PAGE_OFFSET + 2],
            },
        };
        (leader, finding)
    }

    /// Encode into a full page payload
    pub fn encode(&self) -> Vec<u16> {
        let mut data = vec![0u16; DATA_WORDS];
        data[CREATED_OFFSET..CREATED_OFFSET + 2].copy_from_slice(&self.created.encode());
        data[WRITTEN_OFFSET..WRITTEN_OFFSET + 2].copy_from_slice(&self.written.encode());
        data[READ_OFFSET..READ_OFFSET + 2].copy_from_slice(&self.read.encode());

        let mut name = encode_name(&self.name);
        name.truncate(NAME_WORDS);
        data[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(&name);

        let props = self.properties.len().min(PROPS_WORDS);
        data[PROPS_OFFSET..PROPS_OFFSET + props].copy_from_slice(&self.properties[..props]);
        data[PROP_INFO_OFFSET] = ((self.prop_begin as u16) << 8) | self.prop_length as u16;
        data[SERIAL_INFO_OFFSET] = ((self.consecutive as u16) << 8) | self.change_serial as u16;
        data[DIR_FP_OFFSET..DIR_FP_OFFSET + FILE_POINTER_WORDS]
            .copy_from_slice(&self.dir_fp.encode());
        data[LAST_PAGE_OFFSET] = self.last_page.vda;
        data[LAST_PAGE_OFFSET + 1] = self.last_page.page_number;
        data[LAST_PAGE_OFFSET + 2] = self.last_page.char_pos;
        data
    }

    /// Name without the trailing separator
    pub fn display_name(&self) -> &str {
        strip_separator(&self.name)
    }
}

/// Decode a length-prefixed string from word-packed bytes
///
/// `capacity` is the size of the field in bytes, length byte included.
/// A length that does not fit is cut to the field and reported.
pub fn decode_name(words: &[u16], capacity: usize, location: usize) -> (String, Option<Finding>) {
    let capacity = capacity.min(words.len() * 2);
    let declared = byte_at(words, 0).unwrap_or(0) as usize;
    let room = capacity.saturating_sub(1);
    let kept = declared.min(room);

    let name: String = (1..=kept)
        .filter_map(|i| byte_at(words, i))
        .map(|b| b as char)
        .collect();

    let finding = (declared > room).then_some(Finding::NameTruncated {
        location,
        declared,
        kept,
    });
    (name, finding)
}

/// Encode a name as a length-prefixed, word-packed string
pub fn encode_name(name: &str) -> Vec<u16> {
    let mut bytes = Vec::with_capacity(name.len() + 1);
    bytes.push(name.len().min(255) as u8);
    bytes.extend(name.bytes().take(255));
    pack_bytes(&bytes)
}

/// Append the separator if `name` lacks one
pub fn with_separator(name: &str) -> String {
    if name.as_bytes().last() == Some(&NAME_SEPARATOR) {
        name.to_string()
    } else {
        format!("{}{}", name, NAME_SEPARATOR as char)
    }
}

/// Remove one trailing separator
pub fn strip_separator(name: &str) -> &str {
    name.strip_suffix(NAME_SEPARATOR as char).unwrap_or(name)
}

/// Pages that start a live file: file page 0 with the in-use marker
pub fn leader_pages(image: &DiskImage) -> Vec<usize> {
    image
        .pages()
        .filter(|page| page.label().is_leader())
        .map(|page| page.vda())
        .collect()
}

/// Decode the leader of page `vda`
pub fn read_leader(image: &DiskImage, vda: usize) -> (LeaderPage, Option<Finding>) {
    LeaderPage::decode(vda, image.page(vda).data())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_decoding() {
        // "Hi." packed high byte first: [3,'H'] ['i','.']
        let words = [0x0348, 0x692E];
        let (name, finding) = decode_name(&words, 40, 0);
        assert_eq!(name, "Hi.");
        assert!(finding.is_none());
        assert_eq!(strip_separator(&name), "Hi");
    }

    #[test]
    fn test_name_truncation_reported() {
        let mut words = vec![0u16; NAME_WORDS];
        words[0] = 0xFF41; // declares 255 bytes
        let (name, finding) = decode_name(&words, LEADER_NAME_BYTES, 9);
        assert_eq!(name.len(), 39);
        assert_eq!(
            finding,
            Some(Finding::NameTruncated {
                location: 9,
                declared: 255,
                kept: 39,
            })
        );
    }

    #[test]
    fn test_leader_round_trip() {
        let mut leader = LeaderPage::new("Memo.bravo", AltoTime(0x9000_0000));
        leader.dir_fp = FilePointer {
            serial: 0x8000_0064,
            version: 1,
            blank: 0,
            leader_vda: 1,
        };
        leader.last_page = LastPageHint {
            vda: 20,
            page_number: 3,
            char_pos: 100,
        };
        leader.consecutive = 1;

        let (decoded, finding) = LeaderPage::decode(5, &leader.encode());
        assert!(finding.is_none());
        assert_eq!(decoded, leader);
        assert_eq!(decoded.name, "Memo.bravo.");
        assert_eq!(decoded.display_name(), "Memo.bravo");
        assert!(decoded.dir_fp.is_directory());
    }

    #[test]
    fn test_alto_time() {
        assert_eq!(AltoTime(0).to_string(), "never");
        assert_eq!(AltoTime::from_unix(0).0 as i64, ALTO_EPOCH_OFFSET);
        assert_eq!(AltoTime::from_unix(0).to_string(), "1970-01-01 00:00:00");
        // 1979-06-15 12:30:45 UTC
        assert_eq!(
            AltoTime::from_unix(298_297_845).to_string(),
            "1979-06-15 12:30:45"
        );
        assert_eq!(AltoTime(1).to_string(), "1901-01-01 00:00:01");

        let time = AltoTime(0x1234_5678);
        assert_eq!(AltoTime::decode(&time.encode()), time);
    }

    #[test]
    fn test_leader_scan() {
        let mut builder = DiskImage::builder(1);
        let first = builder.add_file("One", b"1").unwrap();
        let second = builder.add_file("Two", &[2u8; 700]).unwrap();
        let image = builder.build().unwrap();

        assert_eq!(leader_pages(&image), vec![first, second]);
        let (leader, _) = read_leader(&image, second);
        assert_eq!(leader.display_name(), "Two");
    }

    #[test]
    fn test_separator_helpers() {
        assert_eq!(with_separator("SysDir"), "SysDir.");
        assert_eq!(with_separator("SysDir."), "SysDir.");
        assert_eq!(strip_separator("a.b."), "a.b");
        assert_eq!(strip_separator("ab"), "ab");
    }
}
