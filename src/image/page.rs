/// Page views and label records

use crate::format::constants::*;

/// Three-word file identifier carried in every label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    /// In-use marker (1) or all-ones for a free page
    pub file: u16,
    /// Directory sentinel (0x8000) or 0 for regular files
    pub directory: u16,
    /// Per-file unique id
    pub id: u16,
}

impl FileId {
    /// Identifier stamped on free pages
    pub const FREE: FileId = FileId {
        file: FID_FREE,
        directory: FID_FREE,
        id: FID_FREE,
    };

    /// Identifier for an in-use file
    pub fn new(directory: bool, id: u16) -> Self {
        Self {
            file: FID_IN_USE,
            directory: if directory { FID_DIRECTORY } else { 0 },
            id,
        }
    }

    /// Decode from three label words
    pub fn decode(words: &[u16]) -> Self {
        Self {
            file: words[0],
            directory: words[1],
            id: words[2],
        }
    }

    /// Encode into three label words
    pub fn encode(&self) -> [u16; 3] {
        [self.file, self.directory, self.id]
    }

    /// Page belongs to no file
    pub fn is_free(&self) -> bool {
        self.file == FID_FREE && self.directory == FID_FREE && self.id == FID_FREE
    }

    /// Page belongs to a live file
    pub fn is_in_use(&self) -> bool {
        self.file == FID_IN_USE
    }

    /// Page belongs to a directory file
    pub fn is_directory(&self) -> bool {
        self.directory == FID_DIRECTORY
    }
}

/// Decoded 8-word page label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    /// RDA of the next page in the file, 0 at the end
    pub next_rda: u16,
    /// RDA of the previous page in the file, 0 at the leader
    pub prev_rda: u16,
    /// Unused slot, kept for round-tripping
    pub unused: u16,
    /// Payload bytes used in this page (0-512)
    pub nbytes: u16,
    /// Position of this page in its file, leader = 0
    pub file_page: u16,
    /// Owning file
    pub fid: FileId,
}

impl Label {
    /// Label of a free page
    pub fn free() -> Self {
        Self {
            next_rda: 0,
            prev_rda: 0,
            unused: 0,
            nbytes: 0,
            file_page: 0,
            fid: FileId::FREE,
        }
    }

    /// Decode from the 8 label words of a page
    pub fn decode(words: &[u16]) -> Self {
        Self {
            next_rda: words[0],
            prev_rda: words[1],
            unused: words[2],
            nbytes: words[3],
            file_page: words[4],
            fid: FileId::decode(&words[5..8]),
        }
    }

    /// Encode into 8 label words
    pub fn encode(&self) -> [u16; LABEL_WORDS] {
        let fid = self.fid.encode();
        [
            self.next_rda,
            self.prev_rda,
            self.unused,
            self.nbytes,
            self.file_page,
            fid[0],
            fid[1],
            fid[2],
        ]
    }

    /// Page is the first page of a live file
    pub fn is_leader(&self) -> bool {
        self.file_page == 0 && self.fid.is_in_use()
    }

    /// Page is the last of its chain
    pub fn is_last(&self) -> bool {
        (self.nbytes as usize) < DATA_BYTES || self.next_rda == 0
    }
}

/// Read-only view of one page inside an image's page array
#[derive(Debug, Clone, Copy)]
pub struct Page<'a> {
    vda: usize,
    words: &'a [u16],
}

impl<'a> Page<'a> {
    /// Wrap the words of one page
    pub(crate) fn new(vda: usize, words: &'a [u16]) -> Self {
        debug_assert_eq!(words.len(), PAGE_WORDS);
        Self { vda, words }
    }

    /// Logical index of this page
    pub fn vda(&self) -> usize {
        self.vda
    }

    /// Page number word stored ahead of the header
    pub fn number(&self) -> u16 {
        self.words[0]
    }

    /// Two-word page header; word 1 is the page's own RDA
    pub fn header(&self) -> [u16; HEADER_WORDS] {
        [self.words[HEADER_OFFSET], self.words[HEADER_OFFSET + 1]]
    }

    /// Raw label words
    pub fn label_words(&self) -> &'a [u16] {
        &self.words[LABEL_OFFSET..LABEL_OFFSET + LABEL_WORDS]
    }

    /// Decoded label
    pub fn label(&self) -> Label {
        Label::decode(self.label_words())
    }

    /// Data payload words
    pub fn data(&self) -> &'a [u16] {
        &self.words[DATA_OFFSET..DATA_OFFSET + DATA_WORDS]
    }

    /// First `count` payload bytes, high byte of each word first
    pub fn data_bytes(&self, count: usize) -> Vec<u8> {
        let count = count.min(DATA_BYTES);
        self.data()
            .iter()
            .flat_map(|w| w.to_be_bytes())
            .take(count)
            .collect()
    }

    /// First `count` payload bytes with each byte pair swapped
    pub fn data_bytes_swapped(&self, count: usize) -> Vec<u8> {
        let count = count.min(DATA_BYTES);
        self.data()
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .take(count)
            .collect()
    }
}

/// Pack bytes two per word, high byte first
pub fn pack_bytes(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| {
            let hi = pair[0] as u16;
            let lo = pair.get(1).copied().unwrap_or(0) as u16;
            (hi << 8) | lo
        })
        .collect()
}

/// Byte `index` of a word-packed byte string
pub fn byte_at(words: &[u16], index: usize) -> Option<u8> {
    let word = *words.get(index / 2)?;
    Some(if index % 2 == 0 {
        (word >> 8) as u8
    } else {
        (word & 0xFF) as u8
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        let label = Label {
            next_rda: 0x1000,
            prev_rda: 0x2004,
            unused: 0,
            nbytes: 512,
            file_page: 3,
            fid: FileId::new(false, 0x42),
        };
        assert_eq!(Label::decode(&label.encode()), label);
    }

    #[test]
    fn test_file_id_states() {
        assert!(FileId::FREE.is_free());
        assert!(!FileId::FREE.is_in_use());

        let dir = FileId::new(true, 100);
        assert!(dir.is_in_use());
        assert!(dir.is_directory());
        assert!(!dir.is_free());

        let file = FileId::new(false, 7);
        assert!(!file.is_directory());

        // two of three words set is not free
        let partial = FileId {
            file: 0xFFFF,
            directory: 0xFFFF,
            id: 0,
        };
        assert!(!partial.is_free());
    }

    #[test]
    fn test_label_termination() {
        let mut label = Label::free();
        label.fid = FileId::new(false, 1);
        label.nbytes = 512;
        label.next_rda = 0x1000;
        assert!(!label.is_last());

        label.nbytes = 100;
        assert!(label.is_last());

        label.nbytes = 512;
        label.next_rda = 0;
        assert!(label.is_last());
    }

    #[test]
    fn test_page_view() {
        let mut words = vec![0u16; PAGE_WORDS];
        words[0] = 7;
        words[HEADER_OFFSET + 1] = 0x7000;
        words[LABEL_OFFSET + 3] = 3;
        words[DATA_OFFSET] = 0x4142;
        words[DATA_OFFSET + 1] = 0x4300;

        let page = Page::new(7, &words);
        assert_eq!(page.number(), 7);
        assert_eq!(page.header(), [0, 0x7000]);
        assert_eq!(page.label().nbytes, 3);
        assert_eq!(page.data_bytes(3), b"ABC".to_vec());
        assert_eq!(page.data_bytes_swapped(3), vec![0x42, 0x41, 0x00]);
    }

    #[test]
    fn test_pack_bytes() {
        assert_eq!(pack_bytes(b"ABC"), vec![0x4142, 0x4300]);
        assert_eq!(byte_at(&[0x4142], 0), Some(b'A'));
        assert_eq!(byte_at(&[0x4142], 1), Some(b'B'));
        assert_eq!(byte_at(&[0x4142], 2), None);
    }
}
