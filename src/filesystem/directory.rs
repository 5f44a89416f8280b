/// Directory file reader
///
/// A directory is an ordinary file whose content is a packed sequence of
/// variable-length entries. The first word of each entry holds the entry
/// type in its top 6 bits and the entry length in words (header word
/// included) in its low 10 bits. File entries (type 1) continue with a
/// file pointer and the file's name:
///
/// ```text
/// word 0     type | length
/// words 1-5  file pointer (serial x2, version, blank, leader VDA)
/// words 6-   name (length-prefixed string)
/// ```
///
/// Entries of any other type are skipped whole.

use crate::error::{AltoError, Result};
use crate::filesystem::chain::WordCursor;
use crate::filesystem::leader::{
    decode_name, encode_name, strip_separator, with_separator, FilePointer, FILE_POINTER_WORDS,
};
use crate::finding::Finding;
use crate::format::constants::*;
use crate::image::DiskImage;
use tracing::{debug, trace};

const LENGTH_MASK: u16 = 0x3FF;
const TYPE_SHIFT: u16 = 10;
const NAME_OFFSET: usize = 1 + FILE_POINTER_WORDS;

/// One decoded directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Word offset of the entry in the directory stream
    pub offset: usize,
    /// Entry type tag
    pub entry_type: u16,
    /// Declared length in words
    pub length: usize,
    /// File the entry names
    pub fp: FilePointer,
    /// Name as stored, including the trailing separator
    pub name: String,
}

impl DirectoryEntry {
    /// Create a file entry
    pub fn new(fp: FilePointer, name: &str) -> Self {
        let name = with_separator(name);
        let length = NAME_OFFSET + encode_name(&name).len();
        Self {
            offset: 0,
            entry_type: DIR_TYPE_FILE,
            length,
            fp,
            name,
        }
    }

    /// Decode a captured record
    ///
    /// `record` holds at most the record buffer's capacity; `length` is the
    /// declared length. The name field is bounded by what was captured.
    pub fn decode(offset: usize, record: &[u16], length: usize) -> (Self, Option<Finding>) {
        let mut words = record.to_vec();
        if words.len() <= NAME_OFFSET {
            words.resize(NAME_OFFSET + 1, 0);
        }
        let name_words = &words[NAME_OFFSET..];
        let (name, finding) = decode_name(name_words, name_words.len() * 2, offset);

        let entry = Self {
            offset,
            entry_type: words[0] >> TYPE_SHIFT,
            length,
            fp: FilePointer::decode(&words[1..NAME_OFFSET]),
            name,
        };
        (entry, finding)
    }

    /// Encode as directory words
    pub fn encode(&self) -> Vec<u16> {
        let name = encode_name(&self.name);
        let length = NAME_OFFSET + name.len();
        let mut words = Vec::with_capacity(length);
        words.push((self.entry_type << TYPE_SHIFT) | (length as u16 & LENGTH_MASK));
        words.extend_from_slice(&self.fp.encode());
        words.extend_from_slice(&name);
        words
    }

    /// Name without the trailing separator
    pub fn display_name(&self) -> &str {
        strip_separator(&self.name)
    }

    /// VDA of the named file's leader page
    pub fn leader_vda(&self) -> usize {
        self.fp.leader_vda as usize
    }
}

/// Sequential reader over a directory file's entries
pub struct DirectoryReader<'a> {
    cursor: WordCursor<'a>,
    findings: Vec<Finding>,
}

impl<'a> DirectoryReader<'a> {
    /// Open the directory whose leader page is `leader_vda`
    pub fn open(image: &'a DiskImage, leader_vda: usize) -> Result<Self> {
        if leader_vda >= image.page_count() {
            return Err(AltoError::NotADirectory(leader_vda));
        }
        let label = image.label(leader_vda);
        if !label.is_leader() || !label.fid.is_directory() {
            return Err(AltoError::NotADirectory(leader_vda));
        }
        debug!("opening directory at page {}", leader_vda);
        Ok(Self {
            cursor: WordCursor::new(image, leader_vda)?,
            findings: Vec::new(),
        })
    }

    /// Open the root directory
    pub fn open_root(image: &'a DiskImage) -> Result<Self> {
        Self::open(image, ROOT_DIRECTORY_VDA)
    }

    /// Read the next file entry, skipping entries of other types
    ///
    /// Returns `None` when the stream ends on an entry boundary.
    pub fn next_entry(&mut self) -> Result<Option<DirectoryEntry>> {
        loop {
            let offset = self.cursor.offset();
            let Some(head) = self.cursor.next_word()? else {
                return Ok(None);
            };

            let length = (head & LENGTH_MASK) as usize;
            let entry_type = head >> TYPE_SHIFT;
            if length == 0 {
                return Err(AltoError::directory_corrupt(offset, "zero-length entry"));
            }

            let wanted = entry_type == DIR_TYPE_FILE;
            let mut record = Vec::with_capacity(length.min(DIR_RECORD_WORDS));
            record.push(head);
            for read in 1..length {
                let Some(word) = self.cursor.next_word()? else {
                    return Err(AltoError::DirectoryExhausted {
                        offset,
                        needed: length - read,
                    });
                };
                if wanted && record.len() < DIR_RECORD_WORDS {
                    record.push(word);
                }
            }

            if !wanted {
                trace!("skipping type {} entry at word {}", entry_type, offset);
                continue;
            }

            if length > DIR_RECORD_WORDS {
                self.report(Finding::EntryTruncated {
                    offset,
                    declared: length,
                    kept: DIR_RECORD_WORDS,
                });
            }

            let (entry, finding) = DirectoryEntry::decode(offset, &record, length);
            if let Some(finding) = finding {
                self.report(finding);
            }
            return Ok(Some(entry));
        }
    }

    /// Read every remaining file entry
    pub fn read_all(mut self) -> Result<(Vec<DirectoryEntry>, Vec<Finding>)> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok((entries, self.findings))
    }

    /// Findings raised so far
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    fn report(&mut self, finding: Finding) {
        finding.log();
        self.findings.push(finding);
    }
}
