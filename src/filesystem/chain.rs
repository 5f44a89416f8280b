/// File chain traversal
///
/// A file is a doubly linked list of pages threaded through the labels.
/// Traversal starts at the leader (file page 0) and follows `next_rda`,
/// checking at each step that the label records the expected position.
/// The chain ends after a page that is not full or has no successor.

use crate::error::{AltoError, Result};
use crate::format::constants::*;
use crate::image::{try_rda_to_vda, DiskImage, Label};
use std::io::Write;
use tracing::{debug, trace};

/// One page visited by a chain cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPage {
    /// Page index
    pub vda: usize,
    /// Page label
    pub label: Label,
}

impl ChainPage {
    /// Payload bytes this page contributes, capped at a full page
    pub fn nbytes(&self) -> usize {
        (self.label.nbytes as usize).min(DATA_BYTES)
    }

    /// Page holds content rather than the leader
    pub fn is_content(&self) -> bool {
        self.label.file_page > 0
    }
}

/// Iterator over the pages of one file, leader first
///
/// Yields an error and stops when a page's recorded position does not
/// match, or when a link points outside the image.
pub struct ChainCursor<'a> {
    image: &'a DiskImage,
    next: Option<Result<usize>>,
    expected: u16,
}

impl<'a> ChainCursor<'a> {
    /// Start at a file's leader page
    pub fn new(image: &'a DiskImage, leader_vda: usize) -> Self {
        Self {
            image,
            next: Some(Ok(leader_vda)),
            expected: 0,
        }
    }

    /// Position the next page is expected to carry
    pub fn expected_position(&self) -> u16 {
        self.expected
    }
}

impl Iterator for ChainCursor<'_> {
    type Item = Result<ChainPage>;

    fn next(&mut self) -> Option<Self::Item> {
        let vda = match self.next.take()? {
            Ok(vda) => vda,
            Err(e) => return Some(Err(e)),
        };

        if let Err(e) = self.image.check_page(vda) {
            return Some(Err(e));
        }
        let label = self.image.label(vda);
        if label.file_page != self.expected {
            return Some(Err(AltoError::ChainPosition {
                vda,
                expected: self.expected,
                found: label.file_page,
            }));
        }

        if !label.is_last() {
            self.next = Some(try_rda_to_vda(label.next_rda, self.image.disk_count()));
        }
        self.expected = self.expected.wrapping_add(1);
        trace!("chain page {} (file page {}, {} bytes)", vda, label.file_page, label.nbytes);

        Some(Ok(ChainPage { vda, label }))
    }
}

/// Size of one file's chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainStats {
    /// Pages including the leader
    pub pages: usize,
    /// Content bytes (leader excluded)
    pub bytes: usize,
    /// Last page of the chain
    pub last_vda: usize,
}

/// Walk a whole chain and measure it
pub fn chain_stats(image: &DiskImage, leader_vda: usize) -> Result<ChainStats> {
    let mut stats = ChainStats {
        last_vda: leader_vda,
        ..ChainStats::default()
    };
    for page in ChainCursor::new(image, leader_vda) {
        let page = page?;
        stats.pages += 1;
        stats.last_vda = page.vda;
        if page.is_content() {
            stats.bytes += page.nbytes();
        }
    }
    Ok(stats)
}

/// Length of a file's content in bytes
pub fn file_length(image: &DiskImage, leader_vda: usize) -> Result<usize> {
    Ok(chain_stats(image, leader_vda)?.bytes)
}

/// Copy a file's content to `sink`, one write per page
///
/// With `swap` set each byte pair is exchanged, giving the low byte of
/// every word first. Returns the number of bytes written.
pub fn extract_to<W: Write>(
    image: &DiskImage,
    leader_vda: usize,
    sink: &mut W,
    swap: bool,
) -> Result<usize> {
    let mut total = 0;
    for page in ChainCursor::new(image, leader_vda) {
        let page = page?;
        if !page.is_content() {
            continue;
        }

        let expected = page.nbytes();
        if expected == 0 {
            continue;
        }
        let view = image.page(page.vda);
        let bytes = if swap {
            view.data_bytes_swapped(expected)
        } else {
            view.data_bytes(expected)
        };

        let written = sink.write(&bytes)?;
        if written != expected {
            return Err(AltoError::ShortWrite {
                vda: page.vda,
                expected,
                written,
            });
        }
        total += written;
    }
    debug!("extracted {} bytes from file at page {}", total, leader_vda);
    Ok(total)
}

/// Word-at-a-time reader over a file's content pages
///
/// Each content page contributes `nbytes / 2` words.
pub struct WordCursor<'a> {
    image: &'a DiskImage,
    chain: ChainCursor<'a>,
    page: Option<ChainPage>,
    index: usize,
    consumed: usize,
}

impl<'a> WordCursor<'a> {
    /// Open the content of the file whose leader is `leader_vda`
    pub fn new(image: &'a DiskImage, leader_vda: usize) -> Result<Self> {
        let mut chain = ChainCursor::new(image, leader_vda);
        // the leader carries metadata, not content
        if let Some(leader) = chain.next() {
            leader?;
        }
        Ok(Self {
            image,
            chain,
            page: None,
            index: 0,
            consumed: 0,
        })
    }

    /// Read the next word, `None` at the end of the file
    pub fn next_word(&mut self) -> Result<Option<u16>> {
        loop {
            if let Some(page) = &self.page {
                if self.index < page.nbytes() / 2 {
                    let word = self.image.page(page.vda).data()[self.index];
                    self.index += 1;
                    self.consumed += 1;
                    return Ok(Some(word));
                }
            }
            match self.chain.next() {
                None => return Ok(None),
                Some(page) => {
                    self.page = Some(page?);
                    self.index = 0;
                }
            }
        }
    }

    /// Read up to `count` words, fewer only at the end of the file
    pub fn read_words(&mut self, count: usize) -> Result<Vec<u16>> {
        let mut words = Vec::with_capacity(count);
        while words.len() < count {
            match self.next_word()? {
                Some(word) => words.push(word),
                None => break,
            }
        }
        Ok(words)
    }

    /// Words consumed so far
    pub fn offset(&self) -> usize {
        self.consumed
    }

    /// Byte offset within the current page
    pub fn byte_offset(&self) -> usize {
        self.index * 2
    }

    /// Current page and its file position, if any page has been entered
    pub fn position(&self) -> Option<(usize, u16)> {
        self.page.map(|p| (p.vda, p.label.file_page))
    }
}
