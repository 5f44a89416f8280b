/// Builder for assembling Alto disk images in memory

use crate::error::{AltoError, Result};
use crate::filesystem::descriptor::{Bitmap, DescriptorHeader};
use crate::filesystem::directory::DirectoryEntry;
use crate::filesystem::leader::{AltoTime, FilePointer, LastPageHint, LeaderPage};
use crate::format::constants::*;
use crate::format::total_pages;
use crate::image::page::pack_bytes;
use crate::image::{vda_to_rda, DiskImage, FileId, Label};
use tracing::debug;

const FIRST_FILE_VDA: usize = 2;
const SYSDIR_SERIAL: u32 = 100;

/// Builder for constructing Alto disk images
///
/// Starts from a blank image: every page free, every header naming its own
/// page. Files are laid out in consecutive free pages. With
/// [`with_filesystem`](Self::with_filesystem) the build also writes the root
/// directory at page 1 and a disk descriptor whose bitmap matches the labels.
#[derive(Debug, Clone)]
pub struct DiskImageBuilder {
    words: Vec<u16>,
    disks: usize,
    filesystem: bool,
    time: AltoTime,
    next_free: usize,
    next_serial: u32,
    entries: Vec<Vec<u16>>,
    trailing: Vec<Vec<u16>>,
    bitmap_flips: Vec<usize>,
    declared_free: Option<u16>,
}

impl DiskImageBuilder {
    /// Create a blank image of `disks` disks
    pub fn new(disks: usize) -> Self {
        let pages = total_pages(disks);
        let mut words = vec![0u16; pages * PAGE_WORDS];
        let free = Label::free().encode();
        for (vda, page) in words.chunks_exact_mut(PAGE_WORDS).enumerate() {
            page[0] = vda as u16;
            page[HEADER_OFFSET + 1] = vda_to_rda(vda);
            page[LABEL_OFFSET..LABEL_OFFSET + LABEL_WORDS].copy_from_slice(&free);
        }
        Self {
            words,
            disks,
            filesystem: false,
            time: AltoTime::default(),
            next_free: FIRST_FILE_VDA,
            next_serial: SYSDIR_SERIAL + 1,
            entries: Vec::new(),
            trailing: Vec::new(),
            bitmap_flips: Vec::new(),
            declared_free: None,
        }
    }

    /// Write a root directory and disk descriptor when building
    pub fn with_filesystem(mut self) -> Self {
        self.filesystem = true;
        self
    }

    /// Set the timestamp stamped on new leader pages
    pub fn time(mut self, time: AltoTime) -> Self {
        self.time = time;
        self
    }

    /// Add a file and return the VDA of its leader page
    pub fn add_file(&mut self, name: &str, content: &[u8]) -> Result<usize> {
        let leader_vda = self.allocate()?;
        let serial = self.next_serial;
        self.next_serial += 1;

        let leader = LeaderPage::new(name, self.time);
        self.write_file(leader_vda, FileId::new(false, serial as u16), leader, content)?;

        let fp = FilePointer {
            serial,
            version: 1,
            blank: 0,
            leader_vda: leader_vda as u16,
        };
        self.entries.push(DirectoryEntry::new(fp, name).encode());
        debug!("added {} ({} bytes) at page {}", name, content.len(), leader_vda);
        Ok(leader_vda)
    }

    /// Add pre-encoded directory words after the entries added so far
    pub fn add_raw_entry(&mut self, words: Vec<u16>) {
        self.entries.push(words);
    }

    /// Add pre-encoded words at the very end of the root directory
    pub fn add_trailing_raw_entry(&mut self, words: Vec<u16>) {
        self.trailing.push(words);
    }

    /// Decoded label of page `vda`
    pub fn label(&self, vda: usize) -> Label {
        let start = vda * PAGE_WORDS + LABEL_OFFSET;
        Label::decode(&self.words[start..start + LABEL_WORDS])
    }

    /// Overwrite the label of page `vda`
    pub fn set_label(&mut self, vda: usize, label: Label) {
        let start = vda * PAGE_WORDS + LABEL_OFFSET;
        self.words[start..start + LABEL_WORDS].copy_from_slice(&label.encode());
    }

    /// Overwrite the start of the payload of page `vda`, zero-filling the rest
    pub fn set_data(&mut self, vda: usize, data: &[u16]) {
        let start = vda * PAGE_WORDS + DATA_OFFSET;
        let page = &mut self.words[start..start + DATA_WORDS];
        page.fill(0);
        let count = data.len().min(DATA_WORDS);
        page[..count].copy_from_slice(&data[..count]);
    }

    /// Store this free count in the descriptor instead of the real one
    pub fn declared_free_pages(&mut self, free: u16) {
        self.declared_free = Some(free);
    }

    /// Invert the bitmap bit of page `vda` in the written descriptor
    pub fn flip_bitmap(&mut self, vda: usize) {
        self.bitmap_flips.push(vda);
    }

    /// Build the image
    pub fn build(mut self) -> Result<DiskImage> {
        if self.filesystem {
            self.write_filesystem()?;
        }
        DiskImage::from_words(self.words, self.disks)
    }

    fn write_filesystem(&mut self) -> Result<()> {
        let pages = total_pages(self.disks);
        let mut header = DescriptorHeader::for_disks(self.disks);

        let descriptor_vda = self.allocate()?;
        let descriptor_serial = self.next_serial;
        self.next_serial += 1;
        let descriptor_bytes = vec![0u8; (DESCRIPTOR_HEADER_WORDS + header.bitmap_words as usize) * 2];
        let descriptor_pages = self.write_file(
            descriptor_vda,
            FileId::new(false, descriptor_serial as u16),
            LeaderPage::new(DISK_DESCRIPTOR_NAME, self.time),
            &descriptor_bytes,
        )?;

        let sysdir = sysdir_pointer();
        let descriptor = FilePointer {
            serial: descriptor_serial,
            version: 1,
            blank: 0,
            leader_vda: descriptor_vda as u16,
        };
        let mut directory = DirectoryEntry::new(sysdir, "SysDir").encode();
        for entry in &self.entries {
            directory.extend_from_slice(entry);
        }
        directory.extend(DirectoryEntry::new(descriptor, DISK_DESCRIPTOR_NAME).encode());
        for entry in &self.trailing {
            directory.extend_from_slice(entry);
        }
        let directory_bytes: Vec<u8> = directory.iter().flat_map(|w| w.to_be_bytes()).collect();
        self.write_file(
            ROOT_DIRECTORY_VDA,
            FileId::new(true, SYSDIR_SERIAL as u16),
            LeaderPage::new("SysDir", self.time),
            &directory_bytes,
        )?;

        let image = DiskImage::from_words(self.words.clone(), self.disks)?;
        let mut bitmap = Bitmap::from_labels(&image);
        let free = bitmap.free_count(pages);
        for &vda in &self.bitmap_flips {
            let used = bitmap.is_free(vda);
            bitmap.set_used(vda, used);
        }
        header.free_pages = self.declared_free.unwrap_or(free as u16);
        header.last_serial = self.next_serial - 1;

        let mut content: Vec<u16> = header.encode().to_vec();
        content.extend_from_slice(bitmap.words());
        for (vda, chunk) in descriptor_pages.iter().zip(content.chunks(DATA_WORDS)) {
            self.set_data(*vda, chunk);
        }
        debug!(
            "wrote file system: {} directory words, {} free pages",
            directory.len(),
            free
        );
        Ok(())
    }

    /// Lay out a leader and its content pages; returns the content pages
    fn write_file(
        &mut self,
        leader_vda: usize,
        fid: FileId,
        mut leader: LeaderPage,
        content: &[u8],
    ) -> Result<Vec<usize>> {
        let count = content.len() / DATA_BYTES + 1;
        let mut vdas = Vec::with_capacity(count);
        for _ in 0..count {
            vdas.push(self.allocate()?);
        }

        let mut prev = leader_vda;
        for (index, &vda) in vdas.iter().enumerate() {
            let start = index * DATA_BYTES;
            let chunk = &content[start..content.len().min(start + DATA_BYTES)];
            let label = Label {
                next_rda: vdas.get(index + 1).map_or(0, |&next| vda_to_rda(next)),
                prev_rda: vda_to_rda(prev),
                unused: 0,
                nbytes: chunk.len() as u16,
                file_page: index as u16 + 1,
                fid,
            };
            self.set_label(vda, label);
            self.set_data(vda, &pack_bytes(chunk));
            prev = vda;
        }

        leader.dir_fp = sysdir_pointer();
        leader.last_page = LastPageHint {
            vda: prev as u16,
            page_number: count as u16,
            char_pos: (content.len() % DATA_BYTES) as u16,
        };
        self.set_label(
            leader_vda,
            Label {
                next_rda: vda_to_rda(vdas[0]),
                prev_rda: 0,
                unused: 0,
                nbytes: DATA_BYTES as u16,
                file_page: 0,
                fid,
            },
        );
        self.set_data(leader_vda, &leader.encode());
        Ok(vdas)
    }

    fn allocate(&mut self) -> Result<usize> {
        let pages = total_pages(self.disks);
        while self.next_free < pages {
            let vda = self.next_free;
            self.next_free += 1;
            if self.label(vda).fid.is_free() {
                return Ok(vda);
            }
        }
        Err(AltoError::invalid_argument("image full"))
    }
}

fn sysdir_pointer() -> FilePointer {
    FilePointer {
        serial: ((FID_DIRECTORY as u32) << 16) | SYSDIR_SERIAL,
        version: 1,
        blank: 0,
        leader_vda: ROOT_DIRECTORY_VDA as u16,
    }
}
