/// Alto file system: listing, lookup and extraction

use crate::error::{AltoError, Result};
use crate::filesystem::chain::{chain_stats, extract_to};
use crate::filesystem::descriptor::{AllocationReport, DiskDescriptor};
use crate::filesystem::directory::{DirectoryEntry, DirectoryReader};
use crate::filesystem::leader::{leader_pages, read_leader, strip_separator};
use crate::filesystem::{FileInfo, FileSystem, FileSystemInfo};
use crate::finding::Finding;
use crate::image::DiskImage;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How file names given by the user are compared with stored names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatch {
    /// Byte-for-byte comparison
    Exact,
    /// ASCII case folded before comparison
    #[default]
    CaseInsensitive,
}

impl NameMatch {
    /// Compare a stored name with a query; separators already stripped
    pub fn matches(&self, stored: &str, query: &str) -> bool {
        match self {
            NameMatch::Exact => stored == query,
            NameMatch::CaseInsensitive => stored.eq_ignore_ascii_case(query),
        }
    }
}

/// Options for interpreting a loaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsOptions {
    /// Name comparison used by lookups
    pub name_match: NameMatch,
    /// Swap byte pairs of extracted content
    pub swap: bool,
}

impl FsOptions {
    /// Set the name comparison
    pub fn name_match(mut self, name_match: NameMatch) -> Self {
        self.name_match = name_match;
        self
    }

    /// Swap byte pairs on extraction
    pub fn swap(mut self, swap: bool) -> Self {
        self.swap = swap;
        self
    }
}

/// Read-only view of the file system on a loaded image
pub struct AltoFileSystem<'a> {
    image: &'a DiskImage,
    options: FsOptions,
}

impl<'a> AltoFileSystem<'a> {
    /// Interpret `image` with the given options
    pub fn new(image: &'a DiskImage, options: FsOptions) -> Self {
        Self { image, options }
    }

    /// Interpret `image` with default options
    pub fn from_image(image: &'a DiskImage) -> Self {
        Self::new(image, FsOptions::default())
    }

    /// Get the underlying image
    pub fn image(&self) -> &'a DiskImage {
        self.image
    }

    /// Get the options in effect
    pub fn options(&self) -> FsOptions {
        self.options
    }

    /// Leader pages found by scanning every label
    pub fn leader_pages(&self) -> Vec<usize> {
        leader_pages(self.image)
    }

    /// Metadata for the file whose leader is `leader_vda`
    pub fn file_info(&self, leader_vda: usize) -> Result<(FileInfo, Option<Finding>)> {
        self.image.check_page(leader_vda)?;
        let (leader, finding) = read_leader(self.image, leader_vda);
        let label = self.image.label(leader_vda);
        let stats = chain_stats(self.image, leader_vda)?;
        let info = FileInfo {
            leader_vda,
            name: leader.display_name().to_string(),
            length: stats.bytes,
            pages: stats.pages,
            serial: label.fid.id,
            directory: label.fid.is_directory(),
            created: leader.created,
            written: leader.written,
            read: leader.read,
        };
        Ok((info, finding))
    }

    /// Metadata for every file found by leader scan, with name findings
    pub fn scan_files(&self) -> Result<(Vec<FileInfo>, Vec<Finding>)> {
        let mut files = Vec::new();
        let mut findings = Vec::new();
        for vda in self.leader_pages() {
            let (info, finding) = self.file_info(vda)?;
            if let Some(finding) = finding {
                finding.log();
                findings.push(finding);
            }
            files.push(info);
        }
        debug!("leader scan found {} files", files.len());
        Ok((files, findings))
    }

    /// Entries of the root directory
    pub fn read_directory(&self) -> Result<(Vec<DirectoryEntry>, Vec<Finding>)> {
        DirectoryReader::open_root(self.image)?.read_all()
    }

    /// Look a file up in the root directory
    ///
    /// The trailing separator is optional in `name`.
    pub fn find_file(&self, name: &str) -> Result<DirectoryEntry> {
        let query = strip_separator(name);
        let mut reader = DirectoryReader::open_root(self.image)?;
        while let Some(entry) = reader.next_entry()? {
            if self.options.name_match.matches(entry.display_name(), query) {
                debug!("found {} at page {}", entry.display_name(), entry.leader_vda());
                return Ok(entry);
            }
        }
        Err(AltoError::FileNotFound(name.to_string()))
    }

    /// Write the file whose leader is `leader_vda` into `sink`
    pub fn write_to<W: std::io::Write>(&self, leader_vda: usize, sink: &mut W) -> Result<usize> {
        extract_to(self.image, leader_vda, sink, self.options.swap)
    }

    /// Extract one file into `dir`, returning its path and any name finding
    ///
    /// The host file name comes from the leader page; a name longer than the
    /// leader can hold is reported and extracted under its kept prefix.
    pub fn extract_reporting(
        &self,
        leader_vda: usize,
        dir: &Path,
    ) -> Result<(PathBuf, Option<Finding>)> {
        self.image.check_page(leader_vda)?;
        let (leader, finding) = read_leader(self.image, leader_vda);
        if let Some(finding) = &finding {
            finding.log();
        }
        let path = dir.join(output_name(leader.display_name(), leader_vda));
        let mut file = File::create(&path)?;
        let written = self.write_to(leader_vda, &mut file)?;
        info!("extracted {} ({} bytes)", path.display(), written);
        Ok((path, finding))
    }

    /// Extract every file found by leader scan into `dir`, with name findings
    pub fn extract_all(&self, dir: &Path) -> Result<(Vec<PathBuf>, Vec<Finding>)> {
        let mut paths = Vec::new();
        let mut findings = Vec::new();
        for vda in self.leader_pages() {
            let (path, finding) = self.extract_reporting(vda, dir)?;
            paths.push(path);
            findings.extend(finding);
        }
        Ok((paths, findings))
    }

    /// Cross-check the disk descriptor against the labels
    pub fn check_allocation(&self) -> Result<AllocationReport> {
        Ok(DiskDescriptor::load(self.image)?.validate(self.image))
    }
}

impl FileSystem for AltoFileSystem<'_> {
    fn list_files(&self) -> Result<Vec<FileInfo>> {
        Ok(self.scan_files()?.0)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self.find_file(name)?;
        let mut data = Vec::new();
        self.write_to(entry.leader_vda(), &mut data)?;
        Ok(data)
    }

    fn extract_file(&self, leader_vda: usize, dir: &Path) -> Result<PathBuf> {
        Ok(self.extract_reporting(leader_vda, dir)?.0)
    }

    fn info(&self) -> FileSystemInfo {
        FileSystemInfo {
            fs_type: "Alto".to_string(),
            disks: self.image.disk_count(),
            total_pages: self.image.page_count(),
            free_pages: self.image.free_pages(),
            files: self.leader_pages().len(),
        }
    }
}

/// Host file name for an extracted file
///
/// Path separators become `_`; an empty name falls back to the page index.
pub fn output_name(name: &str, leader_vda: usize) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("page{}", leader_vda),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::leader::FilePointer;

    fn sample() -> (DiskImage, usize) {
        let mut builder = DiskImage::builder(1).with_filesystem();
        builder.add_file("Readme.txt", b"hello alto").unwrap();
        let big = builder.add_file("Big.run", &[0x5A; 1300]).unwrap();
        (builder.build().unwrap(), big)
    }

    #[test]
    fn test_list_files() {
        let (image, big) = sample();
        let fs = AltoFileSystem::from_image(&image);
        let files = fs.list_files().unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["SysDir", "Readme.txt", "Big.run", "DiskDescriptor"]);

        let info = files.iter().find(|f| f.leader_vda == big).unwrap();
        assert_eq!(info.length, 1300);
        assert_eq!(info.pages, 4);
        assert!(!info.directory);
        assert!(files[0].directory);
    }

    #[test]
    fn test_find_file_name_matching() {
        let (image, _) = sample();
        let fs = AltoFileSystem::from_image(&image);
        assert_eq!(fs.find_file("readme.TXT").unwrap().display_name(), "Readme.txt");
        assert_eq!(fs.find_file("Readme.txt.").unwrap().display_name(), "Readme.txt");

        let exact = AltoFileSystem::new(&image, FsOptions::default().name_match(NameMatch::Exact));
        assert!(exact.find_file("Readme.txt").is_ok());
        assert!(matches!(
            exact.find_file("readme.txt"),
            Err(AltoError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_read_file() {
        let (image, _) = sample();
        let fs = AltoFileSystem::from_image(&image);
        assert_eq!(fs.read_file("Readme.txt").unwrap(), b"hello alto".to_vec());

        let swapped = AltoFileSystem::new(&image, FsOptions::default().swap(true));
        assert_eq!(swapped.read_file("Readme.txt").unwrap(), b"ehll oalot".to_vec());
    }

    #[test]
    fn test_extract_into_directory() {
        let (image, big) = sample();
        let dir = tempfile::tempdir().unwrap();
        let fs = AltoFileSystem::from_image(&image);

        let path = fs.extract_file(big, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("Big.run"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x5A; 1300]);

        let (all, findings) = fs.extract_all(dir.path()).unwrap();
        assert_eq!(all.len(), 4);
        assert!(findings.is_empty());
        assert!(dir.path().join("Readme.txt").exists());
    }

    #[test]
    fn test_extract_reports_truncated_name() {
        let long = "N".repeat(255);
        let mut builder = DiskImage::builder(1);
        let leader = builder.add_file(&long, b"x").unwrap();
        let image = builder.build().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let fs = AltoFileSystem::from_image(&image);

        let (path, finding) = fs.extract_reporting(leader, dir.path()).unwrap();
        assert!(matches!(
            finding,
            Some(Finding::NameTruncated {
                declared: 255,
                kept: 39,
                ..
            })
        ));
        assert_eq!(path.file_name().unwrap().len(), 39);
        assert_eq!(std::fs::read(&path).unwrap(), b"x".to_vec());

        let (_, findings) = fs.extract_all(dir.path()).unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_directory_leader_outside_image() {
        let mut builder = DiskImage::builder(1).with_filesystem();
        let pointer = FilePointer {
            serial: 5,
            version: 1,
            blank: 0,
            leader_vda: 60000,
        };
        builder.add_raw_entry(DirectoryEntry::new(pointer, "Bogus").encode());
        let image = builder.build().unwrap();
        let fs = AltoFileSystem::from_image(&image);

        assert_eq!(fs.find_file("Bogus").unwrap().leader_vda(), 60000);
        assert!(matches!(
            fs.read_file("Bogus"),
            Err(AltoError::PageOutOfRange { vda: 60000, .. })
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            fs.extract_file(60000, dir.path()),
            Err(AltoError::PageOutOfRange { vda: 60000, .. })
        ));
        assert!(fs.file_info(60000).is_err());
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name("Memo.bravo", 5), "Memo.bravo");
        assert_eq!(output_name("a/b\\c", 5), "a_b_c");
        assert_eq!(output_name("", 12), "page12");
        assert_eq!(output_name("..", 12), "page12");
    }

    #[test]
    fn test_info() {
        let (image, _) = sample();
        let fs = AltoFileSystem::from_image(&image);
        let info = fs.info();
        assert_eq!(info.files, 4);
        assert_eq!(info.total_pages, 4872);
        assert_eq!(info.free_pages, image.free_pages());
        assert!(fs.check_allocation().unwrap().is_consistent());
    }
}
