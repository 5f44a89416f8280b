/// Integration tests for altofs

use altofs::filesystem::{extract_to, file_length};
use altofs::format::{DISK_IMAGE_BYTES, HEADER_OFFSET, PAGES_PER_DISK, PAGE_WORDS};
use altofs::image::vda_to_rda;
use altofs::io::{encode_disk, write_disk};
use altofs::*;
use proptest::prelude::*;
use std::io::Write;
use std::path::Path;

fn save(image: &DiskImage, dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    write_disk(image, 0, &path, ImageByteOrder::Little).expect("Failed to write image");
    path.to_str().expect("Non-UTF-8 temp path").to_string()
}

#[test]
fn test_three_page_file_scenario() {
    let content: Vec<u8> = (0..1124u32).map(|i| (i * 7 % 256) as u8).collect();
    let mut builder = DiskImage::builder(1).with_filesystem();
    let leader = builder.add_file("Scenario.txt", &content).expect("Failed to add file");
    let built = builder.build().expect("Failed to build image");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let source = save(&built, dir.path(), "alto.dsk");
    let image = DiskImage::open(&source, &LoadOptions::default()).expect("Failed to open image");
    assert_eq!(image.words(), built.words());

    // 512 + 512 + 100 content bytes after the leader
    assert_eq!(file_length(&image, leader).expect("Failed to measure"), 1124);

    let fs = AltoFileSystem::from_image(&image);
    let out = tempfile::tempdir().expect("Failed to create temp dir");
    let path = fs.extract_file(leader, out.path()).expect("Failed to extract");
    let extracted = std::fs::read(&path).expect("Failed to read extracted file");
    assert_eq!(extracted.len(), 1124);
    assert_eq!(extracted, content);
    assert_eq!(fs.read_file("scenario.txt").expect("Failed to read file"), content);
}

#[test]
fn test_truncated_image_fails_at_load() {
    let image = DiskImage::builder(1).build().expect("Failed to build image");
    let mut bytes = encode_disk(&image, 0, ImageByteOrder::Little);
    assert_eq!(bytes.len(), DISK_IMAGE_BYTES);
    bytes.pop();

    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(&bytes).expect("Failed to write temp file");
    let source = file.path().to_str().expect("Non-UTF-8 temp path");

    match DiskImage::open(source, &LoadOptions::default()) {
        Err(AltoError::ImageSize {
            expected, actual, ..
        }) => {
            assert_eq!(expected, DISK_IMAGE_BYTES);
            assert_eq!(actual, DISK_IMAGE_BYTES - 1);
        }
        other => panic!("expected ImageSize error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_directory_skips_other_entry_types() {
    let mut builder = DiskImage::builder(1).with_filesystem();
    builder.add_file("First", b"1").expect("Failed to add file");
    // type 2 entry, 6 words, arbitrary payload
    builder.add_raw_entry(vec![(2 << 10) | 6, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF]);
    builder.add_file("Second", b"2").expect("Failed to add file");
    let image = builder.build().expect("Failed to build image");

    let fs = AltoFileSystem::from_image(&image);
    let (entries, findings) = fs.read_directory().expect("Failed to read directory");
    let names: Vec<&str> = entries.iter().map(|e| e.display_name()).collect();
    assert_eq!(names, vec!["SysDir", "First", "Second", "DiskDescriptor"]);
    assert!(findings.is_empty());
    assert_eq!(fs.read_file("Second").expect("Failed to read file"), b"2".to_vec());
}

#[test]
fn test_allocation_cross_check() {
    let mut builder = DiskImage::builder(1).with_filesystem();
    for i in 0..5 {
        builder
            .add_file(&format!("File{}", i), &vec![i as u8; 900 * (i + 1)])
            .expect("Failed to add file");
    }
    builder.flip_bitmap(3000);
    let image = builder.build().expect("Failed to build image");

    let fs = AltoFileSystem::from_image(&image);
    let report = fs.check_allocation().expect("Failed to check allocation");
    assert_eq!(report.label_free, image.free_pages());
    assert_eq!(report.declared_free, report.label_free);
    assert_eq!(report.bitmap_free, report.label_free - 1);
    assert_eq!(report.disagreements(), 1);
    assert!(!report.is_consistent());

    let mut descriptor = DiskDescriptor::load(&image).expect("Failed to load descriptor");
    let free = descriptor.rebuild(&image);
    assert_eq!(free, report.label_free);
    assert_eq!(descriptor.rebuild(&image), free);
    assert!(descriptor.validate(&image).is_consistent());
}

#[test]
fn test_dual_disk_source() {
    let mut builder = DiskImage::builder(2).with_filesystem();
    builder.add_file("Spans", &[0xAB; 2000]).expect("Failed to add file");
    let built = builder.build().expect("Failed to build image");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let first = dir.path().join("disk0.dsk");
    let second = dir.path().join("disk1.dsk");
    write_disk(&built, 0, &first, ImageByteOrder::Little).expect("Failed to write disk 0");
    write_disk(&built, 1, &second, ImageByteOrder::Little).expect("Failed to write disk 1");

    let source = format!("{},{}", first.display(), second.display());
    let image = DiskImage::open(&source, &LoadOptions::default()).expect("Failed to open image");
    assert_eq!(image.disk_count(), 2);
    assert_eq!(image.page_count(), 2 * PAGES_PER_DISK);
    assert!(image.check_headers().is_empty());

    let fs = AltoFileSystem::from_image(&image);
    assert_eq!(fs.read_file("spans").expect("Failed to read file"), vec![0xAB; 2000]);
    assert!(fs.check_allocation().expect("Failed to check").is_consistent());
}

#[test]
fn test_header_mismatch_is_reported_not_fatal() {
    let image = DiskImage::builder(1).build().expect("Failed to build image");
    let mut words = image.words().to_vec();
    words[100 * PAGE_WORDS + HEADER_OFFSET + 1] = vda_to_rda(101);
    let damaged = DiskImage::from_words(words, 1).expect("Failed to wrap words");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let source = save(&damaged, dir.path(), "damaged.dsk");
    let image = DiskImage::open(&source, &LoadOptions::default()).expect("Load should succeed");
    assert_eq!(image.check_headers().len(), 1);

    let unchecked = LoadOptions::default().verify_headers(false);
    assert!(DiskImage::open(&source, &unchecked).is_ok());
}

#[test]
fn test_compressed_image() {
    let mut builder = DiskImage::builder(1).with_filesystem();
    builder.add_file("Packed", b"compressed content").expect("Failed to add file");
    let built = builder.build().expect("Failed to build image");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let source = save(&built, dir.path(), "alto.dsk");
    let status = std::process::Command::new("gzip").arg(&source).status();
    if !matches!(status, Ok(s) if s.success()) {
        // no gzip on this host
        return;
    }

    let image = DiskImage::open(&format!("{}.gz", source), &LoadOptions::default())
        .expect("Failed to open compressed image");
    let fs = AltoFileSystem::from_image(&image);
    assert_eq!(
        fs.read_file("Packed").expect("Failed to read file"),
        b"compressed content".to_vec()
    );
}

#[test]
fn test_big_endian_image() {
    let mut builder = DiskImage::builder(1).with_filesystem();
    builder.add_file("Order", b"word order").expect("Failed to add file");
    let built = builder.build().expect("Failed to build image");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("big.dsk");
    write_disk(&built, 0, &path, ImageByteOrder::Big).expect("Failed to write image");
    let source = path.to_str().expect("Non-UTF-8 temp path");

    let options = LoadOptions::default().byte_order(ImageByteOrder::Big);
    let image = DiskImage::open(source, &options).expect("Failed to open image");
    assert_eq!(image.words(), built.words());

    // the wrong order scrambles every header
    let wrong = DiskImage::open(source, &LoadOptions::default()).expect("Failed to open image");
    assert!(!wrong.check_headers().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_length_and_extraction(content in proptest::collection::vec(any::<u8>(), 0..3000)) {
        let mut builder = DiskImage::builder(1);
        let leader = builder.add_file("Prop", &content).unwrap();
        let image = builder.build().unwrap();

        let length = file_length(&image, leader).unwrap();
        prop_assert_eq!(length, content.len());
        prop_assert_eq!(file_length(&image, leader).unwrap(), length);

        let mut out = Vec::new();
        prop_assert_eq!(extract_to(&image, leader, &mut out, false).unwrap(), length);
        prop_assert_eq!(&out, &content);
    }
}
