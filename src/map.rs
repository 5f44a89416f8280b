/// Page allocation map visualization

use crate::filesystem::Bitmap;
use crate::format::constants::*;
use crate::image::{DiskAddress, DiskImage};
use std::fmt::Write;

/// ANSI color codes for the allocation map
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT_WHITE: &str = "\x1b[97m";
    pub const DARK_WHITE: &str = "\x1b[37m";
    pub const BRIGHT_RED: &str = "\x1b[91m";
    pub const DARK_RED: &str = "\x1b[2;31m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
}

const BLOCK_FREE: &str = "\u{2591}"; // ░
const BLOCK_USED: &str = "\u{2593}"; // ▓

/// Render the allocation map of one disk
///
/// One column per cylinder, one row per head/sector slot. Pages the bitmap
/// and label disagree on are red: bright when the label says in use, dark
/// when it says free. Directory pages are yellow.
pub fn render_allocation_map(image: &DiskImage, disk: usize, bitmap: Option<&Bitmap>) -> String {
    let mut out = String::new();
    if disk >= image.disk_count() {
        let _ = writeln!(out, "Disk {} not loaded.", disk);
        return out;
    }

    let _ = writeln!(out, "=== Allocation Map (Disk {}) ===", disk);
    let _ = writeln!(
        out,
        "Legend: {}In Use{} {}Free{} {}Directory{} {}Bitmap Disagrees{}",
        colors::BRIGHT_WHITE,
        colors::RESET,
        colors::DARK_WHITE,
        colors::RESET,
        colors::BRIGHT_YELLOW,
        colors::RESET,
        colors::BRIGHT_RED,
        colors::RESET
    );
    out.push('\n');

    for slot in (0..HEADS * SECTORS).rev() {
        let head = (slot / SECTORS) as u8;
        let sector = (slot % SECTORS) as u8;
        let _ = write!(out, "{}{:>2} ", head, sector);

        for cylinder in 0..CYLINDERS {
            let vda = DiskAddress::new(disk as u8, cylinder as u16, head, sector).to_vda();
            let fid = image.label(vda).fid;
            let in_use = !fid.is_free();
            let disagrees = bitmap.is_some_and(|b| b.is_free(vda) == in_use);

            let block = if in_use { BLOCK_USED } else { BLOCK_FREE };
            let color = if disagrees {
                if in_use {
                    colors::BRIGHT_RED
                } else {
                    colors::DARK_RED
                }
            } else if in_use && fid.is_directory() {
                colors::BRIGHT_YELLOW
            } else if in_use {
                colors::BRIGHT_WHITE
            } else {
                colors::DARK_WHITE
            };
            let _ = write!(out, "{}{}{}", color, block, colors::RESET);
        }
        out.push('\n');
    }

    // cylinder axis, a label every 10 columns
    out.push_str("    ");
    let mut column = 0;
    while column < CYLINDERS {
        if column % 10 == 0 {
            let label = column.to_string();
            let width = label.len().min(CYLINDERS - column);
            out.push_str(&label[..width]);
            column += width;
        } else {
            out.push(' ');
            column += 1;
        }
    }
    out.push('\n');
    out
}

/// Print the allocation map of one disk
pub fn draw_allocation_map(image: &DiskImage, disk: usize, bitmap: Option<&Bitmap>) {
    print!("{}", render_allocation_map(image, disk, bitmap));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_shape() {
        let image = DiskImage::builder(1).build().unwrap();
        let map = render_allocation_map(&image, 0, None);
        let lines: Vec<&str> = map.lines().collect();
        // title, legend, blank, 24 rows, axis
        assert_eq!(lines.len(), 3 + HEADS * SECTORS + 1);
        assert_eq!(lines[3].matches(BLOCK_FREE).count(), CYLINDERS);
        assert!(lines.last().unwrap().trim_start().starts_with('0'));
    }

    #[test]
    fn test_map_marks_disagreement() {
        let mut builder = DiskImage::builder(1);
        builder.add_file("Data", b"x").unwrap();
        let image = builder.build().unwrap();

        let agreeing = Bitmap::from_labels(&image);
        let map = render_allocation_map(&image, 0, Some(&agreeing));
        assert!(!map.contains(&format!("{}{}", colors::BRIGHT_RED, BLOCK_USED)));

        let stale = Bitmap::new(vec![0; agreeing.words().len()]);
        let map = render_allocation_map(&image, 0, Some(&stale));
        assert!(map.contains(&format!("{}{}", colors::BRIGHT_RED, BLOCK_USED)));
    }

    #[test]
    fn test_missing_disk() {
        let image = DiskImage::builder(1).build().unwrap();
        assert!(render_allocation_map(&image, 1, None).contains("not loaded"));
    }
}
