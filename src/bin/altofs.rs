//! Xerox Alto disk image tool
//!
//! Lists, inspects and extracts the files on Alto disk images, and checks
//! the disk descriptor's free-page bitmap against the page labels.
//!
//! # Usage
//!
//! ```bash
//! # List every file found by leader scan
//! altofs -l alto.dsk
//!
//! # Extract two files into out/
//! altofs -x -o out alto.dsk User.cm Sys.boot
//!
//! # Detailed table with timestamps, from a dual-disk compressed image
//! altofs -t -T disk0.dsk.gz,disk1.dsk.gz
//!
//! # Check and rebuild the allocation bitmap
//! altofs -c -r alto.dsk
//!
//! # Interactive console
//! altofs
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use altofs::filesystem::alto::output_name;
use altofs::filesystem::leader::read_leader;
use altofs::format::DATA_BYTES;
use altofs::map::draw_allocation_map;
use altofs::*;
use clap::{ArgGroup, Parser};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Xerox Alto disk image tool
#[derive(Parser, Debug)]
#[command(
    name = "altofs",
    version,
    about = "Read files from Xerox Alto disk images",
    long_about = "Read files from Xerox Alto disk images.\n\n\
                  IMAGE is one image file, or two separated by ',' for a dual-disk \
                  file system. Without IMAGE an interactive console starts."
)]
#[command(group(ArgGroup::new("mode").args(["list", "directory", "extract", "table"])))]
struct Args {
    /// Image file, or two files separated by ','
    image: Option<String>,

    /// Files to extract or tabulate (default: all)
    files: Vec<String>,

    /// List files found by scanning leader pages
    #[arg(short = 'l', long)]
    list: bool,

    /// List root directory entries
    #[arg(short = 'd', long)]
    directory: bool,

    /// Extract the named files, or every file
    #[arg(short = 'x', long)]
    extract: bool,

    /// Detailed table of the named files, or every file
    #[arg(short = 't', long)]
    table: bool,

    /// Cross-check the free-page bitmap against the labels
    #[arg(short = 'c', long)]
    check: bool,

    /// Rebuild the free-page bitmap from the labels and report it
    #[arg(short = 'r', long)]
    rebuild: bool,

    /// Draw the page allocation map
    #[arg(long)]
    map: bool,

    /// Show lengths and page counts in listings
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Swap byte pairs of extracted files
    #[arg(short = 's', long)]
    swap: bool,

    /// Show creation, write and read times
    #[arg(short = 'T', long)]
    times: bool,

    /// Decompress the image with gzip
    #[arg(short = 'z', long)]
    compressed: bool,

    /// Directory extracted files are written to
    #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Match file names exactly instead of ignoring case
    #[arg(long)]
    exact_names: bool,

    /// Skip the page header consistency check
    #[arg(long)]
    no_header_check: bool,

    /// Image words are stored high byte first
    #[arg(long)]
    big_endian: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", env = "ALTOFS_LOG")]
    log_level: String,
}

impl Args {
    fn load_options(&self) -> LoadOptions {
        let byte_order = if self.big_endian {
            ImageByteOrder::Big
        } else {
            ImageByteOrder::Little
        };
        LoadOptions::default()
            .byte_order(byte_order)
            .compressed(self.compressed)
            .verify_headers(!self.no_header_check)
    }

    fn fs_options(&self) -> FsOptions {
        let name_match = if self.exact_names {
            NameMatch::Exact
        } else {
            NameMatch::CaseInsensitive
        };
        FsOptions::default().name_match(name_match).swap(self.swap)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    let result = match &args.image {
        Some(source) => run(&args, source),
        None => {
            run_console(&args);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("altofs: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(format!("altofs={level}"))
        .unwrap_or_else(|_| EnvFilter::new("altofs=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// One-shot mode: run the operations selected by flags
fn run(args: &Args, source: &str) -> Result<()> {
    let image = DiskImage::open(source, &args.load_options())?;
    let fs = AltoFileSystem::new(&image, args.fs_options());
    let names = &args.files;

    if !names.is_empty() && !(args.extract || args.table) {
        return Err(AltoError::invalid_argument(
            "file names need --extract or --table",
        ));
    }

    if args.list {
        print_listing(&fs, args.verbose, args.times)?;
    } else if args.directory {
        print_directory(&fs, args.verbose)?;
    } else if args.extract {
        extract(&fs, names, &args.output)?;
    } else if args.table {
        print_table(&fs, names, args.times)?;
    }

    if args.check {
        print_check(&fs)?;
    }
    if args.rebuild {
        print_rebuild(&image)?;
    }
    if args.map {
        print_map(&image);
    }

    let any_mode = args.list || args.directory || args.extract || args.table;
    if !any_mode && !args.check && !args.rebuild && !args.map {
        print_info(&fs);
    }
    Ok(())
}

fn print_info(fs: &AltoFileSystem<'_>) {
    let image = fs.image();
    let info = fs.info();
    if let Some(source) = image.source() {
        println!("Source: {}", source);
    }
    println!("Byte order: {}", image.byte_order());
    println!("Disks: {}", info.disks);
    println!("Pages: {}", info.total_pages);
    println!("Free pages: {}", info.free_pages);
    println!("Files: {}", info.files);
}

fn print_listing(fs: &AltoFileSystem<'_>, verbose: bool, times: bool) -> Result<()> {
    let (files, _) = fs.scan_files()?;
    for file in &files {
        if verbose {
            print!("{:>5} {:>8} {:>5}  ", file.leader_vda, file.length, file.pages);
        } else {
            print!("{:>5}  ", file.leader_vda);
        }
        println!("{}{}", file.name, if file.directory { "/" } else { "" });
        if times {
            print_times(file);
        }
    }
    println!("{} files", files.len());
    Ok(())
}

fn print_times(file: &FileInfo) {
    println!("       created {}", file.created);
    println!("       written {}", file.written);
    println!("       read    {}", file.read);
}

fn print_directory(fs: &AltoFileSystem<'_>, verbose: bool) -> Result<()> {
    let (entries, findings) = fs.read_directory()?;
    for entry in &entries {
        if verbose {
            println!(
                "{:>6} {:>5} {:08X} v{:<3} {}",
                entry.offset,
                entry.leader_vda(),
                entry.fp.serial,
                entry.fp.version,
                entry.display_name()
            );
        } else {
            println!("{}", entry.display_name());
        }
    }
    println!("{} entries", entries.len());
    if !findings.is_empty() {
        println!("{} truncated names or entries", findings.len());
    }
    Ok(())
}

fn extract(fs: &AltoFileSystem<'_>, names: &[String], dir: &Path) -> Result<()> {
    let (paths, findings) = if names.is_empty() {
        fs.extract_all(dir)?
    } else {
        let mut paths = Vec::new();
        let mut findings = Vec::new();
        for name in names {
            let (path, finding) = fs.extract_reporting(fs.find_file(name)?.leader_vda(), dir)?;
            paths.push(path);
            findings.extend(finding);
        }
        (paths, findings)
    };
    for path in &paths {
        println!("{}", path.display());
    }
    if !findings.is_empty() {
        println!("{} names truncated", findings.len());
    }
    Ok(())
}

fn print_table(fs: &AltoFileSystem<'_>, names: &[String], times: bool) -> Result<()> {
    let files = if names.is_empty() {
        fs.scan_files()?.0
    } else {
        names
            .iter()
            .map(|name| Ok(fs.file_info(fs.find_file(name)?.leader_vda())?.0))
            .collect::<Result<Vec<_>>>()?
    };

    println!(
        "{:>5} {:>8} {:>5} {:>6} {:<19}  Name",
        "Page", "Bytes", "Pages", "Serial", "Written"
    );
    for file in &files {
        println!(
            "{:>5} {:>8} {:>5} {:>6} {:<19}  {}",
            file.leader_vda,
            file.length,
            file.pages,
            file.serial,
            file.written.to_string(),
            file.name
        );
        if times {
            print_times(file);
        }
    }
    Ok(())
}

fn print_check(fs: &AltoFileSystem<'_>) -> Result<()> {
    let report = fs.check_allocation()?;
    println!("Declared free: {}", report.declared_free);
    println!("Bitmap free:   {}", report.bitmap_free);
    println!("Label free:    {}", report.label_free);
    for finding in &report.findings {
        println!("  {}", finding);
    }
    if report.is_consistent() {
        println!("Allocation consistent");
    } else {
        println!(
            "{} findings ({} pages disagree)",
            report.findings.len(),
            report.disagreements()
        );
    }
    Ok(())
}

fn print_rebuild(image: &DiskImage) -> Result<()> {
    let mut descriptor = DiskDescriptor::load(image)?;
    let before = descriptor.header.free_pages;
    let free = descriptor.rebuild(image);
    println!("Rebuilt bitmap: {} free pages (descriptor said {})", free, before);
    Ok(())
}

fn print_map(image: &DiskImage) {
    let descriptor = DiskDescriptor::load(image);
    if let Err(e) = &descriptor {
        debug!("no bitmap for map: {}", e);
    }
    let bitmap = descriptor.as_ref().ok().map(|d| &d.bitmap);
    for disk in 0..image.disk_count() {
        draw_allocation_map(image, disk, bitmap);
    }
}

/// Command completer for the console
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "check", "dir", "exact", "exit", "extract", "help", "info", "ls", "map", "open",
                "page", "quit", "read", "rebuild", "swap", "table", "times", "verbose",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // only the command word completes
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Get the path to the history file
fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".altofs_history");
        p
    })
}

/// Console session state
struct Session {
    image: Option<DiskImage>,
    load_options: LoadOptions,
    fs_options: FsOptions,
    output: PathBuf,
    verbose: bool,
    times: bool,
}

fn run_console(args: &Args) {
    println!("=== altofs ===");
    println!("Interactive console for exploring Xerox Alto disk images.");
    println!("Type 'help' for available commands\n");

    let mut rl = match Editor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("altofs: cannot start console: {}", e);
            return;
        }
    };
    rl.set_helper(Some(CommandCompleter::new()));
    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    let mut session = Session {
        image: None,
        load_options: args.load_options(),
        fs_options: args.fs_options(),
        output: args.output.clone(),
        verbose: args.verbose,
        times: args.times,
    };

    loop {
        let input = match rl.readline("alto> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        let parts = parse_command_line(input);
        let Some(command) = parts.first().map(|c| c.to_lowercase()) else {
            continue;
        };
        if command == "quit" || command == "exit" {
            break;
        }
        if let Err(e) = run_command(&mut session, &command, &parts[1..]) {
            println!("Error: {}", e);
        }
    }

    if let Some(history_path) = history_path() {
        let _ = rl.save_history(&history_path);
    }
    println!("Goodbye!");
}

fn run_command(session: &mut Session, command: &str, params: &[String]) -> Result<()> {
    match command {
        "help" => print_help(),
        "open" | "load" => {
            let Some(source) = params.first() else {
                println!("Usage: open <image>[,<image>]");
                return Ok(());
            };
            let image = DiskImage::open(source, &session.load_options)?;
            println!("Opened: {} ({} disks)", source, image.disk_count());
            session.image = Some(image);
        }
        "swap" => {
            if let Some(value) = params.first() {
                session.fs_options = session.fs_options.swap(parse_switch(value)?);
            }
            println!("Swap on extract: {}", on_off(session.fs_options.swap));
        }
        "exact" => {
            if let Some(value) = params.first() {
                let name_match = if parse_switch(value)? {
                    NameMatch::Exact
                } else {
                    NameMatch::CaseInsensitive
                };
                session.fs_options = session.fs_options.name_match(name_match);
            }
            println!(
                "Exact names: {}",
                on_off(session.fs_options.name_match == NameMatch::Exact)
            );
        }
        "verbose" => {
            session.verbose = !session.verbose;
            println!("Verbose: {}", on_off(session.verbose));
        }
        "times" => {
            session.times = !session.times;
            println!("Times: {}", on_off(session.times));
        }
        _ => {
            let Some(image) = session.image.as_ref() else {
                println!("No image loaded. Use 'open <path>' first.");
                return Ok(());
            };
            let fs = AltoFileSystem::new(image, session.fs_options);
            run_image_command(session, &fs, command, params)?;
        }
    }
    Ok(())
}

fn run_image_command(
    session: &Session,
    fs: &AltoFileSystem<'_>,
    command: &str,
    params: &[String],
) -> Result<()> {
    let image = fs.image();
    match command {
        "info" => print_info(fs),
        "ls" => print_listing(fs, session.verbose, session.times)?,
        "dir" => print_directory(fs, session.verbose)?,
        "table" => print_table(fs, params, session.times)?,
        "extract" => extract(fs, params, &session.output)?,
        "read" => {
            let Some(name) = params.first() else {
                println!("Usage: read <file>");
                return Ok(());
            };
            let data = fs.read_file(name)?;
            println!("{} ({} bytes):", name, data.len());
            print_hex_dump(&data, 512);
        }
        "page" => {
            let Some(vda) = params.first().and_then(|p| parse_number(p)) else {
                println!("Usage: page <vda>");
                return Ok(());
            };
            if vda >= image.page_count() {
                return Err(AltoError::invalid_argument(format!(
                    "page {} outside image of {} pages",
                    vda,
                    image.page_count()
                )));
            }
            print_page(image, vda);
        }
        "check" => print_check(fs)?,
        "rebuild" => print_rebuild(image)?,
        "map" => match params.first().and_then(|p| parse_number(p)) {
            Some(disk) => {
                let descriptor = DiskDescriptor::load(image).ok();
                draw_allocation_map(image, disk, descriptor.as_ref().map(|d| &d.bitmap));
            }
            None => print_map(image),
        },
        _ => println!("Unknown command: {}. Type 'help' for available commands.", command),
    }
    Ok(())
}

fn print_page(image: &DiskImage, vda: usize) {
    let page = image.page(vda);
    let label = page.label();
    println!("Page {} ({})", vda, DiskAddress::from_vda(vda));
    println!("  Header: {:04X} {:04X}", page.header()[0], page.header()[1]);
    println!(
        "  Label: next {:04X} prev {:04X} bytes {} page {} fid {:04X} {:04X} {:04X}",
        label.next_rda,
        label.prev_rda,
        label.nbytes,
        label.file_page,
        label.fid.file,
        label.fid.directory,
        label.fid.id
    );
    if label.is_leader() {
        let (leader, finding) = read_leader(image, vda);
        if let Some(finding) = finding {
            finding.log();
        }
        println!(
            "  Leader: {} (host name {})",
            leader.display_name(),
            output_name(leader.display_name(), vda)
        );
    }
    print_hex_dump(&page.data_bytes(DATA_BYTES), DATA_BYTES);
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(AltoError::invalid_argument(format!(
            "expected on or off, got {}",
            value
        ))),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn parse_number(s: &str) -> Option<usize> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

/// Parse command line input, respecting quoted strings
fn parse_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn print_help() {
    println!("Available commands:");
    println!("  open <image>[,<image>]   - Open a single or dual-disk image");
    println!("  info                     - Show image information");
    println!("  ls                       - List files found by leader scan");
    println!("  dir                      - List root directory entries");
    println!("  table [files...]         - Detailed table of files (all if none given)");
    println!("  extract [files...]       - Extract files to the output directory (all if none given)");
    println!("  read <file>              - Hex dump a file's contents");
    println!("  page <vda>               - Show a page's header, label and data");
    println!("  check                    - Cross-check the bitmap against the labels");
    println!("  rebuild                  - Rebuild the bitmap from the labels");
    println!("  map [disk]               - Visual allocation map (red = bitmap disagrees)");
    println!("  swap [on|off]            - Show or set byte swapping on extract");
    println!("  exact [on|off]           - Show or set exact file name matching");
    println!("  verbose, times           - Toggle listing detail and timestamps");
    println!("  help                     - Show this help");
    println!("  quit, exit               - Exit");
}

fn print_hex_dump(data: &[u8], max_bytes: usize) {
    let len = data.len().min(max_bytes);

    for (i, chunk) in data[..len].chunks(16).enumerate() {
        print!("{:04X}: ", i * 16);
        for (j, byte) in chunk.iter().enumerate() {
            print!("{:02X} ", byte);
            if j == 7 {
                print!(" ");
            }
        }
        for j in chunk.len()..16 {
            print!("   ");
            if j == 7 {
                print!(" ");
            }
        }

        print!(" |");
        for byte in chunk {
            let c = if (32..127).contains(byte) {
                *byte as char
            } else {
                '.'
            };
            print!("{}", c);
        }
        println!("|");
    }

    if data.len() > max_bytes {
        println!("... ({} more bytes)", data.len() - max_bytes);
    }
}
