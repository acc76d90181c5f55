use std::fs::File;
use std::io::{self, BufRead, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use salve_core::config::{CaptureConfig, ResolverConfig};
use salve_core::diagnostics::{self, Diagnostics};
use salve_core::error::{SalveError, SalveResult};
use salve_core::formatter::render;
use salve_core::hexdump::{hexdump_at, MAX_DUMP};
use salve_core::human::{human_size, human_time};
use salve_core::symbols::{self, demangle};
use salve_core::unwind::{capture, FrameCapturer};
use salve_utils::{debug, info, init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingGuard};

/// In-process stack traces, symbol demangling and memory dumps.
#[derive(Parser, Debug)]
#[command(name = "salve")]
#[command(version)]
#[command(about = "In-process stack traces, symbol demangling and memory dumps", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Print the stack of this process
    Trace
    {
        /// Line template: \1 frame number, \2 frame, \3 address, \n newline, \t tab
        #[arg(short, long, default_value = "#\\1 \\2\\n")]
        template: String,
        /// Number of innermost frames to leave out
        #[arg(short, long, default_value_t = 0)]
        skip: usize,
        /// Maximum number of frames (default: SALVE_STACK_CAPACITY or 128)
        #[arg(short, long)]
        capacity: Option<usize>,
    },
    /// Demangle Rust symbol names (reads lines from stdin when none are given)
    Demangle
    {
        names: Vec<String>,
    },
    /// Hex dump the start of a file
    Hexdump
    {
        /// File to dump
        file: PathBuf,
        /// Byte offset to start at
        #[arg(short, long, default_value_t = 0)]
        offset: u64,
        /// Number of bytes to read (at most 256 are shown)
        #[arg(short, long, default_value_t = MAX_DUMP)]
        length: usize,
    },
    /// Format a byte count
    Size
    {
        bytes: u64,
    },
    /// Format a duration in seconds
    Time
    {
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
    },
    /// Show build and symbolication information
    Info,
}

fn main()
{
    let cli = Cli::parse();

    // Defaults to INFO level and Pretty format if not set
    let logging = match cli.log_level {
        Some(level) => init_logging_with_level(level, LogFormat::Pretty),
        None => init_logging(),
    };
    let _guard: LoggingGuard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    let sink = Diagnostics::new();
    if let Err(e) = run_command(cli.command) {
        sink.die(&e.to_string(), 1);
    }
}

fn run_command(command: Commands) -> SalveResult<()>
{
    match command {
        Commands::Trace { template, skip, capacity } => {
            let capacity = capacity.unwrap_or_else(|| CaptureConfig::from_env().capacity);
            let stack = capture(skip, capacity);
            debug!(frames = stack.len(), capacity, "captured own stack");
            print!("{}", render(&stack, &unescape(&template), 0));
            Ok(())
        }
        Commands::Demangle { names } => {
            if names.is_empty() {
                for line in io::stdin().lock().lines() {
                    println!("{}", demangle(line?.trim()));
                }
            } else {
                for name in names {
                    println!("{}", demangle(&name));
                }
            }
            Ok(())
        }
        Commands::Hexdump { file, offset, length } => {
            if length == 0 {
                return Err(SalveError::InvalidArgument("--length must be at least 1".to_string()));
            }
            info!("Dumping {} bytes of {} at offset {}", length, file.display(), offset);
            let bytes = read_range(&file, offset, length)?;
            print!("{}", hexdump_at(&bytes, offset));
            Ok(())
        }
        Commands::Size { bytes } => {
            println!("{}", human_size(bytes));
            Ok(())
        }
        Commands::Time { seconds } => {
            println!("{}", human_time(seconds));
            Ok(())
        }
        Commands::Info => {
            print_info();
            Ok(())
        }
    }
}

fn read_range(path: &Path, offset: u64, length: usize) -> SalveResult<Vec<u8>>
{
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut bytes = Vec::with_capacity(length.min(MAX_DUMP));
    file.take(length as u64).read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn print_info()
{
    // one resolve settles whether symbols can be found at all
    let stack = capture(0, 8);
    let resolved = symbols::resolve(&stack);

    println!("salve {}", env!("CARGO_PKG_VERSION"));
    println!("\nBuild:");
    println!("  Debug: {}", diagnostics::is_debug());
    println!("  Asserting: {}", diagnostics::is_asserting());
    println!("\nCapture:");
    println!("  Unwinder: {}", FrameCapturer::global().unwinder_name());
    println!("  Capacity: {}", CaptureConfig::from_env().capacity);
    println!("  Frames from main: {}", stack.len());
    println!("\nSymbols:");
    println!("  Availability: {:?}", symbols::symbol_availability());
    println!("  Max probes: {}", ResolverConfig::from_env().max_probes);
    println!("  Resolved: {}/{}", resolved.iter().filter(|frame| frame.is_resolved()).count(), resolved.len());
    let (images, with_debug_info) =
        symbols::global().with_source(|source| (source.image_count(), source.debug_image_count()));
    println!("  Modules loaded: {} ({} with line tables)", images, with_debug_info);
}

/// Turn the escapes accepted on the command line into template bytes.
fn unescape(template: &str) -> String
{
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('1') => out.push('\x01'),
            Some('2') => out.push('\x02'),
            Some('3') => out.push('\x03'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
