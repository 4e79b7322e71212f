use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use xxhash_rust::xxh3::xxh3_64;

use lzdirect_codecs::{LzmaCodec, LzmaProps, DEFAULT_DICT_SIZE, DEFAULT_PRESET};
use lzdirect_core::{compress_bound, peek_original_size, BlockHeader, CompressionRequest, DirectBufferBridge, HEADER_SIZE};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "lzdirect",
    about = "Compress, decompress, and inspect self-describing LZMA blocks",
    version
)]
struct Cli {
    /// Log bridge activity (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into a single block
    Compress {
        /// Source file ("-" reads stdin)
        input: PathBuf,
        /// Destination block file
        output: PathBuf,
        /// LZMA preset (0–9)
        #[arg(short, long, default_value_t = DEFAULT_PRESET)]
        preset: u32,
        /// Dictionary size in bytes (minimum 4096)
        #[arg(short, long, default_value_t = DEFAULT_DICT_SIZE)]
        dict_size: u32,
    },
    /// Decompress a block back to raw bytes
    Decompress {
        /// Source block file
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
    },
    /// Print the block header
    Inspect {
        /// Block file to inspect
        file: PathBuf,
    },
    /// Round-trip a file through one shared buffer and compare digests
    Verify {
        /// File to round-trip
        input: PathBuf,
        /// LZMA preset (0–9)
        #[arg(short, long, default_value_t = DEFAULT_PRESET)]
        preset: u32,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.to_str() == Some("-") {
        let mut data = Vec::new();
        io::stdin().lock().read_to_end(&mut data)?;
        Ok(data)
    } else {
        std::fs::read(path).with_context(|| format!("reading input file {:?}", path))
    }
}

fn lzma_bridge(preset: u32, dict_size: u32) -> anyhow::Result<DirectBufferBridge> {
    let bridge = DirectBufferBridge::new(Box::new(LzmaCodec::new(preset).with_dict_size(dict_size)));
    bridge.initialize()?;
    Ok(bridge)
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(input: PathBuf, output: PathBuf, preset: u32, dict_size: u32) -> anyhow::Result<()> {
    let data = read_input(&input)?;
    let bridge = lzma_bridge(preset, dict_size)?;

    // [input | block]
    let capacity = compress_bound(data.len());
    let mut buf = vec![0u8; data.len() + capacity];
    buf[..data.len()].copy_from_slice(&data);

    let t0 = Instant::now();
    let produced = bridge.compress_direct(CompressionRequest::new(&mut buf, 0, data.len(), data.len(), capacity))?;
    let elapsed = t0.elapsed();

    std::fs::write(&output, &buf[data.len()..data.len() + produced])
        .with_context(|| format!("writing output file {:?}", output))?;
    info!("wrote {} bytes to {:?}", produced, output);

    let raw = data.len() as u64;
    eprintln!("  preset      : {}", preset);
    eprintln!("  dictionary  : {}", human_bytes(dict_size as u64));
    eprintln!("  raw size    : {}", human_bytes(raw));
    eprintln!("  block size  : {}", human_bytes(produced as u64));
    eprintln!("  ratio       : {:.2}x", raw as f64 / produced as f64);
    eprintln!(
        "  throughput  : {}/s",
        human_bytes((raw as f64 / elapsed.as_secs_f64()) as u64)
    );
    Ok(())
}

fn run_decompress(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let block = std::fs::read(&input).with_context(|| format!("reading block file {:?}", input))?;
    let original = usize::try_from(peek_original_size(&block)?).context("block too large for this platform")?;

    lzdirect_codecs::initialize()?;

    // [block | output]
    let mut buf = vec![0u8; block.len() + original];
    buf[..block.len()].copy_from_slice(&block);
    let t0 = Instant::now();
    let n = lzdirect_codecs::decompress(&mut buf, 0, block.len(), block.len(), original)?;
    let elapsed = t0.elapsed();
    let raw = &buf[block.len()..block.len() + n];

    if output.to_str() == Some("-") {
        io::stdout().lock().write_all(raw)?;
    } else {
        let mut dst = File::create(&output).with_context(|| format!("creating output file {:?}", output))?;
        dst.write_all(raw)?;
    }

    eprintln!("  raw size    : {}", human_bytes(n as u64));
    eprintln!(
        "  throughput  : {}/s",
        human_bytes((n as f64 / elapsed.as_secs_f64()) as u64)
    );
    Ok(())
}

fn run_inspect(file: PathBuf) -> anyhow::Result<()> {
    let block = std::fs::read(&file).with_context(|| format!("reading block file {:?}", file))?;
    let header = BlockHeader::from_bytes(&block)?;
    let payload = (block.len() - HEADER_SIZE) as u64;

    println!("=== Block: {:?} ===", file);
    println!();
    println!("  props byte     : 0x{:02x}", header.params.props);
    match LzmaProps::from_byte(header.params.props) {
        Some(p) => println!("  lc / lp / pb   : {} / {} / {}", p.lc(), p.lp(), p.pb()),
        None => println!("  lc / lp / pb   : invalid"),
    }
    println!("  dictionary     : {}", human_bytes(header.params.dict_size as u64));
    println!("  original size  : {}", human_bytes(header.original_size));
    println!("  payload        : {}", human_bytes(payload));
    if payload > 0 {
        println!(
            "  ratio          : {:.2}x",
            header.original_size as f64 / (payload + HEADER_SIZE as u64) as f64
        );
    }
    Ok(())
}

fn run_verify(input: PathBuf, preset: u32) -> anyhow::Result<()> {
    let data = read_input(&input)?;
    let bridge = lzma_bridge(preset, DEFAULT_DICT_SIZE)?;
    let len = data.len();

    // [input | block | output], all in one region.
    let capacity = compress_bound(len);
    let mut buf = vec![0u8; len + capacity + len];
    buf[..len].copy_from_slice(&data);

    let t0 = Instant::now();
    let produced = bridge.compress_direct(CompressionRequest::new(&mut buf, 0, len, len, capacity))?;
    let t_compress = t0.elapsed();

    let t1 = Instant::now();
    let n = bridge.decompress_direct(CompressionRequest::new(&mut buf, len, produced, len + capacity, len))?;
    let t_decompress = t1.elapsed();

    let expected = xxh3_64(&data);
    let actual = xxh3_64(&buf[len + capacity..len + capacity + n]);

    println!("  raw size    : {}", human_bytes(len as u64));
    println!("  block size  : {}", human_bytes(produced as u64));
    println!("  compress    : {:.3}ms", t_compress.as_secs_f64() * 1000.0);
    println!("  decompress  : {:.3}ms", t_decompress.as_secs_f64() * 1000.0);
    println!("  xxh3 input  : {:016x}", expected);
    println!("  xxh3 output : {:016x}", actual);

    if n != len || expected != actual {
        anyhow::bail!("round-trip mismatch: {} bytes in, {} bytes out", len, n);
    }
    println!("  ok");
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Compress {
            input,
            output,
            preset,
            dict_size,
        } => run_compress(input, output, preset, dict_size),
        Commands::Decompress { input, output } => run_decompress(input, output),
        Commands::Inspect { file } => run_inspect(file),
        Commands::Verify { input, preset } => run_verify(input, preset),
    }
}
