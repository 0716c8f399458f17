//! # Main — CLI Entry Point
//!
//! Routes subcommands to the library: enumeration sieves, slab kernels,
//! the random-prime worker race, and next-prime walks. Keeps only
//! argument parsing and logging setup here; execution lives in `cli`.
//!
//! ## Logging
//!
//! `LOG_FORMAT=json` switches to structured JSON output; anything else
//! gets human-readable lines on stderr, filtered by `RUST_LOG`.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "izprime", about = "Prime sieves and random prime generation on the iZ decomposition")]
struct Cli {
    /// Write results under output/ as hash-verified binary files
    #[arg(long, global = true)]
    write: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate every prime up to a bound
    Sieve {
        /// Upper bound (inclusive)
        #[arg(long)]
        n: u64,

        /// Sieve implementation
        #[arg(long, value_enum, default_value = "izm")]
        method: Method,
    },
    /// Sieve consecutive slabs of the iZ matrix, emitting prime gaps
    Slabs {
        /// First slab index
        #[arg(long, default_value_t = 0)]
        start_y: u64,

        /// Number of consecutive slabs
        #[arg(long, default_value_t = 1)]
        count: u64,

        /// Slab width (a primorial over 5, 7, 11, …)
        #[arg(long, default_value_t = izprime::VX6)]
        vx: u64,
    },
    /// Race workers to a random probable prime
    Random {
        /// Requested size in bits
        #[arg(long, default_value_t = 1024)]
        bits: u32,

        /// Parallel workers (clamped to 1..=16)
        #[arg(long, default_value_t = 4)]
        workers: u32,

        /// Search the 6x+1 class instead of 6x−1
        #[arg(long)]
        plus: bool,
    },
    /// Find the adjacent probable prime above or below a base
    Next {
        /// Decimal base value
        #[arg(long)]
        base: String,

        /// Walk downward instead of upward
        #[arg(long)]
        backward: bool,
    },
    /// Find the prime adjacent to a fresh random integer
    RandomNext {
        /// Size of the random base in bits
        #[arg(long, default_value_t = 256)]
        bits: u32,
    },
}

/// All seven sieves; the non-iZ ones are the cross-validation oracles.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Method {
    Iz,
    Izm,
    Eratosthenes,
    EratosthenesOpt,
    EratosthenesSeg,
    Euler,
    Atkin,
}

fn main() -> Result<()> {
    // LOG_FORMAT=json for machine consumers, human-readable otherwise.
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    match &cli.command {
        Commands::Sieve { n, method } => cli::run_sieve(*n, *method, cli.write),
        Commands::Slabs { start_y, count, vx } => cli::run_slabs(*start_y, *count, *vx, cli.write),
        Commands::Random {
            bits,
            workers,
            plus,
        } => cli::run_random(*bits, *workers, *plus),
        Commands::Next { base, backward } => cli::run_next(base, *backward),
        Commands::RandomNext { bits } => cli::run_random_next(*bits),
    }
}
