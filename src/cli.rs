//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim: one run
//! function per subcommand, translating library results into terminal
//! output and optional `output/` files.

use anyhow::{Context, Result};
use rug::Integer;
use tracing::info;

use izprime::residue::Residue;
use izprime::{classic, search, sieve, store, vx};

use super::Method;

fn hex(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Run one of the seven sieves and report count, last prime, and the
/// content hash the cross-validation law is stated over.
pub fn run_sieve(n: u64, method: Method, write: bool) -> Result<()> {
    let start = std::time::Instant::now();
    let primes = match method {
        Method::Iz => sieve::sieve_iz(n),
        Method::Izm => sieve::sieve_izm(n),
        Method::Eratosthenes => classic::sieve_eratosthenes(n),
        Method::EratosthenesOpt => classic::sieve_eratosthenes_opt(n),
        Method::EratosthenesSeg => classic::sieve_eratosthenes_seg(n),
        Method::Euler => classic::sieve_euler(n),
        Method::Atkin => classic::sieve_atkin(n),
    }?;
    let elapsed = start.elapsed();
    info!(n, ?method, count = primes.len(), ?elapsed, "sieve finished");

    println!("{} primes up to {}", primes.len(), n);
    if let Some(last) = primes.last() {
        println!("last:  {}", last);
    }
    println!("hash:  {}", hex(&primes.content_hash()));

    if write {
        let path = store::output_dir()?.join(format!("primes_{}.bin", n));
        store::write_prime_list(&path, &primes)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

/// Sieve `count` slabs from `start_y`, reporting per-slab gap counts and
/// the two observational counters.
pub fn run_slabs(start_y: u64, count: u64, width: u64, write: bool) -> Result<()> {
    let start = std::time::Instant::now();
    let results = vx::sieve_vx_range(start_y, count, width)?;
    let elapsed = start.elapsed();
    let total: usize = results.iter().map(|s| s.len()).sum();
    info!(start_y, count, width, total, ?elapsed, "slab range finished");

    for slab in &results {
        println!(
            "slab {:>6}: {:>7} primes  (bit ops {:>12}, tests {:>7})",
            slab.y(),
            slab.len(),
            slab.bit_ops(),
            slab.test_ops()
        );
        if write {
            let path = store::output_dir()?.join(format!("slab_{}.vx", slab.y()));
            store::write_vx_result(&path, slab)?;
            println!("wrote {}", path.display());
        }
    }
    println!("{} primes across {} slabs", total, count);
    Ok(())
}

/// Race workers to a random probable prime of roughly `bits` bits.
pub fn run_random(bits: u32, workers: u32, plus: bool) -> Result<()> {
    let class = if plus { Residue::Plus } else { Residue::Minus };
    let start = std::time::Instant::now();
    let p = search::random_iz_prime(class, bits, workers)?;
    let elapsed = start.elapsed();
    info!(bits, workers, found_bits = p.significant_bits(), ?elapsed, "random prime found");

    println!("{}", p);
    println!("({} bits, class {:?})", p.significant_bits(), class);
    Ok(())
}

/// Walk to the adjacent probable prime above or below `base`.
pub fn run_next(base: &str, backward: bool) -> Result<()> {
    let base: Integer = base
        .trim()
        .parse()
        .context("base must be a decimal integer")?;
    let p = search::iz_next_prime(&base, !backward)?;
    println!("{}", p);
    Ok(())
}

/// Draw a random `bits`-bit integer and walk up to its adjacent prime.
pub fn run_random_next(bits: u32) -> Result<()> {
    let p = search::iz_random_next_prime(bits)?;
    println!("{}", p);
    println!("({} bits)", p.significant_bits());
    Ok(())
}
