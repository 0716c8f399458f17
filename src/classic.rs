//! # Classic — Reference Sieves for Cross-Validation
//!
//! Five textbook sieves kept as correctness oracles for the iZ sieves:
//! classical Eratosthenes, an odd-only bit-packed Eratosthenes, a
//! cache-sized segmented Eratosthenes, Euler's linear sieve, and Atkin.
//! All share the `PrimeList` contract of the iZ sieves (`TooSmall` below
//! 10, first entries 2 and 3), so any two sieves over the same bound must
//! produce identical content hashes — the law the test suite enforces for
//! all seven.

use crate::bitmap::BitMap;
use crate::error::{Error, Result};
use crate::list::PrimeList;
use crate::sieve::{isqrt, prime_count_upper};

fn check_min(n: u64) -> Result<()> {
    if n < 10 {
        return Err(Error::TooSmall { got: n, min: 10 });
    }
    Ok(())
}

/// Classical sieve of Eratosthenes over a byte-per-number table.
pub fn sieve_eratosthenes(n: u64) -> Result<PrimeList> {
    check_min(n)?;
    let n = n as usize;
    let mut composite = vec![false; n + 1];
    let mut primes = PrimeList::with_capacity(prime_count_upper(n as u64))?;
    for i in 2..=n {
        if composite[i] {
            continue;
        }
        primes.push(i as u64);
        let mut m = i * i;
        while m <= n {
            composite[m] = true;
            m += i;
        }
    }
    primes.trim();
    Ok(primes)
}

/// Odd-only bit-packed Eratosthenes: bit `i` stands for `2i + 1`.
pub fn sieve_eratosthenes_opt(n: u64) -> Result<PrimeList> {
    check_min(n)?;
    // Bits 1..=half are the odd numbers 3..=n; for even n, n/2 would add a
    // bit for n + 1.
    let half = (n - 1) / 2;
    let mut odds = BitMap::new_all_set(half + 1)?;
    odds.clear(0); // 1 is not prime

    let root = isqrt(n);
    let mut i = 1u64;
    while 2 * i + 1 <= root {
        if odds.get(i) {
            let p = 2 * i + 1;
            // First composite p², at bit (p² − 1)/2 = 2i(i + 1).
            odds.clear_stride(p, 2 * i * (i + 1), half + 1);
        }
        i += 1;
    }

    let mut primes = PrimeList::with_capacity(prime_count_upper(n))?;
    primes.push(2);
    for bit in odds.iter_set_bits() {
        primes.push(2 * bit + 1);
    }
    primes.trim();
    Ok(primes)
}

/// Odd numbers covered by one segment: 2^15 bits ≈ one L1 data cache.
const SEGMENT_BITS: u64 = 1 << 15;

/// Segmented Eratosthenes: odd-only segments sized to the L1 cache,
/// seeded by the bit-packed sieve up to √n.
pub fn sieve_eratosthenes_seg(n: u64) -> Result<PrimeList> {
    check_min(n)?;
    let root = isqrt(n);
    // The seed sieve's own minimum is 10, so it can overshoot the root for
    // tiny n; only primes at or below the root seed the output.
    let seeds = sieve_eratosthenes_opt(root.max(10))?;

    let mut primes = PrimeList::with_capacity(prime_count_upper(n))?;
    for p in seeds.iter() {
        if p <= root {
            primes.push(p);
        }
    }

    // Walk odd values in segments of SEGMENT_BITS bits; bit b of a segment
    // starting at odd value `lo` stands for `lo + 2b`.
    let mut lo = root + 1 + (root % 2); // first odd above root
    while lo <= n {
        let span = SEGMENT_BITS.min((n - lo) / 2 + 1);
        let mut seg = BitMap::new_all_set(span)?;
        for p in seeds.iter().skip(1) {
            if p * p > lo + 2 * (span - 1) {
                break;
            }
            // First odd multiple of p at or above lo (and ≥ p²).
            let mut m = p * p;
            if m < lo {
                m = lo.div_ceil(p) * p;
                if m % 2 == 0 {
                    m += p;
                }
            }
            if m <= lo + 2 * (span - 1) {
                seg.clear_stride(p, (m - lo) / 2, span);
            }
        }
        for bit in seg.iter_set_bits() {
            primes.push(lo + 2 * bit);
        }
        lo += 2 * SEGMENT_BITS;
    }
    primes.trim();
    Ok(primes)
}

/// Euler's linear sieve: each composite is cleared exactly once, by its
/// smallest prime factor.
pub fn sieve_euler(n: u64) -> Result<PrimeList> {
    check_min(n)?;
    let n = n as usize;
    let mut composite = vec![false; n + 1];
    let mut primes = PrimeList::with_capacity(prime_count_upper(n as u64))?;
    for i in 2..=n {
        if !composite[i] {
            primes.push(i as u64);
        }
        for p in primes.iter() {
            let p = p as usize;
            if i * p > n {
                break;
            }
            composite[i * p] = true;
            if i % p == 0 {
                break;
            }
        }
    }
    primes.trim();
    Ok(primes)
}

/// Sieve of Atkin: quadratic-form flips modulo 12, then elimination of
/// prime-square multiples.
pub fn sieve_atkin(n: u64) -> Result<PrimeList> {
    check_min(n)?;
    let mut flags = BitMap::new_all_clear(n + 1)?;
    let root = isqrt(n);

    for x in 1..=root {
        for y in 1..=root {
            let xx = x * x;
            let yy = y * y;

            let v = 4 * xx + yy;
            if v <= n && (v % 12 == 1 || v % 12 == 5) {
                flags.flip(v);
            }
            let v = 3 * xx + yy;
            if v <= n && v % 12 == 7 {
                flags.flip(v);
            }
            if x > y {
                let v = 3 * xx - yy;
                if v <= n && v % 12 == 11 {
                    flags.flip(v);
                }
            }
        }
    }

    // Squarefree elimination: clear multiples of every surviving square.
    let mut r = 5u64;
    while r <= root {
        if flags.get(r) {
            flags.clear_stride(r * r, r * r, n + 1);
        }
        r += 1;
    }

    let mut primes = PrimeList::with_capacity(prime_count_upper(n))?;
    primes.push(2);
    primes.push(3);
    for v in flags.iter_set_bits() {
        if v >= 5 {
            primes.push(v);
        }
    }
    primes.trim();
    Ok(primes)
}
