//! # Sieve — iZ Prime Enumeration
//!
//! Two sieves over the iZ decomposition, both returning a `PrimeList`
//! headed by 2 and 3:
//!
//! 1. **`sieve_iz`** — non-segmented. Two bitmaps of `⌊n/6⌋ + 1` columns,
//!    one per residue class; a single ascending walk both collects primes
//!    and stride-clears their composites. Simple and fast to ~10⁸; the
//!    correctness oracle for everything else.
//! 2. **`sieve_izm`** — segmented over a primorial slab width `vx`. The
//!    composites of the primes dividing `vx` are pre-cleared in a base
//!    pattern built once; each slab clones the pattern (two bitmaps of
//!    ≈0.2 MB at the default width) and only the remaining root primes are
//!    stride-cleared per slab, positioned by one `solve_for_x` division
//!    each. Bounded working set, preferred for large `n`.
//!
//! ## Stride offsets
//!
//! For a prime `p = 6x − 1` discovered at column `x`, the first composite
//! columns are `p·x + x` in `x5` (value `p(p + 2)`) and `p·x − x` in `x7`
//! (value `p²`); for `p = 6x + 1` the offsets swap. Both progressions then
//! advance by `p` columns.

use tracing::debug;

use crate::assets;
use crate::bitmap::BitMap;
use crate::error::{Error, Result};
use crate::list::PrimeList;
use crate::residue::{compute_limited_vx, solve_for_x, Residue};

/// Integer square root, exact for all u64 values: f64 seed, Newton-corrected.
#[inline]
pub fn isqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = (n as f64).sqrt() as u64;
    while x > 0 && x.checked_mul(x).is_none_or(|sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).is_some_and(|sq| sq <= n) {
        x += 1;
    }
    x
}

/// Prime-counting upper bound for preallocation; overestimates π(n) by a
/// few percent so collection never reallocates.
#[inline]
pub(crate) fn prime_count_upper(n: u64) -> usize {
    if n < 10 {
        return 4;
    }
    let nf = n as f64;
    (1.15 * nf / nf.ln()) as usize + 1
}

/// Enumerate every prime up to `n` with the non-segmented iZ sieve.
///
/// `TooSmall` below 10. The walk runs to the last column `⌊n/6⌋`; a final
/// `6x + 1` value past `n` is dropped before returning.
pub fn sieve_iz(n: u64) -> Result<PrimeList> {
    if n < 10 {
        return Err(Error::TooSmall { got: n, min: 10 });
    }
    let x_n = n / 6;
    let mut x5 = BitMap::new_all_set(x_n + 1)?;
    let mut x7 = BitMap::new_all_set(x_n + 1)?;
    let mut primes = PrimeList::with_capacity(prime_count_upper(n))?;
    primes.push(2);
    primes.push(3);

    let root = isqrt(n);
    for x in 1..=x_n {
        if x5.get(x) {
            let p = 6 * x - 1;
            primes.push(p);
            if p <= root {
                x5.clear_stride(p, p * x + x, x_n + 1);
                x7.clear_stride(p, p * x - x, x_n + 1);
            }
        }
        if x7.get(x) {
            let p = 6 * x + 1;
            primes.push(p);
            if p <= root {
                x7.clear_stride(p, p * x + x, x_n + 1);
                x5.clear_stride(p, p * x - x, x_n + 1);
            }
        }
    }
    if primes.last().is_some_and(|p| p > n) {
        primes.pop();
    }
    primes.trim();
    Ok(primes)
}

/// Enumerate every prime up to `n` with the segmented iZ sieve.
///
/// Delegates to `sieve_iz` below 1000, where segmentation has nothing to
/// amortize.
pub fn sieve_izm(n: u64) -> Result<PrimeList> {
    if n < 10 {
        return Err(Error::TooSmall { got: n, min: 10 });
    }
    if n < 1000 {
        return sieve_iz(n);
    }

    let x_n = n / 6;
    let vx = compute_limited_vx(x_n + 1, 6);
    let (base_x5, base_x7) = assets::build_base(vx)?;
    let smalls = assets::vx_factors(vx);

    let mut primes = PrimeList::with_capacity(prime_count_upper(n))?;
    primes.push(2);
    primes.push(3);
    for &p in &smalls {
        primes.push(p);
    }
    // Root primes for later slabs start after the small-prime prefix; the
    // base pattern already owns the prefix's composites.
    let root_start = primes.len();

    // Slab 0: the base pattern survivors are walked directly; each
    // discovered prime small enough to have composites inside the slab is
    // stride-cleared the same way the non-segmented sieve does it.
    let mut x5 = base_x5.clone();
    let mut x7 = base_x7.clone();
    let slab0_max = 6 * vx + 1;
    for x in 2..=vx {
        if x5.get(x) {
            let p = 6 * x - 1;
            if (p as u128) * (p as u128) <= slab0_max as u128 {
                x5.clear_stride(p, p * x + x, vx + 1);
                x7.clear_stride(p, p * x - x, vx + 1);
            }
            primes.push(p);
        }
        if x7.get(x) {
            let p = 6 * x + 1;
            if (p as u128) * (p as u128) <= slab0_max as u128 {
                x7.clear_stride(p, p * x + x, vx + 1);
                x5.clear_stride(p, p * x - x, vx + 1);
            }
            primes.push(p);
        }
    }

    let max_y = x_n / vx;
    debug!(n, vx, max_y, "segmented sieve running");
    for y in 1..=max_y {
        let limit = if y < max_y { vx } else { x_n % vx };
        if limit == 0 {
            break;
        }
        x5.copy_bits_from(0, &base_x5, 0, vx + 1);
        x7.copy_bits_from(0, &base_x7, 0, vx + 1);

        let max_value = 6u128 * (y * vx + limit) as u128 + 1;
        for idx in root_start..primes.len() {
            let p = primes[idx];
            if (p as u128) * (p as u128) > max_value {
                break;
            }
            x5.clear_stride(p, solve_for_x(Residue::Minus, p, vx, y), limit + 1);
            x7.clear_stride(p, solve_for_x(Residue::Plus, p, vx, y), limit + 1);
        }

        // Column 1 holds multiples of 5 and 7 in every slab past the
        // first, so collection starts at 2.
        for x in 2..=limit {
            let col = (y * vx + x) as u128;
            if x5.get(x) {
                let v = 6 * col - 1;
                if v <= n as u128 {
                    primes.push(v as u64);
                }
            }
            if x7.get(x) {
                let v = 6 * col + 1;
                if v <= n as u128 {
                    primes.push(v as u64);
                }
            }
        }
    }
    primes.trim();
    Ok(primes)
}
