//! # Assets — Pre-Sieved Base Segments and Root Primes
//!
//! A slab width `vx` is a primorial over the small primes starting at 5
//! (35, 385, 5005, … 1,616,615). Every composite of those primes occupies
//! the same columns in every slab, so their elimination pattern is computed
//! once per width and cloned into each slab's working bitmaps.
//!
//! ## Construction
//!
//! The builder seeds the canonical 35-pattern (the residue conditions of 5
//! and 7 hard-coded), then for each further factor `p`: tiles the current
//! prefix across `p` copies with `duplicate_segment`, and stride-clears the
//! two progressions of `p` located by `solve_for_x`. The pattern depends
//! only on `vx` — a `VxAssets` value is immutable after `build` and freely
//! shared read-only across any number of slab calls.
//!
//! Capacity is `vx + 1`: column `vx` is the slab's inclusive upper column
//! and aliases column 0 of the next period, which is coprime to every
//! factor of `vx` and therefore always set.

use tracing::debug;

use crate::bitmap::BitMap;
use crate::error::{Error, Result};
use crate::list::PrimeList;
use crate::residue::{solve_for_x, Residue};
use crate::sieve;

/// Factor candidates for slab widths, in the order the builder consumes
/// them. 35 = 5·7 is the hard-coded seed.
const FACTOR_CANDIDATES: [u64; 12] = [11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53];

/// The consecutive small primes dividing `vx`, starting at 5.
pub fn vx_factors(vx: u64) -> Vec<u64> {
    let mut factors = vec![5, 7];
    for &p in &FACTOR_CANDIDATES {
        if vx % p != 0 {
            break;
        }
        factors.push(p);
    }
    factors
}

/// Build the pre-sieved `(x5, x7)` pair for slab width `vx`.
///
/// Bits start set; a cleared bit at column `x` means `iz(x, class)` is
/// divisible by some prime dividing `vx`. Fails with `InvalidArgument`
/// when `vx` is not a primorial over consecutive primes from 5.
pub fn build_base(vx: u64) -> Result<(BitMap, BitMap)> {
    if vx < 35 || vx % 35 != 0 {
        return Err(Error::InvalidArgument(format!(
            "slab width {} is not a multiple of the 35 seed",
            vx
        )));
    }
    let mut x5 = BitMap::new_all_set(vx + 1)?;
    let mut x7 = BitMap::new_all_set(vx + 1)?;

    // Canonical 35-pattern: the residue conditions of 5 and 7.
    //   5 | 6x−1 ⇔ x ≡ 1 (mod 5)      7 | 6x−1 ⇔ x ≡ 6 (mod 7)
    //   5 | 6x+1 ⇔ x ≡ 4 (mod 5)      7 | 6x+1 ⇔ x ≡ 1 (mod 7)
    for x in 0..35u64.min(vx) {
        if x % 5 == 1 || x % 7 == 6 {
            x5.clear(x);
        }
        if x % 5 == 4 || x % 7 == 1 {
            x7.clear(x);
        }
    }

    let mut current = 35u64;
    for &p in &FACTOR_CANDIDATES {
        if current == vx {
            break;
        }
        if vx % p != 0 {
            break;
        }
        x5.duplicate_segment(0, current, p);
        x7.duplicate_segment(0, current, p);
        current *= p;
        // The stride through solve_for_x at slab 0 starts at p's own
        // column, so the x_p column itself is cleared along with the rest.
        x5.clear_stride(p, solve_for_x(Residue::Minus, p, current, 0), current);
        x7.clear_stride(p, solve_for_x(Residue::Plus, p, current, 0), current);
    }
    if current != vx {
        return Err(Error::InvalidArgument(format!(
            "slab width {} is not a primorial over consecutive primes from 5",
            vx
        )));
    }
    debug!(vx, survivors_x5 = x5.count_ones(), survivors_x7 = x7.count_ones(), "base segment built");
    Ok((x5, x7))
}

/// All primes up to `limit`, for marking composites inside slabs.
pub fn root_primes(limit: u64) -> Result<Vec<u64>> {
    let list: PrimeList = sieve::sieve_iz(limit)?;
    Ok(list.as_slice().to_vec())
}

/// Shared, immutable sieve assets for one slab width: the width itself,
/// every prime up to it, and the two pre-sieved base bitmaps.
pub struct VxAssets {
    pub vx: u64,
    pub root_primes: Vec<u64>,
    pub base_x5: BitMap,
    pub base_x7: BitMap,
}

impl VxAssets {
    /// Construct assets for `vx`. Meant to be built once per batch of slab
    /// calls and shared by reference, never rebuilt per slab.
    pub fn build(vx: u64) -> Result<VxAssets> {
        let (base_x5, base_x7) = build_base(vx)?;
        let root_primes = root_primes(vx)?;
        debug!(vx, root_primes = root_primes.len(), "slab assets ready");
        Ok(VxAssets {
            vx,
            root_primes,
            base_x5,
            base_x7,
        })
    }

    /// The consecutive small primes dividing this width.
    pub fn factors(&self) -> Vec<u64> {
        vx_factors(self.vx)
    }
}
