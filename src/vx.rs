//! # Vx — Slab Kernel Emitting Prime Gaps
//!
//! `sieve_vx` processes one `vx`-wide slab of the iZ matrix at an
//! arbitrary — possibly cryptographic-scale — slab index `y`, emitting the
//! gaps between consecutive primes instead of the primes themselves. At
//! large `y` a prime needs hundreds of bytes; its gap fits in 16 bits, an
//! order of magnitude of compression for free.
//!
//! ## Two regimes
//!
//! `root_limit = ⌊√iz((y+1)·vx, +)⌋` decides the slab's regime. While
//! `root_limit ≤ vx` the shared root primes cover every composite and the
//! sieve alone certifies primality. Past that (**large mode**) the sieve
//! only filters, and each surviving candidate is confirmed by a 25-round
//! Miller–Rabin test.
//!
//! ## Emission
//!
//! The walk exploits the two iZ gap constants: stepping from column `x` of
//! `x7` to column `x+1` of `x5` adds 4; crossing from `x5` to `x7` in the
//! same column adds 2. A running counter accumulates those increments and
//! is flushed as one gap per surviving prime, so no division or big-int
//! arithmetic happens on the hot path in small mode.

use rug::integer::IsPrime;
use rug::Integer;
use tracing::debug;

use crate::assets::VxAssets;
use crate::error::{Error, Result};
use crate::residue::{iz, iz_big, solve_for_x_big, Residue};
use crate::TEST_ROUNDS;

/// Gap list produced by one slab: the slab index `y` (owned, validated
/// decimal), the slab width, the 16-bit gaps, and two observational
/// counters.
pub struct VxResult {
    y: String,
    vx: u64,
    gaps: Vec<u16>,
    bit_ops: u64,
    test_ops: u64,
}

impl VxResult {
    /// Create an empty gap list for slab `y` of width `vx`. Takes
    /// ownership of the index string; rejects anything but ASCII decimal.
    pub fn new(y: String, vx: u64) -> Result<VxResult> {
        if y.is_empty() || !y.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidArgument(format!(
                "slab index {:?} is not a decimal string",
                y
            )));
        }
        let mut gaps = Vec::new();
        // Survivor density of the default width is a little under one in
        // eight columns per class.
        gaps.try_reserve(vx as usize / 4)
            .map_err(|_| Error::AllocationFailed(vx as usize / 2))?;
        Ok(VxResult {
            y,
            vx,
            gaps,
            bit_ops: 0,
            test_ops: 0,
        })
    }

    /// Rebuild from persisted parts (the file read path).
    pub(crate) fn from_parts(y: String, vx: u64, gaps: Vec<u16>) -> VxResult {
        VxResult {
            y,
            vx,
            gaps,
            bit_ops: 0,
            test_ops: 0,
        }
    }

    pub fn y(&self) -> &str {
        &self.y
    }

    /// The slab index as an integer.
    pub fn y_index(&self) -> Integer {
        self.y.parse().expect("validated at construction")
    }

    pub fn vx(&self) -> u64 {
        self.vx
    }

    pub fn gaps(&self) -> &[u16] {
        &self.gaps
    }

    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Bit-clear operations spent by the deterministic sieve.
    pub fn bit_ops(&self) -> u64 {
        self.bit_ops
    }

    /// Probabilistic primality tests run (large mode only).
    pub fn test_ops(&self) -> u64 {
        self.test_ops
    }

    /// The walk origin `iz(y·vx, +1)` — the value `6·y·vx + 1`.
    pub fn base(&self) -> Integer {
        Integer::from(self.y_index() * self.vx) * 6u32 + 1u32
    }

    /// Append one gap. A slab gap that does not fit 16 bits violates the
    /// container invariant and is reported, never truncated.
    pub fn push_gap(&mut self, gap: u32) -> Result<()> {
        let gap = u16::try_from(gap)
            .map_err(|_| Error::InvalidArgument(format!("gap {} exceeds 16 bits", gap)))?;
        self.gaps.push(gap);
        Ok(())
    }

    /// Shrink backing storage to exact length.
    pub fn trim(&mut self) {
        self.gaps.shrink_to_fit();
    }

    /// Materialise the primes: the base plus each prefix sum of the gaps.
    pub fn primes(&self) -> Vec<Integer> {
        let mut cur = self.base();
        let mut out = Vec::with_capacity(self.gaps.len());
        for &g in &self.gaps {
            cur += u32::from(g);
            out.push(cur.clone());
        }
        out
    }

    /// 32-byte SHA-256 over the gap bytes in host order — the integrity
    /// trailer of the persisted form.
    pub fn content_hash(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        for &g in &self.gaps {
            hasher.update(g.to_ne_bytes());
        }
        hasher.finalize().into()
    }
}

/// Sieve one slab, appending its prime gaps to `out`.
///
/// `out` carries the slab index and width; `assets` supply the root primes
/// and pre-sieved base pattern for the same width, shared read-only across
/// any number of calls.
pub fn sieve_vx(out: &mut VxResult, assets: &VxAssets) -> Result<()> {
    if out.vx != assets.vx {
        return Err(Error::InvalidArgument(format!(
            "gap list width {} does not match asset width {}",
            out.vx, assets.vx
        )));
    }
    let vx = assets.vx;
    let y = out.y_index();
    let y_is_zero = y == 0;

    let mut x5 = assets.base_x5.clone();
    let mut x7 = assets.base_x7.clone();

    let yvx = Integer::from(&y * vx);
    let root_limit = iz_big(&Integer::from(&yvx + vx), Residue::Plus).sqrt();
    let large_mode = root_limit > vx;
    debug!(y = %out.y, vx, large_mode, "slab sieve starting");

    // Deterministic pass: every root prime past 2 and 3 that does not
    // divide the width marks its two progressions. In small mode primes
    // past the root limit have no composites inside the slab.
    let root_cap = if large_mode {
        u64::MAX
    } else {
        root_limit.to_u64().expect("root limit fits u64 in small mode")
    };
    for &p in &assets.root_primes[2..] {
        if vx % p == 0 {
            continue;
        }
        if p > root_cap {
            break;
        }
        for (r, map) in [(Residue::Minus, &mut x5), (Residue::Plus, &mut x7)] {
            let mut x0 = solve_for_x_big(r, p, vx, &y);
            // Slab 0 contains p itself; start one period past it.
            if y_is_zero && iz(x0, r) == p {
                x0 += p;
            }
            map.clear_stride(p, x0, vx + 1);
        }
        out.bit_ops += 2 * vx / p;
    }

    // Slab 0 also contains the width's own factors as primes; their
    // columns are cleared in the base pattern, so restore them.
    if y_is_zero {
        for &p in &assets.factors() {
            let (x_p, r) = crate::residue::Residue::classify(p).expect("factors are iZ numbers");
            match r {
                Residue::Minus => x5.set(x_p),
                Residue::Plus => x7.set(x_p),
            }
        }
    }

    // Emission: accumulate the 4/2 gap constants, flush per surviving
    // prime.
    let mut gap: u32 = 0;
    for x in 1..=vx {
        gap += 4;
        if x5.get(x) && certify(out, large_mode, &yvx, x, Residue::Minus) {
            out.push_gap(gap)?;
            gap = 0;
        }
        gap += 2;
        if x7.get(x) && certify(out, large_mode, &yvx, x, Residue::Plus) {
            out.push_gap(gap)?;
            gap = 0;
        }
    }
    out.trim();
    Ok(())
}

/// In small mode a surviving column is a certified prime; in large mode it
/// is only a candidate until Miller–Rabin agrees.
#[inline]
fn certify(out: &mut VxResult, large_mode: bool, yvx: &Integer, x: u64, r: Residue) -> bool {
    if !large_mode {
        return true;
    }
    let candidate = iz_big(&Integer::from(yvx + x), r);
    out.test_ops += 1;
    candidate.is_probably_prime(TEST_ROUNDS) != IsPrime::No
}

/// Drive `count` consecutive slabs from `start_y`, building the shared
/// assets once and reusing them throughout.
pub fn sieve_vx_range(start_y: u64, count: u64, vx: u64) -> Result<Vec<VxResult>> {
    let assets = VxAssets::build(vx)?;
    let mut results = Vec::with_capacity(count as usize);
    for y in start_y..start_y + count {
        let mut slab = VxResult::new(y.to_string(), vx)?;
        sieve_vx(&mut slab, &assets)?;
        results.push(slab);
    }
    Ok(results)
}
