//! # Search — Random Probable Primes and Next-Prime Walks
//!
//! Three ways to find a prime without enumerating everything below it, all
//! riding on the same residue algebra as the sieves:
//!
//! 1. **Vertical search** (`search_iz_prime`) — pick a random column of
//!    the iZ matrix whose entries are coprime to the width `vx`, then walk
//!    the column upward in steps of its common difference `6·vx`. Every
//!    candidate is automatically filtered by every prime dividing `vx`;
//!    only survivors pay for a Miller–Rabin test.
//! 2. **Worker race** (`random_iz_prime`) — independent workers run the
//!    vertical search with their own OS-seeded RNGs; the first candidate
//!    over the channel wins and the rest are cancelled. No merging, no
//!    voting. Which worker wins is scheduling- and seed-dependent, so the
//!    result is a fresh random prime, not a function of the inputs.
//! 3. **Adjacent walk** (`iz_next_prime`) — the nearest probable prime
//!    strictly above or below a base, walking iZ columns against the
//!    5005-wide base pattern so most composites never reach the
//!    primality test.
//!
//! Cancellation is cooperative: workers check a shared stop flag before
//! every primality test, so a loser dies within one test of the winner
//! being parsed and can never corrupt the coordinator's buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::thread;

use rand::rngs::OsRng;
use rand::RngCore;
use rug::integer::{IsPrime, Order};
use rug::rand::RandState;
use rug::Integer;
use tracing::{debug, info};

use crate::assets;
use crate::bitmap::BitMap;
use crate::error::{Error, Result};
use crate::residue::{compute_max_vx, Residue};
use crate::{
    MAX_WORKERS, MIN_PRIME_BITS, NEXT_PRIME_SEGMENT_CAP, NEXT_PRIME_VX, SEARCH_ATTEMPT_CAP,
    TEST_ROUNDS,
};

/// A fresh GMP RNG seeded with 32 bytes of OS entropy.
pub fn os_seeded_rng() -> RandState<'static> {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let seed = Integer::from_digits(&bytes, Order::Lsf);
    let mut rng = RandState::new();
    rng.seed(&seed);
    rng
}

#[inline]
fn probable(n: &Integer) -> bool {
    n.is_probably_prime(TEST_ROUNDS) != IsPrime::No
}

/// The 5005-wide base pattern of the next-prime walk, built once per
/// process and shared read-only, as the slab path shares its assets.
fn next_prime_pattern() -> &'static (BitMap, BitMap) {
    static PATTERN: OnceLock<(BitMap, BitMap)> = OnceLock::new();
    PATTERN.get_or_init(|| {
        assets::build_base(NEXT_PRIME_VX).expect("the fixed walk width is a valid primorial")
    })
}

/// One probable prime on residue class `r` with bit size roughly
/// `bitlen(vx)`.
///
/// Draws `x₀` below `vx`, slides to a column coprime to `vx`, then climbs
/// the column in steps of its common difference `6·vx`. Each step
/// preserves both the residue class and coprimality with every prime
/// dividing `vx`, so candidates arrive pre-filtered by all of them. The
/// 1,000,000-attempt cap is a hard bound.
pub fn search_iz_prime(r: Residue, vx: &Integer, rng: &mut RandState) -> Result<Integer> {
    let run_forever = AtomicBool::new(false);
    search_with_stop(r, vx, rng, &run_forever)
}

fn search_with_stop(
    r: Residue,
    vx: &Integer,
    rng: &mut RandState,
    stop: &AtomicBool,
) -> Result<Integer> {
    let x0 = vx.clone().random_below(rng);
    let mut c = x0 * 6u32 + r.offset();
    while Integer::from(c.gcd_ref(vx)) != 1 {
        c += 6u32;
    }
    let step = Integer::from(vx * 6u32);
    for _ in 0..SEARCH_ATTEMPT_CAP {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        c += &step;
        if probable(&c) {
            return Ok(c);
        }
    }
    Err(Error::NotFound(SEARCH_ATTEMPT_CAP))
}

/// A random probable prime of roughly `bit_size` bits on class `r`,
/// raced across `workers` threads (clamped to `[1, 16]`).
///
/// First writer wins; losers are cancelled and joined before returning.
pub fn random_iz_prime(r: Residue, bit_size: u32, workers: u32) -> Result<Integer> {
    if u64::from(bit_size) < u64::from(MIN_PRIME_BITS) {
        return Err(Error::TooSmall {
            got: u64::from(bit_size),
            min: u64::from(MIN_PRIME_BITS),
        });
    }
    let workers = workers.clamp(1, MAX_WORKERS);
    let vx = compute_max_vx(bit_size);

    if workers <= 1 {
        let mut rng = os_seeded_rng();
        return search_iz_prime(r, &vx, &mut rng);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<String>();
    let mut handles = Vec::with_capacity(workers as usize);
    for id in 0..workers {
        let vx = vx.clone();
        let stop = Arc::clone(&stop);
        let tx = tx.clone();
        handles.push(thread::spawn(move || {
            let mut rng = os_seeded_rng();
            match search_with_stop(r, &vx, &mut rng, &stop) {
                // The candidate crosses the channel as its decimal text.
                Ok(p) => {
                    debug!(worker = id, "candidate found");
                    let _ = tx.send(p.to_string_radix(10));
                }
                Err(_) => debug!(worker = id, "worker exited without a candidate"),
            }
        }));
    }
    drop(tx);

    let first = rx.recv();
    stop.store(true, Ordering::Relaxed);
    for h in handles {
        let _ = h.join();
    }

    match first {
        Ok(text) => {
            info!(bits = bit_size, workers, "random prime race decided");
            text.parse::<Integer>()
                .map_err(|_| Error::InvalidArgument("worker sent a non-decimal candidate".into()))
        }
        Err(_) => Err(Error::NotFound(SEARCH_ATTEMPT_CAP)),
    }
}

/// The nearest probable prime strictly above (`forward`) or strictly
/// below (`!forward`) `base`.
///
/// Fast paths test the iZ partner two away and, at multiples of 6, the
/// immediate neighbour. The remaining candidates are walked column by
/// column against the 5005-wide base pattern, `x5` before `x7` ascending
/// and mirrored descending, capped at 1000 segments (≈30 million naturals).
pub fn iz_next_prime(base: &Integer, forward: bool) -> Result<Integer> {
    // The 5005-pattern clears the columns of its own factors 5, 7, 11, 13,
    // so walks starting this low would skip real primes. Scan directly.
    if forward && *base < 13u32 {
        return scan_up(base);
    }
    if !forward && *base <= 17u32 {
        return scan_down(base);
    }

    let (m, rem) = base.clone().div_rem_euc(Integer::from(6u32));
    let rem = rem.to_u32().expect("remainder below 6");

    if forward {
        if rem == 5 {
            let cand = Integer::from(base + 2u32);
            if probable(&cand) {
                return Ok(cand);
            }
        } else if rem == 0 {
            let cand = Integer::from(base + 1u32);
            if probable(&cand) {
                return Ok(cand);
            }
        }
    } else if rem == 1 {
        let cand = Integer::from(base - 2u32);
        if probable(&cand) {
            return Ok(cand);
        }
    } else if rem == 0 {
        let cand = Integer::from(base - 1u32);
        if probable(&cand) {
            return Ok(cand);
        }
    }

    let vx = NEXT_PRIME_VX;
    let (base_x5, base_x7) = next_prime_pattern();

    // First column whose candidates are strictly past the fast paths.
    let mut g: Integer = if forward {
        if rem == 5 {
            m + 2u32
        } else {
            m + 1u32
        }
    } else if rem <= 1 {
        m - 1u32
    } else {
        m
    };
    let mut pos = Integer::from(&g % vx).to_u64().expect("pattern position fits u64");

    let budget = u64::from(NEXT_PRIME_SEGMENT_CAP) * vx;
    for _ in 0..budget {
        if forward {
            if base_x5.get(pos) {
                let cand = Integer::from(&g * 6u32) - 1u32;
                if probable(&cand) {
                    return Ok(cand);
                }
            }
            if base_x7.get(pos) {
                let cand = Integer::from(&g * 6u32) + 1u32;
                if probable(&cand) {
                    return Ok(cand);
                }
            }
            g += 1u32;
            pos += 1;
            if pos == vx {
                pos = 0;
            }
        } else {
            if base_x7.get(pos) {
                let cand = Integer::from(&g * 6u32) + 1u32;
                if probable(&cand) {
                    return Ok(cand);
                }
            }
            if base_x5.get(pos) {
                let cand = Integer::from(&g * 6u32) - 1u32;
                if probable(&cand) {
                    return Ok(cand);
                }
            }
            g -= 1u32;
            if g == 0 {
                break;
            }
            pos = if pos == 0 { vx - 1 } else { pos - 1 };
        }
    }
    Err(Error::NotFound(budget))
}

/// A probable prime adjacent to a uniformly random `bit_size`-bit integer.
pub fn iz_random_next_prime(bit_size: u32) -> Result<Integer> {
    if bit_size < 2 {
        return Err(Error::TooSmall {
            got: u64::from(bit_size),
            min: 2,
        });
    }
    let mut rng = os_seeded_rng();
    let mut draw = Integer::from(Integer::random_bits(bit_size - 1, &mut rng));
    draw.set_bit(bit_size - 1, true);
    iz_next_prime(&draw, true)
}

/// Direct ascending scan for bases too small for the pattern walk.
fn scan_up(base: &Integer) -> Result<Integer> {
    let mut c = Integer::from(base + 1u32);
    if c < 2u32 {
        c = Integer::from(2u32);
    }
    loop {
        if probable(&c) {
            return Ok(c);
        }
        c += 1u32;
    }
}

/// Direct descending scan; `NotFound` when nothing below the base is prime.
fn scan_down(base: &Integer) -> Result<Integer> {
    let mut c = Integer::from(base - 1u32);
    while c >= 2u32 {
        if probable(&c) {
            return Ok(c);
        }
        c -= 1u32;
    }
    Err(Error::NotFound(0))
}
