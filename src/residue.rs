//! # Residue — The iZ Decomposition and Its Algebra
//!
//! Every prime above 3 has the form `6x − 1` or `6x + 1`. This module owns
//! that decomposition: the map `iz(x, r) = 6x + r` with `r ∈ {−1, +1}`, the
//! two solve operations that locate a prime's composites inside a slab of
//! the iZ matrix, the modular inverse they rest on, and the selection of
//! slab widths `vx` (primorials over the small primes starting at 5).
//!
//! ## The iZ matrix
//!
//! Fix a slab width `vx`. Writing a column index as `x + y·vx` arranges the
//! iZ set into rows of width `vx`; each column is an arithmetic progression
//! with common difference `6·vx`. For a prime `p` the columns holding its
//! multiples recur with period `p`, so one division per slab
//! (`solve_for_x`) positions a whole stride of composites.
//!
//! ## Gap constants
//!
//! For all `x ≥ 1`: `iz(x+1, −) − iz(x, +) = 4` and `iz(x, +) − iz(x, −) = 2`.
//! The slab kernel walks columns linearly and accumulates prime gaps from
//! those two constants alone.

use rug::Integer;

use crate::error::{Error, Result};

/// The two residue classes of the iZ set: `iZ−` holds `6x − 1`, `iZ+`
/// holds `6x + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residue {
    Minus,
    Plus,
}

impl Residue {
    /// The additive offset of this class: −1 or +1.
    #[inline]
    pub fn offset(self) -> i64 {
        match self {
            Residue::Minus => -1,
            Residue::Plus => 1,
        }
    }

    /// The other class.
    #[inline]
    pub fn flip(self) -> Residue {
        match self {
            Residue::Minus => Residue::Plus,
            Residue::Plus => Residue::Minus,
        }
    }

    /// The class containing prime `p ≥ 5`.
    ///
    /// # Panics
    /// Panics if `p mod 6 ∉ {1, 5}` — such a `p` is not in the iZ set and
    /// passing one is a programming error.
    #[inline]
    pub fn of_prime(p: u64) -> Residue {
        match p % 6 {
            5 => Residue::Minus,
            1 => Residue::Plus,
            _ => panic!("{} is not an iZ number", p),
        }
    }

    /// Decompose `n ≥ 5` into `(x, class)` with `n = iz(x, class)`, or
    /// `None` when `n` is outside the iZ set.
    pub fn classify(n: u64) -> Option<(u64, Residue)> {
        if n < 5 {
            return None;
        }
        match n % 6 {
            5 => Some(((n + 1) / 6, Residue::Minus)),
            1 => Some(((n - 1) / 6, Residue::Plus)),
            _ => None,
        }
    }
}

/// `iz(x, r) = 6x + r`.
///
/// # Panics
/// Panics when `x = 0` or `6x` overflows — both are precondition
/// violations, not runtime conditions.
#[inline]
pub fn iz(x: u64, r: Residue) -> u64 {
    assert!(x >= 1, "iZ column index must be positive");
    let six_x = x.checked_mul(6).expect("6x exceeds u64");
    match r {
        Residue::Minus => six_x - 1,
        Residue::Plus => six_x.checked_add(1).expect("6x + 1 exceeds u64"),
    }
}

/// `iz` on unbounded integers.
#[inline]
pub fn iz_big(x: &Integer, r: Residue) -> Integer {
    assert!(*x >= 1, "iZ column index must be positive");
    Integer::from(x * 6u32) + r.offset()
}

/// Primes used to extend slab widths past the seed `35 = 5·7`.
const VX_EXTENSIONS: [u64; 12] = [11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53];

/// Pick a slab width for sieving up to column `x_n`: starting from 35,
/// multiply in the next primes 11, 13, 17, … while the product stays at or
/// below `x_n / 2` and at most `k − 2` extra primes are consumed.
pub fn compute_limited_vx(x_n: u64, k: u32) -> u64 {
    let mut vx = 35u64;
    let mut used = 0u32;
    for &p in &VX_EXTENSIONS {
        if used + 2 >= k {
            break;
        }
        match vx.checked_mul(p) {
            Some(next) if next <= x_n / 2 => {
                vx = next;
                used += 1;
            }
            _ => break,
        }
    }
    vx
}

/// The largest primorial `5·7·11·…·p` whose bit length does not exceed
/// `bit_size`. Drives the width of the random-prime candidate columns.
pub fn compute_max_vx(bit_size: u32) -> Integer {
    assert!(bit_size >= 3, "no primorial fits in under 3 bits");
    let mut vx = Integer::from(5u32);
    let mut p = Integer::from(7u32);
    loop {
        let next = Integer::from(&vx * &p);
        if next.significant_bits() > bit_size {
            break;
        }
        vx = next;
        p = p.next_prime();
    }
    vx
}

/// The column of `p` inside its own period, adjusted for the target class:
/// `x_p = (p + 1)/6` when `r` is `p`'s class, `p − x_p` otherwise.
#[inline]
fn normalized_column(r: Residue, p: u64) -> u64 {
    let x_p = (p + 1) / 6;
    if r == Residue::of_prime(p) {
        x_p
    } else {
        p - x_p
    }
}

/// Shared tail of the two solve-for-x variants: `p − ((yvx − x_p) mod p)`,
/// taking the already-reduced `y·vx mod p`.
#[inline]
fn solve_from_residue(p: u64, x_p: u64, yvx_mod: u64) -> u64 {
    debug_assert!(yvx_mod < p);
    p - (yvx_mod + p - x_p) % p
}

/// Smallest `x ∈ [1, p]` such that `p` divides `iz(y·vx + x, r)`.
pub fn solve_for_x(r: Residue, p: u64, vx: u64, y: u64) -> u64 {
    let x_p = normalized_column(r, p);
    let yvx_mod = ((y as u128 * vx as u128) % p as u128) as u64;
    solve_from_residue(p, x_p, yvx_mod)
}

/// `solve_for_x` for slab indices beyond u64.
pub fn solve_for_x_big(r: Residue, p: u64, vx: u64, y: &Integer) -> u64 {
    assert!(*y >= 0, "slab index must be non-negative");
    let x_p = normalized_column(r, p);
    let yvx_mod = (Integer::from(y * vx) % Integer::from(p))
        .to_u64()
        .expect("residue below a u64 modulus fits u64");
    solve_from_residue(p, x_p, yvx_mod)
}

/// Smallest `y ∈ [0, p)` such that column `x` of slab `y` holds a multiple
/// of `p`: `((x_p − x) mod p) · vx⁻¹ mod p`. Fails when `p | vx` — those
/// columns never hold a multiple of `p` at all.
pub fn solve_for_y(r: Residue, p: u64, vx: u64, x: u64) -> Result<u64> {
    if vx % p == 0 {
        return Err(Error::NotCoprime {
            a: vx.to_string(),
            m: p.to_string(),
        });
    }
    let x_p = normalized_column(r, p);
    let diff = (x_p as i128 - x as i128).rem_euclid(p as i128) as u64;
    let inv = mod_inverse(vx % p, p)?;
    Ok(((diff as u128 * inv as u128) % p as u128) as u64)
}

/// Modular inverse of `a` modulo `m` by the extended Euclidean algorithm.
pub fn mod_inverse(a: u64, m: u64) -> Result<u64> {
    assert!(m > 1, "modulus must exceed 1");
    let (mut r0, mut r1) = (m as i128, (a % m) as i128);
    let (mut t0, mut t1) = (0i128, 1i128);
    while r1 != 0 {
        let q = r0 / r1;
        (r0, r1) = (r1, r0 - q * r1);
        (t0, t1) = (t1, t0 - q * t1);
    }
    if r0 != 1 {
        return Err(Error::NotCoprime {
            a: a.to_string(),
            m: m.to_string(),
        });
    }
    Ok(t0.rem_euclid(m as i128) as u64)
}

/// Modular inverse on unbounded integers.
pub fn mod_inverse_big(a: &Integer, m: &Integer) -> Result<Integer> {
    a.clone().invert(m).map_err(|_| Error::NotCoprime {
        a: a.to_string(),
        m: m.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rug::ops::Pow;

    #[test]
    fn iz_values() {
        assert_eq!(iz(1, Residue::Minus), 5);
        assert_eq!(iz(1, Residue::Plus), 7);
        assert_eq!(iz(4, Residue::Minus), 23);
        assert_eq!(iz(4, Residue::Plus), 25);
        let big_x = Integer::from(10u32).pow(30);
        assert_eq!(
            iz_big(&big_x, Residue::Plus),
            Integer::from(6u32) * &big_x + 1u32
        );
    }

    /// The two gap constants the slab kernel's emission walk relies on.
    #[test]
    fn gap_constants() {
        for x in 1u64..1000 {
            assert_eq!(iz(x + 1, Residue::Minus) - iz(x, Residue::Plus), 4);
            assert_eq!(iz(x, Residue::Plus) - iz(x, Residue::Minus), 2);
        }
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn iz_rejects_zero_column() {
        iz(0, Residue::Plus);
    }

    #[test]
    fn classify_round_trips() {
        for n in 5u64..10_000 {
            match Residue::classify(n) {
                Some((x, r)) => {
                    assert_eq!(iz(x, r), n);
                    assert!(n % 6 == 1 || n % 6 == 5);
                }
                None => assert!(n % 6 != 1 && n % 6 != 5),
            }
        }
        assert_eq!(Residue::classify(4), None);
        assert_eq!(Residue::classify(5), Some((1, Residue::Minus)));
        assert_eq!(Residue::classify(7), Some((1, Residue::Plus)));
    }

    #[test]
    fn of_prime_and_flip() {
        assert_eq!(Residue::of_prime(5), Residue::Minus);
        assert_eq!(Residue::of_prime(7), Residue::Plus);
        assert_eq!(Residue::of_prime(13), Residue::Plus);
        assert_eq!(Residue::Minus.flip(), Residue::Plus);
        assert_eq!(Residue::Minus.offset(), -1);
        assert_eq!(Residue::Plus.offset(), 1);
    }

    // ── vx selection ────────────────────────────────────────────────

    #[test]
    fn limited_vx_known_widths() {
        // Sieving a million: 35·11·13 = 5005 fits under x_n/2, 17 does not.
        assert_eq!(compute_limited_vx(166_667, 6), 5005);
        // Huge bound: capped by the k−2 = 4 extension primes at VX6.
        assert_eq!(compute_limited_vx(u64::MAX / 8, 6), 1_616_615);
        // Tiny bound: stays at the 35 seed.
        assert_eq!(compute_limited_vx(200, 6), 35);
    }

    #[test]
    fn limited_vx_respects_extension_budget() {
        // k = 3 allows a single extension prime.
        assert_eq!(compute_limited_vx(u64::MAX / 8, 3), 385);
        assert_eq!(compute_limited_vx(u64::MAX / 8, 2), 35);
    }

    #[test]
    fn max_vx_bit_budget() {
        assert_eq!(compute_max_vx(13), Integer::from(5005u32));
        assert_eq!(compute_max_vx(12), Integer::from(385u32));
        let vx = compute_max_vx(1024);
        assert!(vx.significant_bits() <= 1024);
        // Multiplying in the next prime past the last factor must overflow
        // the budget; find it by dividing out and re-extending.
        let mut p = Integer::from(5u32);
        let mut prod = Integer::from(1u32);
        while prod < vx {
            prod *= &p;
            p = p.clone().next_prime();
        }
        assert_eq!(prod, vx, "max vx must be a primorial over 5, 7, 11, …");
        assert!((vx * p).significant_bits() > 1024);
    }

    // ── solve_for_x / solve_for_y ───────────────────────────────────

    #[test]
    fn solve_for_x_small_cases() {
        // p = 5 in its own class at slab 0 is its own column.
        assert_eq!(solve_for_x(Residue::Minus, 5, 1001, 0), 1);
        // 25 = iz(4, +).
        assert_eq!(solve_for_x(Residue::Plus, 5, 1001, 0), 4);
        // Slab 1 of width 1001: 6·(1001 + 5) − 1 = 6035 = 5 · 1207.
        assert_eq!(solve_for_x(Residue::Minus, 5, 1001, 1), 5);
    }

    /// The defining property: the returned column holds a multiple of `p`,
    /// and no earlier column in the slab period does.
    #[test]
    fn solve_for_x_locates_multiples() {
        let vxs = [35u64, 385, 5005, 1001];
        let primes = [11u64, 13, 17, 19, 23, 29, 31, 37, 101, 103];
        for &vx in &vxs {
            for &p in &primes {
                if vx % p == 0 {
                    continue;
                }
                for y in [0u64, 1, 2, 17, 1000] {
                    for r in [Residue::Minus, Residue::Plus] {
                        let x = solve_for_x(r, p, vx, y);
                        assert!((1..=p).contains(&x));
                        let v = iz(y * vx + x, r);
                        assert_eq!(v % p, 0, "p={} vx={} y={} r={:?}", p, vx, y, r);
                    }
                }
            }
        }
    }

    #[test]
    fn solve_for_x_big_matches_small() {
        for &p in &[11u64, 13, 29, 1009] {
            for y in [0u64, 1, 99, 123_456] {
                for r in [Residue::Minus, Residue::Plus] {
                    assert_eq!(
                        solve_for_x_big(r, p, 5005, &Integer::from(y)),
                        solve_for_x(r, p, 5005, y)
                    );
                }
            }
        }
    }

    #[test]
    fn solve_for_y_inverts_solve_for_x() {
        for &p in &[11u64, 13, 17, 19, 23, 101] {
            for y in 0..p {
                for r in [Residue::Minus, Residue::Plus] {
                    let x = solve_for_x(r, p, 5005, y);
                    let back = solve_for_y(r, p, 5005, x).unwrap();
                    assert_eq!(back, y % p, "p={} y={} r={:?}", p, y, r);
                }
            }
        }
    }

    #[test]
    fn solve_for_y_rejects_dividing_prime() {
        assert!(matches!(
            solve_for_y(Residue::Minus, 11, 5005, 3),
            Err(Error::NotCoprime { .. })
        ));
    }

    // ── modular inverse ─────────────────────────────────────────────

    #[test]
    fn mod_inverse_law() {
        for m in [7u64, 97, 1_000_003, 65_537] {
            for a in [1u64, 2, 3, 50, 12345] {
                let inv = mod_inverse(a, m).unwrap();
                assert_eq!((a as u128 * inv as u128) % m as u128, 1);
                assert!(inv < m);
            }
        }
    }

    #[test]
    fn mod_inverse_not_coprime() {
        assert!(mod_inverse(6, 9).is_err());
        assert!(mod_inverse(0, 7).is_err());
        assert!(mod_inverse(14, 7).is_err());
    }

    #[test]
    fn mod_inverse_big_matches_small() {
        for (a, m) in [(3u64, 7u64), (12345, 65_537), (2, 1_000_003)] {
            let big = mod_inverse_big(&Integer::from(a), &Integer::from(m)).unwrap();
            assert_eq!(big, mod_inverse(a, m).unwrap());
        }
        assert!(mod_inverse_big(&Integer::from(6u32), &Integer::from(9u32)).is_err());
    }
}
