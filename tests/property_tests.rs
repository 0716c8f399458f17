//! Property-based tests for izprime's mathematical primitives.
//!
//! These tests use the `proptest` framework to verify invariants across
//! thousands of randomly generated inputs. Unlike example-based tests that
//! check specific known values, property tests express universal truths
//! that must hold for all valid inputs, making them excellent at finding
//! edge cases.
//!
//! # How to run
//!
//! ```bash
//! # Run all property tests:
//! cargo test --test property_tests
//!
//! # Increase case count for thorough testing (default is 256):
//! PROPTEST_CASES=10000 cargo test --test property_tests
//! ```
//!
//! # Testing strategy
//!
//! Properties are organized by module:
//! - **Residue algebra**: the iz/classify round trip, solve_for_x hitting
//!   multiples, solve_for_y inverting solve_for_x, modular inverse law
//! - **BitMap**: stride-clear equivalence with the naive loop, segment
//!   tiling, byte round trip
//! - **Sieves**: segmented/non-segmented hash agreement, last-prime bound
//! - **Slab kernel**: the gap walk yielding increasing probable primes
//!
//! Each property is named `prop_<subject>_<invariant>` for clarity.

use proptest::prelude::*;
use rug::integer::IsPrime;
use rug::Integer;

use izprime::bitmap::BitMap;
use izprime::residue::{self, Residue};
use izprime::sieve::{sieve_iz, sieve_izm};
use izprime::vx::sieve_vx_range;

/// Strategy: a residue class.
fn any_residue() -> impl Strategy<Value = Residue> {
    prop_oneof![Just(Residue::Minus), Just(Residue::Plus)]
}

/// Strategy: a root prime not dividing 5005, drawn from a fixed pool.
fn any_root_prime() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(17u64),
        Just(19),
        Just(23),
        Just(29),
        Just(31),
        Just(101),
        Just(1009),
        Just(65_537),
    ]
}

proptest! {
    /// iz and classify are inverse: decomposing any iZ number and
    /// recomposing it is the identity.
    #[test]
    fn prop_iz_classify_round_trip(x in 1u64..1_000_000_000, r in any_residue()) {
        let n = residue::iz(x, r);
        prop_assert_eq!(Residue::classify(n), Some((x, r)));
    }

    /// The column returned by solve_for_x always holds a multiple of p,
    /// lies in [1, p], and no earlier column of the same slab period does.
    #[test]
    fn prop_solve_for_x_hits_first_multiple(
        p in any_root_prime(),
        y in 0u64..1_000_000,
        r in any_residue(),
    ) {
        let vx = 5005u64;
        let x = residue::solve_for_x(r, p, vx, y);
        prop_assert!(x >= 1 && x <= p);
        prop_assert_eq!(residue::iz(y * vx + x, r) % p, 0);
        for earlier in (x.saturating_sub(8).max(1))..x {
            prop_assert_ne!(residue::iz(y * vx + earlier, r) % p, 0);
        }
    }

    /// solve_for_y inverts solve_for_x modulo p.
    #[test]
    fn prop_solve_for_y_inverts(
        p in any_root_prime(),
        y in 0u64..100_000,
        r in any_residue(),
    ) {
        let vx = 5005u64;
        let x = residue::solve_for_x(r, p, vx, y);
        prop_assert_eq!(residue::solve_for_y(r, p, vx, x).unwrap(), y % p);
    }

    /// a · a⁻¹ ≡ 1 (mod m) whenever the inverse exists, and the inverse
    /// exists exactly when gcd(a, m) = 1.
    #[test]
    fn prop_mod_inverse_law(a in 1u64..1_000_000, m in 2u64..1_000_000) {
        let gcd = Integer::from(a).gcd(&Integer::from(m));
        match residue::mod_inverse(a, m) {
            Ok(inv) => {
                prop_assert_eq!(&gcd, &Integer::from(1u32));
                prop_assert!(inv < m);
                prop_assert_eq!((a as u128 * inv as u128) % m as u128, 1);
            }
            Err(_) => prop_assert!(gcd > 1u32),
        }
    }

    /// The big-integer solver agrees with the u64 solver wherever both
    /// apply.
    #[test]
    fn prop_solve_for_x_big_matches(
        p in any_root_prime(),
        y in 0u64..u32::MAX as u64,
        r in any_residue(),
    ) {
        let vx = 1_616_615u64;
        prop_assert_eq!(
            residue::solve_for_x_big(r, p, vx, &Integer::from(y)),
            residue::solve_for_x(r, p, vx, y)
        );
    }

    /// clear_stride is exactly the naive per-index loop.
    #[test]
    fn prop_clear_stride_matches_naive(
        len in 1u64..4000,
        step in 1u64..600,
        start in 0u64..4500,
        limit in 0u64..4500,
    ) {
        let mut fast = BitMap::new_all_set(len).unwrap();
        let mut naive = BitMap::new_all_set(len).unwrap();
        fast.clear_stride(step, start, limit);
        let mut i = start;
        while i < limit.min(len) {
            naive.clear(i);
            i += step;
        }
        prop_assert_eq!(fast.as_bytes(), naive.as_bytes());
    }

    /// duplicate_segment makes every copy identical to the seed.
    #[test]
    fn prop_duplicate_segment_tiles(
        seg in 1u64..200,
        k in 1u64..12,
        seed in any::<u64>(),
    ) {
        let mut bm = BitMap::new_all_clear(seg * k).unwrap();
        // Irregular but deterministic seed pattern.
        let mut state = seed | 1;
        for i in 0..seg {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            if state & 4 != 0 {
                bm.set(i);
            }
        }
        bm.duplicate_segment(0, seg, k);
        for j in 1..k {
            for i in 0..seg {
                prop_assert_eq!(bm.get(j * seg + i), bm.get(i));
            }
        }
    }

    /// Packed-byte export/import is the identity.
    #[test]
    fn prop_bitmap_bytes_round_trip(len in 1u64..2000, clears in prop::collection::vec(0u64..2000, 0..64)) {
        let mut bm = BitMap::new_all_set(len).unwrap();
        for c in clears {
            if c < len {
                bm.clear(c);
            }
        }
        let back = BitMap::from_bytes(len, &bm.as_bytes()).unwrap();
        prop_assert_eq!(back.as_bytes(), bm.as_bytes());
        prop_assert_eq!(back.count_ones(), bm.count_ones());
    }

    /// Segmented and non-segmented enumeration agree on arbitrary bounds.
    #[test]
    fn prop_sieves_agree(n in 10u64..60_000) {
        let a = sieve_iz(n).unwrap();
        let b = sieve_izm(n).unwrap();
        prop_assert_eq!(a.content_hash(), b.content_hash());
    }

    /// The last prime of a sieve never exceeds the bound and is itself
    /// prime.
    #[test]
    fn prop_sieve_last_is_tight(n in 10u64..100_000) {
        let primes = sieve_iz(n).unwrap();
        let last = primes.last().unwrap();
        prop_assert!(last <= n);
        prop_assert_ne!(Integer::from(last).is_probably_prime(40), IsPrime::No);
    }

    /// Walking any slab's gaps from its base yields strictly increasing
    /// probable primes with even gaps.
    #[test]
    fn prop_slab_walk_is_sound(y in 0u64..400) {
        let slab = sieve_vx_range(y, 1, 385).unwrap().remove(0);
        let mut cur = slab.base();
        for &g in slab.gaps() {
            prop_assert!(g > 0 && g % 2 == 0);
            cur += u32::from(g);
            prop_assert_ne!(cur.clone().is_probably_prime(40), IsPrime::No);
        }
    }
}
