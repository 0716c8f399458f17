//! # PrimeList — Ordered Prime Container with Content Hash
//!
//! The result type of every enumeration sieve. Insertion order equals
//! ascending value; the container grows by append, can be trimmed to exact
//! length once a sieve finishes, and carries a recomputable 32-byte
//! SHA-256 over the prime bytes in host order. Two sieves agree exactly
//! when their lists hash identically — the cross-validation contract the
//! test suite leans on.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Ordered collection of 64-bit primes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeList {
    primes: Vec<u64>,
}

impl PrimeList {
    /// Create an empty list with a capacity hint. The reserve is fallible:
    /// an impossible hint surfaces as `AllocationFailed` instead of
    /// aborting the process.
    pub fn with_capacity(hint: usize) -> Result<Self> {
        let mut primes = Vec::new();
        primes
            .try_reserve(hint)
            .map_err(|_| Error::AllocationFailed(hint * 8))?;
        Ok(PrimeList { primes })
    }

    /// Build directly from an ascending vector (persistence read path).
    pub fn from_vec(primes: Vec<u64>) -> Self {
        debug_assert!(primes.windows(2).all(|w| w[0] < w[1]));
        PrimeList { primes }
    }

    /// Append `p`; values must arrive in ascending order.
    #[inline]
    pub fn push(&mut self, p: u64) {
        debug_assert!(self.primes.last().is_none_or(|&last| last < p));
        self.primes.push(p);
    }

    /// Drop the final prime (the overshoot step of the iZ sieves).
    pub fn pop(&mut self) -> Option<u64> {
        self.primes.pop()
    }

    /// Shrink backing storage to exact length.
    pub fn trim(&mut self) {
        self.primes.shrink_to_fit();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.primes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<u64> {
        self.primes.last().copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u64] {
        &self.primes
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.primes.iter().copied()
    }

    /// 32-byte SHA-256 over the primes' host-order bytes. This is also the
    /// integrity trailer of the binary file format.
    pub fn content_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for &p in &self.primes {
            hasher.update(p.to_ne_bytes());
        }
        hasher.finalize().into()
    }
}

impl std::ops::Index<usize> for PrimeList {
    type Output = u64;

    fn index(&self, i: usize) -> &u64 {
        &self.primes[i]
    }
}
