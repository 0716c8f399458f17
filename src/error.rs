//! # Error — Typed Failure Surface
//!
//! One enum for every runtime failure the library can produce. Precondition
//! violations in the residue algebra (a residue outside {−1, +1}, a zero
//! column index) are hard asserts, not variants: they are programming errors
//! and panicking at the call site is the correct behavior.
//!
//! `NotFound` is retryable — an exhausted attempt or segment cap, not a
//! malfunction. `IntegrityFailed` means a persisted container's stored hash
//! did not match the recomputed one; the partial read is discarded.

use thiserror::Error;

/// Library-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A bound below the operation's minimum (10 for the iZ sieves,
    /// 10 bits for random prime generation).
    #[error("bound {got} is below the minimum of {min}")]
    TooSmall { got: u64, min: u64 },

    /// Backing storage could not be obtained.
    #[error("allocation of {0} bytes failed")]
    AllocationFailed(usize),

    /// A malformed argument that is a runtime condition, not a programming
    /// error: a non-numeric slab index string, a gap outside 16 bits, a
    /// mismatched asset handed to a slab kernel.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `gcd(a, m) != 1`: no modular inverse, or a root prime that divides
    /// the slab width. Operands are carried in decimal so arbitrary-size
    /// values fit.
    #[error("{a} and {m} share a factor; no solution")]
    NotCoprime { a: String, m: String },

    /// Attempt or segment cap reached without a hit. Callers retry or widen.
    #[error("no prime found within {0} attempts")]
    NotFound(u64),

    /// Stored content hash does not match the recomputed hash.
    #[error("stored hash does not match recomputed hash")]
    IntegrityFailed,

    /// Underlying file I/O failure.
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}
