//! # Store — Hash-Verified Binary Persistence
//!
//! Flat binary files for the three result shapes, each closed by a
//! 32-byte SHA-256 trailer over its body. The read paths recompute the
//! hash and reject on mismatch, dropping the partially read container —
//! a corrupted file can never masquerade as a result.
//!
//! All integers are host-byte-order; the files are deliberately not
//! portable across endianness (the hash covers raw body bytes).
//!
//! ## Layouts
//!
//! - **Prime list** — `i32` count · count × `u64` primes · hash(primes).
//! - **Gap list** — `usize` y-length (string + NUL) · y bytes · NUL ·
//!   `usize` gap count · count × `u16` gaps · hash(gaps). Readers accept
//!   paths without the canonical `.vx` extension and append it. The gap
//!   buffer is sized from the stored count after reading it, never from
//!   any prior estimate.
//! - **Bitmap** (diagnostics) — `u64` bit size · packed bytes ·
//!   hash(bytes).
//!
//! Result files live under `output/`, created lazily with mode 0700.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::bitmap::BitMap;
use crate::error::{Error, Result};
use crate::list::PrimeList;
use crate::vx::VxResult;

/// Canonical extension of persisted gap lists.
const VX_EXT: &str = "vx";

/// Create (if needed) and return the result directory under `base`,
/// with owner-only permissions.
pub fn ensure_output_dir(base: &Path) -> Result<PathBuf> {
    let dir = base.join("output");
    if !dir.is_dir() {
        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&dir)?;
        info!(dir = %dir.display(), "created result directory");
    }
    Ok(dir)
}

/// The default result directory, relative to the working directory.
pub fn output_dir() -> Result<PathBuf> {
    ensure_output_dir(Path::new("."))
}

fn read_array<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

// ── Prime lists ─────────────────────────────────────────────────────

/// Write a prime list: count header, body, hash trailer.
pub fn write_prime_list(path: &Path, list: &PrimeList) -> Result<()> {
    let count = i32::try_from(list.len())
        .map_err(|_| Error::InvalidArgument(format!("{} primes overflow the header", list.len())))?;
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(&count.to_ne_bytes())?;
    for p in list.iter() {
        w.write_all(&p.to_ne_bytes())?;
    }
    w.write_all(&list.content_hash())?;
    w.flush()?;
    Ok(())
}

/// Read a prime list back, verifying the hash trailer.
pub fn read_prime_list(path: &Path) -> Result<PrimeList> {
    let mut r = BufReader::new(File::open(path)?);
    let count = i32::from_ne_bytes(read_array(&mut r)?);
    if count < 0 {
        warn!(path = %path.display(), count, "negative prime count in header");
        return Err(Error::IntegrityFailed);
    }
    let count = count as usize;
    let mut primes = Vec::new();
    primes
        .try_reserve_exact(count)
        .map_err(|_| Error::AllocationFailed(count * 8))?;
    let mut hasher = Sha256::new();
    for _ in 0..count {
        let bytes: [u8; 8] = read_array(&mut r)?;
        hasher.update(bytes);
        primes.push(u64::from_ne_bytes(bytes));
    }
    let stored: [u8; 32] = read_array(&mut r)?;
    let computed: [u8; 32] = hasher.finalize().into();
    if stored != computed {
        warn!(path = %path.display(), "prime list hash mismatch");
        return Err(Error::IntegrityFailed);
    }
    Ok(PrimeList::from_vec(primes))
}

// ── Gap lists ───────────────────────────────────────────────────────

/// Write a gap list: y header (length, bytes, NUL), gap count, gaps,
/// hash trailer over the gap bytes.
pub fn write_vx_result(path: &Path, result: &VxResult) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let y = result.y().as_bytes();
    w.write_all(&(y.len() + 1).to_ne_bytes())?;
    w.write_all(y)?;
    w.write_all(&[0u8])?;
    w.write_all(&result.len().to_ne_bytes())?;
    for &g in result.gaps() {
        w.write_all(&g.to_ne_bytes())?;
    }
    w.write_all(&result.content_hash())?;
    w.flush()?;
    Ok(())
}

/// Append the canonical `.vx` extension when the path lacks it.
fn with_vx_ext(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|e| e == VX_EXT) {
        path.to_path_buf()
    } else {
        let mut s = path.as_os_str().to_os_string();
        s.push(".");
        s.push(VX_EXT);
        PathBuf::from(s)
    }
}

/// Read a gap list back, verifying the hash trailer. The slab width is
/// not stored; the caller supplies the width the file was produced with.
pub fn read_vx_result(path: &Path, vx: u64) -> Result<VxResult> {
    let path = with_vx_ext(path);
    let mut r = BufReader::new(File::open(&path)?);

    let y_len = usize::from_ne_bytes(read_array(&mut r)?);
    if y_len == 0 {
        return Err(Error::IntegrityFailed);
    }
    let mut y_bytes = Vec::new();
    y_bytes
        .try_reserve_exact(y_len)
        .map_err(|_| Error::AllocationFailed(y_len))?;
    y_bytes.resize(y_len, 0);
    r.read_exact(&mut y_bytes)?;
    if y_bytes.pop() != Some(0) {
        return Err(Error::IntegrityFailed);
    }
    let y = String::from_utf8(y_bytes).map_err(|_| Error::IntegrityFailed)?;

    // The gap buffer is allocated from the stored count, after reading it.
    let count = usize::from_ne_bytes(read_array(&mut r)?);
    let mut gaps = Vec::new();
    gaps.try_reserve_exact(count)
        .map_err(|_| Error::AllocationFailed(count * 2))?;
    let mut hasher = Sha256::new();
    for _ in 0..count {
        let bytes: [u8; 2] = read_array(&mut r)?;
        hasher.update(bytes);
        gaps.push(u16::from_ne_bytes(bytes));
    }
    let stored: [u8; 32] = read_array(&mut r)?;
    let computed: [u8; 32] = hasher.finalize().into();
    if stored != computed {
        warn!(path = %path.display(), "gap list hash mismatch");
        return Err(Error::IntegrityFailed);
    }
    Ok(VxResult::from_parts(y, vx, gaps))
}

// ── Bitmaps (diagnostics) ───────────────────────────────────────────

/// Write a bitmap: bit size, packed bytes, hash trailer.
pub fn write_bitmap(path: &Path, map: &BitMap) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(&map.len().to_ne_bytes())?;
    w.write_all(&map.as_bytes())?;
    w.write_all(&map.content_hash())?;
    w.flush()?;
    Ok(())
}

/// Read a bitmap back, verifying the hash trailer.
pub fn read_bitmap(path: &Path) -> Result<BitMap> {
    let mut r = BufReader::new(File::open(path)?);
    let len = u64::from_ne_bytes(read_array(&mut r)?);
    let nbytes = (len as usize).div_ceil(8);
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(nbytes)
        .map_err(|_| Error::AllocationFailed(nbytes))?;
    bytes.resize(nbytes, 0);
    r.read_exact(&mut bytes)?;
    let stored: [u8; 32] = read_array(&mut r)?;
    let map = BitMap::from_bytes(len, &bytes)?;
    if stored != map.content_hash() {
        warn!(path = %path.display(), "bitmap hash mismatch");
        return Err(Error::IntegrityFailed);
    }
    Ok(map)
}
