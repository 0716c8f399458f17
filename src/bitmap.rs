//! # BitMap — Fixed-Capacity Packed Bit Array
//!
//! The working storage of every sieve in this crate. One bit per iZ column:
//! a set bit means the column **survives** (its value is still a prime
//! candidate); a clear bit means it was eliminated.
//!
//! Capacity is fixed at creation. Beyond single-bit access the array offers
//! the three whole-array operations the sieves are built on:
//!
//! - `clear_stride` — the inner loop of composite marking; clears
//!   `start, start + step, start + 2·step, …` below a limit.
//! - `duplicate_segment` — tiles a seed pattern across the array; the
//!   base-segment builder grows the 35-pattern to a full primorial width
//!   with one call per added prime.
//! - `content_hash` — 32-byte SHA-256 of the packed bytes, used by the
//!   diagnostic file format to reject corrupted reads.
//!
//! Bit layout: bit `i` lives in word `i / 64` at position `i % 64`, so
//! `count_ones` rides on hardware POPCNT and set-bit iteration uses the
//! Brian Kernighan trick.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Word-packed bit array with fixed capacity.
#[derive(Clone)]
pub struct BitMap {
    words: Vec<u64>,
    len: u64,
}

impl BitMap {
    /// Create a bit array of `len` bits, all set.
    pub fn new_all_set(len: u64) -> Result<Self> {
        let mut map = Self::new_all_clear(len)?;
        map.set_all();
        Ok(map)
    }

    /// Create a bit array of `len` bits, all clear.
    pub fn new_all_clear(len: u64) -> Result<Self> {
        let num_words = (len as usize).div_ceil(64);
        let mut words = Vec::new();
        words
            .try_reserve_exact(num_words)
            .map_err(|_| Error::AllocationFailed(num_words * 8))?;
        words.resize(num_words, 0u64);
        Ok(BitMap { words, len })
    }

    /// Number of bits.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set every bit.
    pub fn set_all(&mut self) {
        self.words.fill(u64::MAX);
        self.mask_tail();
    }

    /// Clear every bit.
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Get bit `index`.
    ///
    /// # Panics
    /// Panics in debug builds if `index >= len`.
    #[inline]
    pub fn get(&self, index: u64) -> bool {
        debug_assert!(index < self.len, "bit index {} out of {}", index, self.len);
        self.words[(index / 64) as usize] & (1u64 << (index % 64)) != 0
    }

    /// Set bit `index`.
    #[inline]
    pub fn set(&mut self, index: u64) {
        debug_assert!(index < self.len);
        self.words[(index / 64) as usize] |= 1u64 << (index % 64);
    }

    /// Clear bit `index`.
    #[inline]
    pub fn clear(&mut self, index: u64) {
        debug_assert!(index < self.len);
        self.words[(index / 64) as usize] &= !(1u64 << (index % 64));
    }

    /// Flip bit `index`.
    #[inline]
    pub fn flip(&mut self, index: u64) {
        debug_assert!(index < self.len);
        self.words[(index / 64) as usize] ^= 1u64 << (index % 64);
    }

    /// Clear `start, start + step, start + 2·step, …` while `< limit`.
    ///
    /// Equivalent to the obvious loop; this is the hot path of every sieve,
    /// so the word/bit split is computed incrementally instead of per call.
    #[inline]
    pub fn clear_stride(&mut self, step: u64, start: u64, limit: u64) {
        debug_assert!(step > 0);
        let limit = limit.min(self.len);
        let mut i = start;
        while i < limit {
            self.words[(i / 64) as usize] &= !(1u64 << (i % 64));
            i += step;
        }
    }

    /// Count set bits via POPCNT.
    pub fn count_ones(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    /// Iterate indices of set bits in ascending order.
    pub fn iter_set_bits(&self) -> impl Iterator<Item = u64> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let base = wi as u64 * 64;
            BitIter { word, base }
        })
    }

    /// Copy `len` bits from `src` starting at `src_off` into `self` at
    /// `dst_off`. Regions beyond either array are a caller error.
    pub fn copy_bits_from(&mut self, dst_off: u64, src: &BitMap, src_off: u64, len: u64) {
        debug_assert!(src_off + len <= src.len);
        debug_assert!(dst_off + len <= self.len);
        let mut i = 0;
        while i < len {
            let n = (len - i).min(64);
            let chunk = src.read_word(src_off + i) & mask_low(n);
            self.write_chunk(dst_off + i, chunk, n);
            i += n;
        }
    }

    /// Tile the segment `[start, start + seg_size)` over the next `k − 1`
    /// segment-sized ranges, so the whole `[start, start + k·seg_size)`
    /// region repeats the seed pattern.
    pub fn duplicate_segment(&mut self, start: u64, seg_size: u64, k: u64) {
        debug_assert!(start + k * seg_size <= self.len);
        // Snapshot the seed so self-overlapping writes cannot corrupt it.
        let words = (seg_size as usize).div_ceil(64);
        let mut seed = Vec::with_capacity(words);
        let mut i = 0;
        while i < seg_size {
            seed.push(self.read_word(start + i));
            i += 64;
        }
        for j in 1..k {
            let dst = start + j * seg_size;
            let mut done = 0;
            for &word in &seed {
                let n = (seg_size - done).min(64);
                self.write_chunk(dst + done, word & mask_low(n), n);
                done += n;
                if done == seg_size {
                    break;
                }
            }
        }
    }

    /// 32-byte SHA-256 of the packed bytes.
    pub fn content_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.as_bytes());
        hasher.finalize().into()
    }

    /// Packed bytes in host word order, trimmed to `ceil(len / 8)`.
    pub fn as_bytes(&self) -> Vec<u8> {
        let nbytes = (self.len as usize).div_ceil(8);
        let mut out = Vec::with_capacity(nbytes);
        for w in &self.words {
            out.extend_from_slice(&w.to_ne_bytes());
        }
        out.truncate(nbytes);
        out
    }

    /// Rebuild a bit array of `len` bits from packed bytes.
    pub fn from_bytes(len: u64, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != (len as usize).div_ceil(8) {
            return Err(Error::InvalidArgument(format!(
                "{} bytes cannot hold {} bits",
                bytes.len(),
                len
            )));
        }
        let mut map = Self::new_all_clear(len)?;
        for (i, chunk) in bytes.chunks(8).enumerate() {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            map.words[i] = u64::from_ne_bytes(buf);
        }
        map.mask_tail();
        Ok(map)
    }

    /// Read 64 bits starting at `bit`, zero-padded past the end.
    #[inline]
    fn read_word(&self, bit: u64) -> u64 {
        let w = (bit / 64) as usize;
        let o = bit % 64;
        if w >= self.words.len() {
            return 0;
        }
        let lo = self.words[w] >> o;
        if o == 0 || w + 1 >= self.words.len() {
            lo
        } else {
            lo | (self.words[w + 1] << (64 - o))
        }
    }

    /// Write the low `n` bits of `chunk` at bit offset `dst`.
    #[inline]
    fn write_chunk(&mut self, dst: u64, chunk: u64, n: u64) {
        let w = (dst / 64) as usize;
        let o = dst % 64;
        let mask = (mask_low(n) as u128) << o;
        let val = (chunk as u128) << o;
        self.words[w] = (self.words[w] & !(mask as u64)) | (val as u64);
        let hi_mask = (mask >> 64) as u64;
        if hi_mask != 0 {
            self.words[w + 1] = (self.words[w + 1] & !hi_mask) | ((val >> 64) as u64);
        }
    }

    /// Clear the unused high bits of the last word so hashes and POPCNT
    /// see only live bits.
    fn mask_tail(&mut self) {
        let extra = self.words.len() as u64 * 64 - self.len;
        if extra > 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= u64::MAX >> extra;
            }
        }
    }
}

/// A mask of the low `n` bits, `n ∈ [0, 64]`.
#[inline]
fn mask_low(n: u64) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Iterator over set bits within a single word.
struct BitIter {
    word: u64,
    base: u64,
}

impl Iterator for BitIter {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        if self.word == 0 {
            return None;
        }
        let tz = self.word.trailing_zeros() as u64;
        self.word &= self.word - 1;
        Some(self.base + tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_all_set_and_clear() {
        let set = BitMap::new_all_set(100).unwrap();
        assert_eq!(set.len(), 100);
        assert_eq!(set.count_ones(), 100);
        let clear = BitMap::new_all_clear(100).unwrap();
        assert_eq!(clear.count_ones(), 0);
    }

    #[test]
    fn set_clear_flip_get() {
        let mut bm = BitMap::new_all_clear(200).unwrap();
        for &i in &[0u64, 63, 64, 127, 128, 199] {
            bm.set(i);
            assert!(bm.get(i));
        }
        assert_eq!(bm.count_ones(), 6);
        bm.clear(64);
        assert!(!bm.get(64));
        bm.flip(64);
        assert!(bm.get(64));
        bm.flip(64);
        assert_eq!(bm.count_ones(), 5);
    }

    #[test]
    fn set_all_then_clear_all() {
        let mut bm = BitMap::new_all_clear(130).unwrap();
        bm.set_all();
        assert_eq!(bm.count_ones(), 130);
        bm.clear_all();
        assert_eq!(bm.count_ones(), 0);
    }

    /// `clear_stride` must match the obvious per-index loop.
    #[test]
    fn clear_stride_equals_naive_loop() {
        for &(step, start, limit) in &[(3u64, 0u64, 100u64), (7, 5, 99), (64, 1, 300), (5, 95, 100)]
        {
            let mut fast = BitMap::new_all_set(300).unwrap();
            let mut naive = BitMap::new_all_set(300).unwrap();
            fast.clear_stride(step, start, limit);
            let mut i = start;
            while i < limit.min(300) {
                naive.clear(i);
                i += step;
            }
            assert_eq!(fast.as_bytes(), naive.as_bytes(), "step={}", step);
        }
    }

    #[test]
    fn clear_stride_start_past_limit_is_noop() {
        let mut bm = BitMap::new_all_set(64).unwrap();
        bm.clear_stride(3, 64, 64);
        bm.clear_stride(3, 100, 64);
        assert_eq!(bm.count_ones(), 64);
    }

    #[test]
    fn iter_set_bits_matches_pattern() {
        let mut bm = BitMap::new_all_clear(200).unwrap();
        let expected = vec![0u64, 1, 63, 64, 65, 127, 128, 199];
        for &i in &expected {
            bm.set(i);
        }
        let collected: Vec<u64> = bm.iter_set_bits().collect();
        assert_eq!(collected, expected);
    }

    #[test]
    fn copy_bits_across_arrays() {
        let mut src = BitMap::new_all_clear(150).unwrap();
        for i in (10..100).step_by(3) {
            src.set(i);
        }
        let mut dst = BitMap::new_all_set(300).unwrap();
        dst.copy_bits_from(37, &src, 10, 90);
        for i in 0..90u64 {
            assert_eq!(dst.get(37 + i), src.get(10 + i), "bit {}", i);
        }
        // Bits outside the copied range stay untouched.
        assert!(dst.get(36));
        assert!(dst.get(127));
    }

    /// After tiling, every following segment is a bitwise copy of the seed.
    #[test]
    fn duplicate_segment_tiles_the_seed() {
        // Seed of 35 bits with an irregular pattern, tiled 11 times.
        let mut bm = BitMap::new_all_clear(35 * 11).unwrap();
        for i in 0..35u64 {
            if i % 5 == 1 || i % 7 == 6 {
                bm.set(i);
            }
        }
        bm.duplicate_segment(0, 35, 11);
        for j in 1..11u64 {
            for i in 0..35u64 {
                assert_eq!(bm.get(j * 35 + i), bm.get(i), "copy {} bit {}", j, i);
            }
        }
    }

    #[test]
    fn duplicate_segment_word_aligned() {
        let mut bm = BitMap::new_all_clear(64 * 4).unwrap();
        bm.set(0);
        bm.set(17);
        bm.set(63);
        bm.duplicate_segment(0, 64, 4);
        assert_eq!(bm.count_ones(), 12);
        for j in 0..4u64 {
            assert!(bm.get(j * 64));
            assert!(bm.get(j * 64 + 17));
            assert!(bm.get(j * 64 + 63));
        }
    }

    #[test]
    fn content_hash_changes_with_content() {
        let a = BitMap::new_all_set(1000).unwrap();
        let mut b = BitMap::new_all_set(1000).unwrap();
        assert_eq!(a.content_hash(), b.content_hash());
        b.clear(512);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn bytes_round_trip() {
        let mut bm = BitMap::new_all_clear(77).unwrap();
        for i in (0..77).step_by(4) {
            bm.set(i);
        }
        let back = BitMap::from_bytes(77, &bm.as_bytes()).unwrap();
        assert_eq!(back.as_bytes(), bm.as_bytes());
        assert_eq!(back.count_ones(), bm.count_ones());
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(matches!(
            BitMap::from_bytes(100, &[0u8; 5]),
            Err(Error::InvalidArgument(_))
        ));
    }

    /// The tail mask keeps unused high bits out of counts and hashes.
    #[test]
    fn tail_bits_stay_clear() {
        let bm = BitMap::new_all_set(65).unwrap();
        assert_eq!(bm.count_ones(), 65);
        assert_eq!(bm.words.len(), 2);
        assert_eq!(bm.words[1].count_ones(), 1);
    }
}
