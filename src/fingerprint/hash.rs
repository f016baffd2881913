//! Content hash used for addon fingerprints.
//!
//! This is the MurmurHash2 variant the remote matcher expects: 32-bit, seed
//! `1 ^ length`, little-endian 4-byte groups. The "normalized" form skips
//! ASCII whitespace both when counting the length and when hashing, so the
//! same source file fingerprints identically regardless of line endings.

use anyhow::{Context, Result};
use std::path::Path;

const M: u32 = 0x5bd1_e995;

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n' | b'\r' | b' ')
}

/// Hashes a byte buffer. With `normalize_whitespace`, whitespace bytes are
/// invisible to both the seed length and the digest.
pub fn compute_hash(data: &[u8], normalize_whitespace: bool) -> u32 {
    if normalize_whitespace {
        let filtered: Vec<u8> = data
            .iter()
            .copied()
            .filter(|&b| !is_whitespace(b))
            .collect();
        murmur2(&filtered)
    } else {
        murmur2(data)
    }
}

/// Hashes a file's contents with whitespace normalization, the form used
/// for per-file fingerprints.
pub fn normalized_file_hash(path: &Path) -> Result<u32> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read {} for fingerprinting", path.display()))?;
    Ok(compute_hash(&data, true))
}

fn murmur2(data: &[u8]) -> u32 {
    let mut hash: u32 = 1 ^ data.len() as u32;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> 24;
        k = k.wrapping_mul(M);
        hash = hash.wrapping_mul(M) ^ k;
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k: u32 = 0;
        for (i, &byte) in tail.iter().enumerate() {
            k |= u32::from(byte) << (8 * i);
        }
        hash = (hash ^ k).wrapping_mul(M);
    }

    hash ^= hash >> 13;
    hash = hash.wrapping_mul(M);
    hash ^ (hash >> 15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        let data = b"local addon = CreateFrame(\"Frame\")";
        assert_eq!(compute_hash(data, false), compute_hash(data, false));
        assert_eq!(compute_hash(data, true), compute_hash(data, true));
    }

    #[test]
    fn normalization_ignores_whitespace_entirely() {
        // The normalized hash of whitespace-laden input must equal the plain
        // hash of the same bytes with whitespace removed.
        let noisy = b"local x = 1\r\n\tlocal y = 2\n";
        let compact = b"localx=1localy=2";
        assert_eq!(compute_hash(noisy, true), compute_hash(compact, false));
        // And line-ending differences alone never change the fingerprint.
        assert_eq!(
            compute_hash(b"a\r\nb\r\nc", true),
            compute_hash(b"a\nb\nc", true)
        );
    }

    #[test]
    fn different_content_hashes_differently() {
        assert_ne!(
            compute_hash(b"function A() end", false),
            compute_hash(b"function B() end", false)
        );
    }

    #[test]
    fn tail_bytes_contribute_to_the_digest() {
        // 5 bytes: one full group plus a 1-byte tail.
        assert_ne!(compute_hash(b"abcde", false), compute_hash(b"abcdf", false));
    }
}
