//! Deterministic hash-derived vectors
//!
//! Used when no provider is configured or the provider call fails. The
//! vectors live in their own space and carry their own model tag; they
//! must never be compared with provider vectors.

use sha2::{Digest, Sha256};

const WINDOW: usize = 4;

/// Derive a `dimensions`-long vector from the SHA-256 digest of `text`.
///
/// Each component reads a 4-byte window of the digest starting at
/// `i % 32` (wrapping), interprets it as a big-endian `u32` and maps it
/// linearly onto `[-1, 1]`.
pub fn fallback_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    let len = digest.len();

    (0..dimensions)
        .map(|i| {
            let mut window = [0u8; WINDOW];
            for (offset, byte) in window.iter_mut().enumerate() {
                *byte = digest[(i + offset) % len];
            }
            let value = u32::from_be_bytes(window) as f64 / u32::MAX as f64;
            (value * 2.0 - 1.0) as f32
        })
        .collect()
}
