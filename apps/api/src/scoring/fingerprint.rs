//! Cache key derivation for scoring requests.
//!
//! xxHash64 over the requirements text followed by each page in order. Every
//! field is length-prefixed so that moving bytes across a boundary (between the
//! requirements and the first page, or between two pages) changes the key.

use std::fmt;

use xxhash_rust::xxh64::Xxh64;

const SEED: u64 = 0;

/// Deterministic, order-sensitive fingerprint of `(requirements, pages)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of(requirements: &str, pages: &[String]) -> Self {
        let mut hasher = Xxh64::new(SEED);
        write_field(&mut hasher, requirements.as_bytes());
        for page in pages {
            write_field(&mut hasher, page.as_bytes());
        }
        Fingerprint(hasher.digest())
    }
}

fn write_field(hasher: &mut Xxh64, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
