//! SHA-256 hashing of canonical URL forms.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};
use shavar_core::{FullHash, Prefix};

use crate::canonicalize::{canonicalize, CanonicalizeError};

/// Hashes a single canonical form.
pub fn digest(canonical: &str) -> FullHash {
    let bytes = Sha256::digest(canonical.as_bytes());
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    FullHash::new(arr)
}

/// Returns the full hashes of every canonical form of a URL.
pub fn full_hashes(url: &str) -> Result<BTreeSet<FullHash>, CanonicalizeError> {
    Ok(canonicalize(url)?.iter().map(|form| digest(form)).collect())
}

/// Returns the 4-byte prefixes of every canonical form of a URL.
pub fn prefixes(url: &str) -> Result<BTreeSet<Prefix>, CanonicalizeError> {
    Ok(full_hashes(url)?.iter().map(FullHash::prefix).collect())
}
