//! Identifier types shared by every layer of the client:
//! - `ListName` - a blocklist stream name such as `goog-malware-shavar`
//! - `Prefix` - the first 4 bytes of a SHA-256 digest
//! - `FullHash` - a full 32-byte SHA-256 digest
//! - `PrefixData` - chunk payload entry: empty, a prefix, or a full hash

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{FULL_HASH_LEN, PREFIX_LEN};

/// Error validating a list name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListNameError {
    /// Empty name
    #[error("List name is empty")]
    Empty,

    /// Name contains a byte outside `[a-z-]`
    #[error("Invalid character {0:?} in list name")]
    InvalidChar(char),
}

/// A named blocklist stream.
///
/// Names are short ASCII tokens matching `[a-z-]+`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListName(String);

impl ListName {
    /// Creates a validated list name.
    pub fn new(name: &str) -> Result<Self, ListNameError> {
        if name.is_empty() {
            return Err(ListNameError::Empty);
        }
        for c in name.chars() {
            if !(c.is_ascii_lowercase() || c == '-') {
                return Err(ListNameError::InvalidChar(c));
            }
        }
        Ok(Self(name.to_string()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ListName {
    type Err = ListNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The first 4 bytes of a SHA-256 digest of a canonical URL form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Prefix(pub [u8; PREFIX_LEN]);

impl Prefix {
    /// Creates a prefix from a 4-byte array.
    pub const fn new(bytes: [u8; PREFIX_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the inner bytes.
    pub const fn as_bytes(&self) -> &[u8; PREFIX_LEN] {
        &self.0
    }

    /// Returns the lowercase-hex storage key for this prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creates from the leading bytes of a slice.
    ///
    /// Returns `None` when fewer than 4 bytes are available.
    pub fn from_leading(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < PREFIX_LEN {
            return None;
        }
        let mut arr = [0u8; PREFIX_LEN];
        arr.copy_from_slice(&bytes[..PREFIX_LEN]);
        Some(Self(arr))
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prefix({})", self.to_hex())
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A full 32-byte SHA-256 digest; authoritative for match decisions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FullHash(pub [u8; FULL_HASH_LEN]);

impl FullHash {
    /// Creates a full hash from a 32-byte array.
    pub const fn new(bytes: [u8; FULL_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the inner bytes.
    pub const fn as_bytes(&self) -> &[u8; FULL_HASH_LEN] {
        &self.0
    }

    /// Returns the 4-byte prefix of this hash.
    pub fn prefix(&self) -> Prefix {
        let mut arr = [0u8; PREFIX_LEN];
        arr.copy_from_slice(&self.0[..PREFIX_LEN]);
        Prefix(arr)
    }

    /// Returns the lowercase-hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creates from a 32-byte slice.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != FULL_HASH_LEN {
            return None;
        }
        let mut arr = [0u8; FULL_HASH_LEN];
        arr.copy_from_slice(bytes);
        Some(Self(arr))
    }
}

impl fmt::Debug for FullHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FullHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for FullHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The hash payload carried by a chunk record.
///
/// An add or sub chunk entry carries either a 4-byte prefix, a full
/// 32-byte hash, or nothing at all (an empty chunk that only claims its
/// chunk number). Stored as lowercase hex.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixData(Vec<u8>);

impl PrefixData {
    /// Creates an empty payload (empty-chunk announcement).
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Creates a 4-byte prefix payload.
    pub fn prefix(prefix: Prefix) -> Self {
        Self(prefix.as_bytes().to_vec())
    }

    /// Creates a 32-byte full-hash payload.
    pub fn full_hash(hash: FullHash) -> Self {
        Self(hash.as_bytes().to_vec())
    }

    /// Creates a payload from raw bytes; length must be 0, 4, or 32.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            0 | PREFIX_LEN | FULL_HASH_LEN => Some(Self(bytes.to_vec())),
            _ => None,
        }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true for an empty-chunk payload.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the full hash when this payload carries 32 bytes.
    pub fn as_full_hash(&self) -> Option<FullHash> {
        FullHash::from_slice(&self.0)
    }

    /// Returns the 4-byte lookup prefix, derived from the leading bytes.
    ///
    /// `None` for empty payloads, which are not matchable.
    pub fn lookup_prefix(&self) -> Option<Prefix> {
        Prefix::from_leading(&self.0)
    }

    /// Returns the lowercase-hex representation used as a storage value.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for PrefixData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrefixData({})", self.to_hex())
    }
}

impl fmt::Display for PrefixData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_name_valid() {
        let name = ListName::new("goog-malware-shavar").unwrap();
        assert_eq!(name.as_str(), "goog-malware-shavar");
    }

    #[test]
    fn test_list_name_rejects_invalid() {
        assert!(matches!(ListName::new(""), Err(ListNameError::Empty)));
        assert!(matches!(
            ListName::new("Goog-Malware"),
            Err(ListNameError::InvalidChar('G'))
        ));
        assert!(matches!(
            ListName::new("list1"),
            Err(ListNameError::InvalidChar('1'))
        ));
    }

    #[test]
    fn test_prefix_hex() {
        let prefix = Prefix::new([0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(prefix.to_hex(), "deadbeef");
    }

    #[test]
    fn test_prefix_from_leading() {
        assert_eq!(
            Prefix::from_leading(&[1, 2, 3, 4, 5]),
            Some(Prefix::new([1, 2, 3, 4]))
        );
        assert_eq!(Prefix::from_leading(&[1, 2, 3]), None);
    }

    #[test]
    fn test_full_hash_prefix() {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let hash = FullHash::new(bytes);
        assert_eq!(hash.prefix(), Prefix::new([0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn test_prefix_data_lengths() {
        assert!(PrefixData::from_bytes(&[]).unwrap().is_empty());
        assert!(PrefixData::from_bytes(&[0u8; 4]).is_some());
        assert!(PrefixData::from_bytes(&[0u8; 32]).is_some());
        assert!(PrefixData::from_bytes(&[0u8; 5]).is_none());
        assert!(PrefixData::from_bytes(&[0u8; 16]).is_none());
    }

    #[test]
    fn test_prefix_data_lookup_prefix() {
        let data = PrefixData::from_bytes(&[0xde, 0xad, 0xbe, 0xef]).unwrap();
        assert_eq!(data.lookup_prefix(), Some(Prefix::new([0xde, 0xad, 0xbe, 0xef])));
        assert_eq!(PrefixData::empty().lookup_prefix(), None);

        let mut full = [0u8; 32];
        full[0] = 0xab;
        let data = PrefixData::full_hash(FullHash::new(full));
        assert_eq!(data.lookup_prefix(), Some(Prefix::new([0xab, 0, 0, 0])));
        assert_eq!(data.as_full_hash(), Some(FullHash::new(full)));
    }
}
