//! Shavar Core - Core types for the shavar URL-reputation client.
//!
//! This crate provides:
//! - Identifier types (ListName, Prefix, FullHash, PrefixData)
//! - Chunk and full-hash record types
//! - Compact chunk-number range sets
//! - Timestamps in protocol granularity (seconds)

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod identifiers;
pub mod ranges;
pub mod records;
pub mod time;

pub use identifiers::{FullHash, ListName, ListNameError, Prefix, PrefixData};
pub use ranges::{ChunkRanges, RangeParseError};
pub use records::{AddChunk, FullHashEntry, SubChunk};
pub use time::Timestamp;

/// Length of a hash prefix in bytes.
pub const PREFIX_LEN: usize = 4;

/// Length of a full hash in bytes.
pub const FULL_HASH_LEN: usize = 32;

/// Maximum size of a downloads request body, trailing newline included.
pub const MAX_REQUEST_BODY_LEN: usize = 4096;

/// Maximum number of chunk records inserted per store call.
pub const INSERT_BATCH_LEN: usize = 1000;

/// Maximum number of chunk numbers deleted per store call.
pub const DELETE_BATCH_LEN: usize = 500;
