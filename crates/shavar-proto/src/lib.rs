//! Shavar Protocol - Wire codec for the list-update service.
//!
//! This crate defines:
//! - Update-response header parsing (`n:`, `i:`, `u:`, `ad:`, `sd:`,
//!   `r:pleasereset` directives)
//! - Binary chunk payload framing and decoding
//! - Full-hash request/response codec
//! - Downloads request body composition with its size cap

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod chunk;
pub mod fullhash;
pub mod header;
pub mod request;

pub use chunk::{encode_chunk_stream, parse_chunk_stream, ParsedChunk};
pub use fullhash::{encode_gethash_body, parse_gethash_response, FullHashResponse};
pub use header::{parse_update_response, ListDirectives, UpdateDirectives};
pub use request::compose_download_body;

use shavar_core::{ListNameError, RangeParseError};
use thiserror::Error;

/// Errors decoding or composing protocol payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Header token without a `key:value` shape
    #[error("Malformed directive: {0:?}")]
    MalformedDirective(String),

    /// List-scoped directive before any `i:` token
    #[error("Directive {0:?} outside a list scope")]
    DirectiveOutsideList(String),

    /// Invalid numeric field
    #[error("Invalid number in {context}: {value:?}")]
    InvalidNumber {
        /// Where the number appeared
        context: &'static str,
        /// The offending text
        value: String,
    },

    /// Invalid list name
    #[error("Invalid list name: {0}")]
    ListName(#[from] ListNameError),

    /// Invalid chunk range syntax
    #[error("Invalid range: {0}")]
    Range(#[from] RangeParseError),

    /// Payload ended before a declared length was satisfied
    #[error("Truncated payload: expected {expected} more bytes, got {available}")]
    Truncated {
        /// Bytes still required
        expected: usize,
        /// Bytes actually available
        available: usize,
    },

    /// Varint ran past its maximum width
    #[error("Malformed varint")]
    MalformedVarint,

    /// Chunk declared a type other than add or sub
    #[error("Unknown chunk type: {0}")]
    UnknownChunkType(u64),

    /// Chunk declared a prefix size other than 4 or 32 bytes
    #[error("Unknown prefix type: {0}")]
    UnknownPrefixType(u64),

    /// Hash data length not a multiple of the declared prefix size
    #[error("Hash data length {len} not divisible by prefix size {size}")]
    HashLengthMismatch {
        /// Total hash bytes in the chunk
        len: usize,
        /// Declared per-entry size
        size: usize,
    },

    /// Sub chunk with differing hash and add-number counts
    #[error("Sub chunk carries {hashes} hashes but {add_numbers} add numbers")]
    SubCountMismatch {
        /// Number of hash entries
        hashes: usize,
        /// Number of add-chunk references
        add_numbers: usize,
    },

    /// Full-hash response block with an unsupported hash size
    #[error("Unexpected hash size {0} in full-hash response")]
    UnexpectedHashSize(usize),

    /// Request body cannot fit the size cap even after truncation
    #[error("Request body cannot fit within {0} bytes")]
    RequestOverflow(usize),
}
