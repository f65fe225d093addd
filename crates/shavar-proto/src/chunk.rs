//! Binary chunk payload codec.
//!
//! A redirect payload is a concatenation of frames, each a big-endian
//! `u32` length followed by one `ChunkData` message in protobuf wire
//! encoding:
//!
//! | Field | # | Type | Notes |
//! |-------|---|------|-------|
//! | `chunk_number` | 1 | varint | |
//! | `chunk_type` | 2 | varint | 0 = add (default), 1 = sub |
//! | `prefix_type` | 3 | varint | 0 = 4-byte (default), 1 = 32-byte |
//! | `hashes` | 4 | bytes | concatenated fixed-size entries |
//! | `add_numbers` | 5 | repeated varint | sub chunks only; packed or not |
//!
//! Unknown fields are skipped; an unrecognized chunk or prefix type
//! fails the whole payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use shavar_core::{PrefixData, FULL_HASH_LEN, PREFIX_LEN};

use crate::CodecError;

const CHUNK_TYPE_ADD: u64 = 0;
const CHUNK_TYPE_SUB: u64 = 1;
const PREFIX_TYPE_4B: u64 = 0;
const PREFIX_TYPE_32B: u64 = 1;

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

/// One decoded chunk from a redirect payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedChunk {
    /// Asserts prefixes onto the list. An empty entry list is an
    /// empty-chunk announcement that only claims the chunk number.
    Add {
        /// Chunk number in the list's add sequence.
        chunk_number: u32,
        /// Asserted entries.
        prefixes: Vec<PrefixData>,
    },
    /// Retracts prefixes previously asserted by add chunks.
    Sub {
        /// Chunk number in the list's sub sequence.
        chunk_number: u32,
        /// `(add_chunk_number, prefix)` pairs to retract.
        entries: Vec<(u32, PrefixData)>,
    },
}

impl ParsedChunk {
    /// Returns the chunk number regardless of kind.
    pub fn chunk_number(&self) -> u32 {
        match self {
            ParsedChunk::Add { chunk_number, .. } => *chunk_number,
            ParsedChunk::Sub { chunk_number, .. } => *chunk_number,
        }
    }
}

/// Decodes a full redirect payload into its chunks.
pub fn parse_chunk_stream(payload: &[u8]) -> Result<Vec<ParsedChunk>, CodecError> {
    let mut buf = Bytes::copy_from_slice(payload);
    let mut chunks = Vec::new();
    while buf.has_remaining() {
        if buf.remaining() < 4 {
            return Err(CodecError::Truncated {
                expected: 4,
                available: buf.remaining(),
            });
        }
        let len = buf.get_u32() as usize;
        if buf.remaining() < len {
            return Err(CodecError::Truncated {
                expected: len,
                available: buf.remaining(),
            });
        }
        let mut frame = buf.copy_to_bytes(len);
        chunks.push(decode_chunk_data(&mut frame)?);
    }
    Ok(chunks)
}

fn decode_chunk_data(buf: &mut Bytes) -> Result<ParsedChunk, CodecError> {
    let mut chunk_number: u32 = 0;
    let mut chunk_type = CHUNK_TYPE_ADD;
    let mut prefix_type = PREFIX_TYPE_4B;
    let mut hashes = Bytes::new();
    let mut add_numbers: Vec<u32> = Vec::new();

    while buf.has_remaining() {
        let tag = read_varint(buf)?;
        let field = tag >> 3;
        let wire = (tag & 0x7) as u8;
        match (field, wire) {
            (1, WIRE_VARINT) => chunk_number = read_varint(buf)? as u32,
            (2, WIRE_VARINT) => chunk_type = read_varint(buf)?,
            (3, WIRE_VARINT) => prefix_type = read_varint(buf)?,
            (4, WIRE_LEN) => hashes = read_bytes(buf)?,
            (5, WIRE_LEN) => {
                // Packed encoding.
                let mut packed = read_bytes(buf)?;
                while packed.has_remaining() {
                    add_numbers.push(read_varint(&mut packed)? as u32);
                }
            }
            (5, WIRE_VARINT) => add_numbers.push(read_varint(buf)? as u32),
            _ => skip_field(buf, wire)?,
        }
    }

    let entry_len = match prefix_type {
        PREFIX_TYPE_4B => PREFIX_LEN,
        PREFIX_TYPE_32B => FULL_HASH_LEN,
        other => return Err(CodecError::UnknownPrefixType(other)),
    };
    if hashes.len() % entry_len != 0 {
        return Err(CodecError::HashLengthMismatch {
            len: hashes.len(),
            size: entry_len,
        });
    }
    let entries: Vec<PrefixData> = hashes
        .chunks(entry_len)
        .map(|bytes| PrefixData::from_bytes(bytes).expect("entry length checked"))
        .collect();

    match chunk_type {
        CHUNK_TYPE_ADD => Ok(ParsedChunk::Add {
            chunk_number,
            prefixes: entries,
        }),
        CHUNK_TYPE_SUB => {
            if entries.len() != add_numbers.len() {
                return Err(CodecError::SubCountMismatch {
                    hashes: entries.len(),
                    add_numbers: add_numbers.len(),
                });
            }
            Ok(ParsedChunk::Sub {
                chunk_number,
                entries: add_numbers.into_iter().zip(entries).collect(),
            })
        }
        other => Err(CodecError::UnknownChunkType(other)),
    }
}

fn read_varint(buf: &mut Bytes) -> Result<u64, CodecError> {
    let mut value: u64 = 0;
    for shift in 0..10 {
        if !buf.has_remaining() {
            return Err(CodecError::Truncated {
                expected: 1,
                available: 0,
            });
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << (shift * 7);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::MalformedVarint)
}

fn read_bytes(buf: &mut Bytes) -> Result<Bytes, CodecError> {
    let len = read_varint(buf)? as usize;
    if buf.remaining() < len {
        return Err(CodecError::Truncated {
            expected: len,
            available: buf.remaining(),
        });
    }
    Ok(buf.copy_to_bytes(len))
}

fn skip_field(buf: &mut Bytes, wire: u8) -> Result<(), CodecError> {
    match wire {
        WIRE_VARINT => {
            read_varint(buf)?;
        }
        WIRE_FIXED64 => {
            if buf.remaining() < 8 {
                return Err(CodecError::Truncated {
                    expected: 8,
                    available: buf.remaining(),
                });
            }
            buf.advance(8);
        }
        WIRE_LEN => {
            read_bytes(buf)?;
        }
        WIRE_FIXED32 => {
            if buf.remaining() < 4 {
                return Err(CodecError::Truncated {
                    expected: 4,
                    available: buf.remaining(),
                });
            }
            buf.advance(4);
        }
        _ => return Err(CodecError::MalformedVarint),
    }
    Ok(())
}

/// Encodes chunks into a redirect payload.
///
/// Every entry within one chunk must share the same length; the prefix
/// type is derived from the first entry.
pub fn encode_chunk_stream(chunks: &[ParsedChunk]) -> Vec<u8> {
    let mut out = BytesMut::new();
    for chunk in chunks {
        let body = encode_chunk_data(chunk);
        out.put_u32(body.len() as u32);
        out.put_slice(&body);
    }
    out.to_vec()
}

fn encode_chunk_data(chunk: &ParsedChunk) -> BytesMut {
    let mut body = BytesMut::new();
    match chunk {
        ParsedChunk::Add {
            chunk_number,
            prefixes,
        } => {
            put_varint_field(&mut body, 1, u64::from(*chunk_number));
            put_varint_field(&mut body, 2, CHUNK_TYPE_ADD);
            put_prefix_fields(&mut body, prefixes.iter());
        }
        ParsedChunk::Sub {
            chunk_number,
            entries,
        } => {
            put_varint_field(&mut body, 1, u64::from(*chunk_number));
            put_varint_field(&mut body, 2, CHUNK_TYPE_SUB);
            put_prefix_fields(&mut body, entries.iter().map(|(_, p)| p));
            let mut packed = BytesMut::new();
            for (add_number, _) in entries {
                put_varint(&mut packed, u64::from(*add_number));
            }
            put_varint(&mut body, 5 << 3 | u64::from(WIRE_LEN));
            put_varint(&mut body, packed.len() as u64);
            body.put_slice(&packed);
        }
    }
    body
}

fn put_prefix_fields<'a>(body: &mut BytesMut, entries: impl Iterator<Item = &'a PrefixData>) {
    let mut hashes = BytesMut::new();
    let mut entry_len = PREFIX_LEN;
    for entry in entries {
        debug_assert!(hashes.is_empty() || entry.as_bytes().len() == entry_len);
        entry_len = entry.as_bytes().len();
        hashes.put_slice(entry.as_bytes());
    }
    if entry_len == FULL_HASH_LEN {
        put_varint_field(body, 3, PREFIX_TYPE_32B);
    }
    put_varint(body, 4 << 3 | u64::from(WIRE_LEN));
    put_varint(body, hashes.len() as u64);
    body.put_slice(&hashes);
}

fn put_varint_field(body: &mut BytesMut, field: u64, value: u64) {
    put_varint(body, field << 3 | u64::from(WIRE_VARINT));
    put_varint(body, value);
}

fn put_varint(body: &mut BytesMut, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            body.put_u8(byte);
            return;
        }
        body.put_u8(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix(bytes: [u8; 4]) -> PrefixData {
        PrefixData::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_roundtrip_add_chunk() {
        let chunk = ParsedChunk::Add {
            chunk_number: 17,
            prefixes: vec![prefix([0xde, 0xad, 0xbe, 0xef])],
        };
        let encoded = encode_chunk_stream(std::slice::from_ref(&chunk));
        let decoded = parse_chunk_stream(&encoded).unwrap();
        assert_eq!(decoded, vec![chunk]);
    }

    #[test]
    fn test_roundtrip_sub_chunk() {
        let chunk = ParsedChunk::Sub {
            chunk_number: 9,
            entries: vec![(17, prefix([0xde, 0xad, 0xbe, 0xef]))],
        };
        let encoded = encode_chunk_stream(std::slice::from_ref(&chunk));
        let decoded = parse_chunk_stream(&encoded).unwrap();
        assert_eq!(decoded, vec![chunk]);
    }

    #[test]
    fn test_empty_chunk_announcement() {
        let chunk = ParsedChunk::Add {
            chunk_number: 42,
            prefixes: vec![],
        };
        let encoded = encode_chunk_stream(std::slice::from_ref(&chunk));
        let decoded = parse_chunk_stream(&encoded).unwrap();
        assert_eq!(decoded, vec![chunk]);
    }

    #[test]
    fn test_full_hash_entries() {
        let chunk = ParsedChunk::Add {
            chunk_number: 3,
            prefixes: vec![PrefixData::from_bytes(&[0xab; 32]).unwrap()],
        };
        let encoded = encode_chunk_stream(std::slice::from_ref(&chunk));
        let decoded = parse_chunk_stream(&encoded).unwrap();
        assert_eq!(decoded, vec![chunk]);
    }

    #[test]
    fn test_multiple_chunks_in_stream() {
        let chunks = vec![
            ParsedChunk::Add {
                chunk_number: 1,
                prefixes: vec![prefix([1, 2, 3, 4]), prefix([5, 6, 7, 8])],
            },
            ParsedChunk::Sub {
                chunk_number: 2,
                entries: vec![(1, prefix([1, 2, 3, 4]))],
            },
        ];
        let encoded = encode_chunk_stream(&chunks);
        assert_eq!(parse_chunk_stream(&encoded).unwrap(), chunks);
    }

    #[test]
    fn test_defaults_apply_when_fields_missing() {
        // Only field 1 (chunk number): type defaults to add, prefixes
        // default to none.
        let mut body = BytesMut::new();
        put_varint_field(&mut body, 1, 7);
        let mut framed = BytesMut::new();
        framed.put_u32(body.len() as u32);
        framed.put_slice(&body);

        let decoded = parse_chunk_stream(&framed).unwrap();
        assert_eq!(
            decoded,
            vec![ParsedChunk::Add {
                chunk_number: 7,
                prefixes: vec![],
            }]
        );
    }

    #[test]
    fn test_unknown_fields_skipped() {
        let mut body = BytesMut::new();
        put_varint_field(&mut body, 1, 7);
        // Unknown varint field 9 and unknown length-delimited field 10.
        put_varint_field(&mut body, 9, 12345);
        put_varint(&mut body, 10 << 3 | u64::from(WIRE_LEN));
        put_varint(&mut body, 3);
        body.put_slice(b"xyz");

        let mut framed = BytesMut::new();
        framed.put_u32(body.len() as u32);
        framed.put_slice(&body);

        let decoded = parse_chunk_stream(&framed).unwrap();
        assert_eq!(decoded[0].chunk_number(), 7);
    }

    #[test]
    fn test_unknown_chunk_type_rejected() {
        let mut body = BytesMut::new();
        put_varint_field(&mut body, 1, 7);
        put_varint_field(&mut body, 2, 4);
        let mut framed = BytesMut::new();
        framed.put_u32(body.len() as u32);
        framed.put_slice(&body);

        assert!(matches!(
            parse_chunk_stream(&framed),
            Err(CodecError::UnknownChunkType(4))
        ));
    }

    #[test]
    fn test_sub_count_mismatch_rejected() {
        let mut body = BytesMut::new();
        put_varint_field(&mut body, 1, 9);
        put_varint_field(&mut body, 2, CHUNK_TYPE_SUB);
        put_varint(&mut body, 4 << 3 | u64::from(WIRE_LEN));
        put_varint(&mut body, 4);
        body.put_slice(&[0xde, 0xad, 0xbe, 0xef]);
        // No add numbers.
        let mut framed = BytesMut::new();
        framed.put_u32(body.len() as u32);
        framed.put_slice(&body);

        assert!(matches!(
            parse_chunk_stream(&framed),
            Err(CodecError::SubCountMismatch {
                hashes: 1,
                add_numbers: 0,
            })
        ));
    }

    #[test]
    fn test_hash_length_mismatch_rejected() {
        let mut body = BytesMut::new();
        put_varint_field(&mut body, 1, 9);
        put_varint(&mut body, 4 << 3 | u64::from(WIRE_LEN));
        put_varint(&mut body, 5);
        body.put_slice(&[1, 2, 3, 4, 5]);
        let mut framed = BytesMut::new();
        framed.put_u32(body.len() as u32);
        framed.put_slice(&body);

        assert!(matches!(
            parse_chunk_stream(&framed),
            Err(CodecError::HashLengthMismatch { len: 5, size: 4 })
        ));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let chunk = ParsedChunk::Add {
            chunk_number: 1,
            prefixes: vec![prefix([1, 2, 3, 4])],
        };
        let mut encoded = encode_chunk_stream(std::slice::from_ref(&chunk));
        encoded.truncate(encoded.len() - 2);
        assert!(matches!(
            parse_chunk_stream(&encoded),
            Err(CodecError::Truncated { .. })
        ));
    }
}
