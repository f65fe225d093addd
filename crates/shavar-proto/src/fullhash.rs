//! Full-hash request and response codec.
//!
//! The request body is a size header followed by the raw candidate
//! prefixes:
//!
//! ```text
//! 4:16
//! <16 bytes: four 4-byte prefixes>
//! ```
//!
//! The response opens with a cache lifetime in seconds, then zero or
//! more blocks of `LIST:HASHSIZE:NUMRESPONSES[:m]` headers each
//! followed by `NUMRESPONSES * HASHSIZE` bytes of hashes and, when the
//! `:m` flag is present, one length-prefixed metadata blob per hash.
//! An empty body after the lifetime line means no match.

use bytes::{Buf, Bytes};
use shavar_core::{FullHash, ListName, Prefix, FULL_HASH_LEN, PREFIX_LEN};

use crate::CodecError;

/// Parsed full-hash response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullHashResponse {
    /// Server-declared cache lifetime for the returned hashes, seconds.
    pub cache_lifetime_secs: u32,
    /// Returned hashes, tagged with the list they belong to.
    pub hashes: Vec<(ListName, FullHash)>,
}

/// Encodes a gethash request body for a batch of prefixes.
pub fn encode_gethash_body(prefixes: &[Prefix]) -> Vec<u8> {
    let total = prefixes.len() * PREFIX_LEN;
    let mut body = format!("{PREFIX_LEN}:{total}\n").into_bytes();
    for prefix in prefixes {
        body.extend_from_slice(prefix.as_bytes());
    }
    body
}

/// Parses a gethash response body.
pub fn parse_gethash_response(payload: &[u8]) -> Result<FullHashResponse, CodecError> {
    let mut buf = Bytes::copy_from_slice(payload);
    let lifetime_line = read_line(&mut buf)?;
    let cache_lifetime_secs =
        lifetime_line
            .trim()
            .parse::<u32>()
            .map_err(|_| CodecError::InvalidNumber {
                context: "cache lifetime",
                value: lifetime_line.clone(),
            })?;

    let mut out = FullHashResponse {
        cache_lifetime_secs,
        hashes: Vec::new(),
    };

    while buf.has_remaining() {
        let header = read_line(&mut buf)?;
        let mut parts = header.trim().split(':');
        let list = parts
            .next()
            .ok_or_else(|| CodecError::MalformedDirective(header.clone()))?;
        let list = ListName::new(list)?;
        let hash_size = parse_field(&mut parts, "hash size", &header)?;
        let count = parse_field(&mut parts, "response count", &header)?;
        let has_metadata = match parts.next() {
            None => false,
            Some("m") => true,
            Some(_) => return Err(CodecError::MalformedDirective(header.clone())),
        };

        if hash_size != FULL_HASH_LEN {
            return Err(CodecError::UnexpectedHashSize(hash_size));
        }
        let data_len = hash_size * count;
        if buf.remaining() < data_len {
            return Err(CodecError::Truncated {
                expected: data_len,
                available: buf.remaining(),
            });
        }
        let data = buf.copy_to_bytes(data_len);
        for entry in data.chunks(hash_size) {
            let hash = FullHash::from_slice(entry).expect("entry length checked");
            out.hashes.push((list.clone(), hash));
        }

        if has_metadata {
            // Response metadata is not persisted; skip one blob per hash.
            for _ in 0..count {
                let len_line = read_line(&mut buf)?;
                let len = len_line.trim().parse::<usize>().map_err(|_| {
                    CodecError::InvalidNumber {
                        context: "metadata length",
                        value: len_line.clone(),
                    }
                })?;
                if buf.remaining() < len {
                    return Err(CodecError::Truncated {
                        expected: len,
                        available: buf.remaining(),
                    });
                }
                buf.advance(len);
            }
        }
    }
    Ok(out)
}

fn parse_field(
    parts: &mut std::str::Split<'_, char>,
    context: &'static str,
    header: &str,
) -> Result<usize, CodecError> {
    let field = parts
        .next()
        .ok_or_else(|| CodecError::MalformedDirective(header.to_string()))?;
    field.parse::<usize>().map_err(|_| CodecError::InvalidNumber {
        context,
        value: field.to_string(),
    })
}

fn read_line(buf: &mut Bytes) -> Result<String, CodecError> {
    let end = buf
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(CodecError::Truncated {
            expected: 1,
            available: 0,
        })?;
    let line = buf.copy_to_bytes(end);
    buf.advance(1);
    String::from_utf8(line.to_vec())
        .map_err(|e| CodecError::MalformedDirective(String::from_utf8_lossy(e.as_bytes()).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(name: &str) -> ListName {
        ListName::new(name).unwrap()
    }

    #[test]
    fn test_encode_gethash_body() {
        let prefixes = vec![
            Prefix::new([0xde, 0xad, 0xbe, 0xef]),
            Prefix::new([1, 2, 3, 4]),
        ];
        let body = encode_gethash_body(&prefixes);
        assert!(body.starts_with(b"4:8\n"));
        assert_eq!(&body[4..8], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(&body[8..12], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_no_match() {
        let parsed = parse_gethash_response(b"900\n").unwrap();
        assert_eq!(parsed.cache_lifetime_secs, 900);
        assert!(parsed.hashes.is_empty());
    }

    #[test]
    fn test_parse_single_block() {
        let mut body = b"900\ngoog-malware-shavar:32:2\n".to_vec();
        body.extend_from_slice(&[0xaa; 32]);
        body.extend_from_slice(&[0xbb; 32]);

        let parsed = parse_gethash_response(&body).unwrap();
        assert_eq!(parsed.cache_lifetime_secs, 900);
        assert_eq!(parsed.hashes.len(), 2);
        assert_eq!(
            parsed.hashes[0],
            (list("goog-malware-shavar"), FullHash::new([0xaa; 32]))
        );
        assert_eq!(
            parsed.hashes[1],
            (list("goog-malware-shavar"), FullHash::new([0xbb; 32]))
        );
    }

    #[test]
    fn test_parse_multiple_blocks() {
        let mut body = b"600\nlist-a:32:1\n".to_vec();
        body.extend_from_slice(&[0x11; 32]);
        body.extend_from_slice(b"list-b:32:1\n");
        body.extend_from_slice(&[0x22; 32]);

        let parsed = parse_gethash_response(&body).unwrap();
        assert_eq!(parsed.hashes.len(), 2);
        assert_eq!(parsed.hashes[0].0, list("list-a"));
        assert_eq!(parsed.hashes[1].0, list("list-b"));
    }

    #[test]
    fn test_parse_metadata_skipped() {
        let mut body = b"600\nlist-a:32:2:m\n".to_vec();
        body.extend_from_slice(&[0x11; 32]);
        body.extend_from_slice(&[0x22; 32]);
        body.extend_from_slice(b"5\n");
        body.extend_from_slice(b"meta1");
        body.extend_from_slice(b"3\n");
        body.extend_from_slice(b"abc");

        let parsed = parse_gethash_response(&body).unwrap();
        assert_eq!(parsed.hashes.len(), 2);
    }

    #[test]
    fn test_truncated_hash_data_rejected() {
        let mut body = b"600\nlist-a:32:2\n".to_vec();
        body.extend_from_slice(&[0x11; 32]);
        // Second hash missing.
        assert!(matches!(
            parse_gethash_response(&body),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_unexpected_hash_size_rejected() {
        let mut body = b"600\nlist-a:16:1\n".to_vec();
        body.extend_from_slice(&[0x11; 16]);
        assert!(matches!(
            parse_gethash_response(&body),
            Err(CodecError::UnexpectedHashSize(16))
        ));
    }

    #[test]
    fn test_bad_lifetime_rejected() {
        assert!(matches!(
            parse_gethash_response(b"soon\n"),
            Err(CodecError::InvalidNumber { .. })
        ));
    }
}
