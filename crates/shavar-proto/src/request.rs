//! Downloads request body composition.
//!
//! One request covers one list:
//!
//! ```text
//! goog-malware-shavar;a:1-3,5:s:2-7
//! ```
//!
//! The body, trailing newline included, must not exceed the size cap.
//! When the compact range strings overflow it, trailing ranges are
//! folded so the body still declares the true maximum chunk number the
//! client holds; omitted intermediate chunks are simply re-offered by
//! the server.

use shavar_core::{ChunkRanges, ListName, MAX_REQUEST_BODY_LEN};

use crate::CodecError;

/// Composes the request body for one list's downloads poll.
pub fn compose_download_body(
    list: &ListName,
    add_ranges: &ChunkRanges,
    sub_ranges: &ChunkRanges,
) -> Result<String, CodecError> {
    let mut add_str = add_ranges.to_string();
    let mut sub_str = sub_ranges.to_string();

    if body_len(list, &add_str, &sub_str) > MAX_REQUEST_BODY_LEN {
        // The rightmost range string gives way first.
        if !sub_str.is_empty() {
            let overhead = body_len(list, &add_str, &sub_str) - sub_str.len();
            let budget = MAX_REQUEST_BODY_LEN.saturating_sub(overhead);
            sub_str = sub_ranges
                .format_within(budget)
                .unwrap_or_else(|| fold_fully(sub_ranges));
        }
        if body_len(list, &add_str, &sub_str) > MAX_REQUEST_BODY_LEN && !add_str.is_empty() {
            let overhead = body_len(list, &add_str, &sub_str) - add_str.len();
            let budget = MAX_REQUEST_BODY_LEN.saturating_sub(overhead);
            add_str = add_ranges
                .format_within(budget)
                .unwrap_or_else(|| fold_fully(add_ranges));
        }
        if body_len(list, &add_str, &sub_str) > MAX_REQUEST_BODY_LEN {
            return Err(CodecError::RequestOverflow(MAX_REQUEST_BODY_LEN));
        }
    }

    let mut body = format!("{list};");
    if !add_str.is_empty() {
        body.push_str("a:");
        body.push_str(&add_str);
    }
    if !sub_str.is_empty() {
        if !add_str.is_empty() {
            body.push(':');
        }
        body.push_str("s:");
        body.push_str(&sub_str);
    }
    body.push('\n');
    Ok(body)
}

/// Smallest representation that still declares the maximum: a single
/// folded range.
fn fold_fully(ranges: &ChunkRanges) -> String {
    match (ranges.iter().next(), ranges.max()) {
        (Some(lo), Some(hi)) if lo != hi => format!("{lo}-{hi}"),
        (Some(lo), _) => format!("{lo}"),
        _ => String::new(),
    }
}

fn body_len(list: &ListName, add_str: &str, sub_str: &str) -> usize {
    let mut len = list.as_str().len() + 2; // ';' and '\n'
    if !add_str.is_empty() {
        len += 2 + add_str.len();
    }
    if !sub_str.is_empty() {
        if !add_str.is_empty() {
            len += 1;
        }
        len += 2 + sub_str.len();
    }
    len
}
