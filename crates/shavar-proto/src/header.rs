//! Update-response header parsing.
//!
//! The downloads endpoint answers with ASCII directives, one per
//! whitespace-separated token:
//!
//! ```text
//! n:1200
//! i:goog-malware-shavar
//! u:cache.example/chunks
//! ad:1-3,5
//! sd:2
//! r:pleasereset
//! ```
//!
//! `n:` sets the minimum wait before the next poll; `i:` opens a list
//! scope that the remaining directive kinds attach to.

use shavar_core::{ChunkRanges, ListName};

use crate::CodecError;

/// Directives for a single list from one update response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDirectives {
    /// The list the directives apply to.
    pub list: ListName,
    /// Redirect URLs holding binary chunk payloads, in response order.
    pub redirects: Vec<String>,
    /// Add-chunk numbers the server asks the client to drop.
    pub delete_adds: ChunkRanges,
    /// Sub-chunk numbers the server asks the client to drop.
    pub delete_subs: ChunkRanges,
    /// True when the server demanded a full reset of the list.
    pub reset: bool,
}

impl ListDirectives {
    fn new(list: ListName) -> Self {
        Self {
            list,
            redirects: Vec::new(),
            delete_adds: ChunkRanges::new(),
            delete_subs: ChunkRanges::new(),
            reset: false,
        }
    }
}

/// Parsed update-response header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateDirectives {
    /// Server-requested minimum wait before the next poll, seconds.
    pub next_poll_secs: Option<u32>,
    /// Per-list directives in response order.
    pub lists: Vec<ListDirectives>,
}

impl UpdateDirectives {
    /// Returns the directives for a list, if the response mentioned it.
    pub fn for_list(&self, list: &ListName) -> Option<&ListDirectives> {
        self.lists.iter().find(|d| &d.list == list)
    }
}

/// Parses an update-response header.
///
/// Unknown directive kinds are skipped for forward compatibility;
/// malformed tokens and list-scoped directives outside an `i:` scope
/// are errors.
pub fn parse_update_response(text: &str) -> Result<UpdateDirectives, CodecError> {
    let mut out = UpdateDirectives::default();
    let mut current: Option<ListDirectives> = None;

    for token in text.split_whitespace() {
        let (key, value) = token
            .split_once(':')
            .ok_or_else(|| CodecError::MalformedDirective(token.to_string()))?;

        match key {
            "n" => {
                let secs = value.parse::<u32>().map_err(|_| CodecError::InvalidNumber {
                    context: "n: directive",
                    value: value.to_string(),
                })?;
                out.next_poll_secs = Some(secs);
            }
            "i" => {
                if let Some(done) = current.take() {
                    out.lists.push(done);
                }
                current = Some(ListDirectives::new(ListName::new(value)?));
            }
            "u" => {
                let scope = scoped(&mut current, token)?;
                // A reset discards the list's pending redirects.
                if !scope.reset {
                    scope.redirects.push(value.to_string());
                }
            }
            "ad" => {
                let ranges = ChunkRanges::parse(value)?;
                let scope = scoped(&mut current, token)?;
                for n in ranges.iter() {
                    scope.delete_adds.insert(n);
                }
            }
            "sd" => {
                let ranges = ChunkRanges::parse(value)?;
                let scope = scoped(&mut current, token)?;
                for n in ranges.iter() {
                    scope.delete_subs.insert(n);
                }
            }
            "r" => {
                if value != "pleasereset" {
                    return Err(CodecError::MalformedDirective(token.to_string()));
                }
                let scope = scoped(&mut current, token)?;
                scope.reset = true;
                scope.redirects.clear();
            }
            _ => {}
        }
    }

    if let Some(done) = current.take() {
        out.lists.push(done);
    }
    Ok(out)
}

fn scoped<'a>(
    current: &'a mut Option<ListDirectives>,
    token: &str,
) -> Result<&'a mut ListDirectives, CodecError> {
    current
        .as_mut()
        .ok_or_else(|| CodecError::DirectiveOutsideList(token.to_string()))
}
