//! Search strings and query matching for catalog entries.

mod query;

pub use query::Query;

use crate::catalog::CatalogEntry;
use crate::utils::collapse_whitespace;

/// Separator between search string parts. Never produced by a query token.
pub const PART_SEPARATOR: char = '\u{b}';

/// Build the lower-cased text queries are matched against.
///
/// Parts: the translated full name, the original full name when it differs
/// ignoring case, the package GUID and, with `include_developer_info`, the
/// entry's developer strings. Empty parts are dropped and duplicates removed.
#[must_use]
pub fn build_search_string(entry: &CatalogEntry, include_developer_info: bool) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);

    let mut push = |raw: &str| {
        let part = collapse_whitespace(raw).to_lowercase();
        if !part.is_empty() && !parts.contains(&part) {
            parts.push(part);
        }
    };

    push(entry.full_name());

    if entry.original_full_name().to_lowercase() != entry.full_name().to_lowercase() {
        push(entry.original_full_name());
    }

    if let Some(guid) = entry.zipmod_guid() {
        push(guid);
    }

    if include_developer_info {
        for part in entry.developer_strings() {
            push(&part);
        }
    }

    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(PART_SEPARATOR);
        }
        out.push_str(part);
    }
    out
}

/// Match `raw_query` against an entry's current search string.
#[must_use]
pub fn matches(entry: &CatalogEntry, raw_query: &str) -> bool {
    Query::parse(raw_query).matches(entry.search_string())
}
