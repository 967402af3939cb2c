//! Compact text encoding for OSM tag collections.
//!
//! A tag collection is stored as a single string value on a record:
//! tags are sorted by key and rendered as `key:value`, joined with `|`.
//!
//! ```text
//! [("name", "Main St"), ("highway", "residential")]
//!     -> "highway:residential|name:Main St"
//! ```
//!
//! Neither `:` nor `|` is escaped. Decoding splits each token on its last
//! `:`, so namespaced keys like `addr:street` survive, but values containing
//! `:` and any text containing `|` do not round-trip.

use std::cmp::Ordering;

use log::info;

use crate::data::osm::Tag;

const TAG_SEPARATOR: char = '|';
const KEY_VALUE_SEPARATOR: char = ':';

/// Receives reports about tokens `decode_with` had to skip.
pub trait TagDiagnostics {
    fn malformed_token(&self, token: &str, tags: &str);
}

/// Reports malformed tokens through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl TagDiagnostics for LogDiagnostics {
    fn malformed_token(&self, token: &str, tags: &str) {
        info!(token = token, tags = tags; "Found tag token with no value");
    }
}

/// Orders tags by key alone.
///
/// A natural order over tags would compare values too and reorder entries
/// that share a key. Duplicate keys must keep the order they were given in,
/// so only the key takes part and the sort using this must be stable.
pub fn tag_key_order(left: &Tag, right: &Tag) -> Ordering {
    left.key.cmp(&right.key)
}

/// Encodes `tags` into a single string.
///
/// Returns `None` when `tags` is empty. Tags with an empty key are dropped;
/// if that removes every tag the result is `Some("")`, which callers should
/// treat as distinct from `None`.
pub fn encode<'a, I>(tags: I) -> Option<String>
where
    I: IntoIterator<Item = &'a Tag>,
{
    let mut sorted: Vec<&Tag> = tags.into_iter().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|left, right| tag_key_order(left, right));

    let mut encoded = String::new();
    for tag in sorted.into_iter().filter(|tag| !tag.key.is_empty()) {
        if !encoded.is_empty() {
            encoded.push(TAG_SEPARATOR);
        }
        encoded.push_str(&tag.key);
        encoded.push(KEY_VALUE_SEPARATOR);
        encoded.push_str(&tag.value);
    }
    Some(encoded)
}

/// Decodes a string produced by [`encode`], logging malformed tokens.
pub fn decode(encoded: Option<&str>) -> Vec<Tag> {
    decode_with(encoded, &LogDiagnostics)
}

/// Decodes `encoded`, reporting tokens without a `:` to `diagnostics`.
///
/// Each token is split on its last `:`. A token starting with `:` yields a
/// tag with an empty key. Empty tokens after the last tag (`"a:1|"`) are
/// ignored; an entirely empty string is reported as one empty token.
pub fn decode_with<D>(encoded: Option<&str>, diagnostics: &D) -> Vec<Tag>
where
    D: TagDiagnostics + ?Sized,
{
    let Some(encoded) = encoded else {
        return Vec::new();
    };

    let mut tokens: Vec<&str> = encoded.split(TAG_SEPARATOR).collect();
    // Trailing empty tokens are separator noise, not malformed tags.
    if tokens.len() > 1 {
        while tokens.last() == Some(&"") {
            tokens.pop();
        }
    }

    let mut tags = Vec::new();
    for token in tokens {
        match token.rfind(KEY_VALUE_SEPARATOR) {
            Some(idx) => tags.push(Tag::new(
                &token[..idx],
                &token[idx + KEY_VALUE_SEPARATOR.len_utf8()..],
            )),
            None => diagnostics.malformed_token(token, encoded),
        }
    }
    tags
}
