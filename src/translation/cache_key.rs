//! Cache key construction and cached entry format
//!
//! Keys are derived from a weak 32-bit multiplicative hash of the source
//! text. Collisions are possible, so every cached entry carries its source
//! text and lookups compare it before accepting a hit.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `h = h * 31 + c` over UTF-16 code units with 32-bit wrap, rendered as
/// base-36 of the absolute value
pub fn weak_hash(text: &str) -> String {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    to_base36(hash.unsigned_abs())
}

fn to_base36(mut value: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// `{prefix}:{source}:{target}:{hash}`
pub fn individual_key(prefix: &str, source: &str, target: &str, text: &str) -> String {
    format!("{}:{}:{}:{}", prefix, source, target, weak_hash(text))
}

/// `{prefix}:group:{source}:{target}`
pub fn group_key(prefix: &str, source: &str, target: &str) -> String {
    format!("{}:group:{}:{}", prefix, source, target)
}

/// `{prefix}:usage:{source}:{target}`
pub fn usage_key(prefix: &str, source: &str, target: &str) -> String {
    format!("{}:usage:{}:{}", prefix, source, target)
}

/// Language pair encoded in a usage key
pub fn parse_usage_key<'a>(prefix: &str, key: &'a str) -> Option<(&'a str, &'a str)> {
    let rest = key.strip_prefix(prefix)?.strip_prefix(":usage:")?;
    rest.split_once(':')
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTranslation {
    pub source_text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub translated_text: String,
    /// Unix milliseconds when the entry was written
    pub timestamp: i64,
    /// Unix milliseconds after which the entry is a miss
    pub expires_at: i64,
}

impl CachedTranslation {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    /// Usable for `text` at `now_ms`
    pub fn matches(&self, text: &str, now_ms: i64) -> bool {
        !self.is_expired(now_ms) && self.source_text == text
    }
}

/// All translations for one language pair, keyed by text hash
pub type GroupedCache = HashMap<String, CachedTranslation>;
