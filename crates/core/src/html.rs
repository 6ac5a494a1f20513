//! Small helpers for scraping HTML with regular expressions.

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Decode named and numeric HTML entities in one left-to-right pass.
///
/// Decoded text is never scanned again, so `&amp;lt;` yields `&lt;`.
/// Unknown names are kept verbatim.
pub(crate) fn decode_entities(value: &str) -> String {
    ENTITY
        .replace_all(value, |caps: &Captures<'_>| {
            decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(numeric) = name.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let decoded = match name {
        "amp" => "&",
        "quot" => "\"",
        "apos" => "'",
        "lt" => "<",
        "gt" => ">",
        "nbsp" => " ",
        _ => return None,
    };
    Some(decoded.to_string())
}

/// Text content of an HTML fragment: tags removed, whitespace collapsed,
/// entities decoded.
pub(crate) fn text_content(fragment: &str) -> String {
    let without_tags = TAG.replace_all(fragment, " ");
    let collapsed = WHITESPACE.replace_all(&without_tags, " ");
    decode_entities(collapsed.trim())
}
