//! Pure field parsers shared by all source extractors.
//!
//! Every function here is total: unparseable input yields `None` or an empty
//! value, never an error or a panic.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config;
use crate::model::{PropertyType, Source};

/// Trim and collapse whitespace runs to single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// German thousands grouping: "1.200", "1.234.567".
static THOUSANDS_GROUPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:\.\d{3})+$").unwrap());

/// Parse a price out of text like "1.234,56 €" or "650 € VB".
///
/// A comma is the decimal separator and dots are thousands grouping;
/// dots-only groups of three ("1.200") count as thousands too. Anything
/// that fails to parse after cleanup is `None`, as are negative values.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if THOUSANDS_GROUPED.is_match(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };
    let value = normalized.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:m²|m2|qm|quadratmeter)").unwrap());

/// Extract a living area in m² from text like "54 m²" or "ca. 60qm".
pub fn parse_size(text: &str) -> Option<f64> {
    let caps = SIZE_RE.captures(text)?;
    let value = caps[1].replace(',', ".").parse::<f64>().ok()?;
    (value > 0.0).then_some(value)
}

static ROOMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)[\s-]*(?:zimmer|räume|raum|rooms?)").unwrap());

/// Extract a room count from text like "2 Zimmer" or "2,5-Raum-Wohnung".
pub fn parse_rooms(text: &str) -> Option<f64> {
    let caps = ROOMS_RE.captures(text)?;
    let value = caps[1].replace(',', ".").parse::<f64>().ok()?;
    (value > 0.0).then_some(value)
}

const ROOM_KEYWORDS: &[&str] = &["zimmer", "wg", "flatshare"];
const HOUSE_KEYWORDS: &[&str] = &["haus", "house"];
const COMMERCIAL_KEYWORDS: &[&str] = &["büro", "office", "gewerbe"];

/// Keyword classification over title and description. The first matching
/// bucket wins: flatshare terms beat house terms beat commercial terms.
pub fn classify_property_type(title: &str, description: &str) -> PropertyType {
    let haystack = format!("{title} {description}").to_lowercase();
    if ROOM_KEYWORDS.iter().any(|k| haystack.contains(k)) {
        PropertyType::Room
    } else if HOUSE_KEYWORDS.iter().any(|k| haystack.contains(k)) {
        PropertyType::House
    } else if COMMERCIAL_KEYWORDS.iter().any(|k| haystack.contains(k)) {
        PropertyType::Commercial
    } else {
        PropertyType::Apartment
    }
}

/// Keep string entries only, make protocol-relative URLs absolute, drop
/// duplicates (first occurrence wins) and cap the result.
pub fn normalize_images(candidates: &[Value]) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for value in candidates {
        let Some(s) = value.as_str() else { continue };
        if s.is_empty() {
            continue;
        }
        let url = if let Some(rest) = s.strip_prefix("//") {
            format!("https://{rest}")
        } else {
            s.to_string()
        };
        if !images.contains(&url) {
            images.push(url);
        }
        if images.len() == config::MAX_IMAGES {
            break;
        }
    }
    images
}

/// Deterministic content-derived id: the same source and basis always hash
/// to the same id, and two sources never share one.
pub fn hash_id(source: Source, basis: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(basis.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..config::HASH_ID_LEN].to_string()
}

/// Last-resort id for records carrying nothing stable to hash. Fresh on
/// every call, so the same record gets a new id each run and deduplication
/// is lost for it.
pub fn synthetic_id() -> String {
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4()
    )
}
