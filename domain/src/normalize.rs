//! Normalization of resolution provider input and output.
//!
//! The provider answers with one entry per platform, and the entry shape is
//! not consistent: sometimes a bare URL string, sometimes an object with a
//! `url` field, and sometimes with trailing semicolons. Everything is parsed
//! into `RawPlatformLink` first and reduced to a bare URL here.

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::validate::split_http_url;
use crate::PlatformId;

/// One `linksByPlatform` entry as sent by the provider.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawPlatformLink {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
    Other(IgnoredAny),
}

/// Reduce one provider entry to a bare URL, or `None` if nothing usable is left.
pub fn normalize_platform_link(raw: &RawPlatformLink) -> Option<String> {
    let candidate = match raw {
        RawPlatformLink::Url(s) => s.as_str(),
        RawPlatformLink::Object { url: Some(s) } => s.as_str(),
        RawPlatformLink::Object { url: None } | RawPlatformLink::Other(_) => return None,
    };
    let cleaned = candidate.trim().trim_end_matches(';').trim_end();
    if cleaned.is_empty() || split_http_url(cleaned).is_none() {
        return None;
    }
    Some(cleaned.to_string())
}

/// Normalize the whole `linksByPlatform` map, dropping unusable entries.
/// When two provider keys fold onto the same platform the first usable one
/// in key order is kept.
pub fn normalize_links_by_platform(
    raw: &BTreeMap<String, RawPlatformLink>,
) -> BTreeMap<PlatformId, String> {
    let mut out = BTreeMap::new();
    for (key, entry) in raw {
        if key.trim().is_empty() {
            continue;
        }
        if let Some(url) = normalize_platform_link(entry) {
            out.entry(PlatformId::from_key(key)).or_insert(url);
        }
    }
    out
}

/// Clean up a source URL before it is sent to the provider. Spotify share
/// links carry `?si=` tracking suffixes that break provider matching.
pub fn normalize_source_url(source: &str) -> String {
    let trimmed = source.trim();
    let is_spotify = split_http_url(trimmed)
        .is_some_and(|p| p.host == "spotify.com" || p.host.ends_with(".spotify.com"));
    if !is_spotify {
        return trimmed.to_string();
    }
    let end = trimmed
        .find(|c| matches!(c, '?' | '#'))
        .unwrap_or(trimmed.len());
    trimmed[..end].to_string()
}
