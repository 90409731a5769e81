//! Format validation for operator input. Keep logic minimal and deterministic;
//! nothing here touches the network.
//!
//! `validate` classifies a raw search input into ISRC, UPC or platform URL.
//! Rules are checked in order and the first match wins.

use crate::{InputKind, PlatformId, Slug, TrackingIds, ValidationError};

const MAX_URL_LEN: usize = 2048;

/// Classified search input. The invalid case is `Err(ValidationError)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceInput {
    Isrc(String),
    Upc(String),
    Url {
        value: String,
        platform_hint: Option<PlatformId>,
    },
}

impl SourceInput {
    pub fn kind(&self) -> InputKind {
        match self {
            SourceInput::Isrc(_) => InputKind::Isrc,
            SourceInput::Upc(_) => InputKind::Upc,
            SourceInput::Url { .. } => InputKind::Url,
        }
    }

    /// Normalized value sent to the resolution provider.
    pub fn value(&self) -> &str {
        match self {
            SourceInput::Isrc(v) | SourceInput::Upc(v) => v,
            SourceInput::Url { value, .. } => value,
        }
    }

    pub fn platform_hint(&self) -> Option<&PlatformId> {
        match self {
            SourceInput::Url { platform_hint, .. } => platform_hint.as_ref(),
            _ => None,
        }
    }
}

/// Classify a raw operator input.
pub fn validate(input: &str) -> Result<SourceInput, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    if is_isrc(trimmed) {
        return Ok(SourceInput::Isrc(trimmed.to_ascii_uppercase()));
    }
    if is_upc(trimmed) {
        return Ok(SourceInput::Upc(trimmed.to_string()));
    }
    if let Some(parts) = split_http_url(trimmed) {
        return Ok(SourceInput::Url {
            value: trimmed.to_string(),
            platform_hint: detect_platform(&parts),
        });
    }
    Err(ValidationError::UnsupportedFormat)
}

/// ISRC: 2 letters, 3 alphanumerics, 7 digits. Case-insensitive.
pub fn is_isrc(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 12
        && b[..2].iter().all(u8::is_ascii_alphabetic)
        && b[2..5].iter().all(u8::is_ascii_alphanumeric)
        && b[5..].iter().all(u8::is_ascii_digit)
}

/// UPC-A (12) or EAN-13 (13) digits.
pub fn is_upc(s: &str) -> bool {
    (12..=13).contains(&s.len()) && s.bytes().all(|c| c.is_ascii_digit())
}

/// Validate a URL typed by the operator for a manual platform row.
pub fn validate_manual_url(s: &str) -> Result<String, ValidationError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidUrl("empty".into()));
    }
    if trimmed.len() > MAX_URL_LEN {
        return Err(ValidationError::InvalidUrl("too long".into()));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidUrl("contains whitespace".into()));
    }
    if split_http_url(trimmed).is_none() {
        return Err(ValidationError::InvalidUrl(
            "must start with http:// or https:// and name a host".into(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate a custom track slug; lowercased, 3-64 chars of `[a-z0-9_-]`.
pub fn validate_custom_slug(s: &str) -> Result<Slug, ValidationError> {
    let lowered = s.trim().to_ascii_lowercase();
    if lowered.len() < 3 || lowered.len() > 64 {
        return Err(ValidationError::InvalidSlug(
            "must be 3-64 characters".into(),
        ));
    }
    Slug::new(lowered).map_err(|e| ValidationError::InvalidSlug(e.to_string()))
}

/// `#rgb` or `#rrggbb`.
pub fn validate_color(s: &str) -> Result<String, ValidationError> {
    let trimmed = s.trim();
    let ok = trimmed
        .strip_prefix('#')
        .is_some_and(|hex| (hex.len() == 3 || hex.len() == 6) && hex.bytes().all(|c| c.is_ascii_hexdigit()));
    if ok {
        Ok(trimmed.to_ascii_lowercase())
    } else {
        Err(ValidationError::InvalidColor(trimmed.to_string()))
    }
}

/// Trim every identifier, drop blanks and check the well-known prefixes.
pub fn validate_tracking_ids(ids: &TrackingIds) -> Result<TrackingIds, ValidationError> {
    Ok(TrackingIds {
        ga4_id: tracking_field(&ids.ga4_id, "ga4Id", Some("G-"))?,
        gtm_id: tracking_field(&ids.gtm_id, "gtmId", Some("GTM-"))?,
        meta_pixel_id: tracking_field(&ids.meta_pixel_id, "metaPixelId", None)?,
        tiktok_pixel_id: tracking_field(&ids.tiktok_pixel_id, "tiktokPixelId", None)?,
        google_ads_id: tracking_field(&ids.google_ads_id, "googleAdsId", Some("AW-"))?,
    })
}

fn tracking_field(
    value: &Option<String>,
    field: &'static str,
    prefix: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    let Some(raw) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let body = match prefix {
        Some(p) => {
            let upper = raw.to_ascii_uppercase();
            if !upper.starts_with(p) {
                return Err(ValidationError::InvalidTrackingId {
                    field,
                    reason: format!("must start with {}", p),
                });
            }
            raw[p.len()..].to_string()
        }
        None => raw.to_string(),
    };
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidTrackingId {
            field,
            reason: "must be alphanumeric".into(),
        });
    }
    Ok(Some(match prefix {
        Some(p) => format!("{}{}", p, body.to_ascii_uppercase()),
        None => body,
    }))
}

/// Pieces of an http(s) URL; enough for shape matching, nothing more.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct UrlParts<'a> {
    /// Lowercased, without `www.` and port.
    pub host: String,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

pub(crate) fn split_http_url(s: &str) -> Option<UrlParts<'_>> {
    let rest = strip_prefix_ignore_case(s, "https://")
        .or_else(|| strip_prefix_ignore_case(s, "http://"))?;
    let host_end = rest
        .find(|c| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let authority = &rest[..host_end];
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }
    let tail = &rest[host_end..];
    let tail = tail.split('#').next().unwrap_or(tail);
    let (path, query) = match tail.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (tail, None),
    };
    Some(UrlParts { host, path, query })
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn query_has(query: Option<&str>, key: &str) -> bool {
    query.is_some_and(|q| {
        q.split('&').any(|pair| {
            let mut it = pair.splitn(2, '=');
            it.next() == Some(key) && it.next().is_some_and(|v| !v.is_empty())
        })
    })
}

fn detect_platform(parts: &UrlParts<'_>) -> Option<PlatformId> {
    let segs = segments(parts.path);
    match parts.host.as_str() {
        "open.spotify.com" => {
            let skip = usize::from(segs.first().is_some_and(|s| s.starts_with("intl-")));
            match &segs[skip..] {
                [kind, id, ..]
                    if matches!(*kind, "track" | "album" | "playlist")
                        && id.chars().all(|c| c.is_ascii_alphanumeric()) =>
                {
                    Some(PlatformId::Spotify)
                }
                _ => None,
            }
        }
        "music.apple.com" => match segs.as_slice() {
            [country, kind, _, ..]
                if country.len() == 2 && matches!(*kind, "album" | "song" | "playlist") =>
            {
                Some(PlatformId::AppleMusic)
            }
            _ => None,
        },
        "music.youtube.com" => {
            let watch = segs.as_slice() == ["watch"] && query_has(parts.query, "v");
            let playlist = segs.as_slice() == ["playlist"] && query_has(parts.query, "list");
            (watch || playlist).then_some(PlatformId::YoutubeMusic)
        }
        "deezer.com" => {
            let skip = usize::from(
                segs.first()
                    .is_some_and(|s| s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic())),
            );
            match &segs[skip..] {
                [kind, id]
                    if matches!(*kind, "track" | "album" | "playlist")
                        && !id.is_empty()
                        && id.chars().all(|c| c.is_ascii_digit()) =>
                {
                    Some(PlatformId::Deezer)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isrc_shape_wins_first() {
        assert_eq!(
            validate("USRC17607839"),
            Ok(SourceInput::Isrc("USRC17607839".into()))
        );
        assert_eq!(
            validate("  gbaye0601498 "),
            Ok(SourceInput::Isrc("GBAYE0601498".into()))
        );
        assert!(validate("US-RC1-76-07839").is_err());
    }

    #[test]
    fn upc_is_12_or_13_digits() {
        assert_eq!(validate("602547924032").unwrap().kind(), InputKind::Upc);
        assert_eq!(validate("0602547924032").unwrap().kind(), InputKind::Upc);
        assert!(validate("60254792403").is_err());
        assert!(validate("06025479240321").is_err());
    }

    #[test]
    fn isrc_and_upc_are_exclusive() {
        // A 12-digit string has no leading letters, so it is never an ISRC.
        assert!(!is_isrc("123456789012"));
        assert!(!is_upc("US1234567890"));
    }

    #[test]
    fn known_platform_urls_get_hints() {
        let cases = [
            ("https://open.spotify.com/track/abc123?si=xyz", PlatformId::Spotify),
            ("https://open.spotify.com/intl-de/album/4aawyAB9vmqN3uQ7FjRGTy", PlatformId::Spotify),
            ("https://music.apple.com/us/album/random-access-memories/617154241?i=617154366", PlatformId::AppleMusic),
            ("https://music.youtube.com/watch?v=FGBhQbmPwH8", PlatformId::YoutubeMusic),
            ("https://music.youtube.com/playlist?list=OLAK5uy_abc", PlatformId::YoutubeMusic),
            ("https://www.deezer.com/fr/track/67238735", PlatformId::Deezer),
            ("https://deezer.com/album/6575789", PlatformId::Deezer),
        ];
        for (input, expected) in cases {
            let parsed = validate(input).unwrap_or_else(|e| panic!("{input}: {e}"));
            assert_eq!(parsed.platform_hint(), Some(&expected), "{input}");
        }
    }

    #[test]
    fn other_http_urls_have_no_hint() {
        let parsed = validate("https://tidal.com/browse/track/77646168").unwrap();
        assert_eq!(parsed.kind(), InputKind::Url);
        assert_eq!(parsed.platform_hint(), None);
        // Right host, wrong shape: still attempted, but without a hint.
        let parsed = validate("https://open.spotify.com/user/someone").unwrap();
        assert_eq!(parsed.platform_hint(), None);
    }

    #[test]
    fn rejects_blank_and_unsupported() {
        assert_eq!(validate(""), Err(ValidationError::Empty));
        assert_eq!(validate("   \t"), Err(ValidationError::Empty));
        assert_eq!(validate("daft punk"), Err(ValidationError::UnsupportedFormat));
        assert_eq!(validate("ftp://example.com"), Err(ValidationError::UnsupportedFormat));
        assert_eq!(validate("https://"), Err(ValidationError::UnsupportedFormat));
    }

    #[test]
    fn manual_urls_require_http_and_host() {
        assert!(validate_manual_url("https://tidal.com/track/1").is_ok());
        assert!(validate_manual_url("tidal.com/track/1").is_err());
        assert!(validate_manual_url("https://exa mple.com").is_err());
    }

    #[test]
    fn colors_and_slugs() {
        assert_eq!(validate_color("#FFAA00").unwrap(), "#ffaa00");
        assert!(validate_color("#fa0").is_ok());
        assert!(validate_color("red").is_err());
        assert_eq!(validate_custom_slug("My-Remix").unwrap().as_str(), "my-remix");
        assert!(validate_custom_slug("ab").is_err());
        assert!(validate_custom_slug("no spaces").is_err());
    }

    #[test]
    fn tracking_ids_are_trimmed_and_checked() {
        let ids = TrackingIds {
            ga4_id: Some(" g-abc123 ".into()),
            gtm_id: Some("".into()),
            meta_pixel_id: Some("1234567890".into()),
            ..Default::default()
        };
        let out = validate_tracking_ids(&ids).unwrap();
        assert_eq!(out.ga4_id.as_deref(), Some("G-ABC123"));
        assert_eq!(out.gtm_id, None);
        assert_eq!(out.meta_pixel_id.as_deref(), Some("1234567890"));

        let bad = TrackingIds {
            gtm_id: Some("UA-1".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_tracking_ids(&bad),
            Err(ValidationError::InvalidTrackingId { field: "gtmId", .. })
        ));
    }
}
