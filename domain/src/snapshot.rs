//! Static snapshot generation.
//!
//! A snapshot is a small self-contained HTML document carrying Open Graph
//! and Twitter card tags for one SmartLink, plus a visible fallback link and
//! a delayed client-side redirect into the canonical route. Link-preview
//! crawlers read the tags and never run the timer; people get forwarded.
//!
//! Output depends only on the input and the config, so regenerating always
//! yields the same bytes.

use std::time::Duration;

use crate::redirect::canonical_path;
use crate::slug::slugify_or;
use crate::{ShortId, Slug, SmartLink, SnapshotError, StaticSnapshot};

pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(2000);
pub const OG_IMAGE_WIDTH: u32 = 1200;
pub const OG_IMAGE_HEIGHT: u32 = 630;

/// Site-wide settings for snapshot rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// Public origin of the SPA, e.g. `https://links.example.com`.
    pub site_base_url: String,
    /// Path prefix under which snapshots are served, e.g. `/s`.
    pub snapshot_path_prefix: String,
    /// Delay before the client-side redirect fires.
    pub redirect_delay: Duration,
    pub site_name: String,
    /// Image used when a SmartLink has no cover.
    pub fallback_image_url: Option<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            site_base_url: String::new(),
            snapshot_path_prefix: "/s".into(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            site_name: "SmartLink".into(),
            fallback_image_url: None,
        }
    }
}

impl SnapshotConfig {
    /// Stable public URL of the snapshot for `short_id`.
    pub fn snapshot_url(&self, short_id: &ShortId) -> String {
        format!(
            "{}{}/{}",
            self.site_base_url.trim_end_matches('/'),
            self.snapshot_path_prefix.trim_end_matches('/'),
            short_id.as_str()
        )
    }

    /// Absolute URL for an in-app path.
    pub fn absolute(&self, path: &str) -> String {
        format!("{}{}", self.site_base_url.trim_end_matches('/'), path)
    }
}

/// Fields a snapshot is rendered from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotInput {
    pub short_id: ShortId,
    pub track_title: String,
    pub artist_name: String,
    pub cover_image_url: Option<String>,
    pub description: Option<String>,
    /// Slugs assigned by the backend; derived from the names when absent.
    pub artist_slug: Option<Slug>,
    pub track_slug: Option<Slug>,
}

impl From<&SmartLink> for SnapshotInput {
    fn from(link: &SmartLink) -> Self {
        Self {
            short_id: link.short_id.clone(),
            track_title: link.track_title.clone(),
            artist_name: link.artist_name.clone(),
            cover_image_url: link.cover_image_url.clone(),
            description: link.description.clone(),
            artist_slug: Some(link.artist_slug.clone()),
            track_slug: Some(link.track_slug.clone()),
        }
    }
}

impl SnapshotInput {
    /// Canonical SPA path this snapshot redirects to.
    pub fn target_path(&self) -> String {
        let artist = self
            .artist_slug
            .clone()
            .unwrap_or_else(|| slugify_or(&self.artist_name, "artist"));
        let track = self
            .track_slug
            .clone()
            .unwrap_or_else(|| slugify_or(&self.track_title, self.short_id.as_str()));
        canonical_path(&artist, &track)
    }
}

/// Render the snapshot document for one SmartLink.
pub fn generate(
    input: &SnapshotInput,
    config: &SnapshotConfig,
) -> Result<StaticSnapshot, SnapshotError> {
    let title = input.track_title.trim();
    let artist = input.artist_name.trim();
    if title.is_empty() {
        return Err(SnapshotError::InvalidInput("track title is empty".into()));
    }
    if artist.is_empty() {
        return Err(SnapshotError::InvalidInput("artist name is empty".into()));
    }

    let url = config.snapshot_url(&input.short_id);
    let target = config.absolute(&input.target_path());
    let heading = format!("{} - {}", title, artist);
    let description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "Listen to {} by {} on your favorite streaming platform.",
                title, artist
            )
        });
    let image = non_blank(input.cover_image_url.as_deref())
        .or_else(|| non_blank(config.fallback_image_url.as_deref()));

    let image_tags = match image {
        Some(img) => format!(
            r#"
    <meta property="og:image" content="{img}">
    <meta property="og:image:width" content="{w}">
    <meta property="og:image:height" content="{h}">
    <meta property="og:image:alt" content="{alt}">
    <meta name="twitter:image" content="{img}">"#,
            img = html_escape(img),
            w = OG_IMAGE_WIDTH,
            h = OG_IMAGE_HEIGHT,
            alt = html_escape(&heading),
        ),
        None => String::new(),
    };
    let cover_html = match image {
        Some(img) => format!(
            r#"<img class="cover" src="{}" alt="{}" width="300" height="300">"#,
            html_escape(img),
            html_escape(&heading)
        ),
        None => String::new(),
    };

    let html = format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{heading}</title>
    <meta name="description" content="{description}">
    <link rel="canonical" href="{target}">
    <meta property="og:type" content="music.song">
    <meta property="og:site_name" content="{site}">
    <meta property="og:title" content="{heading}">
    <meta property="og:description" content="{description}">
    <meta property="og:url" content="{url}">{image_tags}
    <meta name="twitter:card" content="summary_large_image">
    <meta name="twitter:title" content="{heading}">
    <meta name="twitter:description" content="{description}">
    <meta name="twitter:url" content="{url}">
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #111827; color: #f9fafb; text-align: center; padding: 40px 20px; }}
        .cover {{ border-radius: 12px; max-width: 100%; height: auto; }}
        a {{ color: #a5b4fc; }}
    </style>
</head>
<body>
    <main>
        {cover_html}
        <h1>{title}</h1>
        <p>{artist}</p>
        <p><a href="{target}">Listen to {title} by {artist}</a></p>
        <noscript>
            <p>Redirects need JavaScript. <a href="{target}">Open the SmartLink page</a>.</p>
        </noscript>
    </main>
    <script>
        setTimeout(function () {{ window.location.replace({target_js}); }}, {delay_ms});
    </script>
</body>
</html>
"##,
        heading = html_escape(&heading),
        description = html_escape(&description),
        target = html_escape(&target),
        site = html_escape(&config.site_name),
        url = html_escape(&url),
        image_tags = image_tags,
        cover_html = cover_html,
        title = html_escape(title),
        artist = html_escape(artist),
        target_js = js_string(&target),
        delay_ms = config.redirect_delay.as_millis(),
    );

    Ok(StaticSnapshot {
        short_id: input.short_id.clone(),
        url,
        html,
    })
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// Escape text for HTML element content and quoted attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Double-quoted JavaScript string literal that is also safe inside a
/// `<script>` element.
fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SnapshotConfig {
        SnapshotConfig {
            site_base_url: "https://links.example.com/".into(),
            ..SnapshotConfig::default()
        }
    }

    fn input() -> SnapshotInput {
        SnapshotInput {
            short_id: ShortId::new("Ab12").unwrap(),
            track_title: "Song".into(),
            artist_name: "The Band".into(),
            cover_image_url: Some("https://img.example.com/cover.jpg".into()),
            description: None,
            artist_slug: None,
            track_slug: None,
        }
    }

    #[test]
    fn carries_open_graph_and_twitter_tags() {
        let snap = generate(&input(), &config()).unwrap();
        assert_eq!(snap.url, "https://links.example.com/s/Ab12");
        let html = &snap.html;
        assert!(html.contains(r#"<meta property="og:type" content="music.song">"#));
        assert!(html.contains(r#"<meta property="og:title" content="Song - The Band">"#));
        assert!(html.contains(r#"<meta property="og:image" content="https://img.example.com/cover.jpg">"#));
        assert!(html.contains(r#"<meta property="og:image:width" content="1200">"#));
        assert!(html.contains(r#"<meta property="og:image:height" content="630">"#));
        assert!(html.contains(r#"<meta property="og:url" content="https://links.example.com/s/Ab12">"#));
        assert!(html.contains(r#"<meta name="twitter:card" content="summary_large_image">"#));
        assert!(html.contains(r#"<meta name="twitter:title" content="Song - The Band">"#));
    }

    #[test]
    fn redirects_into_canonical_route_after_delay() {
        let snap = generate(&input(), &config()).unwrap();
        assert!(snap
            .html
            .contains(r#"<a href="https://links.example.com/smartlinks/the-band/song">"#));
        assert!(snap.html.contains(
            r#"window.location.replace("https://links.example.com/smartlinks/the-band/song"); }, 2000);"#
        ));
    }

    #[test]
    fn backend_slugs_take_precedence_and_delay_is_configurable() {
        let mut inp = input();
        inp.artist_slug = Some(Slug::new("band").unwrap());
        inp.track_slug = Some(Slug::new("song-2").unwrap());
        let cfg = SnapshotConfig {
            redirect_delay: Duration::from_millis(750),
            ..config()
        };
        let snap = generate(&inp, &cfg).unwrap();
        assert!(snap.html.contains("/smartlinks/band/song-2\"); }, 750);"));
    }

    #[test]
    fn generation_is_idempotent() {
        let a = generate(&input(), &config()).unwrap();
        let b = generate(&input(), &config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn escapes_injected_metadata() {
        let mut inp = input();
        inp.track_title = "<script>alert('x')</script>".into();
        inp.artist_name = "\"Quote\" & Co".into();
        inp.cover_image_url = Some("https://img.example.com/a.jpg\" onerror=\"alert(1)".into());
        let html = generate(&inp, &config()).unwrap().html;
        assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&quot;Quote&quot; &amp; Co"));
        assert!(!html.contains("\" onerror=\""));
    }

    #[test]
    fn falls_back_when_names_have_no_slug() {
        let mut inp = input();
        inp.artist_name = "坂本龍一".into();
        inp.track_title = "戦場のメリークリスマス".into();
        assert_eq!(inp.target_path(), "/smartlinks/artist/Ab12");
    }

    #[test]
    fn no_image_tags_without_cover_or_fallback() {
        let mut inp = input();
        inp.cover_image_url = None;
        let html = generate(&inp, &config()).unwrap().html;
        assert!(!html.contains("og:image"));
        let cfg = SnapshotConfig {
            fallback_image_url: Some("https://links.example.com/og.png".into()),
            ..config()
        };
        let html = generate(&inp, &cfg).unwrap().html;
        assert!(html.contains(r#"content="https://links.example.com/og.png""#));
    }

    #[test]
    fn blank_cover_uses_fallback_image() {
        let mut inp = input();
        inp.cover_image_url = Some("   ".into());
        let cfg = SnapshotConfig {
            fallback_image_url: Some("https://links.example.com/og.png".into()),
            ..config()
        };
        let html = generate(&inp, &cfg).unwrap().html;
        assert!(html.contains(r#"<meta property="og:image" content="https://links.example.com/og.png">"#));
    }

    #[test]
    fn noscript_body_links_to_canonical_route() {
        let html = generate(&input(), &config()).unwrap().html;
        let start = html.find("<noscript>").unwrap();
        let end = html.find("</noscript>").unwrap();
        assert!(start < end);
        assert!(html[start..end]
            .contains(r#"<a href="https://links.example.com/smartlinks/the-band/song">"#));
        assert!(!html.contains("http-equiv=\"refresh\""));
    }

    #[test]
    fn rejects_blank_names() {
        let mut inp = input();
        inp.artist_name = " ".into();
        assert!(matches!(
            generate(&inp, &config()),
            Err(SnapshotError::InvalidInput(_))
        ));
    }

    #[test]
    fn js_string_cannot_close_the_script() {
        assert_eq!(js_string("a\"</script>"), r#""a\"\u003c/script\u003e""#);
    }
}
