//! Domain library for SmartLink.
//!
//! Holds the data model, ports (traits), and error taxonomy for music link
//! resolution, the SmartLink creation wizard, short-code redirection and
//! static snapshot generation. Only `serde` is pulled in for the wire
//! contracts; adapters and IO concerns stay out of this crate.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// A URL-safe slug identifying an artist or a track in the canonical route.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slug(String);

impl Slug {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.is_empty() {
            return Err(CoreError::InvalidSlug("empty".into()));
        }
        if val.len() > 96 {
            return Err(CoreError::InvalidSlug("too long".into()));
        }
        if !val
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidSlug("invalid characters".into()));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Slug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque compact identifier of a SmartLink, used in short URLs and as the
/// key of its static snapshot.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortId(String);

impl ShortId {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.is_empty() {
            return Err(CoreError::InvalidInput("empty short id".into()));
        }
        if val.len() > 32 || !val.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidInput("malformed short id".into()));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ShortId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Streaming platform identifier.
///
/// Serialized as the provider's camelCase key (`appleMusic`). The declaration
/// order is the display priority used when seeding wizard rows.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlatformId {
    Spotify,
    AppleMusic,
    YoutubeMusic,
    Youtube,
    Deezer,
    AmazonMusic,
    Tidal,
    Soundcloud,
    Itunes,
    AmazonStore,
    Pandora,
    Napster,
    Yandex,
    Audiomack,
    Anghami,
    Boomplay,
    Audius,
    Bandcamp,
    Other(String),
}

impl PlatformId {
    /// Map a provider key (any casing, `_`/`-` separators tolerated).
    pub fn from_key(key: &str) -> Self {
        let folded: String = key
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "spotify" => PlatformId::Spotify,
            "applemusic" => PlatformId::AppleMusic,
            "youtubemusic" => PlatformId::YoutubeMusic,
            "youtube" => PlatformId::Youtube,
            "deezer" => PlatformId::Deezer,
            "amazonmusic" => PlatformId::AmazonMusic,
            "tidal" => PlatformId::Tidal,
            "soundcloud" => PlatformId::Soundcloud,
            "itunes" => PlatformId::Itunes,
            "amazonstore" => PlatformId::AmazonStore,
            "pandora" => PlatformId::Pandora,
            "napster" => PlatformId::Napster,
            "yandex" => PlatformId::Yandex,
            "audiomack" => PlatformId::Audiomack,
            "anghami" => PlatformId::Anghami,
            "boomplay" => PlatformId::Boomplay,
            "audius" => PlatformId::Audius,
            "bandcamp" => PlatformId::Bandcamp,
            _ => PlatformId::Other(key.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PlatformId::Spotify => "spotify",
            PlatformId::AppleMusic => "appleMusic",
            PlatformId::YoutubeMusic => "youtubeMusic",
            PlatformId::Youtube => "youtube",
            PlatformId::Deezer => "deezer",
            PlatformId::AmazonMusic => "amazonMusic",
            PlatformId::Tidal => "tidal",
            PlatformId::Soundcloud => "soundcloud",
            PlatformId::Itunes => "itunes",
            PlatformId::AmazonStore => "amazonStore",
            PlatformId::Pandora => "pandora",
            PlatformId::Napster => "napster",
            PlatformId::Yandex => "yandex",
            PlatformId::Audiomack => "audiomack",
            PlatformId::Anghami => "anghami",
            PlatformId::Boomplay => "boomplay",
            PlatformId::Audius => "audius",
            PlatformId::Bandcamp => "bandcamp",
            PlatformId::Other(key) => key,
        }
    }

    /// Human-readable platform name for previews and landing pages.
    pub fn display_name(&self) -> &str {
        match self {
            PlatformId::Spotify => "Spotify",
            PlatformId::AppleMusic => "Apple Music",
            PlatformId::YoutubeMusic => "YouTube Music",
            PlatformId::Youtube => "YouTube",
            PlatformId::Deezer => "Deezer",
            PlatformId::AmazonMusic => "Amazon Music",
            PlatformId::Tidal => "TIDAL",
            PlatformId::Soundcloud => "SoundCloud",
            PlatformId::Itunes => "iTunes",
            PlatformId::AmazonStore => "Amazon",
            PlatformId::Pandora => "Pandora",
            PlatformId::Napster => "Napster",
            PlatformId::Yandex => "Yandex Music",
            PlatformId::Audiomack => "Audiomack",
            PlatformId::Anghami => "Anghami",
            PlatformId::Boomplay => "Boomplay",
            PlatformId::Audius => "Audius",
            PlatformId::Bandcamp => "Bandcamp",
            PlatformId::Other(key) => key,
        }
    }
}

impl From<String> for PlatformId {
    fn from(s: String) -> Self {
        PlatformId::from_key(&s)
    }
}

impl From<PlatformId> for String {
    fn from(p: PlatformId) -> Self {
        p.as_str().to_string()
    }
}

impl Display for PlatformId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of operator input a resolution started from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Isrc,
    Upc,
    Url,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Isrc => "isrc",
            InputKind::Upc => "upc",
            InputKind::Url => "url",
        }
    }
}

/// Cover art candidate offered by the resolution provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result of link resolution: track metadata plus one canonical URL per
/// platform. `platform_links` is never empty on success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub title: String,
    pub artist_name: String,
    pub album: Option<String>,
    pub isrc: Option<String>,
    pub release_date: Option<String>,
    pub artwork_url: Option<String>,
    pub alternative_artworks: Vec<Artwork>,
    pub platform_links: BTreeMap<PlatformId, String>,
    pub source_provider: String,
    pub input_type: InputKind,
}

/// Where a wizard platform row came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOrigin {
    Detected,
    Manual,
}

/// One editable platform row in the wizard. Row order is significant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformLinkRow {
    pub platform: PlatformId,
    pub url: String,
    pub enabled: bool,
    pub origin: LinkOrigin,
}

/// Persisted platform link; a list of these keeps the operator's order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformLink {
    pub platform: PlatformId,
    pub url: String,
}

/// Analytics identifiers injected into the public landing page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ga4_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtm_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_pixel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiktok_pixel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_ads_id: Option<String>,
}

impl TrackingIds {
    pub fn is_empty(&self) -> bool {
        self.ga4_id.is_none()
            && self.gtm_id.is_none()
            && self.meta_pixel_id.is_none()
            && self.tiktok_pixel_id.is_none()
            && self.google_ads_id.is_none()
    }
}

/// Landing page template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Standard,
    Dark,
    Minimal,
    Vinyl,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Standard => "standard",
            Template::Dark => "dark",
            Template::Minimal => "minimal",
            Template::Vinyl => "vinyl",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" | "default" => Some(Template::Standard),
            "dark" => Some(Template::Dark),
            "minimal" => Some(Template::Minimal),
            "vinyl" => Some(Template::Vinyl),
            _ => None,
        }
    }
}

/// Input for creating a SmartLink on the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSmartLink {
    pub artist_name: String,
    pub track_title: String,
    pub album_name: Option<String>,
    pub isrc: Option<String>,
    pub release_date: Option<String>,
    pub cover_image_url: Option<String>,
    pub description: Option<String>,
    pub platform_links: Vec<PlatformLink>,
    pub tracking: Option<TrackingIds>,
    pub custom_slug: Option<Slug>,
    pub template: Template,
    pub primary_color: Option<String>,
    pub background_color: Option<String>,
    pub is_published: bool,
}

/// Stored SmartLink. Identifiers (`id`, `short_id`, slugs) never change after
/// creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmartLink {
    pub id: String,
    pub short_id: ShortId,
    pub artist_slug: Slug,
    pub track_slug: Slug,
    pub track_title: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub isrc: Option<String>,
    pub release_date: Option<String>,
    pub cover_image_url: Option<String>,
    pub description: Option<String>,
    pub platform_links: Vec<PlatformLink>,
    pub tracking: Option<TrackingIds>,
    pub template: Template,
    pub primary_color: Option<String>,
    pub background_color: Option<String>,
    pub is_published: bool,
    pub created_at: SystemTime,
    /// Number of short-code resolutions that led to this SmartLink.
    pub click_count: u64,
}

impl SmartLink {
    /// Canonical in-app route of this SmartLink.
    pub fn canonical_path(&self) -> String {
        redirect::canonical_path(&self.artist_slug, &self.track_slug)
    }
}

/// Pre-rendered crawler-facing document for one SmartLink. Always derivable
/// from the SmartLink itself; safe to drop and regenerate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticSnapshot {
    pub short_id: ShortId,
    pub url: String,
    pub html: String,
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Short id generator; deterministic by sequence number in some strategies.
pub trait ShortIdGenerator: Send + Sync {
    fn next_short_id(&self, seq: u64) -> ShortId;
}

/// Repository port for persisting and loading SmartLinks.
pub trait SmartLinkRepository: Send + Sync {
    /// Monotonic sequence used to mint ids and short ids.
    fn next_sequence(&self) -> Result<u64, CoreError>;
    fn get(&self, id: &str) -> Result<Option<SmartLink>, CoreError>;
    fn get_by_short_id(&self, short_id: &ShortId) -> Result<Option<SmartLink>, CoreError>;
    fn get_by_slugs(&self, artist: &Slug, track: &Slug) -> Result<Option<SmartLink>, CoreError>;
    /// Insert a new SmartLink. Fails with `AlreadyExists` when the id, the
    /// short id, or the (artist, track) slug pair is taken.
    fn put(&self, link: SmartLink) -> Result<(), CoreError>;
    fn increment_click(&self, short_id: &ShortId) -> Result<(), CoreError>;
    fn list(&self, limit: usize) -> Result<Vec<SmartLink>, CoreError>;
}

/// Storage port for generated static snapshots, keyed by short id.
pub trait SnapshotStore: Send + Sync {
    /// Insert or replace the snapshot for its short id.
    fn put_snapshot(&self, snapshot: StaticSnapshot) -> Result<(), CoreError>;
    fn get_snapshot(&self, short_id: &ShortId) -> Result<Option<StaticSnapshot>, CoreError>;
}

/// Core domain errors for the backend service and repositories.
#[derive(Debug)]
pub enum CoreError {
    InvalidInput(String),
    InvalidSlug(String),
    AlreadyExists,
    NotFound,
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            CoreError::InvalidSlug(msg) => write!(f, "invalid slug: {}", msg),
            CoreError::AlreadyExists => write!(f, "resource already exists"),
            CoreError::NotFound => write!(f, "not found"),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

impl From<ValidationError> for CoreError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::InvalidSlug(msg) => CoreError::InvalidSlug(msg),
            other => CoreError::InvalidInput(other.to_string()),
        }
    }
}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - smartlink domain library", pkg, ver)
}

pub mod adapters;
pub mod contract;
pub mod errors;
pub mod normalize;
pub mod redirect;
pub mod service;
pub mod short_id;
pub mod slug;
pub mod snapshot;
pub mod validate;
pub mod wizard;

pub use errors::{
    CreationError, RedirectError, ResolutionError, SnapshotError, ValidationError,
};
