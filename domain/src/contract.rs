//! Wire contracts between the SmartLink backend and its clients.
//!
//! Field names follow the backend's camelCase JSON. Every response is wrapped
//! in `Envelope` (`{success, data}` or `{success: false, error}`).

use serde::{Deserialize, Serialize};

use crate::validate::{validate_color, validate_custom_slug, validate_manual_url, validate_tracking_ids};
use crate::{NewSmartLink, PlatformLink, SmartLink, Template, TrackingIds, ValidationError};

/// `{success, data?, error?}` response wrapper.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Data of a successful envelope, or the backend's error message.
    pub fn into_result(self) -> Result<T, Option<String>> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error),
        }
    }
}

/// Body of `POST /api/smartlinks`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationPayload {
    pub artist_name: String,
    pub track_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub platform_links: Vec<PlatformLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<TrackingIds>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl CreationPayload {
    /// Validate the payload and turn it into a service input.
    pub fn into_new_smartlink(self) -> Result<NewSmartLink, ValidationError> {
        let artist_name = self.artist_name.trim().to_string();
        if artist_name.is_empty() {
            return Err(ValidationError::MissingArtistName);
        }
        let track_title = self.track_title.trim().to_string();
        if track_title.is_empty() {
            return Err(ValidationError::MissingTrackTitle);
        }
        if self.platform_links.is_empty() {
            return Err(ValidationError::NoEnabledPlatforms);
        }
        let mut platform_links = Vec::with_capacity(self.platform_links.len());
        for link in self.platform_links {
            if platform_links
                .iter()
                .any(|l: &PlatformLink| l.platform == link.platform)
            {
                return Err(ValidationError::DuplicatePlatform(link.platform));
            }
            let url = validate_manual_url(&link.url)?;
            platform_links.push(PlatformLink {
                platform: link.platform,
                url,
            });
        }
        let cover_image_url = non_blank(self.cover_image_url)
            .map(|u| validate_manual_url(&u))
            .transpose()?;
        let tracking = match self.analytics {
            Some(ids) => Some(validate_tracking_ids(&ids)?).filter(|t| !t.is_empty()),
            None => None,
        };
        Ok(NewSmartLink {
            artist_name,
            track_title,
            album_name: non_blank(self.album_name),
            isrc: non_blank(self.isrc).map(|s| s.to_ascii_uppercase()),
            release_date: non_blank(self.release_date),
            cover_image_url,
            description: non_blank(self.description),
            platform_links,
            tracking,
            custom_slug: non_blank(self.slug)
                .map(|s| validate_custom_slug(&s))
                .transpose()?,
            template: self.template.unwrap_or_default(),
            primary_color: non_blank(self.primary_color)
                .map(|c| validate_color(&c))
                .transpose()?,
            background_color: non_blank(self.background_color)
                .map(|c| validate_color(&c))
                .transpose()?,
            is_published: self.is_published,
        })
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// `data` of a successful creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSmartLink {
    #[serde(rename = "_id")]
    pub id: String,
    pub short_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_slug: Option<String>,
}

impl From<&SmartLink> for CreatedSmartLink {
    fn from(link: &SmartLink) -> Self {
        Self {
            id: link.id.clone(),
            short_id: link.short_id.as_str().to_string(),
            artist_slug: Some(link.artist_slug.as_str().to_string()),
            track_slug: Some(link.track_slug.as_str().to_string()),
        }
    }
}

/// Public view of a SmartLink, as rendered by the canonical route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartLinkView {
    #[serde(rename = "_id")]
    pub id: String,
    pub short_id: String,
    pub slug: String,
    pub track_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub platform_links: Vec<PlatformLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<TrackingIds>,
    pub template: Template,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    pub is_published: bool,
    #[serde(default)]
    pub click_count: u64,
}

/// Artist half of a short-code lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistView {
    pub name: String,
    pub slug: String,
}

/// `data` of `GET /api/short/:code` and of the canonical route lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartLinkLookup {
    pub smart_link: SmartLinkView,
    pub artist: ArtistView,
}

impl From<&SmartLink> for SmartLinkLookup {
    fn from(link: &SmartLink) -> Self {
        Self {
            smart_link: SmartLinkView {
                id: link.id.clone(),
                short_id: link.short_id.as_str().to_string(),
                slug: link.track_slug.as_str().to_string(),
                track_title: link.track_title.clone(),
                album_name: link.album_name.clone(),
                release_date: link.release_date.clone(),
                cover_image_url: link.cover_image_url.clone(),
                description: link.description.clone(),
                platform_links: link.platform_links.clone(),
                analytics: link.tracking.clone(),
                template: link.template,
                primary_color: link.primary_color.clone(),
                background_color: link.background_color.clone(),
                is_published: link.is_published,
                click_count: link.click_count,
            },
            artist: ArtistView {
                name: link.artist_name.clone(),
                slug: link.artist_slug.as_str().to_string(),
            },
        }
    }
}

/// Response of `POST /api/snapshots/:short_id`; flat, not enveloped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
