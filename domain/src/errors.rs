//! Error taxonomy of the SmartLink creation and redirection flows.
//!
//! Each flow gets its own error type so callers pick user-facing copy per
//! kind. None of these errors trigger an automatic retry.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::PlatformId;

/// Bad operator input, caught locally before any network call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    Empty,
    UnsupportedFormat,
    InvalidUrl(String),
    InvalidColor(String),
    InvalidTrackingId { field: &'static str, reason: String },
    InvalidSlug(String),
    MissingArtistName,
    MissingTrackTitle,
    NoEnabledPlatforms,
    DuplicatePlatform(PlatformId),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Empty => write!(f, "input is empty"),
            ValidationError::UnsupportedFormat => write!(
                f,
                "unsupported format: enter a streaming URL, an ISRC or a UPC"
            ),
            ValidationError::InvalidUrl(msg) => write!(f, "invalid url: {}", msg),
            ValidationError::InvalidColor(c) => write!(f, "invalid color: {}", c),
            ValidationError::InvalidTrackingId { field, reason } => {
                write!(f, "invalid {}: {}", field, reason)
            }
            ValidationError::InvalidSlug(msg) => write!(f, "invalid slug: {}", msg),
            ValidationError::MissingArtistName => write!(f, "artist name is required"),
            ValidationError::MissingTrackTitle => write!(f, "track title is required"),
            ValidationError::NoEnabledPlatforms => {
                write!(f, "at least one platform link must be enabled")
            }
            ValidationError::DuplicatePlatform(p) => {
                write!(f, "a link for {} already exists", p.display_name())
            }
        }
    }
}

impl Error for ValidationError {}

/// Failure of one resolution attempt against the metadata provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionError {
    /// Provider does not know the track (404).
    NotFound,
    /// Provider rejected the input (400); message passed through when given.
    InvalidInput(Option<String>),
    /// Provider throttled us (429).
    RateLimited,
    /// Provider answered successfully but no usable platform link survived
    /// normalization.
    NoPlatformsFound,
    /// Network, timeout, unexpected status or undecodable payload.
    Unknown(String),
}

impl ResolutionError {
    /// Operator-facing copy for this kind of failure.
    pub fn user_message(&self) -> String {
        match self {
            ResolutionError::NotFound => {
                "No match found for this link. Check the URL or try an ISRC/UPC.".into()
            }
            ResolutionError::InvalidInput(Some(msg)) => format!("The provider rejected this input: {}", msg),
            ResolutionError::InvalidInput(None) => "The provider rejected this input.".into(),
            ResolutionError::RateLimited => {
                "Too many lookups right now. Wait a moment and search again.".into()
            }
            ResolutionError::NoPlatformsFound => {
                "The track was found but no streaming platform links are available.".into()
            }
            ResolutionError::Unknown(_) => {
                "Link resolution failed. Check your connection and try again.".into()
            }
        }
    }
}

impl Display for ResolutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionError::NotFound => write!(f, "resolution: not found"),
            ResolutionError::InvalidInput(Some(msg)) => {
                write!(f, "resolution: invalid input: {}", msg)
            }
            ResolutionError::InvalidInput(None) => write!(f, "resolution: invalid input"),
            ResolutionError::RateLimited => write!(f, "resolution: rate limited"),
            ResolutionError::NoPlatformsFound => write!(f, "resolution: no platforms found"),
            ResolutionError::Unknown(msg) => write!(f, "resolution: {}", msg),
        }
    }
}

impl Error for ResolutionError {}

/// Failure of the SmartLink creation call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreationError {
    /// The backend explained the failure; shown verbatim.
    Backend(String),
    /// Transport or decode failure with no backend message.
    Unknown(String),
}

impl CreationError {
    pub fn user_message(&self) -> String {
        match self {
            CreationError::Backend(msg) => msg.clone(),
            CreationError::Unknown(_) => "Could not create the SmartLink. Please try again.".into(),
        }
    }
}

impl Display for CreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CreationError::Backend(msg) => write!(f, "creation rejected: {}", msg),
            CreationError::Unknown(msg) => write!(f, "creation failed: {}", msg),
        }
    }
}

impl Error for CreationError {}

/// Terminal outcome of a failed short-code resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedirectError {
    /// The route carried no code at all.
    MissingCode,
    /// Unknown or unpublished code.
    NotFound,
    /// The lookup itself failed; shown to the visitor as not found.
    Lookup(String),
}

impl RedirectError {
    pub fn user_message(&self) -> &'static str {
        match self {
            RedirectError::MissingCode => "This link is incomplete: no short code was given.",
            RedirectError::NotFound | RedirectError::Lookup(_) => {
                "Link not found. It may have been removed or mistyped."
            }
        }
    }
}

impl Display for RedirectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RedirectError::MissingCode => write!(f, "missing code"),
            RedirectError::NotFound => write!(f, "link not found"),
            RedirectError::Lookup(detail) => write!(f, "link lookup failed: {}", detail),
        }
    }
}

impl Error for RedirectError {}

/// Snapshot generation failure. Never fatal to a publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    InvalidInput(String),
    Failed(String),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::InvalidInput(msg) => write!(f, "snapshot input invalid: {}", msg),
            SnapshotError::Failed(msg) => write!(f, "snapshot generation failed: {}", msg),
        }
    }
}

impl Error for SnapshotError {}
