//! Short-code resolution.
//!
//! A visitor arriving on a short URL gets exactly one lookup attempt. Success
//! yields an in-app navigation to `/smartlinks/{artist}/{track}`; any failure
//! is terminal and shown to the visitor, with no fallback navigation.

use crate::contract::SmartLinkLookup;
use crate::{RedirectError, ShortId, Slug};

/// Canonical in-app route of a published SmartLink.
pub fn canonical_path(artist_slug: &Slug, track_slug: &Slug) -> String {
    format!("/smartlinks/{}/{}", artist_slug, track_slug)
}

/// Slug pair a short code points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortCodeTarget {
    pub artist_slug: Slug,
    pub track_slug: Slug,
}

impl ShortCodeTarget {
    /// Build from a backend lookup; `None` if either slug is unusable.
    pub fn from_lookup(lookup: &SmartLinkLookup) -> Option<Self> {
        Some(Self {
            artist_slug: Slug::new(lookup.artist.slug.clone()).ok()?,
            track_slug: Slug::new(lookup.smart_link.slug.clone()).ok()?,
        })
    }

    pub fn path(&self) -> String {
        canonical_path(&self.artist_slug, &self.track_slug)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedirectState {
    /// Code parsed, lookup not started yet.
    AwaitingLookup,
    /// The single lookup is outstanding.
    LookupInFlight,
    /// Terminal: navigate to this in-app path.
    Navigate(String),
    /// Terminal: show this error, navigate nowhere.
    Failed(RedirectError),
}

/// Permission to perform the one lookup of a resolver. Not cloneable.
#[derive(Debug)]
pub struct LookupTicket {
    code: ShortId,
}

impl LookupTicket {
    pub fn code(&self) -> &ShortId {
        &self.code
    }
}

/// Per-page-load short code resolver.
#[derive(Debug)]
pub struct ShortCodeResolver {
    code: Option<ShortId>,
    state: RedirectState,
}

impl ShortCodeResolver {
    /// Start from the route parameter. An absent or blank code is its own
    /// terminal error; a malformed one can never match and is `NotFound`.
    pub fn from_route(code: Option<&str>) -> Self {
        let Some(raw) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Self {
                code: None,
                state: RedirectState::Failed(RedirectError::MissingCode),
            };
        };
        match ShortId::new(raw) {
            Ok(code) => Self {
                code: Some(code),
                state: RedirectState::AwaitingLookup,
            },
            Err(_) => Self {
                code: None,
                state: RedirectState::Failed(RedirectError::NotFound),
            },
        }
    }

    pub fn state(&self) -> &RedirectState {
        &self.state
    }

    pub fn code(&self) -> Option<&ShortId> {
        self.code.as_ref()
    }

    /// Hand out the lookup ticket. Returns `Some` at most once.
    pub fn take_lookup(&mut self) -> Option<LookupTicket> {
        if self.state != RedirectState::AwaitingLookup {
            return None;
        }
        let code = self.code.clone()?;
        self.state = RedirectState::LookupInFlight;
        Some(LookupTicket { code })
    }

    /// Settle the lookup. `Ok(None)` means the backend has no such code;
    /// `Err` carries transport detail and is terminal too.
    pub fn complete(
        &mut self,
        ticket: LookupTicket,
        outcome: Result<Option<ShortCodeTarget>, String>,
    ) -> &RedirectState {
        if self.state != RedirectState::LookupInFlight || self.code.as_ref() != Some(&ticket.code) {
            return &self.state;
        }
        self.state = match outcome {
            Ok(Some(target)) => RedirectState::Navigate(target.path()),
            Ok(None) => RedirectState::Failed(RedirectError::NotFound),
            Err(detail) => RedirectState::Failed(RedirectError::Lookup(detail)),
        };
        &self.state
    }

    /// Run the whole resolution with a synchronous lookup.
    pub fn resolve_with<F>(mut self, lookup: F) -> RedirectState
    where
        F: FnOnce(&ShortId) -> Result<Option<ShortCodeTarget>, String>,
    {
        if let Some(ticket) = self.take_lookup() {
            let outcome = lookup(ticket.code());
            self.complete(ticket, outcome);
        }
        self.state
    }

    /// Path to navigate to, once resolution succeeded.
    pub fn navigation(&self) -> Option<&str> {
        match &self.state {
            RedirectState::Navigate(path) => Some(path),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RedirectError> {
        match &self.state {
            RedirectState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            RedirectState::Navigate(_) | RedirectState::Failed(_)
        )
    }
}
