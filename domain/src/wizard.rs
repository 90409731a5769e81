//! SmartLink creation wizard.
//!
//! A linear state machine over six steps. Backward moves keep every edit;
//! forward moves go one step at a time and `Search` must have produced a
//! track with at least one platform link before `Metadata` is reachable.
//!
//! Network work happens outside: `begin_*` hands out a single-use ticket and
//! marks the wizard busy, `complete_*` settles it. While a ticket is
//! outstanding every navigation, edit and second request is refused, so a
//! double submit or a step change mid-request cannot happen.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::contract::{CreatedSmartLink, CreationPayload};
use crate::snapshot::SnapshotInput;
use crate::validate::{
    validate, validate_color, validate_custom_slug, validate_manual_url, validate_tracking_ids,
    SourceInput,
};
use crate::{
    CreationError, LinkOrigin, PlatformId, PlatformLink, PlatformLinkRow, ResolutionError,
    ResolvedTrack, ShortId, Slug, SnapshotError, Template, TrackingIds, ValidationError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Search,
    Metadata,
    Platforms,
    Customization,
    Preview,
    Publish,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Search,
        Step::Metadata,
        Step::Platforms,
        Step::Customization,
        Step::Preview,
        Step::Publish,
    ];

    pub fn next(self) -> Option<Step> {
        Self::ALL.get(self as usize + 1).copied()
    }

    pub fn previous(self) -> Option<Step> {
        (self as usize).checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Search => "search",
            Step::Metadata => "metadata",
            Step::Platforms => "platforms",
            Step::Customization => "customization",
            Step::Preview => "preview",
            Step::Publish => "publish",
        }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the wizard is waiting on, if anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Resolving,
    Publishing,
}

/// Outcome of the latest request of one operation class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestState<T, E> {
    Idle,
    InFlight,
    Succeeded(T),
    Failed(E),
}

impl<T, E> RequestState<T, E> {
    pub fn succeeded(&self) -> Option<&T> {
        match self {
            RequestState::Succeeded(v) => Some(v),
            _ => None,
        }
    }

    pub fn failed(&self) -> Option<&E> {
        match self {
            RequestState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Static snapshot state after a successful publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotStatus {
    NotRequested,
    Ready { url: String },
    /// SmartLink exists; snapshot generation failed and can be retried.
    Pending { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtworkChoice {
    /// Provider's primary artwork.
    Resolved,
    /// Index into `ResolvedTrack::alternative_artworks`.
    Alternative(usize),
    Custom(String),
    None,
}

/// Wizard-only fields, kept across searches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Customization {
    pub template: Template,
    pub primary_color: Option<String>,
    pub background_color: Option<String>,
    pub description: Option<String>,
    pub custom_slug: Option<Slug>,
    pub tracking: TrackingIds,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WizardError {
    /// A request is outstanding.
    Busy,
    /// `Search` has not produced a usable track; carries the last failure.
    SearchIncomplete(Option<ResolutionError>),
    WrongStep { expected: Step, actual: Step },
    CannotSkipForward { from: Step, to: Step },
    AtFirstStep,
    AtLastStep,
    AlreadyPublished,
    NotPublished,
    NoSuchRow(usize),
    NoSuchArtwork(usize),
    /// Ticket does not belong to the outstanding request.
    StaleTicket,
    Invalid(ValidationError),
}

impl Display for WizardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WizardError::Busy => write!(f, "a request is still in progress"),
            WizardError::SearchIncomplete(Some(e)) => write!(f, "{}", e.user_message()),
            WizardError::SearchIncomplete(None) => {
                write!(f, "search for a track before continuing")
            }
            WizardError::WrongStep { expected, actual } => {
                write!(f, "only allowed at step {} (currently at {})", expected, actual)
            }
            WizardError::CannotSkipForward { from, to } => {
                write!(f, "cannot jump forward from {} to {}", from, to)
            }
            WizardError::AtFirstStep => write!(f, "already at the first step"),
            WizardError::AtLastStep => write!(f, "already at the last step"),
            WizardError::AlreadyPublished => write!(f, "this SmartLink was already published"),
            WizardError::NotPublished => write!(f, "the SmartLink has not been published"),
            WizardError::NoSuchRow(i) => write!(f, "no platform row at position {}", i),
            WizardError::NoSuchArtwork(i) => write!(f, "no alternative artwork at position {}", i),
            WizardError::StaleTicket => write!(f, "ticket does not match the pending request"),
            WizardError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

impl Error for WizardError {}

impl From<ValidationError> for WizardError {
    fn from(e: ValidationError) -> Self {
        WizardError::Invalid(e)
    }
}

/// Outstanding resolution request. Only the wizard mints these.
#[derive(Debug)]
pub struct SearchTicket {
    id: u64,
    source: SourceInput,
}

impl SearchTicket {
    pub fn source(&self) -> &SourceInput {
        &self.source
    }
}

/// Outstanding creation request carrying the payload to submit.
#[derive(Debug)]
pub struct PublishTicket {
    id: u64,
    payload: CreationPayload,
}

impl PublishTicket {
    pub fn payload(&self) -> &CreationPayload {
        &self.payload
    }
}

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct Wizard {
    step: Step,
    activity: Activity,
    ticket_seq: u64,
    search: RequestState<SourceInput, ResolutionError>,
    publish: RequestState<CreatedSmartLink, CreationError>,
    snapshot: SnapshotStatus,
    track: Option<ResolvedTrack>,
    rows: Vec<PlatformLinkRow>,
    cover_image_url: Option<String>,
    customization: Customization,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: Step::Search,
            activity: Activity::Idle,
            ticket_seq: 0,
            search: RequestState::Idle,
            publish: RequestState::Idle,
            snapshot: SnapshotStatus::NotRequested,
            track: None,
            rows: Vec::new(),
            cover_image_url: None,
            customization: Customization::default(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn is_busy(&self) -> bool {
        self.activity != Activity::Idle
    }

    pub fn search_state(&self) -> &RequestState<SourceInput, ResolutionError> {
        &self.search
    }

    pub fn publish_state(&self) -> &RequestState<CreatedSmartLink, CreationError> {
        &self.publish
    }

    pub fn snapshot_status(&self) -> &SnapshotStatus {
        &self.snapshot
    }

    pub fn track(&self) -> Option<&ResolvedTrack> {
        self.track.as_ref()
    }

    pub fn rows(&self) -> &[PlatformLinkRow] {
        &self.rows
    }

    pub fn cover_image_url(&self) -> Option<&str> {
        self.cover_image_url.as_deref()
    }

    pub fn customization(&self) -> &Customization {
        &self.customization
    }

    pub fn created(&self) -> Option<&CreatedSmartLink> {
        self.publish.succeeded()
    }

    /// Position of the row for `platform`, if any.
    pub fn find_row(&self, platform: &PlatformId) -> Option<usize> {
        self.rows.iter().position(|r| &r.platform == platform)
    }

    // ---- requests ----

    /// Validate operator input and start a resolution.
    pub fn begin_search(&mut self, raw: &str) -> Result<SearchTicket, WizardError> {
        self.ensure_idle()?;
        self.ensure_unpublished()?;
        self.ensure_step(Step::Search)?;
        let source = validate(raw)?;
        self.activity = Activity::Resolving;
        self.search = RequestState::InFlight;
        Ok(SearchTicket {
            id: self.mint_ticket(),
            source,
        })
    }

    /// Settle a resolution. Success seeds one enabled row per platform in
    /// display priority order, replacing any previous rows.
    pub fn complete_search(
        &mut self,
        ticket: SearchTicket,
        result: Result<ResolvedTrack, ResolutionError>,
    ) -> Result<(), WizardError> {
        self.settle(Activity::Resolving, ticket.id)?;
        match result {
            Ok(track) if track.platform_links.is_empty() => {
                self.clear_track();
                self.search = RequestState::Failed(ResolutionError::NoPlatformsFound);
            }
            Ok(track) => {
                self.rows = track
                    .platform_links
                    .iter()
                    .map(|(platform, url)| PlatformLinkRow {
                        platform: platform.clone(),
                        url: url.clone(),
                        enabled: true,
                        origin: LinkOrigin::Detected,
                    })
                    .collect();
                self.cover_image_url = track.artwork_url.clone();
                self.track = Some(track);
                self.search = RequestState::Succeeded(ticket.source);
            }
            Err(e) => {
                self.clear_track();
                self.search = RequestState::Failed(e);
            }
        }
        Ok(())
    }

    /// Build the payload and start the creation call. Only from `Publish`;
    /// incomplete data is rejected here, before any network call.
    pub fn begin_publish(&mut self) -> Result<PublishTicket, WizardError> {
        self.ensure_idle()?;
        self.ensure_unpublished()?;
        self.ensure_step(Step::Publish)?;
        let payload = self.build_payload()?;
        payload.clone().into_new_smartlink()?;
        self.activity = Activity::Publishing;
        self.publish = RequestState::InFlight;
        Ok(PublishTicket {
            id: self.mint_ticket(),
            payload,
        })
    }

    pub fn complete_publish(
        &mut self,
        ticket: PublishTicket,
        result: Result<CreatedSmartLink, CreationError>,
    ) -> Result<(), WizardError> {
        self.settle(Activity::Publishing, ticket.id)?;
        self.publish = match result {
            Ok(created) => {
                self.snapshot = SnapshotStatus::NotRequested;
                RequestState::Succeeded(created)
            }
            Err(e) => RequestState::Failed(e),
        };
        Ok(())
    }

    /// Snapshot input for the created SmartLink, once publish succeeded.
    pub fn snapshot_input(&self) -> Option<SnapshotInput> {
        let created = self.publish.succeeded()?;
        let track = self.track.as_ref()?;
        Some(SnapshotInput {
            short_id: ShortId::new(created.short_id.clone()).ok()?,
            track_title: track.title.trim().to_string(),
            artist_name: track.artist_name.trim().to_string(),
            cover_image_url: self.cover_image_url.clone(),
            description: self.customization.description.clone(),
            artist_slug: created.artist_slug.clone().and_then(|s| Slug::new(s).ok()),
            track_slug: created.track_slug.clone().and_then(|s| Slug::new(s).ok()),
        })
    }

    /// Record the snapshot outcome. Never touches the publish outcome.
    pub fn record_snapshot(&mut self, result: Result<String, SnapshotError>) -> Result<(), WizardError> {
        if self.publish.succeeded().is_none() {
            return Err(WizardError::NotPublished);
        }
        self.snapshot = match result {
            Ok(url) => SnapshotStatus::Ready { url },
            Err(e) => SnapshotStatus::Pending {
                reason: e.to_string(),
            },
        };
        Ok(())
    }

    // ---- navigation ----

    pub fn next(&mut self) -> Result<Step, WizardError> {
        self.ensure_idle()?;
        let to = self.step.next().ok_or(WizardError::AtLastStep)?;
        if self.step == Step::Search && !self.search_done() {
            return Err(WizardError::SearchIncomplete(self.search.failed().cloned()));
        }
        self.step = to;
        Ok(to)
    }

    pub fn back(&mut self) -> Result<Step, WizardError> {
        self.ensure_idle()?;
        self.step = self.step.previous().ok_or(WizardError::AtFirstStep)?;
        Ok(self.step)
    }

    /// Jump back to an earlier (or the current) step.
    pub fn go_to(&mut self, to: Step) -> Result<Step, WizardError> {
        self.ensure_idle()?;
        if to > self.step {
            return Err(WizardError::CannotSkipForward {
                from: self.step,
                to,
            });
        }
        self.step = to;
        Ok(to)
    }

    // ---- metadata ----

    pub fn set_title(&mut self, title: &str) -> Result<(), WizardError> {
        self.track_mut()?.title = title.trim().to_string();
        Ok(())
    }

    pub fn set_artist_name(&mut self, name: &str) -> Result<(), WizardError> {
        self.track_mut()?.artist_name = name.trim().to_string();
        Ok(())
    }

    pub fn set_album(&mut self, album: Option<&str>) -> Result<(), WizardError> {
        self.track_mut()?.album = non_blank(album);
        Ok(())
    }

    pub fn set_release_date(&mut self, date: Option<&str>) -> Result<(), WizardError> {
        self.track_mut()?.release_date = non_blank(date);
        Ok(())
    }

    pub fn select_artwork(&mut self, choice: ArtworkChoice) -> Result<(), WizardError> {
        let track = self.track_mut()?;
        let url = match choice {
            ArtworkChoice::Resolved => track.artwork_url.clone(),
            ArtworkChoice::Alternative(i) => Some(
                track
                    .alternative_artworks
                    .get(i)
                    .ok_or(WizardError::NoSuchArtwork(i))?
                    .url
                    .clone(),
            ),
            ArtworkChoice::Custom(url) => Some(validate_manual_url(&url)?),
            ArtworkChoice::None => None,
        };
        self.cover_image_url = url;
        Ok(())
    }

    // ---- platform rows ----

    /// Flip a row's enabled flag; returns the new value.
    pub fn toggle(&mut self, index: usize) -> Result<bool, WizardError> {
        let row = self.row_mut(index)?;
        row.enabled = !row.enabled;
        Ok(row.enabled)
    }

    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<(), WizardError> {
        self.row_mut(index)?.enabled = enabled;
        Ok(())
    }

    /// Move the row at `from` so it ends up at position `to`.
    pub fn move_row(&mut self, from: usize, to: usize) -> Result<(), WizardError> {
        self.row_mut(from)?;
        if to >= self.rows.len() {
            return Err(WizardError::NoSuchRow(to));
        }
        let row = self.rows.remove(from);
        self.rows.insert(to, row);
        Ok(())
    }

    /// Append an operator-entered link. One row per platform.
    pub fn add_manual(&mut self, platform: PlatformId, url: &str) -> Result<usize, WizardError> {
        self.editable()?;
        let url = validate_manual_url(url)?;
        if self.find_row(&platform).is_some() {
            return Err(ValidationError::DuplicatePlatform(platform).into());
        }
        self.rows.push(PlatformLinkRow {
            platform,
            url,
            enabled: true,
            origin: LinkOrigin::Manual,
        });
        Ok(self.rows.len() - 1)
    }

    pub fn edit_url(&mut self, index: usize, url: &str) -> Result<(), WizardError> {
        self.row_mut(index)?;
        let url = validate_manual_url(url)?;
        self.rows[index].url = url;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<PlatformLinkRow, WizardError> {
        self.row_mut(index)?;
        Ok(self.rows.remove(index))
    }

    // ---- customization ----

    pub fn set_template(&mut self, template: Template) -> Result<(), WizardError> {
        self.editable()?;
        self.customization.template = template;
        Ok(())
    }

    pub fn set_primary_color(&mut self, color: Option<&str>) -> Result<(), WizardError> {
        self.editable()?;
        self.customization.primary_color = non_blank(color).map(|c| validate_color(&c)).transpose()?;
        Ok(())
    }

    pub fn set_background_color(&mut self, color: Option<&str>) -> Result<(), WizardError> {
        self.editable()?;
        self.customization.background_color =
            non_blank(color).map(|c| validate_color(&c)).transpose()?;
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<&str>) -> Result<(), WizardError> {
        self.editable()?;
        self.customization.description = non_blank(description);
        Ok(())
    }

    pub fn set_custom_slug(&mut self, slug: Option<&str>) -> Result<(), WizardError> {
        self.editable()?;
        self.customization.custom_slug =
            non_blank(slug).map(|s| validate_custom_slug(&s)).transpose()?;
        Ok(())
    }

    pub fn set_tracking(&mut self, ids: TrackingIds) -> Result<(), WizardError> {
        self.editable()?;
        self.customization.tracking = validate_tracking_ids(&ids)?;
        Ok(())
    }

    // ---- preview ----

    /// Payload that publishing would submit right now.
    pub fn preview(&self) -> Result<CreationPayload, WizardError> {
        self.build_payload()
    }

    fn build_payload(&self) -> Result<CreationPayload, WizardError> {
        let track = self
            .track
            .as_ref()
            .ok_or_else(|| WizardError::SearchIncomplete(self.search.failed().cloned()))?;
        let c = &self.customization;
        Ok(CreationPayload {
            artist_name: track.artist_name.trim().to_string(),
            track_title: track.title.trim().to_string(),
            cover_image_url: self.cover_image_url.clone(),
            platform_links: self
                .rows
                .iter()
                .filter(|r| r.enabled)
                .map(|r| PlatformLink {
                    platform: r.platform.clone(),
                    url: r.url.clone(),
                })
                .collect(),
            analytics: Some(c.tracking.clone()).filter(|t| !t.is_empty()),
            is_published: true,
            album_name: track.album.clone(),
            isrc: track.isrc.clone(),
            release_date: track.release_date.clone(),
            slug: c.custom_slug.as_ref().map(|s| s.as_str().to_string()),
            description: c.description.clone(),
            template: Some(c.template),
            primary_color: c.primary_color.clone(),
            background_color: c.background_color.clone(),
        })
    }

    // ---- guards ----

    /// Ticket ids are unique across every wizard in the process, so a ticket
    /// only ever settles the wizard that minted it.
    fn mint_ticket(&mut self) -> u64 {
        self.ticket_seq = NEXT_TICKET.fetch_add(1, Ordering::Relaxed);
        self.ticket_seq
    }

    fn settle(&mut self, expected: Activity, ticket: u64) -> Result<(), WizardError> {
        if self.activity != expected || ticket != self.ticket_seq {
            return Err(WizardError::StaleTicket);
        }
        self.activity = Activity::Idle;
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), WizardError> {
        if self.is_busy() {
            return Err(WizardError::Busy);
        }
        Ok(())
    }

    fn ensure_unpublished(&self) -> Result<(), WizardError> {
        if self.publish.succeeded().is_some() {
            return Err(WizardError::AlreadyPublished);
        }
        Ok(())
    }

    fn ensure_step(&self, expected: Step) -> Result<(), WizardError> {
        if self.step != expected {
            return Err(WizardError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    fn search_done(&self) -> bool {
        self.search.succeeded().is_some() && self.track.is_some()
    }

    fn editable(&self) -> Result<(), WizardError> {
        self.ensure_idle()?;
        self.ensure_unpublished()?;
        if !self.search_done() {
            return Err(WizardError::SearchIncomplete(self.search.failed().cloned()));
        }
        Ok(())
    }

    fn track_mut(&mut self) -> Result<&mut ResolvedTrack, WizardError> {
        self.editable()?;
        self.track
            .as_mut()
            .ok_or(WizardError::SearchIncomplete(None))
    }

    fn row_mut(&mut self, index: usize) -> Result<&mut PlatformLinkRow, WizardError> {
        self.editable()?;
        self.rows.get_mut(index).ok_or(WizardError::NoSuchRow(index))
    }

    fn clear_track(&mut self) {
        self.track = None;
        self.rows.clear();
        self.cover_image_url = None;
    }
}

fn non_blank(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{Artwork, InputKind};

    fn resolved() -> ResolvedTrack {
        let mut links = BTreeMap::new();
        links.insert(
            PlatformId::Youtube,
            "https://youtube.com/watch?v=zzz".to_string(),
        );
        links.insert(
            PlatformId::Spotify,
            "https://open.spotify.com/track/abc123".to_string(),
        );
        ResolvedTrack {
            title: "Song".into(),
            artist_name: "Band".into(),
            album: None,
            isrc: None,
            release_date: None,
            artwork_url: Some("https://img.example.com/a.jpg".into()),
            alternative_artworks: vec![Artwork {
                url: "https://img.example.com/b.jpg".into(),
                width: Some(640),
                height: Some(640),
                source: Some("deezer".into()),
            }],
            platform_links: links,
            source_provider: "spotify".into(),
            input_type: InputKind::Url,
        }
    }

    fn searched() -> Wizard {
        let mut w = Wizard::new();
        let ticket = w
            .begin_search("https://open.spotify.com/track/abc123?si=xyz")
            .unwrap();
        assert_eq!(ticket.source().platform_hint(), Some(&PlatformId::Spotify));
        w.complete_search(ticket, Ok(resolved())).unwrap();
        w
    }

    fn at_publish() -> Wizard {
        let mut w = searched();
        while w.step() != Step::Publish {
            w.next().unwrap();
        }
        w
    }

    fn created() -> CreatedSmartLink {
        CreatedSmartLink {
            id: "0000000000000001".into(),
            short_id: "Ab12".into(),
            artist_slug: Some("band".into()),
            track_slug: Some("song".into()),
        }
    }

    fn platforms(payload: &CreationPayload) -> Vec<PlatformId> {
        payload
            .platform_links
            .iter()
            .map(|l| l.platform.clone())
            .collect()
    }

    #[test]
    fn rows_are_seeded_in_priority_order_all_enabled() {
        let w = searched();
        let rows = w.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].platform, PlatformId::Spotify);
        assert_eq!(rows[1].platform, PlatformId::Youtube);
        assert!(rows.iter().all(|r| r.enabled && r.origin == LinkOrigin::Detected));
    }

    #[test]
    fn disabled_rows_are_omitted_from_the_payload() {
        let mut w = at_publish();
        let yt = w.find_row(&PlatformId::Youtube).unwrap();
        assert!(!w.toggle(yt).unwrap());
        let ticket = w.begin_publish().unwrap();
        assert_eq!(
            ticket.payload().platform_links,
            vec![PlatformLink {
                platform: PlatformId::Spotify,
                url: "https://open.spotify.com/track/abc123".into(),
            }]
        );
        let json = serde_json::to_value(ticket.payload()).unwrap();
        assert!(json["platformLinks"][0].get("enabled").is_none());
    }

    #[test]
    fn reorder_is_preserved_in_the_payload() {
        let mut w = searched();
        w.add_manual(PlatformId::Tidal, "https://tidal.com/browse/track/1")
            .unwrap();
        w.move_row(2, 0).unwrap();
        w.move_row(2, 1).unwrap();
        assert_eq!(
            platforms(&w.preview().unwrap()),
            vec![PlatformId::Tidal, PlatformId::Youtube, PlatformId::Spotify]
        );
    }

    #[test]
    fn cannot_leave_search_without_a_successful_resolution() {
        let mut w = Wizard::new();
        assert_eq!(w.next(), Err(WizardError::SearchIncomplete(None)));

        let ticket = w.begin_search("USRC17607839").unwrap();
        assert_eq!(ticket.source().kind(), InputKind::Isrc);
        w.complete_search(ticket, Err(ResolutionError::RateLimited))
            .unwrap();
        assert_eq!(
            w.next(),
            Err(WizardError::SearchIncomplete(Some(ResolutionError::RateLimited)))
        );
        assert_eq!(w.step(), Step::Search);
    }

    #[test]
    fn empty_link_map_counts_as_failure() {
        let mut w = Wizard::new();
        let ticket = w.begin_search("https://example.com/x").unwrap();
        let mut track = resolved();
        track.platform_links.clear();
        w.complete_search(ticket, Ok(track)).unwrap();
        assert_eq!(
            w.search_state().failed(),
            Some(&ResolutionError::NoPlatformsFound)
        );
        assert!(w.rows().is_empty());
        assert!(w.next().is_err());
    }

    #[test]
    fn invalid_input_never_starts_a_request() {
        let mut w = Wizard::new();
        assert_eq!(
            w.begin_search("   ").unwrap_err(),
            WizardError::Invalid(ValidationError::Empty)
        );
        assert_eq!(w.activity(), Activity::Idle);
        assert_eq!(w.search_state(), &RequestState::Idle);
    }

    #[test]
    fn busy_wizard_rejects_navigation_edits_and_second_requests() {
        let mut w = searched();
        w.next().unwrap();
        w.go_to(Step::Search).unwrap();
        let ticket = w.begin_search("https://open.spotify.com/track/other").unwrap();
        assert!(w.is_busy());
        assert_eq!(w.next(), Err(WizardError::Busy));
        assert_eq!(w.back(), Err(WizardError::Busy));
        assert_eq!(w.toggle(0), Err(WizardError::Busy));
        assert_eq!(
            w.begin_search("USRC17607839").unwrap_err(),
            WizardError::Busy
        );
        w.complete_search(ticket, Ok(resolved())).unwrap();
        assert!(!w.is_busy());
        assert_eq!(w.next(), Ok(Step::Metadata));
    }

    #[test]
    fn forward_skipping_is_rejected_and_back_keeps_edits() {
        let mut w = searched();
        w.next().unwrap();
        w.set_title("Song (Remastered)").unwrap();
        w.next().unwrap();
        w.set_enabled(1, false).unwrap();
        assert_eq!(
            w.go_to(Step::Preview),
            Err(WizardError::CannotSkipForward {
                from: Step::Platforms,
                to: Step::Preview
            })
        );
        w.go_to(Step::Metadata).unwrap();
        w.back().unwrap();
        assert_eq!(w.back(), Err(WizardError::AtFirstStep));
        assert_eq!(w.track().unwrap().title, "Song (Remastered)");
        assert!(!w.rows()[1].enabled);
    }

    #[test]
    fn publish_only_from_the_publish_step() {
        let mut w = searched();
        assert_eq!(
            w.begin_publish().unwrap_err(),
            WizardError::WrongStep {
                expected: Step::Publish,
                actual: Step::Search
            }
        );
    }

    #[test]
    fn publish_rejects_missing_artist_and_no_enabled_rows_locally() {
        let mut w = at_publish();
        w.set_artist_name("  ").unwrap();
        assert_eq!(
            w.begin_publish().unwrap_err(),
            WizardError::Invalid(ValidationError::MissingArtistName)
        );
        assert_eq!(w.activity(), Activity::Idle);

        w.set_artist_name("Band").unwrap();
        w.set_enabled(0, false).unwrap();
        w.set_enabled(1, false).unwrap();
        assert_eq!(
            w.begin_publish().unwrap_err(),
            WizardError::Invalid(ValidationError::NoEnabledPlatforms)
        );
    }

    #[test]
    fn failed_publish_can_be_resubmitted_and_success_is_final() {
        let mut w = at_publish();
        let ticket = w.begin_publish().unwrap();
        w.complete_publish(ticket, Err(CreationError::Backend("slug taken".into())))
            .unwrap();
        assert_eq!(
            w.publish_state().failed().map(|e| e.user_message()),
            Some("slug taken".to_string())
        );

        let ticket = w.begin_publish().unwrap();
        w.complete_publish(ticket, Ok(created())).unwrap();
        assert_eq!(w.created().unwrap().short_id, "Ab12");
        assert_eq!(w.begin_publish().unwrap_err(), WizardError::AlreadyPublished);
        assert_eq!(w.toggle(0), Err(WizardError::AlreadyPublished));
    }

    #[test]
    fn stale_ticket_is_rejected() {
        let mut a = at_publish();
        let mut b = at_publish();
        let ta = a.begin_publish().unwrap();
        let tb = b.begin_publish().unwrap();
        b.complete_publish(tb, Ok(created())).unwrap();
        let tb2 = SearchTicket {
            id: 99,
            source: SourceInput::Isrc("USRC17607839".into()),
        };
        assert_eq!(
            a.complete_search(tb2, Err(ResolutionError::NotFound)),
            Err(WizardError::StaleTicket)
        );
        assert!(a.is_busy());
        a.complete_publish(ta, Ok(created())).unwrap();
    }

    #[test]
    fn ticket_from_another_wizard_is_rejected() {
        let mut a = at_publish();
        let mut b = at_publish();
        let ta = a.begin_publish().unwrap();
        let tb = b.begin_publish().unwrap();

        assert_eq!(
            a.complete_publish(tb, Ok(created())),
            Err(WizardError::StaleTicket)
        );
        assert!(a.is_busy());
        assert!(a.created().is_none());

        a.complete_publish(ta, Ok(created())).unwrap();
        assert!(!a.is_busy());
        assert!(b.is_busy());
    }

    #[test]
    fn snapshot_failure_leaves_publish_successful() {
        let mut w = at_publish();
        assert_eq!(
            w.record_snapshot(Ok("x".into())),
            Err(WizardError::NotPublished)
        );
        assert!(w.snapshot_input().is_none());

        let ticket = w.begin_publish().unwrap();
        w.complete_publish(ticket, Ok(created())).unwrap();
        let input = w.snapshot_input().unwrap();
        assert_eq!(input.short_id.as_str(), "Ab12");
        assert_eq!(input.target_path(), "/smartlinks/band/song");

        w.record_snapshot(Err(SnapshotError::Failed("disk full".into())))
            .unwrap();
        assert!(matches!(w.snapshot_status(), SnapshotStatus::Pending { .. }));
        assert!(w.created().is_some());

        w.record_snapshot(Ok("https://links.example.com/s/Ab12".into()))
            .unwrap();
        assert_eq!(
            w.snapshot_status(),
            &SnapshotStatus::Ready {
                url: "https://links.example.com/s/Ab12".into()
            }
        );
    }

    #[test]
    fn manual_rows_validate_url_and_reject_duplicates() {
        let mut w = searched();
        assert!(matches!(
            w.add_manual(PlatformId::Tidal, "tidal.com/track/1"),
            Err(WizardError::Invalid(ValidationError::InvalidUrl(_)))
        ));
        assert_eq!(
            w.add_manual(PlatformId::Spotify, "https://open.spotify.com/track/x"),
            Err(WizardError::Invalid(ValidationError::DuplicatePlatform(
                PlatformId::Spotify
            )))
        );
        let i = w
            .add_manual(PlatformId::Bandcamp, "https://band.bandcamp.com/track/song")
            .unwrap();
        assert_eq!(w.rows()[i].origin, LinkOrigin::Manual);
        w.edit_url(i, " https://band.bandcamp.com/track/song-2 ").unwrap();
        assert_eq!(w.rows()[i].url, "https://band.bandcamp.com/track/song-2");
        assert_eq!(w.remove(i).unwrap().platform, PlatformId::Bandcamp);
        assert_eq!(w.remove(5), Err(WizardError::NoSuchRow(5)));
    }

    #[test]
    fn customization_flows_into_the_preview() {
        let mut w = searched();
        w.select_artwork(ArtworkChoice::Alternative(0)).unwrap();
        assert_eq!(
            w.select_artwork(ArtworkChoice::Alternative(3)),
            Err(WizardError::NoSuchArtwork(3))
        );
        w.set_template(Template::Dark).unwrap();
        w.set_primary_color(Some("#FF0000")).unwrap();
        w.set_custom_slug(Some("my-song")).unwrap();
        w.set_tracking(TrackingIds {
            ga4_id: Some("g-abc123".into()),
            ..TrackingIds::default()
        })
        .unwrap();
        assert!(w.set_background_color(Some("red")).is_err());

        let p = w.preview().unwrap();
        assert_eq!(p.cover_image_url.as_deref(), Some("https://img.example.com/b.jpg"));
        assert_eq!(p.template, Some(Template::Dark));
        assert_eq!(p.primary_color.as_deref(), Some("#ff0000"));
        assert_eq!(p.slug.as_deref(), Some("my-song"));
        assert_eq!(
            p.analytics.and_then(|a| a.ga4_id).as_deref(),
            Some("G-ABC123")
        );
    }

    #[test]
    fn step_order_helpers() {
        assert_eq!(Step::Search.next(), Some(Step::Metadata));
        assert_eq!(Step::Publish.next(), None);
        assert_eq!(Step::Search.previous(), None);
        assert_eq!(Step::Publish.previous(), Some(Step::Preview));
    }
}
