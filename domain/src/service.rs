use crate::slug::slugify_or;
use crate::snapshot::{generate, SnapshotConfig, SnapshotInput};
use crate::validate::validate_manual_url;
use crate::{
    Clock, CoreError, NewSmartLink, ShortId, ShortIdGenerator, Slug, SmartLink,
    SmartLinkRepository, SnapshotError, SnapshotStore, StaticSnapshot, ValidationError,
};

const MAX_ATTEMPTS: usize = 100;

/// Application service behind the SmartLink backend: creation, short-code
/// and slug lookups, and static snapshot publishing.
///
/// Generic over storage, short id strategy and clock so it can run against
/// the in-memory adapter in tests and SQLite in the server.
pub struct SmartLinkService<R, G, C>
where
    R: SmartLinkRepository + SnapshotStore,
    G: ShortIdGenerator,
    C: Clock,
{
    repo: R,
    short_ids: G,
    clock: C,
}

impl<R, G, C> SmartLinkService<R, G, C>
where
    R: SmartLinkRepository + SnapshotStore,
    G: ShortIdGenerator,
    C: Clock,
{
    pub fn new(repo: R, short_ids: G, clock: C) -> Self {
        Self {
            repo,
            short_ids,
            clock,
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Create and store a SmartLink, assigning its identifiers.
    pub fn create(&self, input: NewSmartLink) -> Result<SmartLink, CoreError> {
        let artist_name = input.artist_name.trim().to_string();
        if artist_name.is_empty() {
            return Err(ValidationError::MissingArtistName.into());
        }
        let track_title = input.track_title.trim().to_string();
        if track_title.is_empty() {
            return Err(ValidationError::MissingTrackTitle.into());
        }
        if input.platform_links.is_empty() {
            return Err(ValidationError::NoEnabledPlatforms.into());
        }
        for (i, link) in input.platform_links.iter().enumerate() {
            validate_manual_url(&link.url)?;
            if input.platform_links[..i]
                .iter()
                .any(|l| l.platform == link.platform)
            {
                return Err(ValidationError::DuplicatePlatform(link.platform.clone()).into());
            }
        }

        let (seq, short_id) = self.allocate_short_id()?;
        let artist_slug = slugify_or(&artist_name, "artist");
        let track_slug = match input.custom_slug {
            Some(custom) => {
                if self.repo.get_by_slugs(&artist_slug, &custom)?.is_some() {
                    return Err(CoreError::AlreadyExists);
                }
                custom
            }
            None => self.unique_track_slug(
                &artist_slug,
                slugify_or(&track_title, short_id.as_str()),
            )?,
        };

        let link = SmartLink {
            id: format!("{:016x}", seq),
            short_id,
            artist_slug,
            track_slug,
            track_title,
            artist_name,
            album_name: input.album_name,
            isrc: input.isrc,
            release_date: input.release_date,
            cover_image_url: input.cover_image_url,
            description: input.description,
            platform_links: input.platform_links,
            tracking: input.tracking,
            template: input.template,
            primary_color: input.primary_color,
            background_color: input.background_color,
            is_published: input.is_published,
            created_at: self.clock.now(),
            click_count: 0,
        };
        self.repo.put(link.clone())?;
        Ok(link)
    }

    fn allocate_short_id(&self) -> Result<(u64, ShortId), CoreError> {
        // Retry on collision with ids inserted outside the sequence.
        for _ in 0..MAX_ATTEMPTS {
            let seq = self.repo.next_sequence()?;
            let short_id = self.short_ids.next_short_id(seq);
            if self.repo.get_by_short_id(&short_id)?.is_none() {
                return Ok((seq, short_id));
            }
        }
        Err(CoreError::Repository(
            "failed to generate unique short id".into(),
        ))
    }

    fn unique_track_slug(&self, artist: &Slug, base: Slug) -> Result<Slug, CoreError> {
        if self.repo.get_by_slugs(artist, &base)?.is_none() {
            return Ok(base);
        }
        for n in 2..=MAX_ATTEMPTS + 1 {
            let candidate = Slug::new(format!("{}-{}", base, n))?;
            if self.repo.get_by_slugs(artist, &candidate)?.is_none() {
                return Ok(candidate);
            }
        }
        Err(CoreError::AlreadyExists)
    }

    /// Published SmartLink behind a short code. Counts the click when the
    /// store allows it; a failed count never fails the lookup.
    pub fn resolve_short_code(&self, code: &ShortId) -> Result<SmartLink, CoreError> {
        let mut link = self
            .repo
            .get_by_short_id(code)?
            .filter(|l| l.is_published)
            .ok_or(CoreError::NotFound)?;
        if self.repo.increment_click(code).is_ok() {
            link.click_count += 1;
        }
        Ok(link)
    }

    /// Published SmartLink at its canonical route.
    pub fn get_by_slugs(&self, artist: &Slug, track: &Slug) -> Result<SmartLink, CoreError> {
        self.repo
            .get_by_slugs(artist, track)?
            .filter(|l| l.is_published)
            .ok_or(CoreError::NotFound)
    }

    pub fn list(&self, limit: usize) -> Result<Vec<SmartLink>, CoreError> {
        self.repo.list(limit)
    }

    /// Render and store the snapshot for a published SmartLink, replacing
    /// any earlier one.
    pub fn publish_snapshot(
        &self,
        short_id: &ShortId,
        config: &SnapshotConfig,
    ) -> Result<StaticSnapshot, CoreError> {
        let link = self
            .repo
            .get_by_short_id(short_id)?
            .filter(|l| l.is_published)
            .ok_or(CoreError::NotFound)?;
        let snapshot = generate(&SnapshotInput::from(&link), config).map_err(|e| match e {
            SnapshotError::InvalidInput(msg) => CoreError::InvalidInput(msg),
            SnapshotError::Failed(msg) => CoreError::Repository(msg),
        })?;
        self.repo.put_snapshot(snapshot.clone())?;
        Ok(snapshot)
    }

    /// Stored snapshot, regenerated when missing.
    pub fn snapshot(
        &self,
        short_id: &ShortId,
        config: &SnapshotConfig,
    ) -> Result<StaticSnapshot, CoreError> {
        match self.repo.get_snapshot(short_id)? {
            Some(s) => Ok(s),
            None => self.publish_snapshot(short_id, config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_repo::InMemoryRepo;
    use crate::short_id::Base62ShortIdGenerator;
    use crate::{PlatformId, PlatformLink, Template};
    use std::time::SystemTime;

    struct TestClock;
    impl Clock for TestClock {
        fn now(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH
        }
    }

    fn svc() -> SmartLinkService<InMemoryRepo, Base62ShortIdGenerator, TestClock> {
        SmartLinkService::new(InMemoryRepo::new(), Base62ShortIdGenerator::new(4), TestClock)
    }

    fn input(artist: &str, title: &str) -> NewSmartLink {
        NewSmartLink {
            artist_name: artist.into(),
            track_title: title.into(),
            album_name: None,
            isrc: None,
            release_date: None,
            cover_image_url: None,
            description: None,
            platform_links: vec![PlatformLink {
                platform: PlatformId::Spotify,
                url: "https://open.spotify.com/track/abc123".into(),
            }],
            tracking: None,
            custom_slug: None,
            template: Template::Standard,
            primary_color: None,
            background_color: None,
            is_published: true,
        }
    }

    #[test]
    fn create_assigns_ids_and_slugs() {
        let svc = svc();
        let link = svc.create(input("Daft Punk", "Get Lucky")).unwrap();
        assert_eq!(link.short_id.as_str(), "0001");
        assert_eq!(link.id, "0000000000000001");
        assert_eq!(link.canonical_path(), "/smartlinks/daft-punk/get-lucky");
    }

    #[test]
    fn same_title_twice_gets_a_suffix() {
        let svc = svc();
        let a = svc.create(input("Band", "Song")).unwrap();
        let b = svc.create(input("Band", "Song")).unwrap();
        let c = svc.create(input("Other Band", "Song")).unwrap();
        assert_eq!(a.track_slug.as_str(), "song");
        assert_eq!(b.track_slug.as_str(), "song-2");
        assert_eq!(c.track_slug.as_str(), "song");
        assert_ne!(a.short_id, b.short_id);
    }

    #[test]
    fn custom_slug_conflict_is_rejected() {
        let svc = svc();
        let mut first = input("Band", "Song");
        first.custom_slug = Some(Slug::new("launch").unwrap());
        svc.create(first.clone()).unwrap();
        assert!(matches!(svc.create(first), Err(CoreError::AlreadyExists)));
    }

    #[test]
    fn create_validates_required_fields() {
        let svc = svc();
        assert!(matches!(
            svc.create(input(" ", "Song")),
            Err(CoreError::InvalidInput(_))
        ));
        let mut none = input("Band", "Song");
        none.platform_links.clear();
        assert!(matches!(svc.create(none), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn short_code_resolves_published_links_and_counts_clicks() {
        let svc = svc();
        let link = svc.create(input("Band", "Song")).unwrap();
        let got = svc.resolve_short_code(&link.short_id).unwrap();
        assert_eq!(got.click_count, 1);
        assert_eq!(svc.resolve_short_code(&link.short_id).unwrap().click_count, 2);

        let mut draft = input("Band", "Draft");
        draft.is_published = false;
        let draft = svc.create(draft).unwrap();
        assert!(matches!(
            svc.resolve_short_code(&draft.short_id),
            Err(CoreError::NotFound)
        ));
        assert!(matches!(
            svc.resolve_short_code(&ShortId::new("zzzz").unwrap()),
            Err(CoreError::NotFound)
        ));
    }

    #[test]
    fn slugs_lookup_matches_canonical_route() {
        let svc = svc();
        let link = svc.create(input("Band", "Song")).unwrap();
        let got = svc
            .get_by_slugs(&Slug::new("band").unwrap(), &Slug::new("song").unwrap())
            .unwrap();
        assert_eq!(got.id, link.id);
    }

    #[test]
    fn snapshot_is_stored_and_regenerated_lazily() {
        let svc = svc();
        let link = svc.create(input("Band", "Song")).unwrap();
        let cfg = SnapshotConfig {
            site_base_url: "https://links.example.com".into(),
            ..SnapshotConfig::default()
        };
        assert!(svc.repo().get_snapshot(&link.short_id).unwrap().is_none());
        let lazy = svc.snapshot(&link.short_id, &cfg).unwrap();
        assert_eq!(lazy.url, "https://links.example.com/s/0001");
        assert!(svc.repo().get_snapshot(&link.short_id).unwrap().is_some());
        let again = svc.publish_snapshot(&link.short_id, &cfg).unwrap();
        assert_eq!(lazy, again);
    }

    #[test]
    fn list_returns_items() {
        let svc = svc();
        for i in 0..3 {
            svc.create(input("Band", &format!("Song {}", i))).unwrap();
        }
        let items = svc.list(2).unwrap();
        assert_eq!(items.len(), 2);
    }
}
