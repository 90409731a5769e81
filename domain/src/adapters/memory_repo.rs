use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::{
    CoreError, ShortId, Slug, SmartLink, SmartLinkRepository, SnapshotStore, StaticSnapshot,
};

#[derive(Default)]
struct State {
    /// Keyed by id; ids are zero-padded hex of the sequence, so key order is
    /// creation order.
    links: BTreeMap<String, SmartLink>,
    snapshots: BTreeMap<String, StaticSnapshot>,
}

/// Simple in-memory repository for tests and the demo binary. Everything sits
/// behind one mutex.
pub struct InMemoryRepo {
    inner: Mutex<State>,
    seq: AtomicU64,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(State::default()),
            seq: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SmartLinkRepository for InMemoryRepo {
    fn next_sequence(&self) -> Result<u64, CoreError> {
        Ok(self.seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn get(&self, id: &str) -> Result<Option<SmartLink>, CoreError> {
        Ok(self.lock()?.links.get(id).cloned())
    }

    fn get_by_short_id(&self, short_id: &ShortId) -> Result<Option<SmartLink>, CoreError> {
        Ok(self
            .lock()?
            .links
            .values()
            .find(|l| &l.short_id == short_id)
            .cloned())
    }

    fn get_by_slugs(&self, artist: &Slug, track: &Slug) -> Result<Option<SmartLink>, CoreError> {
        Ok(self
            .lock()?
            .links
            .values()
            .find(|l| &l.artist_slug == artist && &l.track_slug == track)
            .cloned())
    }

    fn put(&self, link: SmartLink) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        let taken = state.links.contains_key(&link.id)
            || state.links.values().any(|l| {
                l.short_id == link.short_id
                    || (l.artist_slug == link.artist_slug && l.track_slug == link.track_slug)
            });
        if taken {
            return Err(CoreError::AlreadyExists);
        }
        state.links.insert(link.id.clone(), link);
        Ok(())
    }

    fn increment_click(&self, short_id: &ShortId) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        match state.links.values_mut().find(|l| &l.short_id == short_id) {
            Some(link) => {
                link.click_count += 1;
                Ok(())
            }
            None => Err(CoreError::NotFound),
        }
    }

    /// Newest first.
    fn list(&self, limit: usize) -> Result<Vec<SmartLink>, CoreError> {
        Ok(self
            .lock()?
            .links
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

impl SnapshotStore for InMemoryRepo {
    fn put_snapshot(&self, snapshot: StaticSnapshot) -> Result<(), CoreError> {
        self.lock()?
            .snapshots
            .insert(snapshot.short_id.as_str().to_string(), snapshot);
        Ok(())
    }

    fn get_snapshot(&self, short_id: &ShortId) -> Result<Option<StaticSnapshot>, CoreError> {
        Ok(self.lock()?.snapshots.get(short_id.as_str()).cloned())
    }
}
