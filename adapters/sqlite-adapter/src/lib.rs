//! sqlite-adapter: SQLite implementation of the SmartLink storage ports.
//!
//! Purpose
//! - Provide a lightweight, file-based store to run the backend locally
//!   without any external service.
//! - Implements `SmartLinkRepository` and `SnapshotStore` from the `domain` crate.
//! - Backs `next_sequence()` with a counters table so short ids survive restarts.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Stores timestamps as seconds since UNIX_EPOCH (u64).
//! - Platform links live in their own table with an explicit position column;
//!   reads return them in the order they were submitted.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use domain::{
    CoreError, PlatformId, PlatformLink, ShortId, Slug, SmartLink, SmartLinkRepository,
    SnapshotStore, StaticSnapshot, Template, TrackingIds,
};
use rusqlite::{params, Connection, OptionalExtension};

const SELECT_SMARTLINK: &str = "SELECT id, short_id, artist_slug, track_slug, track_title, artist_name, album_name, isrc, release_date, cover_image_url, description, template, primary_color, background_color, is_published, created_at, click_count, ga4_id, gtm_id, meta_pixel_id, tiktok_pixel_id, google_ads_id FROM smartlinks";

/// SQLite-backed repository for local development and single-node deployments.
pub struct SqliteRepo {
    conn: Mutex<Connection>,
}

impl SqliteRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Construct from env var `DB_PATH` (defaults to `./data/smartlinks.db`).
    pub fn from_env() -> Result<Self, CoreError> {
        let path = std::env::var("DB_PATH").unwrap_or_else(|_| "./data/smartlinks.db".to_string());
        // Ensure directory exists
        if let Some(dir) = Path::new(&path).parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        Self::new(path)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }

    /// Atomically increment the global counter and return the new value.
    pub fn increment_global_counter(&self) -> Result<u64, CoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        // Ensure counter row exists
        tx.execute(
            "INSERT OR IGNORE INTO counters(name, value) VALUES('global', 0)",
            [],
        )
        .map_err(map_sqerr)?;
        tx.execute(
            "UPDATE counters SET value = value + 1 WHERE name = 'global'",
            [],
        )
        .map_err(map_sqerr)?;
        let val: u64 = tx
            .query_row(
                "SELECT value FROM counters WHERE name = 'global'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|v| v as u64)
            .map_err(map_sqerr)?;
        tx.commit().map_err(map_sqerr)?;
        Ok(val)
    }

    fn query_one(
        &self,
        clause: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Option<SmartLink>, CoreError> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE {}", SELECT_SMARTLINK, clause);
        let mut stmt = conn.prepare(&sql).map_err(map_sqerr)?;
        let mut rows = stmt.query(args).map_err(map_sqerr)?;
        match rows.next().map_err(map_sqerr)? {
            Some(row) => {
                let mut link = row_to_smartlink(row)?;
                link.platform_links = load_platform_links(&conn, &link.id)?;
                Ok(Some(link))
            }
            None => Ok(None),
        }
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS smartlinks (
            id TEXT PRIMARY KEY,
            short_id TEXT NOT NULL UNIQUE,
            artist_slug TEXT NOT NULL,
            track_slug TEXT NOT NULL,
            track_title TEXT NOT NULL,
            artist_name TEXT NOT NULL,
            album_name TEXT,
            isrc TEXT,
            release_date TEXT,
            cover_image_url TEXT,
            description TEXT,
            template TEXT NOT NULL DEFAULT 'standard',
            primary_color TEXT,
            background_color TEXT,
            is_published INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            click_count INTEGER NOT NULL DEFAULT 0,
            ga4_id TEXT,
            gtm_id TEXT,
            meta_pixel_id TEXT,
            tiktok_pixel_id TEXT,
            google_ads_id TEXT,
            UNIQUE (artist_slug, track_slug)
        );
        CREATE TABLE IF NOT EXISTS smartlink_platforms (
            smartlink_id TEXT NOT NULL REFERENCES smartlinks(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            platform TEXT NOT NULL,
            url TEXT NOT NULL,
            PRIMARY KEY (smartlink_id, position)
        );
        CREATE TABLE IF NOT EXISTS snapshots (
            short_id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            html TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS counters (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_smartlinks_created_at ON smartlinks(created_at);
        "#,
    )
    .map_err(map_sqerr)?;
    Ok(())
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation)
}

fn system_time_to_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

fn secs_to_system_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn row_to_smartlink(row: &rusqlite::Row) -> Result<SmartLink, CoreError> {
    let short_id: String = row.get(1).map_err(map_sqerr)?;
    let artist_slug: String = row.get(2).map_err(map_sqerr)?;
    let track_slug: String = row.get(3).map_err(map_sqerr)?;
    let template: String = row.get(11).map_err(map_sqerr)?;
    let is_published: i64 = row.get(14).map_err(map_sqerr)?;
    let created_at: i64 = row.get(15).map_err(map_sqerr)?;
    let click_count: i64 = row.get(16).map_err(map_sqerr)?;
    let tracking = TrackingIds {
        ga4_id: row.get(17).map_err(map_sqerr)?,
        gtm_id: row.get(18).map_err(map_sqerr)?,
        meta_pixel_id: row.get(19).map_err(map_sqerr)?,
        tiktok_pixel_id: row.get(20).map_err(map_sqerr)?,
        google_ads_id: row.get(21).map_err(map_sqerr)?,
    };

    Ok(SmartLink {
        id: row.get(0).map_err(map_sqerr)?,
        short_id: ShortId::new(short_id)
            .map_err(|e| CoreError::Repository(format!("bad short id in db: {e}")))?,
        artist_slug: Slug::new(artist_slug)
            .map_err(|e| CoreError::Repository(format!("bad slug in db: {e}")))?,
        track_slug: Slug::new(track_slug)
            .map_err(|e| CoreError::Repository(format!("bad slug in db: {e}")))?,
        track_title: row.get(4).map_err(map_sqerr)?,
        artist_name: row.get(5).map_err(map_sqerr)?,
        album_name: row.get(6).map_err(map_sqerr)?,
        isrc: row.get(7).map_err(map_sqerr)?,
        release_date: row.get(8).map_err(map_sqerr)?,
        cover_image_url: row.get(9).map_err(map_sqerr)?,
        description: row.get(10).map_err(map_sqerr)?,
        // filled in by the caller from smartlink_platforms
        platform_links: Vec::new(),
        tracking: Some(tracking).filter(|t| !t.is_empty()),
        template: Template::parse(&template).unwrap_or_default(),
        primary_color: row.get(12).map_err(map_sqerr)?,
        background_color: row.get(13).map_err(map_sqerr)?,
        is_published: is_published != 0,
        created_at: secs_to_system_time(created_at as u64),
        click_count: click_count as u64,
    })
}

fn load_platform_links(conn: &Connection, id: &str) -> Result<Vec<PlatformLink>, CoreError> {
    let mut stmt = conn
        .prepare("SELECT platform, url FROM smartlink_platforms WHERE smartlink_id = ?1 ORDER BY position")
        .map_err(map_sqerr)?;
    let mut rows = stmt.query(params![id]).map_err(map_sqerr)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(map_sqerr)? {
        let platform: String = row.get(0).map_err(map_sqerr)?;
        out.push(PlatformLink {
            platform: PlatformId::from_key(&platform),
            url: row.get(1).map_err(map_sqerr)?,
        });
    }
    Ok(out)
}

impl SmartLinkRepository for SqliteRepo {
    fn next_sequence(&self) -> Result<u64, CoreError> {
        self.increment_global_counter()
    }

    fn get(&self, id: &str) -> Result<Option<SmartLink>, CoreError> {
        self.query_one("id = ?1", &[&id])
    }

    fn get_by_short_id(&self, short_id: &ShortId) -> Result<Option<SmartLink>, CoreError> {
        self.query_one("short_id = ?1", &[&short_id.as_str()])
    }

    fn get_by_slugs(&self, artist: &Slug, track: &Slug) -> Result<Option<SmartLink>, CoreError> {
        self.query_one(
            "artist_slug = ?1 AND track_slug = ?2",
            &[&artist.as_str(), &track.as_str()],
        )
    }

    fn put(&self, link: SmartLink) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        let tracking = link.tracking.clone().unwrap_or_default();
        let res = tx.execute(
            "INSERT INTO smartlinks(id, short_id, artist_slug, track_slug, track_title, artist_name, album_name, isrc, release_date, cover_image_url, description, template, primary_color, background_color, is_published, created_at, click_count, ga4_id, gtm_id, meta_pixel_id, tiktok_pixel_id, google_ads_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            params![
                link.id,
                link.short_id.as_str(),
                link.artist_slug.as_str(),
                link.track_slug.as_str(),
                link.track_title,
                link.artist_name,
                link.album_name,
                link.isrc,
                link.release_date,
                link.cover_image_url,
                link.description,
                link.template.as_str(),
                link.primary_color,
                link.background_color,
                link.is_published as i64,
                system_time_to_secs(link.created_at) as i64,
                link.click_count as i64,
                tracking.ga4_id,
                tracking.gtm_id,
                tracking.meta_pixel_id,
                tracking.tiktok_pixel_id,
                tracking.google_ads_id,
            ],
        );
        if let Err(e) = res {
            if is_constraint_violation(&e) {
                return Err(CoreError::AlreadyExists);
            }
            return Err(map_sqerr(e));
        }
        for (position, pl) in link.platform_links.iter().enumerate() {
            tx.execute(
                "INSERT INTO smartlink_platforms(smartlink_id, position, platform, url) VALUES (?1, ?2, ?3, ?4)",
                params![link.id, position as i64, pl.platform.as_str(), pl.url],
            )
            .map_err(map_sqerr)?;
        }
        tx.commit().map_err(map_sqerr)?;
        Ok(())
    }

    fn increment_click(&self, short_id: &ShortId) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE smartlinks SET click_count = click_count + 1 WHERE short_id = ?1",
                params![short_id.as_str()],
            )
            .map_err(map_sqerr)?;
        if updated == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    fn list(&self, limit: usize) -> Result<Vec<SmartLink>, CoreError> {
        let conn = self.lock()?;
        let sql = format!("{} ORDER BY created_at DESC, id DESC LIMIT ?1", SELECT_SMARTLINK);
        let mut stmt = conn.prepare(&sql).map_err(map_sqerr)?;
        let mut rows = stmt.query(params![limit as i64]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_smartlink(row)?);
        }
        drop(rows);
        for link in out.iter_mut() {
            link.platform_links = load_platform_links(&conn, &link.id)?;
        }
        Ok(out)
    }
}

impl SnapshotStore for SqliteRepo {
    fn put_snapshot(&self, snapshot: StaticSnapshot) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO snapshots(short_id, url, html) VALUES (?1, ?2, ?3) ON CONFLICT(short_id) DO UPDATE SET url = excluded.url, html = excluded.html",
            params![snapshot.short_id.as_str(), snapshot.url, snapshot.html],
        )
        .map_err(map_sqerr)?;
        Ok(())
    }

    fn get_snapshot(&self, short_id: &ShortId) -> Result<Option<StaticSnapshot>, CoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT url, html FROM snapshots WHERE short_id = ?1",
            params![short_id.as_str()],
            |row| {
                Ok(StaticSnapshot {
                    short_id: short_id.clone(),
                    url: row.get(0)?,
                    html: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(map_sqerr)
    }
}
