use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::models::{CachedSnapshot, GitHubUser, Repository};

const FAVORITES_KEY: &str = "gitscope_favorites";
const CACHE_KEY: &str = "gitscope_cache";

/// How long a cached snapshot stays usable.
pub const CACHE_TTL_MS: i64 = 10 * 60 * 1000;

// Nothing fails once the store is open. Undecodable entries read back as
// absent and failed writes are only logged.
pub struct LocalStore {
    conn: Connection,
}

#[derive(Serialize)]
struct SnapshotRecord<'a> {
    user: &'a GitHubUser,
    repos: &'a [Repository],
    timestamp: i64,
}

#[derive(Deserialize)]
struct StoredSnapshot {
    user: GitHubUser,
    repos: Vec<Repository>,
    timestamp: i64,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_db()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    pub fn favorites(&self) -> Vec<String> {
        self.read(FAVORITES_KEY)
            .and_then(|raw| decode::<Vec<String>>(FAVORITES_KEY, &raw))
            .unwrap_or_default()
    }

    pub fn add_favorite(&self, username: &str) -> Vec<String> {
        let mut favorites = self.favorites();
        let username = normalize(username);
        if username.is_empty() || favorites.contains(&username) {
            return favorites;
        }

        favorites.push(username);
        self.write_favorites(&favorites);
        favorites
    }

    pub fn remove_favorite(&self, username: &str) -> Vec<String> {
        let username = normalize(username);
        let mut favorites = self.favorites();
        favorites.retain(|f| *f != username);
        self.write_favorites(&favorites);
        favorites
    }

    pub fn is_favorite(&self, username: &str) -> bool {
        self.favorites().contains(&normalize(username))
    }

    fn write_favorites(&self, favorites: &[String]) {
        match serde_json::to_string(favorites) {
            Ok(json) => self.write(FAVORITES_KEY, &json),
            Err(e) => tracing::warn!("Failed to encode favorites: {}", e),
        }
    }

    pub fn cache_snapshot(&self, user: &GitHubUser, repos: &[Repository]) {
        self.cache_snapshot_at(user, repos, Utc::now());
    }

    pub fn cache_snapshot_at(&self, user: &GitHubUser, repos: &[Repository], now: DateTime<Utc>) {
        let record = SnapshotRecord {
            user,
            repos,
            timestamp: now.timestamp_millis(),
        };

        match serde_json::to_string(&record) {
            Ok(json) => {
                self.write(CACHE_KEY, &json);
                tracing::debug!("Cached snapshot for {}", user.login);
            }
            Err(e) => tracing::warn!("Failed to encode snapshot for {}: {}", user.login, e),
        }
    }

    /// The last-viewed snapshot, if one exists and is younger than the TTL.
    pub fn cached_snapshot(&self) -> Option<CachedSnapshot> {
        self.cached_snapshot_at(Utc::now())
    }

    pub fn cached_snapshot_at(&self, now: DateTime<Utc>) -> Option<CachedSnapshot> {
        let raw = self.read(CACHE_KEY)?;
        let stored: StoredSnapshot = decode(CACHE_KEY, &raw)?;

        let Some(age_ms) = now.timestamp_millis().checked_sub(stored.timestamp) else {
            tracing::debug!("Cached snapshot has an out-of-range timestamp {}", stored.timestamp);
            return None;
        };
        if age_ms >= CACHE_TTL_MS {
            tracing::debug!("Cached snapshot for {} expired {} ms ago", stored.user.login, age_ms - CACHE_TTL_MS);
            return None;
        }

        let captured_at = DateTime::from_timestamp_millis(stored.timestamp)?;
        Some(CachedSnapshot {
            user: stored.user,
            repos: stored.repos,
            captured_at,
        })
    }

    fn read(&self, key: &str) -> Option<String> {
        let result = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional();

        match result {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Reading {} failed, treating as absent: {}", key, e);
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        let result = self.conn.execute(
            r#"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        );

        if let Err(e) = result {
            tracing::warn!("Failed to persist {}: {}", key, e);
        }
    }
}

fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Stored {} is unreadable, treating as absent: {}", key, e);
            None
        }
    }
}
