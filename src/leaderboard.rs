use chrono::Local;
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Store-assigned identity of a leaderboard entry.
pub type EntryId = i64;

/// An immutable scored entry as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub name: String,
    pub score_ms: u32,
}

/// Collaborator failure, kept distinct from the valid "no rank" outcome so
/// callers and tests can tell the two apart.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("leaderboard database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("leaderboard unavailable: {0}")]
    Unavailable(String),
}

/// Interface contract for the shared, durable leaderboard. The store keeps
/// every inserted entry; the bounded top-C leaderboard is a view produced by
/// `query_ascending`, not a property of storage.
pub trait LeaderboardStore {
    /// Entries ascending by score, bounded to `limit`. Among equal scores,
    /// earlier submissions sort first.
    fn query_ascending(&self, limit: usize) -> Result<Vec<Entry>, LeaderboardError>;

    /// Insert a scored entry and return its assigned id. Durable, but a
    /// subsequent `query_ascending` is not guaranteed to be strictly
    /// consistent with concurrent writers.
    fn insert(&self, name: &str, score_ms: u32) -> Result<EntryId, LeaderboardError>;
}

/// SQLite-backed leaderboard store.
#[derive(Debug)]
pub struct SqliteLeaderboard {
    conn: Connection,
}

impl SqliteLeaderboard {
    /// Open (or create) the leaderboard database at the default path.
    pub fn new() -> Result<Self, LeaderboardError> {
        let db_path = Self::default_path().unwrap_or_else(|| PathBuf::from("reflex_scores.db"));
        Self::open(&db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LeaderboardError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LeaderboardError::Unavailable(format!("create dir: {e}")))?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory store, used by tests and as a substitute collaborator.
    pub fn open_in_memory() -> Result<Self, LeaderboardError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Database location under `$HOME/.local/state/reflex`, falling back to
    /// the platform-specific data dir.
    fn default_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("reflex");
            Some(state_dir.join("scores.db"))
        } else {
            ProjectDirs::from("", "", "reflex")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("scores.db"))
        }
    }

    fn init_schema(conn: &Connection) -> Result<(), LeaderboardError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                score_ms INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scores_score_ms ON scores(score_ms)",
            [],
        )?;

        Ok(())
    }
}

impl LeaderboardStore for SqliteLeaderboard {
    fn query_ascending(&self, limit: usize) -> Result<Vec<Entry>, LeaderboardError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, score_ms
            FROM scores
            ORDER BY score_ms ASC, created_at ASC, id ASC
            LIMIT ?1
            "#,
        )?;

        // Typed get so a score outside u32 range (another writer's bad row)
        // surfaces as an error instead of wrapping.
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(Entry {
                id: row.get(0)?,
                name: row.get(1)?,
                score_ms: row.get::<_, u32>(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }

        Ok(entries)
    }

    fn insert(&self, name: &str, score_ms: u32) -> Result<EntryId, LeaderboardError> {
        self.conn.execute(
            "INSERT INTO scores (name, score_ms, created_at) VALUES (?1, ?2, ?3)",
            params![name, score_ms as i64, Local::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_distinct_ids() {
        let db = SqliteLeaderboard::open_in_memory().unwrap();
        let a = db.insert("ada", 200).unwrap();
        let b = db.insert("bob", 180).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_query_ascending_orders_by_score() {
        let db = SqliteLeaderboard::open_in_memory().unwrap();
        db.insert("slow", 320).unwrap();
        db.insert("fast", 150).unwrap();
        db.insert("mid", 240).unwrap();

        let entries = db.query_ascending(10).unwrap();
        let scores: Vec<u32> = entries.iter().map(|e| e.score_ms).collect();
        assert_eq!(scores, vec![150, 240, 320]);
    }

    #[test]
    fn test_query_ascending_respects_limit() {
        let db = SqliteLeaderboard::open_in_memory().unwrap();
        for i in 0..5 {
            db.insert("p", 100 + i).unwrap();
        }
        assert_eq!(db.query_ascending(3).unwrap().len(), 3);
        assert_eq!(db.query_ascending(0).unwrap().len(), 0);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let db = SqliteLeaderboard::open_in_memory().unwrap();
        let first = db.insert("first", 200).unwrap();
        let second = db.insert("second", 200).unwrap();

        let entries = db.query_ascending(10).unwrap();
        assert_eq!(entries[0].id, first);
        assert_eq!(entries[1].id, second);
    }

    #[test]
    fn test_out_of_range_score_is_an_error_not_a_wrap() {
        let db = SqliteLeaderboard::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO scores (name, score_ms, created_at) VALUES ('bad', -5, '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();

        assert!(matches!(
            db.query_ascending(10),
            Err(LeaderboardError::Db(_))
        ));
    }

    #[test]
    fn test_open_creates_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scores.db");
        let db = SqliteLeaderboard::open(&path).unwrap();
        db.insert("ada", 190).unwrap();
        drop(db);

        let reopened = SqliteLeaderboard::open(&path).unwrap();
        let entries = reopened.query_ascending(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "ada");
        assert_eq!(entries[0].score_ms, 190);
    }
}
