// src/store.rs

use crate::error::{HistError, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Safari's history database, relative to the home directory
pub const SAFARI_HISTORY_PATH: &str = "Library/Safari/History.db";

pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(HistError::NoHomeDir)?;
    Ok(home.join(SAFARI_HISTORY_PATH))
}

/// Opens the history database read-only.
pub fn open(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI;
    Connection::open_with_flags(path, flags).map_err(|source| HistError::Open {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rusqlite::{params, Connection};

    /// 2025-01-01T10:00:00Z
    pub const BASE_TIME: f64 = 757_418_400.0;

    pub fn empty_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE history_items (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                domain_expansion TEXT,
                visit_count INTEGER DEFAULT 0
            );
            CREATE TABLE history_visits (
                id INTEGER PRIMARY KEY,
                history_item INTEGER,
                visit_time REAL,
                title TEXT,
                FOREIGN KEY (history_item) REFERENCES history_items(id)
            );",
        )
        .unwrap();
        conn
    }

    /// Four items and five visits spread over 2025-01-01 and 2025-01-02.
    pub fn seeded_db() -> Connection {
        let conn = empty_db();
        conn.execute_batch(
            "INSERT INTO history_items (id, url, domain_expansion, visit_count) VALUES
                (1, 'https://github.com/test', 'github', 10),
                (2, 'https://youtube.com/watch', 'youtube', 25),
                (3, 'https://google.com/search', 'google', 15),
                (4, 'https://example.com', NULL, 5);",
        )
        .unwrap();

        let visits = [
            (1, 1, BASE_TIME, "GitHub - Test Repo"),
            (2, 2, BASE_TIME + 3600.0, "YouTube Video"),
            (3, 3, BASE_TIME + 7200.0, "Google Search"),
            (4, 1, BASE_TIME + 86400.0, "GitHub - Another Page"),
            (5, 2, BASE_TIME + 90000.0, "YouTube - Music"),
        ];
        for (id, item, time, title) in visits {
            conn.execute(
                "INSERT INTO history_visits (id, history_item, visit_time, title) VALUES (?1, ?2, ?3, ?4)",
                params![id, item, time, title],
            )
            .unwrap();
        }
        conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_under_home() {
        let path = default_db_path().unwrap();
        assert!(path.ends_with("Library/Safari/History.db"));
    }

    #[test]
    fn opening_a_missing_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = open(&dir.path().join("missing.db")).unwrap_err();
        assert!(matches!(err, HistError::Open { .. }));
    }

    #[test]
    fn opened_database_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("History.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE history_items (id INTEGER PRIMARY KEY, url TEXT);")
            .unwrap();

        let conn = open(&path).unwrap();
        let write = conn.execute("INSERT INTO history_items (url) VALUES ('https://a.com')", []);
        assert!(write.is_err());
    }
}
