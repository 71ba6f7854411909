//! Connection handling: open-with-migrate, WAL mode, and the corrupt-file
//! reset path (rename aside + recreate, the same idiom this codebase already
//! uses for corrupted session state, generalized from a directory of files
//! to a single database file).

use pr_core::AppError;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::migrations;

/// A single bundled-SQLite-backed store file. All writers serialize through
/// one `tokio::sync::Mutex`-guarded connection; WAL mode lets readers proceed
/// without blocking on the writer's transaction.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if absent) the store file at `path`, migrating it to
    /// the current schema. If the existing file is corrupt, it is renamed
    /// aside with a timestamp suffix and recreated fresh.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let conn = match open_and_check(path) {
            Ok(Some(conn)) => conn,
            Ok(None) => {
                warn!(path = %path.display(), "store file failed integrity check; resetting");
                reset_and_reopen(path)?
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "store file unreadable; resetting");
                reset_and_reopen(path)?
            }
        };
        migrations::migrate(&conn).map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a fresh in-memory store, for tests.
    #[cfg(any(test, feature = "test-util"))]
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory().map_err(|e| AppError::Storage(e.to_string()))?;
        configure(&conn).map_err(|e| AppError::Storage(e.to_string()))?;
        migrations::migrate(&conn).map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

/// `Ok(Some(conn))` on a healthy database, `Ok(None)` when `integrity_check`
/// reports corruption, `Err` when the file can't even be opened/queried
/// (also a corruption signal, e.g. `SQLITE_NOTADB`).
fn open_and_check(path: &Path) -> rusqlite::Result<Option<Connection>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn = Connection::open(path)?;
    configure(&conn)?;
    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    Ok(if integrity == "ok" { Some(conn) } else { None })
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(())
}

fn reset_and_reopen(path: &Path) -> Result<Connection, AppError> {
    if path.exists() {
        let backup = backup_path(path);
        std::fs::rename(path, &backup).map_err(|e| AppError::Storage(e.to_string()))?;
        warn!(original = %path.display(), backup = %backup.display(), "reset corrupt store file");
    }
    let conn = Connection::open(path).map_err(|e| AppError::Storage(e.to_string()))?;
    configure(&conn).map_err(|e| AppError::Storage(e.to_string()))?;
    Ok(conn)
}

fn backup_path(path: &Path) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store.sqlite3".into());
    path.with_file_name(format!("{file_name}.corrupt-{stamp}"))
}
