//! Forward-only migration ladder. `schema_version` is the connection's
//! `PRAGMA user_version`; each step runs once, in order, and must be safe to
//! re-run against a partially-applied database (hence `IF NOT EXISTS` /
//! guarded `ALTER TABLE` throughout).

use rusqlite::Connection;

type Migration = fn(&Connection) -> rusqlite::Result<()>;

/// Ordered (step number, migration) pairs. Step numbers are informational —
/// application order is the array order, which must stay monotonic.
const MIGRATIONS: &[(u32, Migration)] = &[
    (1, create_reviews),
    (2, create_analysis_runs),
    (3, create_comments),
    (4, create_local_diffs),
    (5, create_councils),
    (6, create_context_files),
    (7, create_chat_tables),
    (8, add_reviews_branch_column),
    (9, add_comments_is_raw_column),
];

pub const TARGET_SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

/// Advance `conn` from its current `user_version` to [`TARGET_SCHEMA_VERSION`],
/// running each unapplied step in order inside its own transaction.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    for &(step, migration) in MIGRATIONS.iter().filter(|(step, _)| *step > current) {
        conn.execute_batch("BEGIN")?;
        if let Err(e) = migration(conn) {
            conn.execute_batch("ROLLBACK").ok();
            return Err(e);
        }
        conn.pragma_update(None, "user_version", step)?;
        conn.execute_batch("COMMIT")?;
    }
    Ok(())
}

fn create_reviews(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            review_type TEXT NOT NULL,
            repository TEXT,
            pr_number INTEGER,
            local_path TEXT,
            local_head_sha TEXT,
            status TEXT NOT NULL,
            name TEXT,
            summary TEXT,
            custom_instructions TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            submitted_at TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_reviews_pr
            ON reviews(pr_number, repository) WHERE review_type = 'pr';
        CREATE UNIQUE INDEX IF NOT EXISTS idx_reviews_local
            ON reviews(local_path, local_head_sha) WHERE review_type = 'local';",
    )
}

fn create_analysis_runs(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS analysis_runs (
            id TEXT PRIMARY KEY,
            review_id INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
            parent_run_id TEXT REFERENCES analysis_runs(id) ON DELETE CASCADE,
            provider TEXT,
            model TEXT,
            tier TEXT,
            status TEXT NOT NULL,
            config_type TEXT NOT NULL,
            levels_config TEXT NOT NULL DEFAULT '{}',
            head_sha TEXT NOT NULL DEFAULT '',
            custom_instructions TEXT,
            repo_instructions TEXT,
            request_instructions TEXT,
            summary TEXT,
            total_suggestions INTEGER NOT NULL DEFAULT 0,
            files_analyzed INTEGER NOT NULL DEFAULT 0,
            started_at TEXT NOT NULL,
            completed_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_runs_review ON analysis_runs(review_id);
        CREATE INDEX IF NOT EXISTS idx_runs_parent ON analysis_runs(parent_run_id);",
    )
}

fn create_comments(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            review_id INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
            source TEXT NOT NULL,
            author TEXT NOT NULL DEFAULT '',
            ai_run_id TEXT REFERENCES analysis_runs(id) ON DELETE SET NULL,
            ai_level INTEGER,
            ai_confidence REAL,
            reasoning TEXT,
            file TEXT NOT NULL,
            line_start INTEGER,
            line_end INTEGER,
            side TEXT NOT NULL DEFAULT 'RIGHT',
            diff_position INTEGER,
            is_file_level INTEGER NOT NULL DEFAULT 0,
            comment_type TEXT NOT NULL DEFAULT 'comment',
            title TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL,
            commit_sha TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            parent_id INTEGER REFERENCES comments(id) ON DELETE SET NULL,
            adopted_as_id INTEGER REFERENCES comments(id) ON DELETE SET NULL,
            voice_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_comments_review ON comments(review_id);
        CREATE INDEX IF NOT EXISTS idx_comments_run ON comments(ai_run_id);
        CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id);",
    )
}

fn create_local_diffs(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS local_diffs (
            review_id INTEGER PRIMARY KEY REFERENCES reviews(id) ON DELETE CASCADE,
            diff_text TEXT NOT NULL,
            tracked_changes INTEGER NOT NULL DEFAULT 0,
            untracked_files INTEGER NOT NULL DEFAULT 0,
            staged_changes INTEGER NOT NULL DEFAULT 0,
            unstaged_changes INTEGER NOT NULL DEFAULT 0,
            digest TEXT NOT NULL,
            captured_at TEXT NOT NULL
        );",
    )
}

fn create_councils(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS councils (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            council_type TEXT NOT NULL,
            config_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_used_at TEXT
        );",
    )
}

fn create_context_files(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS context_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            review_id INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
            file TEXT NOT NULL,
            line_start INTEGER NOT NULL,
            line_end INTEGER NOT NULL,
            label TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_context_files_review ON context_files(review_id);",
    )
}

fn create_chat_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS chat_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            comment_id INTEGER NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS chat_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL REFERENCES chat_sessions(id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_messages_session ON chat_messages(session_id);",
    )
}

fn add_reviews_branch_column(conn: &Connection) -> rusqlite::Result<()> {
    add_column_if_missing(conn, "reviews", "branch", "TEXT")
}

fn add_comments_is_raw_column(conn: &Connection) -> rusqlite::Result<()> {
    add_column_if_missing(conn, "comments", "is_raw", "INTEGER NOT NULL DEFAULT 0")
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    ddl_type: &str,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(Result::ok)
        .any(|name| name == column);
    drop(stmt);
    if !exists {
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {ddl_type}"))?;
    }
    Ok(())
}
