//! The persisted state layer: one bundled SQLite file holding reviews,
//! analysis runs, comments/suggestions, cached local diffs, councils,
//! context files, and chat sessions. Every repository method hangs off
//! [`Store`], each serializing through one `tokio::sync::Mutex`-guarded
//! connection (`connection.rs`).

mod chat;
mod comments;
mod connection;
mod context_files;
mod councils;
mod local_diffs;
mod migrations;
mod reviews;
mod runs;

pub use connection::Store;
pub use runs::NewRun;
