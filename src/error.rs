//! # Error Taxonomy
//!
//! Typed errors for the library side of Jukebox. The binary and the
//! interactive menu wrap these in `anyhow` for context, but the menu still
//! matches on the variants to decide between re-prompting, reporting and
//! giving up.
//!
//! | Variant            | Raised when                                        |
//! |--------------------|----------------------------------------------------|
//! | `MalformedResult`  | query bindings do not have the expected shape      |
//! | `DuplicateKey`     | inserting a title that already exists              |
//! | `NotFound`         | no such song or database                           |
//! | `AudioNotFound`    | the audio host has no file for a title             |
//! | `InvalidUserInput` | a menu choice or value could not be used           |
//! | `Store`            | the record store replied with an error status      |
//! | `Config`           | settings that cannot work (bad layout, limit)      |
//! | `Audio`            | no output device, or the file would not decode     |

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Malformed query result: {0}")]
    MalformedResult(String),

    #[error("A song titled '{0}' already exists")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No audio file at {0}")]
    AudioNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidUserInput(String),

    #[error("Record store error (status {status}): {message}")]
    Store { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResult(reason.into())
    }

    /// Errors that only need the user to try again.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidUserInput(_))
    }
}
