//! Configuration, persisted settings and status snapshots.

pub mod config;
pub mod settings;
pub mod status;

pub use config::{BackdropConfig, ClassNames, DrawableOptions, Selectors};
pub use settings::{Settings, Toggle};
pub use status::{BackdropStatus, Phase};

use thiserror::Error;

/// Errors raised inside the backdrop subsystem.
///
/// None of these ever reach the host loop: every task that can produce one
/// ends in a local log statement.
#[derive(Debug, Error)]
pub enum BackdropError {
    #[error("Host error: {0}")]
    Host(String),

    #[error("Drawable error: {0}")]
    Drawable(String),

    #[error("No cover art available for the current song")]
    MissingCoverArt,

    #[error("Artist image lookup failed for {artist_id}: {reason}")]
    ArtistImage { artist_id: String, reason: String },

    #[error("Disposal failed: {0}")]
    Disposal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type BackdropResult<T> = Result<T, BackdropError>;
