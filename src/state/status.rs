//! Diagnostic snapshot types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of the background drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No drawable and nothing pending.
    #[default]
    Idle,
    /// Waiting for the app root to mount the first drawable.
    Mounting,
    /// A drawable is showing `cover`.
    Active,
    /// An apply failed; the old drawable is gone and a new one is being built.
    Replacing,
}

/// Diagnostic snapshot of the controller, safe to hand out and serialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackdropStatus {
    pub phase: Phase,
    pub enabled: bool,
    /// Cover currently shown by the drawable.
    pub cover: Option<String>,
    /// Cover an in-flight apply is working towards.
    pub pending_cover: Option<String>,
    pub drawable_active: bool,
    pub container_mounted: bool,
    pub pathname: Option<String>,
    pub header_bound: bool,
    pub replacements: u32,
    pub last_applied_at: Option<DateTime<Utc>>,
}
