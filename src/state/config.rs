//! Backdrop configuration loaded from JSON, with defaults for every field.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::interpolate::{default_channels, InterpolationChannel, ScrollConfig};
use crate::state::{BackdropError, BackdropResult};

/// Visual tuning handed to the drawable factory untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawableOptions {
    /// Cross-fade duration in seconds.
    pub transition: f64,
    /// Blur radius in pixels.
    pub blur: f64,
    pub speed: f64,
}

impl Default for DrawableOptions {
    fn default() -> Self {
        Self {
            transition: 0.15,
            blur: 40.0,
            speed: 0.2,
        }
    }
}

/// Host selectors, each a list of fallbacks tried in order. Host markup
/// differs between client versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub app_root: Vec<String>,
    pub scroll_container: Vec<String>,
    pub secondary_wrapper: Vec<String>,
    pub header_background: Vec<String>,
    pub header_content: Vec<String>,
    pub content_spacing: Vec<String>,
    pub profile_picture: Vec<String>,
}

impl Default for Selectors {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            app_root: list(&["#main .Root"]),
            scroll_container: list(&[
                r#".main-view-container .main-view-container__scroll-node [data-overlayscrollbars-viewport="scrollbarHidden overflowXHidden overflowYScroll"]"#,
            ]),
            secondary_wrapper: list(&[".main-view-container .under-main-view"]),
            header_background: list(&[
                "div .wozXSN04ZBOkhrsuY5i2.XUwMufC5NCgIyRMyGXLD",
                "div .main-entityHeader-background.main-entityHeader-gradient",
            ]),
            header_content: list(&[
                ".main-view-container .main-entityHeader-container.main-entityHeader-withBackgroundImage",
            ]),
            content_spacing: list(&[".iWTIFTzhRZT0rCD0_gOK"]),
            profile_picture: list(&[".main-entityHeader-imageContainer"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassNames {
    pub background_container: Vec<String>,
    pub background_layer: Vec<String>,
    pub scrolled_past: String,
    pub profile_picture_applied: String,
    pub profile_picture_container: Vec<String>,
    pub profile_picture_wrapper: Vec<String>,
    pub profile_picture_image: Vec<String>,
}

impl Default for ClassNames {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            background_container: list(&["CoverBackdropContainer", "BackgroundContainer"]),
            background_layer: list(&["CoverBackdrop", "BackgroundLayer"]),
            scrolled_past: "ScrolledPast".to_string(),
            profile_picture_applied: "ProfilePictureApplied".to_string(),
            profile_picture_container: list(&[
                "main-entityHeader-imageContainer",
                "main-entityHeader-imageContainerNew",
            ]),
            profile_picture_wrapper: list(&["main-entityHeader-image"]),
            profile_picture_image: list(&[
                "main-image-image",
                "main-entityHeader-image",
                "main-entityHeader-shadow",
                "main-entityHeader-circle",
                "main-image-loaded",
            ]),
        }
    }
}

/// Everything tunable about the backdrop. Every field has a default, so a
/// partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackdropConfig {
    pub poll_interval_ms: u64,
    pub watchdog_ms: u64,
    pub toggle_settle_ms: u64,
    pub notification_secs: u64,
    pub drawable: DrawableOptions,
    pub scroll: ScrollConfig,
    pub channels: Vec<InterpolationChannel>,
    pub selectors: Selectors,
    pub classes: ClassNames,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            watchdog_ms: 5_000,
            toggle_settle_ms: 10,
            notification_secs: 5,
            drawable: DrawableOptions::default(),
            scroll: ScrollConfig::default(),
            channels: default_channels(),
            selectors: Selectors::default(),
            classes: ClassNames::default(),
        }
    }
}

impl BackdropConfig {
    /// Reads a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> BackdropResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let config: BackdropConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BackdropResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(BackdropError::Config("poll_interval_ms must be positive".into()));
        }
        for channel in &self.channels {
            let in_range = |v: f64| (0.0..=100.0).contains(&v);
            if !in_range(channel.start) || !in_range(channel.end) {
                return Err(BackdropError::Config(format!(
                    "channel '{}' window must lie within 0..=100",
                    channel.name
                )));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    pub fn toggle_settle(&self) -> Duration {
        Duration::from_millis(self.toggle_settle_ms)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolate::Unit;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BackdropConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, BackdropConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "watchdog_ms": 2500,
                "scroll": {{ "fade_multiplier": 2.0 }},
                "channels": [
                    {{ "name": "lift", "property": "--lift", "initial": 0, "target": 20, "unit": "pixels" }}
                ]
            }}"#
        )
        .unwrap();

        let config = BackdropConfig::load(file.path()).unwrap();
        assert_eq!(config.watchdog(), Duration::from_millis(2500));
        assert_eq!(config.scroll.fade_multiplier, 2.0);
        assert_eq!(config.scroll.height_multiplier, 0.8);
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].unit, Unit::Pixels);
        assert_eq!(config.channels[0].end, 100.0);
        assert_eq!(config.poll_interval_ms, 50);
    }

    #[test]
    fn rejects_out_of_range_windows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "channels": [ {{ "name": "x", "property": "x", "initial": 0, "target": 1, "end": 140 }} ] }}"#
        )
        .unwrap();
        assert!(matches!(BackdropConfig::load(file.path()), Err(BackdropError::Config(_))));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(BackdropConfig::load(file.path()), Err(BackdropError::Json(_))));
    }
}
