//! Scroll-position to style-value interpolation.
//!
//! A scroll read is first reduced to a single *fade percentage* in `[0, 100]`,
//! which every channel then maps onto its own `[start, end]` window. Nothing in
//! this module touches the host or keeps state between calls.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Formatting applied to a channel's numeric value when it is written as a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Degrees,
    Pixels,
    #[default]
    Ratio,
    Percent,
    ViewportHeight,
}

impl Unit {
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Degrees => "deg",
            Unit::Pixels => "px",
            Unit::Ratio => "",
            Unit::Percent => "%",
            Unit::ViewportHeight => "vh",
        }
    }
}

fn full_range() -> f64 {
    100.0
}

/// One animated style property.
///
/// `start` and `end` are fade percentages. A window with `start >= end`
/// behaves as a step at `end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationChannel {
    pub name: String,
    /// Style property written on the header background node. Custom
    /// properties (`--name`) are written the same way.
    pub property: String,
    pub initial: f64,
    pub target: f64,
    #[serde(default)]
    pub start: f64,
    #[serde(default = "full_range")]
    pub end: f64,
    #[serde(default)]
    pub unit: Unit,
}

impl InterpolationChannel {
    pub fn new(name: impl Into<String>, property: impl Into<String>, initial: f64, target: f64) -> Self {
        Self {
            name: name.into(),
            property: property.into(),
            initial,
            target,
            start: 0.0,
            end: full_range(),
            unit: Unit::Ratio,
        }
    }

    pub fn between(mut self, start: f64, end: f64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Position of `fade` inside this channel's window, in `[0, 1]`.
    pub fn progress(&self, fade: f64) -> f64 {
        if fade >= self.end {
            return 1.0;
        }
        let range = self.end - self.start;
        if fade <= self.start || range <= 0.0 {
            return 0.0;
        }
        ((fade - self.start) / range).clamp(0.0, 1.0)
    }

    pub fn value_at(&self, fade: f64) -> StyleValue {
        let progress = self.progress(fade);
        // The window edges yield the configured endpoints bit-for-bit.
        let value = if progress <= 0.0 {
            self.initial
        } else if progress >= 1.0 {
            self.target
        } else {
            self.initial + progress * (self.target - self.initial)
        };
        StyleValue::new(value, self.unit)
    }
}

/// A formatted channel output, e.g. `20px` or `0.8`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleValue {
    pub value: f64,
    pub unit: Unit,
}

impl StyleValue {
    pub fn new(value: f64, unit: Unit) -> Self {
        // -0 would otherwise print as "-0".
        let value = if value == 0.0 { 0.0 } else { value };
        Self { value, unit }
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

/// How raw scroll distance is normalised into a fade percentage, and which
/// channel decides the "scrolled past" presentation class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Fraction of the element's extent treated as the full scroll distance.
    pub height_multiplier: f64,
    /// Speeds the fade up so it completes before the element leaves view.
    pub fade_multiplier: f64,
    pub threshold_channel: String,
    /// The header counts as scrolled past once the threshold channel's value
    /// drops to this or below.
    pub threshold: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            height_multiplier: 0.8,
            fade_multiplier: 3.85,
            threshold_channel: "opacity".to_string(),
            threshold: 0.35,
        }
    }
}

/// Normalised scroll progress in `[0, 100]`.
pub fn fade_percentage(scroll_offset: f64, element_extent: f64, config: &ScrollConfig) -> f64 {
    if scroll_offset.is_nan() || scroll_offset <= 0.0 {
        return 0.0;
    }
    let span = element_extent * config.height_multiplier;
    if span.is_nan() || span <= 0.0 {
        return 100.0;
    }
    if config.fade_multiplier > 0.0 && scroll_offset >= span / config.fade_multiplier {
        return 100.0;
    }
    let fade = (scroll_offset / span) * 100.0 * config.fade_multiplier;
    if fade.is_nan() {
        return 0.0;
    }
    fade.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelValue<'a> {
    pub name: &'a str,
    pub property: &'a str,
    pub value: StyleValue,
}

/// Output of a single scroll read.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleFrame<'a> {
    pub fade_percentage: f64,
    pub values: Vec<ChannelValue<'a>>,
    pub past_threshold: bool,
}

impl StyleFrame<'_> {
    pub fn get(&self, name: &str) -> Option<StyleValue> {
        self.values.iter().find(|v| v.name == name).map(|v| v.value)
    }
}

/// Computes every channel for one scroll read.
pub fn compute<'a>(
    scroll_offset: f64,
    element_extent: f64,
    channels: &'a [InterpolationChannel],
    config: &ScrollConfig,
) -> StyleFrame<'a> {
    let fade = fade_percentage(scroll_offset, element_extent, config);
    let values: Vec<ChannelValue<'a>> = channels
        .iter()
        .map(|channel| ChannelValue {
            name: &channel.name,
            property: &channel.property,
            value: channel.value_at(fade),
        })
        .collect();

    let past_threshold = values
        .iter()
        .find(|v| v.name == config.threshold_channel)
        .is_some_and(|v| v.value.value <= config.threshold);

    StyleFrame {
        fade_percentage: fade,
        values,
        past_threshold,
    }
}

/// Channel table used when the configuration file does not provide one.
pub fn default_channels() -> Vec<InterpolationChannel> {
    vec![
        InterpolationChannel::new("opacity", "opacity", 1.0, 0.0),
        InterpolationChannel::new("scale", "scale", 1.05, 1.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn midpoint_of_full_window_is_halfway() {
        let channel = InterpolationChannel::new("opacity", "opacity", 1.0, 0.6);
        assert!(close(channel.progress(50.0), 0.5));
        assert!(close(channel.value_at(50.0).value, 0.8));
    }

    #[test]
    fn pixel_channel_formats_with_unit() {
        let channel = InterpolationChannel::new("lift", "--header-lift", 0.0, 20.0).with_unit(Unit::Pixels);
        assert_eq!(channel.value_at(0.0).to_string(), "0px");
        assert_eq!(channel.value_at(100.0).to_string(), "20px");
    }

    #[test]
    fn other_units_format_with_their_suffix() {
        assert_eq!(StyleValue::new(45.0, Unit::Degrees).to_string(), "45deg");
        assert_eq!(StyleValue::new(12.5, Unit::Percent).to_string(), "12.5%");
        assert_eq!(StyleValue::new(30.0, Unit::ViewportHeight).to_string(), "30vh");
        assert_eq!(StyleValue::new(-0.0, Unit::Ratio).to_string(), "0");
    }

    #[test]
    fn partial_window_holds_then_ramps_then_holds() {
        let channel = InterpolationChannel::new("blur", "--blur", 0.0, 10.0).between(20.0, 60.0);
        assert_eq!(channel.value_at(10.0).value, 0.0);
        assert!(close(channel.value_at(40.0).value, 5.0));
        assert_eq!(channel.value_at(80.0).value, 10.0);
    }

    #[test]
    fn empty_window_is_a_step_at_end() {
        let channel = InterpolationChannel::new("snap", "--snap", 0.0, 1.0).between(50.0, 50.0);
        assert_eq!(channel.progress(49.9), 0.0);
        assert_eq!(channel.progress(50.0), 1.0);

        let inverted = InterpolationChannel::new("snap", "--snap", 0.0, 1.0).between(70.0, 30.0);
        assert_eq!(inverted.progress(50.0), 0.0);
        assert_eq!(inverted.progress(30.0), 1.0);
    }

    #[test]
    fn fade_uses_both_multipliers() {
        let config = ScrollConfig::default();
        // 100px of a 500px header: 100 / 400 * 100 * 3.85
        assert!(close(fade_percentage(100.0, 500.0, &config), 96.25));
        assert_eq!(fade_percentage(200.0, 500.0, &config), 100.0);
    }

    #[test]
    fn degenerate_extent_saturates_once_scrolled() {
        let config = ScrollConfig::default();
        assert_eq!(fade_percentage(0.0, 0.0, &config), 0.0);
        assert_eq!(fade_percentage(1.0, 0.0, &config), 100.0);
        assert_eq!(fade_percentage(f64::NAN, 300.0, &config), 0.0);
    }

    #[test]
    fn threshold_tracks_configured_channel() {
        let channels = default_channels();
        let config = ScrollConfig::default();

        let top = compute(0.0, 400.0, &channels, &config);
        assert!(!top.past_threshold);
        assert_eq!(top.get("opacity").map(|v| v.value), Some(1.0));
        assert_eq!(top.get("scale").map(|v| v.value), Some(1.05));

        let deep = compute(400.0, 400.0, &channels, &config);
        assert!(deep.past_threshold);
        assert_eq!(deep.get("opacity").map(|v| v.value), Some(0.0));
        assert_eq!(deep.get("scale").map(|v| v.value), Some(1.0));
    }

    #[test]
    fn missing_threshold_channel_never_passes() {
        let channels = vec![InterpolationChannel::new("scale", "scale", 1.05, 1.0)];
        let frame = compute(10_000.0, 100.0, &channels, &ScrollConfig::default());
        assert!(!frame.past_threshold);
    }

    proptest! {
        #[test]
        fn non_positive_offsets_yield_initial_values(
            offset in -10_000.0f64..=0.0,
            extent in 1.0f64..5_000.0,
            initial in -100.0f64..100.0,
            target in -100.0f64..100.0,
        ) {
            let channels = vec![InterpolationChannel::new("c", "--c", initial, target)];
            let frame = compute(offset, extent, &channels, &ScrollConfig::default());
            prop_assert_eq!(frame.fade_percentage, 0.0);
            prop_assert_eq!(frame.values[0].value.value, StyleValue::new(initial, Unit::Ratio).value);
        }

        #[test]
        fn offsets_past_the_fade_span_yield_targets(
            extent in 1.0f64..5_000.0,
            extra in 0.0f64..10_000.0,
            initial in -100.0f64..100.0,
            target in -100.0f64..100.0,
        ) {
            let config = ScrollConfig::default();
            let saturation = extent * config.height_multiplier / config.fade_multiplier;
            let channels = vec![InterpolationChannel::new("c", "--c", initial, target)];
            let frame = compute(saturation + extra, extent, &channels, &config);
            prop_assert_eq!(frame.fade_percentage, 100.0);
            prop_assert_eq!(frame.values[0].value.value, StyleValue::new(target, Unit::Ratio).value);
        }

        #[test]
        fn progress_stays_in_unit_interval(
            fade in -50.0f64..150.0,
            start in 0.0f64..100.0,
            end in 0.0f64..100.0,
        ) {
            let channel = InterpolationChannel::new("c", "--c", 0.0, 1.0).between(start, end);
            let p = channel.progress(fade);
            prop_assert!((0.0..=1.0).contains(&p));
        }
    }
}
