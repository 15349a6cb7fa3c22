//! Engine configuration.
//!
//! Every knob has a default matching interactive use; `from_env` lets the
//! replay binary and hosts override them without code changes. Missing or
//! malformed values fall back to the default.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

const DEFAULT_TEXT_DEBOUNCE_MS: u64 = 120;
const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;
const DEFAULT_FONT_SIZE: f64 = 32.0;
const DEFAULT_FONT_FAMILY: &str = "Inter";
const DEFAULT_PLACEHOLDER_SIZE: f64 = 240.0;
const DEFAULT_MAX_DROPPED_IMAGE_SIDE: f64 = 400.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Quiet period after the last keystroke before a live text edit commits.
    pub text_debounce: Duration,
    /// Cadence at which a pending commit is flushed.
    pub frame_interval: Duration,
    /// Font size of text created from a palette drop.
    pub default_font_size: f64,
    pub default_font_family: String,
    /// Side of the square placeholder created from an image palette drop.
    pub placeholder_size: f64,
    /// Dropped image files are fitted into a square of this side.
    pub max_dropped_image_side: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            text_debounce: Duration::from_millis(DEFAULT_TEXT_DEBOUNCE_MS),
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            default_font_size: DEFAULT_FONT_SIZE,
            default_font_family: DEFAULT_FONT_FAMILY.to_string(),
            placeholder_size: DEFAULT_PLACEHOLDER_SIZE,
            max_dropped_image_side: DEFAULT_MAX_DROPPED_IMAGE_SIDE,
        }
    }
}

impl SceneConfig {
    /// Build from `SCENE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let text_debounce_ms = positive("SCENE_TEXT_DEBOUNCE_MS", DEFAULT_TEXT_DEBOUNCE_MS);
        let frame_interval_ms = positive("SCENE_FRAME_INTERVAL_MS", DEFAULT_FRAME_INTERVAL_MS);
        let default_font_family = match std::env::var("SCENE_DEFAULT_FONT_FAMILY") {
            Ok(family) if !family.trim().is_empty() => family,
            _ => DEFAULT_FONT_FAMILY.to_string(),
        };
        Self {
            text_debounce: Duration::from_millis(text_debounce_ms),
            frame_interval: Duration::from_millis(frame_interval_ms),
            default_font_size: positive("SCENE_DEFAULT_FONT_SIZE", DEFAULT_FONT_SIZE),
            default_font_family,
            placeholder_size: positive("SCENE_PLACEHOLDER_SIZE", DEFAULT_PLACEHOLDER_SIZE),
            max_dropped_image_side: positive("SCENE_MAX_DROPPED_IMAGE_SIDE", DEFAULT_MAX_DROPPED_IMAGE_SIDE),
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when it is
/// absent or does not parse.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => default,
        },
        Err(_) => default,
    }
}

/// Like [`env_parse`], but zero and negative values also fall back.
fn positive<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + PartialOrd + Default,
{
    let value = env_parse(key, default);
    if value > T::default() { value } else { default }
}
