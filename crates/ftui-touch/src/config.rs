#![forbid(unsafe_code)]

//! Thresholds and policies for touch recognition.
//!
//! # Loading
//!
//! With the `config-file` feature, a [`GestureConfig`] can be read from TOML
//! or JSON. Durations are written as integer milliseconds and every field is
//! optional:
//!
//! ```toml
//! hold_threshold_ms = 300
//! end_debounce_ms = 60
//! scroll_epsilon = 2.0
//! hit_policy = "bounds"
//! ```
//!
//! ```rust,ignore
//! let config = GestureConfig::from_toml_file("touch.toml")?;
//! ```

#[cfg(feature = "config-file")]
use std::path::Path;

#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};
use web_time::Duration;

/// Default hold threshold (250ms).
pub const HOLD_THRESHOLD: Duration = Duration::from_millis(250);
/// Default window in which an end right after a start is discarded (60ms).
pub const END_DEBOUNCE: Duration = Duration::from_millis(60);
/// Default scroll distance that turns a touch into a scroll (1 unit).
pub const SCROLL_EPSILON: f64 = 1.0;

/// How a pointer position is decided to be "on" a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "snake_case"))]
pub enum HitPolicy {
    /// Inside the hit region and not occluded by another element.
    #[default]
    Topmost,
    /// Inside the hit region; occlusion is ignored. Skips a hit test per
    /// moved sample at the cost of firing through overlapping elements.
    Bounds,
}

/// Recognizer configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct GestureConfig {
    /// Contact duration after which `touch-hold` fires (default: 250ms).
    #[cfg_attr(
        feature = "config-file",
        serde(rename = "hold_threshold_ms", with = "duration_ms")
    )]
    pub hold_threshold: Duration,
    /// An end this soon after a tap start is cancelled silently (default: 60ms).
    #[cfg_attr(
        feature = "config-file",
        serde(rename = "end_debounce_ms", with = "duration_ms")
    )]
    pub end_debounce: Duration,
    /// Scroll drift at or beyond which a gesture is invalidated (default: 1.0).
    pub scroll_epsilon: f64,
    /// Containment policy for enter/leave/end checks (default: topmost).
    pub hit_policy: HitPolicy,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            hold_threshold: HOLD_THRESHOLD,
            end_debounce: END_DEBOUNCE,
            scroll_epsilon: SCROLL_EPSILON,
            hit_policy: HitPolicy::Topmost,
        }
    }
}

impl GestureConfig {
    #[must_use]
    pub fn with_hold_threshold(mut self, threshold: Duration) -> Self {
        self.hold_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_end_debounce(mut self, debounce: Duration) -> Self {
        self.end_debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_scroll_epsilon(mut self, epsilon: f64) -> Self {
        self.scroll_epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_hit_policy(mut self, policy: HitPolicy) -> Self {
        self.hit_policy = policy;
        self
    }

    /// Check the configuration for values that make recognition degenerate.
    ///
    /// Returns a list of problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.hold_threshold.is_zero() {
            errors.push("hold_threshold must be > 0".to_string());
        }
        if self.end_debounce >= self.hold_threshold {
            errors.push(format!(
                "end_debounce ({}ms) must be shorter than hold_threshold ({}ms)",
                self.end_debounce.as_millis(),
                self.hold_threshold.as_millis()
            ));
        }
        if !self.scroll_epsilon.is_finite() || self.scroll_epsilon <= 0.0 {
            errors.push(format!(
                "scroll_epsilon must be finite and > 0, got {}",
                self.scroll_epsilon
            ));
        }
        errors
    }

    /// Load from a TOML string and validate.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.checked()
    }

    /// Load from a TOML file on disk and validate.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string and validate.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.checked()
    }

    /// Return `self` if valid, otherwise all problems as one error.
    pub fn checked(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

#[cfg(feature = "config-file")]
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use web_time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading or checking a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration parsed but failed validation.
    Invalid(Vec<String>),
    /// File I/O error.
    #[cfg(feature = "config-file")]
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-file")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-file")]
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(errors) => write!(f, "invalid gesture config: {}", errors.join("; ")),
            #[cfg(feature = "config-file")]
            Self::Io(e) => write!(f, "gesture config I/O error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => write!(f, "gesture config TOML error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Json(e) => write!(f, "gesture config JSON error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(_) => None,
            #[cfg(feature = "config-file")]
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Json(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let c = GestureConfig::default();
        assert_eq!(c.hold_threshold, Duration::from_millis(250));
        assert_eq!(c.end_debounce, Duration::from_millis(60));
        assert_eq!(c.scroll_epsilon, 1.0);
        assert_eq!(c.hit_policy, HitPolicy::Topmost);
    }

    #[test]
    fn default_validates_clean() {
        assert!(GestureConfig::default().validate().is_empty());
        assert!(GestureConfig::default().checked().is_ok());
    }

    #[test]
    fn validate_catches_debounce_not_shorter_than_hold() {
        let c = GestureConfig::default()
            .with_hold_threshold(Duration::from_millis(50))
            .with_end_debounce(Duration::from_millis(60));
        let errors = c.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("end_debounce"));
    }

    #[test]
    fn multiple_validation_errors_collected() {
        let c = GestureConfig::default()
            .with_hold_threshold(Duration::ZERO)
            .with_scroll_epsilon(f64::NAN);
        let err = c.checked().unwrap_err();
        let ConfigError::Invalid(errors) = &err else {
            panic!("expected Invalid, got {err:?}");
        };
        assert_eq!(errors.len(), 3);
        assert!(err.to_string().starts_with("invalid gesture config"));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn partial_toml_preserves_defaults() {
        let c = GestureConfig::from_toml_str("hold_threshold_ms = 400\nhit_policy = \"bounds\"")
            .unwrap();
        assert_eq!(c.hold_threshold, Duration::from_millis(400));
        assert_eq!(c.end_debounce, END_DEBOUNCE);
        assert_eq!(c.hit_policy, HitPolicy::Bounds);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn json_round_trip_uses_millis() {
        let c = GestureConfig::default().with_end_debounce(Duration::from_millis(40));
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"end_debounce_ms\":40"));
        assert_eq!(GestureConfig::from_json_str(&json).unwrap(), c);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn invalid_file_values_are_rejected() {
        let err = GestureConfig::from_toml_str("scroll_epsilon = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
