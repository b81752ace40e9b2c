#![forbid(unsafe_code)]

//! Stack configuration: transition springs, motion, and focus policy.
//!
//! # Example
//!
//! ```
//! use presentable::config::{NavigatorConfig, SpringConfig};
//! use std::time::Duration;
//!
//! let config = NavigatorConfig::default()
//!     .bottom(SpringConfig::new(Duration::from_millis(350), 0.95, 0.5))
//!     .reduced_motion(false);
//! assert!(config.validate().is_ok());
//! ```
//!
//! With the `policy-config` feature the same settings load from TOML or
//! JSON. Durations are given in milliseconds and every field is optional:
//!
//! ```toml
//! min_scale = 0.9
//! reduced_motion = false
//!
//! [bottom]
//! duration_ms = 400
//! damping = 0.9
//! ```

use std::fmt;
use std::time::Duration;

/// Errors from configuration validation and loading.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The source text could not be parsed.
    Parse(String),
    /// A field holds a value outside its allowed range.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Damped spring parameters for one transition style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringConfig {
    /// Time until the spring is considered settled.
    pub duration: Duration,
    /// Damping ratio in `(0.0, 1.0]`; 1.0 is critically damped.
    pub damping: f64,
    /// Initial velocity, in total travel distances per second.
    pub initial_velocity: f64,
}

impl SpringConfig {
    /// Spring used by bottom sheets.
    pub const BOTTOM: Self = Self {
        duration: Duration::from_millis(500),
        damping: 0.90,
        initial_velocity: 0.8,
    };

    /// Livelier spring used by center popups.
    pub const CENTER: Self = Self {
        duration: Duration::from_millis(600),
        damping: 0.75,
        initial_velocity: 0.8,
    };

    pub const fn new(duration: Duration, damping: f64, initial_velocity: f64) -> Self {
        Self {
            duration,
            damping,
            initial_velocity,
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(ConfigError::Invalid {
                field,
                reason: format!("damping {} is outside (0, 1]", self.damping),
            });
        }
        if !self.initial_velocity.is_finite() || self.initial_velocity < 0.0 {
            return Err(ConfigError::Invalid {
                field,
                reason: format!(
                    "initial velocity {} must be finite and non-negative",
                    self.initial_velocity
                ),
            });
        }
        Ok(())
    }
}

/// Configuration for a [`PresentationStack`](crate::PresentationStack).
#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorConfig {
    /// Spring for [`TransitionType::Bottom`](crate::TransitionType::Bottom).
    pub bottom: SpringConfig,
    /// Spring for [`TransitionType::Center`](crate::TransitionType::Center).
    pub center: SpringConfig,
    /// Starting scale of center popups, in `(0.0, 1.0]`.
    pub min_scale: f64,
    /// Complete every transition instantly.
    pub reduced_motion: bool,
    /// Resign keyboard focus before presenting or pushing.
    pub resign_focus: bool,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            bottom: SpringConfig::BOTTOM,
            center: SpringConfig::CENTER,
            min_scale: f64::MIN_POSITIVE,
            reduced_motion: false,
            resign_focus: true,
        }
    }
}

impl NavigatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration with every transition completing instantly.
    pub fn instant() -> Self {
        Self::default().reduced_motion(true)
    }

    pub fn bottom(mut self, spring: SpringConfig) -> Self {
        self.bottom = spring;
        self
    }

    pub fn center(mut self, spring: SpringConfig) -> Self {
        self.center = spring;
        self
    }

    pub fn min_scale(mut self, scale: f64) -> Self {
        self.min_scale = scale;
        self
    }

    pub fn reduced_motion(mut self, enabled: bool) -> Self {
        self.reduced_motion = enabled;
        self
    }

    pub fn resign_focus(mut self, enabled: bool) -> Self {
        self.resign_focus = enabled;
        self
    }

    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bottom.validate("bottom")?;
        self.center.validate("center")?;
        if !(self.min_scale > 0.0 && self.min_scale <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "min_scale",
                reason: format!("{} is outside (0, 1]", self.min_scale),
            });
        }
        Ok(())
    }
}

#[cfg(feature = "policy-config")]
mod policy {
    use super::{ConfigError, NavigatorConfig, SpringConfig};
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct RawSpring {
        duration_ms: Option<u64>,
        damping: Option<f64>,
        initial_velocity: Option<f64>,
    }

    impl RawSpring {
        fn apply(self, base: SpringConfig) -> SpringConfig {
            SpringConfig {
                duration: self
                    .duration_ms
                    .map_or(base.duration, Duration::from_millis),
                damping: self.damping.unwrap_or(base.damping),
                initial_velocity: self.initial_velocity.unwrap_or(base.initial_velocity),
            }
        }
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct RawPolicy {
        #[serde(default)]
        bottom: RawSpring,
        #[serde(default)]
        center: RawSpring,
        min_scale: Option<f64>,
        reduced_motion: Option<bool>,
        resign_focus: Option<bool>,
    }

    impl RawPolicy {
        fn into_config(self) -> Result<NavigatorConfig, ConfigError> {
            let base = NavigatorConfig::default();
            let config = NavigatorConfig {
                bottom: self.bottom.apply(base.bottom),
                center: self.center.apply(base.center),
                min_scale: self.min_scale.unwrap_or(base.min_scale),
                reduced_motion: self.reduced_motion.unwrap_or(base.reduced_motion),
                resign_focus: self.resign_focus.unwrap_or(base.resign_focus),
            };
            config.validate()?;
            Ok(config)
        }
    }

    impl NavigatorConfig {
        /// Load from TOML; missing fields keep their defaults.
        ///
        /// # Errors
        ///
        /// [`ConfigError::Parse`] for malformed input or unknown keys,
        /// [`ConfigError::Invalid`] for out-of-range values.
        pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
            let raw: RawPolicy =
                toml::from_str(source).map_err(|err| ConfigError::Parse(err.to_string()))?;
            raw.into_config()
        }

        /// Load from JSON; missing fields keep their defaults.
        ///
        /// # Errors
        ///
        /// Same as [`from_toml_str`](Self::from_toml_str).
        pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
            let raw: RawPolicy =
                serde_json::from_str(source).map_err(|err| ConfigError::Parse(err.to_string()))?;
            raw.into_config()
        }
    }
}
