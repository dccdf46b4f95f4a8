//! Configuration types for taskmon.
//!
//! This module contains the configuration used by the [`Inspector`]
//! facade: how derived metrics are computed, how task listings and history
//! requests are bounded, and how logging is set up.
//!
//! [`Inspector`]: crate::inspector::Inspector

use crate::error::{TaskmonError, TaskmonResult};
use serde::{Deserialize, Serialize};

/// Main configuration for taskmon.
///
/// # Examples
///
/// ```rust
/// use taskmon::config::*;
///
/// // Use default configuration
/// let config = TaskmonConfig::default();
/// assert!(config.validate().is_ok());
///
/// // Custom configuration
/// let config = TaskmonConfig {
///     projection: ProjectionConfig {
///         derived_metrics: DerivedMetricPolicy::Clamp,
///         ..Default::default()
///     },
///     listing: ListingConfig::default().with_default_page_size(50),
///     ..Default::default()
/// };
/// assert_eq!(config.listing.default_page_size, 50);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskmonConfig {
    /// Snapshot projection configuration
    pub projection: ProjectionConfig,

    /// Task listing configuration
    pub listing: ListingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// How `succeeded = processed - failed` treats counters where
/// `failed > processed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedMetricPolicy {
    /// Report the raw difference, even when negative
    #[default]
    Passthrough,
    /// Report 0 instead of a negative count
    Clamp,
    /// Fail with a data integrity error
    Reject,
}

/// Projection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Policy for the derived succeeded count
    pub derived_metrics: DerivedMetricPolicy,

    /// Days of history returned when a request asks for 0 days
    pub default_history_days: u32,

    /// Upper bound on days of history per request
    pub max_history_days: u32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            derived_metrics: DerivedMetricPolicy::Passthrough,
            default_history_days: 7,
            max_history_days: 90,
        }
    }
}

impl ProjectionConfig {
    /// Set the derived metric policy.
    pub fn with_policy(mut self, policy: DerivedMetricPolicy) -> Self {
        self.derived_metrics = policy;
        self
    }

    /// Set the default and maximum history window.
    pub fn with_history_days(mut self, default_days: u32, max_days: u32) -> Self {
        self.default_history_days = default_days;
        self.max_history_days = max_days;
        self
    }
}

/// Task listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Page size used when a request asks for 0
    pub default_page_size: usize,

    /// Upper bound on page size
    pub max_page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 1000,
        }
    }
}

impl ListingConfig {
    /// Set the default page size.
    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Set the maximum page size.
    pub fn with_max_page_size(mut self, page_size: usize) -> Self {
        self.max_page_size = page_size;
        self
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: LogLevel,

    /// Enable colored output
    pub colored: bool,

    /// Include timestamps in logs
    pub include_timestamps: bool,

    /// Include target module in logs
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            colored: true,
            include_timestamps: true,
            include_targets: false,
        }
    }
}

impl LoggingConfig {
    /// Install a global `tracing` subscriber built from this configuration.
    ///
    /// Fails if a global subscriber is already set.
    pub fn install(&self) -> TaskmonResult<()> {
        let builder = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::from(self.level))
            .with_ansi(self.colored)
            .with_target(self.include_targets);

        let result = if self.include_timestamps {
            builder.try_init()
        } else {
            builder.without_time().try_init()
        };

        result.map_err(|e| TaskmonError::config(format!("Failed to install logging: {}", e)))
    }
}

/// Log level enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl TaskmonConfig {
    /// Create a new configuration suited to local development.
    pub fn development() -> Self {
        Self {
            projection: ProjectionConfig {
                derived_metrics: DerivedMetricPolicy::Reject,
                ..Default::default()
            },
            listing: ListingConfig {
                default_page_size: 10,
                max_page_size: 100,
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
                colored: true,
                include_targets: true,
                ..Default::default()
            },
        }
    }

    /// Create a new configuration suited to a production dashboard.
    pub fn production() -> Self {
        Self {
            projection: ProjectionConfig {
                derived_metrics: DerivedMetricPolicy::Clamp,
                default_history_days: 30,
                max_history_days: 365,
            },
            listing: ListingConfig {
                default_page_size: 20,
                max_page_size: 500,
            },
            logging: LoggingConfig {
                level: LogLevel::Info,
                colored: false,
                include_timestamps: true,
                include_targets: false,
            },
        }
    }

    /// Create a configuration for testing.
    pub fn testing() -> Self {
        Self {
            projection: ProjectionConfig {
                default_history_days: 3,
                max_history_days: 10,
                ..Default::default()
            },
            listing: ListingConfig {
                default_page_size: 5,
                max_page_size: 10,
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
                colored: false,
                include_timestamps: false,
                include_targets: true,
            },
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> TaskmonResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Validate listing config
        if self.listing.default_page_size == 0 {
            errors.push("Default page size must be greater than 0".to_string());
        }

        if self.listing.max_page_size < self.listing.default_page_size {
            errors.push(
                "Max page size must be greater than or equal to default page size".to_string(),
            );
        }

        // Validate projection config
        if self.projection.default_history_days == 0 {
            errors.push("Default history days must be greater than 0".to_string());
        }

        if self.projection.max_history_days < self.projection.default_history_days {
            errors.push(
                "Max history days must be greater than or equal to default history days"
                    .to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
