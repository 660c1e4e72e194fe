//! Logging setup for opmap clients.
//!
//! The client crates only emit `tracing` events; this crate installs a
//! subscriber for them, configured from the environment.
//!
//! # Usage
//!
//! ```rust,no_run
//! // Reads OPMAP_LOG_LEVEL / OPMAP_LOG_FORMAT / OPMAP_DEBUG once.
//! opmap_log::init();
//!
//! tracing::info!("client ready");
//! ```
//!
//! # Environment Variables
//!
//! - `OPMAP_DEBUG=1` - Enable debug logging
//! - `OPMAP_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `OPMAP_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `OPMAP_LOG_COLOR=1|0` - Enable/disable colors
//! - `RUST_LOG` - Full filter directives; wins over `OPMAP_LOG_LEVEL`

use once_cell::sync::{Lazy, OnceCell};
use std::io::IsTerminal;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

/// Debug flag variable.
pub const ENV_DEBUG: &str = "OPMAP_DEBUG";
/// Level variable.
pub const ENV_LOG_LEVEL: &str = "OPMAP_LOG_LEVEL";
/// Format variable.
pub const ENV_LOG_FORMAT: &str = "OPMAP_LOG_FORMAT";
/// Color variable.
pub const ENV_LOG_COLOR: &str = "OPMAP_LOG_COLOR";

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
    /// Off (no logging)
    Off,
}

impl Level {
    /// Get level from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Filter directive for this level.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human format
    Pretty,
    /// Single-line format
    Compact,
    /// One JSON object per event
    Json,
}

impl Format {
    /// Get format from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

static INSTALLED: OnceCell<bool> = OnceCell::new();

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether ANSI colors are enabled
    pub color: bool,
    /// Raw `RUST_LOG` directives, if set
    pub directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Compact,
            color: false,
            directives: None,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from a variable lookup function.
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| {
            lookup(name).map(|v| {
                let v = v.trim().to_lowercase();
                v == "1" || v == "true"
            })
        };

        let debug = flag(ENV_DEBUG).unwrap_or(false);

        let level = lookup(ENV_LOG_LEVEL)
            .and_then(|s| Level::from_str(&s))
            .unwrap_or(Level::Info);
        // debug mode lowers the level, never raises it
        let level = if debug { level.min(Level::Debug) } else { level };

        let format = lookup(ENV_LOG_FORMAT)
            .and_then(|s| Format::from_str(&s))
            .unwrap_or(Format::Compact);

        let color = flag(ENV_LOG_COLOR).unwrap_or_else(|| {
            lookup("NO_COLOR").is_none() && std::io::stderr().is_terminal()
        });

        let directives = lookup(EnvFilter::DEFAULT_ENV).filter(|d| !d.trim().is_empty());

        Self {
            debug,
            level,
            format,
            color,
            directives,
        }
    }

    /// Filter directive string the subscriber is built with.
    pub fn filter_directive(&self) -> String {
        match &self.directives {
            Some(directives) => directives.clone(),
            None => self.level.as_directive().to_string(),
        }
    }

    /// Build the event filter.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(self.filter_directive())
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_directive()))
    }

    /// Build a subscriber writing to stderr.
    pub fn subscriber(&self) -> Box<dyn Subscriber + Send + Sync> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_ansi(self.color)
            .with_writer(std::io::stderr);

        match self.format {
            Format::Pretty => Box::new(builder.pretty().finish()),
            Format::Compact => Box::new(builder.compact().finish()),
            Format::Json => Box::new(builder.json().finish()),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Get the global configuration, read from the environment on first use.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

/// Create a subscriber from the global configuration.
pub fn subscriber() -> Box<dyn Subscriber + Send + Sync> {
    config().subscriber()
}

/// Install the global subscriber.
///
/// Safe to call repeatedly; only the first call installs anything. Returns
/// `false` when another subscriber was already set globally.
pub fn init() -> bool {
    *INSTALLED.get_or_init(|| tracing::subscriber::set_global_default(subscriber()).is_ok())
}

/// Check if debug logging is enabled.
pub fn is_debug_enabled() -> bool {
    config().debug
}

// ============================================================================
// Tests
// ============================================================================
