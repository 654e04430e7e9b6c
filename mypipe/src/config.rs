//! Pipe configuration

use std::fmt;

/// Buffer size used when nothing else is configured
pub const DEFAULT_CAPACITY: usize = 4096;

/// Environment variable overriding the capacity
pub const CAPACITY_ENV: &str = "MYPIPE_CAPACITY";
/// Environment variable overriding the debug hint
pub const HINT_ENV: &str = "MYPIPE_HINT";

/// Construction-time settings of a [`crate::Pipe`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeConfig {
    /// Buffer size in bytes, fixed for the lifetime of the pipe
    pub capacity: usize,
    /// Label used in log lines and `Debug` output
    pub debug_hint: String,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            debug_hint: "mypipe".to_string(),
        }
    }
}

impl PipeConfig {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_debug_hint(mut self, debug_hint: &str) -> Self {
        self.debug_hint = debug_hint.to_string();
        self
    }

    /// Build a config from `MYPIPE_CAPACITY` and `MYPIPE_HINT`
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the capacity is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PipeConfig::from_env`] with a custom variable source
    ///
    /// # Errors
    /// Returns an error if the capacity is not a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(CAPACITY_ENV) {
            config.capacity = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidCapacity(raw.clone()))?;
        }
        if let Some(hint) = lookup(HINT_ENV) {
            config.debug_hint = hint;
        }
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`ConfigError::ZeroCapacity`] for an empty buffer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

/// Errors from building a pipe configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Capacity of zero bytes
    ZeroCapacity,
    /// Capacity string that is not a number
    InvalidCapacity(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "pipe capacity must be positive"),
            Self::InvalidCapacity(raw) => write!(f, "invalid pipe capacity: '{raw}'"),
        }
    }
}

impl std::error::Error for ConfigError {}
