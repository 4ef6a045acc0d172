//! Engine and session configuration.
//!
//! Both structs deserialize from JSON with every field optional; missing
//! fields fall back to [`Default`]. [`EngineConfig::from_env`] layers
//! `COLLOQUY_*` environment variables on top of the defaults.

use crate::error::ConfigError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default bound on nested self-match (`srai`) evaluation.
pub const DEFAULT_MAX_LOOPS: usize = 64;

/// Options for matching and template execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum self-match recursion depth. The `max_loops` bot property
    /// overrides this when it parses as a number.
    pub max_loops: usize,
    /// Whether computed responses may be cached.
    pub cache_enabled: bool,
    /// Maximum number of cached responses.
    pub cache_capacity: usize,
    /// Fixed clock for `<date>`/`<interval>`; `None` uses local time.
    pub reference_time: Option<NaiveDateTime>,
    /// Fixed seed for `<random>`; `None` seeds from the OS.
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_loops: DEFAULT_MAX_LOOPS,
            cache_enabled: true,
            cache_capacity: 512,
            reference_time: None,
            random_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `COLLOQUY_MAX_LOOPS`, `COLLOQUY_CACHE` and
    /// `COLLOQUY_CACHE_CAPACITY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = EngineConfig::default();
        if let Some(max_loops) = env_value("COLLOQUY_MAX_LOOPS")? {
            config.max_loops = max_loops;
        }
        if let Some(enabled) = env_value("COLLOQUY_CACHE")? {
            config.cache_enabled = enabled;
        }
        if let Some(capacity) = env_value("COLLOQUY_CACHE_CAPACITY")? {
            config.cache_capacity = capacity;
        }
        Ok(config)
    }
}

/// Bounds and weighting parameters for a session's histories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub max_request_depth: usize,
    pub max_response_depth: usize,
    pub max_that_depth: usize,
    /// Total items across all three histories before weight-based pruning.
    pub max_total_context: usize,
    /// Total items across all histories before old items get truncated.
    pub compression_threshold: usize,
    /// Characters kept when an item is compressed.
    pub compressed_length: usize,
    /// Per-step age decay in (0, 1].
    pub weight_decay: f64,
    pub enable_weighting: bool,
    pub enable_pruning: bool,
    pub enable_compression: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            max_request_depth: 20,
            max_response_depth: 20,
            max_that_depth: 20,
            max_total_context: 50,
            compression_threshold: 40,
            compressed_length: 32,
            weight_decay: 0.9,
            enable_weighting: true,
            enable_pruning: true,
            enable_compression: true,
        }
    }
}

impl ContextConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decay clamped into (0, 1].
    pub(crate) fn decay(&self) -> f64 {
        if self.weight_decay.is_finite() && self.weight_decay > 0.0 { self.weight_decay.min(1.0) } else { 1.0 }
    }
}

fn env_value<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::InvalidEnv { key, value: raw }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"max_loops": 5, "random_seed": 7}"#).unwrap();
        assert_eq!(config.max_loops, 5);
        assert_eq!(config.random_seed, Some(7));
        assert!(config.cache_enabled);

        let ctx = ContextConfig::from_json_str(r#"{"max_request_depth": 3}"#).unwrap();
        assert_eq!(ctx.max_request_depth, 3);
        assert_eq!(ctx.max_that_depth, 20);
    }

    #[test]
    fn decay_is_clamped() {
        let mut ctx = ContextConfig::default();
        ctx.weight_decay = 0.0;
        assert_eq!(ctx.decay(), 1.0);
        ctx.weight_decay = 3.0;
        assert_eq!(ctx.decay(), 1.0);
        ctx.weight_decay = 0.5;
        assert_eq!(ctx.decay(), 0.5);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(EngineConfig::from_json_str("{"), Err(ConfigError::Json(_))));
    }
}
