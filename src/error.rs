//! Error types.
//!
//! Only a few failures are surfaced to callers. Malformed tag usage inside a
//! template never produces an error: tag handlers fail soft and leave empty
//! text or the unresolved tag behind.

use thiserror::Error;

/// Failure to select a category for an input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// No category (and no `DEFAULT` fallback) matched. Callers usually answer
    /// with the `default-response` property instead.
    #[error("no category matched input \"{input}\"")]
    NoMatch { input: String },
}

/// A category could not be compiled into the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    EmptyPattern,

    #[error("pattern \"{pattern}\" has {count} capturing tokens (at most {max} allowed)")]
    TooManyWildcards { pattern: String, count: usize, max: usize },

    #[error("that-index {index} is out of range (0..={max})")]
    InvalidThatIndex { index: usize, max: usize },

    #[error("pattern \"{pattern}\" failed to compile: {message}")]
    Compile { pattern: String, message: String },
}

/// A template tried to write somewhere it may not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("\"{name}\" is a bot property and cannot be written from a template")]
    ReadOnly { name: String },
}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("service \"{0}\" is not available")]
    Unavailable(String),

    #[error("service call failed: {0}")]
    Failed(String),
}

/// Invalid engine or session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {key}: \"{value}\"")]
    InvalidEnv { key: &'static str, value: String },
}
