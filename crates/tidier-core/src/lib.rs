//! Foundational configuration and classification primitives for Tidier.
//!
//! Validates raw run parameters into an immutable [`TidierConfig`], renders
//! the closing comment template, and classifies issue staleness from
//! last-activity timestamps.

pub mod comment_template;
pub mod config;
pub mod staleness;

pub use comment_template::{CommentTemplate, TemplateError};
pub use config::{
    normalize_boolean, CloseStrategyKind, ConfigError, RawConfig, RepoPattern, TidierConfig,
};
pub use staleness::{classify_staleness, inactivity_days, Staleness};
