use std::fmt;

use regex::Regex;
use thiserror::Error;

use crate::comment_template::{CommentTemplate, TemplateError};

pub const ACCESS_TOKEN_KEY: &str = "TIDIER_ACCESS_TOKEN";
pub const DEFAULT_LABEL: &str = "waiting on response";
pub const DEFAULT_INCLUDE_REPOS: &str = ".*";
pub const DEFAULT_NUM_DAYS: &str = "90";
pub const DEFAULT_COMMENT_FORMAT: &str = "This thread is being closed automatically by \
[Tidier](https://github.com/radian-software/tidier) because it is labeled with \
\"{label}\" and has not seen any activity for {num_days} days. But don't \
worry\u{2014}if you have any information that might advance the discussion, \
leave a comment and I will be happy to reopen the thread :)";

#[derive(Debug, Clone, PartialEq, Error)]
/// Enumerates supported `ConfigError` values.
pub enum ConfigError {
    #[error("you must set ${key}")]
    Missing { key: &'static str },
    #[error("number of days not an integer: {0}")]
    ThresholdNotInteger(String),
    #[error("number of days is negative: {0}")]
    ThresholdNegative(i64),
    #[error("unacceptable label name: {0}")]
    InvalidLabel(String),
    #[error("invalid include regex: {pattern}")]
    InvalidIncludePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid exclude regex: {pattern}")]
    InvalidExcludePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid comment format")]
    InvalidCommentFormat {
        #[from]
        source: TemplateError,
    },
    #[error("unknown close strategy '{0}', expected 'graphql' or 'rest'")]
    InvalidCloseStrategy(String),
}

/// Returns false for `"0"` and any case-insensitive prefix of `"no"`, including
/// the empty string; every other value is true.
pub fn normalize_boolean(value: &str) -> bool {
    !(value == "0" || "no".starts_with(value.to_ascii_lowercase().as_str()))
}

/// Repository-name pattern that must match the whole name, not a substring.
#[derive(Debug, Clone)]
pub struct RepoPattern {
    source: String,
    matcher: Option<Regex>,
}

impl RepoPattern {
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source)?;
        let anchored = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self {
            source: source.to_string(),
            matcher: Some(anchored),
        })
    }

    pub fn match_nothing() -> Self {
        Self {
            source: "(none)".to_string(),
            matcher: None,
        }
    }

    pub fn full_match(&self, candidate: &str) -> bool {
        self.matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `CloseStrategyKind` values.
pub enum CloseStrategyKind {
    /// Resolve the GraphQL node id, then run the `closeIssue` mutation.
    /// Works with triage-level access.
    GraphqlMutation,
    /// PATCH the issue state through REST. Requires write access.
    RestEdit,
}

impl CloseStrategyKind {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "graphql" => Ok(Self::GraphqlMutation),
            "rest" => Ok(Self::RestEdit),
            _ => Err(ConfigError::InvalidCloseStrategy(raw.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GraphqlMutation => "graphql",
            Self::RestEdit => "rest",
        }
    }
}

impl fmt::Display for CloseStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated run parameters as read from flags or the environment.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub access_token: Option<String>,
    pub label: Option<String>,
    pub include_repos: Option<String>,
    pub exclude_repos: Option<String>,
    pub num_days: Option<String>,
    pub comment_format: Option<String>,
    pub for_real: Option<String>,
    pub webhook: Option<String>,
    pub close_strategy: Option<String>,
}

impl RawConfig {
    /// Validates every value and reports the first violation.
    pub fn validate(self) -> Result<TidierConfig, ConfigError> {
        let access_token = self
            .access_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::Missing {
                key: ACCESS_TOKEN_KEY,
            })?;

        let raw_num_days = self
            .num_days
            .unwrap_or_else(|| DEFAULT_NUM_DAYS.to_string());
        let parsed_num_days = raw_num_days
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::ThresholdNotInteger(raw_num_days.clone()))?;
        if parsed_num_days < 0 {
            return Err(ConfigError::ThresholdNegative(parsed_num_days));
        }
        let num_days = parsed_num_days.unsigned_abs();

        let for_real = normalize_boolean(self.for_real.as_deref().unwrap_or_default());
        let webhook = self
            .webhook
            .filter(|value| normalize_boolean(value))
            .map(|value| value.trim().to_string());

        let label = self.label.unwrap_or_else(|| DEFAULT_LABEL.to_string());
        if label.is_empty() || label.contains('"') {
            return Err(ConfigError::InvalidLabel(label));
        }

        let include = match self.include_repos {
            Some(pattern) => RepoPattern::compile(&pattern)
                .map_err(|source| ConfigError::InvalidIncludePattern { pattern, source })?,
            None => RepoPattern::compile(DEFAULT_INCLUDE_REPOS).map_err(|source| {
                ConfigError::InvalidIncludePattern {
                    pattern: DEFAULT_INCLUDE_REPOS.to_string(),
                    source,
                }
            })?,
        };
        let exclude = match self.exclude_repos {
            Some(pattern) => RepoPattern::compile(&pattern)
                .map_err(|source| ConfigError::InvalidExcludePattern { pattern, source })?,
            None => RepoPattern::match_nothing(),
        };

        let template = CommentTemplate::parse(
            self.comment_format
                .as_deref()
                .unwrap_or(DEFAULT_COMMENT_FORMAT),
        )?;
        let comment_text = template.render(&label, num_days);

        let close_strategy = match self.close_strategy.as_deref() {
            Some(raw) => CloseStrategyKind::parse(raw)?,
            None => CloseStrategyKind::GraphqlMutation,
        };

        Ok(TidierConfig {
            access_token,
            label,
            include,
            exclude,
            num_days,
            comment_text,
            for_real,
            webhook,
            close_strategy,
        })
    }
}

/// Validated, immutable configuration for one triage run.
#[derive(Clone)]
pub struct TidierConfig {
    access_token: String,
    label: String,
    include: RepoPattern,
    exclude: RepoPattern,
    num_days: u64,
    comment_text: String,
    for_real: bool,
    webhook: Option<String>,
    close_strategy: CloseStrategyKind,
}

impl TidierConfig {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn include(&self) -> &RepoPattern {
        &self.include
    }

    pub fn exclude(&self) -> &RepoPattern {
        &self.exclude
    }

    pub fn num_days(&self) -> u64 {
        self.num_days
    }

    pub fn comment_text(&self) -> &str {
        &self.comment_text
    }

    pub fn for_real(&self) -> bool {
        self.for_real
    }

    pub fn webhook(&self) -> Option<&str> {
        self.webhook.as_deref()
    }

    pub fn close_strategy(&self) -> CloseStrategyKind {
        self.close_strategy
    }
}

impl fmt::Debug for TidierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TidierConfig")
            .field("access_token", &"<redacted>")
            .field("label", &self.label)
            .field("include", &self.include.as_str())
            .field("exclude", &self.exclude.as_str())
            .field("num_days", &self.num_days)
            .field("for_real", &self.for_real)
            .field("webhook", &self.webhook)
            .field("close_strategy", &self.close_strategy)
            .finish()
    }
}
