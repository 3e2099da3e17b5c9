//! Error handling for feedcrawl
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** ([`CrawlError`]) for precise handling inside the crate
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions for the CLI
//!
//! # Recoverable vs fatal
//!
//! Almost every error raised while crawling is recovered locally:
//!
//! | Error | Recovery |
//! |-------|----------|
//! | [`CrawlError::NotFound`] | dependency is skipped and reported |
//! | [`CrawlError::Network`] | treated exactly like `NotFound` |
//! | [`CrawlError::RenderFailure`] | recipe degrades to an empty [`Recipe`](crate::recipe::Recipe) |
//! | [`CrawlError::SelectorEval`] | the annotated line is kept |
//!
//! Only malformed command-line input and unreadable explicit configuration
//! surface to the user, through [`user_friendly_error`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use feedcrawl::core::{CrawlError, ErrorContext, user_friendly_error};
//!
//! let error = CrawlError::InvalidIdentifier {
//!     identifier: "bad name!".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for feedcrawl operations.
///
/// ## Crawl errors (recovered)
/// - [`NotFound`](CrawlError::NotFound) - recipe or lookup document absent
/// - [`Network`](CrawlError::Network) - transport-level failure
/// - [`RenderFailure`](CrawlError::RenderFailure) - malformed template or YAML
/// - [`SelectorEval`](CrawlError::SelectorEval) - malformed inline selector
///
/// ## Input errors (fatal, reported before crawling)
/// - [`InvalidIdentifier`](CrawlError::InvalidIdentifier)
/// - [`UnsupportedArch`](CrawlError::UnsupportedArch)
/// - [`NoRoots`](CrawlError::NoRoots)
/// - [`ManifestParseError`](CrawlError::ManifestParseError)
/// - [`ConfigError`](CrawlError::ConfigError)
#[derive(Error, Debug, Clone)]
pub enum CrawlError {
    #[error("Recipe not found at {url} (HTTP {status})")]
    NotFound {
        url: String,
        status: u16,
    },

    #[error("Network request to {url} failed: {reason}")]
    Network {
        url: String,
        reason: String,
    },

    #[error("Failed to render recipe '{name}': {reason}")]
    RenderFailure {
        name: String,
        reason: String,
    },

    #[error("Invalid selector expression '{expression}': {reason}")]
    SelectorEval {
        expression: String,
        reason: String,
    },

    #[error("Invalid package identifier '{identifier}'")]
    InvalidIdentifier {
        identifier: String,
    },

    #[error("{arch} arch is not supported")]
    UnsupportedArch {
        arch: String,
    },

    #[error("No feedstocks to crawl")]
    NoRoots,

    #[error("Invalid manifest file syntax in {file}")]
    ManifestParseError {
        file: String,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    #[error("{message}")]
    Other {
        message: String,
    },
}

impl CrawlError {
    /// Whether the crawl may continue after this error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Network { .. }
                | Self::RenderFailure { .. }
                | Self::SelectorEval { .. }
        )
    }
}

/// Error wrapper carrying a suggestion and details for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: CrawlError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: CrawlError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Known [`CrawlError`] variants get tailored suggestions; I/O and parse
/// errors from configuration files are mapped onto the closest variant; the
/// rest fall back to [`CrawlError::Other`] with the full error chain as
/// details.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(crawl_error) = error.downcast_ref::<CrawlError>() {
        return create_error_context(crawl_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(CrawlError::ConfigError {
                    message: error.to_string(),
                })
                .with_suggestion("Check that the file exists and the path is correct");
            }
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(CrawlError::ConfigError {
                    message: error.to_string(),
                })
                .with_suggestion("Check the file permissions");
            }
            _ => {}
        }
    }

    if let Some(yaml_error) = error.downcast_ref::<serde_yaml::Error>() {
        return ErrorContext::new(CrawlError::ManifestParseError {
            file: "input".to_string(),
            reason: yaml_error.to_string(),
        })
        .with_suggestion("Check the YAML syntax: indentation, colons and list markers")
        .with_details(yaml_error.to_string());
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(CrawlError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion(
            "Check the TOML syntax of your feedcrawl config. Verify quotes and brackets",
        );
    }

    let chain = error.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>();
    let ctx = ErrorContext::new(CrawlError::Other {
        message: error.to_string(),
    });
    if chain.is_empty() {
        ctx
    } else {
        ctx.with_details(chain.join("\n  → "))
    }
}

fn create_error_context(error: CrawlError) -> ErrorContext {
    match &error {
        CrawlError::InvalidIdentifier { .. } => ErrorContext::new(error)
            .with_suggestion("Feedstock names may only contain letters, digits, '.', '-' and '_', e.g. 'numpy-feedstock'")
            .with_details("Identifiers are validated before any network request is made"),
        CrawlError::UnsupportedArch { .. } => ErrorContext::new(error).with_suggestion(format!(
            "Use names from the list: {}",
            crate::templating::Arch::SUPPORTED
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )),
        CrawlError::NoRoots => ErrorContext::new(error)
            .with_suggestion("Pass a comma separated list with --feedstocks or a manifest with --manifest"),
        CrawlError::ManifestParseError { reason, .. } => {
            let details = reason.clone();
            ErrorContext::new(error)
                .with_suggestion("The manifest must be a YAML mapping with a 'feedstocks' list")
                .with_details(details)
        }
        CrawlError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check ~/.feedcrawl/config.toml or the file passed with --config"),
        CrawlError::Network { .. } => ErrorContext::new(error)
            .with_suggestion("Check your internet connection and the configured base_url"),
        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(
            CrawlError::NotFound {
                url: "u".into(),
                status: 404
            }
            .is_recoverable()
        );
        assert!(
            CrawlError::SelectorEval {
                expression: "py<38".into(),
                reason: "unexpected '<'".into()
            }
            .is_recoverable()
        );
        assert!(
            !CrawlError::InvalidIdentifier {
                identifier: "x y".into()
            }
            .is_recoverable()
        );
        assert!(!CrawlError::NoRoots.is_recoverable());
    }

    #[test]
    fn test_user_friendly_error_keeps_crawl_error() {
        let ctx = user_friendly_error(anyhow::Error::from(CrawlError::UnsupportedArch {
            arch: "linux-riscv".into(),
        }));
        assert!(matches!(ctx.error, CrawlError::UnsupportedArch { .. }));
        assert!(ctx.suggestion.unwrap().contains("osx-arm64"));
    }

    #[test]
    fn test_user_friendly_error_wraps_unknown() {
        let err = anyhow::anyhow!("inner").context("outer");
        let ctx = user_friendly_error(err);
        assert_eq!(ctx.error.to_string(), "outer");
        assert_eq!(ctx.details.as_deref(), Some("inner"));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(CrawlError::NoRoots)
            .with_details("d")
            .with_suggestion("s");
        assert_eq!(ctx.to_string(), "No feedstocks to crawl\nDetails: d\nSuggestion: s");
    }
}
