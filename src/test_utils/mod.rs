//! Test utilities for feedcrawl
//!
//! Helpers shared by unit tests and the integration suite:
//!
//! - [`init_test_logging`] - one-time tracing setup honoring `RUST_LOG`
//! - [`MemorySource`] - an in-memory [`RecipeSource`](crate::source::RecipeSource)
//!   that counts requests, so crawls run without a network
//! - [`RecipeFixture`] - builder for small `meta.yaml` documents
//!
//! # Example
//!
//! ```rust
//! use feedcrawl::test_utils::{MemorySource, RecipeFixture};
//!
//! let source = MemorySource::new()
//!     .with_recipe("zlib", &RecipeFixture::new("zlib").version("1.3").to_yaml());
//! assert!(source.has_recipe("zlib", "main"));
//! ```

pub mod fixtures;
pub mod source;

pub use fixtures::RecipeFixture;
pub use source::MemorySource;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level` set that level is used;
/// otherwise `RUST_LOG` decides, and without it nothing is logged.
///
/// ```bash
/// RUST_LOG=feedcrawl=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
