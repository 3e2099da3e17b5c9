//! Core types for feedcrawl
//!
//! - [`error`] - [`CrawlError`], [`ErrorContext`] and [`user_friendly_error`]
//! - [`package`] - [`PackageId`], the canonical graph node key

pub mod error;
pub mod package;

pub use error::{CrawlError, ErrorContext, user_friendly_error};
pub use package::{FEEDSTOCK_SUFFIX, PackageId};
