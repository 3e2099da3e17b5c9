//! Version ordering and range matching for availability checks.
//!
//! # Module Organization
//!
//! - [`comparison`] - [`CondaVersion`], a total order over conda version strings
//! - [`constraints`] - [`VersionRange`] parsing and [`version_in_range`]
//!
//! Only simple range comparison is supported; there is no solver and no
//! conflict resolution between ranges.
//!
//! # Examples
//!
//! ```rust
//! use feedcrawl::version::version_in_range;
//!
//! assert!(version_in_range("1.26.4", ">=1.20,<2"));
//! assert!(version_in_range("1.10", ">1.9"));
//! assert!(!version_in_range("2.0.0", "1.26.*"));
//! ```

pub mod comparison;
pub mod constraints;

pub use comparison::CondaVersion;
pub use constraints::{Constraint, Operator, VersionRange, version_in_range};
