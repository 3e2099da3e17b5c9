//! Dependency crawling and build ordering.
//!
//! # Module Organization
//!
//! - [`crawl`] - breadth-first crawl from root feedstocks to a fixed point,
//!   producing a [`CrawlReport`]
//! - [`sort`] - cycle-tolerant topological sort of the resulting [`EdgeMap`]
//! - [`checks`] - version-range and architecture checks on found dependencies
//! - [`pinned`] - manifest feedstocks that provide pinned packages
//!
//! # Data flow
//!
//! ```text
//! roots ─▶ Crawler ─▶ RecipeFetcher ─▶ RecipeRenderer ─▶ extractor
//!             ▲                                              │
//!             └──────────── newly found feedstocks ◀─────────┘
//!                                   │
//!                                   ▼
//!                      EdgeMap ─▶ sort ─▶ build order
//! ```
//!
//! The report lists (missing, outdated, needs review) are informational; they
//! never change the edge map or the order.

pub mod checks;
pub mod crawl;
pub mod pinned;
pub mod sort;

use std::collections::{BTreeMap, BTreeSet};

use crate::core::PackageId;

pub use checks::ConstraintFailure;
pub use crawl::{CrawlOptions, CrawlReport, CrawlState, Crawler, DependencyStatus, NodeKey, TreeEntry};
pub use pinned::find_pinned_feedstocks;
pub use sort::{EquivalenceClass, TopologicalSort, build_order, sort};

/// Package to its direct dependencies. May contain cycles.
pub type EdgeMap = BTreeMap<PackageId, BTreeSet<PackageId>>;
