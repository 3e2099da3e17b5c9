//! Integration test suite for feedcrawl
//!
//! End-to-end tests that drive the crawler against an in-memory recipe
//! source, plus CLI tests that run the binary without network access.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: argument validation, exit codes and output of the binary
//! - **crawl**: rendering, extraction and availability checks across recipes
//! - **name_resolution**: renamed feedstocks, sub-outputs and missing recipes
//! - **ordering**: build order and cycle handling of crawled graphs

mod cli;
mod crawl;
mod name_resolution;
mod ordering;
