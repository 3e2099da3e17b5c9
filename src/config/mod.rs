//! Configuration and input files for feedcrawl.
//!
//! Three files feed a run:
//!
//! 1. **Global configuration** (`~/.feedcrawl/config.toml`, see [`GlobalConfig`]):
//!    endpoints, timeouts, cache sizes and extra exclusions. Optional.
//! 2. **Pinned packages** (`conda_build_config.yaml` by default, see
//!    [`PinnedPackages`]): a YAML mapping whose keys are packages fixed by the
//!    build configuration. Optional; a missing file only logs a warning.
//! 3. **Manifest** (see [`Manifest`]): a YAML document with a `feedstocks`
//!    list, an alternative to naming feedstocks on the command line.
//!
//! ```toml
//! # ~/.feedcrawl/config.toml
//! base_url = "https://raw.githubusercontent.com"
//! org = "conda-forge"
//! branch = "main"
//! request_timeout_secs = 30
//! cache_capacity = 1000
//! extra_exclusions = ["cuda-toolkit"]
//! ```

pub mod global;
pub mod inputs;

pub use global::GlobalConfig;
pub use inputs::{Manifest, PinnedPackages};
