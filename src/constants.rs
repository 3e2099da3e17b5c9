//! Global constants used throughout the feedcrawl codebase.
//!
//! Default endpoints, cache sizes and the built-in exclusion list live here
//! so the configuration layer and the crawler agree on them.

use std::time::Duration;

/// Default host serving raw recipe files.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com";

/// Default organization owning the feedstock repositories.
pub const DEFAULT_ORG: &str = "conda-forge";

/// Default branch recipes are read from.
pub const DEFAULT_BRANCH: &str = "main";

/// Repository holding the package-name to feedstock-name mapping.
pub const FEEDSTOCK_OUTPUTS_REPO: &str = "feedstock-outputs";

/// Path of the recipe inside a feedstock repository.
pub const RECIPE_PATH: &str = "recipe/meta.yaml";

/// Entries kept per memoization cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Per-request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pinned-packages file.
pub const DEFAULT_PINNED_FILE: &str = "conda_build_config.yaml";

/// Identifier prefixes of compiler toolchain packages.
pub const DEFAULT_TOOLCHAIN_PREFIXES: &[&str] = &["ctng-compilers-"];

/// Bootstrap language of every recipe; never crawled.
pub const BOOTSTRAP_LANGUAGE: &str = "python";

/// Infrastructure packages that are never crawled.
///
/// These are built and pinned centrally, so following them would drag most of
/// the ecosystem into every crawl.
pub const BUILTIN_EXCLUSIONS: &[&str] = &[
    "openblas",
    "ice",
    "gdal",
    "arrow",
    "boost",
    "llvm",
    "gcc",
    "python",
    "numpy",
    "protobuf",
    "abseil",
    "thrift",
    "hdf5",
    "netcdf",
    "libblas",
    "libcblas",
    "liblapack",
    "liblapacke",
];

/// User agent sent with every request.
pub fn default_user_agent() -> String {
    format!("feedcrawl/{}", env!("CARGO_PKG_VERSION"))
}
