//! Dependency extraction from rendered recipes.
//!
//! Requirement entries look like `numpy >=1.20` or `libfoo 1.2.* h123_0`.
//! Graph edges only need the identifier, the first token; the range is
//! retained separately by [`extract_specs`] for availability checks.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::{Recipe, Requirements};
use crate::constants::{BOOTSTRAP_LANGUAGE, BUILTIN_EXCLUSIONS, DEFAULT_TOOLCHAIN_PREFIXES};

/// Identifiers produced by `compiler()` and `stdlib()`, e.g. `gcc_linux-64`.
static TOOLCHAIN_STUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.+_(linux|osx|win)-(64|aarch64|ppc64le|s390x|arm64)$")
        .expect("toolchain stub pattern is valid")
});

/// Identifiers produced by `cdt()`, e.g. `libx11-devel-cos7-x86_64`.
static CDT_STUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-(cos6|cos7|conda)-(x86_64|aarch64|ppc64le|s390x|i686|arm64|noarch)$")
        .expect("cdt stub pattern is valid")
});

/// Requirement stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Build,
    Host,
    Run,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Build, Stage::Host, Stage::Run];

    fn entries(self, requirements: &Requirements) -> &[serde_yaml::Value] {
        match self {
            Stage::Build => &requirements.build,
            Stage::Host => &requirements.host,
            Stage::Run => &requirements.run,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Build => "build",
            Stage::Host => "host",
            Stage::Run => "run",
        })
    }
}

/// One requirement entry split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    /// Version range, e.g. `>=1.20,<2`.
    pub range: Option<String>,
    /// Anything after the range, usually a build string.
    pub extra: Option<String>,
}

impl DependencySpec {
    /// Split an entry. Returns `None` for blank entries.
    ///
    /// A constraint glued to the name (`numpy>=1.20`) is separated from it.
    pub fn parse(entry: &str) -> Option<Self> {
        let mut tokens = entry.split_whitespace();
        let first = tokens.next()?;
        let (name, glued) = match first.find(['<', '>', '=', '!', '~']) {
            Some(0) | None => (first, None),
            Some(pos) => (&first[..pos], Some(&first[pos..])),
        };
        let (range, rest): (Option<String>, Vec<&str>) = match glued {
            Some(glued) => (Some(glued.to_string()), tokens.collect()),
            None => {
                let range = tokens.next().map(str::to_string);
                (range, tokens.collect())
            }
        };
        Some(Self {
            name: name.to_string(),
            range,
            extra: (!rest.is_empty()).then(|| rest.join(" ")),
        })
    }
}

/// Decides which identifiers are crawled.
#[derive(Debug, Clone)]
pub struct DependencyFilter {
    excluded: BTreeSet<String>,
    toolchain_prefixes: Vec<String>,
}

impl Default for DependencyFilter {
    fn default() -> Self {
        Self::new(
            BUILTIN_EXCLUSIONS.iter().map(|s| s.to_string()),
            DEFAULT_TOOLCHAIN_PREFIXES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl DependencyFilter {
    pub fn new(excluded: impl IntoIterator<Item = String>, toolchain_prefixes: Vec<String>) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
            toolchain_prefixes,
        }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    /// Whether `name` is a dependency worth following.
    pub fn includes(&self, name: &str) -> bool {
        !(name == BOOTSTRAP_LANGUAGE
            || name.is_empty()
            || name == "None"
            || name.starts_with('_')
            || self.toolchain_prefixes.iter().any(|p| name.starts_with(p.as_str()))
            || TOOLCHAIN_STUB.is_match(name)
            || CDT_STUB.is_match(name)
            || self.excluded.contains(name))
    }
}

/// Requirement lists that describe `package_name` within `recipe`.
///
/// A name matching a sub-output (and not the top-level package) selects that
/// output's lists; anything else reads the top-level lists.
fn requirements_for<'a>(recipe: &'a Recipe, package_name: &str) -> &'a Requirements {
    if recipe.name() != Some(package_name)
        && let Some(output) = recipe.output(package_name)
    {
        return &output.requirements;
    }
    &recipe.requirements
}

fn string_entries<'a>(
    recipe: &'a Recipe,
    package_name: &str,
    stage: Stage,
) -> impl Iterator<Item = &'a str> {
    stage
        .entries(requirements_for(recipe, package_name))
        .iter()
        .filter_map(serde_yaml::Value::as_str)
}

/// Filtered, deduplicated identifiers of one stage.
pub fn extract(
    recipe: &Recipe,
    package_name: &str,
    stage: Stage,
    filter: &DependencyFilter,
) -> BTreeSet<String> {
    string_entries(recipe, package_name, stage)
        .filter_map(DependencySpec::parse)
        .map(|spec| spec.name)
        .filter(|name| filter.includes(name))
        .collect()
}

/// Union of all stages.
pub fn extract_all(recipe: &Recipe, package_name: &str, filter: &DependencyFilter) -> BTreeSet<String> {
    Stage::ALL
        .iter()
        .flat_map(|stage| extract(recipe, package_name, *stage, filter))
        .collect()
}

/// Filtered specs of all stages keyed by identifier.
///
/// When an identifier appears more than once, the first entry carrying a
/// range is kept.
pub fn extract_specs(
    recipe: &Recipe,
    package_name: &str,
    filter: &DependencyFilter,
) -> BTreeMap<String, DependencySpec> {
    let mut specs: BTreeMap<String, DependencySpec> = BTreeMap::new();
    for stage in Stage::ALL {
        for spec in string_entries(recipe, package_name, stage).filter_map(DependencySpec::parse) {
            if !filter.includes(&spec.name) {
                continue;
            }
            match specs.get(&spec.name) {
                Some(existing) if existing.range.is_some() || spec.range.is_none() => {}
                _ => {
                    specs.insert(spec.name.clone(), spec);
                }
            }
        }
    }
    specs
}
