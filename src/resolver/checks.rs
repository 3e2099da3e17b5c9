//! Availability checks on resolved dependencies.
//!
//! These run on the raw recipe text, before rendering, because the selector
//! pass strips the annotations they read. Two facts are checked:
//!
//! - the declared version range against the resolved recipe's version
//! - the architectures the dependency is required on against the
//!   architectures its own recipe skips

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::recipe::DependencySpec;
use crate::source::FetchedRecipe;
use crate::templating::{Arch, ArchSupport, evaluate_selector, split_selector};
use crate::version::version_in_range;

static SKIP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*skip\s*:\s*(?i:true|yes)\b").expect("skip pattern is valid")
});

/// Why a found dependency is reported as outdated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintFailure {
    /// The resolved recipe's version is outside the declared range.
    VersionOutOfRange { version: String, range: String },
    /// The resolved recipe skips architectures the dependency is needed on.
    SkippedArchs(Vec<Arch>),
}

impl fmt::Display for ConstraintFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionOutOfRange { version, range } => {
                write!(f, "Version requirements not met: {version} is outside {range}")
            }
            Self::SkippedArchs(archs) => {
                write!(f, "Unavailable:")?;
                for arch in archs {
                    write!(f, " {arch};")?;
                }
                Ok(())
            }
        }
    }
}

/// Architectures on which `dep` is required by the recipe of `package_name`.
///
/// The search starts at the `requirements:` block following the line naming
/// the package, so a split recipe reads the right output; the first line
/// mentioning `dep` decides. A dependency without a selector, or one that is
/// not found, is required everywhere.
pub fn dependency_arch_support(raw: &str, package_name: &str, dep: &str, archs: &[Arch]) -> ArchSupport {
    let lines: Vec<&str> = raw.lines().collect();
    let start = lines
        .iter()
        .position(|line| {
            line.contains("name") && line.split_whitespace().last() == Some(package_name)
        })
        .and_then(|named| {
            lines[named..]
                .iter()
                .position(|line| line.contains("requirements:"))
                .map(|offset| named + offset)
        })
        .unwrap_or(0);

    let expression = lines[start..]
        .iter()
        .find(|line| {
            line.split_whitespace()
                .any(|token| token == dep || DependencySpec::parse(token).is_some_and(|s| s.name == dep))
        })
        .and_then(|line| split_selector(line))
        .map_or("", |(_, expression)| expression);

    evaluate_selector(expression, archs)
}

/// Architectures for which the recipe sets `skip: true`.
///
/// `noarch` is never reported.
pub fn skipped_archs(raw: &str, archs: &[Arch]) -> Vec<Arch> {
    let mut skipped: Vec<Arch> = Vec::new();
    for line in raw.lines() {
        let expression = match split_selector(line) {
            Some((content, expression)) if SKIP_LINE.is_match(content) => expression,
            Some(_) => continue,
            None if SKIP_LINE.is_match(line) => "",
            None => continue,
        };
        for arch in evaluate_selector(expression, archs).supported() {
            if arch != Arch::Noarch && !skipped.contains(&arch) {
                skipped.push(arch);
            }
        }
    }
    skipped.sort();
    skipped
}

/// Run both checks for one resolved dependency.
///
/// `required_on` is the dependency's own selector outcome in the parent
/// recipe; only those architectures count against the recipe's skips.
pub fn check_dependency(
    spec: &DependencySpec,
    resolved: &FetchedRecipe,
    required_on: &ArchSupport,
    archs: &[Arch],
) -> Vec<ConstraintFailure> {
    let mut failures = Vec::new();

    if let (Some(range), Some(version)) = (&spec.range, resolved.recipe.version())
        && !version_in_range(version, range)
    {
        failures.push(ConstraintFailure::VersionOutOfRange {
            version: version.to_string(),
            range: range.clone(),
        });
    }

    let skipped: Vec<Arch> = skipped_archs(&resolved.raw, archs)
        .into_iter()
        .filter(|arch| required_on.is_supported(*arch))
        .collect();
    if !skipped.is_empty() {
        failures.push(ConstraintFailure::SkippedArchs(skipped));
    }

    failures
}
