//! Ordering of conda-style version strings.
//!
//! Versions are not semver: `1.10`, `2023.09.01`, `1.0rc1`, `1.2.post3` and
//! `3!1.0` all occur in recipes. [`CondaVersion`] orders them the way the
//! package manager does, closely enough for range checks:
//!
//! - an optional `N!` epoch compares first
//! - the rest splits into segments on `.`, `_` and `-`
//! - each segment splits into digit and letter runs; numbers compare
//!   numerically, letters lexicographically, letters sort before numbers
//! - `dev` sorts below everything and `post` above everything
//! - missing segments and components count as `0`, so `1.0 == 1.0.0` and
//!   `1.0rc1 < 1.0`
//! - a `+local` suffix is ignored

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Component {
    Dev,
    Str(String),
    Num(u64),
    Post,
}

const ZERO: Component = Component::Num(0);

/// A parsed, comparable version.
#[derive(Debug, Clone)]
pub struct CondaVersion {
    source: String,
    epoch: u64,
    segments: Vec<Vec<Component>>,
}

impl CondaVersion {
    /// Parse a version string. Parsing never fails; odd input simply yields
    /// odd components.
    pub fn parse(text: &str) -> Self {
        let source = text.trim().to_string();
        let lowered = source.to_ascii_lowercase();
        let without_local = lowered.split('+').next().unwrap_or_default();
        let (epoch, rest) = match without_local.split_once('!') {
            Some((epoch, rest)) => (epoch.parse().unwrap_or(0), rest),
            None => (0, without_local),
        };
        let segments = rest
            .split(['.', '_', '-'])
            .filter(|s| !s.is_empty())
            .map(parse_segment)
            .collect();
        Self {
            source,
            epoch,
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the leading segments equal those of `prefix`, as for `1.2.*`.
    pub fn starts_with(&self, prefix: &CondaVersion) -> bool {
        if self.epoch != prefix.epoch {
            return false;
        }
        prefix.segments.iter().enumerate().all(|(i, segment)| {
            let own = self.segments.get(i).map_or(&[][..], Vec::as_slice);
            compare_segment(own, segment) == Ordering::Equal
        })
    }
}

fn parse_segment(segment: &str) -> Vec<Component> {
    let mut components = Vec::new();
    let mut chars = segment.chars().peekable();
    while let Some(&c) = chars.peek() {
        let digits = c.is_ascii_digit();
        let mut run = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_digit() != digits {
                break;
            }
            run.push(next);
            chars.next();
        }
        components.push(if digits {
            Component::Num(run.parse().unwrap_or(u64::MAX))
        } else {
            match run.as_str() {
                "dev" => Component::Dev,
                "post" => Component::Post,
                _ => Component::Str(run),
            }
        });
    }
    components
}

fn compare_segment(a: &[Component], b: &[Component]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).unwrap_or(&ZERO);
        let y = b.get(i).unwrap_or(&ZERO);
        match x.cmp(y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

impl Ord for CondaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch.cmp(&other.epoch).then_with(|| {
            let len = self.segments.len().max(other.segments.len());
            for i in 0..len {
                let a = self.segments.get(i).map_or(&[][..], Vec::as_slice);
                let b = other.segments.get(i).map_or(&[][..], Vec::as_slice);
                match compare_segment(a, b) {
                    Ordering::Equal => {}
                    ord => return ord,
                }
            }
            Ordering::Equal
        })
    }
}

impl PartialOrd for CondaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CondaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CondaVersion {}

impl fmt::Display for CondaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
