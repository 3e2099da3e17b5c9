//! Version range parsing and matching.
//!
//! A range is a `|`-separated list of alternatives, each a `,`-separated list
//! of constraints that must all hold:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `>=1.2`, `>1.2`, `<=1.2`, `<1.2` | ordered comparison |
//! | `==1.2`, `=1.2`, `1.2` | equality |
//! | `1.2.*`, `=1.2.*`, `1.2*` | prefix match |
//! | `!=1.2`, `!=1.2.*` | inequality / prefix exclusion |
//! | `~=1.2` | `>=1.2` and prefix `1` |
//!
//! An empty range (or `*`) matches every version.

use super::comparison::CondaVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
    Eq,
    Compatible,
}

/// One comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: Operator,
    pub version: CondaVersion,
    /// Trailing `*` on the version.
    pub prefix: bool,
}

impl Constraint {
    /// Operators are recognized in the order `>=`, `>`, `<=`, `<`, `!=`,
    /// `==`, `~=`, `=`; anything else is a bare version meaning equality.
    pub fn parse(text: &str) -> Self {
        const OPERATORS: [(&str, Operator); 8] = [
            (">=", Operator::Ge),
            (">", Operator::Gt),
            ("<=", Operator::Le),
            ("<", Operator::Lt),
            ("!=", Operator::Ne),
            ("==", Operator::Eq),
            ("~=", Operator::Compatible),
            ("=", Operator::Eq),
        ];
        let text = text.trim();
        let (op, rest) = OPERATORS
            .iter()
            .find_map(|(token, op)| text.strip_prefix(token).map(|rest| (*op, rest)))
            .unwrap_or((Operator::Eq, text));
        let rest = rest.trim();
        let prefix = rest.ends_with('*');
        let version = rest.trim_end_matches('*').trim_end_matches('.');
        Self {
            op,
            version: CondaVersion::parse(version),
            prefix,
        }
    }

    pub fn matches(&self, candidate: &CondaVersion) -> bool {
        match self.op {
            Operator::Eq if self.prefix => candidate.starts_with(&self.version),
            Operator::Ne if self.prefix => !candidate.starts_with(&self.version),
            Operator::Eq => candidate == &self.version,
            Operator::Ne => candidate != &self.version,
            Operator::Ge => candidate >= &self.version,
            Operator::Gt => candidate > &self.version,
            Operator::Le => candidate <= &self.version,
            Operator::Lt => candidate < &self.version,
            Operator::Compatible => {
                let source = self.version.as_str();
                let stem = source.rsplit_once('.').map_or(source, |(stem, _)| stem);
                candidate >= &self.version && candidate.starts_with(&CondaVersion::parse(stem))
            }
        }
    }
}

/// A parsed version range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    alternatives: Vec<Vec<Constraint>>,
}

impl VersionRange {
    pub fn parse(text: &str) -> Self {
        let alternatives = text
            .split('|')
            .map(|alt| {
                alt.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty() && *c != "*")
                    .map(Constraint::parse)
                    .collect()
            })
            .collect();
        Self { alternatives }
    }

    pub fn is_any(&self) -> bool {
        self.alternatives.iter().any(Vec::is_empty)
    }

    pub fn matches(&self, candidate: &CondaVersion) -> bool {
        self.alternatives.iter().any(|alt| alt.iter().all(|c| c.matches(candidate)))
    }
}

/// Whether `candidate` satisfies `range`.
pub fn version_in_range(candidate: &str, range: &str) -> bool {
    VersionRange::parse(range).matches(&CondaVersion::parse(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators() {
        assert!(version_in_range("1.21.0", ">=1.20"));
        assert!(!version_in_range("1.19", ">=1.20"));
        assert!(version_in_range("1.5", ">1.2,<2"));
        assert!(!version_in_range("2.0", ">1.2,<2"));
        assert!(version_in_range("2.0", "<=2.0"));
        assert!(version_in_range("1.3", "!=1.2"));
        assert!(version_in_range("1.2", "==1.2.0"));
        assert!(version_in_range("1.2", "=1.2"));
        assert!(version_in_range("1.2", "1.2"));
        assert!(!version_in_range("1.3", "1.2"));
    }

    #[test]
    fn test_wildcards_and_alternatives() {
        assert!(version_in_range("1.2.7", "1.2.*"));
        assert!(version_in_range("1.2.7", "=1.2.*"));
        assert!(!version_in_range("1.2.7", "=1.2"));
        assert!(!version_in_range("1.20", "1.2.*"));
        assert!(!version_in_range("1.2.7", "!=1.2.*"));
        assert!(version_in_range("3.1", "<2|>=3"));
        assert!(!version_in_range("2.5", "<2|>=3"));
    }

    #[test]
    fn test_compatible_release() {
        assert!(version_in_range("1.4.5", "~=1.4.2"));
        assert!(!version_in_range("1.5.0", "~=1.4.2"));
        assert!(!version_in_range("1.4.1", "~=1.4.2"));
    }

    #[test]
    fn test_empty_ranges_match() {
        assert!(version_in_range("0.1", ""));
        assert!(version_in_range("0.1", " "));
        assert!(version_in_range("0.1", "*"));
        assert!(VersionRange::parse(" ").is_any());
    }
}
