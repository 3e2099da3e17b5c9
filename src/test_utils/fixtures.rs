//! Test fixtures for recipe documents.

use std::fmt::Write;

/// Builder for a minimal `meta.yaml`.
///
/// ```rust
/// use feedcrawl::test_utils::RecipeFixture;
///
/// let yaml = RecipeFixture::new("pandas")
///     .version("2.2.0")
///     .host(&["numpy >=1.22", "cython"])
///     .run(&["python-dateutil"])
///     .to_yaml();
/// assert!(yaml.contains("  run:\n    - python-dateutil\n"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecipeFixture {
    name: String,
    version: Option<String>,
    skip: Option<String>,
    build: Vec<String>,
    host: Vec<String>,
    run: Vec<String>,
    outputs: Vec<(String, Vec<String>)>,
}

impl RecipeFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Add `skip: true` followed by an optional selector, e.g. `# [win]`.
    #[must_use]
    pub fn skip(mut self, selector: &str) -> Self {
        self.skip = Some(selector.to_string());
        self
    }

    #[must_use]
    pub fn build(mut self, entries: &[&str]) -> Self {
        self.build.extend(entries.iter().map(|s| s.to_string()));
        self
    }

    #[must_use]
    pub fn host(mut self, entries: &[&str]) -> Self {
        self.host.extend(entries.iter().map(|s| s.to_string()));
        self
    }

    #[must_use]
    pub fn run(mut self, entries: &[&str]) -> Self {
        self.run.extend(entries.iter().map(|s| s.to_string()));
        self
    }

    /// Add a sub-output with its own run requirements.
    #[must_use]
    pub fn output(mut self, name: &str, run: &[&str]) -> Self {
        self.outputs
            .push((name.to_string(), run.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn to_yaml(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "package:\n  name: {}", self.name);
        if let Some(version) = &self.version {
            let _ = writeln!(out, "  version: \"{version}\"");
        }
        if let Some(selector) = &self.skip {
            let _ = writeln!(out, "build:\n  skip: true  {selector}");
        }
        if !(self.build.is_empty() && self.host.is_empty() && self.run.is_empty()) {
            out.push_str("requirements:\n");
            for (stage, entries) in [("build", &self.build), ("host", &self.host), ("run", &self.run)] {
                write_list(&mut out, "  ", stage, entries);
            }
        }
        if !self.outputs.is_empty() {
            out.push_str("outputs:\n");
            for (name, run) in &self.outputs {
                let _ = writeln!(out, "  - name: {name}");
                if !run.is_empty() {
                    out.push_str("    requirements:\n");
                    write_list(&mut out, "      ", "run", run);
                }
            }
        }
        out
    }
}

fn write_list(out: &mut String, indent: &str, key: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "{indent}{key}:");
    for entry in entries {
        let _ = writeln!(out, "{indent}  - {entry}");
    }
}
