//! Dependency tree and summary output of a crawl.
//!
//! ```text
//! app-feedstock
//! ├── libfoo >=1.0 (^)
//! │   - Unavailable: win-64;
//! │   └── zlib (✓)
//! ├── arrow-cpp-proc (subpackage of arrow-cpp-feedstock) (✓)
//! └── gone-lib (!)
//! ```
//!
//! Markers: `(✓)` available, `(^)` found but failing a version or
//! architecture check, `(!)` feedstock exists but has no recipe, `(?)` no
//! feedstock could be located. A node already printed elsewhere is shown
//! again with `(*)` and without its children.
//!
//! Unless the tree is expanded, only the paths leading to a problem are
//! printed.

use std::collections::HashSet;

use colored::Colorize;

use crate::resolver::{CrawlReport, DependencyStatus, NodeKey, TreeEntry};

/// How much of the tree to print.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeOptions {
    /// Print available dependencies too.
    pub expand: bool,
    /// Print declared version ranges next to names.
    pub show_ranges: bool,
}

struct TreePrinter<'a> {
    report: &'a CrawlReport,
    options: TreeOptions,
    displayed: HashSet<&'a NodeKey>,
    lines: Vec<String>,
}

impl<'a> TreePrinter<'a> {
    fn new(report: &'a CrawlReport, options: TreeOptions) -> Self {
        Self {
            report,
            options,
            displayed: HashSet::new(),
            lines: Vec::new(),
        }
    }

    fn print_root(&mut self, root: &'a NodeKey) {
        self.lines.push(root.to_string().cyan().bold().to_string());
        if self.displayed.insert(root) {
            self.print_children(root, "");
        }
    }

    fn visible_children(&self, node: &NodeKey) -> Vec<&'a TreeEntry> {
        let report = self.report;
        report.children(node).iter().filter(|entry| self.is_visible(entry)).collect()
    }

    fn print_children(&mut self, node: &'a NodeKey, prefix: &str) {
        let visible = self.visible_children(node);
        for (i, entry) in visible.iter().copied().enumerate() {
            let is_last = i == visible.len() - 1;
            self.print_entry(entry, prefix, is_last);
        }
    }

    fn print_entry(&mut self, entry: &'a TreeEntry, prefix: &str, is_last: bool) {
        let connector = if is_last { "└── " } else { "├── " };
        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        let mut line = format!("{prefix}{connector}{}", entry.name);
        if self.options.show_ranges
            && let Some(range) = &entry.range
        {
            line.push(' ');
            line.push_str(&range.bright_black().to_string());
        }
        if let Some(parent) = &entry.subpackage_of {
            let note = format!("(subpackage of {})", parent.feedstock_name());
            line.push(' ');
            line.push_str(&note.bright_black().to_string());
        }
        line.push(' ');
        line.push_str(&colored_marker(&entry.status));

        let mut descend = None;
        if let Some(node) = &entry.node {
            if self.displayed.insert(node) {
                descend = Some(node);
            } else if !self.visible_children(node).is_empty() {
                line.push_str(&" (*)".bright_black().to_string());
            }
        }
        self.lines.push(line);

        if let DependencyStatus::Outdated(failures) = &entry.status {
            for failure in failures {
                self.lines.push(format!("{child_prefix}- {}", failure.to_string().yellow()));
            }
        }
        if let Some(node) = descend {
            self.print_children(node, &child_prefix);
        }
    }

    fn is_visible(&self, entry: &TreeEntry) -> bool {
        self.options.expand
            || entry.status.is_problem()
            || entry.node.as_ref().is_some_and(|node| self.leads_to_problem(node))
    }

    /// Whether any dependency reachable from `start` is a problem.
    fn leads_to_problem(&self, start: &NodeKey) -> bool {
        let mut seen: HashSet<&NodeKey> = HashSet::from([start]);
        let mut work = vec![start];
        while let Some(node) = work.pop() {
            for entry in self.report.children(node) {
                if entry.status.is_problem() {
                    return true;
                }
                if let Some(child) = &entry.node
                    && seen.insert(child)
                {
                    work.push(child);
                }
            }
        }
        false
    }
}

fn colored_marker(status: &DependencyStatus) -> String {
    let marker = status.marker();
    match status {
        DependencyStatus::Available => marker.green().to_string(),
        DependencyStatus::Outdated(_) => marker.yellow().to_string(),
        DependencyStatus::Missing => marker.red().to_string(),
        DependencyStatus::Unresolved => marker.magenta().to_string(),
    }
}

/// Tree lines for every located root, in the order given.
pub fn render_tree(report: &CrawlReport, options: TreeOptions) -> Vec<String> {
    let mut printer = TreePrinter::new(report, options);
    for root in &report.roots {
        printer.print_root(root);
    }
    printer.lines
}

fn push_section(lines: &mut Vec<String>, title: &str, names: &[String]) {
    if names.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(title.bold().to_string());
    lines.extend(names.iter().map(|name| format!("- {name}")));
}

/// Problem lists, unlocated roots and dependency cycles.
pub fn render_summary(report: &CrawlReport) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        "########################## SUMMARY ##########################".bold().to_string(),
    ];

    let unlocated: Vec<String> =
        report.unlocated_roots.iter().map(|root| root.feedstock_name()).collect();
    push_section(&mut lines, "Feedstocks that could not be located:", &unlocated);

    if report.has_problems() {
        push_section(&mut lines, "Missing dependencies:", &report.missing);
        push_section(
            &mut lines,
            "Dependencies that either need to be updated or rebuilt for the requested archs:",
            &report.outdated,
        );
        push_section(
            &mut lines,
            "Dependencies that require manual attention as their feedstocks could not be located:",
            &report.needs_review,
        );
    } else if !report.roots.is_empty() {
        let roots: Vec<String> = report.roots.iter().map(ToString::to_string).collect();
        let message = format!("All dependencies are available to build {}", roots.join(", "));
        lines.push(message.green().to_string());
    }

    let cycles: Vec<String> = report
        .classes()
        .into_iter()
        .filter(|class| class.is_cycle())
        .map(|class| {
            class
                .members
                .iter()
                .map(|member| member.feedstock_name())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect();
    push_section(&mut lines, "Dependency cycles, built as one group:", &cycles);

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PackageId;
    use crate::resolver::ConstraintFailure;
    use crate::templating::Arch;

    fn node(name: &str) -> NodeKey {
        NodeKey::new(PackageId::new(name), name)
    }

    fn entry(name: &str, status: DependencyStatus, resolved: bool) -> TreeEntry {
        TreeEntry {
            name: name.to_string(),
            range: None,
            status,
            node: resolved.then(|| node(name)),
            subpackage_of: None,
            version: None,
        }
    }

    /// app -> {libfoo -> zlib, mystery (?)}, app -> six, libfoo outdated.
    fn report() -> CrawlReport {
        let mut report = CrawlReport {
            roots: vec![node("app")],
            ..CrawlReport::default()
        };
        let mut libfoo = entry(
            "libfoo",
            DependencyStatus::Outdated(vec![ConstraintFailure::SkippedArchs(vec![Arch::Win64])]),
            true,
        );
        libfoo.range = Some(">=1.0".to_string());
        report.tree.insert(
            node("app"),
            vec![
                libfoo,
                entry("mystery", DependencyStatus::Unresolved, false),
                entry("six", DependencyStatus::Available, true),
            ],
        );
        report
            .tree
            .insert(node("libfoo"), vec![entry("zlib", DependencyStatus::Available, true)]);
        report.tree.insert(node("zlib"), Vec::new());
        report.tree.insert(node("six"), Vec::new());
        report.outdated.push("libfoo".to_string());
        report.needs_review.push("mystery".to_string());
        report
    }

    #[test]
    fn test_collapsed_tree_shows_problem_paths() {
        colored::control::set_override(false);
        let lines = render_tree(&report(), TreeOptions::default());
        assert_eq!(
            lines,
            vec![
                "app-feedstock",
                "├── libfoo (^)",
                "│   - Unavailable: win-64;",
                "└── mystery (?)",
            ]
        );
    }

    #[test]
    fn test_expanded_tree_with_ranges() {
        colored::control::set_override(false);
        let options = TreeOptions {
            expand: true,
            show_ranges: true,
        };
        let lines = render_tree(&report(), options);
        assert_eq!(
            lines,
            vec![
                "app-feedstock",
                "├── libfoo >=1.0 (^)",
                "│   - Unavailable: win-64;",
                "│   └── zlib (✓)",
                "├── mystery (?)",
                "└── six (✓)",
            ]
        );
    }

    #[test]
    fn test_repeated_node_is_printed_once() {
        colored::control::set_override(false);
        let mut report = CrawlReport {
            roots: vec![node("app")],
            ..CrawlReport::default()
        };
        report.tree.insert(
            node("app"),
            vec![
                entry("left", DependencyStatus::Available, true),
                entry("right", DependencyStatus::Available, true),
            ],
        );
        report.tree.insert(node("left"), vec![entry("base", DependencyStatus::Available, true)]);
        report.tree.insert(node("right"), vec![entry("base", DependencyStatus::Available, true)]);
        report.tree.insert(node("base"), vec![entry("gone", DependencyStatus::Missing, false)]);

        let lines = render_tree(&report, TreeOptions::default());
        assert_eq!(
            lines,
            vec![
                "app-feedstock",
                "├── left (✓)",
                "│   └── base (✓)",
                "│       └── gone (!)",
                "└── right (✓)",
                "    └── base (✓) (*)",
            ]
        );
    }

    #[test]
    fn test_cycles_terminate() {
        colored::control::set_override(false);
        let mut report = CrawlReport {
            roots: vec![node("aaa")],
            ..CrawlReport::default()
        };
        report.tree.insert(node("aaa"), vec![entry("bbb", DependencyStatus::Available, true)]);
        report.tree.insert(node("bbb"), vec![entry("aaa", DependencyStatus::Available, true)]);

        assert_eq!(render_tree(&report, TreeOptions::default()), vec!["aaa-feedstock"]);
        let expanded = render_tree(
            &report,
            TreeOptions {
                expand: true,
                show_ranges: false,
            },
        );
        assert_eq!(expanded, vec!["aaa-feedstock", "└── bbb (✓)", "    └── aaa (✓) (*)"]);
    }

    #[test]
    fn test_subpackage_note() {
        colored::control::set_override(false);
        let mut report = CrawlReport {
            roots: vec![node("app")],
            ..CrawlReport::default()
        };
        let mut proc = entry("arrow-cpp-proc", DependencyStatus::Available, false);
        proc.subpackage_of = Some(PackageId::new("arrow-cpp"));
        report.tree.insert(node("app"), vec![proc]);

        let lines = render_tree(
            &report,
            TreeOptions {
                expand: true,
                show_ranges: false,
            },
        );
        assert_eq!(lines[1], "└── arrow-cpp-proc (subpackage of arrow-cpp-feedstock) (✓)");
    }

    #[test]
    fn test_summary_sections() {
        colored::control::set_override(false);
        let mut report = report();
        report.missing.push("gone-lib".to_string());
        report.unlocated_roots.push(PackageId::new("nothere"));

        let text = render_summary(&report).join("\n");
        assert!(text.contains("Feedstocks that could not be located:\n- nothere-feedstock"));
        assert!(text.contains("Missing dependencies:\n- gone-lib"));
        assert!(text.contains("rebuilt for the requested archs:\n- libfoo"));
        assert!(text.contains("could not be located:\n- mystery"));
        assert!(!text.contains("All dependencies are available"));
    }

    #[test]
    fn test_summary_all_available_and_cycles() {
        colored::control::set_override(false);
        let mut report = CrawlReport {
            roots: vec![node("aaa")],
            ..CrawlReport::default()
        };
        report.edges.insert(PackageId::new("aaa"), [PackageId::new("bbb")].into());
        report.edges.insert(PackageId::new("bbb"), [PackageId::new("aaa")].into());

        let text = render_summary(&report).join("\n");
        assert!(text.contains("All dependencies are available to build aaa-feedstock"));
        assert!(text.contains("Dependency cycles, built as one group:\n- aaa-feedstock, bbb-feedstock"));
    }
}
