//! Recipe templating for feedcrawl.
//!
//! Raw `meta.yaml` files are Jinja templates with inline platform selectors.
//! Rendering happens in two passes before the text is parsed as YAML:
//!
//! 1. **Selector pass** ([`selector`]): a line ending in `# [expr]` is kept
//!    when `expr` holds for at least one requested [`Arch`], and the
//!    annotation is stripped. The expression language is a sandboxed boolean
//!    grammar over platform flags; anything else keeps the line.
//! 2. **Variable expansion** ([`template`], [`expr`]): a Jinja subset
//!    (`{{ }}`, `set`, `if`, `for`, comments, whitespace control) evaluated
//!    against the fixed variable table of [`RenderContext`].
//!
//! # Never-fail rendering
//!
//! Recipes reference variables no static renderer can know. Every unknown
//! name evaluates to [`Value::Inert`], which propagates through attribute
//! access, indexing, calls and arithmetic, and renders as an empty string.
//! A template that cannot be parsed at all (unknown tag, unbalanced block)
//! degrades to an empty [`Recipe`](crate::recipe::Recipe) with a warning.
//!
//! # Example
//!
//! ```rust
//! use feedcrawl::templating::{Arch, RecipeRenderer, RenderContext};
//!
//! let raw = "{% set version = \"1.10\" %}\npackage:\n  name: foo\n  version: {{ version }}\n";
//! let renderer = RecipeRenderer::new(RenderContext::new(vec![Arch::Linux64]));
//! let recipe = renderer.render("foo", raw);
//! assert_eq!(recipe.version(), Some("1.10"));
//! ```

pub mod context;
pub mod expr;
pub mod filters;
pub mod platform;
pub mod renderer;
pub mod selector;
pub mod template;
pub mod value;


pub use context::RenderContext;
pub use platform::Arch;
pub use renderer::RecipeRenderer;
pub use selector::{ArchSupport, apply_selectors, evaluate_selector, split_selector};
pub use value::Value;
