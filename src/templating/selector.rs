//! Inline `# [expr]` selector evaluation.
//!
//! Recipes restrict lines to platforms with trailing comments such as
//! `- libgfortran  # [linux and not aarch64]`. The expression language is a
//! small boolean grammar over the flag table of [`Arch::flag`]:
//!
//! ```text
//! expr    := or
//! or      := and ("or" and)*
//! and     := not ("and" not)*
//! not     := "not" not | atom
//! atom    := "(" expr ")" | "True" | "False" | FLAG
//! ```
//!
//! Anything outside this grammar (comparisons, unknown names, stray tokens)
//! is a [`CrawlError::SelectorEval`]; callers keep the annotated line in that
//! case, so a selector that cannot be understood never hides a dependency.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::platform::Arch;
use crate::core::CrawlError;

static SELECTOR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)\s*#\s*\[([^\[\]]*)\]\s*$").expect("selector pattern is valid")
});

/// Split a line into its content and selector expression.
pub fn split_selector(line: &str) -> Option<(&str, &str)> {
    let captures = SELECTOR_LINE.captures(line)?;
    let content = captures.get(1)?.as_str();
    let expression = captures.get(2)?.as_str().trim();
    Some((content, expression))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Flag(String),
    Bool(bool),
    And,
    Or,
    Not,
    Open,
    Close,
}

/// A parsed selector expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Const(bool),
    Flag(String),
    Not(Box<Selector>),
    And(Box<Selector>, Box<Selector>),
    Or(Box<Selector>, Box<Selector>),
}

impl Selector {
    /// Parse an expression. An empty expression is `True`.
    pub fn parse(expression: &str) -> Result<Self, CrawlError> {
        let tokens = tokenize(expression)?;
        if tokens.is_empty() {
            return Ok(Selector::Const(true));
        }
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            expression,
        };
        let selector = parser.parse_or()?;
        if parser.pos != tokens.len() {
            return Err(parser.error("unexpected trailing tokens"));
        }
        Ok(selector)
    }

    pub fn evaluate(&self, arch: Arch) -> bool {
        match self {
            Selector::Const(value) => *value,
            // Names are validated during parsing.
            Selector::Flag(name) => arch.flag(name).unwrap_or(true),
            Selector::Not(inner) => !inner.evaluate(arch),
            Selector::And(lhs, rhs) => lhs.evaluate(arch) && rhs.evaluate(arch),
            Selector::Or(lhs, rhs) => lhs.evaluate(arch) || rhs.evaluate(arch),
        }
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, CrawlError> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(idx, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        end = idx + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let word = &expression[start..end];
                tokens.push(match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "True" => Token::Bool(true),
                    "False" => Token::Bool(false),
                    name if Arch::Linux64.flag(name).is_some() => Token::Flag(name.to_string()),
                    name => {
                        return Err(CrawlError::SelectorEval {
                            expression: expression.to_string(),
                            reason: format!("unknown name '{name}'"),
                        });
                    }
                });
            }
            other => {
                return Err(CrawlError::SelectorEval {
                    expression: expression.to_string(),
                    reason: format!("unexpected character '{other}'"),
                });
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    expression: &'a str,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> CrawlError {
        CrawlError::SelectorEval {
            expression: self.expression.to_string(),
            reason: reason.to_string(),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.tokens.get(self.pos) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Selector, CrawlError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Selector::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Selector, CrawlError> {
        let mut lhs = self.parse_not()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_not()?;
            lhs = Selector::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Selector, CrawlError> {
        if self.eat(&Token::Not) {
            return Ok(Selector::Not(Box::new(self.parse_not()?)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Selector, CrawlError> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        match token {
            Some(Token::Open) => {
                let inner = self.parse_or()?;
                if self.eat(&Token::Close) {
                    Ok(inner)
                } else {
                    Err(self.error("missing ')'"))
                }
            }
            Some(Token::Bool(value)) => Ok(Selector::Const(value)),
            Some(Token::Flag(name)) => Ok(Selector::Flag(name)),
            Some(_) => Err(self.error("unexpected operator")),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

/// Per-architecture outcome of a selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchSupport(BTreeMap<Arch, bool>);

impl ArchSupport {
    fn uniform(archs: &[Arch], value: bool) -> Self {
        Self(archs.iter().map(|a| (*a, value)).collect())
    }

    pub fn is_supported(&self, arch: Arch) -> bool {
        self.0.get(&arch).copied().unwrap_or(false)
    }

    pub fn any(&self) -> bool {
        self.0.values().any(|v| *v)
    }

    pub fn supported(&self) -> impl Iterator<Item = Arch> + '_ {
        self.0.iter().filter(|(_, v)| **v).map(|(a, _)| *a)
    }

    pub fn unsupported(&self) -> impl Iterator<Item = Arch> + '_ {
        self.0.iter().filter(|(_, v)| !**v).map(|(a, _)| *a)
    }
}

/// Evaluate `expression` for each requested architecture.
///
/// An empty expression, or one that fails to parse, is supported everywhere.
pub fn evaluate_selector(expression: &str, archs: &[Arch]) -> ArchSupport {
    match Selector::parse(expression) {
        Ok(selector) => ArchSupport(archs.iter().map(|a| (*a, selector.evaluate(*a))).collect()),
        Err(e) => {
            debug!("{e}; keeping line");
            ArchSupport::uniform(archs, true)
        }
    }
}

/// Drop lines whose selector is false for every requested architecture and
/// strip the annotation from the rest.
pub fn apply_selectors(text: &str, archs: &[Arch]) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        match split_selector(line) {
            Some((content, expression)) => {
                if evaluate_selector(expression, archs).any() {
                    out.push_str(content);
                    out.push('\n');
                }
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    out
}
