//! Statement layer of the template interpreter.
//!
//! Splits a template into text, `{{ }}` outputs and `{% %}` statements,
//! builds a node tree and evaluates it against a [`Scope`]. Supported
//! statements: `set`, `if`/`elif`/`else`/`endif`, `for`/`else`/`endfor`.
//! `{# #}` comments are dropped and a `-` inside a delimiter strips the
//! whitespace on that side. Any other statement is a syntax error.

use std::collections::BTreeMap;

use super::expr::{Expr, ExprParser, ParseResult, Scope, SyntaxError, Token, parse_expression, tokenize};
use super::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Output(String),
    Statement(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Output(Expr),
    Set(String, Expr),
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        otherwise: Vec<Node>,
    },
    For {
        targets: Vec<String>,
        iterable: Expr,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(src: &str) -> ParseResult<Self> {
        let segments = split_segments(src)?;
        let mut iter = segments.into_iter();
        let (nodes, end) = parse_nodes(&mut iter, &[])?;
        match end {
            None => Ok(Self { nodes }),
            Some(tag) => Err(SyntaxError(format!("unexpected '{{% {tag} %}}'"))),
        }
    }

    pub fn render(&self, scope: &mut Scope) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, scope, &mut out);
        out
    }
}

fn split_segments(src: &str) -> ParseResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = src;
    let mut strip_next = false;
    loop {
        let open = ["{{", "{%", "{#"]
            .iter()
            .filter_map(|d| rest.find(d).map(|pos| (pos, *d)))
            .min_by_key(|(pos, _)| *pos);
        let Some((pos, delim)) = open else {
            push_text(&mut segments, rest, strip_next, false);
            return Ok(segments);
        };
        let after = &rest[pos + 2..];
        let strip_before = after.starts_with('-');
        push_text(&mut segments, &rest[..pos], strip_next, strip_before);

        let close = match delim {
            "{{" => "}}",
            "{%" => "%}",
            _ => "#}",
        };
        let end = after
            .find(close)
            .ok_or_else(|| SyntaxError(format!("unclosed '{delim}'")))?;
        let mut inner = &after[..end];
        if strip_before {
            inner = &inner[1..];
        }
        strip_next = inner.ends_with('-');
        if strip_next {
            inner = &inner[..inner.len() - 1];
        }
        match delim {
            "{{" => segments.push(Segment::Output(inner.trim().to_string())),
            "{%" => segments.push(Segment::Statement(inner.trim().to_string())),
            _ => {}
        }
        rest = &after[end + 2..];
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str, strip_start: bool, strip_end: bool) {
    let mut text = text;
    if strip_start {
        text = text.trim_start();
    }
    if strip_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

/// Parse nodes until one of `terminators` is reached; returns the nodes and
/// the full terminating statement.
fn parse_nodes(
    segments: &mut impl Iterator<Item = Segment>,
    terminators: &[&str],
) -> ParseResult<(Vec<Node>, Option<String>)> {
    let mut nodes = Vec::new();
    while let Some(segment) = segments.next() {
        match segment {
            Segment::Text(text) => nodes.push(Node::Text(text)),
            Segment::Output(src) => nodes.push(Node::Output(parse_expression(&src)?)),
            Segment::Statement(stmt) => {
                let keyword = stmt.split_whitespace().next().unwrap_or_default().to_string();
                if terminators.contains(&keyword.as_str()) {
                    return Ok((nodes, Some(stmt)));
                }
                let body = stmt[keyword.len()..].trim();
                match keyword.as_str() {
                    "set" => nodes.push(parse_set(body)?),
                    "if" => nodes.push(parse_if(body, segments)?),
                    "for" => nodes.push(parse_for(body, segments)?),
                    other => return Err(SyntaxError(format!("unknown tag '{other}'"))),
                }
            }
        }
    }
    if terminators.is_empty() {
        Ok((nodes, None))
    } else {
        Err(SyntaxError(format!("missing '{}'", terminators.join("' or '"))))
    }
}

fn parse_set(body: &str) -> ParseResult<Node> {
    let (name, value) = body
        .split_once('=')
        .ok_or_else(|| SyntaxError(format!("malformed set '{body}'")))?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(SyntaxError(format!("bad set target '{name}'")));
    }
    Ok(Node::Set(name.to_string(), parse_expression(value)?))
}

fn parse_if(condition: &str, segments: &mut impl Iterator<Item = Segment>) -> ParseResult<Node> {
    let mut branches = Vec::new();
    let mut otherwise = Vec::new();
    let mut cond = parse_expression(condition)?;
    loop {
        let (body, end) = parse_nodes(segments, &["elif", "else", "endif"])?;
        let end = end.unwrap_or_default();
        let keyword = end.split_whitespace().next().unwrap_or_default();
        branches.push((cond, body));
        match keyword {
            "elif" => cond = parse_expression(end["elif".len()..].trim())?,
            "else" => {
                let (body, _) = parse_nodes(segments, &["endif"])?;
                otherwise = body;
                break;
            }
            _ => break,
        }
    }
    Ok(Node::If {
        branches,
        otherwise,
    })
}

fn parse_for(header: &str, segments: &mut impl Iterator<Item = Segment>) -> ParseResult<Node> {
    let tokens: Vec<Token> = tokenize(header)?;
    let mut parser = ExprParser::new(&tokens);
    let mut targets = vec![parser.expect_ident()?];
    while parser.eat_op(",") {
        targets.push(parser.expect_ident()?);
    }
    if !parser.eat_keyword("in") {
        return Err(SyntaxError(format!("malformed for '{header}'")));
    }
    let iterable = parser.parse_expr()?;
    parser.expect_end()?;

    let (body, end) = parse_nodes(segments, &["else", "endfor"])?;
    let otherwise = if end.as_deref() == Some("else") {
        parse_nodes(segments, &["endfor"])?.0
    } else {
        Vec::new()
    };
    Ok(Node::For {
        targets,
        iterable,
        body,
        otherwise,
    })
}

fn render_nodes(nodes: &[Node], scope: &mut Scope, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(expr) => out.push_str(&expr.eval(scope).to_string()),
            Node::Set(name, expr) => {
                let value = expr.eval(scope);
                scope.set(name.clone(), value);
            }
            Node::If {
                branches,
                otherwise,
            } => {
                let taken = branches.iter().find(|(cond, _)| cond.eval(scope).is_truthy());
                match taken {
                    Some((_, body)) => render_nodes(body, scope, out),
                    None => render_nodes(otherwise, scope, out),
                }
            }
            Node::For {
                targets,
                iterable,
                body,
                otherwise,
            } => {
                let items = iterable.eval(scope).iter_items();
                if items.is_empty() {
                    render_nodes(otherwise, scope, out);
                    continue;
                }
                let length = items.len();
                for (index, item) in items.into_iter().enumerate() {
                    scope.push();
                    bind_targets(scope, targets, item);
                    scope.set("loop", loop_info(index, length));
                    render_nodes(body, scope, out);
                    scope.pop();
                }
            }
        }
    }
}

fn bind_targets(scope: &mut Scope, targets: &[String], item: Value) {
    if let [single] = targets {
        scope.set(single.clone(), item);
        return;
    }
    let parts = item.iter_items();
    for (i, name) in targets.iter().enumerate() {
        scope.set(name.clone(), parts.get(i).cloned().unwrap_or(Value::Inert));
    }
}

fn loop_info(index: usize, length: usize) -> Value {
    let mut info = BTreeMap::new();
    info.insert("index".to_string(), Value::Int(index as i64 + 1));
    info.insert("index0".to_string(), Value::Int(index as i64));
    info.insert("first".to_string(), Value::Bool(index == 0));
    info.insert("last".to_string(), Value::Bool(index + 1 == length));
    info.insert("length".to_string(), Value::Int(length as i64));
    Value::Map(info)
}
