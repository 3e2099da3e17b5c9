//! Expression language of the template interpreter.
//!
//! Covers the subset of Jinja expressions found in recipe files: literals,
//! variables, attribute/index/slice access, calls with keyword arguments,
//! filters, tests, arithmetic, comparisons, membership, the `~` concatenation
//! operator and the inline `a if cond else b` conditional.

use std::collections::BTreeMap;
use std::fmt;

use super::filters::{apply_filter, apply_test, call_method};
use super::platform::Arch;
use super::value::Value;

/// Malformed template or expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError(pub String);

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SyntaxError {}

pub type ParseResult<T> = Result<T, SyntaxError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Op(&'static str),
}

const OPERATORS: [&str; 24] = [
    "//", "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "~", "<", ">", "(", ")", "[", "]", "{",
    "}", ",", ".", ":", "|", "=",
];

pub fn tokenize(src: &str) -> ParseResult<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '\'' || c == '"' {
            let mut s = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err(SyntaxError(format!("unterminated string in '{src}'"))),
                    Some(&q) if q == c => {
                        i += 1;
                        break;
                    }
                    Some('\\') => {
                        let escaped = chars.get(i + 1).copied().unwrap_or('\\');
                        s.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                        i += 2;
                    }
                    Some(&other) => {
                        s.push(other);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(s));
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let is_float = chars.get(i) == Some(&'.') && chars.get(i + 1).is_some_and(char::is_ascii_digit);
            if is_float {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse().map_err(|_| SyntaxError(format!("bad number '{text}'")))?;
                tokens.push(Token::Float(value));
            } else {
                let text: String = chars[start..i].iter().collect();
                let value = text.parse().map_err(|_| SyntaxError(format!("bad number '{text}'")))?;
                tokens.push(Token::Int(value));
            }
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(**op))
                .ok_or_else(|| SyntaxError(format!("unexpected character '{c}' in '{src}'")))?;
            tokens.push(Token::Op(*op));
            i += op.chars().count();
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Expr>, Option<Box<Expr>>, Option<Box<Expr>>),
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    Filter {
        value: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    Test {
        value: Box<Expr>,
        name: String,
        negated: bool,
    },
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },
}

/// Variable scopes of one render.
#[derive(Debug)]
pub struct Scope {
    frames: Vec<BTreeMap<String, Value>>,
    target: Arch,
}

impl Scope {
    pub fn new(globals: BTreeMap<String, Value>, target: Arch) -> Self {
        Self {
            frames: vec![globals],
            target,
        }
    }

    pub fn get(&self, name: &str) -> Value {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .cloned()
            .unwrap_or(Value::Inert)
    }

    /// Bind in the innermost frame.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    pub fn push(&mut self) {
        self.frames.push(BTreeMap::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }
}

/// Parse a complete expression.
pub fn parse_expression(src: &str) -> ParseResult<Expr> {
    let tokens = tokenize(src)?;
    let mut parser = ExprParser::new(&tokens);
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Recursive-descent parser over a token slice.
pub struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w == word)
    }

    fn is_keyword_at(&self, offset: usize, word: &str) -> bool {
        matches!(self.tokens.get(self.pos + offset), Some(Token::Ident(w)) if w == word)
    }

    pub fn eat_keyword(&mut self, word: &str) -> bool {
        if self.is_keyword(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn is_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    pub fn eat_op(&mut self, op: &str) -> bool {
        if self.is_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> ParseResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(SyntaxError(format!("expected '{op}', found {:?}", self.peek())))
        }
    }

    pub fn expect_ident(&mut self) -> ParseResult<String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(SyntaxError(format!("expected a name, found {other:?}"))),
        }
    }

    pub fn expect_end(&self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(SyntaxError(format!("unexpected trailing token {token:?}"))),
        }
    }

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        let then = self.parse_or()?;
        if self.eat_keyword("if") {
            let cond = self.parse_or()?;
            let otherwise = if self.eat_keyword("else") {
                Some(Box::new(self.parse_expr()?))
            } else {
                None
            };
            return Ok(Expr::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise,
            });
        }
        Ok(then)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_not()?;
        while self.eat_keyword("and") {
            let rhs = self.parse_not()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_concat()?;
        loop {
            let op = if self.eat_op("==") {
                BinOp::Eq
            } else if self.eat_op("!=") {
                BinOp::Ne
            } else if self.eat_op("<=") {
                BinOp::Le
            } else if self.eat_op(">=") {
                BinOp::Ge
            } else if self.eat_op("<") {
                BinOp::Lt
            } else if self.eat_op(">") {
                BinOp::Gt
            } else if self.eat_keyword("in") {
                BinOp::In
            } else if self.is_keyword("not") && self.is_keyword_at(1, "in") {
                self.pos += 2;
                BinOp::NotIn
            } else if self.eat_keyword("is") {
                let negated = self.eat_keyword("not");
                let name = self.expect_ident()?;
                lhs = Expr::Test {
                    value: Box::new(lhs),
                    name,
                    negated,
                };
                continue;
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_concat()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_concat(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_additive()?;
        while self.eat_op("~") {
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(BinOp::Concat, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_op("+") {
                BinOp::Add
            } else if self.eat_op("-") {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.eat_op("//") {
                BinOp::FloorDiv
            } else if self.eat_op("*") {
                BinOp::Mul
            } else if self.eat_op("/") {
                BinOp::Div
            } else if self.eat_op("%") {
                BinOp::Rem
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.eat_op("-") {
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        if self.eat_op("+") {
            return self.parse_unary();
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_op(".") {
                let name = match self.next() {
                    Some(Token::Ident(name)) => name,
                    Some(Token::Int(i)) => i.to_string(),
                    other => return Err(SyntaxError(format!("bad attribute {other:?}"))),
                };
                expr = Expr::Attr(Box::new(expr), name);
            } else if self.eat_op("[") {
                expr = self.parse_subscript(expr)?;
            } else if self.eat_op("(") {
                let (args, kwargs) = self.parse_call_args()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    kwargs,
                };
            } else if self.eat_op("|") {
                let name = self.expect_ident()?;
                let args = if self.eat_op("(") {
                    let (mut args, kwargs) = self.parse_call_args()?;
                    args.extend(kwargs.into_iter().map(|(_, v)| v));
                    args
                } else {
                    Vec::new()
                };
                expr = Expr::Filter {
                    value: Box::new(expr),
                    name,
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_subscript(&mut self, target: Expr) -> ParseResult<Expr> {
        let start = if self.is_op(":") { None } else { Some(Box::new(self.parse_expr()?)) };
        if self.eat_op(":") {
            let end = if self.is_op("]") { None } else { Some(Box::new(self.parse_expr()?)) };
            self.expect_op("]")?;
            return Ok(Expr::Slice(Box::new(target), start, end));
        }
        self.expect_op("]")?;
        match start {
            Some(index) => Ok(Expr::Index(Box::new(target), index)),
            None => Err(SyntaxError("empty subscript".to_string())),
        }
    }

    fn parse_call_args(&mut self) -> ParseResult<(Vec<Expr>, Vec<(String, Expr)>)> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        while !self.eat_op(")") {
            let is_kwarg = matches!(self.peek(), Some(Token::Ident(_)))
                && matches!(self.tokens.get(self.pos + 1), Some(Token::Op("=")));
            if is_kwarg {
                let name = self.expect_ident()?;
                self.expect_op("=")?;
                kwargs.push((name, self.parse_expr()?));
            } else {
                args.push(self.parse_expr()?);
            }
            if !self.eat_op(",") {
                self.expect_op(")")?;
                break;
            }
        }
        Ok((args, kwargs))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.next() {
            Some(Token::Str(s)) => {
                // Adjacent string literals concatenate.
                let mut s = s;
                while let Some(Token::Str(next)) = self.peek() {
                    s.push_str(next);
                    self.pos += 1;
                }
                Ok(Expr::Literal(Value::Str(s)))
            }
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "True" | "true" => Expr::Literal(Value::Bool(true)),
                "False" | "false" => Expr::Literal(Value::Bool(false)),
                "None" | "none" => Expr::Literal(Value::Null),
                _ => Expr::Var(name),
            }),
            Some(Token::Op("(")) => {
                if self.eat_op(")") {
                    return Ok(Expr::List(Vec::new()));
                }
                let first = self.parse_expr()?;
                if self.eat_op(")") {
                    return Ok(first);
                }
                let mut items = vec![first];
                while self.eat_op(",") {
                    if self.is_op(")") {
                        break;
                    }
                    items.push(self.parse_expr()?);
                }
                self.expect_op(")")?;
                Ok(Expr::List(items))
            }
            Some(Token::Op("[")) => {
                let mut items = Vec::new();
                while !self.eat_op("]") {
                    items.push(self.parse_expr()?);
                    if !self.eat_op(",") {
                        self.expect_op("]")?;
                        break;
                    }
                }
                Ok(Expr::List(items))
            }
            Some(Token::Op("{")) => {
                let mut pairs = Vec::new();
                while !self.eat_op("}") {
                    let key = self.parse_expr()?;
                    self.expect_op(":")?;
                    let value = self.parse_expr()?;
                    pairs.push((key, value));
                    if !self.eat_op(",") {
                        self.expect_op("}")?;
                        break;
                    }
                }
                Ok(Expr::Dict(pairs))
            }
            other => Err(SyntaxError(format!("unexpected token {other:?}"))),
        }
    }
}

impl Expr {
    pub fn eval(&self, scope: &Scope) -> Value {
        match self {
            Expr::Literal(value) => value.clone(),
            Expr::Var(name) => scope.get(name),
            Expr::List(items) => Value::List(items.iter().map(|e| e.eval(scope)).collect()),
            Expr::Dict(pairs) => Value::Map(
                pairs.iter().map(|(k, v)| (k.eval(scope).to_string(), v.eval(scope))).collect(),
            ),
            Expr::Attr(target, name) => target.eval(scope).attr(name),
            Expr::Index(target, index) => target.eval(scope).index(&index.eval(scope)),
            Expr::Slice(target, start, end) => {
                let bound = |e: &Option<Box<Expr>>| e.as_ref().map(|e| e.eval(scope).to_int());
                target.eval(scope).slice(bound(start), bound(end))
            }
            Expr::Call { func, args, kwargs } => {
                let mut values: Vec<Value> = args.iter().map(|a| a.eval(scope)).collect();
                values.extend(kwargs.iter().map(|(_, v)| v.eval(scope)));
                if let Expr::Attr(target, name) = func.as_ref() {
                    let receiver = target.eval(scope);
                    return match receiver.attr(name) {
                        Value::Func(builtin) => builtin.call(&values, scope.target),
                        _ => call_method(&receiver, name, &values),
                    };
                }
                match func.eval(scope) {
                    Value::Func(builtin) => builtin.call(&values, scope.target),
                    _ => Value::Inert,
                }
            }
            Expr::Filter { value, name, args } => {
                let args: Vec<Value> = args.iter().map(|a| a.eval(scope)).collect();
                apply_filter(name, value.eval(scope), &args)
            }
            Expr::Test {
                value,
                name,
                negated,
            } => Value::Bool(apply_test(name, &value.eval(scope)) != *negated),
            Expr::Not(inner) => Value::Bool(!inner.eval(scope).is_truthy()),
            Expr::Neg(inner) => inner.eval(scope).neg(),
            Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, scope),
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if cond.eval(scope).is_truthy() {
                    then.eval(scope)
                } else {
                    otherwise.as_ref().map_or(Value::Inert, |e| e.eval(scope))
                }
            }
        }
    }
}

fn eval_binary(op: BinOp, lhs: &Expr, rhs: &Expr, scope: &Scope) -> Value {
    let left = lhs.eval(scope);
    match op {
        BinOp::And => return if left.is_truthy() { rhs.eval(scope) } else { left },
        BinOp::Or => return if left.is_truthy() { left } else { rhs.eval(scope) },
        _ => {}
    }
    let right = rhs.eval(scope);
    let compare = |accept: fn(std::cmp::Ordering) -> bool| {
        left.compare(&right).map_or(Value::Inert, |ord| Value::Bool(accept(ord)))
    };
    match op {
        BinOp::Add => left.add(&right),
        BinOp::Sub => left.sub(&right),
        BinOp::Mul => left.mul(&right),
        BinOp::Div => left.div(&right),
        BinOp::FloorDiv => left.floor_div(&right),
        BinOp::Rem => left.rem(&right),
        BinOp::Concat => Value::Str(format!("{left}{right}")),
        BinOp::Eq => left.equals(&right).map_or(Value::Inert, Value::Bool),
        BinOp::Ne => left.equals(&right).map_or(Value::Inert, |eq| Value::Bool(!eq)),
        BinOp::Lt => compare(|o| o.is_lt()),
        BinOp::Le => compare(|o| o.is_le()),
        BinOp::Gt => compare(|o| o.is_gt()),
        BinOp::Ge => compare(|o| o.is_ge()),
        BinOp::In => right.contains(&left).map_or(Value::Inert, Value::Bool),
        BinOp::NotIn => right.contains(&left).map_or(Value::Inert, |c| Value::Bool(!c)),
        BinOp::And | BinOp::Or => Value::Inert,
    }
}
