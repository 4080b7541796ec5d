//! JMESPath-style extraction from JSON response bodies
//!
//! Supported constructs:
//!
//! * field access: `permission_set.name`, quoted fields: `"sub-status"`
//! * indexing: `shares[0]`, from the end: `shares[-1]`
//! * projection: `users[*].user_name`
//! * filters: `rules[?rw_type=='rw']`, `accounts[?state!='SUSPENDED'].account_id`
//!   with string, number, `true`, `false` and `null` literals
//! * pipes, which stop a projection: `instances[*].instance_id | [0]`
//!
//! A path that does not resolve yields `Value::Null`, never an error.

use serde_json::Value;
use std::fmt;

static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub expression: String,
    pub position: usize,
    pub reason: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid path expression '{}' at {}: {}",
            self.expression, self.position, self.reason
        )
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Field(String),
    Index(i64),
    Wildcard,
    Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    field: Vec<String>,
    negate: bool,
    literal: Value,
}

impl Filter {
    fn matches(&self, item: &Value) -> bool {
        let mut current = item;
        for name in &self.field {
            current = current.get(name).unwrap_or(&NULL);
        }
        (current == &self.literal) != self.negate
    }
}

/// A parsed expression; segments are separated by pipes
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    segments: Vec<Vec<Step>>,
}

impl Expression {
    pub fn parse(expression: &str) -> Result<Self, ParseError> {
        Parser::new(expression).parse()
    }

    pub fn search(&self, value: &Value) -> Value {
        let mut current = value.clone();
        for segment in &self.segments {
            current = evaluate(segment, &current);
        }
        current
    }
}

fn evaluate(steps: &[Step], value: &Value) -> Value {
    let Some((step, rest)) = steps.split_first() else {
        return value.clone();
    };

    match step {
        Step::Field(name) => match value.get(name.as_str()) {
            Some(child) => evaluate(rest, child),
            None => Value::Null,
        },
        Step::Index(idx) => {
            let Some(items) = value.as_array() else {
                return Value::Null;
            };
            let position = if *idx < 0 {
                items.len() as i64 + idx
            } else {
                *idx
            };
            if position < 0 {
                return Value::Null;
            }
            match items.get(position as usize) {
                Some(child) => evaluate(rest, child),
                None => Value::Null,
            }
        }
        Step::Wildcard => match value.as_array() {
            Some(items) => project(items.iter(), rest),
            None => Value::Null,
        },
        Step::Filter(filter) => match value.as_array() {
            Some(items) => project(items.iter().filter(|item| filter.matches(item)), rest),
            None => Value::Null,
        },
    }
}

/// Applies the remaining steps to every element, dropping nulls
fn project<'a>(items: impl Iterator<Item = &'a Value>, rest: &[Step]) -> Value {
    Value::Array(
        items
            .map(|item| evaluate(rest, item))
            .filter(|v| !v.is_null())
            .collect(),
    )
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Expression, ParseError> {
        let mut segments = vec![self.segment()?];
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('|') => {
                    self.pos += 1;
                    segments.push(self.segment()?);
                }
                Some(c) => return Err(self.error(format!("unexpected '{}'", c))),
            }
        }
        Ok(Expression { segments })
    }

    fn segment(&mut self) -> Result<Vec<Step>, ParseError> {
        self.skip_whitespace();
        let mut steps = Vec::new();

        match self.peek() {
            Some('[') => steps.push(self.bracket()?),
            Some(_) => steps.push(Step::Field(self.identifier()?)),
            None => return Err(self.error("empty expression")),
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    if self.peek() == Some('[') {
                        return Err(self.error("expected field name after '.'"));
                    }
                    steps.push(Step::Field(self.identifier()?));
                }
                Some('[') => steps.push(self.bracket()?),
                _ => break,
            }
        }
        Ok(steps)
    }

    fn bracket(&mut self) -> Result<Step, ParseError> {
        self.expect('[')?;
        self.skip_whitespace();

        let step = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Step::Wildcard
            }
            Some('?') => {
                self.pos += 1;
                Step::Filter(self.filter()?)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => Step::Index(self.integer()?),
            _ => return Err(self.error("expected index, '*' or '?' filter")),
        };

        self.skip_whitespace();
        self.expect(']')?;
        Ok(step)
    }

    fn filter(&mut self) -> Result<Filter, ParseError> {
        self.skip_whitespace();
        let mut field = vec![self.identifier()?];
        while self.peek() == Some('.') {
            self.pos += 1;
            field.push(self.identifier()?);
        }

        self.skip_whitespace();
        let negate = match (self.peek(), self.chars.get(self.pos + 1).copied()) {
            (Some('='), Some('=')) => false,
            (Some('!'), Some('=')) => true,
            _ => return Err(self.error("expected '==' or '!='")),
        };
        self.pos += 2;
        self.skip_whitespace();

        let literal = self.literal()?;
        Ok(Filter {
            field,
            negate,
            literal,
        })
    }

    fn literal(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some('\'') => {
                self.pos += 1;
                let text = self.take_until('\'')?;
                Ok(Value::String(text))
            }
            Some('`') => {
                self.pos += 1;
                let text = self.take_until('`')?;
                serde_json::from_str(&text).map_err(|e| self.error(format!("bad JSON literal: {}", e)))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => Ok(Value::from(self.integer()?)),
            Some(_) => {
                let word = self.identifier()?;
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    other => Err(self.error(format!("unsupported literal '{}'", other))),
                }
            }
            None => Err(self.error("expected literal")),
        }
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        if self.peek() == Some('"') {
            self.pos += 1;
            return self.take_until('"');
        }

        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected field name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn integer(&mut self) -> Result<i64, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| self.error(format!("invalid number '{}'", text)))
    }

    fn take_until(&mut self, end: char) -> Result<String, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == end {
                let text = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(text);
            }
            self.pos += 1;
        }
        Err(self.error(format!("unterminated literal, missing {}", end)))
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c)))
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError {
            expression: self.source.to_string(),
            position: self.pos,
            reason: reason.into(),
        }
    }
}

/// Evaluates `expression` against `value`. Malformed expressions are
/// logged and treated like missing paths.
pub fn search(expression: &str, value: &Value) -> Value {
    match Expression::parse(expression) {
        Ok(expr) => expr.search(value),
        Err(e) => {
            tracing::debug!("{}", e);
            Value::Null
        }
    }
}

/// Strings as-is; numbers and booleans rendered as text
pub fn search_str(expression: &str, value: &Value) -> Option<String> {
    match search(expression, value) {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn search_bool(expression: &str, value: &Value) -> Option<bool> {
    match search(expression, value) {
        Value::Bool(b) => Some(b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Integers, also when the API encodes them as strings ("500")
pub fn search_i64(expression: &str, value: &Value) -> Option<i64> {
    match search(expression, value) {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().map(|f| f as i64)),
        _ => None,
    }
}

pub fn search_f64(expression: &str, value: &Value) -> Option<f64> {
    match search(expression, value) {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Array elements, or an empty list when the path is missing
pub fn search_list(expression: &str, value: &Value) -> Vec<Value> {
    match search(expression, value) {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Keeps elements whose `field` equals `expected`; `None` keeps everything.
/// Used by data sources to apply optional filter arguments client-side.
pub fn filter_by_field(items: Vec<Value>, field: &str, expected: Option<&Value>) -> Vec<Value> {
    let Some(expected) = expected else {
        return items;
    };
    items
        .into_iter()
        .filter(|item| &search(field, item) == expected)
        .collect()
}
