//! LDAP-style filter expressions over provider properties.
//!
//! Supported: `(&...)`, `(|...)`, `(!...)`, `attr=value`, `attr~=value`,
//! `attr>=value`, `attr<=value`, presence `attr=*` and substring patterns
//! such as `attr=ab*cd*`. A backslash escapes the next character in a value.
//! Attribute names compare case-insensitively.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use svcbind_core::Properties;
use thiserror::Error;

/// Errors parsing a filter string; positions are character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("Unexpected end of filter")]
    UnexpectedEnd,

    #[error("Expected '{expected}' at position {position}")]
    Expected { expected: char, position: usize },

    #[error("Missing attribute name at position {0}")]
    EmptyAttribute(usize),

    #[error("Invalid operator at position {0}")]
    InvalidOperator(usize),

    #[error("Composite filter without operands at position {0}")]
    EmptyComposite(usize),

    #[error("Unexpected input after filter at position {0}")]
    TrailingInput(usize),

    #[error("Filter nested deeper than {max} levels at position {position}")]
    TooDeep { max: usize, position: usize },
}

/// Parsed `*`-separated substring pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstringPattern {
    pub initial: String,
    pub any: Vec<String>,
    pub last: String,
}

impl SubstringPattern {
    fn matches(&self, value: &str) -> bool {
        let Some(mut rest) = value.strip_prefix(self.initial.as_str()) else {
            return false;
        };
        for part in &self.any {
            match rest.find(part.as_str()) {
                Some(index) => rest = &rest[index + part.len()..],
                None => return false,
            }
        }
        rest.ends_with(self.last.as_str())
    }
}

/// A parsed filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equal { attr: String, value: String },
    Approx { attr: String, value: String },
    GreaterEq { attr: String, value: String },
    LessEq { attr: String, value: String },
    Present(String),
    Substring { attr: String, pattern: SubstringPattern },
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self, FilterParseError> {
        let mut parser = Parser::new(input);
        let filter = parser.parse_filter()?;
        parser.skip_whitespace();
        if parser.peek().is_some() {
            return Err(FilterParseError::TrailingInput(parser.position));
        }
        Ok(filter)
    }

    /// Evaluate against one property table.
    pub fn matches(&self, properties: &Properties) -> bool {
        match self {
            Self::And(operands) => operands.iter().all(|f| f.matches(properties)),
            Self::Or(operands) => operands.iter().any(|f| f.matches(properties)),
            Self::Not(operand) => !operand.matches(properties),
            Self::Present(attr) => lookup(properties, attr).is_some(),
            Self::Equal { attr, value } => {
                lookup(properties, attr).is_some_and(|actual| actual == value)
            }
            Self::Approx { attr, value } => lookup(properties, attr)
                .is_some_and(|actual| approximate(actual) == approximate(value)),
            Self::GreaterEq { attr, value } => lookup(properties, attr)
                .is_some_and(|actual| compare(actual, value) != Ordering::Less),
            Self::LessEq { attr, value } => lookup(properties, attr)
                .is_some_and(|actual| compare(actual, value) != Ordering::Greater),
            Self::Substring { attr, pattern } => {
                lookup(properties, attr).is_some_and(|actual| pattern.matches(actual))
            }
        }
    }
}

impl FromStr for Filter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn lookup<'p>(properties: &'p Properties, attr: &str) -> Option<&'p str> {
    properties
        .get(attr)
        .or_else(|| {
            properties
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(attr))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}

fn approximate(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Numeric when both sides are numbers, lexical otherwise.
fn compare(actual: &str, expected: &str) -> Ordering {
    let (actual, expected) = (actual.trim(), expected.trim());
    if let (Ok(a), Ok(b)) = (actual.parse::<i64>(), expected.parse::<i64>()) {
        return a.cmp(&b);
    }
    if let (Ok(a), Ok(b)) = (actual.parse::<f64>(), expected.parse::<f64>()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    actual.cmp(expected)
}

/// One unescaped value, split on unescaped `*`.
struct RawValue {
    pieces: Vec<String>,
}

/// Deepest accepted nesting of `(...)` groups.
pub const MAX_FILTER_DEPTH: usize = 64;

struct Parser {
    chars: Vec<char>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), FilterParseError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.position += 1;
                Ok(())
            }
            Some(_) => Err(FilterParseError::Expected {
                expected,
                position: self.position,
            }),
            None => Err(FilterParseError::UnexpectedEnd),
        }
    }

    fn parse_filter(&mut self) -> Result<Filter, FilterParseError> {
        if self.depth == MAX_FILTER_DEPTH {
            return Err(FilterParseError::TooDeep {
                max: MAX_FILTER_DEPTH,
                position: self.position,
            });
        }
        self.depth += 1;
        let filter = self.parse_group();
        self.depth -= 1;
        filter
    }

    fn parse_group(&mut self) -> Result<Filter, FilterParseError> {
        self.skip_whitespace();
        self.expect('(')?;
        self.skip_whitespace();

        let filter = match self.peek() {
            Some('&') => {
                self.position += 1;
                Filter::And(self.parse_operands()?)
            }
            Some('|') => {
                self.position += 1;
                Filter::Or(self.parse_operands()?)
            }
            Some('!') => {
                self.position += 1;
                Filter::Not(Box::new(self.parse_filter()?))
            }
            Some(_) => self.parse_item()?,
            None => return Err(FilterParseError::UnexpectedEnd),
        };

        self.skip_whitespace();
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_operands(&mut self) -> Result<Vec<Filter>, FilterParseError> {
        let start = self.position;
        let mut operands = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            operands.push(self.parse_filter()?);
        }
        if operands.is_empty() {
            return Err(FilterParseError::EmptyComposite(start));
        }
        Ok(operands)
    }

    fn parse_item(&mut self) -> Result<Filter, FilterParseError> {
        let start = self.position;
        let mut attr = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '~' | '<' | '>' | '(' | ')') {
                break;
            }
            attr.push(c);
            self.position += 1;
        }
        let attr = attr.trim().to_string();
        if attr.is_empty() {
            return Err(FilterParseError::EmptyAttribute(start));
        }

        let op_position = self.position;
        let op = match self.bump() {
            Some('=') => '=',
            Some(c @ ('~' | '<' | '>')) => {
                if self.bump() != Some('=') {
                    return Err(FilterParseError::InvalidOperator(op_position));
                }
                c
            }
            Some(_) => return Err(FilterParseError::InvalidOperator(op_position)),
            None => return Err(FilterParseError::UnexpectedEnd),
        };

        let raw = self.parse_value()?;
        let filter = match op {
            '~' => Filter::Approx {
                attr,
                value: raw.pieces.concat(),
            },
            '>' => Filter::GreaterEq {
                attr,
                value: raw.pieces.concat(),
            },
            '<' => Filter::LessEq {
                attr,
                value: raw.pieces.concat(),
            },
            _ => equality(attr, raw),
        };
        Ok(filter)
    }

    fn parse_value(&mut self) -> Result<RawValue, FilterParseError> {
        let mut pieces = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(FilterParseError::UnexpectedEnd),
                Some(')') => break,
                Some('\\') => {
                    self.position += 1;
                    let escaped = self.bump().ok_or(FilterParseError::UnexpectedEnd)?;
                    if let Some(piece) = pieces.last_mut() {
                        piece.push(escaped);
                    }
                }
                Some('*') => {
                    self.position += 1;
                    pieces.push(String::new());
                }
                Some(c) => {
                    self.position += 1;
                    if let Some(piece) = pieces.last_mut() {
                        piece.push(c);
                    }
                }
            }
        }
        Ok(RawValue { pieces })
    }
}

/// `=` becomes equality, presence or substring depending on the wildcards.
fn equality(attr: String, raw: RawValue) -> Filter {
    let mut pieces = raw.pieces;
    match pieces.len() {
        1 => Filter::Equal {
            attr,
            value: pieces.remove(0),
        },
        2 if pieces.iter().all(String::is_empty) => Filter::Present(attr),
        _ => {
            let last = pieces.pop().unwrap_or_default();
            let initial = pieces.remove(0);
            let any = pieces.into_iter().filter(|p| !p.is_empty()).collect();
            Filter::Substring {
                attr,
                pattern: SubstringPattern { initial, any, last },
            }
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(operands) | Self::Or(operands) => {
                f.write_str(if matches!(self, Self::And(_)) { "(&" } else { "(|" })?;
                for operand in operands {
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
            Self::Not(operand) => write!(f, "(!{operand})"),
            Self::Equal { attr, value } => write!(f, "({attr}={})", escape(value)),
            Self::Approx { attr, value } => write!(f, "({attr}~={})", escape(value)),
            Self::GreaterEq { attr, value } => write!(f, "({attr}>={})", escape(value)),
            Self::LessEq { attr, value } => write!(f, "({attr}<={})", escape(value)),
            Self::Present(attr) => write!(f, "({attr}=*)"),
            Self::Substring { attr, pattern } => {
                write!(f, "({attr}={}*", escape(&pattern.initial))?;
                for part in &pattern.any {
                    write!(f, "{}*", escape(part))?;
                }
                write!(f, "{})", escape(&pattern.last))
            }
        }
    }
}
