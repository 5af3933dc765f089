// src/services/selectors.rs

//! Selector validation.
//!
//! Selectors come from user input, so they are checked against a small
//! explicit grammar before they reach `scraper`:
//!
//! ```text
//! list      := complex ("," complex)*
//! complex   := compound (combinator? compound)*      combinator: ' ' > + ~
//! compound  := (ident | "*")? (#ident | .ident | attribute | pseudo)*
//! attribute := "[" ident (op (ident | string))? "]"  op: = ~= |= ^= $= *=
//! pseudo    := ":" name | ":" nth-name "(" an+b ")" | ":" (not|has|is|where) "(" list ")"
//! ```

use std::fmt;

use scraper::Selector;
use thiserror::Error;

const PLAIN_PSEUDO_CLASSES: &[&str] = &[
    "first-child",
    "last-child",
    "only-child",
    "first-of-type",
    "last-of-type",
    "only-of-type",
    "empty",
    "root",
    "link",
    "checked",
    "disabled",
    "enabled",
];

const NTH_PSEUDO_CLASSES: &[&str] = &[
    "nth-child",
    "nth-last-child",
    "nth-of-type",
    "nth-last-of-type",
];

const NESTED_PSEUDO_CLASSES: &[&str] = &["not", "has", "is", "where"];

/// Why a selector was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorErrorReason {
    Empty,
    UnexpectedChar(char),
    UnterminatedAttribute,
    UnterminatedString,
    UnknownPseudoClass(String),
    DanglingCombinator,
    EmptyListItem,
    Unbalanced,
    /// Passed the grammar but the HTML engine refused it
    Unsupported(String),
}

impl fmt::Display for SelectorErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("selector is empty"),
            Self::UnexpectedChar(c) => write!(f, "unexpected character '{c}'"),
            Self::UnterminatedAttribute => f.write_str("unterminated attribute selector"),
            Self::UnterminatedString => f.write_str("unterminated string"),
            Self::UnknownPseudoClass(name) => write!(f, "unknown pseudo-class ':{name}'"),
            Self::DanglingCombinator => f.write_str("combinator without a following selector"),
            Self::EmptyListItem => f.write_str("empty item in selector list"),
            Self::Unbalanced => f.write_str("unbalanced parentheses"),
            Self::Unsupported(detail) => write!(f, "unsupported selector: {detail}"),
        }
    }
}

/// Structured selector validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid selector '{selector}' at position {position}: {reason}")]
pub struct SelectorError {
    pub selector: String,
    /// Character offset where parsing stopped
    pub position: usize,
    pub reason: SelectorErrorReason,
}

/// Check a selector string against the allowed grammar.
pub fn validate_selector(selector: &str) -> Result<(), SelectorError> {
    let mut parser = Parser::new(selector);
    parser.skip_ws();
    if parser.at_end() {
        return Err(parser.fail(SelectorErrorReason::Empty));
    }
    parser.list(None)?;
    Ok(())
}

/// Validate and compile a selector for use with `scraper`.
pub fn compile_selector(selector: &str) -> Result<Selector, SelectorError> {
    validate_selector(selector)?;
    Selector::parse(selector).map_err(|e| SelectorError {
        selector: selector.to_string(),
        position: 0,
        reason: SelectorErrorReason::Unsupported(format!("{e:?}")),
    })
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

    fn fail(&self, reason: SelectorErrorReason) -> SelectorError {
        SelectorError {
            selector: self.source.to_string(),
            position: self.pos,
            reason,
        }
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(c) => self.fail(SelectorErrorReason::UnexpectedChar(c)),
            None => self.fail(SelectorErrorReason::DanglingCombinator),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    /// Parse a comma-separated list, stopping before `close` when nested.
    fn list(&mut self, close: Option<char>) -> Result<(), SelectorError> {
        loop {
            self.skip_ws();
            if self.at_end() || self.peek() == Some(',') || self.peek() == close {
                return Err(self.fail(SelectorErrorReason::EmptyListItem));
            }
            self.complex(close.is_some())?;
            self.skip_ws();
            match self.peek() {
                None => {
                    return match close {
                        Some(_) => Err(self.fail(SelectorErrorReason::Unbalanced)),
                        None => Ok(()),
                    };
                }
                Some(',') => self.pos += 1,
                Some(c) if Some(c) == close => return Ok(()),
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn complex(&mut self, nested: bool) -> Result<(), SelectorError> {
        // `:has(> li)` style relative selectors start with a combinator
        if nested && matches!(self.peek(), Some('>' | '+' | '~')) {
            self.pos += 1;
            self.skip_ws();
        }
        self.compound()?;
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') | Some(')') => return Ok(()),
                Some('>' | '+' | '~') => {
                    self.pos += 1;
                    self.skip_ws();
                    if matches!(self.peek(), None | Some(',') | Some(')')) {
                        return Err(self.fail(SelectorErrorReason::DanglingCombinator));
                    }
                    self.compound()?;
                }
                Some(_) if had_ws => self.compound()?,
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn compound(&mut self) -> Result<(), SelectorError> {
        let start = self.pos;
        if self.peek() == Some('*') {
            self.pos += 1;
        } else if self.peek().is_some_and(is_ident_start) {
            self.ident()?;
        }

        loop {
            match self.peek() {
                Some('#') | Some('.') => {
                    self.pos += 1;
                    self.ident()?;
                }
                Some('[') => self.attribute()?,
                Some(':') => self.pseudo()?,
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(())
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        if !self.peek().is_some_and(is_ident_start) {
            return Err(self.unexpected());
        }
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn attribute(&mut self) -> Result<(), SelectorError> {
        self.pos += 1;
        self.skip_ws();
        if self.at_end() {
            return Err(self.fail(SelectorErrorReason::UnterminatedAttribute));
        }
        self.ident()?;
        self.skip_ws();

        match self.peek() {
            None => return Err(self.fail(SelectorErrorReason::UnterminatedAttribute)),
            Some(']') => {
                self.pos += 1;
                return Ok(());
            }
            Some('=') => self.pos += 1,
            Some('~' | '|' | '^' | '$' | '*') if self.chars.get(self.pos + 1) == Some(&'=') => {
                self.pos += 2;
            }
            Some(_) => return Err(self.unexpected()),
        }

        self.skip_ws();
        match self.peek() {
            None => return Err(self.fail(SelectorErrorReason::UnterminatedAttribute)),
            Some(quote @ ('"' | '\'')) => self.string(quote)?,
            Some(_) => {
                self.ident()?;
            }
        }
        self.skip_ws();

        // case-sensitivity flag
        if matches!(self.peek(), Some('i' | 's')) {
            self.pos += 1;
            self.skip_ws();
        }

        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(())
            }
            None => Err(self.fail(SelectorErrorReason::UnterminatedAttribute)),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn string(&mut self, quote: char) -> Result<(), SelectorError> {
        self.pos += 1;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => self.pos += 1,
                c if c == quote => return Ok(()),
                _ => {}
            }
        }
        Err(self.fail(SelectorErrorReason::UnterminatedString))
    }

    fn pseudo(&mut self) -> Result<(), SelectorError> {
        self.pos += 1;
        if self.peek() == Some(':') {
            self.pos += 1;
            let name = self.ident().unwrap_or_default();
            return Err(self.fail(SelectorErrorReason::UnknownPseudoClass(format!(":{name}"))));
        }

        let name = self.ident()?.to_ascii_lowercase();
        if PLAIN_PSEUDO_CLASSES.contains(&name.as_str()) {
            return Ok(());
        }
        if NTH_PSEUDO_CLASSES.contains(&name.as_str()) {
            return self.nth_argument();
        }
        if NESTED_PSEUDO_CLASSES.contains(&name.as_str()) {
            if self.peek() != Some('(') {
                return Err(self.fail(SelectorErrorReason::Unbalanced));
            }
            self.pos += 1;
            self.list(Some(')'))?;
            self.pos += 1;
            return Ok(());
        }
        Err(self.fail(SelectorErrorReason::UnknownPseudoClass(name)))
    }

    /// `an+b`, `odd`, or `even` inside parentheses.
    fn nth_argument(&mut self) -> Result<(), SelectorError> {
        if self.peek() != Some('(') {
            return Err(self.fail(SelectorErrorReason::Unbalanced));
        }
        self.pos += 1;
        let start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.fail(SelectorErrorReason::Unbalanced)),
                Some(')') => break,
                Some(c) if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | ' ') => {
                    self.pos += 1;
                }
                Some(_) => return Err(self.unexpected()),
            }
        }

        let argument: String = self.chars[start..self.pos].iter().collect();
        let argument = argument.trim().to_ascii_lowercase();
        let valid = matches!(argument.as_str(), "odd" | "even")
            || (!argument.is_empty()
                && argument
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, 'n' | '+' | '-' | ' ')));
        if !valid {
            return Err(self.fail(SelectorErrorReason::UnexpectedChar(
                argument.chars().next().unwrap_or(')'),
            )));
        }
        self.pos += 1;
        Ok(())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}
