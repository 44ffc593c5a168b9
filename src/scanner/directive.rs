//! Directive extraction from language-model output.
//!
//! Grammar, one directive per line, surrounded by arbitrary prose:
//!
//! ```text
//! <prefix>_<action>_<slot>("<value>")
//! <prefix>_<action>_<slot>(<value>)
//! <prefix>_<action>_<slot>()
//! ```
//!
//! `<action>` is one of `wear`, `remove`, `change`. A quoted value supports
//! backslash escapes. An omitted or empty argument means `"None"`.
//! Malformed candidates are skipped and logged; scanning continues after
//! the prefix of the bad candidate.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::slots::{normalize_value, Slot};

/// Default directive prefix.
pub const DEFAULT_DIRECTIVE_PREFIX: &str = "outfit-system";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The verb of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveAction {
    Wear,
    Remove,
    Change,
}

impl DirectiveAction {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "wear" => Some(DirectiveAction::Wear),
            "remove" => Some(DirectiveAction::Remove),
            "change" => Some(DirectiveAction::Change),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveAction::Wear => "wear",
            DirectiveAction::Remove => "remove",
            DirectiveAction::Change => "change",
        }
    }
}

impl fmt::Display for DirectiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One well-formed directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// The exact source text of the directive.
    pub raw: String,
    pub action: DirectiveAction,
    /// Slot token as written; resolve with [`Directive::slot`].
    pub slot_name: String,
    /// Argument with escapes decoded; `"None"` when omitted or empty.
    pub value: String,
}

impl Directive {
    /// The slot this directive targets, if it is in the fixed vocabulary.
    pub fn slot(&self) -> Option<Slot> {
        Slot::parse(&self.slot_name)
    }

    /// The value the slot should hold after applying the directive.
    pub fn target_value(&self) -> String {
        match self.action {
            DirectiveAction::Remove => crate::slots::NONE_VALUE.to_string(),
            DirectiveAction::Wear | DirectiveAction::Change => normalize_value(&self.value),
        }
    }
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveParseError {
    #[error("expected '_' after prefix")]
    MissingSeparator,
    #[error("missing '_' after action")]
    MissingActionTerminator,
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("missing '(' after slot")]
    MissingOpenParen,
    #[error("empty slot name")]
    EmptySlot,
    #[error("unterminated quoted argument")]
    UnterminatedString,
    #[error("missing ')'")]
    MissingCloseParen,
}

// ---------------------------------------------------------------------------
// DirectiveScanner
// ---------------------------------------------------------------------------

/// Index-walking scanner for directives with a fixed prefix.
#[derive(Debug, Clone)]
pub struct DirectiveScanner {
    prefix: String,
}

impl Default for DirectiveScanner {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTIVE_PREFIX)
    }
}

impl DirectiveScanner {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Extract every well-formed directive, in source order.
    pub fn scan(&self, text: &str) -> Vec<Directive> {
        let mut directives = Vec::new();
        if self.prefix.is_empty() {
            return directives;
        }

        let mut pos = 0;
        while let Some(found) = text[pos..].find(self.prefix.as_str()) {
            let start = pos + found;
            match self.parse_at(text, start) {
                Ok((directive, end)) => {
                    log::debug!("DirectiveScanner: accepted '{}'", directive.raw);
                    directives.push(directive);
                    pos = end;
                }
                Err(e) => {
                    log::warn!(
                        "DirectiveScanner: skipping malformed directive at byte {}: {}",
                        start,
                        e
                    );
                    pos = start + self.prefix.len();
                }
            }
        }

        directives
    }

    /// Extract the raw text of every well-formed directive.
    pub fn extract_commands(&self, text: &str) -> Vec<String> {
        self.scan(text).into_iter().map(|d| d.raw).collect()
    }

    /// Parse one directive whose prefix starts at `start`. Returns the
    /// directive and the byte offset just past its closing paren.
    fn parse_at(&self, text: &str, start: usize) -> Result<(Directive, usize), DirectiveParseError> {
        let mut cursor = Cursor::new(text, start + self.prefix.len());

        if !cursor.eat('_') {
            return Err(DirectiveParseError::MissingSeparator);
        }

        let action_token = cursor.take_until(|c| c == '_', |c| c == '(' || is_line_break(c));
        let action_token = action_token.ok_or(DirectiveParseError::MissingActionTerminator)?;
        let action = DirectiveAction::parse(action_token)
            .ok_or_else(|| DirectiveParseError::UnknownAction(action_token.to_string()))?;
        cursor.eat('_');

        let slot_token = cursor
            .take_until(|c| c == '(', |c| c.is_whitespace() || c == ')')
            .ok_or(DirectiveParseError::MissingOpenParen)?;
        if slot_token.is_empty() {
            return Err(DirectiveParseError::EmptySlot);
        }
        cursor.eat('(');

        cursor.skip_inline_whitespace();
        let value = if cursor.eat('"') {
            let value = cursor.take_quoted()?;
            cursor.skip_inline_whitespace();
            if !cursor.eat(')') {
                return Err(DirectiveParseError::MissingCloseParen);
            }
            value
        } else {
            let value = cursor
                .take_until(|c| c == ')', is_line_break)
                .ok_or(DirectiveParseError::MissingCloseParen)?
                .trim()
                .to_string();
            cursor.eat(')');
            value
        };

        let end = cursor.pos;
        Ok((
            Directive {
                raw: text[start..end].to_string(),
                action,
                slot_name: slot_token.to_string(),
                value: normalize_value(&value),
            },
            end,
        ))
    }
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Slice up to (not including) the first char matching `stop`. Fails if
    /// `abort` matches first or the text ends. The cursor is left on the
    /// stop char.
    fn take_until(
        &mut self,
        stop: impl Fn(char) -> bool,
        abort: impl Fn(char) -> bool,
    ) -> Option<&'a str> {
        let start = self.pos;
        for (offset, c) in self.text[start..].char_indices() {
            if stop(c) {
                self.pos = start + offset;
                return Some(&self.text[start..self.pos]);
            }
            if abort(c) {
                return None;
            }
        }
        None
    }

    /// Decode a double-quoted body; the opening quote is already consumed.
    fn take_quoted(&mut self) -> Result<String, DirectiveParseError> {
        let mut value = String::new();
        let mut escaped = false;
        for (offset, c) in self.text[self.pos..].char_indices() {
            if escaped {
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                self.pos += offset + 1;
                return Ok(value);
            } else if is_line_break(c) {
                break;
            } else {
                value.push(c);
            }
        }
        Err(DirectiveParseError::UnterminatedString)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
