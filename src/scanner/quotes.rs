//! Quoted-span detection in rendered message HTML.
//!
//! Used for styling only; it never affects outfit state. Each scan is a
//! single left-to-right pass. HTML tags are copied through untouched so
//! attribute quotes are never paired. An opener without a closer is emitted
//! literally and scanning resumes right after it.
//!
//! Apostrophes need context: `Mira's` and `don't` are not closing quotes.
//! A closing `'` is rejected when it starts a possessive `'s` or a
//! contraction suffix (`'t`, `'re`, `'ve`, `'ll`, `'d`, `'m`) glued to a
//! word, and is otherwise accepted only when followed by whitespace,
//! punctuation, a tag, or the end of the text.

use std::ops::Range;

/// Contraction suffixes following an apostrophe.
const CONTRACTION_SUFFIXES: &[&str] = &["t", "re", "ve", "ll", "d", "m"];

/// The delimiter pair to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteDelimiter {
    /// `"`
    DoubleQuote,
    /// The HTML entity `&quot;`.
    HtmlEntity,
    /// `'`, with possessive and contraction handling.
    Apostrophe,
}

impl QuoteDelimiter {
    pub fn token(&self) -> &'static str {
        match self {
            QuoteDelimiter::DoubleQuote => "\"",
            QuoteDelimiter::HtmlEntity => "&quot;",
            QuoteDelimiter::Apostrophe => "'",
        }
    }
}

/// Finds balanced quote pairs for one delimiter.
#[derive(Debug, Clone, Copy)]
pub struct QuoteScanner {
    delimiter: QuoteDelimiter,
}

impl QuoteScanner {
    pub fn new(delimiter: QuoteDelimiter) -> Self {
        Self { delimiter }
    }

    /// Byte ranges of every quoted span, delimiters included.
    pub fn spans(&self, html: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        self.walk(html, |event| {
            if let Event::Span(range) = event {
                spans.push(range);
            }
        });
        spans
    }

    /// Wrap every quoted span (delimiters included) in `open_tag`/`close_tag`.
    pub fn highlight(&self, html: &str, open_tag: &str, close_tag: &str) -> String {
        let mut out = String::with_capacity(html.len());
        self.walk(html, |event| match event {
            Event::Text(range) => out.push_str(&html[range]),
            Event::Span(range) => {
                out.push_str(open_tag);
                out.push_str(&html[range]);
                out.push_str(close_tag);
            }
        });
        out
    }

    /// Emit text and span events covering the whole input, in order.
    fn walk(&self, html: &str, mut emit: impl FnMut(Event)) {
        let token = self.delimiter.token();
        let mut text_start = 0;
        let mut i = 0;
        // Closer validity depends only on local context, so once a search
        // fails no later opener can succeed.
        let mut closers_exhausted = false;

        while i < html.len() {
            if let Some(tag_end) = tag_end_at(html, i) {
                i = tag_end;
                continue;
            }

            if !html[i..].starts_with(token) || !self.is_opener(html, i) {
                i += char_len_at(html, i);
                continue;
            }

            let body_start = i + token.len();
            let close = if closers_exhausted {
                None
            } else {
                self.find_closer(html, body_start)
            };

            match close {
                Some(close) => {
                    let end = close + token.len();
                    if text_start < i {
                        emit(Event::Text(text_start..i));
                    }
                    emit(Event::Span(i..end));
                    text_start = end;
                    i = end;
                }
                None => {
                    closers_exhausted = true;
                    i = body_start;
                }
            }
        }

        if text_start < html.len() {
            emit(Event::Text(text_start..html.len()));
        }
    }

    fn find_closer(&self, html: &str, from: usize) -> Option<usize> {
        let token = self.delimiter.token();
        let mut j = from;
        while j < html.len() {
            if let Some(tag_end) = tag_end_at(html, j) {
                j = tag_end;
                continue;
            }
            if html[j..].starts_with(token) && self.is_closer(html, from, j) {
                return Some(j);
            }
            j += char_len_at(html, j);
        }
        None
    }

    fn is_opener(&self, html: &str, i: usize) -> bool {
        if self.delimiter != QuoteDelimiter::Apostrophe {
            return true;
        }
        let before_ok = char_before(html, i).map_or(true, is_boundary);
        let after_ok = char_after(html, i + 1).map_or(false, |c| !c.is_whitespace());
        before_ok && after_ok
    }

    fn is_closer(&self, html: &str, body_start: usize, j: usize) -> bool {
        if self.delimiter != QuoteDelimiter::Apostrophe {
            return true;
        }
        if j == body_start {
            return false;
        }
        let rest = &html[j + 1..];
        let glued = char_before(html, j).map_or(false, |c| c.is_alphanumeric());

        if glued && is_possessive(rest) {
            return false;
        }
        if glued && is_contraction(rest) {
            return false;
        }
        char_after(html, j + 1).map_or(true, is_boundary)
    }
}

enum Event {
    Text(Range<usize>),
    Span(Range<usize>),
}

/// `'s` closing a word, as in `Mira's`.
fn is_possessive(rest: &str) -> bool {
    let mut chars = rest.chars();
    matches!(chars.next(), Some('s') | Some('S'))
        && chars.next().map_or(true, |c| !c.is_alphanumeric())
}

fn is_contraction(rest: &str) -> bool {
    CONTRACTION_SUFFIXES.iter().any(|suffix| {
        let Some(head) = rest.get(..suffix.len()) else {
            return false;
        };
        head.eq_ignore_ascii_case(suffix)
            && rest[suffix.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric())
    })
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || (c.is_ascii_punctuation() && c != '\'') || c == '<' || c == '>'
}

fn char_before(s: &str, i: usize) -> Option<char> {
    s[..i].chars().next_back()
}

fn char_after(s: &str, i: usize) -> Option<char> {
    s.get(i..).and_then(|rest| rest.chars().next())
}

fn char_len_at(s: &str, i: usize) -> usize {
    s[i..].chars().next().map_or(1, char::len_utf8)
}

/// End offset of an HTML tag starting at `i`, if one does.
fn tag_end_at(html: &str, i: usize) -> Option<usize> {
    let rest = &html[i..];
    if !rest.starts_with('<') {
        return None;
    }
    let next = rest[1..].chars().next()?;
    if !(next.is_ascii_alphabetic() || next == '/' || next == '!') {
        return None;
    }
    rest.find('>').map(|end| i + end + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
