//! Regex-free scanners for directive strings and quoted spans.
//!
//! Both scanners are explicit index-walking state machines so that the
//! edge cases (escaped quotes, contraction apostrophes) can be audited line
//! by line.

pub mod directive;
pub mod quotes;

pub use directive::{
    Directive, DirectiveAction, DirectiveParseError, DirectiveScanner, DEFAULT_DIRECTIVE_PREFIX,
};
pub use quotes::{QuoteDelimiter, QuoteScanner};
