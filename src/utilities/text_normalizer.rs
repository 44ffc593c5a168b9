//! Text normalization ahead of instance hashing.
//!
//! Chat text may embed the current outfit, either through `{{owner_slot}}`
//! macros or through prose such as "she is wearing a red jacket". Both are
//! rewritten to stable placeholders so that the instance hash does not move
//! when the outfit does. Everything else passes through verbatim.
//!
//! The scan is index-walking and regex-free. It is a heuristic: false
//! positives are acceptable as long as the output is deterministic.

/// Placeholder written after a wearing phrase.
pub const ITEM_PLACEHOLDER: &str = "[ITEM]";

/// Phrases whose trailing clause describes worn items.
///
/// Matched case-insensitively on word boundaries.
pub const WEARING_PHRASES: &[&str] = &[
    "dressed in",
    "clad in",
    "changes into",
    "changed into",
    "slips into",
    "has on",
    "have on",
    "puts on",
    "put on",
    "takes off",
    "took off",
    "wearing",
    "wears",
    "wore",
    "removes",
    "removed",
    "donned",
    "dons",
];

/// Characters that end the clause following a wearing phrase.
fn is_clause_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | ';' | ',' | '\n' | '\r')
}

/// Normalize text for hashing: canonicalize outfit macros, then mask the
/// clause after every wearing phrase.
///
/// Empty input is returned unchanged.
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let canonical = normalize_macros(text);
    mask_wearing_phrases(&canonical)
}

/// Same as [`normalize_text`] for optional input; `None` yields an empty string.
pub fn normalize_optional(text: Option<&str>) -> String {
    text.map(normalize_text).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Macro spans
// ---------------------------------------------------------------------------

/// Rewrite every `{{owner_slot...}}` span to exactly `{{owner_slot}}`.
///
/// Spans without an underscore are kept verbatim. An unterminated `{{` is
/// copied literally and scanning resumes after it.
pub fn normalize_macros(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let body = &rest[open + 2..];

        let close = match body.find("}}") {
            Some(close) => close,
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        };

        let inner = &body[..close];
        if inner.contains("{{") {
            // A nested opener: the outer one is literal text.
            out.push_str("{{");
            rest = body;
            continue;
        }

        out.push_str(&canonical_macro(inner));
        rest = &body[close + 2..];
    }

    out.push_str(rest);
    out
}

fn canonical_macro(inner: &str) -> String {
    let Some(split) = inner.find('_') else {
        return format!("{{{{{}}}}}", inner);
    };

    let owner = inner[..split].trim();
    let slot: String = inner[split + 1..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if owner.is_empty() || slot.is_empty() {
        return format!("{{{{{}}}}}", inner);
    }
    format!("{{{{{}_{}}}}}", owner, slot)
}

// ---------------------------------------------------------------------------
// Wearing phrases
// ---------------------------------------------------------------------------

/// Replace each wearing phrase and the rest of its clause with
/// `"<phrase> [ITEM]"`. The terminator itself is kept.
pub fn mask_wearing_phrases(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        if let Some(len) = wearing_phrase_at(text, i) {
            let phrase_end = i + len;
            out.push_str(&text[i..phrase_end]);
            out.push(' ');
            out.push_str(ITEM_PLACEHOLDER);

            i = text[phrase_end..]
                .find(is_clause_terminator)
                .map(|offset| phrase_end + offset)
                .unwrap_or(text.len());
            continue;
        }

        match text[i..].chars().next() {
            Some(c) => {
                out.push(c);
                i += c.len_utf8();
            }
            None => break,
        }
    }

    out
}

/// Byte length of the wearing phrase starting at `i`, if one starts there.
fn wearing_phrase_at(text: &str, i: usize) -> Option<usize> {
    let starts_word = text[..i]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric());
    if !starts_word {
        return None;
    }

    let bytes = text.as_bytes();
    WEARING_PHRASES.iter().find_map(|phrase| {
        let end = i + phrase.len();
        if end > bytes.len() || !bytes[i..end].eq_ignore_ascii_case(phrase.as_bytes()) {
            return None;
        }
        // Matched bytes are ASCII, so `end` is a char boundary.
        let ends_word = text[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        ends_word.then_some(phrase.len())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
