//! Instance identifiers derived from normalized chat text.
//!
//! The primary path is a truncated, hex-encoded SHA-256 digest. The
//! fallback path is a 32-bit rolling multiplicative hash rendered in
//! base-36. Which path a build uses is fixed at compile time (cargo feature
//! `weak-hash`), so the same text always yields the same identifier across
//! sessions of one build.

use sha2::{Digest, Sha256};

use crate::types::chat::{first_substantive_message, ChatMessage};
use crate::utilities::text_normalizer::normalize_text;

/// Upper bound on identifier length (storage key budget).
pub const MAX_INSTANCE_ID_LENGTH: usize = 16;

/// Number of UTF-16 code units fed into the rolling hash.
pub const ROLLING_HASH_WINDOW: usize = 100;

/// Hashing path used to derive identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStrategy {
    /// Truncated hex SHA-256.
    Sha256,
    /// `hash * 31 + code_unit` over the first 100 code units, base-36.
    Rolling,
}

impl HashStrategy {
    /// The strategy this build was compiled with.
    pub const fn for_build() -> Self {
        if cfg!(feature = "weak-hash") {
            HashStrategy::Rolling
        } else {
            HashStrategy::Sha256
        }
    }
}

/// Turns normalized text into a short deterministic key.
#[derive(Debug, Clone, Copy)]
pub struct InstanceIdentifier {
    strategy: HashStrategy,
    length: usize,
}

impl Default for InstanceIdentifier {
    fn default() -> Self {
        Self::new(MAX_INSTANCE_ID_LENGTH)
    }
}

impl InstanceIdentifier {
    /// Identifier using the build's strategy. `length` is clamped to
    /// `1..=16` and only affects the SHA-256 path.
    pub fn new(length: usize) -> Self {
        Self::with_strategy(HashStrategy::for_build(), length)
    }

    /// Identifier pinned to a strategy. Hosts must not mix strategies for
    /// the same stored state.
    pub fn with_strategy(strategy: HashStrategy, length: usize) -> Self {
        log::debug!("InstanceIdentifier: strategy={:?}, length={}", strategy, length);
        Self {
            strategy,
            length: length.clamp(1, MAX_INSTANCE_ID_LENGTH),
        }
    }

    pub fn strategy(&self) -> HashStrategy {
        self.strategy
    }

    /// Identify already-normalized text.
    pub fn identify(&self, normalized: &str) -> String {
        match self.strategy {
            HashStrategy::Sha256 => sha256_id(normalized, self.length),
            HashStrategy::Rolling => rolling_hash_id(normalized),
        }
    }

    /// Normalize, then identify.
    pub fn identify_text(&self, raw: &str) -> String {
        self.identify(&normalize_text(raw))
    }

    /// Identifier for a conversation, anchored on its first substantive
    /// message. `None` when there is no such message.
    pub fn identify_chat(&self, messages: &[ChatMessage]) -> Option<String> {
        first_substantive_message(messages).map(|m| self.identify_text(&m.text))
    }
}

/// Hex SHA-256 of the UTF-8 text, truncated to `length` characters.
pub fn sha256_id(text: &str, length: usize) -> String {
    let digest = hex::encode(Sha256::digest(text.as_bytes()));
    digest[..length.clamp(1, MAX_INSTANCE_ID_LENGTH)].to_string()
}

/// 32-bit rolling hash (`hash * 31 + unit`, wrapping) over the first
/// [`ROLLING_HASH_WINDOW`] UTF-16 code units, absolute value in base-36.
pub fn rolling_hash_id(text: &str) -> String {
    let hash = text
        .encode_utf16()
        .take(ROLLING_HASH_WINDOW)
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)));
    to_base36(hash.unsigned_abs())
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(7);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_prefixes() {
        assert_eq!(sha256_id("", 16), "e3b0c44298fc1c14");
        assert_eq!(sha256_id("abc", 16), "ba7816bf8f01cfea");
        assert_eq!(sha256_id("abc", 8), "ba7816bf");
    }

    #[test]
    fn test_length_is_clamped() {
        let id = InstanceIdentifier::with_strategy(HashStrategy::Sha256, 64);
        assert_eq!(id.identify("abc").len(), MAX_INSTANCE_ID_LENGTH);
        let id = InstanceIdentifier::with_strategy(HashStrategy::Sha256, 0);
        assert_eq!(id.identify("abc").len(), 1);
    }

    #[test]
    fn test_rolling_hash_known_values() {
        assert_eq!(rolling_hash_id(""), "0");
        assert_eq!(rolling_hash_id("a"), "2p");
        assert_eq!(rolling_hash_id("abc"), "22ci");
    }

    #[test]
    fn test_rolling_hash_only_reads_window() {
        let base = "x".repeat(ROLLING_HASH_WINDOW);
        assert_eq!(
            rolling_hash_id(&base),
            rolling_hash_id(&format!("{base}tail that is ignored"))
        );
    }

    #[test]
    fn test_rolling_hash_handles_overflow() {
        let long = "\u{ffff}".repeat(ROLLING_HASH_WINDOW);
        let id = rolling_hash_id(&long);
        assert!(!id.is_empty());
        assert!(id.len() <= 7);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_stable_across_calls() {
        for strategy in [HashStrategy::Sha256, HashStrategy::Rolling] {
            let id = InstanceIdentifier::with_strategy(strategy, 16);
            let text = "Welcome to the Silver Stag, traveler.";
            assert_eq!(id.identify_text(text), id.identify_text(text));
            assert!(id.identify_text(text).len() <= MAX_INSTANCE_ID_LENGTH);
        }
    }

    #[test]
    fn test_insensitive_to_outfit_values() {
        let id = InstanceIdentifier::default();
        let a = id.identify_text("Mira adjusts {{char_topwear}}. She is wearing a blue dress.");
        let b = id.identify_text("Mira adjusts {{char_topwear}}. She is wearing a leather coat.");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_chats_differ() {
        let id = InstanceIdentifier::default();
        assert_ne!(
            id.identify_text("The ship lurches."),
            id.identify_text("The train halts.")
        );
    }

    #[test]
    fn test_identify_chat_uses_first_substantive_message() {
        let id = InstanceIdentifier::default();
        let chat = vec![
            ChatMessage::system("Intro"),
            ChatMessage::character("Mira", "Welcome, traveler."),
            ChatMessage::user("You", "Hi"),
        ];
        assert_eq!(
            id.identify_chat(&chat),
            Some(id.identify_text("Welcome, traveler."))
        );
        assert_eq!(id.identify_chat(&[ChatMessage::system("x")]), None);
    }

    #[test]
    fn test_build_strategy_matches_feature() {
        let expected = if cfg!(feature = "weak-hash") {
            HashStrategy::Rolling
        } else {
            HashStrategy::Sha256
        };
        assert_eq!(InstanceIdentifier::default().strategy(), expected);
    }
}
