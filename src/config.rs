//! Tracker configuration.
//!
//! Every field has a serde default so partial JSON settings load cleanly.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scanner::DEFAULT_DIRECTIVE_PREFIX;
use crate::utilities::errors::Result;
use crate::utilities::instance_id::MAX_INSTANCE_ID_LENGTH;

/// Configuration for instance derivation, directive scanning, and the
/// auto-outfit language-model pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutfitConfig {
    /// Literal prefix of outfit directives.
    /// Defaults to `"outfit-system"`.
    #[serde(default = "default_directive_prefix")]
    pub directive_prefix: String,

    /// Attempts on the profile path before falling back.
    /// Defaults to 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts, in milliseconds. Defaults to 0.
    #[serde(default)]
    pub retry_delay_ms: u64,

    /// Connection profile for generation; `None` uses the host default.
    #[serde(default)]
    pub connection_profile: Option<String>,

    /// Length of SHA-256 instance identifiers (1..=16). Defaults to 16.
    #[serde(default = "default_instance_id_length")]
    pub instance_id_length: usize,

    /// Run the auto-outfit pass after character messages.
    #[serde(default)]
    pub auto_update: bool,

    /// How many recent messages the auto-outfit prompt includes.
    /// Defaults to 3.
    #[serde(default = "default_context_messages")]
    pub context_messages: usize,

    /// Replaces the built-in auto-outfit system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_directive_prefix() -> String {
    DEFAULT_DIRECTIVE_PREFIX.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_instance_id_length() -> usize {
    MAX_INSTANCE_ID_LENGTH
}

fn default_context_messages() -> usize {
    3
}

impl Default for OutfitConfig {
    fn default() -> Self {
        Self {
            directive_prefix: default_directive_prefix(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: 0,
            connection_profile: None,
            instance_id_length: default_instance_id_length(),
            auto_update: false,
            context_messages: default_context_messages(),
            system_prompt: None,
        }
    }
}

impl OutfitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from host settings JSON. Missing fields take their defaults.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Builder method to set the directive prefix.
    pub fn with_directive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.directive_prefix = prefix.into();
        self
    }

    /// Builder method to set the attempt bound.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Builder method to set the connection profile.
    pub fn with_connection_profile(mut self, profile: impl Into<String>) -> Self {
        self.connection_profile = Some(profile.into());
        self
    }

    /// Builder method to enable the auto-outfit pass.
    pub fn with_auto_update(mut self, enabled: bool) -> Self {
        self.auto_update = enabled;
        self
    }

    /// Attempt bound, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = OutfitConfig::default();
        assert_eq!(config.directive_prefix, "outfit-system");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.instance_id_length, 16);
        assert_eq!(config.context_messages, 3);
        assert!(!config.auto_update);
        assert!(config.connection_profile.is_none());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = OutfitConfig::from_value(json!({
            "auto_update": true,
            "connection_profile": "fast"
        }))
        .unwrap();
        assert!(config.auto_update);
        assert_eq!(config.connection_profile.as_deref(), Some("fast"));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config, OutfitConfig::default().with_auto_update(true).with_connection_profile("fast"));
    }

    #[test]
    fn test_attempts_never_zero() {
        assert_eq!(OutfitConfig::default().with_max_attempts(0).attempts(), 1);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(OutfitConfig::from_value(json!({"max_attempts": "many"})).is_err());
    }
}
