//! Host collaborators: the language model and the host notification surface.
//!
//! Both are narrow capability traits injected at construction. The
//! auto-outfit pass is the only consumer of the language model; the host
//! receives narration strings and resolves character names.

pub mod auto_outfit;
pub mod retry;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utilities::errors::GenerationError;

pub use auto_outfit::{build_outfit_prompt, AutoOutfitReport, AutoOutfitSystem, DEFAULT_SYSTEM_PROMPT};
pub use retry::{generate_with_retry, RetryPolicy, RetryState};

// ---------------------------------------------------------------------------
// LanguageModel
// ---------------------------------------------------------------------------

/// Text generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync + fmt::Debug {
    /// Generate a completion. `profile` selects a host connection profile;
    /// `None` uses the host default.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
        profile: Option<&str>,
    ) -> Result<String, GenerationError>;
}

/// One generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: String,
    #[serde(default)]
    pub profile: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: system_prompt.into(),
            profile: None,
        }
    }

    /// Builder method to route the request through a connection profile.
    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }
}

// ---------------------------------------------------------------------------
// HostContext
// ---------------------------------------------------------------------------

/// Character identity as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterInfo {
    pub id: String,
    pub name: String,
}

impl CharacterInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Host capabilities the tracker needs outside of storage.
pub trait HostContext: Send + Sync + fmt::Debug {
    /// Show a message on the host notification surface.
    fn notify(&self, message: &str);

    /// Look up a character by id.
    fn character_info(&self, character_id: &str) -> Option<CharacterInfo>;
}
