//! Test doubles for the host collaborators.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::llms::{CharacterInfo, GenerationRequest, HostContext, LanguageModel};
use crate::utilities::errors::GenerationError;

/// Language model that replays a fixed script of responses and records
/// every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
        profile: Option<&str>,
    ) -> Result<String, GenerationError> {
        self.calls.lock().push(
            GenerationRequest::new(prompt, system_prompt).with_profile(profile.map(str::to_string)),
        );
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(GenerationError::Transport {
                    message: "script exhausted".into(),
                })
            })
    }
}

/// Host that records notifications and knows a fixed set of characters.
#[derive(Debug, Default)]
pub struct RecordingHost {
    characters: Vec<CharacterInfo>,
    notifications: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_character(mut self, id: &str, name: &str) -> Self {
        self.characters.push(CharacterInfo::new(id, name));
        self
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().clone()
    }
}

impl HostContext for RecordingHost {
    fn notify(&self, message: &str) {
        self.notifications.lock().push(message.to_string());
    }

    fn character_info(&self, character_id: &str) -> Option<CharacterInfo> {
        self.characters
            .iter()
            .find(|c| c.id == character_id)
            .cloned()
    }
}
