//! Automatic outfit updates driven by the language model.
//!
//! After a character message, the model is shown the recent conversation
//! and the current outfit, and answers with outfit directives. The
//! directives are applied one at a time, in order, through the bot manager.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::retry::{generate_with_retry, RetryPolicy};
use super::{GenerationRequest, HostContext, LanguageModel};
use crate::config::OutfitConfig;
use crate::manager::OutfitManager;
use crate::scanner::DirectiveScanner;
use crate::slots::Slot;
use crate::state::OutfitInstance;
use crate::types::chat::ChatMessage;
use crate::utilities::errors::Result;

/// Built-in system prompt for the outfit pass.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You track what a roleplay character is wearing. \
Read the latest messages and decide whether the character put on, removed, or changed \
any clothing or accessory. Answer only with outfit directives, one per line, using \
exactly the slot names you are given. Do not explain your answer.";

/// Reply the model is told to give when nothing changed.
const NO_CHANGE_REPLY: &str = "[none]";

/// Build the user prompt for one outfit pass.
pub fn build_outfit_prompt(
    character_name: &str,
    recent_messages: &[&ChatMessage],
    current_outfit: &OutfitInstance,
    prefix: &str,
) -> String {
    let mut prompt = format!("Character: {}\n\nCurrent outfit:\n", character_name);
    for (slot, value) in current_outfit.iter() {
        prompt.push_str(&format!("- {}: {}\n", slot.as_str(), value));
    }

    prompt.push_str("\nRecent messages:\n");
    for message in recent_messages {
        prompt.push_str(&format!("{}: {}\n", message.name, message.text.trim()));
    }

    prompt.push_str("\nDirective forms:\n");
    prompt.push_str(&format!("{}_wear_<slot>(\"item\")\n", prefix));
    prompt.push_str(&format!("{}_remove_<slot>()\n", prefix));
    prompt.push_str(&format!("{}_change_<slot>(\"new item\")\n", prefix));

    let slot_names: Vec<&str> = Slot::ALL.iter().map(Slot::as_str).collect();
    prompt.push_str(&format!("\nValid slots: {}\n", slot_names.join(", ")));
    prompt.push_str(&format!(
        "\nIf nothing about the outfit changed, reply with {}.",
        NO_CHANGE_REPLY
    ));
    prompt
}

/// What one outfit pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoOutfitReport {
    /// Raw directives extracted from the response.
    pub directives: Vec<String>,
    /// Narration for each applied directive, in order.
    pub messages: Vec<String>,
}

/// Runs the generate → scan → apply pipeline.
#[derive(Debug, Clone)]
pub struct AutoOutfitSystem {
    model: Arc<dyn LanguageModel>,
    host: Arc<dyn HostContext>,
    config: OutfitConfig,
    scanner: DirectiveScanner,
}

impl AutoOutfitSystem {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        host: Arc<dyn HostContext>,
        config: OutfitConfig,
    ) -> Self {
        let scanner = DirectiveScanner::new(config.directive_prefix.clone());
        Self {
            model,
            host,
            config,
            scanner,
        }
    }

    pub fn config(&self) -> &OutfitConfig {
        &self.config
    }

    /// Ask the model for outfit changes and apply them to `manager`.
    ///
    /// Each narration string is also sent to the host. A generation failure
    /// is reported to the host and returned.
    pub async fn process(
        &self,
        manager: &OutfitManager,
        messages: &[ChatMessage],
    ) -> Result<AutoOutfitReport> {
        let current = manager.current_outfit()?;
        let recent = recent_messages(messages, self.config.context_messages);
        let prompt = build_outfit_prompt(
            manager.display_name(),
            &recent,
            &current,
            self.scanner.prefix(),
        );
        let system_prompt = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let request = GenerationRequest::new(prompt, system_prompt)
            .with_profile(self.config.connection_profile.clone());

        let response = match generate_with_retry(
            self.model.as_ref(),
            &request,
            RetryPolicy::from_config(&self.config),
        )
        .await
        {
            Ok(response) => response,
            Err(e) => {
                log::warn!("AutoOutfitSystem: generation failed: {}", e);
                self.host.notify(&format!("Outfit update failed: {}", e));
                return Err(e.into());
            }
        };

        let directives = self.scanner.scan(&response);
        let applied = manager.apply_directives(&directives)?;
        for message in &applied {
            self.host.notify(message);
        }
        log::info!(
            "AutoOutfitSystem: {} directive(s) found, {} applied",
            directives.len(),
            applied.len()
        );

        Ok(AutoOutfitReport {
            directives: directives.into_iter().map(|d| d.raw).collect(),
            messages: applied,
        })
    }
}

/// The last `limit` substantive messages, oldest first.
fn recent_messages(messages: &[ChatMessage], limit: usize) -> Vec<&ChatMessage> {
    let mut recent: Vec<&ChatMessage> = messages
        .iter()
        .rev()
        .filter(|m| m.is_substantive())
        .take(limit)
        .collect();
    recent.reverse();
    recent
}
