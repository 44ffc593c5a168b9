//! Top-level tracker wiring the bot and user managers to one store.
//!
//! The host calls [`OutfitTracker::on_chat_changed`] whenever the active
//! conversation or character changes. The tracker derives the instance id
//! from the conversation's first substantive message and points both
//! managers at it. Character display names are looked up through the
//! host, so data stays keyed by character id across renames.

use std::sync::Arc;

use crate::config::OutfitConfig;
use crate::llms::{AutoOutfitReport, AutoOutfitSystem, HostContext};
use crate::manager::{self, OutfitManager};
use crate::scanner::DirectiveScanner;
use crate::state::{StatePersistence, StoreHandle};
use crate::types::chat::ChatMessage;
use crate::utilities::errors::Result;
use crate::utilities::instance_id::InstanceIdentifier;

/// Bot and user outfit managers sharing one store.
#[derive(Debug, Clone)]
pub struct OutfitTracker {
    config: OutfitConfig,
    store: StoreHandle,
    host: Arc<dyn HostContext>,
    identifier: InstanceIdentifier,
    scanner: DirectiveScanner,
    bot: OutfitManager,
    user: OutfitManager,
    instance_id: Option<String>,
}

impl OutfitTracker {
    /// Open the store through `persistence` and build both managers.
    pub fn new(
        persistence: Arc<dyn StatePersistence>,
        host: Arc<dyn HostContext>,
        config: OutfitConfig,
    ) -> Result<Self> {
        let store = StoreHandle::open(persistence)?;
        Ok(Self {
            host,
            identifier: InstanceIdentifier::new(config.instance_id_length),
            scanner: DirectiveScanner::new(config.directive_prefix.clone()),
            bot: OutfitManager::bot(store.clone()),
            user: OutfitManager::user(store.clone()),
            instance_id: None,
            store,
            config,
        })
    }

    pub fn config(&self) -> &OutfitConfig {
        &self.config
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn host(&self) -> &Arc<dyn HostContext> {
        &self.host
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub fn bot(&self) -> &OutfitManager {
        &self.bot
    }

    pub fn bot_mut(&mut self) -> &mut OutfitManager {
        &mut self.bot
    }

    pub fn user(&self) -> &OutfitManager {
        &self.user
    }

    pub fn user_mut(&mut self) -> &mut OutfitManager {
        &mut self.user
    }

    /// Recompute the instance id for a conversation and rebind both
    /// managers. A chat without any substantive message shares the
    /// identifier of empty text. The display name of `character_id` comes
    /// from the host; an id the host does not know is shown as itself.
    /// Returns the instance id.
    pub fn on_chat_changed(
        &mut self,
        character_id: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String> {
        let instance_id = self
            .identifier
            .identify_chat(messages)
            .unwrap_or_else(|| self.identifier.identify(""));

        if self.instance_id.as_deref() != Some(instance_id.as_str()) {
            log::info!(
                "OutfitTracker: instance changed {:?} -> {}",
                self.instance_id,
                instance_id
            );
        }

        match character_id {
            Some(id) => {
                let name = match self.host.character_info(id) {
                    Some(info) => info.name,
                    None => {
                        log::warn!("OutfitTracker: host has no character '{}'", id);
                        id.to_string()
                    }
                };
                self.bot.set_character(id, name);
            }
            None => self.bot.clear_character(),
        }
        self.bot.set_instance_id(instance_id.clone())?;
        self.user.set_instance_id(instance_id.clone())?;
        self.instance_id = Some(instance_id.clone());
        Ok(instance_id)
    }

    /// Set the name the user manager displays.
    pub fn set_user_name(&mut self, name: impl Into<String>) {
        self.user.set_character(crate::slots::USER_OWNER_ID, name);
    }

    /// Scan `text` for directives and apply them to the bot's outfit.
    pub fn apply_directives(&self, text: &str) -> Result<Vec<String>> {
        self.bot.apply_directives(&self.scanner.scan(text))
    }

    /// Resolve `{{char_<slot>}}` and `{{user_<slot>}}` against the live
    /// outfits. Unbound managers resolve to `"None"`.
    pub fn resolve_macros(&self, text: &str) -> String {
        let bot = self.bot.current_outfit().ok();
        let user = self.user.current_outfit().ok();
        manager::resolve_macros(text, bot.as_ref(), user.as_ref())
    }

    /// Clear every outfit, preset, and setting.
    pub fn wipe_all(&self) -> Result<()> {
        self.store.wipe_all()
    }

    /// Run the auto-outfit pass for the bot. `Ok(None)` when the pass is
    /// disabled or no character is selected.
    pub async fn run_auto_outfit(
        &self,
        system: &AutoOutfitSystem,
        messages: &[ChatMessage],
    ) -> Result<Option<AutoOutfitReport>> {
        if !self.config.auto_update || self.bot.owner_id().is_none() {
            return Ok(None);
        }
        system.process(&self.bot, messages).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::Slot;
    use crate::state::InMemoryPersistence;
    use crate::testing::{RecordingHost, ScriptedModel};

    const MIRA: &str = "char-mira";

    fn host() -> Arc<RecordingHost> {
        Arc::new(
            RecordingHost::new()
                .with_character(MIRA, "Mira")
                .with_character("char-bard", "Bard"),
        )
    }

    fn tracker() -> (Arc<InMemoryPersistence>, OutfitTracker) {
        let persistence = Arc::new(InMemoryPersistence::new());
        let tracker =
            OutfitTracker::new(persistence.clone(), host(), OutfitConfig::default()).unwrap();
        (persistence, tracker)
    }

    #[test]
    fn test_instance_follows_first_message() {
        let (_, mut tracker) = tracker();
        let chat = vec![
            ChatMessage::system("[start]"),
            ChatMessage::character("Mira", "Welcome to the inn."),
        ];
        let first = tracker.on_chat_changed(Some(MIRA), &chat).unwrap();

        let mut longer = chat.clone();
        longer.push(ChatMessage::user("Tom", "Thanks."));
        assert_eq!(tracker.on_chat_changed(Some(MIRA), &longer).unwrap(), first);

        let other = vec![ChatMessage::character("Mira", "Halt! Who goes there?")];
        assert_ne!(tracker.on_chat_changed(Some(MIRA), &other).unwrap(), first);
    }

    #[test]
    fn test_instance_ignores_outfit_phrase_values() {
        let (_, mut tracker) = tracker();
        let a = vec![ChatMessage::character("Mira", "Mira is wearing a red dress. Hello!")];
        let b = vec![ChatMessage::character("Mira", "Mira is wearing a blue gown. Hello!")];
        assert_eq!(
            tracker.on_chat_changed(Some(MIRA), &a).unwrap(),
            tracker.on_chat_changed(Some(MIRA), &b).unwrap()
        );
    }

    #[test]
    fn test_empty_chat_uses_empty_text_identifier() {
        let (_, mut tracker) = tracker();
        let id = tracker.on_chat_changed(None, &[]).unwrap();
        assert_eq!(id, InstanceIdentifier::default().identify(""));
        assert_eq!(tracker.instance_id(), Some(id.as_str()));
    }

    #[test]
    fn test_chat_change_creates_both_instances() {
        let (persistence, mut tracker) = tracker();
        let chat = vec![ChatMessage::character("Mira", "Good morning.")];
        let id = tracker.on_chat_changed(Some(MIRA), &chat).unwrap();

        let saved = persistence.snapshot().unwrap();
        assert_eq!(saved["botInstances"]["char-mira"][&id]["topwear"], "None");
        assert_eq!(saved["userInstances"][&id]["topwear"], "None");
    }

    #[test]
    fn test_switching_character_keeps_outfits_apart() {
        let (_, mut tracker) = tracker();
        let chat = vec![ChatMessage::character("Mira", "Good morning.")];
        tracker.on_chat_changed(Some(MIRA), &chat).unwrap();
        tracker.bot().set_slot(Slot::Topwear, "apron").unwrap();

        tracker.on_chat_changed(Some("char-bard"), &chat).unwrap();
        assert_eq!(tracker.bot().display_name(), "Bard");
        assert_eq!(tracker.bot().slot_value(Slot::Topwear).unwrap(), "None");

        tracker.on_chat_changed(Some(MIRA), &chat).unwrap();
        assert_eq!(tracker.bot().slot_value(Slot::Topwear).unwrap(), "apron");
    }

    #[test]
    fn test_directives_and_macros() {
        let (_, mut tracker) = tracker();
        tracker
            .on_chat_changed(Some(MIRA), &[ChatMessage::character("Mira", "Hi.")])
            .unwrap();
        tracker.set_user_name("Tom");
        tracker.user().set_slot(Slot::Headwear, "hood").unwrap();

        let messages = tracker
            .apply_directives("outfit-system_wear_topwear(\"red jacket\")\ngarbage line\noutfit-system_remove_headwear()")
            .unwrap();
        assert_eq!(messages[0], "Mira put on red jacket.");
        assert_eq!(messages.len(), 2);

        assert_eq!(
            tracker.resolve_macros("{{char_topwear}} / {{user_headwear}} / {{char_footwear}}"),
            "red jacket / hood / None"
        );
    }

    #[test]
    fn test_wipe_all_resets_outfits() {
        let (persistence, mut tracker) = tracker();
        tracker
            .on_chat_changed(Some(MIRA), &[ChatMessage::character("Mira", "Hi.")])
            .unwrap();
        tracker.bot().set_slot(Slot::Topwear, "apron").unwrap();
        tracker.bot().save_preset("work").unwrap();

        tracker.wipe_all().unwrap();
        assert_eq!(tracker.bot().slot_value(Slot::Topwear).unwrap(), "None");
        assert!(tracker.bot().list_preset_names().unwrap().is_empty());
        assert_eq!(persistence.snapshot().unwrap()["botInstances"], serde_json::json!({}));
    }

    #[test]
    fn test_reopen_sees_persisted_outfit() {
        let (persistence, mut tracker) = tracker();
        let chat = vec![ChatMessage::character("Mira", "Hi.")];
        tracker.on_chat_changed(Some(MIRA), &chat).unwrap();
        tracker.bot().set_slot(Slot::Footwear, "boots").unwrap();

        let mut reopened =
            OutfitTracker::new(persistence, host(), OutfitConfig::default()).unwrap();
        reopened.on_chat_changed(Some(MIRA), &chat).unwrap();
        assert_eq!(reopened.bot().slot_value(Slot::Footwear).unwrap(), "boots");
    }

    #[tokio::test]
    async fn test_auto_outfit_respects_config() {
        let (_, mut tracker) = tracker();
        let chat = vec![ChatMessage::character("Mira", "She takes off her hat.")];
        tracker.on_chat_changed(Some(MIRA), &chat).unwrap();
        tracker.bot().set_slot(Slot::Headwear, "hat").unwrap();

        let model = Arc::new(ScriptedModel::new(vec![Ok("outfit-system_remove_headwear()".into())]));
        let host = host();
        let system = AutoOutfitSystem::new(model.clone(), host.clone(), OutfitConfig::default());

        assert!(tracker.run_auto_outfit(&system, &chat).await.unwrap().is_none());
        assert!(model.calls().is_empty());

        let persistence = Arc::new(InMemoryPersistence::new());
        let mut enabled = OutfitTracker::new(
            persistence,
            host.clone(),
            OutfitConfig::default().with_auto_update(true),
        )
        .unwrap();
        enabled.on_chat_changed(Some(MIRA), &chat).unwrap();
        enabled.bot().set_slot(Slot::Headwear, "hat").unwrap();

        let report = enabled.run_auto_outfit(&system, &chat).await.unwrap().unwrap();
        assert_eq!(report.messages, vec!["Mira removed hat."]);
        assert_eq!(host.notifications(), vec!["Mira removed hat."]);
    }

    #[test]
    fn test_renamed_character_keeps_outfit() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let chat = vec![ChatMessage::character("Mira", "Hi.")];
        let mut tracker =
            OutfitTracker::new(persistence.clone(), host(), OutfitConfig::default()).unwrap();
        tracker.on_chat_changed(Some(MIRA), &chat).unwrap();
        tracker.bot().set_slot(Slot::Topwear, "apron").unwrap();

        let renamed = Arc::new(RecordingHost::new().with_character(MIRA, "Mirabel"));
        let mut reopened =
            OutfitTracker::new(persistence.clone(), renamed, OutfitConfig::default()).unwrap();
        reopened.on_chat_changed(Some(MIRA), &chat).unwrap();

        assert_eq!(reopened.bot().display_name(), "Mirabel");
        assert_eq!(reopened.bot().slot_value(Slot::Topwear).unwrap(), "apron");
        let saved = persistence.snapshot().unwrap();
        assert_eq!(saved["botInstances"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_character_uses_id_as_name() {
        let (_, mut tracker) = tracker();
        tracker
            .on_chat_changed(Some("char-ghost"), &[ChatMessage::character("Ghost", "Boo.")])
            .unwrap();
        assert_eq!(tracker.bot().display_name(), "char-ghost");
        assert_eq!(tracker.bot().owner_id(), Some("char-ghost"));
        let messages = tracker
            .apply_directives("outfit-system_wear_headwear(\"sheet\")")
            .unwrap();
        assert_eq!(messages, vec!["char-ghost put on sheet."]);
    }
}
