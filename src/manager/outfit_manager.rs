//! Per-owner outfit operations over the shared store.
//!
//! An [`OutfitManager`] is bound to one owner kind. Bot managers additionally
//! need a character; both need an active instance id before any slot or
//! preset operation. All mutations go through [`StoreHandle::mutate`], so
//! each one is reconciled and persisted as a unit.

use serde::{Deserialize, Serialize};

use super::narration::{Narrator, SlotChange};
use crate::scanner::Directive;
use crate::slots::{OwnerKind, Slot, USER_OWNER_ID};
use crate::state::{OutfitInstance, Owner, StoreHandle};
use crate::utilities::errors::{OutfitError, Result};

/// Preset name that always means "the live outfit".
pub const RESERVED_PRESET_NAME: &str = "default";

/// Display name used for the user when no persona name is set.
pub const DEFAULT_USER_NAME: &str = "User";

/// One row of the rendered slot list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotValue {
    pub name: String,
    pub label: String,
    pub value: String,
}

/// Outcome of loading a preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetLoad {
    pub message: String,
    /// Slots whose value differed and were overwritten.
    pub changed_slots: Vec<Slot>,
}

/// Outfit operations for one owner on its active instance.
#[derive(Debug, Clone)]
pub struct OutfitManager {
    kind: OwnerKind,
    owner_id: Option<String>,
    display_name: String,
    instance_id: Option<String>,
    store: StoreHandle,
}

impl OutfitManager {
    /// A bot manager with no character selected.
    pub fn bot(store: StoreHandle) -> Self {
        Self {
            kind: OwnerKind::Bot,
            owner_id: None,
            display_name: String::new(),
            instance_id: None,
            store,
        }
    }

    /// The user's manager.
    pub fn user(store: StoreHandle) -> Self {
        Self {
            kind: OwnerKind::User,
            owner_id: Some(USER_OWNER_ID.to_string()),
            display_name: DEFAULT_USER_NAME.to_string(),
            instance_id: None,
            store,
        }
    }

    pub fn kind(&self) -> OwnerKind {
        self.kind
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Select the character this bot manager acts for. Data is keyed by
    /// `character_id`, so renaming a character never moves its outfits.
    /// On a user manager only the display name changes.
    pub fn set_character(&mut self, character_id: impl Into<String>, name: impl Into<String>) {
        let name = name.into();
        if self.kind == OwnerKind::Bot {
            let character_id = character_id.into();
            log::debug!("OutfitManager: character set to '{}' ({})", name, character_id);
            self.owner_id = Some(character_id);
        }
        self.display_name = name;
    }

    /// Drop the selected character (bot managers only).
    pub fn clear_character(&mut self) {
        if self.kind == OwnerKind::Bot {
            self.owner_id = None;
            self.display_name.clear();
        }
    }

    /// Point the manager at an instance, creating it with every slot at
    /// `"None"` if it does not exist yet.
    pub fn set_instance_id(&mut self, instance_id: impl Into<String>) -> Result<()> {
        let instance_id = instance_id.into();
        if self.instance_id.as_deref() != Some(instance_id.as_str()) {
            log::debug!(
                "OutfitManager({}): instance set to {}",
                self.kind.as_str(),
                instance_id
            );
            self.instance_id = Some(instance_id);
        }

        if let Ok((owner, instance_id)) = self.scope() {
            let exists = self
                .store
                .read(|store| store.instance(&owner, &instance_id).is_some());
            if !exists {
                self.store.mutate(|store| {
                    store.instance_mut(&owner, &instance_id);
                })?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Slots
    // -----------------------------------------------------------------------

    /// Current value of one slot.
    pub fn slot_value(&self, slot: Slot) -> Result<String> {
        Ok(self.current_outfit()?.get(slot).to_string())
    }

    /// Snapshot of the live instance; an uncreated instance reads as bare.
    pub fn current_outfit(&self) -> Result<OutfitInstance> {
        let (owner, instance_id) = self.scope()?;
        Ok(self.store.read(|store| {
            store
                .instance(&owner, &instance_id)
                .cloned()
                .unwrap_or_default()
        }))
    }

    /// Set a slot and return the narration for the transition.
    pub fn set_slot(&self, slot: Slot, value: &str) -> Result<String> {
        let (owner, instance_id) = self.scope()?;
        let change = self.store.mutate(|store| {
            let instance = store.instance_mut(&owner, &instance_id);
            let previous = instance.set(slot, value);
            SlotChange {
                slot,
                previous,
                current: instance.get(slot).to_string(),
            }
        })?;

        self.store
            .mirror_variable(&self.slot_key(slot)?, &change.current);
        let message = change.narrate(&self.narrator());
        log::debug!("OutfitManager({}): {}", self.kind.as_str(), message);
        Ok(message)
    }

    /// [`set_slot`](Self::set_slot) addressed by wire name.
    pub fn set_slot_by_name(&self, slot_name: &str, value: &str) -> Result<String> {
        let slot: Slot = slot_name.parse()?;
        self.set_slot(slot, value)
    }

    /// Apply one directive. Directives naming an unknown slot are skipped.
    pub fn apply_directive(&self, directive: &Directive) -> Result<Option<String>> {
        let Some(slot) = directive.slot() else {
            log::warn!(
                "OutfitManager: skipping directive with unknown slot: {}",
                directive.raw
            );
            return Ok(None);
        };
        log::debug!("OutfitManager: applying {}", directive.raw);
        self.set_slot(slot, &directive.target_value()).map(Some)
    }

    /// Apply directives one at a time, in order. A later directive on the
    /// same slot wins.
    pub fn apply_directives(&self, directives: &[Directive]) -> Result<Vec<String>> {
        let mut messages = Vec::with_capacity(directives.len());
        for directive in directives {
            if let Some(message) = self.apply_directive(directive)? {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    // -----------------------------------------------------------------------
    // Presets
    // -----------------------------------------------------------------------

    /// Snapshot the live outfit under `name`, overwriting any preset of the
    /// same name. `"default"` and blank names are rejected.
    pub fn save_preset(&self, name: &str) -> Result<String> {
        let name = validate_preset_name(name)?;
        let (owner, instance_id) = self.scope()?;
        self.store.mutate(|store| {
            let snapshot = store.instance_mut(&owner, &instance_id).clone();
            store.set_preset(&owner, &instance_id, name, snapshot);
        })?;
        log::info!(
            "OutfitManager({}): saved preset '{}'",
            self.kind.as_str(),
            name
        );
        Ok(format!(
            "Saved \"{}\" as {} outfit preset.",
            name,
            self.narrator().possessive_inline
        ))
    }

    /// Overwrite the slots that differ from the preset. `Ok(None)` when no
    /// such preset exists. `"default"` loads the default outfit.
    pub fn load_preset(&self, name: &str) -> Result<Option<PresetLoad>> {
        let name = name.trim();
        if name.eq_ignore_ascii_case(RESERVED_PRESET_NAME) {
            return self.load_default_outfit().map(Some);
        }
        let (owner, instance_id) = self.scope()?;
        if !self.preset_exists(&owner, &instance_id, name) {
            return Ok(None);
        }

        let changes = self.store.mutate(|store| {
            let preset = store.preset(&owner, &instance_id, name).cloned()?;
            let instance = store.instance_mut(&owner, &instance_id);
            let changes: Vec<(Slot, String)> = instance
                .diff(&preset)
                .into_iter()
                .map(|slot| {
                    let value = preset.get(slot).to_string();
                    instance.set(slot, &value);
                    (slot, value)
                })
                .collect();
            Some(changes)
        })?;
        let Some(changes) = changes else {
            return Ok(None);
        };

        for (slot, value) in &changes {
            self.store.mirror_variable(&self.slot_key(*slot)?, value);
        }

        let narrator = self.narrator();
        let message = if changes.is_empty() {
            format!(
                "{} outfit already matches \"{}\".",
                narrator.possessive, name
            )
        } else {
            format!(
                "{} changed into the \"{}\" outfit ({} {} changed).",
                narrator.subject,
                name,
                changes.len(),
                if changes.len() == 1 { "item" } else { "items" }
            )
        };
        Ok(Some(PresetLoad {
            message,
            changed_slots: changes.into_iter().map(|(slot, _)| slot).collect(),
        }))
    }

    /// Delete a preset, clearing the default flag if it pointed at it.
    /// `Ok(None)` when no such preset exists.
    pub fn delete_preset(&self, name: &str) -> Result<Option<String>> {
        let name = name.trim();
        let (owner, instance_id) = self.scope()?;
        if !self.preset_exists(&owner, &instance_id, name) {
            return Ok(None);
        }

        let deleted = self.store.mutate(|store| {
            let deleted = store.delete_preset(&owner, &instance_id, name);
            if store.default_preset(&owner, &instance_id) == Some(name) {
                store.set_default_preset(&owner, &instance_id, None);
            }
            deleted
        })?;
        if !deleted {
            return Ok(None);
        }
        log::info!(
            "OutfitManager({}): deleted preset '{}'",
            self.kind.as_str(),
            name
        );
        Ok(Some(format!(
            "Deleted {} \"{}\" outfit preset.",
            self.narrator().possessive_inline,
            name
        )))
    }

    /// Preset names for the active instance, sorted.
    pub fn list_preset_names(&self) -> Result<Vec<String>> {
        let (owner, instance_id) = self.scope()?;
        Ok(self
            .store
            .read(|store| store.preset_names(&owner, &instance_id)))
    }

    /// Flag an existing preset as the default. `"default"` clears the flag
    /// so the live outfit is the default again. `Ok(None)` when no such
    /// preset exists.
    pub fn set_default_preset(&self, name: &str) -> Result<Option<String>> {
        let name = name.trim();
        let (owner, instance_id) = self.scope()?;
        let narrator = self.narrator();

        if name.eq_ignore_ascii_case(RESERVED_PRESET_NAME) {
            self.store.mutate(|store| {
                store.set_default_preset(&owner, &instance_id, None);
            })?;
            return Ok(Some(format!(
                "{} current outfit is now the default.",
                narrator.possessive
            )));
        }

        if !self.preset_exists(&owner, &instance_id, name) {
            return Ok(None);
        }
        self.store.mutate(|store| {
            store.set_default_preset(&owner, &instance_id, Some(name.to_string()));
        })?;
        Ok(Some(format!(
            "Set \"{}\" as {} default outfit.",
            name, narrator.possessive_inline
        )))
    }

    /// Name of the flagged default preset, if any.
    pub fn default_preset_name(&self) -> Result<Option<String>> {
        let (owner, instance_id) = self.scope()?;
        Ok(self.store.read(|store| {
            store
                .default_preset(&owner, &instance_id)
                .map(str::to_string)
        }))
    }

    /// Load the flagged default preset. Without one, the live outfit is the
    /// default and nothing changes.
    pub fn load_default_outfit(&self) -> Result<PresetLoad> {
        if let Some(name) = self.default_preset_name()? {
            if let Some(load) = self.load_preset(&name)? {
                return Ok(load);
            }
        }
        Ok(PresetLoad {
            message: format!(
                "No default preset set; keeping {} current outfit.",
                self.narrator().possessive_inline
            ),
            changed_slots: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Every slot with its label and value, clothing first.
    pub fn slot_list(&self) -> Result<Vec<SlotValue>> {
        Ok(self
            .current_outfit()?
            .iter()
            .map(|(slot, value)| SlotValue {
                name: slot.as_str().to_string(),
                label: slot.label().to_string(),
                value: value.to_string(),
            })
            .collect())
    }

    /// Markdown block of the worn slots; `None` when nothing is worn.
    pub fn outfit_summary(&self) -> Result<Option<String>> {
        let outfit = self.current_outfit()?;
        if outfit.is_bare() {
            return Ok(None);
        }
        let mut summary = format!("**{} Current Outfit**", self.narrator().possessive);
        for (slot, value) in outfit.worn() {
            summary.push_str(&format!("\n**{}:** {}", slot.label(), value));
        }
        Ok(Some(summary))
    }

    /// Per-slot variable key, unique per owner id.
    pub fn slot_key(&self, slot: Slot) -> Result<String> {
        let owner_id = self.owner_id.as_deref().ok_or(OutfitError::NoCharacter)?;
        Ok(format!(
            "outfit.{}.{}.{}",
            self.kind.as_str(),
            hex::encode(owner_id.as_bytes()),
            slot.as_str()
        ))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn owner(&self) -> Result<Owner> {
        match (self.kind, self.owner_id.as_deref()) {
            (OwnerKind::User, _) => Ok(Owner::user()),
            (OwnerKind::Bot, Some(id)) => Ok(Owner::bot(id)),
            (OwnerKind::Bot, None) => Err(OutfitError::NoCharacter),
        }
    }

    fn scope(&self) -> Result<(Owner, String)> {
        let owner = self.owner()?;
        let instance_id = self.instance_id.clone().ok_or(OutfitError::NoInstance)?;
        Ok((owner, instance_id))
    }

    fn preset_exists(&self, owner: &Owner, instance_id: &str, name: &str) -> bool {
        self.store
            .read(|store| store.preset(owner, instance_id, name).is_some())
    }

    fn narrator(&self) -> Narrator {
        Narrator::for_owner(self.kind, &self.display_name)
    }
}

fn validate_preset_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OutfitError::EmptyPresetName);
    }
    if name.eq_ignore_ascii_case(RESERVED_PRESET_NAME) {
        return Err(OutfitError::ReservedPresetName {
            name: name.to_string(),
        });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::DirectiveScanner;
    use crate::state::InMemoryPersistence;
    use std::sync::Arc;

    fn store() -> (Arc<InMemoryPersistence>, StoreHandle) {
        let persistence = Arc::new(InMemoryPersistence::new());
        let handle = StoreHandle::new(persistence.clone());
        (persistence, handle)
    }

    fn mira(store: StoreHandle) -> OutfitManager {
        let mut manager = OutfitManager::bot(store);
        manager.set_character("char-mira", "Mira");
        manager.set_instance_id("inst1").unwrap();
        manager
    }

    #[test]
    fn test_set_instance_creates_bare_instance() {
        let (persistence, handle) = store();
        let manager = mira(handle);
        let saved = persistence.snapshot().unwrap();
        assert_eq!(saved["botInstances"]["char-mira"]["inst1"]["headwear"], "None");
        assert!(manager.current_outfit().unwrap().is_bare());
    }

    #[test]
    fn test_set_slot_narrates_transitions() {
        let (_, handle) = store();
        let manager = mira(handle);
        assert_eq!(manager.set_slot(Slot::Headwear, "hat").unwrap(), "Mira put on hat.");
        assert_eq!(
            manager.set_slot(Slot::Headwear, "cap").unwrap(),
            "Mira changed from hat to cap."
        );
        assert_eq!(manager.set_slot(Slot::Headwear, "None").unwrap(), "Mira removed cap.");
        assert_eq!(manager.slot_value(Slot::Headwear).unwrap(), "None");
    }

    #[test]
    fn test_lowercase_none_removes_item() {
        let (_, handle) = store();
        let manager = mira(handle);
        let scanner = DirectiveScanner::default();
        manager.set_slot(Slot::Topwear, "hat").unwrap();
        let messages = manager
            .apply_directives(&scanner.scan("outfit-system_change_topwear(\"none\")"))
            .unwrap();
        assert_eq!(messages, vec!["Mira removed hat."]);
        assert_eq!(manager.slot_value(Slot::Topwear).unwrap(), "None");
    }

    #[test]
    fn test_user_manager_speaks_in_second_person() {
        let (_, handle) = store();
        let mut manager = OutfitManager::user(handle);
        manager.set_instance_id("inst1").unwrap();
        assert_eq!(
            manager.set_slot_by_name("footwear", "sandals").unwrap(),
            "You put on sandals."
        );
    }

    #[test]
    fn test_operations_require_scope() {
        let (_, handle) = store();
        let mut manager = OutfitManager::bot(handle);
        assert!(matches!(
            manager.set_slot(Slot::Topwear, "shirt"),
            Err(OutfitError::NoCharacter)
        ));
        manager.set_character("c1", "Ann");
        assert!(matches!(
            manager.set_slot(Slot::Topwear, "shirt"),
            Err(OutfitError::NoInstance)
        ));
    }

    #[test]
    fn test_unknown_slot_name_is_error() {
        let (_, handle) = store();
        let manager = mira(handle);
        assert!(matches!(
            manager.set_slot_by_name("cape", "red"),
            Err(OutfitError::InvalidSlot { .. })
        ));
    }

    #[test]
    fn test_reserved_preset_name_rejected() {
        let (_, handle) = store();
        let manager = mira(handle);
        manager.set_slot(Slot::Topwear, "tunic").unwrap();
        manager.save_preset("travel").unwrap();
        manager.set_default_preset("travel").unwrap();

        assert!(matches!(
            manager.save_preset("Default"),
            Err(OutfitError::ReservedPresetName { .. })
        ));
        assert!(matches!(manager.save_preset("  "), Err(OutfitError::EmptyPresetName)));
        assert_eq!(manager.list_preset_names().unwrap(), vec!["travel"]);
        assert_eq!(manager.default_preset_name().unwrap().as_deref(), Some("travel"));
    }

    #[test]
    fn test_load_preset_reports_changed_slots() {
        let (_, handle) = store();
        let manager = mira(handle);
        manager.set_slot(Slot::Topwear, "tunic").unwrap();
        manager.set_slot(Slot::Footwear, "boots").unwrap();
        manager.save_preset("travel").unwrap();

        manager.set_slot(Slot::Topwear, "gown").unwrap();
        manager.set_slot(Slot::Headwear, "tiara").unwrap();

        let load = manager.load_preset("travel").unwrap().unwrap();
        assert_eq!(load.changed_slots, vec![Slot::Headwear, Slot::Topwear]);
        assert_eq!(load.message, "Mira changed into the \"travel\" outfit (2 items changed).");
        assert_eq!(manager.slot_value(Slot::Topwear).unwrap(), "tunic");
        assert_eq!(manager.slot_value(Slot::Headwear).unwrap(), "None");

        let again = manager.load_preset("travel").unwrap().unwrap();
        assert!(again.changed_slots.is_empty());
    }

    #[test]
    fn test_missing_preset_yields_none() {
        let (_, handle) = store();
        let manager = mira(handle);
        assert!(manager.load_preset("nope").unwrap().is_none());
        assert!(manager.delete_preset("nope").unwrap().is_none());
        assert!(manager.set_default_preset("nope").unwrap().is_none());
    }

    #[test]
    fn test_delete_default_preset_clears_flag() {
        let (persistence, handle) = store();
        let manager = mira(handle);
        manager.save_preset("travel").unwrap();
        manager.set_default_preset("travel").unwrap();
        assert!(manager.delete_preset("travel").unwrap().is_some());
        assert!(manager.default_preset_name().unwrap().is_none());
        assert!(manager.list_preset_names().unwrap().is_empty());

        // Still gone after another reconcile against storage.
        manager.set_slot(Slot::Headwear, "hat").unwrap();
        let saved = persistence.snapshot().unwrap();
        assert!(saved["presets"]["bot"]["char-mira_inst1"].get("travel").is_none());
    }

    #[test]
    fn test_default_outfit_round_trip() {
        let (_, handle) = store();
        let manager = mira(handle);
        let fallback = manager.load_default_outfit().unwrap();
        assert!(fallback.changed_slots.is_empty());

        manager.set_slot(Slot::Topwear, "robe").unwrap();
        manager.save_preset("home").unwrap();
        manager.set_default_preset("home").unwrap();
        manager.set_slot(Slot::Topwear, "armor").unwrap();

        let load = manager.load_default_outfit().unwrap();
        assert_eq!(load.changed_slots, vec![Slot::Topwear]);
        assert_eq!(manager.slot_value(Slot::Topwear).unwrap(), "robe");

        manager.set_default_preset("default").unwrap();
        assert!(manager.default_preset_name().unwrap().is_none());
    }

    #[test]
    fn test_presets_are_scoped_per_instance() {
        let (_, handle) = store();
        let mut manager = mira(handle);
        manager.save_preset("travel").unwrap();
        manager.set_instance_id("inst2").unwrap();
        assert!(manager.list_preset_names().unwrap().is_empty());
    }

    #[test]
    fn test_slot_key_is_unique_per_owner() {
        let (persistence, handle) = store();
        let a = mira(handle.clone());
        let mut b = OutfitManager::bot(handle);
        b.set_character("char-mira2", "Mira");
        b.set_instance_id("inst1").unwrap();

        assert_ne!(a.slot_key(Slot::Topwear).unwrap(), b.slot_key(Slot::Topwear).unwrap());
        assert_eq!(
            a.slot_key(Slot::Topwear).unwrap(),
            format!("outfit.bot.{}.topwear", hex::encode("char-mira"))
        );

        a.set_slot(Slot::Topwear, "coat").unwrap();
        assert_eq!(
            persistence.variable(&a.slot_key(Slot::Topwear).unwrap()).as_deref(),
            Some("coat")
        );
        assert_eq!(b.slot_value(Slot::Topwear).unwrap(), "None");
    }

    #[test]
    fn test_summary_and_slot_list() {
        let (_, handle) = store();
        let manager = mira(handle);
        assert!(manager.outfit_summary().unwrap().is_none());

        manager.set_slot(Slot::NeckAccessory, "pendant").unwrap();
        manager.set_slot(Slot::Topwear, "blouse").unwrap();
        assert_eq!(
            manager.outfit_summary().unwrap().unwrap(),
            "**Mira's Current Outfit**\n**Topwear:** blouse\n**Neck Accessory:** pendant"
        );

        let list = manager.slot_list().unwrap();
        assert_eq!(list.len(), Slot::ALL.len());
        assert_eq!(list[0].name, "headwear");
        assert_eq!(list[1].value, "blouse");
    }

    #[test]
    fn test_apply_directives_in_order() {
        let (_, handle) = store();
        let manager = mira(handle);
        let scanner = DirectiveScanner::default();
        let text = "outfit-system_wear_topwear(\"red jacket\")\n\
                    garbage line\n\
                    outfit-system_wear_cape(\"velvet\")\n\
                    outfit-system_change_topwear(\"blue jacket\")\n\
                    outfit-system_remove_headwear()";
        let messages = manager.apply_directives(&scanner.scan(text)).unwrap();
        assert_eq!(
            messages,
            vec![
                "Mira put on red jacket.",
                "Mira changed from red jacket to blue jacket.",
                "Mira's headwear is unchanged.",
            ]
        );
        assert_eq!(manager.slot_value(Slot::Topwear).unwrap(), "blue jacket");
    }
}
