//! The in-memory outfit state tree.
//!
//! ```text
//! botInstances[characterId][instanceId]            -> OutfitInstance
//! userInstances[instanceId]                        -> OutfitInstance
//! presets.bot[characterId_instanceId][presetName]  -> OutfitInstance
//! presets.user[instanceId][presetName]             -> OutfitInstance
//! defaultPresets.bot[characterId_instanceId]       -> preset name | null
//! defaultPresets.user[instanceId]                  -> preset name | null
//! settings                                         -> opaque host settings
//! <any other key>                                  -> carried through untouched
//! ```
//!
//! Decoding is lenient: a malformed entry in one branch is dropped with a
//! warning instead of failing the whole tree.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::instance::OutfitInstance;
use super::merge::merge_state;
use crate::slots::{OwnerKind, USER_OWNER_ID};
use crate::utilities::errors::Result;

// ---------------------------------------------------------------------------
// Owner addressing
// ---------------------------------------------------------------------------

/// Identifies whose state is addressed: a character or the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Owner {
    pub kind: OwnerKind,
    /// Character identifier for bots, [`USER_OWNER_ID`] for the user.
    pub id: String,
}

impl Owner {
    pub fn bot(character_id: impl Into<String>) -> Self {
        Self {
            kind: OwnerKind::Bot,
            id: character_id.into(),
        }
    }

    pub fn user() -> Self {
        Self {
            kind: OwnerKind::User,
            id: USER_OWNER_ID.to_string(),
        }
    }

    /// Key under which this owner's presets for `instance_id` live.
    pub fn preset_key(&self, instance_id: &str) -> String {
        match self.kind {
            OwnerKind::Bot => format!("{}_{}", self.id, instance_id),
            OwnerKind::User => instance_id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// StoreState
// ---------------------------------------------------------------------------

/// Presets of one owner/instance, by name.
pub type PresetMap = BTreeMap<String, OutfitInstance>;

/// Saved presets for bots and the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetStore {
    #[serde(default, deserialize_with = "de_bot_presets")]
    pub bot: BTreeMap<String, PresetMap>,
    #[serde(default, deserialize_with = "de_user_presets")]
    pub user: BTreeMap<String, PresetMap>,
}

/// Which preset (if any) is flagged as the default, per preset key.
///
/// A cleared default is stored as `null` rather than removed, so that the
/// reconciliation merge carries the clear over the persisted flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPresets {
    #[serde(default, deserialize_with = "de_bot_defaults")]
    pub bot: BTreeMap<String, Option<String>>,
    #[serde(default, deserialize_with = "de_user_defaults")]
    pub user: BTreeMap<String, Option<String>>,
}

/// Root aggregate persisted as one JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    #[serde(default, deserialize_with = "de_bot_instances")]
    pub bot_instances: BTreeMap<String, BTreeMap<String, OutfitInstance>>,
    #[serde(default, deserialize_with = "de_user_instances")]
    pub user_instances: BTreeMap<String, OutfitInstance>,
    #[serde(default, deserialize_with = "de_or_default")]
    pub presets: PresetStore,
    #[serde(default, deserialize_with = "de_or_default")]
    pub default_presets: DefaultPresets,
    /// Host UI settings, carried through untouched.
    #[serde(default, deserialize_with = "de_or_default")]
    pub settings: Map<String, Value>,
    /// Stamped on every save; serialized as `null` when unset.
    #[serde(default, deserialize_with = "de_or_default")]
    pub saved_at: Option<DateTime<Utc>>,
    /// Root keys written by other parties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Lenient decoding
// ---------------------------------------------------------------------------

/// Decode the whole tree. A non-object root reads as an empty tree.
fn decode_state(value: Value) -> StoreState {
    if !value.is_object() {
        if !value.is_null() {
            log::warn!("StateStore: discarding non-object persisted state");
        }
        return StoreState::default();
    }
    match serde_json::from_value(value) {
        Ok(state) => state,
        Err(e) => {
            log::warn!("StateStore: discarding undecodable persisted state: {}", e);
            StoreState::default()
        }
    }
}

/// Decode each entry of an object on its own, dropping the ones that fail.
fn decode_entries<T: DeserializeOwned>(value: Value, branch: &str) -> BTreeMap<String, T> {
    let map = match value {
        Value::Object(map) => map,
        Value::Null => return BTreeMap::new(),
        _ => {
            log::warn!("StateStore: discarding non-object branch '{}'", branch);
            return BTreeMap::new();
        }
    };
    map.into_iter()
        .filter_map(|(key, entry)| match serde_json::from_value(entry) {
            Ok(decoded) => Some((key, decoded)),
            Err(e) => {
                log::warn!("StateStore: discarding malformed '{}.{}': {}", branch, key, e);
                None
            }
        })
        .collect()
}

/// Two-level variant of [`decode_entries`]: owner key, then entry key.
fn decode_nested<T: DeserializeOwned>(
    value: Value,
    branch: &str,
) -> BTreeMap<String, BTreeMap<String, T>> {
    decode_entries::<Value>(value, branch)
        .into_iter()
        .filter_map(|(key, inner)| {
            if !inner.is_object() {
                log::warn!("StateStore: discarding malformed '{}.{}'", branch, key);
                return None;
            }
            let path = format!("{}.{}", branch, key);
            Some((key, decode_entries(inner, &path)))
        })
        .collect()
}

fn de_or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        log::warn!("StateStore: discarding malformed branch: {}", e);
        T::default()
    }))
}

type InstanceMap = BTreeMap<String, OutfitInstance>;

fn de_bot_instances<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, InstanceMap>, D::Error> {
    Ok(decode_nested(Value::deserialize(deserializer)?, "botInstances"))
}

fn de_user_instances<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<InstanceMap, D::Error> {
    Ok(decode_entries(Value::deserialize(deserializer)?, "userInstances"))
}

fn de_bot_presets<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, PresetMap>, D::Error> {
    Ok(decode_nested(Value::deserialize(deserializer)?, "presets.bot"))
}

fn de_user_presets<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, PresetMap>, D::Error> {
    Ok(decode_nested(Value::deserialize(deserializer)?, "presets.user"))
}

fn de_bot_defaults<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, Option<String>>, D::Error> {
    Ok(decode_entries(Value::deserialize(deserializer)?, "defaultPresets.bot"))
}

fn de_user_defaults<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, Option<String>>, D::Error> {
    Ok(decode_entries(Value::deserialize(deserializer)?, "defaultPresets.user"))
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Get/set access to outfit instances and presets, plus reconciliation
/// against persisted state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateStore {
    state: StoreState,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StoreState) -> Self {
        Self { state }
    }

    /// Decode a persisted blob. Malformed branches are dropped.
    pub fn from_value(value: Value) -> Self {
        Self {
            state: decode_state(value),
        }
    }

    /// Encode for persistence.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.state)?)
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StoreState {
        &mut self.state
    }

    pub fn into_state(self) -> StoreState {
        self.state
    }

    /// Reconcile a fresh persisted read with this (possibly partial)
    /// in-memory state. In-memory branches win as described in
    /// [`merge_state`]; unloaded persisted branches are kept.
    ///
    /// An empty store adopts the persisted tree as-is.
    pub fn reconcile(&mut self, persisted: &Value) -> Result<()> {
        if self.state == StoreState::default() {
            self.state = decode_state(persisted.clone());
            return Ok(());
        }

        // The root schema is fixed: root keys this tree lacks come from the
        // persisted side, so the merge always recurses into each branch.
        let mut source = self.to_value()?;
        if let (Value::Object(source), Value::Object(persisted)) = (&mut source, persisted) {
            for (key, value) in persisted {
                if !source.contains_key(key) {
                    source.insert(key.clone(), value.clone());
                }
            }
        }

        self.state = decode_state(merge_state(persisted, &source));
        Ok(())
    }

    /// Drop everything, settings included.
    pub fn clear(&mut self) {
        self.state = StoreState::default();
    }

    // --- Instances ---

    /// The live instance for an owner, if it was ever created.
    pub fn instance(&self, owner: &Owner, instance_id: &str) -> Option<&OutfitInstance> {
        match owner.kind {
            OwnerKind::Bot => self
                .state
                .bot_instances
                .get(&owner.id)
                .and_then(|instances| instances.get(instance_id)),
            OwnerKind::User => self.state.user_instances.get(instance_id),
        }
    }

    /// The live instance for an owner, created with every slot `"None"`
    /// on first access.
    pub fn instance_mut(&mut self, owner: &Owner, instance_id: &str) -> &mut OutfitInstance {
        match owner.kind {
            OwnerKind::Bot => self
                .state
                .bot_instances
                .entry(owner.id.clone())
                .or_default()
                .entry(instance_id.to_string())
                .or_default(),
            OwnerKind::User => self
                .state
                .user_instances
                .entry(instance_id.to_string())
                .or_default(),
        }
    }

    /// Replace an owner's instance wholesale.
    pub fn set_instance(&mut self, owner: &Owner, instance_id: &str, instance: OutfitInstance) {
        *self.instance_mut(owner, instance_id) = instance;
    }

    // --- Presets ---

    fn preset_map(&self, owner: &Owner, instance_id: &str) -> Option<&PresetMap> {
        let key = owner.preset_key(instance_id);
        match owner.kind {
            OwnerKind::Bot => self.state.presets.bot.get(&key),
            OwnerKind::User => self.state.presets.user.get(&key),
        }
    }

    fn preset_map_mut(&mut self, owner: &Owner, instance_id: &str) -> &mut PresetMap {
        let key = owner.preset_key(instance_id);
        match owner.kind {
            OwnerKind::Bot => self.state.presets.bot.entry(key).or_default(),
            OwnerKind::User => self.state.presets.user.entry(key).or_default(),
        }
    }

    pub fn preset(&self, owner: &Owner, instance_id: &str, name: &str) -> Option<&OutfitInstance> {
        self.preset_map(owner, instance_id)
            .and_then(|presets| presets.get(name))
    }

    /// Store (or overwrite) a preset snapshot.
    pub fn set_preset(&mut self, owner: &Owner, instance_id: &str, name: &str, snapshot: OutfitInstance) {
        self.preset_map_mut(owner, instance_id)
            .insert(name.to_string(), snapshot);
    }

    /// Remove a preset. Returns whether it existed.
    pub fn delete_preset(&mut self, owner: &Owner, instance_id: &str, name: &str) -> bool {
        self.preset_map_mut(owner, instance_id).remove(name).is_some()
    }

    /// Preset names in sorted order.
    pub fn preset_names(&self, owner: &Owner, instance_id: &str) -> Vec<String> {
        self.preset_map(owner, instance_id)
            .map(|presets| presets.keys().cloned().collect())
            .unwrap_or_default()
    }

    // --- Default preset attribute ---

    pub fn default_preset(&self, owner: &Owner, instance_id: &str) -> Option<&str> {
        let key = owner.preset_key(instance_id);
        let flags = match owner.kind {
            OwnerKind::Bot => &self.state.default_presets.bot,
            OwnerKind::User => &self.state.default_presets.user,
        };
        flags.get(&key).and_then(|name| name.as_deref())
    }

    /// Flag `name` as the default preset, or clear the flag with `None`.
    pub fn set_default_preset(&mut self, owner: &Owner, instance_id: &str, name: Option<String>) {
        let key = owner.preset_key(instance_id);
        let flags = match owner.kind {
            OwnerKind::Bot => &mut self.state.default_presets.bot,
            OwnerKind::User => &mut self.state.default_presets.user,
        };
        flags.insert(key, name);
    }

    // --- Settings ---

    pub fn settings(&self) -> &Map<String, Value> {
        &self.state.settings
    }

    pub fn settings_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.state.settings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
