//! One owner's outfit in one conversation instance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::slots::{is_none_value, normalize_value, Slot, NONE_VALUE};

/// Slot → value mapping in which every known slot is always present.
///
/// Serialized as a flat JSON object keyed by slot wire name. On
/// deserialization, missing slots read as `"None"` and unknown keys or
/// non-string values are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, String>"
)]
pub struct OutfitInstance {
    values: BTreeMap<Slot, String>,
}

impl Default for OutfitInstance {
    fn default() -> Self {
        Self::new()
    }
}

impl OutfitInstance {
    /// An instance with every slot set to `"None"`.
    pub fn new() -> Self {
        Self {
            values: Slot::ALL
                .iter()
                .map(|slot| (*slot, NONE_VALUE.to_string()))
                .collect(),
        }
    }

    /// Current value of a slot.
    pub fn get(&self, slot: Slot) -> &str {
        self.values.get(&slot).map_or(NONE_VALUE, String::as_str)
    }

    /// Set a slot, returning the previous value. The new value is trimmed
    /// and blank input stores `"None"`.
    pub fn set(&mut self, slot: Slot, value: &str) -> String {
        self.values
            .insert(slot, normalize_value(value))
            .unwrap_or_else(|| NONE_VALUE.to_string())
    }

    /// All slots with their values, clothing first.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &str)> + '_ {
        Slot::ALL.iter().map(move |slot| (*slot, self.get(*slot)))
    }

    /// Slots currently holding something other than `"None"`.
    pub fn worn(&self) -> impl Iterator<Item = (Slot, &str)> + '_ {
        self.iter().filter(|(_, value)| !is_none_value(value))
    }

    /// Whether every slot is empty.
    pub fn is_bare(&self) -> bool {
        self.worn().next().is_none()
    }

    /// Slots whose value differs from `other`.
    pub fn diff(&self, other: &OutfitInstance) -> Vec<Slot> {
        Slot::ALL
            .iter()
            .copied()
            .filter(|slot| self.get(*slot) != other.get(*slot))
            .collect()
    }
}

impl From<BTreeMap<String, Value>> for OutfitInstance {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        let mut instance = OutfitInstance::new();
        for (key, value) in raw {
            match (Slot::parse(&key), value.as_str()) {
                (Some(slot), Some(text)) => {
                    instance.set(slot, text);
                }
                _ => log::debug!("OutfitInstance: ignoring persisted key '{}'", key),
            }
        }
        instance
    }
}

impl From<OutfitInstance> for BTreeMap<String, String> {
    fn from(instance: OutfitInstance) -> Self {
        instance
            .values
            .into_iter()
            .map(|(slot, value)| (slot.as_str().to_string(), value))
            .collect()
    }
}
