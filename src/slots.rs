//! Outfit slots: the fixed vocabulary of wearable categories.
//!
//! Slots come from two disjoint sets, clothing and accessories. Each slot
//! holds exactly one string value at a time, with [`NONE_VALUE`] meaning
//! nothing is worn there.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utilities::errors::OutfitError;

/// Sentinel value for an empty slot.
pub const NONE_VALUE: &str = "None";

/// Constant owner id used for the user's outfit instances.
pub const USER_OWNER_ID: &str = "user";

/// Normalize a raw slot value: trimmed, and empty input or any casing of
/// `"none"` reads as the canonical `"None"`.
pub fn normalize_value(value: &str) -> String {
    if is_none_value(value) {
        NONE_VALUE.to_string()
    } else {
        value.trim().to_string()
    }
}

/// Whether a value is the empty-slot sentinel, ignoring case.
pub fn is_none_value(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NONE_VALUE)
}

// ---------------------------------------------------------------------------
// SlotCategory
// ---------------------------------------------------------------------------

/// Which fixed set a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotCategory {
    Clothing,
    Accessory,
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// A single wearable category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "headwear")]
    Headwear,
    #[serde(rename = "topwear")]
    Topwear,
    #[serde(rename = "topunderwear")]
    TopUnderwear,
    #[serde(rename = "bottomwear")]
    Bottomwear,
    #[serde(rename = "bottomunderwear")]
    BottomUnderwear,
    #[serde(rename = "footwear")]
    Footwear,
    #[serde(rename = "footunderwear")]
    FootUnderwear,
    #[serde(rename = "head-accessory")]
    HeadAccessory,
    #[serde(rename = "ears-accessory")]
    EarsAccessory,
    #[serde(rename = "eyes-accessory")]
    EyesAccessory,
    #[serde(rename = "mouth-accessory")]
    MouthAccessory,
    #[serde(rename = "neck-accessory")]
    NeckAccessory,
    #[serde(rename = "body-accessory")]
    BodyAccessory,
    #[serde(rename = "arms-accessory")]
    ArmsAccessory,
    #[serde(rename = "hands-accessory")]
    HandsAccessory,
    #[serde(rename = "waist-accessory")]
    WaistAccessory,
    #[serde(rename = "bottom-accessory")]
    BottomAccessory,
    #[serde(rename = "legs-accessory")]
    LegsAccessory,
    #[serde(rename = "foot-accessory")]
    FootAccessory,
}

impl Slot {
    /// Clothing slots, in display order.
    pub const CLOTHING: [Slot; 7] = [
        Slot::Headwear,
        Slot::Topwear,
        Slot::TopUnderwear,
        Slot::Bottomwear,
        Slot::BottomUnderwear,
        Slot::Footwear,
        Slot::FootUnderwear,
    ];

    /// Accessory slots, in display order.
    pub const ACCESSORIES: [Slot; 12] = [
        Slot::HeadAccessory,
        Slot::EarsAccessory,
        Slot::EyesAccessory,
        Slot::MouthAccessory,
        Slot::NeckAccessory,
        Slot::BodyAccessory,
        Slot::ArmsAccessory,
        Slot::HandsAccessory,
        Slot::WaistAccessory,
        Slot::BottomAccessory,
        Slot::LegsAccessory,
        Slot::FootAccessory,
    ];

    /// Every slot, clothing first.
    pub const ALL: [Slot; 19] = [
        Slot::Headwear,
        Slot::Topwear,
        Slot::TopUnderwear,
        Slot::Bottomwear,
        Slot::BottomUnderwear,
        Slot::Footwear,
        Slot::FootUnderwear,
        Slot::HeadAccessory,
        Slot::EarsAccessory,
        Slot::EyesAccessory,
        Slot::MouthAccessory,
        Slot::NeckAccessory,
        Slot::BodyAccessory,
        Slot::ArmsAccessory,
        Slot::HandsAccessory,
        Slot::WaistAccessory,
        Slot::BottomAccessory,
        Slot::LegsAccessory,
        Slot::FootAccessory,
    ];

    /// The wire name of the slot (`"topwear"`, `"neck-accessory"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Headwear => "headwear",
            Slot::Topwear => "topwear",
            Slot::TopUnderwear => "topunderwear",
            Slot::Bottomwear => "bottomwear",
            Slot::BottomUnderwear => "bottomunderwear",
            Slot::Footwear => "footwear",
            Slot::FootUnderwear => "footunderwear",
            Slot::HeadAccessory => "head-accessory",
            Slot::EarsAccessory => "ears-accessory",
            Slot::EyesAccessory => "eyes-accessory",
            Slot::MouthAccessory => "mouth-accessory",
            Slot::NeckAccessory => "neck-accessory",
            Slot::BodyAccessory => "body-accessory",
            Slot::ArmsAccessory => "arms-accessory",
            Slot::HandsAccessory => "hands-accessory",
            Slot::WaistAccessory => "waist-accessory",
            Slot::BottomAccessory => "bottom-accessory",
            Slot::LegsAccessory => "legs-accessory",
            Slot::FootAccessory => "foot-accessory",
        }
    }

    /// Human-readable label used in summaries and slot lists.
    pub fn label(&self) -> &'static str {
        match self {
            Slot::Headwear => "Headwear",
            Slot::Topwear => "Topwear",
            Slot::TopUnderwear => "Top Underwear",
            Slot::Bottomwear => "Bottomwear",
            Slot::BottomUnderwear => "Bottom Underwear",
            Slot::Footwear => "Footwear",
            Slot::FootUnderwear => "Foot Underwear",
            Slot::HeadAccessory => "Head Accessory",
            Slot::EarsAccessory => "Ears Accessory",
            Slot::EyesAccessory => "Eyes Accessory",
            Slot::MouthAccessory => "Mouth Accessory",
            Slot::NeckAccessory => "Neck Accessory",
            Slot::BodyAccessory => "Body Accessory",
            Slot::ArmsAccessory => "Arms Accessory",
            Slot::HandsAccessory => "Hands Accessory",
            Slot::WaistAccessory => "Waist Accessory",
            Slot::BottomAccessory => "Bottom Accessory",
            Slot::LegsAccessory => "Legs Accessory",
            Slot::FootAccessory => "Foot Accessory",
        }
    }

    pub fn category(&self) -> SlotCategory {
        if Slot::CLOTHING.contains(self) {
            SlotCategory::Clothing
        } else {
            SlotCategory::Accessory
        }
    }

    /// Look up a slot by wire name. Case-insensitive, surrounding
    /// whitespace ignored.
    pub fn parse(name: &str) -> Option<Slot> {
        let wanted = name.trim();
        Slot::ALL
            .iter()
            .copied()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = OutfitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::parse(s).ok_or_else(|| OutfitError::InvalidSlot {
            slot: s.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// OwnerKind
// ---------------------------------------------------------------------------

/// Whose outfit an instance describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// A character; the owner id is the character identifier.
    Bot,
    /// The user; the owner id is always [`USER_OWNER_ID`].
    User,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Bot => "bot",
            OwnerKind::User => "user",
        }
    }

    /// Macro tag used in `{{<tag>_<slot>}}` spans.
    pub fn macro_tag(&self) -> &'static str {
        match self {
            OwnerKind::Bot => "char",
            OwnerKind::User => "user",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
