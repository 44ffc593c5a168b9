//! Narration strings for outfit changes.
//!
//! The wording depends on the slot transition:
//!
//! | previous | current | message                               |
//! |----------|---------|---------------------------------------|
//! | None     | X       | `<Subject> put on X.`                 |
//! | X        | None    | `<Subject> removed X.`                |
//! | X        | Y       | `<Subject> changed from X to Y.`      |
//! | X        | X       | `<Possessive> <label> is unchanged.`  |

use serde::{Deserialize, Serialize};

use crate::slots::{is_none_value, OwnerKind, Slot};

/// Grammatical forms for the owner of an outfit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrator {
    /// Sentence subject: the character name, or `"You"`.
    pub subject: String,
    /// Sentence-initial possessive: `"Mira's"` or `"Your"`.
    pub possessive: String,
    /// Mid-sentence possessive: `"Mira's"` or `"your"`.
    pub possessive_inline: String,
}

impl Narrator {
    pub fn for_owner(kind: OwnerKind, display_name: &str) -> Self {
        match kind {
            OwnerKind::Bot => {
                let possessive = format!("{}'s", display_name);
                Self {
                    subject: display_name.to_string(),
                    possessive: possessive.clone(),
                    possessive_inline: possessive,
                }
            }
            OwnerKind::User => Self {
                subject: "You".to_string(),
                possessive: "Your".to_string(),
                possessive_inline: "your".to_string(),
            },
        }
    }
}

/// How a slot moved between two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    PutOn,
    Removed,
    Changed,
    Unchanged,
}

/// One slot mutation, before and after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotChange {
    pub slot: Slot,
    pub previous: String,
    pub current: String,
}

impl SlotChange {
    pub fn transition(&self) -> Transition {
        let was_empty = is_none_value(&self.previous);
        let is_empty = is_none_value(&self.current);
        match (was_empty, is_empty) {
            _ if self.previous == self.current => Transition::Unchanged,
            (true, true) => Transition::Unchanged,
            (true, false) => Transition::PutOn,
            (false, true) => Transition::Removed,
            (false, false) => Transition::Changed,
        }
    }

    pub fn narrate(&self, narrator: &Narrator) -> String {
        match self.transition() {
            Transition::PutOn => format!("{} put on {}.", narrator.subject, self.current),
            Transition::Removed => format!("{} removed {}.", narrator.subject, self.previous),
            Transition::Changed => format!(
                "{} changed from {} to {}.",
                narrator.subject, self.previous, self.current
            ),
            Transition::Unchanged => format!(
                "{} {} is unchanged.",
                narrator.possessive,
                self.slot.label().to_lowercase()
            ),
        }
    }
}
