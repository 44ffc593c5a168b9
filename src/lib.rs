//! # Outfit Tracker
//!
//! Conversation-scoped outfit state for roleplay chats.
//! Version 0.3.0
//!
//! Each conversation gets a deterministic instance id derived from its first
//! substantive message. Per character and per instance, the tracker keeps one
//! value for every clothing and accessory slot, plus named presets. State is
//! reconciled against a persistence collaborator on every write, and outfit
//! directives emitted by a language model are scanned and applied in order.

pub mod config;
pub mod llms;
pub mod manager;
pub mod scanner;
pub mod slots;
pub mod state;
pub mod tracker;
pub mod types;
pub mod utilities;

#[cfg(test)]
pub(crate) mod testing;

pub use config::OutfitConfig;
pub use llms::{AutoOutfitSystem, CharacterInfo, HostContext, LanguageModel};
pub use manager::{OutfitManager, PresetLoad, SlotValue};
pub use scanner::{Directive, DirectiveScanner, QuoteScanner};
pub use slots::{OwnerKind, Slot};
pub use state::{InMemoryPersistence, OutfitInstance, StatePersistence, StoreHandle};
pub use tracker::OutfitTracker;
pub use types::chat::ChatMessage;
pub use utilities::errors::{GenerationError, OutfitError, Result};
pub use utilities::instance_id::InstanceIdentifier;

/// Crate version.
pub const VERSION: &str = "0.3.0";
