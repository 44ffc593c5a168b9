//! Outfit managers: slot changes, presets, narration, and macros.

pub mod macros;
pub mod narration;
pub mod outfit_manager;

pub use macros::resolve_macros;
pub use narration::{Narrator, SlotChange, Transition};
pub use outfit_manager::{OutfitManager, PresetLoad, SlotValue, RESERVED_PRESET_NAME};
