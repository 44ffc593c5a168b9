//! Outfit state: instances, presets, reconciliation merge, and the
//! persistence seam.

pub mod handle;
pub mod instance;
pub mod merge;
pub mod persistence;
pub mod store;

pub use handle::StoreHandle;
pub use instance::OutfitInstance;
pub use merge::merge_state;
pub use persistence::{InMemoryPersistence, StatePersistence};
pub use store::{DefaultPresets, Owner, PresetMap, PresetStore, StateStore, StoreState};
