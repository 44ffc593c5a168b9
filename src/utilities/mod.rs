//! Shared utilities: errors, text normalization, and instance ids.

pub mod errors;
pub mod instance_id;
pub mod text_normalizer;
