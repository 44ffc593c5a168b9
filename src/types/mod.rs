//! Shared data types.

pub mod chat;

pub use chat::{first_substantive_message, ChatMessage};
