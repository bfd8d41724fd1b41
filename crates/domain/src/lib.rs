//! Domain layer for Voicewire
//!
//! Contains the entities, events, and value objects of a voice conversation.
//! This layer has no async or I/O dependencies and defines the ubiquitous
//! language: recognition events flowing in, channel events flowing out, and
//! the conversation turns in between.

pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use events::{ChannelEvent, RecognitionEvent};
pub use value_objects::*;
