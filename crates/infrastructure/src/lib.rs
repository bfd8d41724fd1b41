//! Infrastructure layer - Provider adapters and runtime wiring
//!
//! Implements the application ports on top of the `ai_speech` and `ai_core`
//! provider crates, and assembles a ready-to-run conversation session from a
//! single [`RuntimeConfig`].

pub mod adapters;
pub mod bootstrap;
pub mod config;

pub use adapters::{GenerationAdapter, RecognitionAdapter, SynthesisAdapter};
pub use bootstrap::build_session;
pub use config::RuntimeConfig;
