//! Port definitions for the application layer
//!
//! Ports are interfaces that define how the conversation interacts with
//! external systems. Adapters in the infrastructure layer implement these
//! ports on top of the provider crates.

mod channel;
mod generation;
mod recognition;
mod synthesis;

#[cfg(test)]
pub use channel::MockConversationChannel;
pub use channel::ConversationChannel;
#[cfg(test)]
pub use generation::MockGenerationPort;
pub use generation::GenerationPort;
#[cfg(test)]
pub use recognition::{MockRecognitionPort, MockRecognitionSession};
pub use recognition::{RecognitionPort, RecognitionSession, RecognitionStream};
#[cfg(test)]
pub use synthesis::MockSynthesisPort;
pub use synthesis::{SynthesisPort, SynthesisStream};
