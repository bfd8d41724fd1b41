//! Adapters implementing the application ports

mod generation_adapter;
mod recognition_adapter;
mod synthesis_adapter;

pub use generation_adapter::GenerationAdapter;
pub use recognition_adapter::RecognitionAdapter;
pub use synthesis_adapter::SynthesisAdapter;
