//! Session assembly from a runtime configuration

use std::sync::Arc;

use ai_core::OpenAiGenerator;
use ai_speech::ElevenLabsSynthesizer;
use application::{
    ApplicationError, ConversationChannel, ConversationSession, CoordinatorConfig, SessionSettings,
};
use tracing::info;

use crate::{
    adapters::{GenerationAdapter, RecognitionAdapter, SynthesisAdapter},
    config::RuntimeConfig,
};

/// Build a conversation session wired to the configured providers
///
/// The caller supplies the channel bound to its transport; everything else
/// comes from the configuration. Must be called inside a Tokio runtime: the
/// coordinator loop is spawned immediately.
///
/// # Errors
/// Returns [`ApplicationError::Configuration`] when a provider
/// configuration is invalid.
pub fn build_session(
    config: &RuntimeConfig,
    channel: Arc<dyn ConversationChannel>,
) -> Result<ConversationSession, ApplicationError> {
    config.validate()?;

    let engine = OpenAiGenerator::new(config.generation.clone())
        .map_err(|err| ApplicationError::Configuration(err.to_string()))?;
    let generation = Arc::new(GenerationAdapter::new(
        Arc::new(engine),
        config.generation.system_prompt.clone(),
    ));

    let synthesizer = ElevenLabsSynthesizer::new(config.speech.clone())
        .map_err(|err| ApplicationError::Configuration(err.to_string()))?;
    let synthesis = Arc::new(SynthesisAdapter::new(synthesizer));

    let recognition = Arc::new(RecognitionAdapter::new(config.speech.clone()));

    let settings = SessionSettings {
        sample_rate_hz: config.speech.sample_rate_hz,
        language_hint: config.language_hint.clone(),
    };
    let coordinator = CoordinatorConfig {
        fallback_reply: config
            .fallback_reply
            .clone()
            .unwrap_or_else(|| CoordinatorConfig::default().fallback_reply),
    };

    info!(
        recognition = config.speech.recognition_enabled(),
        synthesis = config.speech.synthesis_enabled(),
        "Building conversation session"
    );

    Ok(ConversationSession::start(
        recognition,
        generation,
        synthesis,
        channel,
        settings,
        coordinator,
    ))
}
