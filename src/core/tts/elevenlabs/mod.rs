//! ElevenLabs TTS provider.

mod config;
mod provider;

pub use config::{
    DEFAULT_MODEL, ELEVENLABS_TTS_URL, ElevenLabsFormat, TIER_FORMAT_POLICY, apply_tier_policy,
};
pub use provider::ElevenLabsProvider;
