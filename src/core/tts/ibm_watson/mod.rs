//! IBM Watson TTS provider.

mod config;
mod provider;

pub use config::{DEFAULT_SAMPLE_RATE, DEFAULT_VOICE, IBM_WATSON_TTS_URL, IbmFormat};
pub use provider::IbmWatsonProvider;
