//! IBM Watson Text-to-Speech configuration.
//!
//! # References
//!
//! - [API Reference](https://cloud.ibm.com/apidocs/text-to-speech)

use serde::{Deserialize, Serialize};

use crate::core::tts::base::{FormatFamily, OutputSpec};

/// IBM Watson TTS base URL for the default region (us-south). The real
/// instance URL comes from service credentials (`IBMURL`).
pub const IBM_WATSON_TTS_URL: &str = "https://api.us-south.text-to-speech.watson.cloud.ibm.com";

/// Default voice when none is configured.
pub const DEFAULT_VOICE: &str = "en-US_MichaelV3Voice";

/// Default WAV sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Sample rates IBM Watson accepts for rate-parameterized formats.
pub const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8000..=192_000;

/// Audio output formats this client requests from IBM Watson.
///
/// WAV responses are streamed with placeholder size fields in the container
/// header; the caller runs them through the WAV repair filter after the
/// stream completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IbmFormat {
    /// PCM in a WAV container.
    #[default]
    #[serde(rename = "audio/wav")]
    Wav,
    /// MPEG Layer-3 compressed audio.
    #[serde(rename = "audio/mp3")]
    Mp3,
}

impl IbmFormat {
    /// Accept header for this format. WAV takes an optional `rate`
    /// parameter; out-of-range rates fall back to the documented default.
    pub fn accept_header(&self, sample_rate: Option<u32>) -> String {
        match self {
            Self::Wav => {
                let rate = match sample_rate {
                    Some(rate) if SAMPLE_RATE_RANGE.contains(&rate) => rate,
                    _ => DEFAULT_SAMPLE_RATE,
                };
                format!("audio/wav;rate={rate}")
            }
            Self::Mp3 => "audio/mp3".to_string(),
        }
    }

    pub fn family(&self) -> FormatFamily {
        match self {
            Self::Wav => FormatFamily::Wav,
            Self::Mp3 => FormatFamily::Mp3,
        }
    }

    /// Resolve an abstract output spec to the IBM vocabulary.
    pub fn from_output_spec(spec: OutputSpec) -> Self {
        match spec.family {
            FormatFamily::Mp3 => Self::Mp3,
            FormatFamily::Wav => Self::Wav,
        }
    }
}
