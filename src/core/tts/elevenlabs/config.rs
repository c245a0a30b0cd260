//! ElevenLabs TTS configuration: format vocabulary and tier policy.
//!
//! # References
//!
//! - [API Reference](https://elevenlabs.io/docs/api-reference/text-to-speech)

use serde::{Deserialize, Serialize};

use crate::core::tts::base::{FormatFamily, OutputSpec};

/// Default ElevenLabs API base URL.
pub const ELEVENLABS_TTS_URL: &str = "https://api.elevenlabs.io";

/// Default synthesis model.
pub const DEFAULT_MODEL: &str = "eleven_monolingual_v1";

/// Default voice-settings knobs sent with every request.
pub const DEFAULT_STABILITY: f64 = 0.5;
pub const DEFAULT_SIMILARITY_BOOST: f64 = 0.5;

/// Concrete output format tokens accepted by the ElevenLabs API.
///
/// mp3 tokens are all 44.1kHz at the named bitrate; pcm tokens are raw
/// 16-bit little-endian at the named sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElevenLabsFormat {
    Mp3Kbps32,
    Mp3Kbps64,
    Mp3Kbps96,
    Mp3Kbps128,
    Mp3Kbps192,
    Pcm16000,
    Pcm22050,
    Pcm24000,
    Pcm44100,
}

impl ElevenLabsFormat {
    /// The `output_format` query token for this format.
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Mp3Kbps32 => "mp3_44100_32",
            Self::Mp3Kbps64 => "mp3_44100_64",
            Self::Mp3Kbps96 => "mp3_44100_96",
            Self::Mp3Kbps128 => "mp3_44100_128",
            Self::Mp3Kbps192 => "mp3_44100_192",
            Self::Pcm16000 => "pcm_16000",
            Self::Pcm22050 => "pcm_22050",
            Self::Pcm24000 => "pcm_24000",
            Self::Pcm44100 => "pcm_44100",
        }
    }

    pub fn family(&self) -> FormatFamily {
        match self {
            Self::Mp3Kbps32
            | Self::Mp3Kbps64
            | Self::Mp3Kbps96
            | Self::Mp3Kbps128
            | Self::Mp3Kbps192 => FormatFamily::Mp3,
            _ => FormatFamily::Wav,
        }
    }

    /// Accept header negotiated for this format family.
    pub fn accept_header(&self) -> &'static str {
        match self.family() {
            FormatFamily::Mp3 => "audio/mpeg",
            FormatFamily::Wav => "audio/wav",
        }
    }

    /// Resolve an abstract output spec to a concrete token.
    ///
    /// Unrecognized values fall back to the per-family default:
    /// `mp3_44100_192` for mp3, `pcm_44100` for pcm.
    pub fn from_output_spec(spec: OutputSpec) -> Self {
        match spec.family {
            FormatFamily::Mp3 => match spec.rate {
                Some(32) => Self::Mp3Kbps32,
                Some(64) => Self::Mp3Kbps64,
                Some(96) => Self::Mp3Kbps96,
                Some(128) => Self::Mp3Kbps128,
                _ => Self::Mp3Kbps192,
            },
            FormatFamily::Wav => match spec.rate {
                Some(16000) => Self::Pcm16000,
                Some(22050) => Self::Pcm22050,
                Some(24000) => Self::Pcm24000,
                _ => Self::Pcm44100,
            },
        }
    }
}

/// Tier capability policy: `(subscription tier, requested, permitted)`.
///
/// Only combinations observed in production are listed; a `(tier, format)`
/// pair with no entry passes through unmodified. This is policy data, not
/// logic: new rows are added here as product defines them.
pub const TIER_FORMAT_POLICY: &[(&str, ElevenLabsFormat, ElevenLabsFormat)] = &[(
    "free",
    ElevenLabsFormat::Mp3Kbps192,
    ElevenLabsFormat::Mp3Kbps128,
)];

/// Apply the tier policy table to a requested format.
pub fn apply_tier_policy(tier: &str, requested: ElevenLabsFormat) -> ElevenLabsFormat {
    for (policy_tier, from, to) in TIER_FORMAT_POLICY {
        if tier.eq_ignore_ascii_case(policy_tier) && requested == *from {
            return *to;
        }
    }
    requested
}
