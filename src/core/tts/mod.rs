pub mod base;
pub mod elevenlabs;
pub mod ibm_watson;

pub use base::{
    AudioStream, FormatFamily, OutputSpec, ProviderSession, QuotaSnapshot, SynthesisProvider,
    SynthesisRequest, TtsError, TtsResult, VoiceInfo, extract_error_message,
    rejection_from_response,
};
pub use elevenlabs::{ELEVENLABS_TTS_URL, ElevenLabsFormat, ElevenLabsProvider};
pub use ibm_watson::{IBM_WATSON_TTS_URL, IbmFormat, IbmWatsonProvider};

use std::collections::HashMap;
use std::sync::Arc;

/// Factory function to create a TTS provider client.
///
/// # Supported Providers
///
/// - `"elevenlabs"` - ElevenLabs TTS API
/// - `"ibm-watson"` or `"ibm_watson"` or `"watson"` or `"ibm"` - IBM Watson TTS API
///
/// # Example
///
/// ```rust,ignore
/// use say2file::core::tts::{ProviderSession, create_provider};
///
/// let session = ProviderSession::new("https://api.elevenlabs.io", "your-api-key");
/// let provider = create_provider("elevenlabs", session)?;
/// ```
pub fn create_provider(
    provider_type: &str,
    session: ProviderSession,
) -> TtsResult<Arc<dyn SynthesisProvider>> {
    match provider_type.to_lowercase().as_str() {
        "elevenlabs" | "eleven-labs" | "eleven_labs" | "eleven" | "11labs" | "labs" => {
            Ok(Arc::new(ElevenLabsProvider::new(session)?))
        }
        "ibm-watson" | "ibm_watson" | "watson" | "ibm" => {
            Ok(Arc::new(IbmWatsonProvider::new(session)?))
        }
        _ => Err(TtsError::InvalidConfiguration(format!(
            "Unsupported TTS provider: {provider_type}. Supported providers: elevenlabs, ibm-watson"
        ))),
    }
}

/// Returns a map of provider names to their default API endpoint URLs,
/// consulted by settings resolution when no URL override is configured.
///
/// Note: IBM Watson uses per-instance endpoints; its entry is the us-south
/// regional default and real runs always supply `IBMURL`.
pub fn default_provider_urls() -> HashMap<String, String> {
    let mut urls = HashMap::new();
    urls.insert("elevenlabs".to_string(), ELEVENLABS_TTS_URL.to_string());
    urls.insert("ibm-watson".to_string(), IBM_WATSON_TTS_URL.to_string());
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ProviderSession {
        ProviderSession::new("https://api.example.com", "test-key")
    }

    #[test]
    fn test_create_provider() {
        assert!(create_provider("elevenlabs", session()).is_ok());
        assert!(create_provider("ibm-watson", session()).is_ok());

        let invalid = create_provider("invalid", session());
        assert!(invalid.is_err());
    }

    #[test]
    fn test_create_provider_aliases() {
        for alias in ["eleven", "11labs", "eleven-labs"] {
            assert!(create_provider(alias, session()).is_ok(), "alias {alias}");
        }
        for alias in ["ibm", "watson", "ibm_watson"] {
            assert!(create_provider(alias, session()).is_ok(), "alias {alias}");
        }
    }

    #[test]
    fn test_create_provider_case_insensitive() {
        assert!(create_provider("ElevenLabs", session()).is_ok());
        assert!(create_provider("IBM-WATSON", session()).is_ok());
    }

    #[test]
    fn test_invalid_provider_error_message_lists_supported() {
        match create_provider("nope", session()) {
            Err(TtsError::InvalidConfiguration(msg)) => {
                assert!(msg.contains("elevenlabs"));
                assert!(msg.contains("ibm-watson"));
            }
            other => panic!("expected InvalidConfiguration, got: {other:?}"),
        }
    }

    #[test]
    fn test_default_provider_urls() {
        let urls = default_provider_urls();
        assert_eq!(urls.get("elevenlabs").unwrap(), ELEVENLABS_TTS_URL);
        assert_eq!(urls.get("ibm-watson").unwrap(), IBM_WATSON_TTS_URL);
    }
}
