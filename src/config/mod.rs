//! Configuration resolution for the say2file CLI.
//!
//! Settings are resolved once, before any provider client is constructed,
//! from CLI overrides merged over environment variables merged over
//! defaults. The result is a single immutable `Settings` value; nothing in
//! the core reads the environment after this point.
//!
//! Environment names follow the service-credential conventions the tool has
//! always used: `IBMKEY`/`IBMURL` for IBM Watson, `LABSKEY`/`LABSURL` for
//! ElevenLabs.

use std::env;
use std::time::Duration;

use url::Url;

use crate::core::orchestrator::DEFAULT_TIMEOUT_SECS;
use crate::core::tts::ibm_watson::DEFAULT_VOICE as IBM_DEFAULT_VOICE;
use crate::core::tts::{
    FormatFamily, OutputSpec, ProviderSession, TtsError, TtsResult, default_provider_urls,
};

/// IBM Watson API key.
pub const ENV_IBM_KEY: &str = "IBMKEY";
/// IBM Watson per-instance service URL.
pub const ENV_IBM_URL: &str = "IBMURL";
/// ElevenLabs API key.
pub const ENV_LABS_KEY: &str = "LABSKEY";
/// ElevenLabs base URL override.
pub const ENV_LABS_URL: &str = "LABSURL";
/// Default provider when no `--provider` flag is given.
pub const ENV_DEFAULT_PROVIDER: &str = "SAY2FILE_PROVIDER";

/// Caller-supplied overrides, typically parsed from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub voice: Option<String>,
    /// Output format family name (`mp3`, `wav`, `pcm`).
    pub format: Option<String>,
    /// Sample rate (wav/pcm) or bitrate in kbit/s (mp3).
    pub rate: Option<u32>,
    /// Provider-specific model id.
    pub model: Option<String>,
    pub output_root: Option<String>,
    pub split: bool,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved, immutable run options.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Canonical provider name (`elevenlabs` or `ibm-watson`).
    pub provider: String,
    pub session: ProviderSession,
    pub voice_id: String,
    pub output: OutputSpec,
    pub model_hint: Option<String>,
    pub output_root: String,
    pub split: bool,
    pub timeout: Duration,
}

impl Settings {
    /// Resolve settings from overrides plus the process environment.
    pub fn resolve(overrides: Overrides) -> TtsResult<Self> {
        Self::resolve_with(overrides, &env_var)
    }

    /// Resolution against an explicit variable lookup, so tests don't have
    /// to mutate the process environment.
    pub fn resolve_with(
        overrides: Overrides,
        get: &dyn Fn(&str) -> Option<String>,
    ) -> TtsResult<Self> {
        let provider_name = overrides
            .provider
            .or_else(|| get(ENV_DEFAULT_PROVIDER))
            .unwrap_or_else(|| "ibm-watson".to_string());
        let provider = canonical_provider(&provider_name)?;

        let session = session_for(provider, get)?;

        let voice_id = match overrides.voice {
            Some(voice) => voice,
            None => match provider {
                "ibm-watson" => IBM_DEFAULT_VOICE.to_string(),
                _ => {
                    return Err(TtsError::InvalidConfiguration(
                        "a voice id is required for elevenlabs (--voice)".to_string(),
                    ));
                }
            },
        };

        let family = overrides
            .format
            .as_deref()
            .map(FormatFamily::from_str_or_default)
            .unwrap_or_default();

        Ok(Self {
            provider: provider.to_string(),
            session,
            voice_id,
            output: OutputSpec::new(family, overrides.rate),
            model_hint: overrides.model,
            output_root: overrides.output_root.unwrap_or_else(|| "audio".to_string()),
            split: overrides.split,
            timeout: Duration::from_secs(overrides.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }
}

/// Resolve just the canonical provider name and its session, for commands
/// that never synthesize (voice listing, account status) and so don't need
/// a voice id.
pub fn resolve_session(provider: Option<String>) -> TtsResult<(String, ProviderSession)> {
    resolve_session_with(provider, &env_var)
}

pub fn resolve_session_with(
    provider: Option<String>,
    get: &dyn Fn(&str) -> Option<String>,
) -> TtsResult<(String, ProviderSession)> {
    let name = provider
        .or_else(|| get(ENV_DEFAULT_PROVIDER))
        .unwrap_or_else(|| "ibm-watson".to_string());
    let canonical = canonical_provider(&name)?;
    let session = session_for(canonical, get)?;
    Ok((canonical.to_string(), session))
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Reject base URLs that would fail inside the HTTP client with a much
/// less helpful error.
fn checked_url(raw: String, var: &str) -> TtsResult<String> {
    Url::parse(&raw).map_err(|e| {
        TtsError::InvalidConfiguration(format!("{var} is not a valid URL ({raw}): {e}"))
    })?;
    Ok(raw)
}

/// Map a provider alias to its canonical name.
fn canonical_provider(name: &str) -> TtsResult<&'static str> {
    match name.to_lowercase().as_str() {
        "elevenlabs" | "eleven-labs" | "eleven_labs" | "eleven" | "11labs" | "labs" => {
            Ok("elevenlabs")
        }
        "ibm-watson" | "ibm_watson" | "watson" | "ibm" => Ok("ibm-watson"),
        _ => Err(TtsError::InvalidConfiguration(format!(
            "unknown provider '{name}' (expected elevenlabs or ibm-watson)"
        ))),
    }
}

/// Build the provider session from credentials in the environment.
fn session_for(provider: &str, get: &dyn Fn(&str) -> Option<String>) -> TtsResult<ProviderSession> {
    match provider {
        "elevenlabs" => {
            let key = get(ENV_LABS_KEY).ok_or_else(|| {
                TtsError::InvalidConfiguration(format!("{ENV_LABS_KEY} must be set"))
            })?;
            let base = match get(ENV_LABS_URL) {
                Some(url) => url,
                None => default_provider_urls().remove(provider).ok_or_else(|| {
                    TtsError::InvalidConfiguration(format!(
                        "no default base URL registered for {provider}"
                    ))
                })?,
            };
            Ok(ProviderSession::new(checked_url(base, ENV_LABS_URL)?, key))
        }
        "ibm-watson" => {
            let key = get(ENV_IBM_KEY).ok_or_else(|| {
                TtsError::InvalidConfiguration(format!("{ENV_IBM_KEY} must be set"))
            })?;
            // Watson URLs are per service instance; there is no usable
            // global default.
            let base = get(ENV_IBM_URL).ok_or_else(|| {
                TtsError::InvalidConfiguration(format!("{ENV_IBM_URL} must be set"))
            })?;
            Ok(ProviderSession::new(checked_url(base, ENV_IBM_URL)?, key))
        }
        other => Err(TtsError::InvalidConfiguration(format!(
            "unknown provider '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::ELEVENLABS_TTS_URL;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |name: &str| map.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_resolve_defaults_to_ibm_watson() {
        let vars = [
            (ENV_IBM_KEY, "ibm-key"),
            (ENV_IBM_URL, "https://ibm.example.com/"),
        ];
        let settings = Settings::resolve_with(Overrides::default(), &lookup(&vars)).unwrap();

        assert_eq!(settings.provider, "ibm-watson");
        assert_eq!(settings.session.base_url, "https://ibm.example.com");
        assert_eq!(settings.session.api_key, "ibm-key");
        assert_eq!(settings.voice_id, IBM_DEFAULT_VOICE);
        assert_eq!(settings.output.family, FormatFamily::Wav);
        assert_eq!(settings.output_root, "audio");
        assert!(!settings.split);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_resolve_elevenlabs_with_default_base_url() {
        let vars = [(ENV_LABS_KEY, "labs-key")];
        let overrides = Overrides {
            provider: Some("eleven".to_string()),
            voice: Some("voice123".to_string()),
            format: Some("mp3".to_string()),
            rate: Some(128),
            ..Default::default()
        };
        let settings = Settings::resolve_with(overrides, &lookup(&vars)).unwrap();

        assert_eq!(settings.provider, "elevenlabs");
        assert_eq!(settings.session.base_url, ELEVENLABS_TTS_URL);
        assert_eq!(settings.output.family, FormatFamily::Mp3);
        assert_eq!(settings.output.rate, Some(128));
    }

    #[test]
    fn test_resolve_elevenlabs_requires_voice() {
        let vars = [(ENV_LABS_KEY, "labs-key")];
        let overrides = Overrides {
            provider: Some("elevenlabs".to_string()),
            ..Default::default()
        };
        let result = Settings::resolve_with(overrides, &lookup(&vars));
        assert!(matches!(result, Err(TtsError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_resolve_missing_credentials() {
        let result = Settings::resolve_with(Overrides::default(), &lookup(&[]));
        assert!(matches!(result, Err(TtsError::InvalidConfiguration(_))));

        let overrides = Overrides {
            provider: Some("elevenlabs".to_string()),
            voice: Some("v".to_string()),
            ..Default::default()
        };
        let result = Settings::resolve_with(overrides, &lookup(&[]));
        assert!(matches!(result, Err(TtsError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_resolve_provider_from_environment() {
        let vars = [
            (ENV_DEFAULT_PROVIDER, "elevenlabs"),
            (ENV_LABS_KEY, "labs-key"),
            (ENV_LABS_URL, "https://mock.example.com"),
        ];
        let overrides = Overrides {
            voice: Some("voice123".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve_with(overrides, &lookup(&vars)).unwrap();
        assert_eq!(settings.provider, "elevenlabs");
        assert_eq!(settings.session.base_url, "https://mock.example.com");
    }

    #[test]
    fn test_resolve_rejects_unknown_provider() {
        let overrides = Overrides {
            provider: Some("polly".to_string()),
            ..Default::default()
        };
        let result = Settings::resolve_with(overrides, &lookup(&[]));
        assert!(matches!(result, Err(TtsError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_resolve_rejects_malformed_base_url() {
        let vars = [(ENV_IBM_KEY, "ibm-key"), (ENV_IBM_URL, "not a url")];
        let result = Settings::resolve_with(Overrides::default(), &lookup(&vars));
        match result {
            Err(TtsError::InvalidConfiguration(msg)) => assert!(msg.contains(ENV_IBM_URL)),
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_session_skips_voice_requirement() {
        let vars = [(ENV_LABS_KEY, "labs-key")];
        let (provider, session) =
            resolve_session_with(Some("labs".to_string()), &lookup(&vars)).unwrap();
        assert_eq!(provider, "elevenlabs");
        assert_eq!(session.api_key, "labs-key");
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        // dotenv files often leave keys defined but empty
        let vars = [
            (ENV_IBM_KEY, "ibm-key"),
            (ENV_IBM_URL, "https://ibm.example.com"),
            (ENV_DEFAULT_PROVIDER, ""),
        ];
        let get = |name: &str| {
            let map: HashMap<&str, &str> = vars.iter().copied().collect();
            map.get(name)
                .map(|v| v.to_string())
                .filter(|v| !v.is_empty())
        };
        let settings = Settings::resolve_with(Overrides::default(), &get).unwrap();
        assert_eq!(settings.provider, "ibm-watson");
    }
}
