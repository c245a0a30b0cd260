//! Core types shared by all TTS provider clients.
//!
//! This module defines the `SynthesisProvider` trait that every concrete
//! provider implements, the request/response value types that flow through
//! the orchestrator, and the `TtsError` taxonomy.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used throughout the synthesis core.
pub type TtsResult<T> = Result<T, TtsError>;

/// Errors produced by provider clients and the orchestrator.
///
/// Segment-level errors are caught at the segment boundary and reported
/// per artifact; they never abort sibling segments.
#[derive(Debug, Error)]
pub enum TtsError {
    /// Network/connection failure reaching the provider. Not retried.
    #[error("network error reaching provider: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response, with the best-effort message extracted from the
    /// provider's error envelope.
    #[error("provider rejected request ({status}): {message}")]
    ProviderRejection { status: u16, message: String },

    /// A response expected to be JSON could not be decoded.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// A gated call exceeded the configured deadline.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Construction-time or option-resolution error.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Artifact write failure.
    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal fault (e.g. a panicked segment task).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Resolved base URL and credential for one provider.
///
/// Immutable for the lifetime of a run and owned by its provider client.
/// There is deliberately no process-wide mutable configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    /// Service base URL, without a trailing slash.
    pub base_url: String,
    /// API key or equivalent credential.
    pub api_key: String,
}

impl ProviderSession {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            api_key: api_key.into(),
        }
    }
}

/// Output format family requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatFamily {
    /// Compressed MPEG Layer-3 audio.
    Mp3,
    /// Uncompressed PCM, WAV container where the provider offers one.
    #[default]
    Wav,
}

impl FormatFamily {
    /// Parse from string, with fallback to Wav.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "mp3" | "mpeg" | "audio/mpeg" | "audio/mp3" => Self::Mp3,
            "wav" | "pcm" | "l16" | "linear16" | "audio/wav" => Self::Wav,
            _ => Self::default(),
        }
    }

    /// File extension for artifacts in this family.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

/// Abstract output shape: a format family plus an optional sample rate
/// (uncompressed families) or bitrate in kbit/s (mp3).
///
/// Each provider resolves this to its own concrete format token; values the
/// provider does not recognize fall back to a documented per-family default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputSpec {
    pub family: FormatFamily,
    pub rate: Option<u32>,
}

impl OutputSpec {
    pub fn new(family: FormatFamily, rate: Option<u32>) -> Self {
        Self { family, rate }
    }
}

/// One unit of text mapped to one output artifact. Immutable once built.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub output: OutputSpec,
    /// Provider-specific model override (e.g. an ElevenLabs model id).
    pub model_hint: Option<String>,
}

impl SynthesisRequest {
    pub fn new(
        text: impl Into<String>,
        voice_id: impl Into<String>,
        output: OutputSpec,
        model_hint: Option<String>,
    ) -> TtsResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(TtsError::InvalidConfiguration(
                "synthesis text must not be empty".to_string(),
            ));
        }
        Ok(Self {
            text,
            voice_id: voice_id.into(),
            output,
            model_hint,
        })
    }
}

/// A successful synthesis response: a binary byte stream tagged with the
/// content type the provider reported.
pub struct AudioStream {
    pub content_type: String,
    pub stream: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl AudioStream {
    /// Drain the stream into a single buffer.
    ///
    /// Required by the WAV repair filter, which cannot operate on an
    /// unbounded stream; compressed formats are written incrementally
    /// instead of going through this.
    pub async fn collect(mut self) -> TtsResult<Vec<u8>> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf)
    }
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// A voice offered by a provider: stable identifier plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
}

/// Best-effort account usage data, used only for reporting and tier policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub tier: String,
    pub characters_used: u64,
    pub character_limit: u64,
    /// Unix timestamp at which the character counter resets, if known.
    pub reset_unix: Option<i64>,
}

/// Polymorphic synthesis contract implemented by every provider client.
///
/// Implementations own their session (auth, base URL) and translate a
/// `SynthesisRequest` into their own wire shape. Partial capability is
/// expressed with sentinels, not errors: a provider without account status
/// returns `Ok(None)` from `fetch_account_status`.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Provider name for logs and reports.
    fn name(&self) -> &'static str;

    /// Synthesize one request into a binary audio stream.
    async fn synthesize(&self, request: &SynthesisRequest) -> TtsResult<AudioStream>;

    /// List the voices this provider offers, in provider order.
    async fn fetch_voices(&self) -> TtsResult<Vec<VoiceInfo>>;

    /// Fetch account usage data. `Ok(None)` means the provider does not
    /// support this; callers treat the enrichment as optional either way.
    async fn fetch_account_status(&self) -> TtsResult<Option<QuotaSnapshot>>;
}

impl std::fmt::Debug for dyn SynthesisProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisProvider")
            .field("name", &self.name())
            .finish()
    }
}

/// Extract a human-readable message from a provider error body.
///
/// Fallback chain: structured JSON envelope, then raw body text, then the
/// status line. Providers disagree on envelope shape, so several common
/// fields are probed in order.
pub fn extract_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let candidates = [
            value.pointer("/detail/message"),
            value.get("detail"),
            value.get("error"),
            value.get("message"),
        ];
        for candidate in candidates.into_iter().flatten() {
            if let Some(s) = candidate.as_str() {
                if !s.is_empty() {
                    return s.to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("unknown error")
    )
}

/// Convert a non-2xx response into a `ProviderRejection`, consuming the body
/// through the error-envelope fallback chain.
pub async fn rejection_from_response(response: reqwest::Response) -> TtsError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    TtsError::ProviderRejection {
        status: status.as_u16(),
        message: extract_error_message(status, &body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_format_family_parsing() {
        assert_eq!(FormatFamily::from_str_or_default("mp3"), FormatFamily::Mp3);
        assert_eq!(FormatFamily::from_str_or_default("MPEG"), FormatFamily::Mp3);
        assert_eq!(FormatFamily::from_str_or_default("wav"), FormatFamily::Wav);
        assert_eq!(FormatFamily::from_str_or_default("pcm"), FormatFamily::Wav);
        assert_eq!(
            FormatFamily::from_str_or_default("unknown"),
            FormatFamily::Wav
        );
    }

    #[test]
    fn test_format_family_extension() {
        assert_eq!(FormatFamily::Mp3.extension(), "mp3");
        assert_eq!(FormatFamily::Wav.extension(), "wav");
    }

    #[test]
    fn test_provider_session_strips_trailing_slash() {
        let session = ProviderSession::new("https://api.example.com/", "key");
        assert_eq!(session.base_url, "https://api.example.com");

        let session = ProviderSession::new("https://api.example.com", "key");
        assert_eq!(session.base_url, "https://api.example.com");
    }

    #[test]
    fn test_synthesis_request_rejects_empty_text() {
        let result = SynthesisRequest::new("   ", "voice", OutputSpec::default(), None);
        assert!(matches!(result, Err(TtsError::InvalidConfiguration(_))));

        let result = SynthesisRequest::new("hello", "voice", OutputSpec::default(), None);
        assert!(result.is_ok());
    }

    #[test]
    fn test_extract_error_message_nested_detail() {
        let body = r#"{"detail": {"status": "invalid_api_key", "message": "Invalid API key"}}"#;
        let msg = extract_error_message(StatusCode::UNAUTHORIZED, body);
        assert_eq!(msg, "Invalid API key");
    }

    #[test]
    fn test_extract_error_message_flat_fields() {
        let body = r#"{"error": "Model not found", "code": 404}"#;
        let msg = extract_error_message(StatusCode::NOT_FOUND, body);
        assert_eq!(msg, "Model not found");

        let body = r#"{"message": "quota exceeded"}"#;
        let msg = extract_error_message(StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(msg, "quota exceeded");
    }

    #[test]
    fn test_extract_error_message_falls_back_to_raw_text() {
        let msg = extract_error_message(StatusCode::BAD_GATEWAY, "upstream unavailable\n");
        assert_eq!(msg, "upstream unavailable");

        // JSON without any recognized field also falls back to the raw body
        let body = r#"{"oops": true}"#;
        let msg = extract_error_message(StatusCode::BAD_REQUEST, body);
        assert_eq!(msg, body);
    }

    #[test]
    fn test_extract_error_message_falls_back_to_status_line() {
        let msg = extract_error_message(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(msg, "503 Service Unavailable");
    }
}
