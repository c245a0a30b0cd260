//! IBM Watson TTS provider implementation.
//!
//! # API Reference
//!
//! - Endpoint: `POST {base}/v1/synthesize`
//! - Auth: `Authorization: Basic base64("apikey:" + key)`
//! - Voices: `GET {base}/v1/voices`
//!
//! Watson streams WAV audio with a header written before the body length is
//! known, so WAV responses must be run through the repair filter once fully
//! read. Account status is not part of the Watson TTS surface; the client
//! reports it as unsupported rather than failing.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::config::IbmFormat;
use crate::core::tts::base::{
    AudioStream, ProviderSession, QuotaSnapshot, SynthesisProvider, SynthesisRequest, TtsError,
    TtsResult, VoiceInfo, rejection_from_response,
};

/// IBM Watson TTS provider client.
pub struct IbmWatsonProvider {
    session: ProviderSession,
    client: Client,
    /// Precomputed `Authorization` header value.
    auth_header: String,
}

#[derive(Debug, Deserialize)]
struct VoicesEnvelope {
    #[serde(default)]
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

impl IbmWatsonProvider {
    pub fn new(session: ProviderSession) -> TtsResult<Self> {
        if session.api_key.is_empty() {
            return Err(TtsError::InvalidConfiguration(
                "IBM Watson API key is required (IBMKEY)".to_string(),
            ));
        }
        if session.base_url.is_empty() {
            return Err(TtsError::InvalidConfiguration(
                "IBM Watson service URL is required (IBMURL)".to_string(),
            ));
        }

        // Watson accepts the API key directly over basic auth.
        let auth_header = format!(
            "Basic {}",
            BASE64.encode(format!("apikey:{}", session.api_key))
        );

        Ok(Self {
            session,
            client: Client::new(),
            auth_header,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.session.base_url, path)
    }
}

#[async_trait]
impl SynthesisProvider for IbmWatsonProvider {
    fn name(&self) -> &'static str {
        "ibm-watson"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> TtsResult<AudioStream> {
        let format = IbmFormat::from_output_spec(request.output);
        let accept = format.accept_header(request.output.rate);

        debug!(
            voice = %request.voice_id,
            accept = %accept,
            text_len = request.text.len(),
            "synthesizing with IBM Watson"
        );

        let body = json!({
            "text": request.text,
            "voice": request.voice_id,
        });

        let response = self
            .client
            .post(self.url("/v1/synthesize"))
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, &accept)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection_from_response(response).await);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(&accept)
            .to_string();

        Ok(AudioStream {
            content_type,
            stream: response.bytes_stream().boxed(),
        })
    }

    async fn fetch_voices(&self) -> TtsResult<Vec<VoiceInfo>> {
        let response = self
            .client
            .get(self.url("/v1/voices"))
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection_from_response(response).await);
        }

        let body = response.text().await?;
        let envelope: VoicesEnvelope = serde_json::from_str(&body)
            .map_err(|e| TtsError::MalformedResponse(format!("voices response: {e}: {body}")))?;

        Ok(envelope
            .voices
            .into_iter()
            .map(|v| {
                let name = v.description.unwrap_or_else(|| v.name.clone());
                VoiceInfo { id: v.name, name }
            })
            .collect())
    }

    async fn fetch_account_status(&self) -> TtsResult<Option<QuotaSnapshot>> {
        // Watson TTS has no account usage endpoint.
        Ok(None)
    }
}
