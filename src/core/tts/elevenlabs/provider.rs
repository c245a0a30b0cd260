//! ElevenLabs TTS provider implementation.
//!
//! # API Reference
//!
//! - Endpoint: `POST {base}/v1/text-to-speech/{voice_id}`
//! - Auth: `xi-api-key` header
//! - Voices: `GET /v1/voices`
//! - Account: `GET /v1/user` (subscription tier and character quota)
//!
//! The account endpoint feeds two things: the optional quota report after a
//! batch, and the tier capability policy applied before synthesis (the free
//! tier is not allowed the 192kbps mp3 token and is silently downgraded).

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::config::{
    DEFAULT_MODEL, DEFAULT_SIMILARITY_BOOST, DEFAULT_STABILITY, apply_tier_policy,
    ElevenLabsFormat,
};
use crate::core::tts::base::{
    AudioStream, ProviderSession, QuotaSnapshot, SynthesisProvider, SynthesisRequest, TtsError,
    TtsResult, VoiceInfo, rejection_from_response,
};

/// Header carrying the ElevenLabs API key.
const API_KEY_HEADER: &str = "xi-api-key";

/// ElevenLabs TTS provider client.
///
/// Owns its session exclusively; the quota snapshot is a single cached slot
/// filled lazily, overwritten on each successful fetch and cleared on
/// failure. Stale reads are tolerated — the snapshot never gates requests.
pub struct ElevenLabsProvider {
    session: ProviderSession,
    client: Client,
    quota: RwLock<Option<QuotaSnapshot>>,
}

#[derive(Debug, Deserialize)]
struct VoicesEnvelope {
    #[serde(default)]
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    subscription: SubscriptionEntry,
}

#[derive(Debug, Deserialize)]
struct SubscriptionEntry {
    tier: String,
    character_count: u64,
    character_limit: u64,
    #[serde(default)]
    next_character_count_reset_unix: Option<i64>,
}

impl ElevenLabsProvider {
    pub fn new(session: ProviderSession) -> TtsResult<Self> {
        if session.api_key.is_empty() {
            return Err(TtsError::InvalidConfiguration(
                "ElevenLabs API key is required (LABSKEY)".to_string(),
            ));
        }
        Ok(Self {
            session,
            client: Client::new(),
            quota: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.session.base_url, path)
    }

    /// Fetch `/v1/user` and map it to a quota snapshot.
    async fn fetch_user(&self) -> TtsResult<QuotaSnapshot> {
        let response = self
            .client
            .get(self.url("/v1/user"))
            .header(API_KEY_HEADER, &self.session.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection_from_response(response).await);
        }

        let body = response.text().await?;
        let envelope: UserEnvelope = serde_json::from_str(&body)
            .map_err(|e| TtsError::MalformedResponse(format!("user response: {e}: {body}")))?;

        Ok(QuotaSnapshot {
            tier: envelope.subscription.tier,
            characters_used: envelope.subscription.character_count,
            character_limit: envelope.subscription.character_limit,
            reset_unix: envelope.subscription.next_character_count_reset_unix,
        })
    }

    /// Subscription tier from the cached snapshot, fetching it once per
    /// process if needed. Fetch failures clear the slot and yield `None`
    /// (tier unknown, no policy applied) — the batch is never blocked on
    /// this call.
    async fn cached_tier(&self) -> Option<String> {
        if let Some(snapshot) = self.quota.read().await.as_ref() {
            return Some(snapshot.tier.clone());
        }

        match self.fetch_user().await {
            Ok(snapshot) => {
                let tier = snapshot.tier.clone();
                *self.quota.write().await = Some(snapshot);
                Some(tier)
            }
            Err(e) => {
                debug!(error = %e, "quota fetch failed, tier unknown");
                *self.quota.write().await = None;
                None
            }
        }
    }
}

#[async_trait]
impl SynthesisProvider for ElevenLabsProvider {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> TtsResult<AudioStream> {
        let requested = ElevenLabsFormat::from_output_spec(request.output);

        // Tier capability policy: downgrade before sending, never error.
        let format = match self.cached_tier().await {
            Some(tier) => {
                let permitted = apply_tier_policy(&tier, requested);
                if permitted != requested {
                    warn!(
                        tier = %tier,
                        requested = requested.as_token(),
                        permitted = permitted.as_token(),
                        "output format downgraded by subscription tier"
                    );
                }
                permitted
            }
            None => requested,
        };

        let model_id = request
            .model_hint
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let body = json!({
            "text": request.text,
            "model_id": model_id,
            "voice_settings": {
                "stability": DEFAULT_STABILITY,
                "similarity_boost": DEFAULT_SIMILARITY_BOOST,
            },
        });

        debug!(
            voice = %request.voice_id,
            format = format.as_token(),
            text_len = request.text.len(),
            "synthesizing with ElevenLabs"
        );

        let response = self
            .client
            .post(self.url(&format!("/v1/text-to-speech/{}", request.voice_id)))
            .query(&[("output_format", format.as_token())])
            .header(API_KEY_HEADER, &self.session.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, format.accept_header())
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
            .unwrap_or_else(|| format.accept_header())
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
            .header(API_KEY_HEADER, &self.session.api_key)
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
            .map(|v| VoiceInfo {
                id: v.voice_id,
                name: v.name,
            })
            .collect())
    }

    async fn fetch_account_status(&self) -> TtsResult<Option<QuotaSnapshot>> {
        match self.fetch_user().await {
            Ok(snapshot) => {
                *self.quota.write().await = Some(snapshot.clone());
                Ok(Some(snapshot))
            }
            Err(e) => {
                // Invalidate the cache so a stale tier is not reused.
                *self.quota.write().await = None;
                Err(e)
            }
        }
    }
}
