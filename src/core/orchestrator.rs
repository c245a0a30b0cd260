//! Batch synthesis orchestration.
//!
//! The orchestrator turns raw input lines into independent synthesis
//! segments, dispatches each one through the provider's request gate, and
//! joins every per-segment outcome before reporting. A failing segment is
//! reported against its artifact name and never cancels its siblings; a
//! panicking segment task is converted to a reported failure rather than
//! taking the process down.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::core::gate::RequestGate;
use crate::core::tts::base::{
    FormatFamily, OutputSpec, QuotaSnapshot, SynthesisProvider, SynthesisRequest, TtsError,
};
use crate::core::wav::repair_wav_header;

/// Lines whose first non-whitespace character is this marker are dropped
/// before segmentation.
pub const COMMENT_MARKER: char = '#';

/// Default deadline for one gated provider call, matching the HTTP request
/// timeout used elsewhere.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Shared options for one orchestrated batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub voice_id: String,
    pub output: OutputSpec,
    /// Provider-specific model override.
    pub model_hint: Option<String>,
    /// Artifact root: artifacts are named `<root>.<ext>` in joined mode or
    /// `<root>-<n>.<ext>` in split mode. May include a directory prefix.
    pub output_root: String,
    /// One artifact per retained input line instead of one joined artifact.
    pub split: bool,
    /// Deadline for each gated call; a hung provider call must not block
    /// the gate forever.
    pub timeout: Duration,
}

/// One unit of input text bound to its target artifact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub artifact: String,
}

/// Outcome for one segment: bytes written, or the error that stopped it.
#[derive(Debug)]
pub struct SegmentReport {
    pub artifact: String,
    pub result: Result<u64, TtsError>,
}

impl SegmentReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Joined outcome of a batch, plus the optional account enrichment.
#[derive(Debug)]
pub struct BatchReport {
    /// Per-segment reports in input order.
    pub segments: Vec<SegmentReport>,
    /// Best-effort quota snapshot; `None` when unsupported or unavailable.
    pub quota: Option<QuotaSnapshot>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.segments.iter().filter(|s| s.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.segments.len() - self.succeeded()
    }
}

/// Drives a batch of segments through one provider client.
pub struct Orchestrator {
    provider: Arc<dyn SynthesisProvider>,
    gate: RequestGate,
}

impl Orchestrator {
    /// Wrap a provider client with its own single-flight gate. Gates are
    /// per-provider; two orchestrators never block each other.
    pub fn new(provider: Arc<dyn SynthesisProvider>) -> Self {
        Self {
            provider,
            gate: RequestGate::new(),
        }
    }

    /// Run one batch: segment, dispatch concurrently, join in input order.
    pub async fn run_batch(&self, lines: &[String], options: &BatchOptions) -> BatchReport {
        let ext = options.output.family.extension();
        let segments = plan_segments(lines, &options.output_root, ext, options.split);

        info!(
            provider = self.provider.name(),
            segments = segments.len(),
            split = options.split,
            "dispatching synthesis batch"
        );

        let mut handles = Vec::with_capacity(segments.len());
        for segment in segments {
            let provider = Arc::clone(&self.provider);
            let gate = self.gate.clone();
            let options = options.clone();
            let artifact = segment.artifact.clone();
            let handle =
                tokio::spawn(async move { synthesize_segment(provider, gate, segment, options).await });
            handles.push((artifact, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (artifact, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                // A panicked segment becomes a reported failure, not a crash.
                Err(e) => SegmentReport {
                    artifact,
                    result: Err(TtsError::Internal(format!("segment task failed: {e}"))),
                },
            };
            match &report.result {
                Ok(bytes) => info!(artifact = %report.artifact, bytes, "wrote artifact"),
                Err(e) => error!(artifact = %report.artifact, error = %e, "segment failed"),
            }
            reports.push(report);
        }

        // Enrichment only: a failed status fetch never affects the batch.
        let quota = match self.provider.fetch_account_status().await {
            Ok(quota) => quota,
            Err(e) => {
                debug!(error = %e, "account status unavailable");
                None
            }
        };

        BatchReport {
            segments: reports,
            quota,
        }
    }
}

/// Drop blank and comment lines, then map the rest to segments.
///
/// Split mode gives each retained line its own artifact, numbered 1-based
/// over retained lines only; joined mode emits a single newline-joined
/// segment. No retained lines means no segments.
pub fn plan_segments(lines: &[String], root: &str, ext: &str, split: bool) -> Vec<Segment> {
    let retained: Vec<&str> = lines
        .iter()
        .map(|line| line.as_str())
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with(COMMENT_MARKER)
        })
        .collect();

    if retained.is_empty() {
        return Vec::new();
    }

    if split {
        retained
            .iter()
            .enumerate()
            .map(|(i, text)| Segment {
                text: (*text).to_string(),
                artifact: format!("{root}-{}.{ext}", i + 1),
            })
            .collect()
    } else {
        vec![Segment {
            text: retained.join("\n"),
            artifact: format!("{root}.{ext}"),
        }]
    }
}

async fn synthesize_segment(
    provider: Arc<dyn SynthesisProvider>,
    gate: RequestGate,
    segment: Segment,
    options: BatchOptions,
) -> SegmentReport {
    let artifact = segment.artifact.clone();
    let result = run_segment(provider, gate, segment, &options).await;
    SegmentReport { artifact, result }
}

async fn run_segment(
    provider: Arc<dyn SynthesisProvider>,
    gate: RequestGate,
    segment: Segment,
    options: &BatchOptions,
) -> Result<u64, TtsError> {
    let request = SynthesisRequest::new(
        segment.text,
        options.voice_id.clone(),
        options.output,
        options.model_hint.clone(),
    )?;

    let deadline = options.timeout;
    // The permit is held across the whole provider interaction, body drain
    // included: the rationale for the gate is that providers reject
    // overlapping connections, and the body transfer is part of the
    // connection. The deadline bounds the same scope so a hung call cannot
    // wedge the gate.
    gate.run(async {
        match tokio::time::timeout(deadline, deliver(&provider, &request, &segment.artifact)).await
        {
            Ok(result) => result,
            Err(_) => Err(TtsError::Timeout(deadline.as_secs())),
        }
    })
    .await
}

/// Fetch the audio and write the artifact.
///
/// WAV-family output is buffered fully so the container header can be
/// repaired once the total length is known; compressed output is streamed
/// straight to disk.
async fn deliver(
    provider: &Arc<dyn SynthesisProvider>,
    request: &SynthesisRequest,
    artifact: &str,
) -> Result<u64, TtsError> {
    let audio = provider.synthesize(request).await?;
    debug!(artifact, content_type = %audio.content_type, "writing artifact");

    match request.output.family {
        FormatFamily::Wav => {
            let repaired = repair_wav_header(audio.collect().await?);
            tokio::fs::write(artifact, &repaired).await?;
            Ok(repaired.len() as u64)
        }
        FormatFamily::Mp3 => {
            let file = File::create(artifact).await?;
            match write_stream(file, audio.stream).await {
                Ok(written) => Ok(written),
                Err(e) => {
                    // A failed segment must not leave a partial artifact
                    // behind; the report and the filesystem have to agree.
                    if let Err(rm) = tokio::fs::remove_file(artifact).await {
                        debug!(artifact, error = %rm, "could not remove partial artifact");
                    }
                    Err(e)
                }
            }
        }
    }
}

async fn write_stream(
    mut file: File,
    mut stream: BoxStream<'static, reqwest::Result<Bytes>>,
) -> Result<u64, TtsError> {
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
