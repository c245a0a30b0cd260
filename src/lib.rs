//! say2file: batch text-to-speech synthesis into audio files.
//!
//! The crate turns lines of text into audio artifacts on disk through a
//! pluggable TTS provider (ElevenLabs or IBM Watson). Requests to a provider
//! are serialized through a single-slot admission gate, WAV output has its
//! container sizes repaired before it is written, and each input line can be
//! rendered to its own file or all lines joined into one.
//!
//! # Architecture
//!
//! - [`config`]: environment plus CLI override resolution into [`config::Settings`]
//! - [`core::tts`]: the [`core::tts::SynthesisProvider`] trait and its two backends
//! - [`core::gate`]: single-flight FIFO admission for provider requests
//! - [`core::orchestrator`]: batch planning, per-segment delivery, reporting
//! - [`core::wav`]: RIFF/WAVE size-field repair for buffered WAV audio

pub mod config;
pub mod core;

pub use config::{Overrides, Settings};
pub use core::gate::RequestGate;
pub use core::orchestrator::{BatchOptions, BatchReport, Orchestrator};
pub use core::tts::{SynthesisProvider, TtsError, TtsResult, create_provider};
