pub mod gate;
pub mod orchestrator;
pub mod tts;
pub mod wav;

pub use gate::{GatePermit, RequestGate};
pub use orchestrator::{BatchOptions, BatchReport, Orchestrator, SegmentReport};
pub use wav::repair_wav_header;
