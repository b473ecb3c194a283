//! Recording-to-processed-transcript pipeline.
//!
//! fetch metadata → download audio → transcribe → chunk → transform → store

pub mod machine;
pub mod status;

pub use machine::{PipelineError, PipelineMachine};
pub use status::{PipelinePhase, PipelineState, PipelineStatusHandle};
