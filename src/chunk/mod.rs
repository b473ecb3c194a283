//! Chunked processing of transcripts that exceed what a single transform
//! request can carry.
//!
//! [`splitter`] cuts the document into bounded, overlapping windows at
//! natural text boundaries; [`processor`] runs the opaque transform over
//! each window and reassembles the outputs in document order.

pub mod processor;
pub mod splitter;

pub use processor::{process, ProcessingError};
pub use splitter::{split, Chunk, SplitterConfig};
