//! Parallel SRT translation and caption gap detection.
//! The pipeline parses blocks, translates them on a bounded worker pool and
//! reassembles the output by index.

pub mod config;
pub mod error;
pub mod gaps;
pub mod language;
pub mod srt;
pub mod translate;
