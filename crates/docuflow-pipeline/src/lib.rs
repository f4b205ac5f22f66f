//! # docuflow-pipeline
//!
//! The media-to-documentation pipeline: relevance segmentation, evidence
//! extraction, context enrichment, prompt assembly, generation, and the
//! `Pipeline` front door that drives a task from upload to markdown.

pub mod config;
pub mod enrich;
pub mod evidence;
pub mod generator;
pub mod prompt;
pub mod runner;
pub mod segmenter;

pub use config::{CeilingPolicy, PipelineConfig};
pub use enrich::{ContextEnricher, HttpEnricher, NoopEnricher};
pub use runner::Pipeline;
