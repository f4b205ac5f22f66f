//! # docuflow-core
//!
//! Core types, traits, and abstractions for the docuflow pipeline.
//!
//! This crate provides the foundational data structures the other docuflow
//! crates depend on: the error taxonomy, the task record and its forward-only
//! stage machine, the task store trait with an in-memory implementation, and
//! the mode registry.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod modes;
pub mod store;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::{
    AudioWindow, Department, EvidenceFrame, GenerationRequest, MediaProxy, OutputFormat,
    SessionRef, Task, TaskError, TaskSource, TaskStage, TaskView,
};
pub use modes::{Mode, ModeRegistry};
pub use store::{InMemoryTaskStore, TaskStore};
