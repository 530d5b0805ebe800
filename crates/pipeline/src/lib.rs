//! Generation job lifecycle tracker.
//!
//! Provides the job registry, the simulated per-job generation processor,
//! the catalog collaborator boundary, the periodic catalog merge scheduler,
//! and the [`GenerationService`] facade that wires them together.

pub mod catalog;
pub mod config;
pub mod merge;
pub mod processor;
pub mod registry;
pub mod service;
pub mod synthesis;

pub use catalog::{Catalog, CatalogError, InMemoryCatalog};
pub use config::EngineConfig;
pub use merge::{CatalogMergeScheduler, MergeReport};
pub use processor::{GenerationProcessor, ProgressionOutcome};
pub use registry::{AdvanceError, JobRegistry, NewJob};
pub use service::{GenerationService, JobView};
pub use synthesis::{ArtifactSynthesizer, GenerationError, MockSynthesizer};
