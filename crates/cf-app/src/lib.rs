//! Shared application service layer for ctrlflow.
//!
//! This crate gives the CLI one interface to plant files, plant construction,
//! timed runs, and run summaries.

pub mod error;
pub mod metrics;
pub mod plant;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use metrics::{LoopMetrics, compute_loop_metrics};
pub use plant::{Plant, Recorded};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{
    LoopListing, PlantSummary, SensorListing, describe_plant, list_loops, list_sensors,
    load_plant, save_plant, validate_plant,
};
pub use query::{InstrumentSummary, LoopSummary, RunSummary, signal_series, summarise_plant};
pub use run_service::{run_plant, run_plant_with_progress};
