//! cf-core: stable foundation for ctrlflow.
//!
//! Contains:
//! - ids (instrument identities + the registry that keeps them unique)
//! - units (signal units and the physical property each one measures)
//! - numeric (Real + float helpers)
//! - timing (UTC clock + tick interval statistics)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use timing::*;
pub use units::*;
