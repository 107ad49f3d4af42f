// =============================================================================
// Indicator Engine — off-thread technical indicator computation
// =============================================================================
//
// A `Coordinator` fronts a single-threaded `ComputeBackend`. Callers hand it
// a bar history plus an indicator name and parameters; the coordinator moves
// the history to the backend only when its signature changes and coalesces
// identical requests into one computation.
// =============================================================================

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod dataset;
pub mod error;
pub mod indicators;
pub mod protocol;
pub mod types;

pub use config::EngineConfig;
pub use coordinator::Coordinator;
pub use dataset::{Columns, Dataset, DatasetId};
pub use error::ComputeError;
pub use indicators::Indicator;
pub use types::{Bar, Record, Series};
