//! CSV input and JSON output for the wane sweep harness.
//!
//! Provides a validating CSV pool reader and a JSON result writer for
//! sweep and feature-importance artifacts.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::ExperimentName;
pub use error::IoError;
pub use reader::{PoolReader, PoolTable};
pub use writer::ResultWriter;
