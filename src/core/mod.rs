//! Core types shared by every other module: the error enum, the crate
//! [`Result`] alias, and the [`ExecutionContext`] threaded through
//! downloads, resolution, and recipe runs.

mod context;
mod error;

pub use context::{CancelHandle, ExecutionContext};
pub use error::{RegraftError, Result};
