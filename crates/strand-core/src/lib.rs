//! `strand-core`: shared types for the strand executor workspace.
//!
//! Holds what every strand crate agrees on: configuration loading, the error
//! taxonomy, call identifiers and the clock the scheduler runs on.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ExecutorConfig, StrandConfig};
pub use error::{Result, StrandError};
pub use types::{CallId, CallIdAllocator, Deadline};
