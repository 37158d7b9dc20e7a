//! Core types and configuration for the farm world simulation.

pub mod types;
pub mod species;
pub mod config;
pub mod error;

pub use error::{Error, Result};
pub use types::*;
pub use species::*;
pub use config::*;
