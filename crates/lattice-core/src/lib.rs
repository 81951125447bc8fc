//! Lattice CI Core
//!
//! Core domain types, traits, and error handling for the Lattice
//! matrix orchestrator. This crate has minimal dependencies and
//! defines the shared vocabulary used across all other crates.

pub mod error;
pub mod fingerprint;
pub mod glob;
pub mod ids;
pub mod interpolation;
pub mod job;
pub mod pipeline;
pub mod ports;
pub mod trigger;

pub use error::{Error, Result};
pub use ids::*;
