//! Configuration model for pipelease.
//!
//! This module defines the Config struct that represents `config.yaml` at the
//! store root. It supports forward-compatible YAML parsing (unknown fields are
//! ignored), sensible defaults for optional fields, and validation of the
//! timing relationships the lease protocol depends on.

mod model;
mod operations;
pub mod types;


pub use model::Config;
