//! Filesystem utilities for pipelease.
//!
//! The durable stores rely on atomic writes so a crash mid-write never leaves
//! a torn lease or pipeline file behind.

pub mod atomic;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
