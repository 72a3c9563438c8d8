//! Core types for hackable-host
//!
//! This crate provides the foundational error types, frontend
//! configuration, and logging infrastructure shared by the host crates.

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{AudioError, ContentError, HostError, ModuleError, Result};
