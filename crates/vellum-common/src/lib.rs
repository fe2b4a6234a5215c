//! Vellum common types, errors, and configuration.
//!
//! This crate provides shared definitions used across all Vellum components.

pub mod config;
pub mod error;

pub use config::TreeConfig;
pub use error::{Result, VellumError};
