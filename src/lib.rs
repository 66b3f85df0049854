//! NetSound Fetcher Library
//!
//! A Rust library for curating lists of direct audio download URLs from an
//! Internet-Archive-style media catalog. Searches run in tiers, item manifests
//! are filtered and ranked, and an optional history ledger keeps runs from
//! repeating each other.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
