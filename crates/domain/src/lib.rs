//! # AssistKit Domain
//!
//! Domain types shared by the AssistKit crates.
//!
//! This crate contains:
//! - The application configuration tree (`AppConfig` and its sections)
//! - Domain error types and Result definitions
//! - Domain constants (default intervals, thresholds, preset breakers)
//!
//! ## Architecture
//! - No dependencies on other AssistKit crates
//! - No async runtime, no logging
//! - Pure data structures with serde support

pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
