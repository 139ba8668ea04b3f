//! # NestBuffer Domain
//!
//! Business domain types and models for NestBuffer.
//!
//! This crate contains:
//! - Feature records as exchanged with feature stores
//! - Survey points and the buffer features derived from them
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Field names and service constants
//!
//! ## Architecture
//! - No dependencies on other NestBuffer crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
