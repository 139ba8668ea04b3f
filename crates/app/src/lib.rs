//! # NestBuffer App
//!
//! Command-line application layer.
//!
//! This crate contains:
//! - CLI parsing
//! - Application context (dependency injection)
//! - Command handlers and terminal output
//! - Logging setup
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires the ArcGIS adapters into the sync service

pub mod cli;
pub mod commands;
pub mod context;
pub mod logging;

pub use context::AppContext;
