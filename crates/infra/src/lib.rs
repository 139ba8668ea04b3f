//! # NestBuffer Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - HTTP transport with retries and ArcGIS error detection
//! - ArcGIS REST adapters (token session, feature layers, geometry service)
//! - Configuration loading from environment and files
//! - Single-instance locking
//!
//! ## Architecture
//! - Implements traits defined in `nestbuffer-core`
//! - Contains all "impure" code (network and file system I/O)

pub mod arcgis;
pub mod config;
pub mod errors;
pub mod http;
pub mod instance_lock;

// Re-export commonly used items
pub use arcgis::{AccessTokenProvider, ArcGisSession, FeatureLayerClient, GeometryServiceClient};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use instance_lock::InstanceLock;
