//! HTTP transport shared by the ArcGIS adapters

mod client;

pub use client::{HttpClient, HttpClientBuilder};
