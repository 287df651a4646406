//! lightrag-core - Core types and traits for the LightRAG gateway
//!
//! This crate provides the backend result schemas, the error taxonomy,
//! configuration, and the `Backend` trait shared by the HTTP client and
//! the MCP tool layer.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{ErrorKind, GatewayError, Result};
pub use traits::*;
pub use types::*;
