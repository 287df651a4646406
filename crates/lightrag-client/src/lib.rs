//! lightrag-client - HTTP client for the LightRAG server API
//!
//! This crate implements the `Backend` trait from `lightrag-core` over
//! `reqwest`, including the newline-delimited streaming query endpoint.

mod http;
mod request;
mod stream;

#[cfg(test)]
pub(crate) mod test_server;

pub use http::{HttpBackend, API_KEY_HEADER};
pub use request::BackendRequest;
pub use stream::decode_chunks;
