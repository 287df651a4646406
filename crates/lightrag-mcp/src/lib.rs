//! lightrag-mcp - MCP tool layer for a LightRAG server
//!
//! This crate exposes the LightRAG HTTP API as MCP tools: it validates tool
//! arguments, dispatches them to a `Backend`, and normalizes results and
//! errors into the tool-result envelope.
//!
//! # Tools
//!
//! - Documents: `insert_text`, `insert_texts`, `upload_document`,
//!   `scan_documents`, `get_documents`, `get_documents_paginated`,
//!   `delete_document`, `clear_documents`
//! - Queries: `query_text`, `query_text_stream`
//! - Knowledge graph: `get_knowledge_graph`, `get_graph_labels`,
//!   `check_entity_exists`, `update_entity`, `update_relation`,
//!   `delete_entity`, `delete_relation`
//! - System: `get_pipeline_status`, `get_track_status`,
//!   `get_document_status_counts`, `clear_cache`, `get_health`

pub mod aggregate;
pub mod catalog;
mod dispatch;
mod outcome;
mod server;
pub mod validate;

#[cfg(test)]
mod fake;

pub use aggregate::{ChunkSender, Collected};
pub use catalog::{ToolSpec, STREAMING_TOOL, TOOLS};
pub use dispatch::{BackendFactory, Dispatcher};
pub use outcome::{ToolFailure, ToolOutcome};
pub use server::{identity, McpServer};
