//! Core traits defining the interface to the LightRAG backend.

use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{
    Ack, DocumentsResult, EntityExistsResult, EntityUpdate, GraphResult, HealthStatus,
    InsertResult, LabelsResult, PaginatedResult, PipelineStatus, QueryRequest, QueryResult,
    RelationUpdate, ScanResult, StatusCounts, TextDocument, TrackStatus, UploadResult,
};

/// Ordered text fragments of a streaming query.
///
/// The stream is finite and can be consumed once. Dropping it aborts the
/// underlying exchange.
pub type ChunkStream = BoxStream<'static, Result<String>>;

/// One async method per backend capability.
///
/// Each call maps to exactly one HTTP exchange and either returns the parsed
/// backend payload or a typed error.
#[async_trait]
pub trait Backend: Send + Sync {
    // Document operations
    async fn insert_text(&self, content: &str, title: Option<&str>) -> Result<InsertResult>;
    async fn insert_many(&self, documents: &[TextDocument]) -> Result<InsertResult>;
    async fn upload_file(&self, path: &Path) -> Result<UploadResult>;
    async fn scan(&self) -> Result<ScanResult>;
    async fn list_documents(&self) -> Result<DocumentsResult>;
    async fn list_documents_page(&self, page: u32, page_size: u32) -> Result<PaginatedResult>;
    async fn delete_document(&self, document_id: &str) -> Result<Ack>;
    async fn clear_documents(&self) -> Result<Ack>;

    // Query operations
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult>;
    async fn query_stream(&self, request: &QueryRequest) -> Result<ChunkStream>;

    // Knowledge graph operations
    async fn get_graph(&self, label: Option<&str>) -> Result<GraphResult>;
    async fn get_labels(&self) -> Result<LabelsResult>;
    async fn entity_exists(&self, name: &str) -> Result<EntityExistsResult>;
    async fn update_entity(&self, update: &EntityUpdate) -> Result<Ack>;
    async fn update_relation(&self, update: &RelationUpdate) -> Result<Ack>;
    async fn delete_entity(&self, entity_id: &str) -> Result<Ack>;
    async fn delete_relation(&self, relation_id: &str) -> Result<Ack>;

    // System operations
    async fn pipeline_status(&self) -> Result<PipelineStatus>;
    async fn track_status(&self, track_id: &str) -> Result<TrackStatus>;
    async fn status_counts(&self) -> Result<StatusCounts>;
    async fn clear_cache(&self, cache_type: Option<&str>) -> Result<Ack>;
    async fn health(&self) -> Result<HealthStatus>;

    /// Release held connections. Called once on shutdown.
    async fn close(&self) {}
}
