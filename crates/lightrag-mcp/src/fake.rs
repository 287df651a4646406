//! In-memory backend for dispatcher and server tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use lightrag_core::{
    Ack, Backend, ChunkStream, DocumentsResult, EntityExistsResult, EntityUpdate, GatewayError,
    GraphResult, HealthStatus, InsertResult, LabelsResult, PaginatedResult, PipelineStatus,
    QueryRequest, QueryResult, RelationUpdate, Result, ScanResult, StatusCounts, TextDocument,
    TrackStatus, UploadResult,
};

/// Records every call and answers with canned payloads.
#[derive(Default)]
pub struct FakeBackend {
    count: AtomicUsize,
    calls: Mutex<Vec<(String, Value)>>,
    closed: AtomicBool,
    delay: Option<Duration>,
    failure: Option<fn() -> GatewayError>,
    chunks: Vec<String>,
    stream_error: Option<String>,
}

impl FakeBackend {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call fails with the error `make` builds.
    pub fn failing(mut self, make: fn() -> GatewayError) -> Self {
        self.failure = Some(make);
        self
    }

    /// Chunks produced by `query_stream`, optionally followed by an error.
    pub fn with_chunks(mut self, chunks: &[&str], error: Option<&str>) -> Self {
        self.chunks = chunks.iter().map(|c| c.to_string()).collect();
        self.stream_error = error.map(str::to_string);
        self
    }

    pub fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn record(&self, name: &str, args: Value) -> Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push((name.to_string(), args));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }

    async fn answer<T: DeserializeOwned>(&self, name: &str, args: Value, body: Value) -> Result<T> {
        self.record(name, args).await?;
        Ok(serde_json::from_value(body)?)
    }
}

fn ok() -> Value {
    json!({"status": "success"})
}

#[async_trait]
impl Backend for FakeBackend {
    async fn insert_text(&self, content: &str, title: Option<&str>) -> Result<InsertResult> {
        let args = json!({"content": content, "title": title});
        self.answer("insert_text", args, json!({"status": "success", "track_id": "track-1"}))
            .await
    }

    async fn insert_many(&self, documents: &[TextDocument]) -> Result<InsertResult> {
        let args = serde_json::to_value(documents)?;
        self.answer("insert_many", args, json!({"status": "success", "track_id": "track-2"}))
            .await
    }

    async fn upload_file(&self, path: &Path) -> Result<UploadResult> {
        let args = json!({"path": path.display().to_string()});
        self.answer("upload_file", args, json!({"status": "success"})).await
    }

    async fn scan(&self) -> Result<ScanResult> {
        self.answer("scan", json!({}), json!({"status": "scanning_started"}))
            .await
    }

    async fn list_documents(&self) -> Result<DocumentsResult> {
        let body = json!({"statuses": {"processed": [{"id": "doc_1", "file_path": null}]}});
        self.answer("list_documents", json!({}), body).await
    }

    async fn list_documents_page(&self, page: u32, page_size: u32) -> Result<PaginatedResult> {
        let args = json!({"page": page, "page_size": page_size});
        let body = json!({
            "documents": [],
            "pagination": {"page": page, "page_size": page_size, "total_count": 0}
        });
        self.answer("list_documents_page", args, body).await
    }

    async fn delete_document(&self, document_id: &str) -> Result<Ack> {
        self.answer("delete_document", json!({"document_id": document_id}), ok())
            .await
    }

    async fn clear_documents(&self) -> Result<Ack> {
        self.answer("clear_documents", json!({}), ok()).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let args = serde_json::to_value(request)?;
        self.answer("query", args, json!({"response": "an answer"})).await
    }

    async fn query_stream(&self, request: &QueryRequest) -> Result<ChunkStream> {
        self.record("query_stream", serde_json::to_value(request)?).await?;
        let mut items: Vec<Result<String>> = self.chunks.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.stream_error {
            items.push(Err(GatewayError::stream(message.clone())));
        }
        Ok(stream::iter(items).boxed())
    }

    async fn get_graph(&self, label: Option<&str>) -> Result<GraphResult> {
        let body = json!({"nodes": [], "edges": [], "is_truncated": false});
        self.answer("get_graph", json!({"label": label}), body).await
    }

    async fn get_labels(&self) -> Result<LabelsResult> {
        self.answer("get_labels", json!({}), json!(["Person", "Place"]))
            .await
    }

    async fn entity_exists(&self, name: &str) -> Result<EntityExistsResult> {
        self.answer("entity_exists", json!({"name": name}), json!({"exists": true}))
            .await
    }

    async fn update_entity(&self, update: &EntityUpdate) -> Result<Ack> {
        let args = json!({"entity_name": update.target_name(), "properties": update.properties});
        self.answer("update_entity", args, ok()).await
    }

    async fn update_relation(&self, update: &RelationUpdate) -> Result<Ack> {
        let args = json!({
            "source_id": update.source_id,
            "target_id": update.target_id,
            "properties": update.properties,
        });
        self.answer("update_relation", args, ok()).await
    }

    async fn delete_entity(&self, entity_id: &str) -> Result<Ack> {
        self.answer("delete_entity", json!({"entity_id": entity_id}), ok())
            .await
    }

    async fn delete_relation(&self, relation_id: &str) -> Result<Ack> {
        self.answer("delete_relation", json!({"relation_id": relation_id}), ok())
            .await
    }

    async fn pipeline_status(&self) -> Result<PipelineStatus> {
        self.answer("pipeline_status", json!({}), json!({"busy": false}))
            .await
    }

    async fn track_status(&self, track_id: &str) -> Result<TrackStatus> {
        let body = json!({"track_id": track_id, "total_count": 0});
        self.answer("track_status", json!({"track_id": track_id}), body)
            .await
    }

    async fn status_counts(&self) -> Result<StatusCounts> {
        let body = json!({"status_counts": {"processed": 1}});
        self.answer("status_counts", json!({}), body).await
    }

    async fn clear_cache(&self, cache_type: Option<&str>) -> Result<Ack> {
        self.answer("clear_cache", json!({"cache_type": cache_type}), ok())
            .await
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.answer("health", json!({}), json!({"status": "healthy"}))
            .await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
