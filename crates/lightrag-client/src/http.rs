//! HTTP implementation of the `Backend` trait.

use std::error::Error as StdError;
use std::path::Path;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use lightrag_core::{
    Ack, Backend, BackendConfig, ChunkStream, DocumentsResult, EntityExistsResult, EntityUpdate,
    GatewayError, GraphResult, HealthStatus, InsertResult, LabelsResult, PaginatedResult,
    PipelineStatus, QueryRequest, QueryResult, RelationUpdate, Result, ScanResult, StatusCounts,
    TextDocument, TrackStatus, UploadResult,
};

use crate::request::BackendRequest;
use crate::stream::decode_chunks;

/// Header carrying the backend credential.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Label that selects the whole knowledge graph.
const ALL_LABELS: &str = "*";

/// LightRAG backend reached over HTTP.
///
/// Holds one `reqwest::Client`, so every call shares the same connection
/// pool. The API key and timeout are fixed at construction.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Build a client for the configured backend.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            GatewayError::config(format!("Invalid backend URL {:?}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::config(format!(
                "Backend URL {} cannot carry a path",
                base_url
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key)
                .map_err(|_| GatewayError::config("API key contains characters not allowed in a header"))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let timeout = config.timeout()?;
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "LightRAG backend at {} (timeout {:?}, api key {})",
            base_url,
            timeout,
            if config.api_key.is_some() { "set" } else { "unset" }
        );

        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn builder(&self, request: &BackendRequest) -> Result<RequestBuilder> {
        let url = request.url(&self.base_url)?;
        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            // Sets the body on any method, DELETE included.
            builder = builder.json(body);
        }
        Ok(builder)
    }

    async fn send(&self, request: &BackendRequest) -> Result<Response> {
        debug!("{} {}", request.method, request.path());
        let response = self.builder(request)?.send().await.map_err(transport_error)?;
        ensure_success(response).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: BackendRequest) -> Result<T> {
        let response = self.send(&request).await?;
        read_json(response).await
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<body unavailable: {}>", describe(&e)));
    warn!("Backend answered {}", status);
    Err(GatewayError::from_status(status.as_u16(), body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(transport_error)?;
    let parsed = if body.trim().is_empty() {
        serde_json::from_str("{}")
    } else {
        serde_json::from_str(&body)
    };
    parsed.map_err(|e| GatewayError::Decode {
        status,
        message: e.to_string(),
        body,
    })
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    let message = describe(&err);
    if err.is_timeout() {
        GatewayError::timeout(message)
    } else {
        GatewayError::connection(message)
    }
}

/// Failure while reading an already-open stream.
fn stream_error(err: reqwest::Error) -> GatewayError {
    let message = describe(&err);
    if err.is_timeout() {
        GatewayError::timeout(message)
    } else {
        GatewayError::stream(message)
    }
}

fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl Backend for HttpBackend {
    async fn insert_text(&self, content: &str, title: Option<&str>) -> Result<InsertResult> {
        info!("Inserting text document ({} bytes)", content.len());
        let mut body = json!({ "content": content });
        if let Some(title) = title {
            body["title"] = Value::String(title.to_string());
        }
        self.execute(BackendRequest::post("/documents/text").json(body))
            .await
    }

    async fn insert_many(&self, documents: &[TextDocument]) -> Result<InsertResult> {
        info!("Inserting {} text documents", documents.len());
        let body = serde_json::to_value(documents)?;
        self.execute(BackendRequest::post("/documents/texts").json(body))
            .await
    }

    async fn upload_file(&self, path: &Path) -> Result<UploadResult> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            GatewayError::validation(format!("File not found: {} ({})", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(GatewayError::validation(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        info!("Uploading {} ({} bytes)", file_name, bytes.len());

        let request = BackendRequest::post("/documents/upload");
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let response = self
            .builder(&request)?
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(ensure_success(response).await?).await
    }

    async fn scan(&self) -> Result<ScanResult> {
        info!("Requesting input directory scan");
        self.execute(BackendRequest::post("/documents/scan")).await
    }

    async fn list_documents(&self) -> Result<DocumentsResult> {
        self.execute(BackendRequest::get("/documents")).await
    }

    async fn list_documents_page(&self, page: u32, page_size: u32) -> Result<PaginatedResult> {
        let body = json!({ "page": page, "page_size": page_size });
        self.execute(BackendRequest::post("/documents/paginated").json(body))
            .await
    }

    async fn delete_document(&self, document_id: &str) -> Result<Ack> {
        info!("Deleting document {}", document_id);
        let body = json!({ "document_id": document_id });
        self.execute(BackendRequest::delete("/documents/delete_document").json(body))
            .await
    }

    async fn clear_documents(&self) -> Result<Ack> {
        warn!("Clearing all documents");
        self.execute(BackendRequest::delete("/documents")).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        debug!("Query in {} mode", request.mode);
        let body = serde_json::to_value(request)?;
        self.execute(BackendRequest::post("/query").json(body)).await
    }

    async fn query_stream(&self, request: &QueryRequest) -> Result<ChunkStream> {
        debug!("Streaming query in {} mode", request.mode);
        let mut body = serde_json::to_value(request)?;
        body["stream"] = Value::Bool(true);

        let response = self
            .send(&BackendRequest::post("/query/stream").json(body))
            .await?;
        Ok(decode_chunks(response.bytes_stream().map_err(stream_error)))
    }

    async fn get_graph(&self, label: Option<&str>) -> Result<GraphResult> {
        let label = label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(ALL_LABELS);
        self.execute(BackendRequest::get("/graphs").query("label", label))
            .await
    }

    async fn get_labels(&self) -> Result<LabelsResult> {
        self.execute(BackendRequest::get("/graph/label/list")).await
    }

    async fn entity_exists(&self, name: &str) -> Result<EntityExistsResult> {
        self.execute(BackendRequest::get("/graph/entity/exists").query("name", name))
            .await
    }

    async fn update_entity(&self, update: &EntityUpdate) -> Result<Ack> {
        info!("Updating entity {}", update.target_name());
        let body = json!({
            "entity_name": update.target_name(),
            "updated_data": update.properties,
            "allow_rename": false,
        });
        self.execute(BackendRequest::post("/graph/entity/edit").json(body))
            .await
    }

    async fn update_relation(&self, update: &RelationUpdate) -> Result<Ack> {
        info!("Updating relation {} -> {}", update.source_id, update.target_id);
        let body = json!({
            "source_id": update.source_id,
            "target_id": update.target_id,
            "updated_data": update.properties,
        });
        self.execute(BackendRequest::post("/graph/relation/edit").json(body))
            .await
    }

    async fn delete_entity(&self, entity_id: &str) -> Result<Ack> {
        info!("Deleting entity {}", entity_id);
        let body = json!({ "entity_id": entity_id });
        self.execute(BackendRequest::delete("/documents/delete_entity").json(body))
            .await
    }

    async fn delete_relation(&self, relation_id: &str) -> Result<Ack> {
        info!("Deleting relation {}", relation_id);
        let body = json!({ "relation_id": relation_id });
        self.execute(BackendRequest::delete("/documents/delete_relation").json(body))
            .await
    }

    async fn pipeline_status(&self) -> Result<PipelineStatus> {
        self.execute(BackendRequest::get("/documents/pipeline_status"))
            .await
    }

    async fn track_status(&self, track_id: &str) -> Result<TrackStatus> {
        self.execute(BackendRequest::get("/documents/track_status").param(track_id))
            .await
    }

    async fn status_counts(&self) -> Result<StatusCounts> {
        self.execute(BackendRequest::get("/documents/status_counts"))
            .await
    }

    async fn clear_cache(&self, cache_type: Option<&str>) -> Result<Ack> {
        info!("Clearing cache ({})", cache_type.unwrap_or("all"));
        let body = match cache_type {
            Some(kind) => json!({ "cache_type": kind }),
            None => json!({}),
        };
        self.execute(BackendRequest::post("/documents/clear_cache").json(body))
            .await
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.execute(BackendRequest::get("/health")).await
    }

    async fn close(&self) {
        debug!("Closing backend client for {}", self.base_url);
    }
}
