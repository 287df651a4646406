//! The tool catalog: names, argument declarations and handlers.
//!
//! `TOOLS` is the only place a tool is defined. Each entry carries the
//! validator's param table and the argument struct its JSON schema is
//! derived from.

use std::path::PathBuf;

use futures::future::BoxFuture;
use futures::FutureExt;
use rmcp::model::Tool;
use rmcp::schemars::{self, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lightrag_core::{
    Backend, EntityUpdate, GatewayError, JsonObject, QueryMode, QueryRequest, RelationUpdate,
    Result, TextDocument,
};

use crate::aggregate::{self, ChunkSender};
use crate::validate::{Constraint, Param};

/// Tool that streams its answer.
pub const STREAMING_TOOL: &str = "query_text_stream";

/// Handler of one tool. Receives validated arguments.
pub type Handler = for<'a> fn(ToolCall<'a>) -> BoxFuture<'a, Result<Value>>;

/// Static description of a tool.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [Param],
    /// JSON schema of the arguments, derived from the handler's params struct.
    pub schema: fn() -> JsonObject,
    pub handler: Handler,
}

/// Everything a handler needs for one call.
pub struct ToolCall<'a> {
    pub backend: &'a dyn Backend,
    pub arguments: JsonObject,
    pub chunks: Option<ChunkSender>,
}

impl ToolCall<'_> {
    fn params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.arguments.clone()))
            .map_err(|e| GatewayError::validation(format!("Invalid arguments: {}", e)))
    }
}

impl ToolSpec {
    /// JSON schema for the tool's arguments.
    pub fn input_schema(&self) -> JsonObject {
        (self.schema)()
    }

    /// Tool metadata as advertised by `tools/list`.
    pub fn tool(&self) -> Tool {
        Tool::new(self.name, self.description, self.input_schema())
    }
}

fn schema<T: JsonSchema>() -> JsonObject {
    let mut object = match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(object)) => object,
        _ => JsonObject::new(),
    };
    object.remove("$schema");
    object.remove("title");
    object.remove("description");
    object.insert("type".to_string(), Value::from("object"));
    object
        .entry("properties")
        .or_insert_with(|| Value::Object(JsonObject::new()));
    object
}

fn mode_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    let modes: Vec<&str> = QueryMode::ALL.iter().map(QueryMode::as_str).collect();
    schemars::json_schema!({
        "type": "string",
        "enum": modes,
        "default": QueryMode::default().as_str(),
    })
}

fn documents_schema(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "array",
        "minItems": 1,
        "items": {
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "content": {"type": "string"},
                "metadata": {"type": "object"}
            },
            "required": ["content"]
        }
    })
}

/// Look up a tool by name.
pub fn find(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|spec| spec.name == name)
}

/// Metadata for every tool, in catalog order.
pub fn tools() -> Vec<Tool> {
    TOOLS.iter().map(ToolSpec::tool).collect()
}

const QUERY_PARAMS: &[Param] = &[
    Param::required("query", Constraint::Text),
    Param::optional("mode", Constraint::Mode),
    Param::optional("only_need_context", Constraint::Flag),
];

pub static TOOLS: &[ToolSpec] = &[
    // Documents
    ToolSpec {
        name: "insert_text",
        description: "Insert text content into LightRAG",
        params: &[
            Param::required("text", Constraint::Text),
            Param::optional("title", Constraint::String),
        ],
        schema: schema::<InsertTextParams>,
        handler: insert_text,
    },
    ToolSpec {
        name: "insert_texts",
        description: "Insert multiple text documents into LightRAG",
        params: &[Param::required("texts", Constraint::Documents)],
        schema: schema::<InsertTextsParams>,
        handler: insert_texts,
    },
    ToolSpec {
        name: "upload_document",
        description: "Upload a local document file to LightRAG",
        params: &[Param::required("file_path", Constraint::Text)],
        schema: schema::<UploadParams>,
        handler: upload_document,
    },
    ToolSpec {
        name: "scan_documents",
        description: "Scan the input directory for new documents",
        params: &[],
        schema: schema::<NoParams>,
        handler: scan_documents,
    },
    ToolSpec {
        name: "get_documents",
        description: "Retrieve all documents from LightRAG",
        params: &[],
        schema: schema::<NoParams>,
        handler: get_documents,
    },
    ToolSpec {
        name: "get_documents_paginated",
        description: "Retrieve documents with pagination",
        params: &[
            Param::required("page", Constraint::Integer { min: 1, max: None }),
            Param::required("page_size", Constraint::Integer { min: 1, max: Some(100) }),
        ],
        schema: schema::<PageParams>,
        handler: get_documents_paginated,
    },
    ToolSpec {
        name: "delete_document",
        description: "Delete a document by ID",
        params: &[Param::required("document_id", Constraint::Text)],
        schema: schema::<DocumentParams>,
        handler: delete_document,
    },
    ToolSpec {
        name: "clear_documents",
        description: "Remove all documents from LightRAG",
        params: &[],
        schema: schema::<NoParams>,
        handler: clear_documents,
    },
    // Queries
    ToolSpec {
        name: "query_text",
        description: "Query LightRAG with text",
        params: QUERY_PARAMS,
        schema: schema::<QueryParams>,
        handler: query_text,
    },
    ToolSpec {
        name: STREAMING_TOOL,
        description: "Stream query results from LightRAG",
        params: QUERY_PARAMS,
        schema: schema::<QueryParams>,
        handler: query_text_stream,
    },
    // Knowledge graph
    ToolSpec {
        name: "get_knowledge_graph",
        description: "Retrieve the knowledge graph, optionally restricted to one label",
        params: &[Param::optional("label", Constraint::String)],
        schema: schema::<GraphParams>,
        handler: get_knowledge_graph,
    },
    ToolSpec {
        name: "get_graph_labels",
        description: "List labels in the knowledge graph",
        params: &[],
        schema: schema::<NoParams>,
        handler: get_graph_labels,
    },
    ToolSpec {
        name: "check_entity_exists",
        description: "Check whether an entity exists in the knowledge graph",
        params: &[Param::required("entity_name", Constraint::Text)],
        schema: schema::<EntityNameParams>,
        handler: check_entity_exists,
    },
    ToolSpec {
        name: "update_entity",
        description: "Update properties of a knowledge graph entity",
        params: &[
            Param::required("entity_id", Constraint::Text),
            Param::required("properties", Constraint::Object),
            Param::optional("entity_name", Constraint::Text),
        ],
        schema: schema::<UpdateEntityParams>,
        handler: update_entity,
    },
    ToolSpec {
        name: "update_relation",
        description: "Update properties of the relation between two entities",
        params: &[
            Param::required("source_id", Constraint::Text),
            Param::required("target_id", Constraint::Text),
            Param::required("properties", Constraint::Object),
        ],
        schema: schema::<UpdateRelationParams>,
        handler: update_relation,
    },
    ToolSpec {
        name: "delete_entity",
        description: "Delete an entity from the knowledge graph",
        params: &[Param::required("entity_id", Constraint::Text)],
        schema: schema::<EntityParams>,
        handler: delete_entity,
    },
    ToolSpec {
        name: "delete_relation",
        description: "Delete a relation from the knowledge graph",
        params: &[Param::required("relation_id", Constraint::Text)],
        schema: schema::<RelationParams>,
        handler: delete_relation,
    },
    // System
    ToolSpec {
        name: "get_pipeline_status",
        description: "Get the document processing pipeline status",
        params: &[],
        schema: schema::<NoParams>,
        handler: get_pipeline_status,
    },
    ToolSpec {
        name: "get_track_status",
        description: "Get processing status for a track ID",
        params: &[Param::required("track_id", Constraint::Text)],
        schema: schema::<TrackParams>,
        handler: get_track_status,
    },
    ToolSpec {
        name: "get_document_status_counts",
        description: "Get document counts per processing status",
        params: &[],
        schema: schema::<NoParams>,
        handler: get_document_status_counts,
    },
    ToolSpec {
        name: "clear_cache",
        description: "Clear LightRAG caches",
        params: &[Param::optional("cache_type", Constraint::String)],
        schema: schema::<CacheParams>,
        handler: clear_cache,
    },
    ToolSpec {
        name: "get_health",
        description: "Check LightRAG server health",
        params: &[],
        schema: schema::<NoParams>,
        handler: get_health,
    },
];

// Argument shapes. Read after validation; their schemas are what clients see.

#[derive(Debug, Deserialize, JsonSchema)]
struct NoParams {}

#[derive(Debug, Deserialize, JsonSchema)]
struct InsertTextParams {
    /// Text content to insert
    text: String,
    /// Optional document title
    title: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct InsertTextsParams {
    /// Documents to insert
    #[schemars(schema_with = "documents_schema")]
    texts: Vec<TextDocument>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UploadParams {
    /// Path to the file to upload
    file_path: PathBuf,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PageParams {
    /// Page number (1-based)
    #[schemars(range(min = 1))]
    page: u32,
    /// Number of documents per page
    #[schemars(range(min = 1, max = 100))]
    page_size: u32,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DocumentParams {
    /// ID of the document to delete
    document_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct QueryParams {
    /// Query text
    query: String,
    /// Retrieval mode
    #[serde(default)]
    #[schemars(schema_with = "mode_schema")]
    mode: QueryMode,
    /// Return only the retrieved context without generating an answer
    #[serde(default)]
    only_need_context: bool,
}

impl QueryParams {
    fn into_request(self) -> QueryRequest {
        QueryRequest {
            query: self.query,
            mode: self.mode,
            only_need_context: self.only_need_context,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GraphParams {
    /// Node label, `*` for the whole graph
    label: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct EntityNameParams {
    /// Name of the entity
    entity_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UpdateEntityParams {
    /// ID of the entity to update
    entity_id: String,
    /// Properties to set
    properties: JsonObject,
    /// Entity name, when it differs from the ID
    entity_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UpdateRelationParams {
    /// Source entity of the relation
    source_id: String,
    /// Target entity of the relation
    target_id: String,
    /// Properties to set
    properties: JsonObject,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct EntityParams {
    /// ID of the entity to delete
    entity_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RelationParams {
    /// ID of the relation to delete
    relation_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TrackParams {
    /// Track ID returned by an insert or upload
    track_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CacheParams {
    /// Cache to clear; all when omitted
    cache_type: Option<String>,
}

fn payload<T: Serialize>(result: T) -> Result<Value> {
    Ok(serde_json::to_value(result)?)
}

// Handlers

fn insert_text(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: InsertTextParams = call.params()?;
        payload(call.backend.insert_text(&p.text, p.title.as_deref()).await?)
    }
    .boxed()
}

fn insert_texts(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: InsertTextsParams = call.params()?;
        payload(call.backend.insert_many(&p.texts).await?)
    }
    .boxed()
}

fn upload_document(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: UploadParams = call.params()?;
        payload(call.backend.upload_file(&p.file_path).await?)
    }
    .boxed()
}

fn scan_documents(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move { payload(call.backend.scan().await?) }.boxed()
}

fn get_documents(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move { payload(call.backend.list_documents().await?) }.boxed()
}

fn get_documents_paginated(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: PageParams = call.params()?;
        payload(call.backend.list_documents_page(p.page, p.page_size).await?)
    }
    .boxed()
}

fn delete_document(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: DocumentParams = call.params()?;
        payload(call.backend.delete_document(&p.document_id).await?)
    }
    .boxed()
}

fn clear_documents(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move { payload(call.backend.clear_documents().await?) }.boxed()
}

fn query_text(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: QueryParams = call.params()?;
        payload(call.backend.query(&p.into_request()).await?)
    }
    .boxed()
}

fn query_text_stream(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: QueryParams = call.params()?;
        let stream = call.backend.query_stream(&p.into_request()).await?;
        let collected = match &call.chunks {
            Some(sender) => aggregate::forward(stream, sender).await?,
            None => aggregate::collect(stream).await?,
        };
        Ok(collected.to_payload())
    }
    .boxed()
}

fn get_knowledge_graph(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: GraphParams = call.params()?;
        payload(call.backend.get_graph(p.label.as_deref()).await?)
    }
    .boxed()
}

fn get_graph_labels(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move { payload(call.backend.get_labels().await?) }.boxed()
}

fn check_entity_exists(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: EntityNameParams = call.params()?;
        payload(call.backend.entity_exists(&p.entity_name).await?)
    }
    .boxed()
}

fn update_entity(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: UpdateEntityParams = call.params()?;
        let update = EntityUpdate {
            entity_id: p.entity_id,
            entity_name: p.entity_name,
            properties: p.properties,
        };
        payload(call.backend.update_entity(&update).await?)
    }
    .boxed()
}

fn update_relation(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: UpdateRelationParams = call.params()?;
        let update = RelationUpdate {
            source_id: p.source_id,
            target_id: p.target_id,
            properties: p.properties,
        };
        payload(call.backend.update_relation(&update).await?)
    }
    .boxed()
}

fn delete_entity(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: EntityParams = call.params()?;
        payload(call.backend.delete_entity(&p.entity_id).await?)
    }
    .boxed()
}

fn delete_relation(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: RelationParams = call.params()?;
        payload(call.backend.delete_relation(&p.relation_id).await?)
    }
    .boxed()
}

fn get_pipeline_status(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move { payload(call.backend.pipeline_status().await?) }.boxed()
}

fn get_track_status(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: TrackParams = call.params()?;
        payload(call.backend.track_status(&p.track_id).await?)
    }
    .boxed()
}

fn get_document_status_counts(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move { payload(call.backend.status_counts().await?) }.boxed()
}

fn clear_cache(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move {
        let p: CacheParams = call.params()?;
        payload(call.backend.clear_cache(p.cache_type.as_deref()).await?)
    }
    .boxed()
}

fn get_health(call: ToolCall<'_>) -> BoxFuture<'_, Result<Value>> {
    async move { payload(call.backend.health().await?) }.boxed()
}
