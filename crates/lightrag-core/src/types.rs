//! Request and result types exchanged with the LightRAG backend.
//!
//! Result types mirror the backend's field names. Every field is optional
//! and parsed leniently: a null, missing or mistyped value becomes `None`
//! instead of failing the whole response. Fields the schema does not know
//! are kept in `extra` so nothing the backend returned is dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object type used for free-form properties and metadata.
pub type JsonObject = Map<String, Value>;

/// Retrieval strategy for a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Naive,
    Local,
    Global,
    #[default]
    Hybrid,
}

impl QueryMode {
    /// All modes accepted by the backend, in documentation order.
    pub const ALL: [QueryMode; 4] = [Self::Naive, Self::Local, Self::Global, Self::Hybrid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Local => "local",
            Self::Global => "global",
            Self::Hybrid => "hybrid",
        }
    }

    /// Comma-separated list of accepted mode names.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(QueryMode::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("Invalid query mode '{}'. Must be one of: {}", s, Self::names()))
    }
}

/// A text document for batch insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDocument {
    /// Optional document title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Document content.
    pub content: String,

    /// Caller-supplied metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonObject>,
}

/// A query against the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural-language query text.
    pub query: String,

    /// Retrieval mode.
    #[serde(default)]
    pub mode: QueryMode,

    /// Return only the retrieved context, skipping generation.
    #[serde(default)]
    pub only_need_context: bool,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, mode: QueryMode) -> Self {
        Self {
            query: query.into(),
            mode,
            only_need_context: false,
        }
    }
}

/// Update of a knowledge-graph entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityUpdate {
    /// Entity identifier.
    pub entity_id: String,

    /// Entity name, when it differs from the identifier.
    pub entity_name: Option<String>,

    /// Properties to set.
    pub properties: JsonObject,
}

impl EntityUpdate {
    /// Name the backend addresses the entity by.
    pub fn target_name(&self) -> &str {
        self.entity_name.as_deref().unwrap_or(&self.entity_id)
    }
}

/// Update of a knowledge-graph relation, addressed by its endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationUpdate {
    pub source_id: String,
    pub target_id: String,
    pub properties: JsonObject,
}

/// Acknowledgement of a document insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertResult {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Acknowledgement of a file upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Result of scanning the backend's input directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Generic acknowledgement (deletes, updates, clears).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// One document as reported by listing endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub content_summary: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub chunks_count: Option<u64>,

    /// Source path; some backend versions report it as null.
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonObject>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Unpaginated document listing.
///
/// Newer backends group documents by status under `statuses`; older ones
/// return a flat `documents` array. Both are kept as sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentsResult {
    #[serde(default, deserialize_with = "lenient::documents", skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<DocumentInfo>>,

    #[serde(default, deserialize_with = "lenient::grouped_documents", skip_serializing_if = "Option::is_none")]
    pub statuses: Option<BTreeMap<String, Vec<DocumentInfo>>>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

impl DocumentsResult {
    /// Every document in the listing, regardless of grouping.
    pub fn all_documents(&self) -> impl Iterator<Item = &DocumentInfo> {
        self.documents
            .iter()
            .flatten()
            .chain(self.statuses.iter().flat_map(|groups| groups.values().flatten()))
    }
}

/// Pagination block of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationInfo {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub has_prev: Option<bool>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Paginated document listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult {
    #[serde(default, deserialize_with = "lenient::documents", skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<DocumentInfo>>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub status_counts: Option<BTreeMap<String, u64>>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Answer to a (non-streaming) query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Generated answer, or the retrieved context when only context was asked for.
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// A node of the knowledge graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub properties: Option<JsonObject>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// An edge of the knowledge graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub edge_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub properties: Option<JsonObject>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Knowledge graph snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphResult {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<GraphNode>>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<GraphEdge>>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub is_truncated: Option<bool>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Graph labels, either a bare list or grouped by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelsResult {
    List(Vec<String>),
    Grouped(LabelGroups),
}

impl LabelsResult {
    /// All labels, entity labels first.
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Self::List(labels) => labels.iter().map(String::as_str).collect(),
            Self::Grouped(groups) => groups
                .entity_labels
                .iter()
                .flatten()
                .chain(groups.relation_labels.iter().flatten())
                .map(String::as_str)
                .collect(),
        }
    }
}

/// Labels grouped by entity/relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelGroups {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub entity_labels: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub relation_labels: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Entity existence check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityExistsResult {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

impl EntityExistsResult {
    pub fn exists(&self) -> bool {
        self.exists.unwrap_or(false)
    }
}

/// Ingestion pipeline state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub busy: Option<bool>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub job_start: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub docs: Option<u64>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub batchs: Option<u64>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub cur_batch: Option<u64>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub request_pending: Option<bool>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub latest_message: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub history_messages: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Processing state of documents submitted under one track id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackStatus {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,

    #[serde(default, deserialize_with = "lenient::documents", skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<DocumentInfo>>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub status_summary: Option<BTreeMap<String, u64>>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Document counts per processing status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub status_counts: Option<BTreeMap<String, u64>>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Backend health report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub input_directory: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub core_version: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub pipeline_busy: Option<bool>,

    #[serde(default, deserialize_with = "lenient::option", skip_serializing_if = "Option::is_none")]
    pub configuration: Option<JsonObject>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Deserializers that degrade bad values to `None` instead of failing.
mod lenient {
    use std::collections::BTreeMap;

    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::DocumentInfo;

    pub fn option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.and_then(|v| serde_json::from_value(v).ok()))
    }

    /// A document array; entries that are not objects are skipped.
    pub fn documents<'de, D>(deserializer: D) -> Result<Option<Vec<DocumentInfo>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.and_then(document_list))
    }

    /// Documents grouped by status name.
    pub fn grouped_documents<'de, D>(
        deserializer: D,
    ) -> Result<Option<BTreeMap<String, Vec<DocumentInfo>>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        let Some(Value::Object(groups)) = value else {
            return Ok(None);
        };
        Ok(Some(
            groups
                .into_iter()
                .filter_map(|(status, docs)| document_list(docs).map(|docs| (status, docs)))
                .collect(),
        ))
    }

    fn document_list(value: Value) -> Option<Vec<DocumentInfo>> {
        match value {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_mode_parse() {
        assert_eq!("naive".parse::<QueryMode>().unwrap(), QueryMode::Naive);
        assert_eq!("hybrid".parse::<QueryMode>().unwrap(), QueryMode::Hybrid);
        let err = "bogus".parse::<QueryMode>().unwrap_err();
        assert!(err.contains("naive, local, global, hybrid"));
        assert_eq!(QueryMode::default(), QueryMode::Hybrid);
    }

    #[test]
    fn test_null_file_path_does_not_abort_listing() {
        let body = json!({
            "statuses": {
                "processed": [
                    {"id": "doc-1", "file_path": null, "content_length": 12, "status": "processed"},
                    {"id": "doc-2", "file_path": "notes.md", "content_length": "oops"}
                ],
                "failed": "not-a-list"
            }
        });

        let result: DocumentsResult = serde_json::from_value(body).unwrap();
        let docs: Vec<_> = result.all_documents().collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].file_path, None);
        assert_eq!(docs[0].content_length, Some(12));
        assert_eq!(docs[1].file_path.as_deref(), Some("notes.md"));
        assert_eq!(docs[1].content_length, None);
        assert!(result.documents.is_none());
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let body = json!({
            "response": "Paris",
            "references": [{"id": 1}],
            "processing_time": 0.42
        });

        let result: QueryResult = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(result.response.as_deref(), Some("Paris"));
        assert!(result.extra.contains_key("references"));
        assert_eq!(serde_json::to_value(&result).unwrap(), body);
    }

    #[test]
    fn test_absent_fields_are_not_synthesized() {
        let result: PaginatedResult = serde_json::from_value(json!({})).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), json!({}));

        let result: HealthStatus = serde_json::from_value(json!({"status": "healthy"})).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), json!({"status": "healthy"}));
    }

    #[test]
    fn test_labels_both_shapes() {
        let list: LabelsResult = serde_json::from_value(json!(["PERSON", "CITY"])).unwrap();
        assert_eq!(list.labels(), vec!["PERSON", "CITY"]);

        let grouped: LabelsResult = serde_json::from_value(json!({
            "entity_labels": ["PERSON"],
            "relation_labels": ["LIVES_IN"]
        }))
        .unwrap();
        assert_eq!(grouped.labels(), vec!["PERSON", "LIVES_IN"]);
    }

    #[test]
    fn test_graph_edge_type_field() {
        let body = json!({
            "nodes": [{"id": "Alice", "labels": ["PERSON"], "properties": {"entity_type": "person"}}],
            "edges": [{"id": "Alice-Paris", "type": "LIVES_IN", "source": "Alice", "target": "Paris"}],
            "is_truncated": false
        });

        let graph: GraphResult = serde_json::from_value(body.clone()).unwrap();
        let edges = graph.edges.as_ref().unwrap();
        assert_eq!(edges[0].edge_type.as_deref(), Some("LIVES_IN"));
        assert_eq!(serde_json::to_value(&graph).unwrap(), body);
    }

    #[test]
    fn test_entity_update_target_name() {
        let update = EntityUpdate {
            entity_id: "ent-1".to_string(),
            entity_name: None,
            properties: JsonObject::new(),
        };
        assert_eq!(update.target_name(), "ent-1");

        let named = EntityUpdate {
            entity_name: Some("Alice".to_string()),
            ..update
        };
        assert_eq!(named.target_name(), "Alice");
    }

    #[test]
    fn test_text_document_skips_absent_fields() {
        let doc = TextDocument {
            title: None,
            content: "hello".to_string(),
            metadata: None,
        };
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"content": "hello"}));
    }
}
