//! Uniform result and error envelopes for tool invocations.

use rmcp::model::{CallToolResult, Content};
use serde_json::{json, Value};

use lightrag_core::{ErrorKind, GatewayError, JsonObject};

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success { tool_name: String, payload: Value },
    Failure(ToolFailure),
}

/// A failed invocation, classified.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolFailure {
    pub tool_name: String,
    pub kind: ErrorKind,
    pub message: String,
    /// `status_code`, `response` and `arguments`, when they apply.
    pub extra: JsonObject,
}

impl ToolFailure {
    /// Build from an error. Validation failures echo the supplied arguments.
    pub fn from_error(tool_name: &str, error: &GatewayError, arguments: &Value) -> Self {
        let kind = error.kind();
        let mut extra = JsonObject::new();
        if let Some(status) = error.status_code() {
            extra.insert("status_code".to_string(), json!(status));
        }
        if let Some(body) = error.response_body() {
            extra.insert("response".to_string(), Value::String(body.to_string()));
        }
        if kind == ErrorKind::ValidationError {
            extra.insert("arguments".to_string(), arguments.clone());
        }

        Self {
            tool_name: tool_name.to_string(),
            kind,
            message: error.to_string(),
            extra,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut object = JsonObject::new();
        object.insert("tool_name".to_string(), Value::String(self.tool_name.clone()));
        object.insert("error_kind".to_string(), Value::String(self.kind.as_str().to_string()));
        object.insert("message".to_string(), Value::String(self.message.clone()));
        for (key, value) in &self.extra {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

impl ToolOutcome {
    pub fn success(tool_name: &str, payload: Value) -> Self {
        Self::Success {
            tool_name: tool_name.to_string(),
            payload,
        }
    }

    pub fn failure(tool_name: &str, error: &GatewayError, arguments: &Value) -> Self {
        Self::Failure(ToolFailure::from_error(tool_name, error, arguments))
    }

    pub fn tool_name(&self) -> &str {
        match self {
            Self::Success { tool_name, .. } => tool_name,
            Self::Failure(failure) => &failure.tool_name,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Error kind of a failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }

    /// The JSON value carried in the envelope text.
    pub fn payload(&self) -> Value {
        match self {
            Self::Success { payload, .. } => payload.clone(),
            Self::Failure(failure) => failure.to_json(),
        }
    }

    /// Transport envelope: one text item holding the pretty-printed payload.
    pub fn to_call_result(&self) -> CallToolResult {
        let payload = self.payload();
        let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
        let content = vec![Content::text(text)];
        match self {
            Self::Success { .. } => CallToolResult::success(content),
            Self::Failure(_) => CallToolResult::error(content),
        }
    }
}
