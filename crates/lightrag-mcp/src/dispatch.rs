//! Tool dispatcher.

use std::sync::Arc;

use rmcp::model::Tool;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use lightrag_client::HttpBackend;
use lightrag_core::{Backend, ErrorKind, GatewayConfig, GatewayError, Result};

use crate::aggregate::ChunkSender;
use crate::catalog::{self, ToolCall};
use crate::outcome::ToolOutcome;
use crate::validate::validate;

/// Creates the backend on first use.
pub type BackendFactory = Box<dyn Fn() -> Result<Arc<dyn Backend>> + Send + Sync>;

/// Routes tool invocations to the backend.
///
/// Shared as `Arc<Dispatcher>` between concurrent invocations. The backend
/// is created on the first call that passes validation and reused after.
pub struct Dispatcher {
    backend: OnceCell<Arc<dyn Backend>>,
    factory: BackendFactory,
}

impl Dispatcher {
    /// Dispatcher backed by the HTTP client for `config`.
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self::with_factory(move || {
            let backend = HttpBackend::new(&config.backend)?;
            Ok(Arc::new(backend) as Arc<dyn Backend>)
        })
    }

    /// Dispatcher with a custom backend constructor.
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        Self {
            backend: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    /// Dispatcher around an existing backend.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend: OnceCell::from(backend),
            factory: Box::new(|| Err(GatewayError::config("backend already provided"))),
        }
    }

    /// Catalog metadata.
    pub fn tools(&self) -> Vec<Tool> {
        catalog::tools()
    }

    /// Invoke a tool and wait for its complete result.
    pub async fn invoke(&self, tool_name: &str, arguments: Value) -> ToolOutcome {
        self.run(tool_name, arguments, None).await
    }

    /// Invoke a tool, forwarding stream chunks to `chunks` as they arrive.
    ///
    /// Only the streaming tool produces chunks; other tools ignore the sender.
    pub async fn invoke_streaming(
        &self,
        tool_name: &str,
        arguments: Value,
        chunks: ChunkSender,
    ) -> ToolOutcome {
        self.run(tool_name, arguments, Some(chunks)).await
    }

    async fn run(&self, tool_name: &str, arguments: Value, chunks: Option<ChunkSender>) -> ToolOutcome {
        let Some(spec) = catalog::find(tool_name) else {
            let err = GatewayError::UnknownTool {
                name: tool_name.to_string(),
            };
            warn!("{}", err);
            return ToolOutcome::failure(tool_name, &err, &arguments);
        };

        let validated = match validate(spec.params, &arguments) {
            Ok(validated) => validated,
            Err(err) => {
                warn!("Rejected arguments for {}: {}", tool_name, err);
                return ToolOutcome::failure(tool_name, &err, &arguments);
            }
        };

        let backend = match self.backend().await {
            Ok(backend) => backend,
            Err(err) => {
                log_failure(tool_name, &err);
                return ToolOutcome::failure(tool_name, &err, &arguments);
            }
        };

        debug!("Executing {}", tool_name);
        let call = ToolCall {
            backend: backend.as_ref(),
            arguments: validated,
            chunks,
        };
        match (spec.handler)(call).await {
            Ok(payload) => {
                info!("Successfully executed {}", tool_name);
                ToolOutcome::success(tool_name, payload)
            }
            Err(err) => {
                log_failure(tool_name, &err);
                ToolOutcome::failure(tool_name, &err, &arguments)
            }
        }
    }

    async fn backend(&self) -> Result<&Arc<dyn Backend>> {
        self.backend
            .get_or_try_init(|| async {
                info!("Initializing backend client");
                (self.factory)()
            })
            .await
    }

    /// Release the backend, if one was created.
    pub async fn shutdown(&self) {
        if let Some(backend) = self.backend.get() {
            info!("Shutting down backend client");
            backend.close().await;
        }
    }
}

fn log_failure(tool_name: &str, err: &GatewayError) {
    match err.kind() {
        ErrorKind::ConnectionError
        | ErrorKind::TimeoutError
        | ErrorKind::ValidationError
        | ErrorKind::StreamError
        | ErrorKind::UnknownTool => warn!("{} failed: {}", tool_name, err),
        ErrorKind::AuthError | ErrorKind::ServerError | ErrorKind::ApiError => {
            error!("{} failed: {}", tool_name, err)
        }
    }
}
