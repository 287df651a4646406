//! MCP server over stdio, built on `rmcp`.
//!
//! Every `tools/call` goes through [`Dispatcher::invoke`]. Calls to the
//! streaming tool that carry a progress token are relayed chunk by chunk as
//! `notifications/progress`.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam,
    ProgressNotificationParam, ProgressToken, ServerCapabilities, ServerInfo,
};
use rmcp::service::{Peer, RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use lightrag_core::{GatewayConfig, GatewayError, Result};

use crate::catalog::STREAMING_TOOL;
use crate::dispatch::Dispatcher;
use crate::outcome::ToolOutcome;

/// MCP server exposing the tool catalog.
#[derive(Clone)]
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
    identity: Implementation,
}

impl McpServer {
    pub fn new(dispatcher: Arc<Dispatcher>, identity: Implementation) -> Self {
        Self {
            dispatcher,
            identity,
        }
    }

    /// Server reporting the configured name and version.
    pub fn from_config(config: Arc<GatewayConfig>) -> Self {
        let identity = identity(&config);
        Self::new(Arc::new(Dispatcher::new(config)), identity)
    }

    /// Serve on the process's stdin and stdout until the client disconnects.
    pub async fn serve_stdio(self) -> Result<()> {
        self.serve_io(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve over a byte stream pair until it closes, then shut the backend down.
    pub async fn serve_io<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        info!("{} {} serving MCP", self.identity.name, self.identity.version);
        let dispatcher = Arc::clone(&self.dispatcher);

        let running = ServiceExt::serve(self, (reader, writer))
            .await
            .map_err(|e| session_error("MCP handshake failed", e))?;
        let reason = running
            .waiting()
            .await
            .map_err(|e| session_error("MCP session failed", e))?;
        debug!("session ended: {:?}", reason);

        dispatcher.shutdown().await;
        info!("MCP server stopped");
        Ok(())
    }
}

/// Identity reported on `initialize`.
pub fn identity(config: &GatewayConfig) -> Implementation {
    Implementation {
        name: config.server.name.clone(),
        version: config.server.version.clone(),
        ..Implementation::from_build_env()
    }
}

fn session_error(context: &str, err: impl std::fmt::Display) -> GatewayError {
    GatewayError::Io(std::io::Error::other(format!("{}: {}", context, err)))
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Tools for a LightRAG server: insert and upload documents, query with \
                 naive/local/global/hybrid retrieval, inspect and edit the knowledge graph, \
                 and check pipeline status."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: self.identity.clone(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.dispatcher.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let name = request.name.to_string();
        let arguments = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        let progress = context
            .meta
            .get_progress_token()
            .filter(|_| name == STREAMING_TOOL);
        debug!("<- tools/call {}", name);

        let dispatcher = Arc::clone(&self.dispatcher);
        let peer = context.peer.clone();
        let call_name = name.clone();
        let task = tokio::spawn(async move {
            match progress {
                Some(token) => {
                    call_with_progress(&dispatcher, &call_name, arguments, token, &peer).await
                }
                None => dispatcher.invoke(&call_name, arguments).await,
            }
        });
        let abort = task.abort_handle();

        tokio::select! {
            joined = task => match joined {
                Ok(outcome) => Ok(outcome.to_call_result()),
                Err(e) => {
                    error!("{} did not complete: {}", name, e);
                    Err(McpError::internal_error(
                        format!("Tool {} did not complete: {}", name, e),
                        None,
                    ))
                }
            },
            _ = context.ct.cancelled() => {
                info!("Cancelling {}", name);
                abort.abort();
                Err(McpError::internal_error(format!("Tool {} was cancelled", name), None))
            }
        }
    }
}

/// Run the streaming tool, emitting one progress notification per chunk.
async fn call_with_progress(
    dispatcher: &Dispatcher,
    name: &str,
    arguments: Value,
    token: ProgressToken,
    peer: &Peer<RoleServer>,
) -> ToolOutcome {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let relay = async {
        let mut progress: u32 = 0;
        while let Some(chunk) = rx.recv().await {
            progress += 1;
            let notification = ProgressNotificationParam {
                progress_token: token.clone(),
                progress: f64::from(progress),
                total: None,
                message: Some(chunk),
            };
            if let Err(e) = peer.notify_progress(notification).await {
                debug!("progress notification dropped: {}", e);
            }
        }
    };

    let (outcome, ()) = tokio::join!(dispatcher.invoke_streaming(name, arguments, tx), relay);
    outcome
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf};
    use tokio::task::JoinHandle;

    use super::*;
    use crate::fake::FakeBackend;

    const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test-client","version":"0.0.1"}}}"#;
    const INITIALIZED: &str = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;

    /// A client connected to an in-process server.
    struct Session {
        lines: tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>,
        input: tokio::io::WriteHalf<DuplexStream>,
        server: JoinHandle<Result<()>>,
        seen: Vec<Value>,
    }

    impl Session {
        async fn start(dispatcher: Dispatcher) -> Self {
            let (client, server_io) = tokio::io::duplex(1 << 20);
            let (server_read, server_write) = tokio::io::split(server_io);
            let server = McpServer::new(Arc::new(dispatcher), identity(&GatewayConfig::default()));
            let server = tokio::spawn(server.serve_io(server_read, server_write));

            let (read, input) = tokio::io::split(client);
            let mut session = Self {
                lines: BufReader::new(read).lines(),
                input,
                server,
                seen: Vec::new(),
            };
            session.send(INITIALIZE).await;
            session.response(0).await;
            session.send(INITIALIZED).await;
            session
        }

        async fn send(&mut self, line: &str) {
            self.input.write_all(line.as_bytes()).await.unwrap();
            self.input.write_all(b"\n").await.unwrap();
            self.input.flush().await.unwrap();
        }

        /// Read until the response for `id` arrives. Earlier messages are kept.
        async fn response(&mut self, id: i64) -> Value {
            let deadline = Duration::from_secs(5);
            tokio::time::timeout(deadline, async {
                loop {
                    if let Some(found) = self.seen.iter().find(|m| m["id"] == json!(id)) {
                        return found.clone();
                    }
                    let line = self.lines.next_line().await.unwrap().expect("server closed");
                    self.seen.push(serde_json::from_str(&line).unwrap());
                }
            })
            .await
            .unwrap_or_else(|_| panic!("no response for id {}", id))
        }

        async fn close(mut self) {
            self.input.shutdown().await.unwrap();
            tokio::time::timeout(Duration::from_secs(5), self.server)
                .await
                .unwrap()
                .unwrap()
                .unwrap();
        }
    }

    fn call(id: i64, params: Value) -> String {
        json!({"jsonrpc": "2.0", "id": id, "method": "tools/call", "params": params}).to_string()
    }

    fn tool_payload(response: &Value) -> Value {
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_handshake_and_listing() {
        let mut session = Session::start(Dispatcher::with_backend(Arc::new(FakeBackend::default()))).await;

        let init = session.response(0).await;
        assert_eq!(init["result"]["serverInfo"]["name"], json!("lightrag-mcp"));
        assert!(init["result"]["capabilities"]["tools"].is_object());

        session
            .send(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await;
        let listed = session.response(2).await;
        let tools = listed["result"]["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 22);
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == json!("object")));

        session.send(r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#).await;
        assert!(session.response(3).await.get("result").is_some());

        session.close().await;
    }

    #[tokio::test]
    async fn test_tool_calls() {
        let fake = Arc::new(FakeBackend::default());
        let mut session = Session::start(Dispatcher::with_backend(fake.clone())).await;

        session.send(&call(10, json!({"name": "get_health"}))).await;
        let health = session.response(10).await;
        assert_eq!(health["result"]["isError"], json!(false));
        assert_eq!(tool_payload(&health)["status"], json!("healthy"));

        session
            .send(&call(11, json!({"name": "not_a_real_tool", "arguments": {}})))
            .await;
        let unknown = session.response(11).await;
        assert_eq!(unknown["result"]["isError"], json!(true));
        assert_eq!(tool_payload(&unknown)["error_kind"], json!("UnknownTool"));

        session
            .send(&call(12, json!({"name": "delete_document", "arguments": {}})))
            .await;
        let invalid = session.response(12).await;
        assert_eq!(tool_payload(&invalid)["error_kind"], json!("ValidationError"));

        session.close().await;
        assert_eq!(fake.call_count(), 1);
        assert!(fake.is_closed());
    }

    #[tokio::test]
    async fn test_stream_progress_precedes_result() {
        let fake = Arc::new(FakeBackend::default().with_chunks(&["a", "b", "c"], None));
        let mut session = Session::start(Dispatcher::with_backend(fake)).await;

        session
            .send(&call(
                20,
                json!({
                    "name": "query_text_stream",
                    "arguments": {"query": "q"},
                    "_meta": {"progressToken": "tok"}
                }),
            ))
            .await;
        let result = session.response(20).await;
        assert_eq!(
            tool_payload(&result),
            json!({"streaming_response": "abc", "chunks_count": 3})
        );

        let progress: Vec<&Value> = session
            .seen
            .iter()
            .filter(|m| m["method"] == json!("notifications/progress"))
            .collect();
        assert_eq!(progress.len(), 3);
        let chunks: Vec<&str> = progress
            .iter()
            .map(|m| {
                assert_eq!(m["params"]["progressToken"], json!("tok"));
                m["params"]["message"].as_str().unwrap()
            })
            .collect();
        assert_eq!(chunks, vec!["a", "b", "c"]);
        assert_eq!(progress[2]["params"]["progress"].as_f64(), Some(3.0));

        let result_at = session.seen.iter().position(|m| m["id"] == json!(20)).unwrap();
        let last_progress = session
            .seen
            .iter()
            .rposition(|m| m["method"] == json!("notifications/progress"))
            .unwrap();
        assert!(last_progress < result_at);

        session.close().await;
    }

    #[tokio::test]
    async fn test_cancelled_call_returns_promptly() {
        let fake = Arc::new(FakeBackend::default().with_delay(Duration::from_secs(10)));
        let mut session = Session::start(Dispatcher::with_backend(fake)).await;

        let started = std::time::Instant::now();
        session.send(&call(30, json!({"name": "get_health"}))).await;
        session
            .send(r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":30,"reason":"user"}}"#)
            .await;
        session.send(r#"{"jsonrpc":"2.0","id":31,"method":"ping"}"#).await;
        assert!(session.response(31).await.get("result").is_some());

        let answered_30: Vec<Value> = session
            .seen
            .iter()
            .filter(|m| m["id"] == json!(30))
            .cloned()
            .collect();
        assert!(answered_30.iter().all(|m| m.get("result").is_none()));

        session.close().await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_panicking_call_still_gets_a_response() {
        let dispatcher = Dispatcher::with_factory(|| panic!("backend construction blew up"));
        let mut session = Session::start(dispatcher).await;

        session.send(&call(1, json!({"name": "get_health"}))).await;
        let response = session.response(1).await;
        assert!(response.get("result").is_none());
        assert_eq!(response["error"]["code"], json!(-32603));
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("get_health"));

        session.close().await;
    }
}
