//! Folding a streaming query into a single result.

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use lightrag_core::{ChunkStream, GatewayError, Result};

/// Receives chunks as they arrive.
pub type ChunkSender = mpsc::UnboundedSender<String>;

/// Concatenated text of a completed stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collected {
    pub text: String,
    pub chunks: usize,
}

impl Collected {
    /// Payload of the streaming tool.
    pub fn to_payload(&self) -> Value {
        json!({
            "streaming_response": self.text,
            "chunks_count": self.chunks,
        })
    }
}

/// Drain the stream in order.
pub async fn collect(stream: ChunkStream) -> Result<Collected> {
    drain(stream, None).await
}

/// Drain the stream, sending each chunk to `sender` as it arrives.
///
/// A closed receiver does not stop collection.
pub async fn forward(stream: ChunkStream, sender: &ChunkSender) -> Result<Collected> {
    drain(stream, Some(sender)).await
}

async fn drain(mut stream: ChunkStream, sender: Option<&ChunkSender>) -> Result<Collected> {
    let mut collected = Collected::default();

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                if let Some(sender) = sender {
                    if sender.send(chunk.clone()).is_err() {
                        debug!("chunk receiver closed");
                    }
                }
                collected.text.push_str(&chunk);
                collected.chunks += 1;
            }
            Err(err) => {
                warn!("Stream failed after {} chunks: {}", collected.chunks, err);
                return Err(mid_stream(err, collected.chunks));
            }
        }
    }

    Ok(collected)
}

/// Partial output is dropped; timeouts keep their kind.
fn mid_stream(err: GatewayError, received: usize) -> GatewayError {
    match err {
        GatewayError::Timeout { .. } => err,
        GatewayError::Stream { message } => {
            GatewayError::stream(format!("{} (after {} chunks)", message, received))
        }
        other => GatewayError::stream(format!("{} (after {} chunks)", other, received)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use lightrag_core::ErrorKind;

    fn chunks(items: Vec<Result<&str>>) -> ChunkStream {
        let owned: Vec<Result<String>> = items.into_iter().map(|i| i.map(str::to_string)).collect();
        stream::iter(owned).boxed()
    }

    #[tokio::test]
    async fn test_collect_in_order() {
        let collected = collect(chunks(vec![Ok("a"), Ok("b"), Ok("c")])).await.unwrap();
        assert_eq!(collected.text, "abc");
        assert_eq!(collected.chunks, 3);
        assert_eq!(
            collected.to_payload(),
            json!({"streaming_response": "abc", "chunks_count": 3})
        );
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let collected = collect(chunks(vec![])).await.unwrap();
        assert_eq!(collected, Collected::default());
    }

    #[tokio::test]
    async fn test_failure_discards_partial_output() {
        let err = collect(chunks(vec![
            Ok("a"),
            Ok("b"),
            Err(GatewayError::connection("reset by peer")),
        ]))
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StreamError);
        assert!(err.to_string().contains("after 2 chunks"));
    }

    #[tokio::test]
    async fn test_timeout_keeps_kind() {
        let err = collect(chunks(vec![Ok("a"), Err(GatewayError::timeout("deadline"))]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimeoutError);
    }

    #[tokio::test]
    async fn test_forward_sends_each_chunk() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let collected = forward(chunks(vec![Ok("x"), Ok("y")]), &tx).await.unwrap();
        drop(tx);

        let mut seen = Vec::new();
        while let Some(chunk) = rx.recv().await {
            seen.push(chunk);
        }
        assert_eq!(seen, vec!["x", "y"]);
        assert_eq!(collected.text, "xy");
    }

    #[tokio::test]
    async fn test_forward_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let collected = forward(chunks(vec![Ok("x"), Ok("y")]), &tx).await.unwrap();
        assert_eq!(collected.chunks, 2);
    }
}
