//! Vote submission.
//!
//! The relayer hands signed-message construction to whatever sits behind
//! [`Broadcaster`]. The binary writes vote requests to stdout as JSON lines
//! for a signing sidecar to pick up.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::evm::types::VoteRequest;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("failed to encode vote: {0}")]
    Encode(String),

    #[error("failed to submit vote: {0}")]
    Submit(String),
}

/// Submits a batch of votes as one transaction.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Returns an identifier for the submission.
    async fn broadcast(&self, votes: Vec<VoteRequest>) -> Result<String, BroadcastError>;
}

/// Writes each batch as one JSON line to an async writer.
pub struct JsonLineBroadcaster<W> {
    out: tokio::sync::Mutex<W>,
    submitted: AtomicU64,
}

impl JsonLineBroadcaster<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> JsonLineBroadcaster<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: tokio::sync::Mutex::new(out),
            submitted: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Broadcaster for JsonLineBroadcaster<W> {
    async fn broadcast(&self, votes: Vec<VoteRequest>) -> Result<String, BroadcastError> {
        let mut line = serde_json::to_string(&votes).map_err(|e| BroadcastError::Encode(e.to_string()))?;
        line.push('\n');

        // One lock per batch keeps concurrent lines from interleaving.
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| BroadcastError::Submit(e.to_string()))?;
        out.flush().await.map_err(|e| BroadcastError::Submit(e.to_string()))?;

        let id = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("batch-{}", id))
    }
}

/// Keeps every batch in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingBroadcaster {
    batches: Arc<Mutex<Vec<Vec<VoteRequest>>>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<VoteRequest>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// All votes across batches, in submission order.
    pub fn votes(&self) -> Vec<VoteRequest> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn broadcast(&self, votes: Vec<VoteRequest>) -> Result<String, BroadcastError> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| BroadcastError::Submit("recorder lock poisoned".to_string()))?;
        batches.push(votes);
        Ok(format!("recorded-{}", batches.len()))
    }
}
