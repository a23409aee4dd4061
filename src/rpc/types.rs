//! Chain-agnostic RPC types and error definitions.

use alloy::consensus::TxReceipt;
use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::TransactionReceipt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Block selector for header lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTag {
    /// Chain head.
    Latest,
    /// Block tagged `finalized` by the node (PoS chains).
    Finalized,
    /// Explicit height.
    Number(u64),
}

impl std::fmt::Display for BlockTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockTag::Latest => write!(f, "latest"),
            BlockTag::Finalized => write!(f, "finalized"),
            BlockTag::Number(n) => write!(f, "{:#x}", n),
        }
    }
}

/// Minimal block header: the fields finality checks need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub number: u64,
    pub hash: B256,
}

/// A log emitted during transaction execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Emitting contract.
    pub address: Address,
    /// Topic hashes; topic 0 identifies the event type.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed arguments.
    pub data: Bytes,
    /// Transaction that emitted the log.
    pub tx_hash: B256,
    /// Position of the log within its block.
    pub log_index: u64,
}

impl Log {
    /// Event signature hash, if the log carries any topics.
    pub fn signature(&self) -> Option<&B256> {
        self.topics.first()
    }
}

impl From<&alloy::rpc::types::Log> for Log {
    fn from(log: &alloy::rpc::types::Log) -> Self {
        Self {
            address: log.inner.address,
            topics: log.inner.data.topics().to_vec(),
            data: log.inner.data.data.clone(),
            tx_hash: log.transaction_hash.unwrap_or_default(),
            log_index: log.log_index.unwrap_or_default(),
        }
    }
}

/// Transaction receipt as seen by the relayer.
///
/// `block_number` is absent for receipts of pending transactions on some nodes;
/// such receipts are never considered finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    /// `true` when execution succeeded.
    pub status: bool,
    pub logs: Vec<Log>,
}

impl From<TransactionReceipt> for Receipt {
    fn from(receipt: TransactionReceipt) -> Self {
        let logs = receipt.inner.logs().iter().map(Log::from).collect();
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            block_hash: receipt.block_hash,
            status: receipt.inner.status(),
            logs,
        }
    }
}

/// Log filter over the whole chain history of one contract.
///
/// `topics[i] == None` matches any value at position `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub topics: Vec<Option<B256>>,
}

impl LogQuery {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            topics: Vec::new(),
        }
    }

    /// Constrain the next topic position.
    pub fn topic(mut self, topic: B256) -> Self {
        self.topics.push(Some(topic));
        self
    }

    /// Whether a log satisfies this query.
    pub fn matches(&self, log: &Log) -> bool {
        if log.address != self.address {
            return false;
        }
        self.topics.iter().enumerate().all(|(i, wanted)| match wanted {
            None => true,
            Some(topic) => log.topics.get(i) == Some(topic),
        })
    }
}

/// Errors that can occur while talking to a chain.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Connection or request failed.
    #[error("RPC transport error: {0}")]
    Transport(String),

    /// The node has no such transaction, block, or event.
    #[error("not found: {0}")]
    NotFound(String),

    /// The node answered with something we cannot interpret.
    #[error("unexpected RPC response: {0}")]
    UnexpectedResponse(String),

    /// Cross-chain evidence did not line up (rollup verification).
    #[error("verification failed: {0}")]
    Verification(String),

    /// The endpoint does not implement the capability being probed.
    #[error("unsupported chain: {0}")]
    Unsupported(String),
}

impl RpcError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RpcError::NotFound(_))
    }
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;
