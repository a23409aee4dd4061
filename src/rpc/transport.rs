//! JSON-RPC transport seam.
//!
//! # Responsibilities
//! - Define the `EthereumRpc` trait every finality variant is written against
//! - Provide the alloy-backed implementation used in production
//! - Translate alloy transport failures into `RpcError`
//!
//! # Design Decisions
//! - Standard `eth_*` calls go through typed provider methods
//! - Chain-specific methods (`chain_*`, `zkevm_*`, `rollup_*`) go through `request`
//!   with `serde_json::Value` params so new variants need no trait changes
//! - Receipt batches use a single JSON-RPC batch; per-item failures are reported
//!   individually and never fail the whole batch

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::client::BatchRequest;
use alloy::rpc::types::{Filter, TransactionInput, TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::rpc::types::{BlockTag, Header, Log, LogQuery, Receipt, RpcError, RpcResult};

/// Calls to a standard EVM JSON-RPC endpoint.
#[async_trait]
pub trait EthereumRpc: Send + Sync {
    /// `eth_blockNumber`
    async fn block_number(&self) -> RpcResult<u64>;

    /// `eth_chainId`
    async fn chain_id(&self) -> RpcResult<u64>;

    /// `eth_getBlockByNumber(tag, false)`; a missing block is `NotFound`.
    async fn header_by_number(&self, tag: BlockTag) -> RpcResult<Header>;

    /// `eth_getTransactionReceipt`; an unknown transaction is `NotFound`.
    async fn transaction_receipt(&self, tx_hash: B256) -> RpcResult<Receipt>;

    /// Batched `eth_getTransactionReceipt`, results in input order.
    async fn transaction_receipts(&self, tx_hashes: &[B256]) -> RpcResult<Vec<RpcResult<Receipt>>>;

    /// `eth_call` against the latest block.
    async fn call_contract(&self, to: Address, data: Bytes) -> RpcResult<Bytes>;

    /// `eth_getLogs` from the earliest block.
    async fn filter_logs(&self, query: &LogQuery) -> RpcResult<Vec<Log>>;

    /// Arbitrary JSON-RPC method.
    async fn request(&self, method: &str, params: Value) -> RpcResult<Value>;
}

/// `EthereumRpc` over an alloy HTTP provider.
#[derive(Clone)]
pub struct AlloyRpc {
    provider: Arc<dyn Provider + Send + Sync>,
    endpoint: String,
}

impl AlloyRpc {
    /// Build a provider for `rpc_addr`. No I/O happens here.
    pub fn connect(rpc_addr: &str) -> RpcResult<Self> {
        let url: url::Url = rpc_addr
            .parse()
            .map_err(|e| RpcError::Transport(format!("invalid RPC URL '{}': {}", rpc_addr, e)))?;
        let provider = Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>;

        Ok(Self {
            provider,
            endpoint: rpc_addr.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for AlloyRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyRpc").field("endpoint", &self.endpoint).finish()
    }
}

fn transport_err(method: &str, e: impl std::fmt::Display) -> RpcError {
    RpcError::Transport(format!("{}: {}", method, e))
}

fn to_block_number_or_tag(tag: BlockTag) -> BlockNumberOrTag {
    match tag {
        BlockTag::Latest => BlockNumberOrTag::Latest,
        BlockTag::Finalized => BlockNumberOrTag::Finalized,
        BlockTag::Number(n) => BlockNumberOrTag::Number(n),
    }
}

#[async_trait]
impl EthereumRpc for AlloyRpc {
    async fn block_number(&self) -> RpcResult<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| transport_err("eth_blockNumber", e))
    }

    async fn chain_id(&self) -> RpcResult<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| transport_err("eth_chainId", e))
    }

    async fn header_by_number(&self, tag: BlockTag) -> RpcResult<Header> {
        let block = self
            .provider
            .get_block_by_number(to_block_number_or_tag(tag))
            .await
            .map_err(|e| transport_err("eth_getBlockByNumber", e))?
            .ok_or_else(|| RpcError::NotFound(format!("block {}", tag)))?;

        Ok(Header {
            number: block.header.number,
            hash: block.header.hash,
        })
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> RpcResult<Receipt> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| transport_err("eth_getTransactionReceipt", e))?
            .map(Receipt::from)
            .ok_or_else(|| RpcError::NotFound(format!("transaction receipt {}", tx_hash)))
    }

    async fn transaction_receipts(&self, tx_hashes: &[B256]) -> RpcResult<Vec<RpcResult<Receipt>>> {
        let mut batch = BatchRequest::new(self.provider.client());
        let mut waiters = Vec::with_capacity(tx_hashes.len());
        for tx_hash in tx_hashes {
            let waiter = batch
                .add_call::<_, Option<TransactionReceipt>>("eth_getTransactionReceipt", &(*tx_hash,))
                .map_err(|e| transport_err("eth_getTransactionReceipt", e))?;
            waiters.push((*tx_hash, waiter));
        }

        batch
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("unable to send batch request: {}", e)))?;

        let mut results = Vec::with_capacity(waiters.len());
        for (tx_hash, waiter) in waiters {
            let result = match waiter.await {
                Ok(Some(receipt)) => Ok(Receipt::from(receipt)),
                Ok(None) => Err(RpcError::NotFound(format!("transaction receipt {}", tx_hash))),
                Err(e) => Err(transport_err("eth_getTransactionReceipt", e)),
            };
            results.push(result);
        }

        Ok(results)
    }

    async fn call_contract(&self, to: Address, data: Bytes) -> RpcResult<Bytes> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(data));

        self.provider
            .call(tx)
            .await
            .map_err(|e| transport_err("eth_call", e))
    }

    async fn filter_logs(&self, query: &LogQuery) -> RpcResult<Vec<Log>> {
        let mut filter = Filter::new()
            .address(query.address)
            .from_block(BlockNumberOrTag::Earliest);
        for (position, topic) in query.topics.iter().enumerate() {
            let Some(topic) = topic else { continue };
            filter = match position {
                0 => filter.event_signature(*topic),
                1 => filter.topic1(*topic),
                2 => filter.topic2(*topic),
                3 => filter.topic3(*topic),
                _ => {
                    return Err(RpcError::UnexpectedResponse(format!(
                        "log filter supports at most 4 topics, got {}",
                        query.topics.len()
                    )))
                }
            };
        }

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| transport_err("eth_getLogs", e))?;

        Ok(logs.iter().map(Log::from).collect())
    }

    async fn request(&self, method: &str, params: Value) -> RpcResult<Value> {
        self.provider
            .client()
            .request::<Value, Value>(method.to_string(), params)
            .await
            .map_err(|e| transport_err(method, e))
    }
}
