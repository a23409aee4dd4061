//! Generic confirmation-count client.
//!
//! Every other finality variant embeds this one for the standard `eth_*` calls.

use alloy::primitives::B256;
use std::sync::Arc;

use crate::rpc::transport::EthereumRpc;
use crate::rpc::types::{BlockTag, Header, Receipt, RpcResult};

/// Client for any Ethereum-compatible chain. A block is final once
/// `confirmations` blocks (itself included) have been built on top of the head.
#[derive(Clone)]
pub struct EthereumClient {
    rpc: Arc<dyn EthereumRpc>,
}

impl EthereumClient {
    /// Wrap `rpc`, checking that it speaks standard Ethereum JSON-RPC.
    pub async fn new(rpc: Arc<dyn EthereumRpc>) -> RpcResult<Self> {
        let head = rpc.block_number().await?;
        tracing::debug!(head, "Ethereum JSON-RPC endpoint reachable");
        Ok(Self { rpc })
    }

    pub fn rpc(&self) -> &Arc<dyn EthereumRpc> {
        &self.rpc
    }

    pub async fn block_number(&self) -> RpcResult<u64> {
        self.rpc.block_number().await
    }

    pub async fn header_by_number(&self, tag: BlockTag) -> RpcResult<Header> {
        self.rpc.header_by_number(tag).await
    }

    pub async fn transaction_receipt(&self, tx_hash: B256) -> RpcResult<Receipt> {
        self.rpc.transaction_receipt(tx_hash).await
    }

    pub async fn transaction_receipts(&self, tx_hashes: &[B256]) -> RpcResult<Vec<RpcResult<Receipt>>> {
        self.rpc.transaction_receipts(tx_hashes).await
    }

    /// `head - confirmations + 1`, or `None` while the chain is shorter than
    /// the confirmation requirement.
    pub async fn latest_finalized_block_number(&self, confirmations: u64) -> RpcResult<Option<u64>> {
        let head = self.rpc.block_number().await?;
        Ok((head + 1).checked_sub(confirmations))
    }

    pub async fn is_finalized(&self, confirmations: u64, receipt: &Receipt) -> RpcResult<bool> {
        let Some(block_number) = receipt.block_number else {
            return Ok(false);
        };
        let finalized = self.latest_finalized_block_number(confirmations).await?;
        Ok(finalized.is_some_and(|height| height >= block_number))
    }
}
