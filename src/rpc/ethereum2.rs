//! Explicit-finality client for proof-of-stake chains.

use alloy::primitives::B256;

use crate::rpc::ethereum::EthereumClient;
use crate::rpc::types::{BlockTag, Receipt, RpcResult};

/// Chain whose node reports a `finalized` block tag. The confirmation count is ignored.
#[derive(Clone)]
pub struct Ethereum2Client {
    inner: EthereumClient,
}

impl Ethereum2Client {
    /// Succeeds only if the endpoint answers `eth_getBlockByNumber("finalized")`.
    pub async fn new(inner: EthereumClient) -> RpcResult<Self> {
        let client = Self { inner };
        client.latest_finalized_block_number().await?;
        Ok(client)
    }

    pub fn inner(&self) -> &EthereumClient {
        &self.inner
    }

    pub async fn block_number(&self) -> RpcResult<u64> {
        self.inner.block_number().await
    }

    pub async fn transaction_receipt(&self, tx_hash: B256) -> RpcResult<Receipt> {
        self.inner.transaction_receipt(tx_hash).await
    }

    pub async fn latest_finalized_block_number(&self) -> RpcResult<u64> {
        Ok(self.inner.header_by_number(BlockTag::Finalized).await?.number)
    }

    pub async fn is_finalized(&self, receipt: &Receipt) -> RpcResult<bool> {
        let Some(block_number) = receipt.block_number else {
            return Ok(false);
        };
        Ok(self.latest_finalized_block_number().await? >= block_number)
    }
}
