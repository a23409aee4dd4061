//! Parachain-finality client (Moonbeam and other Substrate-based EVM chains).

use alloy::primitives::{B256, U64};
use serde::Deserialize;
use serde_json::json;

use crate::rpc::ethereum::EthereumClient;
use crate::rpc::types::{Receipt, RpcError, RpcResult};

#[derive(Debug, Deserialize)]
struct SubstrateHeader {
    number: U64,
}

/// Finality comes from the relay chain via `chain_getFinalizedHead`.
#[derive(Clone)]
pub struct MoonbeamClient {
    inner: EthereumClient,
}

impl MoonbeamClient {
    /// Succeeds only if the endpoint serves the Substrate `chain_*` namespace.
    pub async fn new(inner: EthereumClient) -> RpcResult<Self> {
        let client = Self { inner };
        client.latest_finalized_block_number().await?;
        Ok(client)
    }

    pub fn inner(&self) -> &EthereumClient {
        &self.inner
    }

    pub async fn latest_finalized_block_number(&self) -> RpcResult<u64> {
        let rpc = self.inner.rpc();

        let head = rpc.request("chain_getFinalizedHead", json!([])).await?;
        let head: B256 = serde_json::from_value(head)
            .map_err(|e| RpcError::UnexpectedResponse(format!("chain_getFinalizedHead: {}", e)))?;

        let header = rpc.request("chain_getHeader", json!([head])).await?;
        if header.is_null() {
            return Err(RpcError::NotFound(format!("substrate header {}", head)));
        }
        let header: SubstrateHeader = serde_json::from_value(header)
            .map_err(|e| RpcError::UnexpectedResponse(format!("chain_getHeader: {}", e)))?;

        Ok(header.number.to::<u64>())
    }

    pub async fn is_finalized(&self, receipt: &Receipt) -> RpcResult<bool> {
        let Some(block_number) = receipt.block_number else {
            return Ok(false);
        };
        Ok(self.latest_finalized_block_number().await? >= block_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::MockRpc;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_finalized_head_lookup() {
        let head = B256::repeat_byte(0xab);
        let rpc = MockRpc::new();
        rpc.set_block_number(500);
        rpc.add_method("chain_getFinalizedHead", json!(head));
        rpc.add_method_with_params(
            "chain_getHeader",
            json!([head]),
            json!({ "number": "0x1f4", "parentHash": B256::ZERO }),
        );

        let eth = EthereumClient::new(Arc::new(rpc.clone())).await.unwrap();
        let client = MoonbeamClient::new(eth).await.unwrap();
        assert_eq!(client.latest_finalized_block_number().await.unwrap(), 500);
        assert_eq!(rpc.call_count("chain_getHeader"), 2);
    }

    #[tokio::test]
    async fn test_probe_fails_on_plain_ethereum() {
        let rpc = MockRpc::new();
        rpc.set_block_number(500);
        let eth = EthereumClient::new(Arc::new(rpc)).await.unwrap();
        assert!(MoonbeamClient::new(eth).await.is_err());
    }
}
