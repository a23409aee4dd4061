//! Arbitrum-style client: finality measured in L1 confirmations.

use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::rpc::ethereum::EthereumClient;
use crate::rpc::ethereum2::Ethereum2Client;
use crate::rpc::types::{BlockTag, Receipt, RpcError, RpcResult};

/// Nitro NodeInterface precompile.
pub const NODE_INTERFACE_ADDRESS: Address = address!("00000000000000000000000000000000000000c8");

sol! {
    function getL1Confirmations(bytes32 blockHash) external view returns (uint64 confirmations);
}

/// L2 block is final when the L1 block that carries it is at or behind the L1 finalized height.
#[derive(Clone)]
pub struct ArbitrumClient {
    inner: EthereumClient,
    l1: Ethereum2Client,
}

impl ArbitrumClient {
    /// Succeeds only if the endpoint exposes the NodeInterface precompile.
    pub async fn new(inner: EthereumClient, l1: Ethereum2Client) -> RpcResult<Self> {
        let client = Self { inner, l1 };
        let head = client.inner.header_by_number(BlockTag::Latest).await?;
        client.l1_confirmations(head.hash).await?;
        Ok(client)
    }

    pub fn inner(&self) -> &EthereumClient {
        &self.inner
    }

    pub async fn l1_confirmations(&self, block_hash: B256) -> RpcResult<U256> {
        let data = getL1ConfirmationsCall { blockHash: block_hash }.abi_encode();
        let bz = self
            .inner
            .rpc()
            .call_contract(NODE_INTERFACE_ADDRESS, Bytes::from(data))
            .await?;
        if bz.len() != 32 {
            return Err(RpcError::UnexpectedResponse(format!(
                "expected 32 bytes to be received, actual {}",
                bz.len()
            )));
        }
        Ok(U256::from_be_slice(&bz))
    }

    pub async fn is_finalized(&self, receipt: &Receipt) -> RpcResult<bool> {
        let Some(block_hash) = receipt.block_hash else {
            return Ok(false);
        };

        let l1_confirmations = self.l1_confirmations(block_hash).await?;
        if l1_confirmations.is_zero() {
            return Ok(false);
        }

        let l1_finalized = self.l1.latest_finalized_block_number().await?;
        let l1_latest = self.l1.block_number().await?;

        // Depth of the L1 finalized block below the L1 head, counted inclusively.
        let finalized_confirmations = U256::from((l1_latest + 1).saturating_sub(l1_finalized));

        Ok(finalized_confirmations <= l1_confirmations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::MockRpc;
    use crate::rpc::types::Header;
    use std::sync::Arc;

    fn word(value: u64) -> Bytes {
        Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec())
    }

    fn confirmations_call(hash: B256) -> Bytes {
        Bytes::from(getL1ConfirmationsCall { blockHash: hash }.abi_encode())
    }

    async fn setup(l1_head: u64, l1_finalized: u64) -> (MockRpc, ArbitrumClient) {
        let l1 = MockRpc::new();
        l1.set_block_number(l1_head);
        l1.add_header(
            BlockTag::Finalized,
            Header {
                number: l1_finalized,
                hash: B256::repeat_byte(0xf0),
            },
        );
        let l1 = Ethereum2Client::new(EthereumClient::new(Arc::new(l1)).await.unwrap())
            .await
            .unwrap();

        let l2 = MockRpc::new();
        l2.set_block_number(9_000);
        let head_hash = B256::left_padding_from(&9_000u64.to_be_bytes());
        l2.add_contract_call(NODE_INTERFACE_ADDRESS, confirmations_call(head_hash), word(1));

        let eth = EthereumClient::new(Arc::new(l2.clone())).await.unwrap();
        let client = ArbitrumClient::new(eth, l1).await.unwrap();
        (l2, client)
    }

    fn receipt_with_hash(hash: B256) -> Receipt {
        Receipt {
            tx_hash: B256::repeat_byte(1),
            block_number: Some(10),
            block_hash: Some(hash),
            status: true,
            logs: vec![],
        }
    }

    #[test]
    fn test_selector() {
        assert_eq!(getL1ConfirmationsCall::SELECTOR, [0xe5, 0xca, 0x23, 0x8c]);
    }

    #[tokio::test]
    async fn test_finalized_when_deep_enough_on_l1() {
        // L1 head 1000, finalized 936 -> 65 confirmations needed.
        let (l2, client) = setup(1_000, 936).await;
        let hash = B256::repeat_byte(0xaa);

        l2.add_contract_call(NODE_INTERFACE_ADDRESS, confirmations_call(hash), word(65));
        assert!(client.is_finalized(&receipt_with_hash(hash)).await.unwrap());

        let shallow = B256::repeat_byte(0xbb);
        l2.add_contract_call(NODE_INTERFACE_ADDRESS, confirmations_call(shallow), word(64));
        assert!(!client.is_finalized(&receipt_with_hash(shallow)).await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_confirmations_not_finalized() {
        let (l2, client) = setup(1_000, 1_000).await;
        let hash = B256::repeat_byte(0xcc);
        l2.add_contract_call(NODE_INTERFACE_ADDRESS, confirmations_call(hash), word(0));
        assert!(!client.is_finalized(&receipt_with_hash(hash)).await.unwrap());
    }

    #[tokio::test]
    async fn test_short_response_is_error() {
        let (l2, client) = setup(1_000, 900).await;
        let hash = B256::repeat_byte(0xdd);
        l2.add_contract_call(NODE_INTERFACE_ADDRESS, confirmations_call(hash), Bytes::from(vec![1u8; 8]));
        assert!(client.is_finalized(&receipt_with_hash(hash)).await.is_err());
    }
}
