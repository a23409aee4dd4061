//! Optimism-style client: finality via state batches posted to L1.
//!
//! # Data Flow
//! ```text
//! L2 receipt (block N)
//!     → tx index N - 1 (one tx per block, genesis has none)
//!     → binary search StateBatchAppended logs on the L1 state commitment chain
//!     → L1 receipt of the batch posting tx
//!     → explicit finality on L1
//! ```

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use serde_json::json;

use crate::rpc::ethereum::EthereumClient;
use crate::rpc::ethereum2::Ethereum2Client;
use crate::rpc::types::{Log, LogQuery, Receipt, RpcError, RpcResult};

sol! {
    function getTotalBatches() external view returns (uint256 _totalBatches);

    #[derive(Debug)]
    event StateBatchAppended(
        uint256 indexed _batchIndex,
        bytes32 _batchRoot,
        uint256 _batchSize,
        uint256 _prevTotalElements,
        bytes _extraData
    );
}

/// A decoded `StateBatchAppended` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBatch {
    pub index: u64,
    pub size: U256,
    pub prev_total_elements: U256,
    /// L1 transaction that appended the batch.
    pub tx_hash: B256,
}

impl StateBatch {
    pub fn from_log(log: &Log) -> RpcResult<Self> {
        let [signature, index] = log.topics.as_slice() else {
            return Err(RpcError::UnexpectedResponse(format!(
                "StateBatchAppended expects 2 topics, got {}",
                log.topics.len()
            )));
        };
        if *signature != StateBatchAppended::SIGNATURE_HASH {
            return Err(RpcError::UnexpectedResponse("log is not StateBatchAppended".to_string()));
        }

        let event = StateBatchAppended::decode_raw_log([*signature, *index], &log.data)
            .map_err(|e| RpcError::UnexpectedResponse(format!("StateBatchAppended: {}", e)))?;
        if event.encode_data() != log.data.as_ref() {
            return Err(RpcError::UnexpectedResponse(
                "StateBatchAppended data is not canonically encoded".to_string(),
            ));
        }

        let index = u64::try_from(event._batchIndex)
            .map_err(|_| RpcError::UnexpectedResponse("batch index out of range".to_string()))?;

        Ok(Self {
            index,
            size: event._batchSize,
            prev_total_elements: event._prevTotalElements,
            tx_hash: log.tx_hash,
        })
    }

    /// Every element of this batch comes before `tx_index`.
    fn is_below(&self, tx_index: U256) -> bool {
        tx_index >= self.prev_total_elements + self.size
    }

    /// Every element of this batch comes after `tx_index`.
    fn is_above(&self, tx_index: U256) -> bool {
        tx_index < self.prev_total_elements
    }
}

#[derive(Clone)]
pub struct OptimismClient {
    inner: EthereumClient,
    l1: Ethereum2Client,
    state_commitment_chain: Address,
}

impl OptimismClient {
    /// Succeeds only if the endpoint answers `rollup_gasPrices`.
    pub async fn new(inner: EthereumClient, l1: Ethereum2Client, state_commitment_chain: Address) -> RpcResult<Self> {
        inner.rpc().request("rollup_gasPrices", json!([])).await?;
        Ok(Self {
            inner,
            l1,
            state_commitment_chain,
        })
    }

    pub fn inner(&self) -> &EthereumClient {
        &self.inner
    }

    pub async fn is_finalized(&self, receipt: &Receipt) -> RpcResult<bool> {
        let Some(block_number) = receipt.block_number else {
            return Ok(false);
        };
        let Some(tx_index) = block_number.checked_sub(1) else {
            return Ok(false);
        };

        let batch = match self.find_state_batch(U256::from(tx_index)).await {
            Ok(batch) => batch,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };

        let l1_receipt = self.l1.transaction_receipt(batch.tx_hash).await?;
        self.l1.is_finalized(&l1_receipt).await
    }

    /// Locate the state batch containing `tx_index`. `NotFound` if the index
    /// has not been posted yet.
    pub async fn find_state_batch(&self, tx_index: U256) -> RpcResult<StateBatch> {
        let total = self.total_batches().await?;
        let Some(last) = total.checked_sub(1) else {
            return Err(RpcError::NotFound("no state batches appended".to_string()));
        };

        let batch = self.state_batch(last).await?;
        if batch.is_below(tx_index) {
            return Err(RpcError::NotFound(format!("tx index {} not yet in a state batch", tx_index)));
        }
        if !batch.is_above(tx_index) {
            return Ok(batch);
        }

        // Search [0, last) with i64 bounds so `upper = mid - 1` can go below zero.
        let mut lower: i64 = 0;
        let mut upper: i64 = last as i64 - 1;
        while lower <= upper {
            let mid = lower + (upper - lower) / 2;
            let batch = self.state_batch(mid as u64).await?;
            if batch.is_below(tx_index) {
                lower = mid + 1;
            } else if batch.is_above(tx_index) {
                upper = mid - 1;
            } else {
                return Ok(batch);
            }
        }

        Err(RpcError::NotFound(format!("no state batch contains tx index {}", tx_index)))
    }

    async fn total_batches(&self) -> RpcResult<u64> {
        let data = Bytes::from(getTotalBatchesCall {}.abi_encode());
        let bz = self
            .l1
            .inner()
            .rpc()
            .call_contract(self.state_commitment_chain, data)
            .await?;
        if bz.len() != 32 {
            return Err(RpcError::UnexpectedResponse(format!(
                "expected 32 bytes to be received, actual {}",
                bz.len()
            )));
        }
        u64::try_from(U256::from_be_slice(&bz))
            .map_err(|_| RpcError::UnexpectedResponse("total batches out of range".to_string()))
    }

    async fn state_batch(&self, index: u64) -> RpcResult<StateBatch> {
        let query = LogQuery::new(self.state_commitment_chain)
            .topic(StateBatchAppended::SIGNATURE_HASH)
            .topic(B256::from(U256::from(index)));

        let logs = self.l1.inner().rpc().filter_logs(&query).await?;
        let log = logs
            .first()
            .ok_or_else(|| RpcError::NotFound(format!("state batch {}", index)))?;

        StateBatch::from_log(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::MockRpc;
    use crate::rpc::types::{BlockTag, Header};
    use std::sync::Arc;

    const SCC: Address = Address::repeat_byte(0x5c);

    fn batch_log(index: u64, size: u64, prev_total: u64) -> Log {
        let event = StateBatchAppended {
            _batchIndex: U256::from(index),
            _batchRoot: B256::repeat_byte(0x77),
            _batchSize: U256::from(size),
            _prevTotalElements: U256::from(prev_total),
            _extraData: Bytes::from(vec![0u8; 3]),
        };
        let data = event.encode_log_data();
        Log {
            address: SCC,
            topics: data.topics().to_vec(),
            data: data.data,
            tx_hash: B256::left_padding_from(&(1_000 + index).to_be_bytes()),
            log_index: 0,
        }
    }

    /// Batches of 10 elements each: batch i covers tx indices [10i, 10i + 10).
    async fn setup(batches: u64, l1_finalized: u64) -> (MockRpc, OptimismClient) {
        let l1 = MockRpc::new();
        l1.set_block_number(500);
        l1.add_header(
            BlockTag::Finalized,
            Header {
                number: l1_finalized,
                hash: B256::repeat_byte(0xf0),
            },
        );
        l1.add_contract_call(
            SCC,
            Bytes::from(getTotalBatchesCall {}.abi_encode()),
            Bytes::from(U256::from(batches).to_be_bytes::<32>().to_vec()),
        );
        for i in 0..batches {
            let log = batch_log(i, 10, i * 10);
            l1.add_receipt(Receipt {
                tx_hash: log.tx_hash,
                block_number: Some(100 + i),
                block_hash: None,
                status: true,
                logs: vec![log.clone()],
            });
            l1.add_log(log);
        }
        let l1_client = Ethereum2Client::new(EthereumClient::new(Arc::new(l1.clone())).await.unwrap())
            .await
            .unwrap();

        let l2 = MockRpc::new();
        l2.set_block_number(1_000);
        l2.add_method("rollup_gasPrices", json!({ "l1GasPrice": "0x1", "l2GasPrice": "0x1" }));
        let eth = EthereumClient::new(Arc::new(l2)).await.unwrap();

        (l1, OptimismClient::new(eth, l1_client, SCC).await.unwrap())
    }

    #[test]
    fn test_selector() {
        assert_eq!(getTotalBatchesCall::SELECTOR, [0xe5, 0x61, 0xdd, 0xdc]);
    }

    #[tokio::test]
    async fn test_binary_search_finds_every_batch() {
        let (_, client) = setup(7, 1_000).await;
        for tx_index in 0..70u64 {
            let batch = client.find_state_batch(U256::from(tx_index)).await.unwrap();
            assert_eq!(batch.index, tx_index / 10, "tx index {}", tx_index);
        }
    }

    #[tokio::test]
    async fn test_beyond_last_batch_is_not_found() {
        let (_, client) = setup(3, 1_000).await;
        let err = client.find_state_batch(U256::from(30)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_no_batches_is_not_found() {
        let (_, client) = setup(0, 1_000).await;
        assert!(client.find_state_batch(U256::ZERO).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_is_finalized_follows_l1() {
        // Batch i is posted in L1 block 100 + i; L1 finalized at 102.
        let (_, client) = setup(5, 102).await;
        let receipt = |block: u64| Receipt {
            tx_hash: B256::repeat_byte(9),
            block_number: Some(block),
            block_hash: None,
            status: true,
            logs: vec![],
        };

        // Block 21 -> tx index 20 -> batch 2 -> L1 block 102.
        assert!(client.is_finalized(&receipt(21)).await.unwrap());
        // Block 31 -> batch 3 -> L1 block 103.
        assert!(!client.is_finalized(&receipt(31)).await.unwrap());
        // Not yet batched.
        assert!(!client.is_finalized(&receipt(51)).await.unwrap());
    }

    #[test]
    fn test_non_canonical_batch_data_rejected() {
        let mut log = batch_log(1, 10, 10);
        let mut data = log.data.to_vec();
        data.extend_from_slice(&[0u8; 32]);
        log.data = Bytes::from(data);
        assert!(StateBatch::from_log(&log).is_err());
    }
}
