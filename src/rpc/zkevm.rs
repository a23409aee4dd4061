//! Polygon zkEVM client: finality requires a verified proof on L1.
//!
//! # Data Flow
//! ```text
//! L2 receipt (block N)
//!     → zkevm_batchNumberByBlockNumber(N) → batch B
//!     → zkevm_getBatchByNumber(B): verifyBatchTxHash, globalExitRoot, stateRoot
//!     → globalExitRootMap(globalExitRoot) on the L1 exit root manager (must be non-zero)
//!     → L1 receipt of verifyBatchTxHash: VerifyBatchesTrustedAggregator from the rollup contract
//!     → zkevm_verifiedBatchNumber ≥ verified batch, state roots equal
//!     → explicit finality of the L1 receipt
//! ```

use alloy::primitives::{address, Address, Bytes, B256, U256, U64};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::rpc::ethereum::EthereumClient;
use crate::rpc::ethereum2::Ethereum2Client;
use crate::rpc::types::{BlockTag, Receipt, RpcError, RpcResult};

pub const CHAIN_ID_MAINNET: u64 = 1101;
pub const CHAIN_ID_TESTNET: u64 = 1442;

const ROLLUP_CONTRACT_MAINNET: Address = address!("5132a183e9f3cb7c848b0aac5ae0c4f0491b7ab2");
const ROLLUP_CONTRACT_TESTNET: Address = address!("a997cfd539e703921fd1e3cf25b4c241a27a4c7a");
const EXIT_ROOT_MANAGER_MAINNET: Address = address!("580bda1e7a0cfae92fa7f6c20a3794f169ce3cfb");
const EXIT_ROOT_MANAGER_TESTNET: Address = address!("4d9427dca0406358445bc0a8f88c26b704004f74");

sol! {
    function globalExitRootMap(bytes32 root) external view returns (uint256 timestamp);

    #[derive(Debug)]
    event VerifyBatchesTrustedAggregator(uint64 indexed numBatch, bytes32 stateRoot, address indexed aggregator);
}

/// Subset of `zkevm_getBatchByNumber` we rely on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkBatch {
    #[serde(default)]
    pub verify_batch_tx_hash: Option<B256>,
    pub global_exit_root: B256,
    pub state_root: B256,
}

#[derive(Clone)]
pub struct ZkEvmClient {
    inner: EthereumClient,
    l1: Ethereum2Client,
    rollup_contract: Address,
    exit_root_manager: Address,
}

impl ZkEvmClient {
    /// Picks the L1 contracts from the chain id and checks the `zkevm_*` namespace.
    pub async fn new(inner: EthereumClient, l1: Ethereum2Client) -> RpcResult<Self> {
        let (rollup_contract, exit_root_manager) = match inner.rpc().chain_id().await? {
            CHAIN_ID_MAINNET => (ROLLUP_CONTRACT_MAINNET, EXIT_ROOT_MANAGER_MAINNET),
            CHAIN_ID_TESTNET => (ROLLUP_CONTRACT_TESTNET, EXIT_ROOT_MANAGER_TESTNET),
            other => {
                return Err(RpcError::Unsupported(format!(
                    "invalid chain ID {} for chain zkEVM Polygon",
                    other
                )))
            }
        };

        let client = Self {
            inner,
            l1,
            rollup_contract,
            exit_root_manager,
        };

        let head = client.inner.header_by_number(BlockTag::Latest).await?;
        let batch_number = client.batch_number_by_block_number(head.number).await?;
        client.batch_by_number(batch_number).await?;
        client.verified_batch_number().await?;

        Ok(client)
    }

    pub fn inner(&self) -> &EthereumClient {
        &self.inner
    }

    pub async fn is_finalized(&self, receipt: &Receipt) -> RpcResult<bool> {
        let Some(block_number) = receipt.block_number else {
            return Ok(false);
        };

        let batch_number = self.batch_number_by_block_number(block_number).await?;
        let batch = self.batch_by_number(batch_number).await?;

        // No proof has been sent to L1 yet.
        let Some(verify_tx_hash) = batch.verify_batch_tx_hash else {
            return Ok(false);
        };

        let timestamp = self.l1_global_exit_root_timestamp(batch.global_exit_root).await?;
        if timestamp.is_zero() {
            return Err(RpcError::Verification(format!(
                "global exit root {} not found at manager",
                batch.global_exit_root
            )));
        }

        let l1_receipt = self.l1.transaction_receipt(verify_tx_hash).await?;
        let log = l1_receipt
            .logs
            .iter()
            .rev()
            .find(|log| log.signature() == Some(&VerifyBatchesTrustedAggregator::SIGNATURE_HASH))
            .ok_or_else(|| {
                RpcError::Verification("unable to find VerifyBatchesTrustedAggregator log in transaction receipt".to_string())
            })?;
        if log.topics.len() != 3 {
            return Err(RpcError::Verification(format!(
                "unexpected amount of topics at VerifyBatchesTrustedAggregator log (want 3, got {})",
                log.topics.len()
            )));
        }
        if log.address != self.rollup_contract {
            return Err(RpcError::Verification(format!(
                "wrong contract address at log index {} (want {}, got {})",
                log.log_index, self.rollup_contract, log.address
            )));
        }

        let l1_verified_batch = U256::from_be_slice(log.topics[1].as_slice());
        let l2_verified_batch = U256::from(self.verified_batch_number().await?);
        if l2_verified_batch < l1_verified_batch {
            return Err(RpcError::Verification(format!(
                "verified batch number on l2 must be at least the last batch in the sequence on l1: expected at least {}, got {}",
                l1_verified_batch, l2_verified_batch
            )));
        }

        let l1_verified_batch = u64::try_from(l1_verified_batch)
            .map_err(|_| RpcError::UnexpectedResponse("verified batch number out of range".to_string()))?;
        let verified_batch = self.batch_by_number(l1_verified_batch).await?;
        let l1_state_root = B256::left_padding_from(&log.data[log.data.len().saturating_sub(32)..]);
        if verified_batch.state_root != l1_state_root {
            return Err(RpcError::Verification(format!(
                "verified stateRoot mismatch: expected {}, got {}",
                verified_batch.state_root, l1_state_root
            )));
        }

        self.l1.is_finalized(&l1_receipt).await
    }

    async fn batch_number_by_block_number(&self, block_number: u64) -> RpcResult<u64> {
        let value = self
            .inner
            .rpc()
            .request("zkevm_batchNumberByBlockNumber", json!([format!("{:#x}", block_number)]))
            .await?;
        parse_quantity("zkevm_batchNumberByBlockNumber", value)
    }

    pub async fn batch_by_number(&self, batch_number: u64) -> RpcResult<ZkBatch> {
        let value = self
            .inner
            .rpc()
            .request("zkevm_getBatchByNumber", json!([format!("{:#x}", batch_number), false]))
            .await?;
        if value.is_null() {
            return Err(RpcError::NotFound(format!("zkEVM batch {}", batch_number)));
        }
        serde_json::from_value(value)
            .map_err(|e| RpcError::UnexpectedResponse(format!("zkevm_getBatchByNumber: {}", e)))
    }

    async fn verified_batch_number(&self) -> RpcResult<u64> {
        let value = self.inner.rpc().request("zkevm_verifiedBatchNumber", json!([])).await?;
        parse_quantity("zkevm_verifiedBatchNumber", value)
    }

    async fn l1_global_exit_root_timestamp(&self, root: B256) -> RpcResult<U256> {
        let data = Bytes::from(globalExitRootMapCall { root }.abi_encode());
        let bz = self
            .l1
            .inner()
            .rpc()
            .call_contract(self.exit_root_manager, data)
            .await?;
        if bz.len() != 32 {
            return Err(RpcError::UnexpectedResponse(format!(
                "expected 32 bytes to be received, actual {}",
                bz.len()
            )));
        }
        Ok(U256::from_be_slice(&bz))
    }
}

fn parse_quantity(method: &str, value: Value) -> RpcResult<u64> {
    let quantity: U64 =
        serde_json::from_value(value).map_err(|e| RpcError::UnexpectedResponse(format!("{}: {}", method, e)))?;
    Ok(quantity.to::<u64>())
}
