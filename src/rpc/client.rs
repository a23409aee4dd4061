//! Per-chain client with the finality rule picked at construction.
//!
//! # Responsibilities
//! - Probe an L1 endpoint for the most specific finality capability
//! - Build L2 clients by chain name on top of an explicit-finality L1
//! - Expose one `is_finalized` predicate regardless of variant
//!
//! # Design Decisions
//! - Tagged enum rather than trait objects: the set of variants is closed and
//!   L2 constructors need to know the concrete L1 variant
//! - Probe order is most specific first: parachain, explicit finality, generic

use alloy::primitives::{Address, B256};
use std::sync::Arc;

use crate::rpc::arbitrum::ArbitrumClient;
use crate::rpc::ethereum::EthereumClient;
use crate::rpc::ethereum2::Ethereum2Client;
use crate::rpc::moonbeam::MoonbeamClient;
use crate::rpc::optimism::OptimismClient;
use crate::rpc::transport::EthereumRpc;
use crate::rpc::types::{BlockTag, Header, Receipt, RpcError, RpcResult};
use crate::rpc::zkevm::ZkEvmClient;

/// Which finality rule a client applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalityKind {
    Confirmations,
    ExplicitFinality,
    Parachain,
    ArbitrumL1Confirmations,
    OptimismStateBatch,
    ZkEvmProof,
}

impl std::fmt::Display for FinalityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FinalityKind::Confirmations => "confirmation-count",
            FinalityKind::ExplicitFinality => "explicit-finality",
            FinalityKind::Parachain => "parachain-finality",
            FinalityKind::ArbitrumL1Confirmations => "arbitrum-l1-confirmations",
            FinalityKind::OptimismStateBatch => "optimism-state-batch",
            FinalityKind::ZkEvmProof => "zkevm-proof",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub enum ChainClient {
    Ethereum(EthereumClient),
    Ethereum2(Ethereum2Client),
    Moonbeam(MoonbeamClient),
    Arbitrum(ArbitrumClient),
    Optimism(OptimismClient),
    ZkEvm(ZkEvmClient),
}

impl ChainClient {
    /// Classify an L1 endpoint.
    pub async fn probe(rpc: Arc<dyn EthereumRpc>) -> RpcResult<Self> {
        let ethereum = EthereumClient::new(rpc).await?;

        match MoonbeamClient::new(ethereum.clone()).await {
            Ok(client) => return Ok(ChainClient::Moonbeam(client)),
            Err(e) => tracing::debug!(error = %e, "Parachain finality not available"),
        }

        match Ethereum2Client::new(ethereum.clone()).await {
            Ok(client) => return Ok(ChainClient::Ethereum2(client)),
            Err(e) => tracing::debug!(error = %e, "Finalized block tag not available"),
        }

        Ok(ChainClient::Ethereum(ethereum))
    }

    /// Build an L2 client by chain name. The L1 must use explicit finality.
    pub async fn probe_l2(
        name: &str,
        rpc: Arc<dyn EthereumRpc>,
        l1: &ChainClient,
        state_commitment_chain: Option<Address>,
    ) -> RpcResult<Self> {
        let ethereum = EthereumClient::new(rpc).await?;
        let name = name.to_lowercase();

        let l1 = match l1 {
            ChainClient::Ethereum2(client) => client.clone(),
            other => {
                return Err(RpcError::Unsupported(format!(
                    "l1 client has to be ethereum 2.0 for {}, got {}",
                    name,
                    other.kind()
                )))
            }
        };

        match name.as_str() {
            "arbitrum" => Ok(ChainClient::Arbitrum(ArbitrumClient::new(ethereum, l1).await?)),
            "optimism" => {
                let scc = state_commitment_chain.ok_or_else(|| {
                    RpcError::Unsupported("state commitment chain is required for optimism".to_string())
                })?;
                Ok(ChainClient::Optimism(OptimismClient::new(ethereum, l1, scc).await?))
            }
            "polygon-zkevm" | "zkevm" => Ok(ChainClient::ZkEvm(ZkEvmClient::new(ethereum, l1).await?)),
            _ => Err(RpcError::Unsupported(format!("unsupported L2 chain {}", name))),
        }
    }

    pub fn kind(&self) -> FinalityKind {
        match self {
            ChainClient::Ethereum(_) => FinalityKind::Confirmations,
            ChainClient::Ethereum2(_) => FinalityKind::ExplicitFinality,
            ChainClient::Moonbeam(_) => FinalityKind::Parachain,
            ChainClient::Arbitrum(_) => FinalityKind::ArbitrumL1Confirmations,
            ChainClient::Optimism(_) => FinalityKind::OptimismStateBatch,
            ChainClient::ZkEvm(_) => FinalityKind::ZkEvmProof,
        }
    }

    fn base(&self) -> &EthereumClient {
        match self {
            ChainClient::Ethereum(client) => client,
            ChainClient::Ethereum2(client) => client.inner(),
            ChainClient::Moonbeam(client) => client.inner(),
            ChainClient::Arbitrum(client) => client.inner(),
            ChainClient::Optimism(client) => client.inner(),
            ChainClient::ZkEvm(client) => client.inner(),
        }
    }

    pub async fn transaction_receipt(&self, tx_hash: B256) -> RpcResult<Receipt> {
        self.base().transaction_receipt(tx_hash).await
    }

    pub async fn transaction_receipts(&self, tx_hashes: &[B256]) -> RpcResult<Vec<RpcResult<Receipt>>> {
        self.base().transaction_receipts(tx_hashes).await
    }

    pub async fn header_by_number(&self, tag: BlockTag) -> RpcResult<Header> {
        self.base().header_by_number(tag).await
    }

    /// Highest finalized block height. Only L1 variants have a chain-wide
    /// finalized height; rollups judge finality per receipt.
    pub async fn latest_finalized_block_number(&self, confirmations: u64) -> RpcResult<Option<u64>> {
        match self {
            ChainClient::Ethereum(client) => client.latest_finalized_block_number(confirmations).await,
            ChainClient::Ethereum2(client) => client.latest_finalized_block_number().await.map(Some),
            ChainClient::Moonbeam(client) => client.latest_finalized_block_number().await.map(Some),
            other => Err(RpcError::Unsupported(format!(
                "{} has no chain-wide finalized height",
                other.kind()
            ))),
        }
    }

    /// A finalized height that covers `receipt`, or `None` if it is not final yet.
    ///
    /// For L1 variants this is the chain's finalized height, which callers can
    /// cache. For rollups it is the receipt's own block.
    pub async fn finalized_height(&self, confirmations: u64, receipt: &Receipt) -> RpcResult<Option<u64>> {
        let Some(block_number) = receipt.block_number else {
            return Ok(None);
        };

        let height = match self {
            ChainClient::Ethereum(_) | ChainClient::Ethereum2(_) | ChainClient::Moonbeam(_) => {
                self.latest_finalized_block_number(confirmations).await?
            }
            ChainClient::Arbitrum(client) => client.is_finalized(receipt).await?.then_some(block_number),
            ChainClient::Optimism(client) => client.is_finalized(receipt).await?.then_some(block_number),
            ChainClient::ZkEvm(client) => client.is_finalized(receipt).await?.then_some(block_number),
        };

        Ok(height.filter(|height| *height >= block_number))
    }

    pub async fn is_finalized(&self, confirmations: u64, receipt: &Receipt) -> RpcResult<bool> {
        Ok(self.finalized_height(confirmations, receipt).await?.is_some())
    }

    /// Release the connection. HTTP transports hold no session, so this only drops the client.
    pub fn close(self) {
        tracing::debug!(kind = %self.kind(), "Closing chain client");
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient").field("kind", &self.kind()).finish()
    }
}
