//! EVM chain RPC subsystem.
//!
//! # Data Flow
//! ```text
//! EvmChainConfig
//!     → transport.rs (alloy HTTP provider behind the EthereumRpc trait)
//!     → client.rs (capability probe → ChainClient variant)
//!     → registry.rs (lower-cased chain name → ChainClient)
//!
//! Finality variants:
//!     ethereum.rs   head - confirmations + 1
//!     ethereum2.rs  "finalized" block tag
//!     moonbeam.rs   chain_getFinalizedHead / chain_getHeader
//!     arbitrum.rs   NodeInterface getL1Confirmations vs L1 finalized depth
//!     optimism.rs   StateBatchAppended binary search, then L1 finality
//!     zkevm.rs      verified proof on L1, then L1 finality
//! ```
//!
//! # Design Decisions
//! - No timeouts or retries here; transient failures surface to the caller
//! - L2 variants always bottom out in explicit finality on their L1

pub mod arbitrum;
pub mod client;
pub mod ethereum;
pub mod ethereum2;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod moonbeam;
pub mod optimism;
pub mod registry;
pub mod transport;
pub mod types;
pub mod zkevm;

pub use client::{ChainClient, FinalityKind};
pub use registry::ClientRegistry;
pub use transport::{AlloyRpc, EthereumRpc};
pub use types::{BlockTag, Header, Log, LogQuery, Receipt, RpcError, RpcResult};
