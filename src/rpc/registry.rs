//! Registry of chain clients keyed by lower-cased chain name.

use alloy::primitives::Address;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EvmChainConfig;
use crate::evm::types::ChainName;
use crate::rpc::client::ChainClient;
use crate::rpc::transport::{AlloyRpc, EthereumRpc};
use crate::rpc::types::{RpcError, RpcResult};

#[derive(Debug, Default, Clone)]
pub struct ClientRegistry {
    clients: HashMap<String, ChainClient>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dial every enabled chain over HTTP.
    pub async fn connect(chains: &[EvmChainConfig]) -> RpcResult<Self> {
        Self::connect_with(chains, |chain| {
            let rpc = AlloyRpc::connect(&chain.rpc_addr)?;
            Ok(Arc::new(rpc) as Arc<dyn EthereumRpc>)
        })
        .await
    }

    /// Build clients with a caller-supplied transport. L1 chains are set up
    /// before L2 chains so every L2 can find its settlement layer.
    pub async fn connect_with<F>(chains: &[EvmChainConfig], dial: F) -> RpcResult<Self>
    where
        F: Fn(&EvmChainConfig) -> RpcResult<Arc<dyn EthereumRpc>>,
    {
        let mut registry = Self::new();

        let (l2s, l1s): (Vec<_>, Vec<_>) = chains
            .iter()
            .filter(|chain| {
                if !chain.with_bridge {
                    tracing::debug!(chain = %chain.name, "Bridging disabled, skipping chain");
                }
                chain.with_bridge
            })
            .partition(|chain| chain.is_l2());

        for chain in l1s {
            let client = ChainClient::probe(dial(chain)?)
                .await
                .map_err(|e| RpcError::Transport(format!("cannot connect to chain {}: {}", chain.name, e)))?;
            tracing::info!(chain = %chain.name, kind = %client.kind(), "Connected to EVM chain");
            registry.insert(&chain.name, client);
        }

        for chain in l2s {
            let l1_name = chain.l1_chain_name.as_deref().unwrap_or_default();
            let l1 = registry.get(l1_name).cloned().ok_or_else(|| {
                RpcError::Unsupported(format!("L1 chain {} of {} is not connected", l1_name, chain.name))
            })?;

            let scc = chain
                .state_commitment_chain
                .as_deref()
                .map(|addr| {
                    addr.parse::<Address>().map_err(|_| {
                        RpcError::Unsupported("state commitment chain is not a valid evm address".to_string())
                    })
                })
                .transpose()?;

            let client = ChainClient::probe_l2(&chain.name, dial(chain)?, &l1, scc)
                .await
                .map_err(|e| RpcError::Transport(format!("cannot connect to chain {}: {}", chain.name, e)))?;
            tracing::info!(chain = %chain.name, l1 = %l1_name, kind = %client.kind(), "Connected to L2 chain");
            registry.insert(&chain.name, client);
        }

        Ok(registry)
    }

    pub fn insert(&mut self, chain: &str, client: ChainClient) {
        self.clients.insert(ChainName::new(chain).normalized(), client);
    }

    pub fn get(&self, chain: &str) -> Option<&ChainClient> {
        self.clients.get(&ChainName::new(chain).normalized())
    }

    /// Lower-cased names of connected chains, sorted.
    pub fn chains(&self) -> Vec<String> {
        let mut names: Vec<_> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Close every client.
    pub fn close(self) {
        for (chain, client) in self.clients {
            tracing::debug!(chain = %chain, "Closing RPC client");
            client.close();
        }
    }
}
