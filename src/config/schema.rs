//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relayer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relayer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayerConfig {
    /// Identity of the local validator.
    pub validator: ValidatorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Connected EVM chains.
    pub chains: Vec<EvmChainConfig>,
}

/// Local validator identity.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Validator operator address, matched against poll participants.
    pub address: String,

    /// Account that signs vote transactions on the validator's behalf.
    pub proxy: String,
}

/// One EVM chain endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmChainConfig {
    /// Chain name as known to the voting layer (case-insensitive).
    pub name: String,

    /// JSON-RPC endpoint URL.
    pub rpc_addr: String,

    /// Skip the chain entirely when false.
    #[serde(default = "default_with_bridge")]
    pub with_bridge: bool,

    /// Name of the L1 this chain settles to; marks the chain as an L2.
    #[serde(default)]
    pub l1_chain_name: Option<String>,

    /// State commitment chain contract on L1 (Optimism only).
    #[serde(default)]
    pub state_commitment_chain: Option<String>,
}

fn default_with_bridge() -> bool {
    true
}

impl EvmChainConfig {
    pub fn is_l2(&self) -> bool {
        self.l1_chain_name.is_some()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
