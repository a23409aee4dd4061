//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (L2 chains reference a configured L1)
//! - Validate addresses, URLs and bind addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use crate::config::schema::RelayerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.validator.address.trim().is_empty() {
        errors.push(ValidationError::new("validator.address", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}', expected pretty or json", config.observability.log_format),
        ));
    }

    // lower-cased name -> is_l2
    let mut chains: HashMap<String, bool> = HashMap::new();
    let mut seen = HashSet::new();
    for (i, chain) in config.chains.iter().enumerate() {
        let field = format!("chains[{}]", i);
        let name = chain.name.trim().to_lowercase();

        if name.is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
            continue;
        }
        if !seen.insert(name.clone()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate chain '{}'", chain.name),
            ));
        }
        chains.insert(name, chain.is_l2());

        if chain.rpc_addr.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new(
                format!("{}.rpc_addr", field),
                format!("'{}' is not a valid URL", chain.rpc_addr),
            ));
        }
    }

    for (i, chain) in config.chains.iter().enumerate() {
        let field = format!("chains[{}]", i);
        let name = chain.name.trim().to_lowercase();

        if let Some(l1) = &chain.l1_chain_name {
            let l1_name = l1.trim().to_lowercase();
            if l1_name == name {
                errors.push(ValidationError::new(
                    format!("{}.l1_chain_name", field),
                    "chain cannot be its own L1",
                ));
            } else {
                match chains.get(&l1_name) {
                    None => errors.push(ValidationError::new(
                        format!("{}.l1_chain_name", field),
                        format!("unknown L1 chain '{}'", l1),
                    )),
                    Some(true) => errors.push(ValidationError::new(
                        format!("{}.l1_chain_name", field),
                        format!("L1 chain '{}' is itself an L2", l1),
                    )),
                    Some(false) => {}
                }
            }
        }

        match &chain.state_commitment_chain {
            Some(scc) if scc.parse::<Address>().is_err() => errors.push(ValidationError::new(
                format!("{}.state_commitment_chain", field),
                "state commitment chain is not a valid evm address",
            )),
            None if name == "optimism" && chain.with_bridge => errors.push(ValidationError::new(
                format!("{}.state_commitment_chain", field),
                "state commitment chain is required for optimism",
            )),
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
