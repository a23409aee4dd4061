//! Typed bridge events and their stateless validation.

use alloy::primitives::{Address, B256, U256};
use serde::Serialize;
use thiserror::Error;

use crate::evm::types::{validate_string, ChainName};

/// An event that failed basic validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct EventValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl EventValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

type ValidationResult = Result<(), EventValidationError>;

/// ERC-20 transfer into a deposit address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTransfer {
    pub to: Address,
    pub amount: U256,
}

impl EventTransfer {
    pub fn validate_basic(&self) -> ValidationResult {
        non_zero_address("to", self.to)?;
        positive("amount", self.amount)
    }
}

/// Token deployed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTokenDeployed {
    pub symbol: String,
    pub token_address: Address,
}

impl EventTokenDeployed {
    pub fn validate_basic(&self) -> ValidationResult {
        non_zero_address("token address", self.token_address)?;
        valid_string("symbol", &self.symbol)
    }
}

/// Operator set rotated on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventMultisigOperatorshipTransferred {
    pub new_operators: Vec<Address>,
    pub new_weights: Vec<U256>,
    pub new_threshold: U256,
}

impl EventMultisigOperatorshipTransferred {
    pub fn validate_basic(&self) -> ValidationResult {
        if self.new_operators.iter().any(|a| a.is_zero()) {
            return Err(EventValidationError::new("new operators", "contains zero address"));
        }
        if self.new_operators.len() != self.new_weights.len() {
            return Err(EventValidationError::new(
                "new weights",
                format!(
                    "length {} does not match operators length {}",
                    self.new_weights.len(),
                    self.new_operators.len()
                ),
            ));
        }
        if self.new_threshold.is_zero() {
            return Err(EventValidationError::new("new threshold", "must be greater than zero"));
        }

        let total = self
            .new_weights
            .iter()
            .try_fold(U256::ZERO, |acc, w| acc.checked_add(*w))
            .ok_or_else(|| EventValidationError::new("new weights", "sum overflows"))?;
        if self.new_threshold > total {
            return Err(EventValidationError::new(
                "new threshold",
                format!("{} exceeds total weight {}", self.new_threshold, total),
            ));
        }
        Ok(())
    }
}

/// General message passing call through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventContractCall {
    pub sender: Address,
    pub destination_chain: ChainName,
    pub contract_address: String,
    pub payload_hash: B256,
}

impl EventContractCall {
    pub fn validate_basic(&self) -> ValidationResult {
        non_zero_address("sender", self.sender)?;
        valid_chain("destination chain", &self.destination_chain)?;
        valid_string("contract address", &self.contract_address)?;
        if self.payload_hash.is_zero() {
            return Err(EventValidationError::new("payload hash", "must not be zero"));
        }
        Ok(())
    }
}

/// Contract call carrying a token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventContractCallWithToken {
    pub sender: Address,
    pub destination_chain: ChainName,
    pub contract_address: String,
    pub payload_hash: B256,
    pub symbol: String,
    pub amount: U256,
}

impl EventContractCallWithToken {
    pub fn validate_basic(&self) -> ValidationResult {
        non_zero_address("sender", self.sender)?;
        valid_chain("destination chain", &self.destination_chain)?;
        valid_string("contract address", &self.contract_address)?;
        if self.payload_hash.is_zero() {
            return Err(EventValidationError::new("payload hash", "must not be zero"));
        }
        valid_string("symbol", &self.symbol)?;
        positive("amount", self.amount)
    }
}

/// Plain cross-chain token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTokenSent {
    pub sender: Address,
    pub destination_chain: ChainName,
    pub destination_address: String,
    pub symbol: String,
    pub amount: U256,
}

impl EventTokenSent {
    pub fn validate_basic(&self) -> ValidationResult {
        non_zero_address("sender", self.sender)?;
        valid_chain("destination chain", &self.destination_chain)?;
        valid_string("destination address", &self.destination_address)?;
        valid_string("symbol", &self.symbol)?;
        positive("amount", self.amount)
    }
}

/// Payload of a vote event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Transfer(EventTransfer),
    TokenDeployed(EventTokenDeployed),
    MultisigOperatorshipTransferred(EventMultisigOperatorshipTransferred),
    ContractCall(EventContractCall),
    ContractCallWithToken(EventContractCallWithToken),
    TokenSent(EventTokenSent),
}

impl EventKind {
    pub fn validate_basic(&self) -> ValidationResult {
        match self {
            EventKind::Transfer(e) => e.validate_basic(),
            EventKind::TokenDeployed(e) => e.validate_basic(),
            EventKind::MultisigOperatorshipTransferred(e) => e.validate_basic(),
            EventKind::ContractCall(e) => e.validate_basic(),
            EventKind::ContractCallWithToken(e) => e.validate_basic(),
            EventKind::TokenSent(e) => e.validate_basic(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Transfer(_) => "transfer",
            EventKind::TokenDeployed(_) => "token_deployed",
            EventKind::MultisigOperatorshipTransferred(_) => "multisig_operatorship_transferred",
            EventKind::ContractCall(_) => "contract_call",
            EventKind::ContractCallWithToken(_) => "contract_call_with_token",
            EventKind::TokenSent(_) => "token_sent",
        }
    }
}

fn non_zero_address(field: &'static str, address: Address) -> ValidationResult {
    if address.is_zero() {
        return Err(EventValidationError::new(field, "must not be the zero address"));
    }
    Ok(())
}

fn positive(field: &'static str, amount: U256) -> ValidationResult {
    if amount.is_zero() {
        return Err(EventValidationError::new(field, "must be greater than zero"));
    }
    Ok(())
}

fn valid_string(field: &'static str, s: &str) -> ValidationResult {
    validate_string(s).map_err(|reason| EventValidationError::new(field, reason))
}

fn valid_chain(field: &'static str, chain: &ChainName) -> ValidationResult {
    chain.validate().map_err(|reason| EventValidationError::new(field, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const SENDER: Address = address!("00000000000000000000000000000000000000aa");

    fn contract_call() -> EventContractCall {
        EventContractCall {
            sender: SENDER,
            destination_chain: ChainName::new("Osmosis"),
            contract_address: "osmo1destination".to_string(),
            payload_hash: B256::repeat_byte(0x11),
        }
    }

    #[test]
    fn test_transfer_validation() {
        let valid = EventTransfer {
            to: SENDER,
            amount: U256::from(1),
        };
        assert!(valid.validate_basic().is_ok());

        let zero_amount = EventTransfer {
            amount: U256::ZERO,
            ..valid.clone()
        };
        assert_eq!(zero_amount.validate_basic().unwrap_err().field, "amount");

        let zero_to = EventTransfer {
            to: Address::ZERO,
            ..valid
        };
        assert_eq!(zero_to.validate_basic().unwrap_err().field, "to");
    }

    #[test]
    fn test_operatorship_validation() {
        let valid = EventMultisigOperatorshipTransferred {
            new_operators: vec![SENDER, address!("00000000000000000000000000000000000000bb")],
            new_weights: vec![U256::from(1), U256::from(2)],
            new_threshold: U256::from(3),
        };
        assert!(valid.validate_basic().is_ok());

        let over_threshold = EventMultisigOperatorshipTransferred {
            new_threshold: U256::from(4),
            ..valid.clone()
        };
        assert_eq!(over_threshold.validate_basic().unwrap_err().field, "new threshold");

        let mismatched = EventMultisigOperatorshipTransferred {
            new_weights: vec![U256::from(3)],
            ..valid.clone()
        };
        assert_eq!(mismatched.validate_basic().unwrap_err().field, "new weights");

        let zero_operator = EventMultisigOperatorshipTransferred {
            new_operators: vec![SENDER, Address::ZERO],
            ..valid
        };
        assert_eq!(zero_operator.validate_basic().unwrap_err().field, "new operators");
    }

    #[test]
    fn test_contract_call_validation() {
        assert!(contract_call().validate_basic().is_ok());

        let evm_destination = EventContractCall {
            destination_chain: ChainName::new("Avalanche"),
            contract_address: "0xB5FB4BE02232B1bBA4dC8f81dc24C26980dE9e3C".to_string(),
            ..contract_call()
        };
        assert!(evm_destination.validate_basic().is_ok());

        let blank_contract = EventContractCall {
            contract_address: "  ".to_string(),
            ..contract_call()
        };
        assert_eq!(blank_contract.validate_basic().unwrap_err().field, "contract address");

        let blank_chain = EventContractCall {
            destination_chain: ChainName::new(" "),
            ..contract_call()
        };
        assert_eq!(blank_chain.validate_basic().unwrap_err().field, "destination chain");

        let zero_hash = EventContractCall {
            payload_hash: B256::ZERO,
            ..contract_call()
        };
        assert_eq!(zero_hash.validate_basic().unwrap_err().field, "payload hash");
    }

    #[test]
    fn test_token_sent_validation() {
        let sent = EventTokenSent {
            sender: SENDER,
            destination_chain: ChainName::new("Osmosis"),
            destination_address: "osmo1destination".to_string(),
            symbol: "USDC".to_string(),
            amount: U256::from(5),
        };
        assert!(sent.validate_basic().is_ok());

        let to_evm = EventTokenSent {
            destination_chain: ChainName::new("Avalanche"),
            destination_address: "b5fb4be02232b1bba4dc8f81dc24c26980de9e3c".to_string(),
            ..sent.clone()
        };
        assert!(to_evm.validate_basic().is_ok());

        let zero_amount = EventTokenSent {
            amount: U256::ZERO,
            ..sent
        };
        assert_eq!(zero_amount.validate_basic().unwrap_err().field, "amount");
    }

    #[test]
    fn test_event_kind_serializes_with_tag() {
        let json = serde_json::to_value(EventKind::ContractCall(contract_call())).unwrap();
        assert_eq!(json["kind"], "contract_call");
        assert_eq!(json["destination_chain"], "Osmosis");
    }
}
