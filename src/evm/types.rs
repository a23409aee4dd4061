//! Identifiers, inbound poll notifications and outbound votes.

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::evm::events::EventKind;

/// Maximum length of a chain name.
pub const CHAIN_NAME_LENGTH_MAX: usize = 20;

/// Case-insensitive chain name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainName(String);

impl ChainName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical lower-cased form. Equality, hashing and registry lookups all
    /// go through this.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_string(&self.0).map_err(|e| format!("invalid chain name: {}", e))?;
        if self.0.len() > CHAIN_NAME_LENGTH_MAX {
            return Err(format!(
                "chain name length {} is greater than {}",
                self.0.len(),
                CHAIN_NAME_LENGTH_MAX
            ));
        }
        Ok(())
    }
}

impl PartialEq for ChainName {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for ChainName {}

impl Hash for ChainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl std::fmt::Display for ChainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Non-empty, not blank, free of control characters.
pub fn validate_string(s: &str) -> Result<(), String> {
    if s.trim().is_empty() {
        return Err("string is empty".to_string());
    }
    if s.chars().any(char::is_control) {
        return Err("string contains control characters".to_string());
    }
    Ok(())
}

/// Voting round identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(pub u64);

impl std::fmt::Display for PollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validator operator address on the voting layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorAddress(pub String);

impl From<&str> for ValidatorAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

impl std::fmt::Display for ValidatorAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Poll started to confirm a deposit to a burner address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmDepositStarted {
    pub tx_id: B256,
    pub chain: ChainName,
    pub deposit_address: Address,
    pub token_address: Address,
    pub confirmation_height: u64,
    pub participants: Vec<ValidatorAddress>,
    pub poll_id: PollId,
    #[serde(default)]
    pub asset: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenDetails {
    #[serde(default)]
    pub token_name: String,
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
}

/// Poll started to confirm a token deployment through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmTokenStarted {
    pub tx_id: B256,
    pub chain: ChainName,
    pub gateway_address: Address,
    pub token_address: Address,
    pub token_details: TokenDetails,
    pub confirmation_height: u64,
    pub participants: Vec<ValidatorAddress>,
    pub poll_id: PollId,
}

/// Poll started to confirm an operatorship (key) rotation on the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmKeyTransferStarted {
    pub tx_id: B256,
    pub chain: ChainName,
    pub gateway_address: Address,
    pub confirmation_height: u64,
    pub participants: Vec<ValidatorAddress>,
    pub poll_id: PollId,
}

/// Poll started to confirm one gateway transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmGatewayTxStarted {
    pub tx_id: B256,
    pub chain: ChainName,
    pub gateway_address: Address,
    pub confirmation_height: u64,
    pub participants: Vec<ValidatorAddress>,
    pub poll_id: PollId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollMapping {
    pub tx_id: B256,
    pub poll_id: PollId,
}

/// Several gateway-transaction polls sharing one participant set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmGatewayTxsStarted {
    pub poll_mappings: Vec<PollMapping>,
    pub chain: ChainName,
    pub gateway_address: Address,
    pub confirmation_height: u64,
    pub participants: Vec<ValidatorAddress>,
}

/// A chain was added on the voting layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainAdded {
    pub chain: ChainName,
}

/// Inbound notification, one JSON object per line on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    ConfirmDepositStarted(ConfirmDepositStarted),
    ConfirmTokenStarted(ConfirmTokenStarted),
    ConfirmKeyTransferStarted(ConfirmKeyTransferStarted),
    ConfirmGatewayTxStarted(ConfirmGatewayTxStarted),
    ConfirmGatewayTxsStarted(ConfirmGatewayTxsStarted),
    ChainAdded(ChainAdded),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::ConfirmDepositStarted(_) => "deposit",
            Notification::ConfirmTokenStarted(_) => "token",
            Notification::ConfirmKeyTransferStarted(_) => "key_transfer",
            Notification::ConfirmGatewayTxStarted(_) => "gateway_tx",
            Notification::ConfirmGatewayTxsStarted(_) => "gateway_txs",
            Notification::ChainAdded(_) => "chain_added",
        }
    }
}

/// A bridge event observed on a source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub chain: ChainName,
    pub tx_id: B256,
    /// Position of the log within the transaction receipt.
    pub index: u64,
    pub event: EventKind,
}

/// Events for one chain; empty means "nothing to confirm".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteEvents {
    pub chain: ChainName,
    pub events: Vec<Event>,
}

impl VoteEvents {
    pub fn new(chain: ChainName, events: Vec<Event>) -> Self {
        Self { chain, events }
    }

    pub fn empty(chain: ChainName) -> Self {
        Self::new(chain, Vec::new())
    }
}

/// A vote on one poll, signed by the proxy account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRequest {
    pub sender: String,
    pub poll_id: PollId,
    pub vote: VoteEvents,
}

impl VoteRequest {
    pub fn new(sender: impl Into<String>, poll_id: PollId, vote: VoteEvents) -> Self {
        Self {
            sender: sender.into(),
            poll_id,
            vote,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vote.events.is_empty()
    }
}
