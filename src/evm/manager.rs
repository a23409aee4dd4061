//! Confirmation manager: turns poll notifications into votes.
//!
//! # Responsibilities
//! - Skip polls the local validator does not take part in, before any I/O
//! - Fetch receipts and decide finality, consulting the finalized block cache
//! - Extract the events each flow is looking for
//! - Broadcast exactly one vote per poll
//!
//! # Data Flow
//! ```text
//! Notification
//!     → participation check
//!     → ClientRegistry (chain name → ChainClient)
//!     → receipt + finality (cache, then live query)
//!     → flow-specific log scan (decoders.rs)
//!     → VoteRequest → Broadcaster
//! ```
//!
//! # Design Decisions
//! - A missing, reverted or not-yet-final transaction yields an empty vote,
//!   not an error; only configuration and transport problems are errors
//! - No retries: the voting layer re-polls if a vote never lands

use alloy::primitives::{Address, B256};
use alloy::sol_types::SolEvent;
use std::sync::Arc;
use thiserror::Error;

use crate::evm::broadcast::{BroadcastError, Broadcaster};
use crate::evm::cache::FinalizedBlockCache;
use crate::evm::decoders::{self, abi};
use crate::evm::events::EventKind;
use crate::evm::types::{
    ChainAdded, ChainName, ConfirmDepositStarted, ConfirmGatewayTxStarted, ConfirmKeyTransferStarted,
    ConfirmTokenStarted, Event, Notification, PollId, ValidatorAddress, VoteEvents, VoteRequest,
};
use crate::observability::metrics;
use crate::rpc::{ChainClient, ClientRegistry, Receipt, RpcError};

#[derive(Debug, Error)]
pub enum ConfirmationError {
    #[error("no RPC client for chain {0}")]
    UnknownChain(String),

    #[error("failed to get receipt of tx {tx_id} on chain {chain}: {source}")]
    Receipt {
        chain: String,
        tx_id: B256,
        #[source]
        source: RpcError,
    },

    #[error("cannot determine if tx {tx_id} on chain {chain} is finalized: {source}")]
    Finality {
        chain: String,
        tx_id: B256,
        #[source]
        source: RpcError,
    },

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

pub type ConfirmationResult<T> = Result<T, ConfirmationError>;

/// Where a transaction stands, as far as voting is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptFinality {
    /// Finalized and executed successfully.
    Finalized(Receipt),
    /// Finalized but reverted.
    Failed,
    NotFinalized,
    NotFound,
}

impl ReceiptFinality {
    pub fn into_receipt(self) -> Option<Receipt> {
        match self {
            ReceiptFinality::Finalized(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ReceiptFinality::Finalized(_) => "finalized",
            ReceiptFinality::Failed => "transaction failed",
            ReceiptFinality::NotFinalized => "transaction not finalized",
            ReceiptFinality::NotFound => "transaction not found",
        }
    }
}

pub struct ConfirmationManager {
    pub(crate) rpcs: ClientRegistry,
    pub(crate) broadcaster: Arc<dyn Broadcaster>,
    pub(crate) validator: ValidatorAddress,
    pub(crate) proxy: String,
    pub(crate) latest_finalized_blocks: FinalizedBlockCache,
}

impl ConfirmationManager {
    pub fn new(
        rpcs: ClientRegistry,
        broadcaster: Arc<dyn Broadcaster>,
        validator: ValidatorAddress,
        proxy: impl Into<String>,
    ) -> Self {
        Self {
            rpcs,
            broadcaster,
            validator,
            proxy: proxy.into(),
            latest_finalized_blocks: FinalizedBlockCache::new(),
        }
    }

    pub fn cache(&self) -> &FinalizedBlockCache {
        &self.latest_finalized_blocks
    }

    /// Route a notification to its flow.
    pub async fn handle(&self, notification: Notification) -> ConfirmationResult<()> {
        metrics::record_notification(notification.kind());
        match notification {
            Notification::ConfirmDepositStarted(event) => self.process_deposit_confirmation(&event).await,
            Notification::ConfirmTokenStarted(event) => self.process_token_confirmation(&event).await,
            Notification::ConfirmKeyTransferStarted(event) => self.process_transfer_key_confirmation(&event).await,
            Notification::ConfirmGatewayTxStarted(event) => self.process_gateway_tx_confirmation(&event).await,
            Notification::ConfirmGatewayTxsStarted(event) => self.process_gateway_txs_confirmation(&event).await,
            Notification::ChainAdded(event) => {
                self.process_new_chain(&event);
                Ok(())
            }
        }
    }

    /// Vote on a deposit: every ERC-20 transfer of the token into the deposit address.
    pub async fn process_deposit_confirmation(&self, event: &ConfirmDepositStarted) -> ConfirmationResult<()> {
        if !self.is_participant_of(&event.participants) {
            tracing::debug!(poll_id = %event.poll_id, "Not a participant of poll, skipping");
            return Ok(());
        }

        let finality = self
            .get_tx_receipt_if_finalized(&event.chain, event.tx_id, event.confirmation_height)
            .await?;
        let Some(receipt) = self.finalized_or_log(&event.chain, event.tx_id, event.poll_id, finality) else {
            return self.vote("deposit", event.poll_id, VoteEvents::empty(event.chain.clone())).await;
        };

        let events = deposit_events(&receipt, &event.chain, event.tx_id, event.token_address, event.deposit_address);
        self.vote("deposit", event.poll_id, VoteEvents::new(event.chain.clone(), events)).await
    }

    /// Vote on a token deployment: the first matching TokenDeployed from the gateway.
    pub async fn process_token_confirmation(&self, event: &ConfirmTokenStarted) -> ConfirmationResult<()> {
        if !self.is_participant_of(&event.participants) {
            tracing::debug!(poll_id = %event.poll_id, "Not a participant of poll, skipping");
            return Ok(());
        }

        let finality = self
            .get_tx_receipt_if_finalized(&event.chain, event.tx_id, event.confirmation_height)
            .await?;
        let Some(receipt) = self.finalized_or_log(&event.chain, event.tx_id, event.poll_id, finality) else {
            return self.vote("token", event.poll_id, VoteEvents::empty(event.chain.clone())).await;
        };

        let events = token_events(
            &receipt,
            &event.chain,
            event.tx_id,
            event.gateway_address,
            event.token_address,
            &event.token_details.symbol,
        );
        self.vote("token", event.poll_id, VoteEvents::new(event.chain.clone(), events)).await
    }

    /// Vote on an operatorship rotation: only the latest one in the transaction counts.
    pub async fn process_transfer_key_confirmation(&self, event: &ConfirmKeyTransferStarted) -> ConfirmationResult<()> {
        if !self.is_participant_of(&event.participants) {
            tracing::debug!(poll_id = %event.poll_id, "Not a participant of poll, skipping");
            return Ok(());
        }

        let finality = self
            .get_tx_receipt_if_finalized(&event.chain, event.tx_id, event.confirmation_height)
            .await?;
        let Some(receipt) = self.finalized_or_log(&event.chain, event.tx_id, event.poll_id, finality) else {
            return self
                .vote("key_transfer", event.poll_id, VoteEvents::empty(event.chain.clone()))
                .await;
        };

        let events = key_transfer_events(&receipt, &event.chain, event.tx_id, event.gateway_address);
        self.vote("key_transfer", event.poll_id, VoteEvents::new(event.chain.clone(), events))
            .await
    }

    /// Vote on one gateway transaction: every valid gateway event it emitted.
    pub async fn process_gateway_tx_confirmation(&self, event: &ConfirmGatewayTxStarted) -> ConfirmationResult<()> {
        if !self.is_participant_of(&event.participants) {
            tracing::debug!(poll_id = %event.poll_id, "Not a participant of poll, skipping");
            return Ok(());
        }

        let finality = self
            .get_tx_receipt_if_finalized(&event.chain, event.tx_id, event.confirmation_height)
            .await?;
        let Some(receipt) = self.finalized_or_log(&event.chain, event.tx_id, event.poll_id, finality) else {
            return self
                .vote("gateway_tx", event.poll_id, VoteEvents::empty(event.chain.clone()))
                .await;
        };

        let events = gateway_events(&receipt, &event.chain, event.tx_id, event.gateway_address);
        self.vote("gateway_tx", event.poll_id, VoteEvents::new(event.chain.clone(), events))
            .await
    }

    /// New chains need a config change and a restart; nothing to vote on.
    pub fn process_new_chain(&self, event: &ChainAdded) {
        tracing::info!(
            chain = %event.chain,
            "Relayer needs to be updated and restarted for new chain {}",
            event.chain
        );
    }

    /// Fetch a receipt and decide whether it is final.
    ///
    /// A missing receipt is not an error. Lookup and finality failures are.
    pub async fn get_tx_receipt_if_finalized(
        &self,
        chain: &ChainName,
        tx_id: B256,
        confirmations: u64,
    ) -> ConfirmationResult<ReceiptFinality> {
        let client = self.client(chain)?;

        let receipt = match client.transaction_receipt(tx_id).await {
            Ok(receipt) => receipt,
            Err(e) if e.is_not_found() => return Ok(ReceiptFinality::NotFound),
            Err(source) => {
                metrics::record_rpc_error(chain.as_str());
                return Err(ConfirmationError::Receipt {
                    chain: chain.to_string(),
                    tx_id,
                    source,
                });
            }
        };

        self.check_finality(client, chain, receipt, confirmations).await
    }

    pub(crate) fn client(&self, chain: &ChainName) -> ConfirmationResult<&ChainClient> {
        self.rpcs
            .get(chain.as_str())
            .ok_or_else(|| ConfirmationError::UnknownChain(chain.to_string()))
    }

    pub(crate) async fn check_finality(
        &self,
        client: &ChainClient,
        chain: &ChainName,
        receipt: Receipt,
        confirmations: u64,
    ) -> ConfirmationResult<ReceiptFinality> {
        let finalized = self
            .is_finalized(client, chain, &receipt, confirmations)
            .await
            .map_err(|source| {
                metrics::record_rpc_error(chain.as_str());
                ConfirmationError::Finality {
                    chain: chain.to_string(),
                    tx_id: receipt.tx_hash,
                    source,
                }
            })?;

        Ok(match (finalized, receipt.status) {
            (false, _) => ReceiptFinality::NotFinalized,
            (true, false) => ReceiptFinality::Failed,
            (true, true) => ReceiptFinality::Finalized(receipt),
        })
    }

    async fn is_finalized(
        &self,
        client: &ChainClient,
        chain: &ChainName,
        receipt: &Receipt,
        confirmations: u64,
    ) -> Result<bool, RpcError> {
        let Some(block_number) = receipt.block_number else {
            return Ok(false);
        };
        if self.latest_finalized_blocks.covers(chain, block_number) {
            return Ok(true);
        }

        match client.finalized_height(confirmations, receipt).await? {
            Some(height) => {
                self.latest_finalized_blocks.set(chain, height);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn is_participant_of(&self, participants: &[ValidatorAddress]) -> bool {
        participants.contains(&self.validator)
    }

    pub(crate) fn finalized_or_log(
        &self,
        chain: &ChainName,
        tx_id: B256,
        poll_id: PollId,
        finality: ReceiptFinality,
    ) -> Option<Receipt> {
        if !matches!(finality, ReceiptFinality::Finalized(_)) {
            tracing::info!(
                chain = %chain,
                tx_id = %tx_id,
                poll_id = %poll_id,
                reason = finality.reason(),
                "Voting empty"
            );
        }
        finality.into_receipt()
    }

    async fn vote(&self, flow: &'static str, poll_id: PollId, vote: VoteEvents) -> ConfirmationResult<()> {
        let chain = vote.chain.clone();
        let outcome = if vote.events.is_empty() { "empty" } else { "events" };
        let request = VoteRequest::new(self.proxy.clone(), poll_id, vote);

        let handle = self.broadcaster.broadcast(vec![request]).await?;
        metrics::record_vote(flow, chain.as_str(), outcome);
        tracing::debug!(chain = %chain, poll_id = %poll_id, handle = %handle, flow, "Vote broadcast");
        Ok(())
    }
}

fn new_event(chain: &ChainName, tx_id: B256, index: usize, event: EventKind) -> Event {
    Event {
        chain: chain.clone(),
        tx_id,
        index: index as u64,
        event,
    }
}

pub(crate) fn deposit_events(
    receipt: &Receipt,
    chain: &ChainName,
    tx_id: B256,
    token_address: Address,
    deposit_address: Address,
) -> Vec<Event> {
    let mut events = Vec::new();
    for (i, log) in receipt.logs.iter().enumerate() {
        if log.address != token_address || log.signature() != Some(&abi::Transfer::SIGNATURE_HASH) {
            continue;
        }

        let transfer = match decoders::decode_erc20_transfer(log) {
            Ok((_, transfer)) => transfer,
            Err(e) => {
                tracing::debug!(chain = %chain, tx_id = %tx_id, index = i, error = %e, "Decode ERC20 transfer failed");
                continue;
            }
        };
        if transfer.to != deposit_address {
            continue;
        }
        if let Err(e) = transfer.validate_basic() {
            tracing::debug!(chain = %chain, tx_id = %tx_id, index = i, error = %e, "Invalid ERC20 transfer");
            continue;
        }

        events.push(new_event(chain, tx_id, i, EventKind::Transfer(transfer)));
    }
    events
}

pub(crate) fn token_events(
    receipt: &Receipt,
    chain: &ChainName,
    tx_id: B256,
    gateway_address: Address,
    token_address: Address,
    symbol: &str,
) -> Vec<Event> {
    for (i, log) in receipt.logs.iter().enumerate() {
        if log.address != gateway_address || log.signature() != Some(&abi::TokenDeployed::SIGNATURE_HASH) {
            continue;
        }

        let deployed = match decoders::decode_token_deployed(log) {
            Ok(deployed) => deployed,
            Err(e) => {
                tracing::debug!(chain = %chain, tx_id = %tx_id, index = i, error = %e, "Decode token deployment failed");
                continue;
            }
        };
        if deployed.token_address != token_address || deployed.symbol != symbol {
            continue;
        }
        if let Err(e) = deployed.validate_basic() {
            tracing::debug!(chain = %chain, tx_id = %tx_id, index = i, error = %e, "Invalid token deployment");
            continue;
        }

        return vec![new_event(chain, tx_id, i, EventKind::TokenDeployed(deployed))];
    }
    Vec::new()
}

/// Scans backwards so the latest rotation in the transaction wins.
pub(crate) fn key_transfer_events(receipt: &Receipt, chain: &ChainName, tx_id: B256, gateway_address: Address) -> Vec<Event> {
    for (i, log) in receipt.logs.iter().enumerate().rev() {
        if log.address != gateway_address
            || log.signature() != Some(&abi::OperatorshipTransferred::SIGNATURE_HASH)
        {
            continue;
        }

        let transferred = match decoders::decode_operatorship_transferred(log) {
            Ok(transferred) => transferred,
            Err(e) => {
                tracing::debug!(chain = %chain, tx_id = %tx_id, index = i, error = %e, "Decode operatorship transfer failed");
                continue;
            }
        };
        if let Err(e) = transferred.validate_basic() {
            tracing::debug!(chain = %chain, tx_id = %tx_id, index = i, error = %e, "Invalid operatorship transfer");
            continue;
        }

        return vec![new_event(chain, tx_id, i, EventKind::MultisigOperatorshipTransferred(transferred))];
    }
    Vec::new()
}

pub(crate) fn gateway_events(receipt: &Receipt, chain: &ChainName, tx_id: B256, gateway_address: Address) -> Vec<Event> {
    let mut events = Vec::new();
    for (i, log) in receipt.logs.iter().enumerate() {
        if log.address != gateway_address {
            continue;
        }

        match decoders::decode_gateway_event(log) {
            None => continue,
            Some(Err(e)) => {
                tracing::debug!(chain = %chain, tx_id = %tx_id, index = i, error = %e, "Skipping gateway event");
            }
            Some(Ok(kind)) => events.push(new_event(chain, tx_id, i, kind)),
        }
    }
    events
}
