//! Batched gateway transaction confirmation.
//!
//! One notification carries several polls. Receipts are fetched in a single
//! JSON-RPC batch and all votes go out in one broadcast.

use alloy::primitives::B256;

use crate::evm::manager::{gateway_events, ConfirmationError, ConfirmationManager, ConfirmationResult, ReceiptFinality};
use crate::evm::types::{ChainName, ConfirmGatewayTxsStarted, VoteEvents, VoteRequest};
use crate::observability::metrics;

impl ConfirmationManager {
    pub async fn process_gateway_txs_confirmation(&self, event: &ConfirmGatewayTxsStarted) -> ConfirmationResult<()> {
        if !self.is_participant_of(&event.participants) {
            let poll_ids: Vec<u64> = event.poll_mappings.iter().map(|m| m.poll_id.0).collect();
            tracing::debug!(?poll_ids, "Not a participant of polls, skipping");
            return Ok(());
        }

        let tx_ids: Vec<B256> = event.poll_mappings.iter().map(|m| m.tx_id).collect();
        let results = self
            .get_tx_receipts_if_finalized(&event.chain, &tx_ids, event.confirmation_height)
            .await?;

        let mut votes = Vec::with_capacity(event.poll_mappings.len());
        for (mapping, result) in event.poll_mappings.iter().zip(results) {
            let finality = match result {
                Ok(finality) => finality,
                Err(e) => {
                    tracing::info!(
                        chain = %event.chain,
                        tx_id = %mapping.tx_id,
                        poll_id = %mapping.poll_id,
                        error = %e,
                        "Voting empty"
                    );
                    votes.push(VoteRequest::new(
                        self.proxy.clone(),
                        mapping.poll_id,
                        VoteEvents::empty(event.chain.clone()),
                    ));
                    continue;
                }
            };

            let vote = match self.finalized_or_log(&event.chain, mapping.tx_id, mapping.poll_id, finality) {
                Some(receipt) => VoteEvents::new(
                    event.chain.clone(),
                    gateway_events(&receipt, &event.chain, mapping.tx_id, event.gateway_address),
                ),
                None => VoteEvents::empty(event.chain.clone()),
            };
            votes.push(VoteRequest::new(self.proxy.clone(), mapping.poll_id, vote));
        }

        let outcomes: Vec<_> = votes
            .iter()
            .map(|vote| if vote.is_empty() { "empty" } else { "events" })
            .collect();
        let handle = self.broadcaster.broadcast(votes).await?;
        for outcome in outcomes {
            metrics::record_vote("gateway_txs", event.chain.as_str(), outcome);
        }
        tracing::debug!(chain = %event.chain, handle = %handle, polls = event.poll_mappings.len(), "Votes broadcast");
        Ok(())
    }

    /// Batched receipt lookup with per-transaction finality.
    ///
    /// The outer error covers the batch request itself. Each entry carries its
    /// own outcome, in the order of `tx_ids`.
    pub async fn get_tx_receipts_if_finalized(
        &self,
        chain: &ChainName,
        tx_ids: &[B256],
        confirmations: u64,
    ) -> ConfirmationResult<Vec<ConfirmationResult<ReceiptFinality>>> {
        let client = self.client(chain)?;

        let receipts = client.transaction_receipts(tx_ids).await.map_err(|source| {
            metrics::record_rpc_error(chain.as_str());
            ConfirmationError::Receipt {
                chain: chain.to_string(),
                tx_id: tx_ids.first().copied().unwrap_or_default(),
                source,
            }
        })?;

        let mut results = Vec::with_capacity(tx_ids.len());
        for (tx_id, receipt) in tx_ids.iter().zip(receipts) {
            let result = match receipt {
                Ok(receipt) => self.check_finality(client, chain, receipt, confirmations).await,
                Err(e) if e.is_not_found() => Ok(ReceiptFinality::NotFound),
                Err(source) => Err(ConfirmationError::Receipt {
                    chain: chain.to_string(),
                    tx_id: *tx_id,
                    source,
                }),
            };
            results.push(result);
        }
        Ok(results)
    }
}
