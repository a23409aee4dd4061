//! In-memory `EthereumRpc` backend.
//!
//! Used by unit and integration tests to script chain responses; outside this
//! crate's own unit tests it needs the `test-utils` feature. Unscripted
//! calls fail with a transport error naming the method, so a test notices any
//! RPC traffic it did not expect.

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::rpc::transport::EthereumRpc;
use crate::rpc::types::{BlockTag, Header, Log, LogQuery, Receipt, RpcError, RpcResult};

#[derive(Default)]
struct MockState {
    block_number: Option<u64>,
    chain_id: Option<u64>,
    headers: HashMap<BlockTag, Header>,
    receipts: HashMap<B256, Receipt>,
    receipt_errors: HashMap<B256, String>,
    contract_calls: HashMap<(Address, Bytes), Bytes>,
    logs: Vec<Log>,
    // method -> [(exact params or wildcard, response)]
    methods: HashMap<String, Vec<(Option<Value>, Value)>>,
    unavailable: bool,
    calls: Vec<String>,
}

/// Scriptable mock chain. Clones share state.
#[derive(Clone, Default)]
pub struct MockRpc {
    state: Arc<Mutex<MockState>>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only happens after a test already panicked.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_block_number(&self, number: u64) {
        self.state().block_number = Some(number);
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.state().chain_id = Some(chain_id);
    }

    pub fn add_header(&self, tag: BlockTag, header: Header) {
        self.state().headers.insert(tag, header);
    }

    pub fn add_receipt(&self, receipt: Receipt) {
        self.state().receipts.insert(receipt.tx_hash, receipt);
    }

    /// Make receipt lookups for `tx_hash` fail with a transport error.
    pub fn fail_receipt(&self, tx_hash: B256, reason: &str) {
        self.state().receipt_errors.insert(tx_hash, reason.to_string());
    }

    pub fn add_contract_call(&self, to: Address, data: Bytes, response: Bytes) {
        self.state().contract_calls.insert((to, data), response);
    }

    pub fn add_log(&self, log: Log) {
        self.state().logs.push(log);
    }

    /// Respond to `method` with `response` whatever the params.
    pub fn add_method(&self, method: &str, response: Value) {
        self.state()
            .methods
            .entry(method.to_string())
            .or_default()
            .push((None, response));
    }

    /// Respond to `method` with `response` only for exactly `params`.
    pub fn add_method_with_params(&self, method: &str, params: Value, response: Value) {
        self.state()
            .methods
            .entry(method.to_string())
            .or_default()
            .push((Some(params), response));
    }

    /// Fail every call as if the endpoint were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Method names received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|c| c.as_str() == method).count()
    }

    fn record(&self, method: &str) -> RpcResult<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        state.calls.push(method.to_string());
        if state.unavailable {
            return Err(RpcError::Transport(format!("{}: connection refused", method)));
        }
        Ok(state)
    }

    fn lookup_receipt(state: &MockState, tx_hash: B256) -> RpcResult<Receipt> {
        if let Some(reason) = state.receipt_errors.get(&tx_hash) {
            return Err(RpcError::Transport(reason.clone()));
        }
        state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| RpcError::NotFound(format!("transaction receipt {}", tx_hash)))
    }
}

fn unscripted(method: &str) -> RpcError {
    RpcError::Transport(format!("{}: method not available", method))
}

#[async_trait]
impl EthereumRpc for MockRpc {
    async fn block_number(&self) -> RpcResult<u64> {
        let state = self.record("eth_blockNumber")?;
        state.block_number.ok_or_else(|| unscripted("eth_blockNumber"))
    }

    async fn chain_id(&self) -> RpcResult<u64> {
        let state = self.record("eth_chainId")?;
        state.chain_id.ok_or_else(|| unscripted("eth_chainId"))
    }

    async fn header_by_number(&self, tag: BlockTag) -> RpcResult<Header> {
        let state = self.record("eth_getBlockByNumber")?;
        if let Some(header) = state.headers.get(&tag) {
            return Ok(*header);
        }
        match (tag, state.block_number) {
            (BlockTag::Latest, Some(number)) => Ok(Header {
                number,
                hash: B256::left_padding_from(&number.to_be_bytes()),
            }),
            (BlockTag::Finalized, _) => Err(unscripted("eth_getBlockByNumber(finalized)")),
            _ => Err(RpcError::NotFound(format!("block {}", tag))),
        }
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> RpcResult<Receipt> {
        let state = self.record("eth_getTransactionReceipt")?;
        Self::lookup_receipt(&state, tx_hash)
    }

    async fn transaction_receipts(&self, tx_hashes: &[B256]) -> RpcResult<Vec<RpcResult<Receipt>>> {
        let state = self.record("batch:eth_getTransactionReceipt")?;
        Ok(tx_hashes
            .iter()
            .map(|tx_hash| Self::lookup_receipt(&state, *tx_hash))
            .collect())
    }

    async fn call_contract(&self, to: Address, data: Bytes) -> RpcResult<Bytes> {
        let state = self.record("eth_call")?;
        state
            .contract_calls
            .get(&(to, data))
            .cloned()
            .ok_or_else(|| unscripted("eth_call"))
    }

    async fn filter_logs(&self, query: &LogQuery) -> RpcResult<Vec<Log>> {
        let state = self.record("eth_getLogs")?;
        Ok(state.logs.iter().filter(|log| query.matches(log)).cloned().collect())
    }

    async fn request(&self, method: &str, params: Value) -> RpcResult<Value> {
        let state = self.record(method)?;
        let responses = state.methods.get(method).ok_or_else(|| unscripted(method))?;

        responses
            .iter()
            .find(|(expected, _)| expected.as_ref() == Some(&params))
            .or_else(|| responses.iter().find(|(expected, _)| expected.is_none()))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| unscripted(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unscripted_calls_fail() {
        let rpc = MockRpc::new();
        assert!(rpc.block_number().await.is_err());
        assert!(rpc.request("chain_getFinalizedHead", json!([])).await.is_err());
        assert_eq!(rpc.calls(), vec!["eth_blockNumber", "chain_getFinalizedHead"]);
    }

    #[tokio::test]
    async fn test_exact_params_take_precedence() {
        let rpc = MockRpc::new();
        rpc.add_method("zkevm_getBatchByNumber", json!("any"));
        rpc.add_method_with_params("zkevm_getBatchByNumber", json!(["0x2", false]), json!("two"));

        let two = rpc.request("zkevm_getBatchByNumber", json!(["0x2", false])).await.unwrap();
        let other = rpc.request("zkevm_getBatchByNumber", json!(["0x3", false])).await.unwrap();
        assert_eq!(two, json!("two"));
        assert_eq!(other, json!("any"));
    }

    #[tokio::test]
    async fn test_receipt_batch_reports_per_item() {
        let rpc = MockRpc::new();
        let found = B256::repeat_byte(1);
        let failing = B256::repeat_byte(2);
        rpc.add_receipt(Receipt {
            tx_hash: found,
            block_number: Some(5),
            block_hash: None,
            status: true,
            logs: vec![],
        });
        rpc.fail_receipt(failing, "boom");

        let results = rpc
            .transaction_receipts(&[found, B256::repeat_byte(3), failing])
            .await
            .unwrap();
        assert!(results[0].is_ok());
        assert!(results[1].as_ref().unwrap_err().is_not_found());
        assert!(matches!(results[2], Err(RpcError::Transport(_))));
    }

    #[tokio::test]
    async fn test_unavailable_endpoint() {
        let rpc = MockRpc::new();
        rpc.set_block_number(10);
        rpc.set_unavailable(true);
        assert!(rpc.block_number().await.is_err());
    }
}
