//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolEvent;

use evm_relayer::config::EvmChainConfig;
use evm_relayer::evm::decoders::abi;
use evm_relayer::evm::{ConfirmationManager, RecordingBroadcaster, ValidatorAddress};
use evm_relayer::rpc::mock::MockRpc;
use evm_relayer::rpc::{ChainClient, ClientRegistry, EthereumRpc, Log, Receipt, RpcError, RpcResult};

pub const VALIDATOR: &str = "axelarvaloper1validator";
pub const PROXY: &str = "axelar1proxy";

/// A manager over one mocked chain, registered under `chain`.
pub async fn manager_for(chain: &str, rpc: MockRpc) -> (ConfirmationManager, RecordingBroadcaster) {
    let mut registry = ClientRegistry::new();
    registry.insert(chain, ChainClient::probe(Arc::new(rpc)).await.unwrap());
    manager_with(registry)
}

pub fn manager_with(registry: ClientRegistry) -> (ConfirmationManager, RecordingBroadcaster) {
    let broadcaster = RecordingBroadcaster::new();
    let mgr = ConfirmationManager::new(
        registry,
        Arc::new(broadcaster.clone()),
        ValidatorAddress::from(VALIDATOR),
        PROXY,
    );
    (mgr, broadcaster)
}

/// Registry built through `connect_with`, dialing mocks by `rpc_addr`.
pub async fn registry_from(chains: &[EvmChainConfig], mocks: Vec<(&str, MockRpc)>) -> RpcResult<ClientRegistry> {
    ClientRegistry::connect_with(chains, |chain| {
        mocks
            .iter()
            .find(|(addr, _)| *addr == chain.rpc_addr)
            .map(|(_, rpc)| Arc::new(rpc.clone()) as Arc<dyn EthereumRpc>)
            .ok_or_else(|| RpcError::Transport(format!("no mock for {}", chain.rpc_addr)))
    })
    .await
}

pub fn chain_config(name: &str, rpc_addr: &str, l1: Option<&str>) -> EvmChainConfig {
    EvmChainConfig {
        name: name.to_string(),
        rpc_addr: rpc_addr.to_string(),
        with_bridge: true,
        l1_chain_name: l1.map(str::to_string),
        state_commitment_chain: None,
    }
}

pub fn receipt(tx_hash: B256, block_number: u64, logs: Vec<Log>) -> Receipt {
    Receipt {
        tx_hash,
        block_number: Some(block_number),
        block_hash: Some(B256::left_padding_from(&block_number.to_be_bytes())),
        status: true,
        logs,
    }
}

fn to_log<E: SolEvent>(address: Address, event: &E) -> Log {
    let data = event.encode_log_data();
    Log {
        address,
        topics: data.topics().to_vec(),
        data: data.data,
        tx_hash: B256::ZERO,
        log_index: 0,
    }
}

pub fn transfer_log(token: Address, from: Address, to: Address, value: u64) -> Log {
    to_log(
        token,
        &abi::Transfer {
            from,
            to,
            value: U256::from(value),
        },
    )
}

pub fn contract_call_log(gateway: Address, sender: Address, destination_chain: &str, contract: &str) -> Log {
    to_log(
        gateway,
        &abi::ContractCall {
            sender,
            destinationChain: destination_chain.to_string(),
            destinationContractAddress: contract.to_string(),
            payloadHash: B256::repeat_byte(0x42),
            payload: Bytes::from_static(b"payload"),
        },
    )
}

pub fn contract_call_with_token_log(gateway: Address, sender: Address, symbol: &str, amount: u64) -> Log {
    to_log(
        gateway,
        &abi::ContractCallWithToken {
            sender,
            destinationChain: "Osmosis".to_string(),
            destinationContractAddress: "osmo1contract".to_string(),
            payloadHash: B256::repeat_byte(0x43),
            payload: Bytes::from_static(b"payload"),
            symbol: symbol.to_string(),
            amount: U256::from(amount),
        },
    )
}
