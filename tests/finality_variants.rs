//! Finality variants selected through the registry, driven through the manager.

mod common;

use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use serde_json::json;

use common::*;
use evm_relayer::evm::{ChainName, ReceiptFinality};
use evm_relayer::rpc::arbitrum::{getL1ConfirmationsCall, NODE_INTERFACE_ADDRESS};
use evm_relayer::rpc::mock::MockRpc;
use evm_relayer::rpc::{BlockTag, FinalityKind, Header};

const TOKEN: Address = address!("00000000000000000000000000000000000000a1");
const DEPOSIT: Address = address!("00000000000000000000000000000000000000d0");
const SENDER: Address = address!("00000000000000000000000000000000000000c0");
const TX: B256 = B256::repeat_byte(0x55);

fn explicit_finality_l1(head: u64, finalized: u64) -> MockRpc {
    let rpc = MockRpc::new();
    rpc.set_block_number(head);
    rpc.add_header(
        BlockTag::Finalized,
        Header {
            number: finalized,
            hash: B256::repeat_byte(0xf0),
        },
    );
    rpc
}

fn confirmations_word(value: u64) -> Bytes {
    Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec())
}

fn confirmations_call(block_hash: B256) -> Bytes {
    Bytes::from(getL1ConfirmationsCall { blockHash: block_hash }.abi_encode())
}

#[tokio::test]
async fn test_confirmation_count_is_monotonic() {
    let chain = ChainName::new("Ethereum");
    let mut previous = true;

    for confirmations in 1..=10u64 {
        let rpc = MockRpc::new();
        rpc.set_block_number(105);
        rpc.add_receipt(receipt(TX, 100, vec![]));
        let (mgr, _) = manager_for("ethereum", rpc).await;

        let finalized = matches!(
            mgr.get_tx_receipt_if_finalized(&chain, TX, confirmations).await.unwrap(),
            ReceiptFinality::Finalized(_)
        );
        assert_eq!(finalized, confirmations <= 6, "confirmations = {}", confirmations);
        assert!(previous || !finalized, "finality regained at {} confirmations", confirmations);
        previous = finalized;
    }
}

#[tokio::test]
async fn test_parachain_finality() {
    let rpc = MockRpc::new();
    rpc.set_block_number(200);
    let finalized_head = B256::repeat_byte(0xab);
    rpc.add_method("chain_getFinalizedHead", json!(finalized_head));
    rpc.add_method("chain_getHeader", json!({ "number": "0x64" }));
    rpc.add_receipt(receipt(TX, 100, vec![transfer_log(TOKEN, SENDER, DEPOSIT, 10)]));
    let later = B256::repeat_byte(0x56);
    rpc.add_receipt(receipt(later, 101, vec![]));

    let registry = registry_from(&[chain_config("Moonbeam", "moonbeam", None)], vec![("moonbeam", rpc)])
        .await
        .unwrap();
    assert_eq!(registry.get("moonbeam").unwrap().kind(), FinalityKind::Parachain);
    let (mgr, _) = manager_with(registry);
    let chain = ChainName::new("Moonbeam");

    let finality = mgr.get_tx_receipt_if_finalized(&chain, TX, 0).await.unwrap();
    assert!(matches!(finality, ReceiptFinality::Finalized(_)));
    assert_eq!(mgr.cache().get(&chain), 100);

    let finality = mgr.get_tx_receipt_if_finalized(&chain, later, 0).await.unwrap();
    assert_eq!(finality, ReceiptFinality::NotFinalized);
}

#[tokio::test]
async fn test_arbitrum_over_explicit_finality_l1() {
    // L1 head 1000, finalized 936: an L2 block needs 65 L1 confirmations.
    let l1 = explicit_finality_l1(1_000, 936);

    let l2 = MockRpc::new();
    l2.set_block_number(5_000);
    let head_hash = B256::left_padding_from(&5_000u64.to_be_bytes());
    l2.add_contract_call(NODE_INTERFACE_ADDRESS, confirmations_call(head_hash), confirmations_word(1));

    let deep = receipt(TX, 4_000, vec![]);
    let shallow_tx = B256::repeat_byte(0x57);
    let shallow = receipt(shallow_tx, 4_999, vec![]);
    l2.add_contract_call(
        NODE_INTERFACE_ADDRESS,
        confirmations_call(deep.block_hash.unwrap()),
        confirmations_word(70),
    );
    l2.add_contract_call(
        NODE_INTERFACE_ADDRESS,
        confirmations_call(shallow.block_hash.unwrap()),
        confirmations_word(3),
    );
    l2.add_receipt(deep);
    l2.add_receipt(shallow);

    let chains = [
        chain_config("Arbitrum", "arb", Some("Ethereum")),
        chain_config("Ethereum", "eth", None),
    ];
    let registry = registry_from(&chains, vec![("eth", l1), ("arb", l2)]).await.unwrap();
    assert_eq!(registry.get("arbitrum").unwrap().kind(), FinalityKind::ArbitrumL1Confirmations);
    let (mgr, _) = manager_with(registry);
    let chain = ChainName::new("Arbitrum");

    let finality = mgr.get_tx_receipt_if_finalized(&chain, TX, 1).await.unwrap();
    assert!(matches!(finality, ReceiptFinality::Finalized(_)));

    let finality = mgr.get_tx_receipt_if_finalized(&chain, shallow_tx, 1).await.unwrap();
    assert_eq!(finality, ReceiptFinality::NotFinalized);
}

#[tokio::test]
async fn test_l2_requires_explicit_finality_l1() {
    // No finalized tag: the L1 classifies as confirmation-count.
    let l1 = MockRpc::new();
    l1.set_block_number(1_000);
    let l2 = MockRpc::new();
    l2.set_block_number(10);

    let chains = [
        chain_config("Ethereum", "eth", None),
        chain_config("Arbitrum", "arb", Some("Ethereum")),
    ];
    let err = registry_from(&chains, vec![("eth", l1), ("arb", l2)]).await.unwrap_err();
    assert!(err.to_string().contains("ethereum 2.0"));
}
