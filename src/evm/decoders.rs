//! Strict decoders for gateway and token logs.
//!
//! # Responsibilities
//! - Check the topic count and signature before touching the data
//! - Decode through the generated ABI bindings
//! - Reject data that does not re-encode to the exact bytes on chain
//!
//! Gateway logs are looked up in a fixed table keyed by topic 0.

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::{sol_data, SolEvent, SolType};
use thiserror::Error;

use crate::evm::events::{
    EventContractCall, EventContractCallWithToken, EventKind, EventMultisigOperatorshipTransferred,
    EventTokenDeployed, EventTokenSent, EventTransfer, EventValidationError,
};
use crate::evm::types::ChainName;
use crate::rpc::Log;

pub mod abi {
    alloy::sol! {
        #[derive(Debug)]
        event Transfer(address indexed from, address indexed to, uint256 value);

        #[derive(Debug)]
        event TokenDeployed(string symbol, address tokenAddresses);

        #[derive(Debug)]
        event OperatorshipTransferred(bytes newOperatorsData);

        #[derive(Debug)]
        event ContractCall(
            address indexed sender,
            string destinationChain,
            string destinationContractAddress,
            bytes32 indexed payloadHash,
            bytes payload
        );

        #[derive(Debug)]
        event ContractCallWithToken(
            address indexed sender,
            string destinationChain,
            string destinationContractAddress,
            bytes32 indexed payloadHash,
            bytes payload,
            string symbol,
            uint256 amount
        );

        #[derive(Debug)]
        event TokenSent(
            address indexed sender,
            string destinationChain,
            string destinationAddress,
            string symbol,
            uint256 amount
        );
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected {expected} topics, got {actual}")]
    TopicCount { expected: usize, actual: usize },

    #[error("unexpected event signature {0}")]
    Signature(B256),

    #[error("abi decoding failed: {0}")]
    Abi(String),

    #[error("log data is not canonically encoded")]
    NonCanonical,

    #[error(transparent)]
    Validation(#[from] EventValidationError),
}

/// Operator set, weights and threshold packed in OperatorshipTransferred.
type OperatorsData = (
    sol_data::Array<sol_data::Address>,
    sol_data::Array<sol_data::Uint<256>>,
    sol_data::Uint<256>,
);

fn decode_strict<E: SolEvent>(log: &Log, topics: usize) -> Result<E, DecodeError> {
    if log.topics.len() != topics {
        return Err(DecodeError::TopicCount {
            expected: topics,
            actual: log.topics.len(),
        });
    }
    if log.topics[0] != E::SIGNATURE_HASH {
        return Err(DecodeError::Signature(log.topics[0]));
    }

    let event = E::decode_raw_log(log.topics.iter().copied(), &log.data)
        .map_err(|e| DecodeError::Abi(e.to_string()))?;
    if event.encode_data() != log.data.to_vec() {
        return Err(DecodeError::NonCanonical);
    }
    Ok(event)
}

/// Decode an ERC-20 Transfer, returning the sender alongside the event.
pub fn decode_erc20_transfer(log: &Log) -> Result<(Address, EventTransfer), DecodeError> {
    let event: abi::Transfer = decode_strict(log, 3)?;
    Ok((
        event.from,
        EventTransfer {
            to: event.to,
            amount: event.value,
        },
    ))
}

pub fn decode_token_deployed(log: &Log) -> Result<EventTokenDeployed, DecodeError> {
    let event: abi::TokenDeployed = decode_strict(log, 1)?;
    Ok(EventTokenDeployed {
        symbol: event.symbol,
        token_address: event.tokenAddresses,
    })
}

pub fn decode_operatorship_transferred(log: &Log) -> Result<EventMultisigOperatorshipTransferred, DecodeError> {
    let event: abi::OperatorshipTransferred = decode_strict(log, 1)?;
    let data = event.newOperatorsData;

    let (new_operators, new_weights, new_threshold): (Vec<Address>, Vec<U256>, U256) =
        <OperatorsData as SolType>::abi_decode_params(&data).map_err(|e| DecodeError::Abi(e.to_string()))?;
    let reencoded =
        <OperatorsData as SolType>::abi_encode_params(&(new_operators.clone(), new_weights.clone(), new_threshold));
    if reencoded != data.to_vec() {
        return Err(DecodeError::NonCanonical);
    }

    Ok(EventMultisigOperatorshipTransferred {
        new_operators,
        new_weights,
        new_threshold,
    })
}

pub fn decode_contract_call(log: &Log) -> Result<EventContractCall, DecodeError> {
    let event: abi::ContractCall = decode_strict(log, 3)?;
    Ok(EventContractCall {
        sender: event.sender,
        destination_chain: ChainName::new(event.destinationChain),
        contract_address: event.destinationContractAddress,
        payload_hash: event.payloadHash,
    })
}

pub fn decode_contract_call_with_token(log: &Log) -> Result<EventContractCallWithToken, DecodeError> {
    let event: abi::ContractCallWithToken = decode_strict(log, 3)?;
    Ok(EventContractCallWithToken {
        sender: event.sender,
        destination_chain: ChainName::new(event.destinationChain),
        contract_address: event.destinationContractAddress,
        payload_hash: event.payloadHash,
        symbol: event.symbol,
        amount: event.amount,
    })
}

pub fn decode_token_sent(log: &Log) -> Result<EventTokenSent, DecodeError> {
    let event: abi::TokenSent = decode_strict(log, 2)?;
    Ok(EventTokenSent {
        sender: event.sender,
        destination_chain: ChainName::new(event.destinationChain),
        destination_address: event.destinationAddress,
        symbol: event.symbol,
        amount: event.amount,
    })
}

type GatewayDecoder = fn(&Log) -> Result<EventKind, DecodeError>;

fn contract_call_kind(log: &Log) -> Result<EventKind, DecodeError> {
    decode_contract_call(log).map(EventKind::ContractCall)
}

fn contract_call_with_token_kind(log: &Log) -> Result<EventKind, DecodeError> {
    decode_contract_call_with_token(log).map(EventKind::ContractCallWithToken)
}

fn token_sent_kind(log: &Log) -> Result<EventKind, DecodeError> {
    decode_token_sent(log).map(EventKind::TokenSent)
}

static GATEWAY_DECODERS: [(B256, GatewayDecoder); 3] = [
    (abi::ContractCall::SIGNATURE_HASH, contract_call_kind),
    (abi::ContractCallWithToken::SIGNATURE_HASH, contract_call_with_token_kind),
    (abi::TokenSent::SIGNATURE_HASH, token_sent_kind),
];

/// Decode a gateway log and run basic validation on the result.
///
/// Returns `None` for logs without topics or with a signature the gateway
/// table does not know.
pub fn decode_gateway_event(log: &Log) -> Option<Result<EventKind, DecodeError>> {
    let signature = log.signature()?;
    let (_, decode) = GATEWAY_DECODERS.iter().find(|(sig, _)| sig == signature)?;

    Some(decode(log).and_then(|event| {
        event.validate_basic()?;
        Ok(event)
    }))
}

#[cfg(test)]
pub(crate) mod test_logs {
    //! Builders for well-formed logs, shared with the manager tests.

    use super::*;
    use alloy::primitives::Bytes;

    fn log(address: Address, topics: Vec<B256>, data: Vec<u8>) -> Log {
        Log {
            address,
            topics,
            data: Bytes::from(data),
            tx_hash: B256::ZERO,
            log_index: 0,
        }
    }

    pub fn transfer(token: Address, from: Address, to: Address, value: u64) -> Log {
        let event = abi::Transfer {
            from,
            to,
            value: U256::from(value),
        };
        let data = event.encode_log_data();
        log(token, data.topics().to_vec(), data.data.to_vec())
    }

    pub fn token_deployed(gateway: Address, symbol: &str, token: Address) -> Log {
        let event = abi::TokenDeployed {
            symbol: symbol.to_string(),
            tokenAddresses: token,
        };
        let data = event.encode_log_data();
        log(gateway, data.topics().to_vec(), data.data.to_vec())
    }

    pub fn operatorship_transferred(gateway: Address, operators: Vec<Address>, weights: Vec<u64>, threshold: u64) -> Log {
        let weights: Vec<U256> = weights.into_iter().map(U256::from).collect();
        let inner = <OperatorsData as SolType>::abi_encode_params(&(operators, weights, U256::from(threshold)));
        let event = abi::OperatorshipTransferred {
            newOperatorsData: Bytes::from(inner),
        };
        let data = event.encode_log_data();
        log(gateway, data.topics().to_vec(), data.data.to_vec())
    }

    pub fn contract_call(gateway: Address, sender: Address, chain: &str, contract: &str) -> Log {
        let event = abi::ContractCall {
            sender,
            destinationChain: chain.to_string(),
            destinationContractAddress: contract.to_string(),
            payloadHash: B256::repeat_byte(0x42),
            payload: Bytes::from(vec![1, 2, 3]),
        };
        let data = event.encode_log_data();
        log(gateway, data.topics().to_vec(), data.data.to_vec())
    }

    pub fn token_sent(gateway: Address, sender: Address, chain: &str, destination: &str, amount: u64) -> Log {
        let event = abi::TokenSent {
            sender,
            destinationChain: chain.to_string(),
            destinationAddress: destination.to_string(),
            symbol: "USDC".to_string(),
            amount: U256::from(amount),
        };
        let data = event.encode_log_data();
        log(gateway, data.topics().to_vec(), data.data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Bytes};

    const TOKEN: Address = address!("00000000000000000000000000000000000000a1");
    const GATEWAY: Address = address!("00000000000000000000000000000000000000b2");
    const SENDER: Address = address!("00000000000000000000000000000000000000c3");
    const DEPOSIT: Address = address!("00000000000000000000000000000000000000d4");

    #[test]
    fn test_decode_transfer() {
        let log = test_logs::transfer(TOKEN, SENDER, DEPOSIT, 500);
        let (from, transfer) = decode_erc20_transfer(&log).unwrap();
        assert_eq!(from, SENDER);
        assert_eq!(transfer.to, DEPOSIT);
        assert_eq!(transfer.amount, U256::from(500));
    }

    #[test]
    fn test_transfer_wrong_topic_count() {
        let mut log = test_logs::transfer(TOKEN, SENDER, DEPOSIT, 500);
        log.topics.pop();
        assert_eq!(
            decode_erc20_transfer(&log).unwrap_err(),
            DecodeError::TopicCount { expected: 3, actual: 2 }
        );
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut log = test_logs::token_deployed(GATEWAY, "USDC", TOKEN);
        let mut data = log.data.to_vec();
        data.extend_from_slice(&[0u8; 32]);
        log.data = Bytes::from(data);
        assert_eq!(decode_token_deployed(&log).unwrap_err(), DecodeError::NonCanonical);
    }

    #[test]
    fn test_decode_operatorship() {
        let log = test_logs::operatorship_transferred(GATEWAY, vec![SENDER, DEPOSIT], vec![1, 1], 2);
        let event = decode_operatorship_transferred(&log).unwrap();
        assert_eq!(event.new_operators, vec![SENDER, DEPOSIT]);
        assert_eq!(event.new_threshold, U256::from(2));
        assert!(event.validate_basic().is_ok());
    }

    #[test]
    fn test_signature_mismatch() {
        let log = test_logs::token_deployed(GATEWAY, "USDC", TOKEN);
        assert!(matches!(
            decode_operatorship_transferred(&log).unwrap_err(),
            DecodeError::Signature(_)
        ));
    }

    #[test]
    fn test_gateway_table_dispatch() {
        let call = test_logs::contract_call(GATEWAY, SENDER, "Osmosis", "osmo1contract");
        let event = decode_gateway_event(&call).unwrap().unwrap();
        assert_eq!(event.name(), "contract_call");

        let sent = test_logs::token_sent(GATEWAY, SENDER, "Osmosis", "osmo1dest", 10);
        assert_eq!(decode_gateway_event(&sent).unwrap().unwrap().name(), "token_sent");

        let transfer = test_logs::transfer(TOKEN, SENDER, DEPOSIT, 1);
        assert!(decode_gateway_event(&transfer).is_none());
    }

    #[test]
    fn test_gateway_event_fails_validation() {
        let call = test_logs::contract_call(GATEWAY, SENDER, "Osmosis", " ");
        assert!(matches!(
            decode_gateway_event(&call).unwrap().unwrap_err(),
            DecodeError::Validation(_)
        ));

        let sent = test_logs::token_sent(GATEWAY, SENDER, "Osmosis", "osmo1dest", 0);
        assert!(matches!(
            decode_gateway_event(&sent).unwrap().unwrap_err(),
            DecodeError::Validation(_)
        ));
    }

    #[test]
    fn test_gateway_events_to_evm_destinations() {
        let evm = "0xB5FB4BE02232B1bBA4dC8f81dc24C26980dE9e3C";
        let call = test_logs::contract_call(GATEWAY, SENDER, "Avalanche", evm);
        match decode_gateway_event(&call).unwrap().unwrap() {
            EventKind::ContractCall(event) => assert_eq!(event.contract_address, evm),
            other => panic!("unexpected event {:?}", other),
        }

        let sent = test_logs::token_sent(GATEWAY, SENDER, "Avalanche", evm, 10);
        assert_eq!(decode_gateway_event(&sent).unwrap().unwrap().name(), "token_sent");
    }

    #[test]
    fn test_log_without_topics_is_skipped() {
        let mut log = test_logs::contract_call(GATEWAY, SENDER, "Osmosis", "osmo1contract");
        log.topics.clear();
        assert!(decode_gateway_event(&log).is_none());
    }
}
