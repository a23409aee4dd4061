//! EVM Bridge Relayer Library

pub mod config;
pub mod evm;
pub mod observability;
pub mod rpc;

pub use config::schema::RelayerConfig;
pub use evm::ConfirmationManager;
pub use rpc::ClientRegistry;
