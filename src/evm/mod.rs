//! Bridge event confirmation for EVM chains.
//!
//! # Data Flow
//! ```text
//! Notification (types.rs)
//!     → manager.rs / gateway_txs.rs (participation, receipts, finality)
//!         ↔ cache.rs (per-chain finalized height)
//!     → decoders.rs (strict ABI decode) → events.rs (basic validation)
//!     → VoteRequest → broadcast.rs
//! ```

pub mod broadcast;
pub mod cache;
pub mod decoders;
pub mod events;
pub mod gateway_txs;
pub mod manager;
pub mod types;

pub use broadcast::{BroadcastError, Broadcaster, JsonLineBroadcaster, RecordingBroadcaster};
pub use cache::FinalizedBlockCache;
pub use decoders::DecodeError;
pub use events::EventKind;
pub use manager::{ConfirmationError, ConfirmationManager, ConfirmationResult, ReceiptFinality};
pub use types::{ChainName, Notification, PollId, ValidatorAddress, VoteEvents, VoteRequest};
