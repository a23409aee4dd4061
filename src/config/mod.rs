//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayerConfig (validated, immutable)
//!     → chain registry dials every configured endpoint
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; new chains require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::EvmChainConfig;
pub use schema::ObservabilityConfig;
pub use schema::RelayerConfig;
pub use schema::ValidatorConfig;
