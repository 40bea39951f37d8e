//! # QC-18 Private Transactions - Off-Chain Payload Execution Subsystem
//!
//! **Subsystem ID:** 18
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Executes transactions whose payload lives off-chain in a payload-exchange
//! service. Only a 64-byte content hash goes on-chain; participants resolve
//! it to the real payload and execute it against their private state.
//! Non-participants see nothing and skip execution.
//!
//! A privacy flag declared on each transaction sets the verification
//! contract its effects must satisfy. A violation never aborts the block:
//! the transaction pays gas and its receipt is marked failed on every node.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Attested flag at least the declared flag | `domain/invariants.rs` - `check_attestation()` |
//! | State validation carries a merkle root | `domain/invariants.rs` - `check_merkle_root()` |
//! | Touched contracts share the flag and consortium | `domain/invariants.rs` - `check_affected_contract()` |
//! | Zero hash resolves to an empty payload | every `PrivateTransactionManager` adapter |
//! | Extension merge is all-or-nothing | `extension.rs` - snapshot / revert |
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | State transition | `transition.rs` | Privacy-aware message application |
//! | Extension handler | `extension.rs` | Merges shared private state |
//! | Caching manager | `adapters/caching_manager.rs` | TTL cache over the exchange |
//! | HTTP client | `adapters/http_client.rs` | Payload-exchange wire client |
//! | Runtime | `runtime.rs` | Builds and injects one manager |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_18_private_transactions::prelude::*;
//!
//! let config = PrivateTxConfig::from_env()?;
//! let runtime = PrivateTxRuntime::from_config(&config, executor)?;
//!
//! let outcome = runtime
//!     .transition()
//!     .apply_message(&mut public, &mut private, &msg, &mut gas_pool, &block)
//!     .await?;
//! runtime
//!     .extension()
//!     .check_extension_and_set_private_state(&outcome.logs, &mut private)
//!     .await;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extension;
pub mod ports;
pub mod runtime;
pub mod transition;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        AccountState, BlockContext, ContractPrivacyMetadata, ExtraMetadata, GasPool, Log, Message,
        MessageOutcome, PrivacyFlag, ReceivedPayload, SharedAccount, SharedAccountState,
        SnapshotId, TxPrivacyMetadata,
    };

    // Value objects
    pub use crate::domain::value_objects::{Address, Bytes, EncryptedPayloadHash, Hash, U256};

    // Domain services
    pub use crate::domain::services::{compute_contract_address, intrinsic_gas, keccak256};
    pub use crate::domain::state_shared::{state_shared_topic, StateSharedEvent};

    // Invariants
    pub use crate::domain::invariants::{FlagCheckResult, FlagViolation};

    // Ports
    pub use crate::ports::inbound::{PrivateMessageApi, StateExtensionHook};
    pub use crate::ports::outbound::{
        Call, ExecutionContext, ExecutionOutcome, MessageExecutor, PayloadExchangeClient,
        PrivateTransactionManager, StateDb,
    };

    // Errors
    pub use crate::errors::{
        ConfigError, ExchangeError, ExtensionError, ManagerError, StartupError, StateError,
        TransitionError, VmError,
    };

    // Adapters
    pub use crate::adapters::{
        CachingExchangeManager, HttpExchangeClient, InMemoryExchange, InMemoryStateDb,
        MockPrivateTransactionManager, NotInUseManager, ScriptedVm,
    };

    // Services
    pub use crate::config::{CacheConfig, ExchangeConfig, PrivateTxConfig};
    pub use crate::extension::StateExtensionHandler;
    pub use crate::runtime::PrivateTxRuntime;
    pub use crate::transition::PrivateStateTransition;
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID.
pub const SUBSYSTEM_ID: u8 = 18;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "Private Transactions";

/// Value of the `subsystem` field on structured log lines.
pub(crate) const SUBSYSTEM: &str = "private-tx";

// =============================================================================
// TESTS
// =============================================================================
