//! # Error Types
//!
//! All error types for private transaction execution.
//!
//! "Not found" is never an error here: a payload this node cannot see is
//! `Ok(None)` at every layer.

use crate::domain::value_objects::{Address, U256};
use thiserror::Error;

// =============================================================================
// EXCHANGE ERRORS
// =============================================================================

/// Errors talking to the payload-exchange service.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Service answered with an unexpected status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },

    /// Response body was malformed.
    #[error("malformed response: {0}")]
    Decode(String),
}

// =============================================================================
// MANAGER ERRORS
// =============================================================================

/// Errors from a `PrivateTransactionManager`.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Underlying exchange failed.
    #[error("payload exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// The implementation has no such primitive.
    #[error("private transaction manager does not support {0}")]
    Unsupported(&'static str),

    /// The node runs without a payload exchange.
    #[error("private transaction manager is not in use")]
    NotInUse,
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Errors from state store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Snapshot id is unknown or already reverted past.
    #[error("invalid snapshot id: {0}")]
    InvalidSnapshot(usize),

    /// Write rejected by the store.
    #[error("write rejected for {address:?}: {reason}")]
    WriteRejected {
        /// Account being written.
        address: Address,
        /// Reason given by the store.
        reason: String,
    },

    /// Store unavailable.
    #[error("state store unavailable")]
    Unavailable,
}

// =============================================================================
// VM ERRORS
// =============================================================================

/// Fatal errors from the execution engine.
///
/// Reverts and out-of-gas are not errors; they are reported through the
/// outcome's `reverted` flag.
#[derive(Debug, Error, Clone)]
pub enum VmError {
    /// State access failed.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Contract already exists at the CREATE address.
    #[error("contract already exists at address: {0:?}")]
    ContractAlreadyExists(Address),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

// =============================================================================
// TRANSITION ERRORS
// =============================================================================

/// Errors that abort message application.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// Block gas pool exhausted.
    #[error("gas limit reached: requested {requested}, available {available}")]
    GasLimitReached {
        /// Gas requested.
        requested: u64,
        /// Gas left in the pool.
        available: u64,
    },

    /// Sender cannot pay for the gas limit.
    #[error("insufficient funds for gas: have {have}, want {want}")]
    InsufficientFunds {
        /// Sender balance.
        have: U256,
        /// Gas limit times gas price.
        want: U256,
    },

    /// Gas limit below intrinsic cost.
    #[error("intrinsic gas too low: have {have}, want {want}")]
    IntrinsicGas {
        /// Gas limit of the message.
        have: u64,
        /// Intrinsic cost.
        want: u64,
    },

    /// Sender nonce cannot be incremented.
    #[error("nonce overflow for {address}")]
    NonceOverflow {
        /// Sender.
        address: Address,
    },

        /// Payload resolution failed for a reason other than "not found".
    #[error("payload resolution failed: {0}")]
    Manager(#[from] ManagerError),

    /// Execution engine failed.
    #[error("execution failed: {0}")]
    Vm(#[from] VmError),

    /// State store failed outside execution.
    #[error("state error: {0}")]
    State(#[from] StateError),
}

// =============================================================================
// EXTENSION ERRORS
// =============================================================================

/// Reasons a state extension was not applied. Logged, never propagated past
/// the extension hook.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// Event data is not a valid StateShared log.
    #[error("invalid state shared log: {0}")]
    InvalidLog(String),

    /// Shared payload could not be decoded.
    #[error("could not decode shared accounts: {0}")]
    Decode(String),

    /// A shared account could not be written.
    #[error("could not apply shared account {account}: {reason}")]
    Merge {
        /// Address key as shipped.
        account: String,
        /// Failure reason.
        reason: String,
    },
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Invalid configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds an unusable value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment variable could not be parsed.
    #[error("invalid environment variable {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
}

// =============================================================================
// STARTUP ERRORS
// =============================================================================

/// Errors wiring the runtime together.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Exchange client could not be built.
    #[error("could not build exchange client: {0}")]
    Exchange(#[from] ExchangeError),
}

// =============================================================================
// TESTS
// =============================================================================
