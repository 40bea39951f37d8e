//! # Driving Ports (API - Inbound)
//!
//! Hooks the ledger runtime calls while processing a block.
//!
//! - `PrivateMessageApi` replaces standard message application for every
//!   transaction (public messages pass straight through).
//! - `StateExtensionHook` runs unconditionally after every transaction and
//!   is a no-op unless the logs carry a state extension.

use crate::domain::entities::{BlockContext, GasPool, Log, Message, MessageOutcome};
use crate::errors::TransitionError;
use crate::ports::outbound::StateDb;
use async_trait::async_trait;

/// Message application aware of private payloads and privacy flags.
#[async_trait]
pub trait PrivateMessageApi: Send + Sync {
    /// Applies one message.
    ///
    /// # Returns
    ///
    /// * `Ok(outcome)` - Applied; `outcome.failed` may be true after a
    ///   privacy flag violation or a revert
    /// * `Err(_)` - Fatal; the block cannot include this transaction
    async fn apply_message(
        &self,
        public: &mut dyn StateDb,
        private: &mut dyn StateDb,
        msg: &Message,
        gas_pool: &mut GasPool,
        block: &BlockContext,
    ) -> Result<MessageOutcome, TransitionError>;
}

/// Post-execution hook merging shared private state.
#[async_trait]
pub trait StateExtensionHook: Send + Sync {
    /// Inspects `logs` and, if they complete an extension this node asked
    /// for, merges the shared accounts into `private_state`.
    ///
    /// Never fails: private state is either unchanged or atomically updated.
    async fn check_extension_and_set_private_state(
        &self,
        logs: &[Log],
        private_state: &mut dyn StateDb,
    );
}
