//! # Privacy-Aware State Transition
//!
//! Message application for a ledger with private transactions.
//!
//! ## Flow
//!
//! ```text
//! intrinsic gas ─→ buy gas ─→ nonce + 1 ─┬─ public ──→ execute on public state
//!                                        └─ private ─→ receive(hash)
//!                                                       ├─ Err      → fatal
//!                                                       ├─ empty    → no-op
//!                                                       └─ payload  → flag checks
//!                                                                     → execute on private state
//!                                                                     → affected contract checks
//!                                                                     → revert + failed on violation
//! ─→ refund unused gas, pay coinbase
//! ```
//!
//! A privacy flag violation is not an error. Every node reaches the same
//! receipt status whether or not it can see the payload: the transaction pays
//! gas and is marked failed.

use crate::domain::entities::{
    BlockContext, ContractPrivacyMetadata, GasPool, Message, MessageOutcome,
};
use crate::domain::invariants::{
    attested_flag, check_affected_contracts, check_payload_flags, FlagViolation,
};
use crate::domain::services::intrinsic_gas;
use crate::domain::value_objects::{Bytes, U256};
use crate::errors::{StateError, TransitionError, VmError};
use crate::ports::inbound::PrivateMessageApi;
use crate::ports::outbound::{
    Call, ExecutionContext, ExecutionOutcome, MessageExecutor, PrivateTransactionManager, StateDb,
};
use async_trait::async_trait;
use crate::SUBSYSTEM;
use quantum_telemetry::{log_tx_event, metric_inc, PRIVACY_FLAG_FAILURES, PRIVATE_MESSAGES_APPLIED};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Message application aware of private payloads.
pub struct PrivateStateTransition<E> {
    manager: Arc<dyn PrivateTransactionManager>,
    executor: E,
}

impl<E: MessageExecutor> PrivateStateTransition<E> {
    /// Create a transition resolving payloads through `manager`.
    pub fn new(manager: Arc<dyn PrivateTransactionManager>, executor: E) -> Self {
        Self { manager, executor }
    }

    /// The injected manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<dyn PrivateTransactionManager> {
        &self.manager
    }

    /// The execution engine.
    #[must_use]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        public: &mut dyn StateDb,
        private: &mut dyn StateDb,
        is_private: bool,
        block: &BlockContext,
        msg: &Message,
        input: Bytes,
        gas: u64,
    ) -> Result<ExecutionOutcome, VmError> {
        let mut ctx = ExecutionContext {
            public,
            private,
            is_private,
            block,
        };
        let call = Call {
            from: msg.from,
            to: msg.to,
            nonce: msg.nonce,
            value: msg.value,
            gas,
            input,
        };
        let mut outcome = self.executor.execute(&mut ctx, &call)?;
        outcome.gas_used = outcome.gas_used.min(gas);
        Ok(outcome)
    }

    async fn apply_private(
        &self,
        public: &mut dyn StateDb,
        private: &mut dyn StateDb,
        msg: &Message,
        block: &BlockContext,
        gas: u64,
    ) -> Result<MessageOutcome, TransitionError> {
        let hash = msg.payload_hash();

        let Some(received) = self
            .manager
            .receive(&hash)
            .await?
            .filter(|r| !r.payload.is_empty())
        else {
            debug!("No private payload for this node, skipping execution");
            metric_inc!(PRIVATE_MESSAGES_APPLIED, &["not_participant"]);
            return Ok(MessageOutcome::default());
        };

        let metadata = received.metadata.as_ref();
        let effective = attested_flag(metadata);
        let mut violations: Vec<FlagViolation> =
            check_payload_flags(msg.declared_flag(), metadata).violations().to_vec();

        let snapshot = private.snapshot();
        let executed = self.execute(public, private, true, block, msg, received.payload, gas)?;

        if !executed.reverted {
            let touched: Vec<_> = executed
                .affected_contracts
                .iter()
                .filter(|address| !executed.created_contracts.contains(address))
                .map(|address| (*address, private.privacy_metadata(address)))
                .collect();
            let result = check_affected_contracts(
                touched.iter().map(|(address, meta)| (*address, meta.as_ref())),
                effective,
                metadata,
            );
            violations.extend_from_slice(result.violations());
        }

        if !violations.is_empty() {
            for violation in &violations {
                log_tx_event!(
                    warn,
                    SUBSYSTEM,
                    "Privacy flag check failed",
                    msg.hash,
                    flag = %effective,
                    %violation
                );
                metric_inc!(PRIVACY_FLAG_FAILURES, &[violation.reason()]);
            }
            private.revert_to_snapshot(snapshot)?;
            metric_inc!(PRIVATE_MESSAGES_APPLIED, &["failed"]);
            return Ok(MessageOutcome {
                gas_used: executed.gas_used,
                failed: true,
                ..MessageOutcome::default()
            });
        }

        if executed.reverted {
            metric_inc!(PRIVATE_MESSAGES_APPLIED, &["reverted"]);
            return Ok(MessageOutcome {
                gas_used: executed.gas_used,
                failed: true,
                ..MessageOutcome::default()
            });
        }

        if !effective.is_standard_private() {
            for address in &executed.created_contracts {
                private.set_privacy_metadata(
                    *address,
                    ContractPrivacyMetadata {
                        creation_tx_hash: hash,
                        privacy_flag: effective,
                    },
                )?;
            }
        }

        metric_inc!(PRIVATE_MESSAGES_APPLIED, &["success"]);
        Ok(MessageOutcome {
            return_data: executed.return_data,
            gas_used: executed.gas_used,
            failed: false,
            logs: executed.logs,
            created_contracts: executed.created_contracts,
        })
    }

    async fn transition(
        &self,
        public: &mut dyn StateDb,
        private: &mut dyn StateDb,
        msg: &Message,
        block: &BlockContext,
        intrinsic: u64,
    ) -> Result<MessageOutcome, TransitionError> {
        buy_gas(public, msg)?;
        let nonce = public.nonce(&msg.from);
        let next = nonce
            .checked_add(1)
            .ok_or(TransitionError::NonceOverflow { address: msg.from })?;
        public.set_nonce(msg.from, next)?;

        let gas = msg.gas_limit - intrinsic;
        let mut outcome = if msg.is_private {
            self.apply_private(public, private, msg, block, gas).await?
        } else {
            let executed = self.execute(public, private, false, block, msg, msg.data.clone(), gas)?;
            metric_inc!(PRIVATE_MESSAGES_APPLIED, &["public"]);
            MessageOutcome {
                failed: executed.reverted,
                return_data: executed.return_data,
                gas_used: executed.gas_used,
                logs: executed.logs,
                created_contracts: executed.created_contracts,
            }
        };

        outcome.gas_used += intrinsic;
        refund_gas(public, msg, block, outcome.gas_used)?;
        Ok(outcome)
    }
}

#[async_trait]
impl<E: MessageExecutor> PrivateMessageApi for PrivateStateTransition<E> {
    #[instrument(skip_all, fields(tx = %msg.hash, private = msg.is_private))]
    async fn apply_message(
        &self,
        public: &mut dyn StateDb,
        private: &mut dyn StateDb,
        msg: &Message,
        gas_pool: &mut GasPool,
        block: &BlockContext,
    ) -> Result<MessageOutcome, TransitionError> {
        let intrinsic = intrinsic_gas(msg.data.as_slice(), msg.is_contract_creation());
        if msg.gas_limit < intrinsic {
            return Err(TransitionError::IntrinsicGas {
                have: msg.gas_limit,
                want: intrinsic,
            });
        }
        gas_pool.sub_gas(msg.gas_limit)?;

        let public_snapshot = public.snapshot();
        let private_snapshot = private.snapshot();

        let result = self.transition(public, private, msg, block, intrinsic).await;
        match result {
            Ok(outcome) => {
                private.discard_snapshot(private_snapshot);
                public.discard_snapshot(public_snapshot);
                gas_pool.add_gas(msg.gas_limit - outcome.gas_used);
                debug!(gas_used = outcome.gas_used, failed = outcome.failed, "Message applied");
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Message application aborted");
                if let Err(revert) = public.revert_to_snapshot(public_snapshot) {
                    error!(error = %revert, "Could not roll back public state");
                }
                if let Err(revert) = private.revert_to_snapshot(private_snapshot) {
                    error!(error = %revert, "Could not roll back private state");
                }
                gas_pool.add_gas(msg.gas_limit);
                Err(e)
            }
        }
    }
}

fn gas_cost(gas: u64, price: U256) -> Option<U256> {
    price.checked_mul(U256::from(gas))
}

fn buy_gas(public: &mut dyn StateDb, msg: &Message) -> Result<(), TransitionError> {
    let have = public.balance(&msg.from);
    let want = gas_cost(msg.gas_limit, msg.gas_price).unwrap_or(U256::MAX);
    if have < want {
        return Err(TransitionError::InsufficientFunds { have, want });
    }
    public.set_balance(msg.from, have - want)?;
    Ok(())
}

fn refund_gas(
    public: &mut dyn StateDb,
    msg: &Message,
    block: &BlockContext,
    gas_used: u64,
) -> Result<(), StateError> {
    if msg.gas_price.is_zero() {
        return Ok(());
    }
    let remaining = msg.gas_limit.saturating_sub(gas_used);
    let refund = gas_cost(remaining, msg.gas_price).unwrap_or(U256::MAX);
    let fee = gas_cost(gas_used, msg.gas_price).unwrap_or(U256::MAX);

    let balance = public.balance(&msg.from);
    public.set_balance(msg.from, balance.saturating_add(refund))?;
    let coinbase = public.balance(&block.coinbase);
    public.set_balance(block.coinbase, coinbase.saturating_add(fee))
}

// =============================================================================
// TESTS
// =============================================================================
