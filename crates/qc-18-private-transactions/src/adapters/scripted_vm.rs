//! # Scripted Execution Engine
//!
//! Deterministic `MessageExecutor` for tests and local development. It does
//! not interpret bytecode; instead it understands two tiny contract kinds,
//! enough to exercise the public/private split and privacy flag checks.
//!
//! | Kind | Init code | Storage |
//! |------|-----------|---------|
//! | Counter | `0x01 ‖ value?` | slot 0 = value |
//! | Forwarder | `0x02 ‖ target address` | slot 0 = target |
//!
//! Both accept the Solidity selectors `set(uint256)` and `get()`. A
//! forwarder relays the call to its target, which then counts as an
//! affected contract.

use crate::domain::services::compute_contract_address;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::VmError;
use crate::ports::outbound::{Call, ExecutionContext, ExecutionOutcome, MessageExecutor, StateDb};

/// `set(uint256)` selector.
pub const SET_SELECTOR: [u8; 4] = [0x60, 0xfe, 0x47, 0xb1];

/// `get()` selector.
pub const GET_SELECTOR: [u8; 4] = [0x6d, 0x4c, 0xe6, 0x3c];

const KIND_COUNTER: u8 = 0x01;
const KIND_FORWARDER: u8 = 0x02;

const GAS_CREATE: u64 = 32_000;
const GAS_CALL: u64 = 700;
const GAS_SSTORE: u64 = 5_000;
const GAS_SLOAD: u64 = 800;
const MAX_FORWARD_DEPTH: usize = 8;

/// Init code of a counter holding `initial`.
#[must_use]
pub fn counter_init_code(initial: U256) -> Bytes {
    let mut code = vec![KIND_COUNTER];
    code.extend_from_slice(Hash::from_u256(initial).as_bytes());
    Bytes(code)
}

/// Init code of a forwarder to `target`.
#[must_use]
pub fn forwarder_init_code(target: Address) -> Bytes {
    let mut code = vec![KIND_FORWARDER];
    code.extend_from_slice(target.as_bytes());
    Bytes(code)
}

/// Calldata of `set(value)`.
#[must_use]
pub fn encode_set(value: U256) -> Bytes {
    let mut data = SET_SELECTOR.to_vec();
    data.extend_from_slice(Hash::from_u256(value).as_bytes());
    Bytes(data)
}

/// Calldata of `get()`.
#[must_use]
pub fn encode_get() -> Bytes {
    Bytes(GET_SELECTOR.to_vec())
}

/// Why a scripted call reverted.
#[derive(Debug)]
enum Revert {
    OutOfGas,
    BadInput,
    InsufficientBalance,
}

struct Frame<'a> {
    gas_left: u64,
    affected: &'a mut Vec<Address>,
}

impl Frame<'_> {
    fn charge(&mut self, amount: u64) -> Result<(), Revert> {
        self.gas_left = self.gas_left.checked_sub(amount).ok_or(Revert::OutOfGas)?;
        Ok(())
    }
}

/// Scripted engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptedVm;

impl ScriptedVm {
    /// Create an engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn create(
        state: &mut dyn StateDb,
        call: &Call,
        frame: &mut Frame<'_>,
    ) -> Result<Result<(Address, Bytes), Revert>, VmError> {
        let address = compute_contract_address(call.from, call.nonce);
        if !state.code(&address).is_empty() {
            return Err(VmError::ContractAlreadyExists(address));
        }
        if let Err(revert) = frame.charge(GAS_CREATE) {
            return Ok(Err(revert));
        }

        let input = call.input.as_slice();
        let (kind, arg) = match input.split_first() {
            Some((&KIND_COUNTER, rest)) if rest.is_empty() || rest.len() == 32 => {
                (KIND_COUNTER, Hash::from_slice(rest).unwrap_or_default())
            }
            Some((&KIND_FORWARDER, rest)) if rest.len() == 20 => {
                let mut word = [0u8; 32];
                word[12..].copy_from_slice(rest);
                (KIND_FORWARDER, Hash::new(word))
            }
            _ => return Ok(Err(Revert::BadInput)),
        };

        if !arg.is_zero() {
            if let Err(revert) = frame.charge(GAS_SSTORE) {
                return Ok(Err(revert));
            }
            state.set_storage(address, Hash::ZERO, arg)?;
        }
        state.set_code(address, Bytes(vec![kind]))?;
        state.set_nonce(address, 1)?;
        Ok(Ok((address, Bytes::new())))
    }

    fn call_contract(
        state: &mut dyn StateDb,
        to: Address,
        input: &[u8],
        frame: &mut Frame<'_>,
        depth: usize,
    ) -> Result<Result<Bytes, Revert>, VmError> {
        if depth > MAX_FORWARD_DEPTH {
            return Ok(Err(Revert::BadInput));
        }
        let code = state.code(&to);
        let Some(&kind) = code.as_slice().first() else {
            // No code: nothing to run.
            return Ok(Ok(Bytes::new()));
        };
        if let Err(revert) = frame.charge(GAS_CALL) {
            return Ok(Err(revert));
        }
        if !frame.affected.contains(&to) {
            frame.affected.push(to);
        }

        if kind == KIND_FORWARDER {
            if let Err(revert) = frame.charge(GAS_SLOAD) {
                return Ok(Err(revert));
            }
            let slot = state.storage(&to, &Hash::ZERO);
            let mut target = [0u8; 20];
            target.copy_from_slice(&slot.as_bytes()[12..]);
            return Self::call_contract(state, Address::new(target), input, frame, depth + 1);
        }

        match input.get(..4) {
            Some(selector) if selector == SET_SELECTOR && input.len() == 36 => {
                if let Err(revert) = frame.charge(GAS_SSTORE) {
                    return Ok(Err(revert));
                }
                let value = Hash::from_slice(&input[4..]).unwrap_or_default();
                state.set_storage(to, Hash::ZERO, value)?;
                Ok(Ok(Bytes::new()))
            }
            Some(selector) if selector == GET_SELECTOR => {
                if let Err(revert) = frame.charge(GAS_SLOAD) {
                    return Ok(Err(revert));
                }
                Ok(Ok(Bytes::from_slice(state.storage(&to, &Hash::ZERO).as_bytes())))
            }
            _ => Ok(Err(Revert::BadInput)),
        }
    }

    fn transfer(
        state: &mut dyn StateDb,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<Result<(), Revert>, VmError> {
        if value.is_zero() {
            return Ok(Ok(()));
        }
        let from_balance = state.balance(&from);
        if from_balance < value {
            return Ok(Err(Revert::InsufficientBalance));
        }
        state.set_balance(from, from_balance - value)?;
        let to_balance = state.balance(&to);
        state.set_balance(to, to_balance.saturating_add(value))?;
        Ok(Ok(()))
    }
}

impl MessageExecutor for ScriptedVm {
    fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        call: &Call,
    ) -> Result<ExecutionOutcome, VmError> {
        let mut affected = Vec::new();
        let mut frame = Frame {
            gas_left: call.gas,
            affected: &mut affected,
        };
        let mut created = Vec::new();

        // Value only moves on public state.
        let public_snapshot = ctx.public.snapshot();
        let snapshot = ctx.state().snapshot();

        let result = match call.to {
            None => Self::create(ctx.state(), call, &mut frame)?.map(|(address, data)| {
                created.push(address);
                data
            }),
            Some(to) => {
                let transferred = if ctx.is_private {
                    Ok(())
                } else {
                    Self::transfer(&mut *ctx.public, call.from, to, call.value)?
                };
                match transferred {
                    Ok(()) => Self::call_contract(ctx.state(), to, call.input.as_slice(), &mut frame, 0)?,
                    Err(revert) => Err(revert),
                }
            }
        };

        match result {
            Ok(return_data) => Ok(ExecutionOutcome {
                return_data,
                gas_used: call.gas - frame.gas_left,
                reverted: false,
                logs: Vec::new(),
                created_contracts: created,
                affected_contracts: affected,
            }),
            Err(revert) => {
                tracing::debug!(reason = ?revert, "Scripted call reverted");
                ctx.state().revert_to_snapshot(snapshot)?;
                if ctx.is_private {
                    ctx.public.revert_to_snapshot(public_snapshot)?;
                }
                let gas_used = match revert {
                    Revert::OutOfGas => call.gas,
                    Revert::BadInput | Revert::InsufficientBalance => call.gas - frame.gas_left,
                };
                Ok(ExecutionOutcome {
                    return_data: Bytes::new(),
                    gas_used,
                    reverted: true,
                    logs: Vec::new(),
                    created_contracts: Vec::new(),
                    affected_contracts: Vec::new(),
                })
            }
        }
    }
}
