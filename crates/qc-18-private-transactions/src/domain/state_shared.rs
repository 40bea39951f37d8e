//! # StateShared Event
//!
//! Log emitted when a party shares a private contract's state with a new
//! participant:
//!
//! ```text
//! event StateShared(address toExtend, string payloadHash, string uuid)
//! ```
//!
//! All three fields are non-indexed and ABI-encoded in the log data.
//! `payloadHash` is standard base64 of the shipped state's payload hash,
//! `uuid` is hex and identifies the extension's initiator.

use crate::domain::entities::Log;
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, Hash, U256};
use crate::errors::ExtensionError;

/// Canonical signature of the event.
pub const STATE_SHARED_SIGNATURE: &str = "StateShared(address,string,string)";

const WORD: usize = 32;

/// Topic 0 of a StateShared log.
#[must_use]
pub fn state_shared_topic() -> Hash {
    keccak256(STATE_SHARED_SIGNATURE.as_bytes())
}

/// Decoded StateShared event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateSharedEvent {
    /// Account whose private state is being shared.
    pub to_extend: Address,
    /// Base64 payload hash of the shared state.
    pub payload_hash: String,
    /// Hex identifier of the extension.
    pub uuid: String,
}

impl StateSharedEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(to_extend: Address, payload_hash: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            to_extend,
            payload_hash: payload_hash.into(),
            uuid: uuid.into(),
        }
    }

    /// Decodes the ABI-encoded data of a StateShared log.
    ///
    /// # Errors
    ///
    /// Returns `ExtensionError::InvalidLog` when the data is truncated, an
    /// offset points outside the data, or a string is not UTF-8.
    pub fn decode(data: &[u8]) -> Result<Self, ExtensionError> {
        if data.len() < 3 * WORD {
            return Err(ExtensionError::InvalidLog(format!(
                "data too short: {} bytes",
                data.len()
            )));
        }

        let mut address = [0u8; 20];
        address.copy_from_slice(&data[12..WORD]);

        let payload_hash = read_string(data, word_at(data, WORD)?)?;
        let uuid = read_string(data, word_at(data, 2 * WORD)?)?;

        Ok(Self {
            to_extend: Address::new(address),
            payload_hash,
            uuid,
        })
    }

    /// ABI-encodes the event into log data.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let head = 3 * WORD;
        let hash_tail = encode_string(&self.payload_hash);
        let uuid_offset = head + hash_tail.len();

        let mut out = Vec::with_capacity(uuid_offset + WORD + padded_len(self.uuid.len()));
        let mut address_word = [0u8; WORD];
        address_word[12..].copy_from_slice(self.to_extend.as_bytes());
        out.extend_from_slice(&address_word);
        out.extend_from_slice(Hash::from_u256(U256::from(head)).as_bytes());
        out.extend_from_slice(Hash::from_u256(U256::from(uuid_offset)).as_bytes());
        out.extend_from_slice(&hash_tail);
        out.extend_from_slice(&encode_string(&self.uuid));
        Bytes(out)
    }

    /// Builds the log an extension contract at `address` would emit.
    #[must_use]
    pub fn to_log(&self, address: Address) -> Log {
        Log::new(address, vec![state_shared_topic()], self.encode())
    }
}

/// Reads a word at `pos` as an offset or length.
fn word_at(data: &[u8], pos: usize) -> Result<usize, ExtensionError> {
    let end = pos
        .checked_add(WORD)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| ExtensionError::InvalidLog(format!("word at {pos} out of bounds")))?;
    let value = U256::from_big_endian(&data[pos..end]);
    if value > U256::from(data.len()) {
        return Err(ExtensionError::InvalidLog(format!(
            "value {value} exceeds data length {}",
            data.len()
        )));
    }
    Ok(value.as_usize())
}

fn read_string(data: &[u8], offset: usize) -> Result<String, ExtensionError> {
    let len = word_at(data, offset)?;
    let start = offset + WORD;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| ExtensionError::InvalidLog(format!("string at {offset} truncated")))?;
    String::from_utf8(data[start..end].to_vec())
        .map_err(|e| ExtensionError::InvalidLog(format!("string at {offset}: {e}")))
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

fn encode_string(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(WORD + padded_len(s.len()));
    out.extend_from_slice(Hash::from_u256(U256::from(s.len())).as_bytes());
    out.extend_from_slice(s.as_bytes());
    out.resize(WORD + padded_len(s.len()), 0);
    out
}
