//! # Domain Services
//!
//! Pure functions used by the private execution path.
//! No I/O, no async, deterministic.

use crate::domain::value_objects::{Address, Hash};
use sha3::{Digest, Keccak256};

// =============================================================================
// GAS
// =============================================================================

/// Base cost of a message call.
pub const TX_GAS: u64 = 21_000;

/// Base cost of a contract creation.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;

/// Intrinsic gas of a message carrying `data`.
///
/// For a private transaction `data` is the on-chain reference hash, so every
/// node charges the same amount regardless of payload visibility.
#[must_use]
pub fn intrinsic_gas(data: &[u8], is_contract_creation: bool) -> u64 {
    let base = if is_contract_creation {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };

    // 16 gas per non-zero byte, 4 gas per zero byte
    let data_gas: u64 = data
        .iter()
        .map(|&byte| if byte == 0 { 4u64 } else { 16u64 })
        .sum();

    base.saturating_add(data_gas)
}

// =============================================================================
// KECCAK256
// =============================================================================

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    Hash::new(Keccak256::digest(data).into())
}

// =============================================================================
// CONTRACT ADDRESS COMPUTATION
// =============================================================================

/// Computes the contract address for a creation.
///
/// Address = keccak256(rlp(\[sender, nonce\]))\[12:\]
#[must_use]
pub fn compute_contract_address(sender: Address, nonce: u64) -> Address {
    let mut content = Vec::with_capacity(32);

    // 20-byte string header (0x80 + 20)
    content.push(0x94);
    content.extend_from_slice(sender.as_bytes());

    if nonce == 0 {
        content.push(0x80);
    } else if nonce < 128 {
        content.push(nonce as u8);
    } else {
        let bytes = nonce.to_be_bytes();
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
        content.push(0x80 + (8 - start) as u8);
        content.extend_from_slice(&bytes[start..]);
    }

    // content is at most 30 bytes, always a short list
    let mut rlp_data = Vec::with_capacity(content.len() + 1);
    rlp_data.push(0xc0 + content.len() as u8);
    rlp_data.extend_from_slice(&content);

    let hash = Keccak256::digest(&rlp_data);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..32]);
    Address::new(addr)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_address_known_vector() {
        // Well-known mainnet vector: sender 0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0
        let sender = Address::from_hex("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        let expected = Address::from_hex("0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap();
        assert_eq!(compute_contract_address(sender, 0), expected);

        let expected_1 = Address::from_hex("0x343c43a37d37dff08ae8c4a11544c718abb4fcf8").unwrap();
        assert_eq!(compute_contract_address(sender, 1), expected_1);
    }

    #[test]
    fn test_contract_address_large_nonce_differs() {
        let sender = Address::new([1u8; 20]);
        assert_ne!(
            compute_contract_address(sender, 200),
            compute_contract_address(sender, 201)
        );
    }

    #[test]
    fn test_intrinsic_gas() {
        assert_eq!(intrinsic_gas(&[], false), 21_000);
        assert_eq!(intrinsic_gas(&[], true), 53_000);
        assert_eq!(intrinsic_gas(&[0, 1], false), 21_000 + 4 + 16);
    }

    #[test]
    fn test_keccak256_empty() {
        let hash = keccak256(&[]);
        assert_eq!(hash.0[0], 0xc5);
        assert_eq!(hash.0[31], 0x70);
    }
}
