//! # Privacy Flag Invariants
//!
//! Checks deciding whether a private transaction's effects count as success.
//! A violation is never an error: the transaction still executes and pays
//! gas, but its receipt is marked failed on every node.
//!
//! - Attestation: the resolved payload must attest at least the declared flag.
//! - State validation: a flag demanding state validation needs a merkle root.
//! - Affected contracts: every pre-existing contract touched must have been
//!   created under the same flag, by a payload in the affiliated set.

use crate::domain::entities::{ContractPrivacyMetadata, ExtraMetadata, PrivacyFlag};
use crate::domain::value_objects::Address;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Flag the payload was published under, legacy if no metadata came back.
#[must_use]
pub fn attested_flag(metadata: Option<&ExtraMetadata>) -> PrivacyFlag {
    metadata.map_or(PrivacyFlag::STANDARD_PRIVATE, |m| m.privacy_flag)
}

/// The resolver must attest a flag at least as strong as the declared one.
#[must_use]
pub fn check_attestation(declared: PrivacyFlag, attested: PrivacyFlag) -> bool {
    attested >= declared
}

/// A state-validation flag requires an attested merkle root.
#[must_use]
pub fn check_merkle_root(effective: PrivacyFlag, metadata: Option<&ExtraMetadata>) -> bool {
    !effective.requires_state_validation()
        || metadata.is_some_and(|m| m.ac_merkle_root.is_some())
}

/// Checks one pre-existing contract touched by the transaction.
///
/// Missing contract metadata means the contract was created under legacy
/// semantics.
#[must_use]
pub fn check_affected_contract(
    address: Address,
    contract: Option<&ContractPrivacyMetadata>,
    effective: PrivacyFlag,
    metadata: Option<&ExtraMetadata>,
) -> Option<FlagViolation> {
    let contract_flag = contract.map_or(PrivacyFlag::STANDARD_PRIVATE, |c| c.privacy_flag);

    if effective.is_standard_private() {
        return (!contract_flag.is_standard_private()).then_some(
            FlagViolation::ProtectedContractTouched {
                address,
                contract_flag,
            },
        );
    }

    let Some(contract) = contract else {
        return Some(FlagViolation::LegacyContractTouched { address });
    };

    if contract.privacy_flag != effective {
        return Some(FlagViolation::ContractFlagMismatch {
            address,
            contract_flag: contract.privacy_flag,
            tx_flag: effective,
        });
    }

    let affiliated = metadata.is_some_and(|m| m.ac_hashes.contains(&contract.creation_tx_hash));
    (!affiliated).then_some(FlagViolation::UnaffiliatedContract { address })
}

/// Checks everything that can be decided before execution.
#[must_use]
pub fn check_payload_flags(
    declared: PrivacyFlag,
    metadata: Option<&ExtraMetadata>,
) -> FlagCheckResult {
    let attested = attested_flag(metadata);
    let mut violations = Vec::new();

    if !check_attestation(declared, attested) {
        violations.push(FlagViolation::NotAttested { declared, attested });
    }

    if !check_merkle_root(attested, metadata) {
        violations.push(FlagViolation::MissingMerkleRoot { flag: attested });
    }

    if violations.is_empty() {
        FlagCheckResult::Valid
    } else {
        FlagCheckResult::Invalid(violations)
    }
}

/// Checks every affected contract after a non-reverted execution.
pub fn check_affected_contracts<'a>(
    contracts: impl IntoIterator<Item = (Address, Option<&'a ContractPrivacyMetadata>)>,
    effective: PrivacyFlag,
    metadata: Option<&ExtraMetadata>,
) -> FlagCheckResult {
    let violations: Vec<_> = contracts
        .into_iter()
        .filter_map(|(address, contract)| {
            check_affected_contract(address, contract, effective, metadata)
        })
        .collect();

    if violations.is_empty() {
        FlagCheckResult::Valid
    } else {
        FlagCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of a set of flag checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlagCheckResult {
    /// All checks hold.
    Valid,
    /// One or more checks failed.
    Invalid(Vec<FlagViolation>),
}

impl FlagCheckResult {
    /// Returns true if all checks hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Violations found, empty when valid.
    #[must_use]
    pub fn violations(&self) -> &[FlagViolation] {
        match self {
            Self::Valid => &[],
            Self::Invalid(v) => v,
        }
    }
}

/// A specific reason the transaction is marked failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlagViolation {
    /// Declared flag stronger than the attested one.
    NotAttested {
        /// Flag on the transaction.
        declared: PrivacyFlag,
        /// Flag returned with the payload.
        attested: PrivacyFlag,
    },
    /// State validation without a merkle root.
    MissingMerkleRoot {
        /// Effective flag.
        flag: PrivacyFlag,
    },
    /// Protected transaction touched a contract with no privacy metadata.
    LegacyContractTouched {
        /// Contract address.
        address: Address,
    },
    /// Contract created under a different flag.
    ContractFlagMismatch {
        /// Contract address.
        address: Address,
        /// Flag the contract was created under.
        contract_flag: PrivacyFlag,
        /// Effective flag of the transaction.
        tx_flag: PrivacyFlag,
    },
    /// Contract creation payload not in the affiliated set.
    UnaffiliatedContract {
        /// Contract address.
        address: Address,
    },
    /// Legacy transaction touched a protected contract.
    ProtectedContractTouched {
        /// Contract address.
        address: Address,
        /// Flag the contract was created under.
        contract_flag: PrivacyFlag,
    },
}

impl FlagViolation {
    /// Short label used as a metric dimension.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotAttested { .. } => "not_attested",
            Self::MissingMerkleRoot { .. } => "missing_merkle_root",
            Self::LegacyContractTouched { .. } => "legacy_contract",
            Self::ContractFlagMismatch { .. } => "flag_mismatch",
            Self::UnaffiliatedContract { .. } => "unaffiliated_contract",
            Self::ProtectedContractTouched { .. } => "protected_contract",
        }
    }
}

impl std::fmt::Display for FlagViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAttested { declared, attested } => {
                write!(f, "declared flag {declared} not attested (payload has {attested})")
            }
            Self::MissingMerkleRoot { flag } => {
                write!(f, "flag {flag} requires a merkle root")
            }
            Self::LegacyContractTouched { address } => {
                write!(f, "contract {address} has no privacy metadata")
            }
            Self::ContractFlagMismatch {
                address,
                contract_flag,
                tx_flag,
            } => {
                write!(
                    f,
                    "contract {address} created with {contract_flag}, transaction has {tx_flag}"
                )
            }
            Self::UnaffiliatedContract { address } => {
                write!(f, "contract {address} is not in the affiliated set")
            }
            Self::ProtectedContractTouched {
                address,
                contract_flag,
            } => {
                write!(f, "legacy transaction touched {contract_flag} contract {address}")
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
