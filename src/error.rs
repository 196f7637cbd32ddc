//! Error types
//!
//! Two failure classes exist. Malformed inputs are rejected before any
//! constraint is assembled ([`CircuitError`]). A witness that violates the
//! relation can never be proven, and proving reports it as a single
//! [`ProofError::InvalidWitness`] without saying which constraint failed.

use thiserror::Error;

/// Construction-time malformation of the input tuple
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CircuitError {
    #[error("merkle path has {actual} entries, expected {expected}")]
    PathLength { expected: usize, actual: usize },

    #[error("merkle path index at level {level} is not 0 or 1")]
    NonBooleanIndex { level: usize },

    #[error("expected {expected} public inputs, got {actual}")]
    PublicInputArity { expected: usize, actual: usize },

    #[error("merkle tree of depth {depth} is full")]
    TreeFull { depth: usize },

    #[error("bytes are not a canonical field encoding")]
    NonCanonical,
}

/// Failures of the proving collaborator
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("key generation failed: {0:?}")]
    Setup(halo2_proofs::plonk::Error),

    #[error("proof generation failed: witness invalid")]
    InvalidWitness,

    #[error("proof verification failed")]
    VerificationFailed,
}
