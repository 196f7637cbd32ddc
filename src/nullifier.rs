//! Nullifier derivation
//!
//! The nullifier is a public fingerprint of a spend. It binds the secret key
//! to the exact commitment being spent:
//!
//! nf = Poseidon(sk, cv_old.x, cv_old.y)
//!
//! Properties:
//! - Deterministic: the same (key, commitment) pair always yields the same nullifier
//! - Only the key holder can compute it
//! - It reveals neither the key nor the commitment
//!
//! Rejecting a nullifier seen before is the job of whoever keeps the ledger;
//! [`NullifierSet`] is an in-memory reference for that bookkeeping.

use ff::PrimeField;
use halo2_proofs::pasta::Fp;
use std::collections::HashSet;
use std::fmt;

use crate::commitment::ValueCommitment;
use crate::error::CircuitError;
use crate::hash::poseidon_hash;
use crate::keys::SecretKey;

/// A nullifier - revealed when spending to prevent double-spending
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Nullifier {
    inner: Fp,
}

// Custom Hash implementation since Fp doesn't implement Hash
impl std::hash::Hash for Nullifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl Nullifier {
    /// nf = Poseidon(sk, cv_old.x, cv_old.y)
    pub fn derive(sk: &SecretKey, old_commitment: &ValueCommitment) -> Self {
        let inner = poseidon_hash([sk.to_field(), old_commitment.x(), old_commitment.y()]);
        Self { inner }
    }

    pub fn from_field(f: Fp) -> Self {
        Self { inner: f }
    }

    pub fn to_field(&self) -> Fp {
        self.inner
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_repr()
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CircuitError> {
        Option::<Fp>::from(Fp::from_repr(*bytes))
            .map(Self::from_field)
            .ok_or(CircuitError::NonCanonical)
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "Nullifier({:02x}{:02x}...)", bytes[0], bytes[1])
    }
}

/// A set of published nullifiers (spent commitments)
#[derive(Default, Clone, Debug)]
pub struct NullifierSet {
    nullifiers: HashSet<Nullifier>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a nullifier has been seen (commitment already spent)
    pub fn contains(&self, nf: &Nullifier) -> bool {
        self.nullifiers.contains(nf)
    }

    /// Record a nullifier.
    /// Returns false if already present (double-spend attempt)
    pub fn insert(&mut self, nf: Nullifier) -> bool {
        self.nullifiers.insert(nf)
    }

    pub fn len(&self) -> usize {
        self.nullifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nullifiers.is_empty()
    }
}
