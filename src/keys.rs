//! Spender identity
//!
//! ```text
//! SecretKey (sk)
//!     |
//!     +---> PublicKey = Poseidon(sk) - the leaf committed into the tree
//! ```
//!
//! The secret key is also the first input of the nullifier, so only its
//! holder can produce a nullifier for a commitment it spends.

use blake2::{Blake2b512, Digest};
use ff::{Field, FromUniformBytes, PrimeField};
use halo2_proofs::pasta::Fp;
use rand::{CryptoRng, RngCore};
use std::fmt;

use crate::constants::domains;
use crate::error::CircuitError;
use crate::hash::poseidon_hash;

/// The spender's long-term secret - never leaves the prover
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
    inner: Fp,
}

impl SecretKey {
    /// Generate a new random secret key
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            inner: Fp::random(rng),
        }
    }

    /// Derive a secret key from a 32-byte seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut hasher = Blake2b512::new();
        hasher.update(domains::KEY_DERIVE);
        hasher.update(seed);
        let hash = hasher.finalize();

        let mut wide = [0u8; 64];
        wide.copy_from_slice(&hash);
        Self {
            inner: Fp::from_uniform_bytes(&wide),
        }
    }

    /// Wrap an existing field element
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

    /// Derive the public identity leaf
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: poseidon_hash([self.inner]),
        }
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("inner", &"[REDACTED]")
            .finish()
    }
}

/// Public identity: `Poseidon(sk)`. This is the value placed in the tree;
/// it is never itself a public input of the relation.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: Fp,
}

impl PublicKey {
    pub fn from_field(f: Fp) -> Self {
        Self { inner: f }
    }

    pub fn to_field(&self) -> Fp {
        self.inner
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_repr()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("inner", &hex::encode(&self.to_bytes()[..8]))
            .finish()
    }
}
