//! Shielded transfer circuit
//!
//! A Halo 2 relation for private transfers:
//! - 20-level Poseidon Merkle tree of spender identities
//! - Pedersen value commitments over Pallas with conserved blinding
//! - 32-bit range checks on both resulting amounts
//! - Poseidon nullifier binding the secret key to the spent commitment
//!
//! The public inputs are, in order: the Merkle root, the nullifier, and the X
//! coordinates of the new sender commitment and of the receiver commitment.

pub mod constants;
pub mod error;
pub mod hash;
pub mod keys;
pub mod commitment;
pub mod nullifier;
pub mod merkle;
pub mod schema;
pub mod circuit;
pub mod prover;

// Re-exports for convenience
pub use constants::*;
pub use error::{CircuitError, ProofError};
pub use keys::{PublicKey, SecretKey};
pub use commitment::{Blinding, ExtractedCommitment, ValueCommitment};
pub use nullifier::{Nullifier, NullifierSet};
pub use merkle::{MerklePath, MerkleRoot, MerkleTree};
pub use circuit::{PublicInputs, TransactionCircuit, TransactionWitness};
pub use prover::{Proof, ProvingKey, VerifyingKey};
