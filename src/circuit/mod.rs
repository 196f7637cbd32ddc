//! Halo2 circuit for the shielded transfer
//!
//! The circuit proves, without revealing the key, the amounts or the leaf:
//! 1. The spender's identity leaf is in the Merkle tree (membership proof)
//! 2. The spent commitment splits into the two new commitments
//! 3. Blinding is conserved across the split
//! 4. Both resulting amounts are 32-bit non-negative integers
//! 5. The nullifier is correctly derived from the key and the spent commitment
//!
//! Circuit Public Inputs:
//! - merkle_root: Merkle tree root
//! - nullifier: Nullifier of the spent commitment
//! - new_sender_commitment: X coordinate of the sender's change commitment
//! - receiver_commitment: X coordinate of the receiver's commitment
//!
//! Circuit Private Inputs (Witness):
//! - Secret key
//! - Old amount, amount sent
//! - Blindings r_old, r_new, r_receiver
//! - Merkle path (siblings and index bits)

pub mod fixed_bases;
pub mod gadgets;
pub mod transaction;

pub use transaction::{PublicInputs, TransactionCircuit, TransactionConfig, TransactionWitness};
