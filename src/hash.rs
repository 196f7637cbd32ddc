//! Native Poseidon hashing
//!
//! One hash instance serves every role in the relation: identity derivation
//! (one input), Merkle node hashing (two inputs) and nullifier derivation
//! (three inputs). The in-circuit counterpart in [`crate::circuit::gadgets`]
//! uses the same parameters and domain so both sides agree bit for bit.
//!
//! Poseidon parameters for Pasta:
//! - Width: 3 (2 inputs + 1 capacity)
//! - Full rounds: 8
//! - Partial rounds: 56
//! - S-box: x^5

use halo2_gadgets::poseidon::primitives::{self as poseidon, ConstantLength, P128Pow5T3};
use halo2_proofs::pasta::Fp;

/// Poseidon state width
pub const WIDTH: usize = 3;

/// Poseidon absorption rate
pub const RATE: usize = 2;

/// Hash a fixed-length message of field elements
pub fn poseidon_hash<const L: usize>(message: [Fp; L]) -> Fp {
    poseidon::Hash::<_, P128Pow5T3, ConstantLength<L>, WIDTH, RATE>::init().hash(message)
}

/// Hash two child nodes into their parent
pub fn hash_node(left: Fp, right: Fp) -> Fp {
    poseidon_hash([left, right])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poseidon_hash() {
        let a = Fp::from(123u64);
        let b = Fp::from(456u64);

        let h1 = hash_node(a, b);
        let h2 = hash_node(a, b);
        assert_eq!(h1, h2);

        // Operand order matters
        assert_ne!(h1, hash_node(b, a));
    }

    #[test]
    fn test_arity_is_domain_separated() {
        let a = Fp::from(7u64);

        // ConstantLength<L> encodes L in the capacity, so zero padding
        // cannot make two arities collide
        assert_ne!(poseidon_hash([a]), poseidon_hash([a, Fp::zero()]));
        assert_ne!(
            poseidon_hash([a, Fp::zero()]),
            poseidon_hash([a, Fp::zero(), Fp::zero()])
        );
    }
}
