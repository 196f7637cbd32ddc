//! Protocol constants for the shielded transfer relation

/// Merkle tree depth - 20 levels allows for 2^20 (~1 million) identity leaves
pub const MERKLE_DEPTH: usize = 20;

/// Bit width of transferred amounts and resulting balances.
/// Both `amount_sent` and `old_amount - amount_sent` must lie in `[0, 2^AMOUNT_BITS)`.
pub const AMOUNT_BITS: usize = 32;

/// Circuit size parameter: the relation is laid out over `2^K` rows.
/// Six fixed-base multiplications and 22 Poseidon permutations fit in 2^13.
pub const K: u32 = 13;

/// Bit width of the lookup table shared by the ECC chip's range checks.
pub const LOOKUP_BITS: usize = 10;

/// Domain separators (following Orchard conventions)
pub mod domains {
    /// Hash-to-curve domain for the value commitment generators G and H
    pub const VALUE_COMMIT: &str = "shielded-transfer:value-commit";

    /// Personalization of G (the amount generator)
    pub const VALUE_GENERATOR: &[u8] = b"G";

    /// Personalization of H (the blinding generator)
    pub const BLINDING_GENERATOR: &[u8] = b"H";

    /// Domain separator for deriving a secret key from a seed
    pub const KEY_DERIVE: &[u8] = b"ShieldedTransfer_KeyDerive";
}
