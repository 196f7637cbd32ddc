//! Input schema of the transaction relation
//!
//! The relation's inputs are described once, as an ordered list of
//! `(name, visibility, type)` entries, instead of being tagged field by field.
//! Public entries appear in exactly the order the verifier matches them
//! against the instance column.

use std::fmt;

/// Whether an input is exposed to the verifier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Shape of an input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputType {
    /// A single field element
    Field,
    /// A fixed-length sequence of field elements
    FieldArray(usize),
    /// A fixed-length sequence of boolean field elements
    Bits(usize),
    /// A field element carrying an integer below `2^bits`
    Amount { bits: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputField {
    pub name: &'static str,
    pub visibility: Visibility,
    pub ty: InputType,
}

impl InputField {
    const fn public(name: &'static str) -> Self {
        Self {
            name,
            visibility: Visibility::Public,
            ty: InputType::Field,
        }
    }

    const fn private(name: &'static str, ty: InputType) -> Self {
        Self {
            name,
            visibility: Visibility::Private,
            ty,
        }
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visibility = match self.visibility {
            Visibility::Public => "public",
            Visibility::Private => "private",
        };
        write!(f, "{} ({}, {:?})", self.name, visibility, self.ty)
    }
}

/// Instance column rows of the public inputs
pub mod rows {
    pub const MERKLE_ROOT: usize = 0;
    pub const NULLIFIER: usize = 1;
    pub const NEW_SENDER_COMMITMENT: usize = 2;
    pub const RECEIVER_COMMITMENT: usize = 3;
}

/// Number of public inputs
pub const PUBLIC_INPUTS: usize = 4;

/// The full input tuple of a transaction over a tree of the given depth
pub fn transaction_schema(depth: usize, amount_bits: usize) -> Vec<InputField> {
    vec![
        InputField::public("MerkleRoot"),
        InputField::public("Nullifier"),
        InputField::public("NewSenderCommitment"),
        InputField::public("ReceiverCommitment"),
        InputField::private("SecretKey", InputType::Field),
        InputField::private("OldAmount", InputType::Amount { bits: amount_bits }),
        InputField::private("AmountSent", InputType::Amount { bits: amount_bits }),
        InputField::private("R_old", InputType::Field),
        InputField::private("R_new", InputType::Field),
        InputField::private("R_receiver", InputType::Field),
        InputField::private("MerklePath", InputType::FieldArray(depth)),
        InputField::private("MerklePathIndices", InputType::Bits(depth)),
    ]
}

/// Names of the public inputs, in instance order
pub fn public_names(schema: &[InputField]) -> Vec<&'static str> {
    schema
        .iter()
        .filter(|field| field.is_public())
        .map(|field| field.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{AMOUNT_BITS, MERKLE_DEPTH};

    #[test]
    fn test_public_order_matches_rows() {
        let schema = transaction_schema(MERKLE_DEPTH, AMOUNT_BITS);
        let public = public_names(&schema);

        assert_eq!(public.len(), PUBLIC_INPUTS);
        assert_eq!(public[rows::MERKLE_ROOT], "MerkleRoot");
        assert_eq!(public[rows::NULLIFIER], "Nullifier");
        assert_eq!(public[rows::NEW_SENDER_COMMITMENT], "NewSenderCommitment");
        assert_eq!(public[rows::RECEIVER_COMMITMENT], "ReceiverCommitment");
    }

    #[test]
    fn test_private_inputs() {
        let schema = transaction_schema(2, AMOUNT_BITS);
        let private: Vec<_> = schema.iter().filter(|f| !f.is_public()).collect();

        assert_eq!(private.len(), 8);
        assert!(private
            .iter()
            .any(|f| f.name == "MerklePathIndices" && f.ty == InputType::Bits(2)));
        assert!(private
            .iter()
            .any(|f| f.name == "AmountSent" && f.ty == InputType::Amount { bits: 32 }));
    }

    #[test]
    fn test_display() {
        let schema = transaction_schema(MERKLE_DEPTH, AMOUNT_BITS);
        assert_eq!(schema[0].to_string(), "MerkleRoot (public, Field)");
    }
}
