//! Merkle tree of identity leaves
//!
//! A binary Poseidon tree of fixed depth (20 by default, supporting 2^20
//! leaves). Leaves are spender public keys; only the root is public.
//!
//! Index convention, fixed for the whole protocol: at each level the path
//! carries one bit telling where the accumulated node sits.
//! - bit 0: the node is the LEFT child, parent = H(node, sibling)
//! - bit 1: the node is the RIGHT child, parent = H(sibling, node)
//!
//! Bits are ordered leaf to root, so the bits of a path read as the
//! little-endian binary expansion of the leaf position.

use ff::PrimeField;
use halo2_proofs::pasta::Fp;
use std::fmt;

use crate::constants::MERKLE_DEPTH;
use crate::error::CircuitError;
use crate::hash::hash_node;
use crate::keys::PublicKey;

/// The Merkle tree root a spend authenticates against
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MerkleRoot {
    inner: Fp,
}

impl MerkleRoot {
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

impl fmt::Debug for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "MerkleRoot({:02x}{:02x}...)", bytes[0], bytes[1])
    }
}

/// An authentication path: one sibling and one index bit per level
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath<const DEPTH: usize = MERKLE_DEPTH> {
    /// Sibling hashes from leaf to root
    siblings: [Fp; DEPTH],
    /// `true` when the accumulated node is the right child at that level
    indices: [bool; DEPTH],
}

impl<const DEPTH: usize> MerklePath<DEPTH> {
    /// Build a path from raw field inputs, rejecting malformed shapes
    /// before any constraint is assembled.
    pub fn from_parts(siblings: &[Fp], indices: &[Fp]) -> Result<Self, CircuitError> {
        let siblings: [Fp; DEPTH] =
            siblings
                .try_into()
                .map_err(|_| CircuitError::PathLength {
                    expected: DEPTH,
                    actual: siblings.len(),
                })?;

        if indices.len() != DEPTH {
            return Err(CircuitError::PathLength {
                expected: DEPTH,
                actual: indices.len(),
            });
        }

        let mut bits = [false; DEPTH];
        for (level, (bit, value)) in bits.iter_mut().zip(indices).enumerate() {
            *bit = if *value == Fp::zero() {
                false
            } else if *value == Fp::one() {
                true
            } else {
                return Err(CircuitError::NonBooleanIndex { level });
            };
        }

        Ok(Self {
            siblings,
            indices: bits,
        })
    }

    /// Build a path for the leaf at `position`
    pub fn from_position(position: u64, siblings: [Fp; DEPTH]) -> Self {
        let mut indices = [false; DEPTH];
        for (level, bit) in indices.iter_mut().enumerate().take(64) {
            *bit = (position >> level) & 1 == 1;
        }
        Self { siblings, indices }
    }

    /// Leaf position encoded by the index bits
    pub fn position(&self) -> u64 {
        self.indices
            .iter()
            .take(64)
            .enumerate()
            .filter(|(_, bit)| **bit)
            .fold(0u64, |acc, (level, _)| acc | (1 << level))
    }

    pub fn siblings(&self) -> &[Fp; DEPTH] {
        &self.siblings
    }

    pub fn indices(&self) -> &[bool; DEPTH] {
        &self.indices
    }

    /// Index bits as field elements (0 or 1), the form the circuit consumes
    pub fn index_fields(&self) -> [Fp; DEPTH] {
        self.indices.map(|bit| if bit { Fp::one() } else { Fp::zero() })
    }

    /// Recompute the root from a leaf value using this path
    pub fn compute_root(&self, leaf: Fp) -> Fp {
        self.siblings
            .iter()
            .zip(self.indices.iter())
            .fold(leaf, |node, (sibling, is_right)| {
                if *is_right {
                    hash_node(*sibling, node)
                } else {
                    hash_node(node, *sibling)
                }
            })
    }

    /// Verify the path computes to the expected root
    pub fn verify(&self, leaf: Fp, expected_root: &MerkleRoot) -> bool {
        self.compute_root(leaf) == expected_root.inner
    }
}

/// Empty leaf value (used for unfilled tree positions)
fn empty_leaf() -> Fp {
    Fp::zero()
}

/// empty_roots[i] is the root of an empty subtree of depth i
fn compute_empty_roots(depth: usize) -> Vec<Fp> {
    let mut empty_roots = Vec::with_capacity(depth + 1);
    empty_roots.push(empty_leaf());

    for i in 0..depth {
        let prev = empty_roots[i];
        empty_roots.push(hash_node(prev, prev));
    }

    empty_roots
}

/// An append-only sparse Merkle tree of identity leaves
///
/// Only inserted leaves are stored; empty subtrees use precomputed empty roots.
#[derive(Clone)]
pub struct MerkleTree<const DEPTH: usize = MERKLE_DEPTH> {
    leaves: Vec<Fp>,
    empty_roots: Vec<Fp>,
}

impl<const DEPTH: usize> MerkleTree<DEPTH> {
    pub fn new() -> Self {
        Self {
            leaves: Vec::new(),
            empty_roots: compute_empty_roots(DEPTH),
        }
    }

    /// Maximum number of leaves, saturating at u64::MAX for very deep trees
    pub fn capacity() -> u64 {
        u32::try_from(DEPTH)
            .ok()
            .and_then(|depth| 1u64.checked_shl(depth))
            .unwrap_or(u64::MAX)
    }

    pub fn root(&self) -> MerkleRoot {
        MerkleRoot::from_field(self.compute_node(DEPTH, 0))
    }

    pub fn size(&self) -> u64 {
        self.leaves.len() as u64
    }

    /// Append a leaf, returning its position
    pub fn append(&mut self, leaf: PublicKey) -> Result<u64, CircuitError> {
        let position = self.size();
        if position >= Self::capacity() {
            return Err(CircuitError::TreeFull { depth: DEPTH });
        }
        self.leaves.push(leaf.to_field());
        Ok(position)
    }

    /// Get the authentication path for the leaf at `position`
    pub fn witness(&self, position: u64) -> Option<MerklePath<DEPTH>> {
        if position >= self.size() {
            return None;
        }

        let mut siblings = [Fp::zero(); DEPTH];
        let mut pos = position;
        for (level, sibling) in siblings.iter_mut().enumerate() {
            *sibling = self.compute_node(level, pos ^ 1);
            pos >>= 1;
        }

        Some(MerklePath::from_position(position, siblings))
    }

    fn compute_node(&self, level: usize, index: u64) -> Fp {
        if level == 0 {
            return usize::try_from(index)
                .ok()
                .and_then(|i| self.leaves.get(i).copied())
                .unwrap_or(self.empty_roots[0]);
        }

        // Use checked_shl to avoid overflow when level is large
        let subtree_start = u32::try_from(level)
            .ok()
            .and_then(|shift| index.checked_shl(shift))
            .unwrap_or(u64::MAX);
        if subtree_start >= self.size() {
            return self.empty_roots[level];
        }

        let left = self.compute_node(level - 1, index * 2);
        let right = self.compute_node(level - 1, index * 2 + 1);
        hash_node(left, right)
    }
}

impl<const DEPTH: usize> Default for MerkleTree<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DEPTH: usize> fmt::Debug for MerkleTree<DEPTH> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleTree")
            .field("depth", &DEPTH)
            .field("size", &self.size())
            .field("root", &self.root())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SecretKey;
    use rand::rngs::OsRng;

    fn leaf() -> PublicKey {
        SecretKey::random(&mut OsRng).public_key()
    }

    #[test]
    fn test_empty_tree() {
        let tree: MerkleTree = MerkleTree::new();
        assert_eq!(tree.size(), 0);

        // Empty tree has a well-defined, non-zero root
        let root = tree.root();
        assert_eq!(root.to_field(), compute_empty_roots(MERKLE_DEPTH)[MERKLE_DEPTH]);
        assert!(root.to_bytes().iter().any(|&b| b != 0));
    }

    #[test]
    fn test_single_leaf() {
        let mut tree: MerkleTree = MerkleTree::new();
        let position = tree.append(leaf()).unwrap();
        assert_eq!(position, 0);
        assert_eq!(tree.size(), 1);

        assert_ne!(tree.root(), MerkleTree::<MERKLE_DEPTH>::new().root());
    }

    #[test]
    fn test_merkle_path_verification() {
        let mut tree: MerkleTree = MerkleTree::new();

        let leaves: Vec<PublicKey> = (0..10).map(|_| leaf()).collect();
        for l in &leaves {
            tree.append(*l).unwrap();
        }

        let root = tree.root();
        for (i, l) in leaves.iter().enumerate() {
            let path = tree.witness(i as u64).unwrap();
            assert_eq!(path.position(), i as u64);
            assert!(path.verify(l.to_field(), &root));
        }

        assert!(tree.witness(10).is_none());
    }

    #[test]
    fn test_merkle_path_wrong_leaf_fails() {
        let mut tree: MerkleTree = MerkleTree::new();
        tree.append(leaf()).unwrap();

        let root = tree.root();
        let path = tree.witness(0).unwrap();
        assert!(!path.verify(leaf().to_field(), &root));
    }

    #[test]
    fn test_index_convention() {
        let l = Fp::from(11u64);
        let s0 = Fp::from(22u64);
        let s1 = Fp::from(33u64);

        // (0, 1): left child at level 0, right child at level 1
        let path = MerklePath::<2>::from_parts(&[s0, s1], &[Fp::zero(), Fp::one()]).unwrap();
        assert_eq!(path.compute_root(l), hash_node(s1, hash_node(l, s0)));
        assert_eq!(path.position(), 2);

        // (0, 0): left child at both levels
        let path = MerklePath::<2>::from_parts(&[s0, s1], &[Fp::zero(), Fp::zero()]).unwrap();
        assert_eq!(path.compute_root(l), hash_node(hash_node(l, s0), s1));
    }

    #[test]
    fn test_from_parts_rejects_malformed_paths() {
        let siblings = [Fp::zero(); 3];
        let indices = [Fp::zero(); 3];

        assert_eq!(
            MerklePath::<4>::from_parts(&siblings, &[Fp::zero(); 4]),
            Err(CircuitError::PathLength { expected: 4, actual: 3 })
        );
        assert_eq!(
            MerklePath::<3>::from_parts(&siblings, &indices[..2]),
            Err(CircuitError::PathLength { expected: 3, actual: 2 })
        );
        assert_eq!(
            MerklePath::<3>::from_parts(&siblings, &[Fp::zero(), Fp::from(2u64), Fp::one()]),
            Err(CircuitError::NonBooleanIndex { level: 1 })
        );
    }

    #[test]
    fn test_tree_full() {
        let mut tree = MerkleTree::<2>::new();
        for expected in 0..4 {
            assert_eq!(tree.append(leaf()), Ok(expected));
        }
        assert_eq!(tree.append(leaf()), Err(CircuitError::TreeFull { depth: 2 }));
    }

    #[test]
    fn test_tree_deterministic() {
        let l = SecretKey::from_field(Fp::from(12345u64)).public_key();

        let mut tree1: MerkleTree = MerkleTree::new();
        let mut tree2: MerkleTree = MerkleTree::new();
        tree1.append(l).unwrap();
        tree2.append(l).unwrap();

        assert_eq!(tree1.root(), tree2.root());
    }

    #[test]
    fn test_large_tree() {
        let mut tree: MerkleTree = MerkleTree::new();
        let leaves: Vec<PublicKey> = (0..100).map(|_| leaf()).collect();
        for l in &leaves {
            tree.append(*l).unwrap();
        }
        assert_eq!(tree.size(), 100);

        let path = tree.witness(50).unwrap();
        assert_eq!(path.siblings().len(), MERKLE_DEPTH);
        assert!(path.verify(leaves[50].to_field(), &tree.root()));
    }
}
