//! Transaction circuit
//!
//! Proves, for a spender holding `sk` and a commitment to `old_amount`:
//! 1. `Poseidon(sk)` is a leaf of the tree with the public root
//! 2. the old commitment is split into a new sender commitment to
//!    `old_amount - amount_sent` and a receiver commitment to `amount_sent`
//! 3. blinding is conserved: `r_old = r_new + r_receiver`
//! 4. `amount_sent` and `old_amount - amount_sent` both lie in `[0, 2^32)`
//! 5. the public nullifier is `Poseidon(sk, cv_old.x, cv_old.y)`
//!
//! Public inputs, in instance order: merkle root, nullifier, X of the new
//! sender commitment, X of the receiver commitment.

use halo2_gadgets::{
    ecc::{
        chip::{EccChip, EccConfig},
        FixedPointBaseField, Point,
    },
    poseidon::{primitives::P128Pow5T3, Pow5Chip, Pow5Config},
    utilities::lookup_range_check::LookupRangeCheckConfig,
};
use halo2_proofs::{
    circuit::{AssignedCell, Layouter, SimpleFloorPlanner, Value},
    pasta::{pallas, Fp},
    plonk::{Advice, Circuit, Column, ConstraintSystem, Error, Instance, TableColumn},
};

use super::fixed_bases::{CommitmentBases, ValueCommitBase};
use super::gadgets::{
    assign_private, poseidon_hash, BalanceChip, BalanceConfig, MerkleSwapChip, MerkleSwapConfig,
    RangeCheckChip, RangeCheckConfig,
};
use crate::commitment::{Blinding, ExtractedCommitment, ValueCommitment};
use crate::constants::{AMOUNT_BITS, LOOKUP_BITS, MERKLE_DEPTH};
use crate::error::CircuitError;
use crate::hash::{RATE, WIDTH};
use crate::keys::SecretKey;
use crate::merkle::{MerklePath, MerkleRoot};
use crate::nullifier::Nullifier;
use crate::schema::{rows, PUBLIC_INPUTS};

/// Public inputs to the circuit (instance)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicInputs {
    pub merkle_root: MerkleRoot,
    pub nullifier: Nullifier,
    pub new_sender_commitment: ExtractedCommitment,
    pub receiver_commitment: ExtractedCommitment,
}

impl PublicInputs {
    /// Field elements in instance order
    pub fn to_fields(&self) -> [Fp; PUBLIC_INPUTS] {
        let mut fields = [Fp::zero(); PUBLIC_INPUTS];
        fields[rows::MERKLE_ROOT] = self.merkle_root.to_field();
        fields[rows::NULLIFIER] = self.nullifier.to_field();
        fields[rows::NEW_SENDER_COMMITMENT] = self.new_sender_commitment.to_field();
        fields[rows::RECEIVER_COMMITMENT] = self.receiver_commitment.to_field();
        fields
    }

    /// Convert to the instance columns of the circuit
    pub fn to_instance(&self) -> Vec<Vec<Fp>> {
        vec![self.to_fields().to_vec()]
    }

    /// Parse a positional public input vector
    pub fn from_instance(fields: &[Fp]) -> Result<Self, CircuitError> {
        if fields.len() != PUBLIC_INPUTS {
            return Err(CircuitError::PublicInputArity {
                expected: PUBLIC_INPUTS,
                actual: fields.len(),
            });
        }

        Ok(Self {
            merkle_root: MerkleRoot::from_field(fields[rows::MERKLE_ROOT]),
            nullifier: Nullifier::from_field(fields[rows::NULLIFIER]),
            new_sender_commitment: ExtractedCommitment::from_field(
                fields[rows::NEW_SENDER_COMMITMENT],
            ),
            receiver_commitment: ExtractedCommitment::from_field(fields[rows::RECEIVER_COMMITMENT]),
        })
    }
}

/// Private inputs to the circuit (witness)
#[derive(Clone, Debug)]
pub struct TransactionWitness<const DEPTH: usize = MERKLE_DEPTH> {
    pub secret_key: SecretKey,
    pub old_amount: u64,
    pub amount_sent: u64,
    pub r_old: Blinding,
    pub r_new: Blinding,
    pub r_receiver: Blinding,
    pub path: MerklePath<DEPTH>,
}

impl<const DEPTH: usize> TransactionWitness<DEPTH> {
    pub fn new(
        secret_key: SecretKey,
        old_amount: u64,
        amount_sent: u64,
        r_old: Blinding,
        r_new: Blinding,
        r_receiver: Blinding,
        path: MerklePath<DEPTH>,
    ) -> Self {
        Self {
            secret_key,
            old_amount,
            amount_sent,
            r_old,
            r_new,
            r_receiver,
            path,
        }
    }

    /// Build a witness whose blindings split `r_old` with fresh randomness
    pub fn with_split<R: rand::RngCore + rand::CryptoRng>(
        secret_key: SecretKey,
        old_amount: u64,
        amount_sent: u64,
        r_old: Blinding,
        path: MerklePath<DEPTH>,
        rng: &mut R,
    ) -> Self {
        let (r_new, r_receiver) = r_old.split(rng);
        Self::new(secret_key, old_amount, amount_sent, r_old, r_new, r_receiver, path)
    }

    /// `old_amount - amount_sent` in the field; wraps if `amount_sent > old_amount`
    pub fn remaining(&self) -> Fp {
        Fp::from(self.old_amount) - Fp::from(self.amount_sent)
    }

    pub fn old_commitment(&self) -> ValueCommitment {
        ValueCommitment::commit(Fp::from(self.old_amount), &self.r_old)
    }

    pub fn new_sender_commitment(&self) -> ValueCommitment {
        ValueCommitment::commit(self.remaining(), &self.r_new)
    }

    pub fn receiver_commitment(&self) -> ValueCommitment {
        ValueCommitment::commit(Fp::from(self.amount_sent), &self.r_receiver)
    }

    pub fn nullifier(&self) -> Nullifier {
        Nullifier::derive(&self.secret_key, &self.old_commitment())
    }

    pub fn merkle_root(&self) -> MerkleRoot {
        let leaf = self.secret_key.public_key().to_field();
        MerkleRoot::from_field(self.path.compute_root(leaf))
    }

    /// The public inputs an honest prover would claim for this witness
    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs {
            merkle_root: self.merkle_root(),
            nullifier: self.nullifier(),
            new_sender_commitment: self.new_sender_commitment().extract(),
            receiver_commitment: self.receiver_commitment().extract(),
        }
    }
}

/// Circuit configuration
#[derive(Clone, Debug)]
pub struct TransactionConfig {
    advices: [Column<Advice>; 10],
    instance: Column<Instance>,
    table_idx: TableColumn,
    ecc: EccConfig<CommitmentBases>,
    poseidon: Pow5Config<Fp, WIDTH, RATE>,
    swap: MerkleSwapConfig,
    balance: BalanceConfig,
    range: RangeCheckConfig,
}

/// The transaction circuit over a tree of depth `DEPTH`
#[derive(Clone, Debug)]
pub struct TransactionCircuit<const DEPTH: usize = MERKLE_DEPTH> {
    secret_key: Value<Fp>,
    old_amount: Value<Fp>,
    amount_sent: Value<Fp>,
    r_old: Value<Fp>,
    r_new: Value<Fp>,
    r_receiver: Value<Fp>,
    siblings: [Value<Fp>; DEPTH],
    indices: [Value<Fp>; DEPTH],
}

impl<const DEPTH: usize> Default for TransactionCircuit<DEPTH> {
    fn default() -> Self {
        Self {
            secret_key: Value::unknown(),
            old_amount: Value::unknown(),
            amount_sent: Value::unknown(),
            r_old: Value::unknown(),
            r_new: Value::unknown(),
            r_receiver: Value::unknown(),
            siblings: [Value::unknown(); DEPTH],
            indices: [Value::unknown(); DEPTH],
        }
    }
}

impl<const DEPTH: usize> TransactionCircuit<DEPTH> {
    /// Create a new circuit with witness data
    pub fn new(witness: &TransactionWitness<DEPTH>) -> Self {
        Self {
            secret_key: Value::known(witness.secret_key.to_field()),
            old_amount: Value::known(Fp::from(witness.old_amount)),
            amount_sent: Value::known(Fp::from(witness.amount_sent)),
            r_old: Value::known(witness.r_old.to_field()),
            r_new: Value::known(witness.r_new.to_field()),
            r_receiver: Value::known(witness.r_receiver.to_field()),
            siblings: witness.path.siblings().map(Value::known),
            indices: witness.path.index_fields().map(Value::known),
        }
    }

    /// cv = [amount]G + [blinding]H
    fn commit(
        ecc_chip: &EccChip<CommitmentBases>,
        mut layouter: impl Layouter<Fp>,
        amount: AssignedCell<Fp, Fp>,
        blinding: AssignedCell<Fp, Fp>,
    ) -> Result<Point<pallas::Affine, EccChip<CommitmentBases>>, Error> {
        let value = FixedPointBaseField::from_inner(ecc_chip.clone(), ValueCommitBase::Value)
            .mul(layouter.namespace(|| "[amount] G"), amount)?;
        let blind = FixedPointBaseField::from_inner(ecc_chip.clone(), ValueCommitBase::Blinding)
            .mul(layouter.namespace(|| "[blinding] H"), blinding)?;
        value.add(layouter.namespace(|| "value + blind"), &blind)
    }
}

impl<const DEPTH: usize> Circuit<Fp> for TransactionCircuit<DEPTH> {
    type Config = TransactionConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::default()
    }

    fn configure(meta: &mut ConstraintSystem<Fp>) -> Self::Config {
        let advices = [
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
        ];
        for advice in advices.iter() {
            meta.enable_equality(*advice);
        }

        // Instance column for public inputs
        let instance = meta.instance_column();
        meta.enable_equality(instance);

        // Lookup table for the ECC chip's 10-bit range checks
        let table_idx = meta.lookup_table_column();

        // Fixed columns shared by the ECC chip and Poseidon round constants
        let lagrange_coeffs = [
            meta.fixed_column(),
            meta.fixed_column(),
            meta.fixed_column(),
            meta.fixed_column(),
            meta.fixed_column(),
            meta.fixed_column(),
            meta.fixed_column(),
            meta.fixed_column(),
        ];
        let rc_a = [lagrange_coeffs[2], lagrange_coeffs[3], lagrange_coeffs[4]];
        let rc_b = [lagrange_coeffs[5], lagrange_coeffs[6], lagrange_coeffs[7]];
        meta.enable_constant(lagrange_coeffs[0]);

        let range_check = LookupRangeCheckConfig::configure(meta, advices[9], table_idx);
        let ecc = EccChip::<CommitmentBases>::configure(meta, advices, lagrange_coeffs, range_check);

        let poseidon = Pow5Chip::configure::<P128Pow5T3>(
            meta,
            [advices[6], advices[7], advices[8]],
            advices[5],
            rc_a,
            rc_b,
        );

        let swap = MerkleSwapChip::configure(
            meta,
            [advices[0], advices[1], advices[2], advices[3], advices[4]],
        );
        let balance = BalanceChip::configure(meta, advices[0], advices[1], advices[2]);
        let range = RangeCheckChip::configure(meta, advices[3]);

        TransactionConfig {
            advices,
            instance,
            table_idx,
            ecc,
            poseidon,
            swap,
            balance,
            range,
        }
    }

    fn synthesize(
        &self,
        config: Self::Config,
        mut layouter: impl Layouter<Fp>,
    ) -> Result<(), Error> {
        layouter.assign_table(
            || "range check table",
            |mut table| {
                for index in 0..(1usize << LOOKUP_BITS) {
                    table.assign_cell(
                        || "table_idx",
                        config.table_idx,
                        index,
                        || Value::known(Fp::from(index as u64)),
                    )?;
                }
                Ok(())
            },
        )?;

        let ecc_chip = EccChip::construct(config.ecc.clone());
        let poseidon = &config.poseidon;

        // ===== Identity: leaf = Poseidon(sk) =====
        let sk = assign_private(
            layouter.namespace(|| "secret key"),
            config.advices[0],
            self.secret_key,
        )?;
        let leaf = poseidon_hash(poseidon, layouter.namespace(|| "leaf"), [sk.clone()])?;

        // ===== Merkle inclusion =====
        let swap = MerkleSwapChip::construct(config.swap.clone());
        let mut node = leaf;
        for (level, (sibling, bit)) in self.siblings.iter().zip(self.indices.iter()).enumerate() {
            let (left, right) = swap.swap(
                layouter.namespace(|| format!("level {} order", level)),
                &node,
                *sibling,
                *bit,
            )?;
            node = poseidon_hash(
                poseidon,
                layouter.namespace(|| format!("level {} hash", level)),
                [left, right],
            )?;
        }
        let root = node;

        // ===== Amounts =====
        let balance = BalanceChip::construct(config.balance.clone());
        let range = RangeCheckChip::construct(config.range.clone());

        let old_amount = assign_private(
            layouter.namespace(|| "old amount"),
            config.advices[0],
            self.old_amount,
        )?;
        let amount_sent = assign_private(
            layouter.namespace(|| "amount sent"),
            config.advices[1],
            self.amount_sent,
        )?;
        let remaining = assign_private(
            layouter.namespace(|| "remaining"),
            config.advices[2],
            self.old_amount - self.amount_sent,
        )?;
        balance.constrain(
            layouter.namespace(|| "old = remaining + sent"),
            &old_amount,
            &amount_sent,
            &remaining,
        )?;
        range.check(layouter.namespace(|| "amount sent range"), &amount_sent, AMOUNT_BITS)?;
        range.check(layouter.namespace(|| "remaining range"), &remaining, AMOUNT_BITS)?;

        // ===== Blindings =====
        let r_old = assign_private(layouter.namespace(|| "r_old"), config.advices[0], self.r_old)?;
        let r_new = assign_private(layouter.namespace(|| "r_new"), config.advices[1], self.r_new)?;
        let r_receiver = assign_private(
            layouter.namespace(|| "r_receiver"),
            config.advices[2],
            self.r_receiver,
        )?;
        balance.constrain(
            layouter.namespace(|| "r_old = r_new + r_receiver"),
            &r_old,
            &r_new,
            &r_receiver,
        )?;

        // ===== Commitments =====
        let old_commitment = Self::commit(
            &ecc_chip,
            layouter.namespace(|| "old commitment"),
            old_amount,
            r_old,
        )?;
        let new_sender_commitment = Self::commit(
            &ecc_chip,
            layouter.namespace(|| "new sender commitment"),
            remaining,
            r_new,
        )?;
        let receiver_commitment = Self::commit(
            &ecc_chip,
            layouter.namespace(|| "receiver commitment"),
            amount_sent,
            r_receiver,
        )?;

        // ===== Nullifier: Poseidon(sk, cv_old.x, cv_old.y) =====
        let nullifier = poseidon_hash(
            poseidon,
            layouter.namespace(|| "nullifier"),
            [sk, old_commitment.inner().x(), old_commitment.inner().y()],
        )?;

        // ===== Public inputs =====
        layouter.constrain_instance(root.cell(), config.instance, rows::MERKLE_ROOT)?;
        layouter.constrain_instance(nullifier.cell(), config.instance, rows::NULLIFIER)?;
        layouter.constrain_instance(
            new_sender_commitment.extract_p().inner().cell(),
            config.instance,
            rows::NEW_SENDER_COMMITMENT,
        )?;
        layouter.constrain_instance(
            receiver_commitment.extract_p().inner().cell(),
            config.instance,
            rows::RECEIVER_COMMITMENT,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::K;
    use crate::hash::hash_node;
    use crate::merkle::MerkleTree;
    use ff::PrimeField;
    use halo2_proofs::dev::MockProver;
    use rand::rngs::OsRng;

    /// A funded spender in a tree of depth D, with an honest witness
    fn honest_witness<const D: usize>(old_amount: u64, amount_sent: u64) -> TransactionWitness<D> {
        let sk = SecretKey::random(&mut OsRng);

        let mut tree = MerkleTree::<D>::new();
        tree.append(SecretKey::random(&mut OsRng).public_key()).unwrap();
        let position = tree.append(sk.public_key()).unwrap();
        tree.append(SecretKey::random(&mut OsRng).public_key()).unwrap();
        let path = tree.witness(position).unwrap();
        assert!(path.verify(sk.public_key().to_field(), &tree.root()));

        TransactionWitness::with_split(
            sk,
            old_amount,
            amount_sent,
            Blinding::random(&mut OsRng),
            path,
            &mut OsRng,
        )
    }

    fn run<const D: usize>(witness: &TransactionWitness<D>, public: &PublicInputs) -> MockProver<Fp> {
        let circuit = TransactionCircuit::new(witness);
        MockProver::run(K, &circuit, public.to_instance()).unwrap()
    }

    fn satisfied<const D: usize>(witness: &TransactionWitness<D>) -> bool {
        run(witness, &witness.public_inputs()).verify().is_ok()
    }

    #[test]
    fn test_transaction_valid() {
        let witness = honest_witness::<MERKLE_DEPTH>(1000, 400);
        run(&witness, &witness.public_inputs()).assert_satisfied();
    }

    #[test]
    fn test_sibling_bit_flip_fails() {
        let witness = honest_witness::<MERKLE_DEPTH>(1000, 400);
        let public = witness.public_inputs();

        for level in [0, 7, MERKLE_DEPTH - 1] {
            let mut siblings = *witness.path.siblings();
            let mut bytes = siblings[level].to_repr();
            bytes[0] ^= 1;
            siblings[level] = Fp::from_repr(bytes).unwrap();
            let indices = witness.path.index_fields();

            let mut tampered = witness.clone();
            tampered.path = MerklePath::from_parts(&siblings, &indices).unwrap();
            assert!(run(&tampered, &public).verify().is_err());
        }
    }

    #[test]
    fn test_index_flip_fails() {
        let witness = honest_witness::<MERKLE_DEPTH>(1000, 400);
        let public = witness.public_inputs();

        for level in [0, 1, MERKLE_DEPTH - 1] {
            let mut indices = witness.path.index_fields();
            indices[level] = Fp::one() - indices[level];

            let mut tampered = witness.clone();
            tampered.path = MerklePath::from_parts(witness.path.siblings(), &indices).unwrap();
            assert!(run(&tampered, &public).verify().is_err());
        }
    }

    #[test]
    fn test_non_boolean_index_rejected_by_gate() {
        let witness = honest_witness::<2>(100, 40);
        let public = witness.public_inputs();

        // Bypass construction-time validation with index 2 at level 0
        let mut circuit = TransactionCircuit::new(&witness);
        circuit.indices[0] = Value::known(Fp::from(2));

        let prover = MockProver::run(K, &circuit, public.to_instance()).unwrap();
        assert!(prover.verify().is_err());
    }

    #[test]
    fn test_conservation_violation_fails() {
        let mut witness = honest_witness::<MERKLE_DEPTH>(1000, 400);
        witness.r_receiver = witness.r_receiver + Blinding::from(1);

        // Both commitments are well formed, and the public inputs match them
        let public = witness.public_inputs();
        assert!(run(&witness, &public).verify().is_err());
    }

    #[test]
    fn test_send_more_than_balance_fails() {
        // remaining wraps to p - 100
        let witness = honest_witness::<MERKLE_DEPTH>(300, 400);
        assert!(!satisfied(&witness));
    }

    #[test]
    fn test_amount_boundaries() {
        let old = 5000;
        assert!(satisfied(&honest_witness::<2>(old, 0)));
        assert!(satisfied(&honest_witness::<2>(old, old)));

        let max = (1u64 << AMOUNT_BITS) - 1;
        assert!(satisfied(&honest_witness::<2>(max, max)));

        // 2^32 is out of range even when the balance covers it
        let over = 1u64 << AMOUNT_BITS;
        assert!(!satisfied(&honest_witness::<2>(over, over)));
    }

    #[test]
    fn test_wrong_nullifier_fails() {
        let witness = honest_witness::<2>(100, 40);
        let mut public = witness.public_inputs();
        public.nullifier = Nullifier::from_field(public.nullifier.to_field() + Fp::one());

        assert!(run(&witness, &public).verify().is_err());
    }

    #[test]
    fn test_wrong_commitment_x_fails() {
        let witness = honest_witness::<2>(100, 40);

        let mut public = witness.public_inputs();
        public.receiver_commitment =
            ValueCommitment::commit(Fp::from(41u64), &witness.r_receiver).extract();
        assert!(run(&witness, &public).verify().is_err());

        let mut public = witness.public_inputs();
        public.new_sender_commitment = public.receiver_commitment;
        assert!(run(&witness, &public).verify().is_err());
    }

    #[test]
    fn test_depth_two_example() {
        let sk = SecretKey::from_field(Fp::from(42u64));
        let leaf = sk.public_key().to_field();
        let (s0, s1) = (Fp::from(1001u64), Fp::from(1002u64));

        // Indices (0, 1): left child at level 0, right child at level 1
        let path = MerklePath::<2>::from_parts(&[s0, s1], &[Fp::zero(), Fp::one()]).unwrap();
        let root = hash_node(s1, hash_node(leaf, s0));

        let witness = TransactionWitness::new(
            sk.clone(),
            100,
            40,
            Blinding::from(7),
            Blinding::from(3),
            Blinding::from(4),
            path.clone(),
        );
        let public = witness.public_inputs();

        assert_eq!(public.merkle_root.to_field(), root);
        assert_eq!(
            public.new_sender_commitment,
            ValueCommitment::commit(Fp::from(60u64), &Blinding::from(3)).extract()
        );
        assert_eq!(
            public.receiver_commitment,
            ValueCommitment::commit(Fp::from(40u64), &Blinding::from(4)).extract()
        );
        assert_eq!(
            public.nullifier,
            Nullifier::derive(&sk, &ValueCommitment::commit(Fp::from(100u64), &Blinding::from(7)))
        );
        run(&witness, &public).assert_satisfied();

        // R_new + R_receiver = 8 != R_old
        let unconserved = TransactionWitness::new(
            sk,
            100,
            40,
            Blinding::from(7),
            Blinding::from(3),
            Blinding::from(5),
            path,
        );
        assert!(!satisfied(&unconserved));
    }

    #[test]
    fn test_public_inputs_arity() {
        let witness = honest_witness::<2>(100, 40);
        let public = witness.public_inputs();

        assert_eq!(PublicInputs::from_instance(&public.to_fields()), Ok(public));
        assert_eq!(
            PublicInputs::from_instance(&public.to_fields()[..3]),
            Err(CircuitError::PublicInputArity { expected: 4, actual: 3 })
        );
    }
}
