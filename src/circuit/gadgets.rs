//! Circuit gadgets for the transaction relation
//!
//! Small chips used by [`super::transaction`]:
//! - in-circuit Poseidon, the same instance as [`crate::hash`]
//! - a Merkle swap that orders (node, sibling) by a boolean path bit
//! - a balance gate `a - b - c = 0`
//! - a running-sum range check for amounts

use ff::PrimeField;
use halo2_gadgets::poseidon::{
    primitives::{ConstantLength, P128Pow5T3},
    Hash, Pow5Chip, Pow5Config,
};
use halo2_proofs::{
    circuit::{AssignedCell, Layouter, Value},
    pasta::Fp,
    plonk::{Advice, Column, ConstraintSystem, Constraints, Error, Expression, Selector},
    poly::Rotation,
};

use crate::hash::{RATE, WIDTH};

/// Witness a private value in a fresh cell
pub fn assign_private(
    mut layouter: impl Layouter<Fp>,
    column: Column<Advice>,
    value: Value<Fp>,
) -> Result<AssignedCell<Fp, Fp>, Error> {
    layouter.assign_region(
        || "load private",
        |mut region| region.assign_advice(|| "private input", column, 0, || value),
    )
}

/// Hash a fixed-length message with the Poseidon chip
pub fn poseidon_hash<const L: usize>(
    config: &Pow5Config<Fp, WIDTH, RATE>,
    mut layouter: impl Layouter<Fp>,
    message: [AssignedCell<Fp, Fp>; L],
) -> Result<AssignedCell<Fp, Fp>, Error> {
    let chip = Pow5Chip::construct(config.clone());
    let hasher = Hash::<_, _, P128Pow5T3, ConstantLength<L>, WIDTH, RATE>::init(
        chip,
        layouter.namespace(|| "poseidon init"),
    )?;
    hasher.hash(layouter.namespace(|| "poseidon"), message)
}

/// Configuration for one level of Merkle path ordering
///
/// Row layout: `node | sibling | bit | left | right`
#[derive(Clone, Debug)]
pub struct MerkleSwapConfig {
    node: Column<Advice>,
    sibling: Column<Advice>,
    bit: Column<Advice>,
    left: Column<Advice>,
    right: Column<Advice>,
    q_swap: Selector,
}

/// Orders the accumulated node and its sibling for hashing.
///
/// bit = 0: (left, right) = (node, sibling)
/// bit = 1: (left, right) = (sibling, node)
pub struct MerkleSwapChip {
    config: MerkleSwapConfig,
}

impl MerkleSwapChip {
    pub fn configure(meta: &mut ConstraintSystem<Fp>, advices: [Column<Advice>; 5]) -> MerkleSwapConfig {
        let [node, sibling, bit, left, right] = advices;
        let q_swap = meta.selector();

        meta.create_gate("merkle swap", |meta| {
            let q = meta.query_selector(q_swap);
            let node = meta.query_advice(node, Rotation::cur());
            let sibling = meta.query_advice(sibling, Rotation::cur());
            let bit = meta.query_advice(bit, Rotation::cur());
            let left = meta.query_advice(left, Rotation::cur());
            let right = meta.query_advice(right, Rotation::cur());

            let one = Expression::Constant(Fp::one());

            Constraints::with_selector(
                q,
                [
                    // bit * (1 - bit) = 0
                    ("bit boolean", bit.clone() * (one - bit.clone())),
                    // left = node + bit * (sibling - node)
                    (
                        "left select",
                        left - (node.clone() + bit.clone() * (sibling.clone() - node.clone())),
                    ),
                    // right = sibling + bit * (node - sibling)
                    (
                        "right select",
                        right - (sibling.clone() + bit * (node - sibling)),
                    ),
                ],
            )
        });

        MerkleSwapConfig {
            node,
            sibling,
            bit,
            left,
            right,
            q_swap,
        }
    }

    pub fn construct(config: MerkleSwapConfig) -> Self {
        Self { config }
    }

    /// Returns `(left, right)` for the next hash
    pub fn swap(
        &self,
        mut layouter: impl Layouter<Fp>,
        node: &AssignedCell<Fp, Fp>,
        sibling: Value<Fp>,
        bit: Value<Fp>,
    ) -> Result<(AssignedCell<Fp, Fp>, AssignedCell<Fp, Fp>), Error> {
        let config = &self.config;
        layouter.assign_region(
            || "merkle swap",
            |mut region| {
                config.q_swap.enable(&mut region, 0)?;

                let node = node.copy_advice(|| "node", &mut region, config.node, 0)?;
                region.assign_advice(|| "sibling", config.sibling, 0, || sibling)?;
                region.assign_advice(|| "bit", config.bit, 0, || bit)?;

                let node = node.value().copied();
                let left = region.assign_advice(
                    || "left",
                    config.left,
                    0,
                    || node + bit * (sibling - node),
                )?;
                let right = region.assign_advice(
                    || "right",
                    config.right,
                    0,
                    || sibling + bit * (node - sibling),
                )?;

                Ok((left, right))
            },
        )
    }
}

/// Configuration for the balance gate `a - b - c = 0`
#[derive(Clone, Debug)]
pub struct BalanceConfig {
    a: Column<Advice>,
    b: Column<Advice>,
    c: Column<Advice>,
    q_balance: Selector,
}

/// Enforces `a = b + c` over copied cells
pub struct BalanceChip {
    config: BalanceConfig,
}

impl BalanceChip {
    pub fn configure(
        meta: &mut ConstraintSystem<Fp>,
        a: Column<Advice>,
        b: Column<Advice>,
        c: Column<Advice>,
    ) -> BalanceConfig {
        let q_balance = meta.selector();

        meta.create_gate("balance", |meta| {
            let q = meta.query_selector(q_balance);
            let a = meta.query_advice(a, Rotation::cur());
            let b = meta.query_advice(b, Rotation::cur());
            let c = meta.query_advice(c, Rotation::cur());

            vec![q * (a - b - c)]
        });

        BalanceConfig { a, b, c, q_balance }
    }

    pub fn construct(config: BalanceConfig) -> Self {
        Self { config }
    }

    pub fn constrain(
        &self,
        mut layouter: impl Layouter<Fp>,
        a: &AssignedCell<Fp, Fp>,
        b: &AssignedCell<Fp, Fp>,
        c: &AssignedCell<Fp, Fp>,
    ) -> Result<(), Error> {
        let config = &self.config;
        layouter.assign_region(
            || "balance",
            |mut region| {
                config.q_balance.enable(&mut region, 0)?;
                a.copy_advice(|| "a", &mut region, config.a, 0)?;
                b.copy_advice(|| "b", &mut region, config.b, 0)?;
                c.copy_advice(|| "c", &mut region, config.c, 0)?;
                Ok(())
            },
        )
    }
}

/// Configuration for the running-sum range check
///
/// `z_0` is the checked value and `z_{i+1} = (z_i - b_i) / 2` with each
/// `b_i = z_i - 2 z_{i+1}` boolean. Pinning `z_n` to zero proves
/// `z_0 < 2^n`.
#[derive(Clone, Debug)]
pub struct RangeCheckConfig {
    z: Column<Advice>,
    q_range: Selector,
}

pub struct RangeCheckChip {
    config: RangeCheckConfig,
}

impl RangeCheckChip {
    pub fn configure(meta: &mut ConstraintSystem<Fp>, z: Column<Advice>) -> RangeCheckConfig {
        let q_range = meta.selector();

        meta.create_gate("range check bit", |meta| {
            let q = meta.query_selector(q_range);
            let z_cur = meta.query_advice(z, Rotation::cur());
            let z_next = meta.query_advice(z, Rotation::next());

            let bit = z_cur - z_next * Fp::from(2);
            let one = Expression::Constant(Fp::one());
            vec![q * bit.clone() * (one - bit)]
        });

        RangeCheckConfig { z, q_range }
    }

    pub fn construct(config: RangeCheckConfig) -> Self {
        Self { config }
    }

    /// Constrain `value < 2^num_bits`
    pub fn check(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: &AssignedCell<Fp, Fp>,
        num_bits: usize,
    ) -> Result<(), Error> {
        let config = &self.config;
        layouter.assign_region(
            || format!("range check {} bits", num_bits),
            |mut region| {
                let mut z = value.copy_advice(|| "z_0", &mut region, config.z, 0)?;

                for row in 0..num_bits {
                    config.q_range.enable(&mut region, row)?;
                    let next = z.value().map(|z| shift_right(*z));
                    z = region.assign_advice(
                        || format!("z_{}", row + 1),
                        config.z,
                        row + 1,
                        || next,
                    )?;
                }

                region.constrain_constant(z.cell(), Fp::zero())
            },
        )
    }
}

/// (z - lowest bit) / 2, exact on the integer representative of z
fn shift_right(z: Fp) -> Fp {
    let bit = if bool::from(z.is_odd()) {
        Fp::one()
    } else {
        Fp::zero()
    };
    (z - bit) * Fp::TWO_INV
}
