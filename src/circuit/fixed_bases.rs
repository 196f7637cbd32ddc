//! Fixed bases of the value commitment for the ECC chip
//!
//! The ECC chip multiplies fixed points window by window (3-bit windows) and
//! needs, for every window, a `z` and eight `u` values such that `z + y` is a
//! square and `z - y` is not. Those tables are found once per generator and
//! cached for the life of the process.

use ff::PrimeField;
use halo2_gadgets::ecc::{
    chip::{
        find_zs_and_us, BaseFieldElem, FixedPoint, FullScalar, ShortScalar, H, NUM_WINDOWS,
        NUM_WINDOWS_SHORT,
    },
    FixedPoints,
};
use halo2_proofs::pasta::{pallas, Fp};
use std::sync::OnceLock;

use crate::commitment::generators;

type WindowTable = Vec<(u64, [Fp; H])>;

/// The two value commitment generators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueCommitBase {
    /// G, multiplied by the amount
    Value,
    /// H, multiplied by the blinding factor
    Blinding,
}

impl ValueCommitBase {
    fn point(&self) -> pallas::Affine {
        let gens = generators();
        match self {
            Self::Value => gens.g,
            Self::Blinding => gens.h,
        }
    }

    /// Tables for 85 windows, shared by base field and full-width scalars
    fn full_table(&self) -> &'static WindowTable {
        static VALUE: OnceLock<WindowTable> = OnceLock::new();
        static BLINDING: OnceLock<WindowTable> = OnceLock::new();
        let cell = match self {
            Self::Value => &VALUE,
            Self::Blinding => &BLINDING,
        };
        cell.get_or_init(|| {
            find_zs_and_us(self.point(), NUM_WINDOWS)
                .expect("hash-to-curve generators admit window tables")
        })
    }

    fn short_table(&self) -> &'static WindowTable {
        static VALUE: OnceLock<WindowTable> = OnceLock::new();
        static BLINDING: OnceLock<WindowTable> = OnceLock::new();
        let cell = match self {
            Self::Value => &VALUE,
            Self::Blinding => &BLINDING,
        };
        cell.get_or_init(|| {
            find_zs_and_us(self.point(), NUM_WINDOWS_SHORT)
                .expect("hash-to-curve generators admit window tables")
        })
    }
}

fn us(table: &WindowTable) -> Vec<[[u8; 32]; H]> {
    table.iter().map(|(_, us)| us.map(|u| u.to_repr())).collect()
}

fn zs(table: &WindowTable) -> Vec<u64> {
    table.iter().map(|(z, _)| *z).collect()
}

impl FixedPoint<pallas::Affine> for ValueCommitBase {
    type FixedScalarKind = BaseFieldElem;

    fn generator(&self) -> pallas::Affine {
        self.point()
    }

    fn u(&self) -> Vec<[[u8; 32]; H]> {
        us(self.full_table())
    }

    fn z(&self) -> Vec<u64> {
        zs(self.full_table())
    }
}

/// A generator multiplied by a full-width scalar field element
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FullWidth(pub ValueCommitBase);

impl FixedPoint<pallas::Affine> for FullWidth {
    type FixedScalarKind = FullScalar;

    fn generator(&self) -> pallas::Affine {
        self.0.point()
    }

    fn u(&self) -> Vec<[[u8; 32]; H]> {
        us(self.0.full_table())
    }

    fn z(&self) -> Vec<u64> {
        zs(self.0.full_table())
    }
}

/// A generator multiplied by a signed 64-bit short scalar
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Short(pub ValueCommitBase);

impl FixedPoint<pallas::Affine> for Short {
    type FixedScalarKind = ShortScalar;

    fn generator(&self) -> pallas::Affine {
        self.0.point()
    }

    fn u(&self) -> Vec<[[u8; 32]; H]> {
        us(self.0.short_table())
    }

    fn z(&self) -> Vec<u64> {
        zs(self.0.short_table())
    }
}

/// Fixed bases known to the transaction circuit's ECC chip
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitmentBases;

impl FixedPoints<pallas::Affine> for CommitmentBases {
    type FullScalar = FullWidth;
    type ShortScalar = Short;
    type Base = ValueCommitBase;
}
