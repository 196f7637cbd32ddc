//! Value commitments
//!
//! A value commitment hides an amount behind a blinding factor:
//!
//! cv = [amount]G + [blinding]H
//!
//! G and H are independent Pallas points obtained by hashing to the curve,
//! so nobody knows a discrete log relation between them. The commitment is
//! additively homomorphic:
//!
//! Commit(a1, b1) + Commit(a2, b2) = Commit(a1 + a2, b1 + b2)
//!
//! which is what lets a spend split one commitment into two while the
//! blinding factors are conserved explicitly.
//!
//! Amounts and blindings are Pallas base field elements. They are applied to
//! the generators as integers in `[0, p)`; since p < q this never wraps in the
//! group, and it matches how the in-circuit fixed-base multiplication treats
//! a witnessed field element.

use ff::{Field, FromUniformBytes, PrimeField};
use group::{Curve, GroupEncoding};
use halo2_proofs::pasta::{pallas, Fp};
use pasta_curves::arithmetic::{Coordinates, CurveAffine, CurveExt};
use rand::{CryptoRng, RngCore};
use std::fmt;
use std::ops::Add;
use std::sync::OnceLock;

use crate::constants::domains;

/// The two fixed generators of the commitment scheme
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generators {
    /// Amount generator
    pub g: pallas::Affine,
    /// Blinding generator
    pub h: pallas::Affine,
}

/// Process-wide generators, derived once and shared read-only
pub fn generators() -> &'static Generators {
    static GENERATORS: OnceLock<Generators> = OnceLock::new();
    GENERATORS.get_or_init(|| {
        let hasher = pallas::Point::hash_to_curve(domains::VALUE_COMMIT);
        Generators {
            g: hasher(domains::VALUE_GENERATOR).to_affine(),
            h: hasher(domains::BLINDING_GENERATOR).to_affine(),
        }
    })
}

/// Reinterpret a base field element as a scalar with the same integer value.
pub(crate) fn base_to_scalar(x: &Fp) -> pallas::Scalar {
    let mut wide = [0u8; 64];
    wide[..32].copy_from_slice(&x.to_repr());
    pallas::Scalar::from_uniform_bytes(&wide)
}

/// Affine coordinates, with the identity encoded as (0, 0)
pub(crate) fn coordinates(point: &pallas::Affine) -> (Fp, Fp) {
    Option::<Coordinates<pallas::Affine>>::from(point.coordinates())
        .map(|c| (*c.x(), *c.y()))
        .unwrap_or((Fp::zero(), Fp::zero()))
}

/// Blinding factor of a value commitment
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Blinding {
    inner: Fp,
}

impl Blinding {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            inner: Fp::random(rng),
        }
    }

    pub fn from_field(f: Fp) -> Self {
        Self { inner: f }
    }

    pub fn to_field(&self) -> Fp {
        self.inner
    }

    /// Split into `(r_new, r_receiver)` with `r_new + r_receiver == self`
    pub fn split<R: RngCore + CryptoRng>(&self, rng: &mut R) -> (Blinding, Blinding) {
        let r_new = Blinding::random(rng);
        let r_receiver = Blinding {
            inner: self.inner - r_new.inner,
        };
        (r_new, r_receiver)
    }
}

impl From<u64> for Blinding {
    fn from(v: u64) -> Self {
        Self::from_field(Fp::from(v))
    }
}

impl Add for Blinding {
    type Output = Blinding;

    fn add(self, rhs: Blinding) -> Blinding {
        Blinding {
            inner: self.inner + rhs.inner,
        }
    }
}

impl fmt::Debug for Blinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blinding")
            .field("inner", &"[REDACTED]")
            .finish()
    }
}

/// A Pedersen value commitment (a Pallas point)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ValueCommitment {
    inner: pallas::Affine,
}

impl ValueCommitment {
    /// cv = [amount]G + [blinding]H
    pub fn commit(amount: Fp, blinding: &Blinding) -> Self {
        let gens = generators();
        let point = pallas::Point::from(gens.g) * base_to_scalar(&amount)
            + pallas::Point::from(gens.h) * base_to_scalar(&blinding.inner);
        Self {
            inner: point.to_affine(),
        }
    }

    pub fn to_affine(&self) -> pallas::Affine {
        self.inner
    }

    pub fn x(&self) -> Fp {
        coordinates(&self.inner).0
    }

    pub fn y(&self) -> Fp {
        coordinates(&self.inner).1
    }

    /// The X coordinate, which is all the relation exposes publicly
    pub fn extract(&self) -> ExtractedCommitment {
        ExtractedCommitment::from_field(self.x())
    }

    /// Compressed point encoding
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Option<Self> {
        Option::<pallas::Affine>::from(pallas::Affine::from_bytes(bytes)).map(|inner| Self { inner })
    }
}

impl Add for ValueCommitment {
    type Output = ValueCommitment;

    fn add(self, rhs: ValueCommitment) -> ValueCommitment {
        let sum = pallas::Point::from(self.inner) + pallas::Point::from(rhs.inner);
        ValueCommitment {
            inner: sum.to_affine(),
        }
    }
}

impl fmt::Debug for ValueCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "ValueCommitment({:02x}{:02x}...)", bytes[0], bytes[1])
    }
}

/// The X coordinate of a value commitment, as exposed to the verifier.
///
/// A point and its negation share an X coordinate, so a published value names
/// the pair `{C, -C}`. The relation itself is unaffected: the full point is
/// recomputed in-circuit from range-checked witnesses.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ExtractedCommitment {
    inner: Fp,
}

impl ExtractedCommitment {
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

impl fmt::Debug for ExtractedCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "ExtractedCommitment({:02x}{:02x}...)", bytes[0], bytes[1])
    }
}
