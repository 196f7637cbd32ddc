//! Proving and verifying with Halo 2
//!
//! IPA commitments over Vesta, so no trusted setup: parameters are derived
//! deterministically from `k`, and proving and verifying keys built on two
//! machines for the same depth agree.
//!
//! A witness that violates the relation does not make `create_proof` fail;
//! it yields a proof that cannot verify. [`Proof::create`] therefore checks
//! every fresh proof against its own key and reports any failure as
//! [`ProofError::InvalidWitness`], without naming the broken constraint.

use halo2_proofs::{
    pasta::{vesta, Fp},
    plonk::{self, create_proof, keygen_pk, keygen_vk, verify_proof, SingleVerifier},
    poly::commitment::Params,
    transcript::{Blake2bRead, Blake2bWrite, Challenge255},
};
use rand::{rngs::OsRng, RngCore};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::circuit::{PublicInputs, TransactionCircuit, TransactionWitness};
use crate::constants::MERKLE_DEPTH;
use crate::error::ProofError;

/// Proving key for the transaction circuit over a tree of depth `DEPTH`
#[derive(Debug)]
pub struct ProvingKey<const DEPTH: usize = MERKLE_DEPTH> {
    params: Params<vesta::Affine>,
    pk: plonk::ProvingKey<vesta::Affine>,
}

impl<const DEPTH: usize> ProvingKey<DEPTH> {
    /// Build the proving key for circuits of `2^k` rows
    pub fn build(k: u32) -> Result<Self, ProofError> {
        debug!(k, depth = DEPTH, "building proving key");
        let params = Params::new(k);
        let circuit = TransactionCircuit::<DEPTH>::default();

        let vk = keygen_vk(&params, &circuit).map_err(ProofError::Setup)?;
        let pk = keygen_pk(&params, vk, &circuit).map_err(ProofError::Setup)?;

        Ok(Self { params, pk })
    }

    /// The verifying key matching this proving key
    pub fn verifying_key(&self) -> VerifyingKey<DEPTH> {
        VerifyingKey {
            params: self.params.clone(),
            vk: self.pk.get_vk().clone(),
        }
    }
}

/// Verifying key for the transaction circuit over a tree of depth `DEPTH`
#[derive(Clone, Debug)]
pub struct VerifyingKey<const DEPTH: usize = MERKLE_DEPTH> {
    params: Params<vesta::Affine>,
    vk: plonk::VerifyingKey<vesta::Affine>,
}

impl<const DEPTH: usize> VerifyingKey<DEPTH> {
    /// Build the verifying key for circuits of `2^k` rows
    pub fn build(k: u32) -> Result<Self, ProofError> {
        debug!(k, depth = DEPTH, "building verifying key");
        let params = Params::new(k);
        let circuit = TransactionCircuit::<DEPTH>::default();

        let vk = keygen_vk(&params, &circuit).map_err(ProofError::Setup)?;

        Ok(Self { params, vk })
    }
}

fn check(
    params: &Params<vesta::Affine>,
    vk: &plonk::VerifyingKey<vesta::Affine>,
    proof: &[u8],
    instance: &[Fp],
) -> Result<(), plonk::Error> {
    let strategy = SingleVerifier::new(params);
    let mut transcript = Blake2bRead::<_, vesta::Affine, Challenge255<_>>::init(proof);
    verify_proof(params, vk, strategy, &[&[instance]], &mut transcript)
}

/// A serialized transaction proof
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof(Vec<u8>);

impl Proof {
    /// Prove that `witness` satisfies the relation for `public`
    pub fn create<const DEPTH: usize, R: RngCore>(
        pk: &ProvingKey<DEPTH>,
        witness: &TransactionWitness<DEPTH>,
        public: &PublicInputs,
        mut rng: R,
    ) -> Result<Self, ProofError> {
        let circuit = TransactionCircuit::new(witness);
        let instance = public.to_fields();

        let mut transcript = Blake2bWrite::<_, vesta::Affine, Challenge255<_>>::init(vec![]);
        create_proof(
            &pk.params,
            &pk.pk,
            &[circuit],
            &[&[&instance[..]]],
            &mut rng,
            &mut transcript,
        )
        .map_err(|_| reject())?;
        let proof = transcript.finalize();

        check(&pk.params, pk.pk.get_vk(), &proof, &instance).map_err(|_| reject())?;

        info!(size = proof.len(), "created transaction proof");
        Ok(Self(proof))
    }

    /// Prove independent transactions in parallel
    ///
    /// Each proof owns its witness; only the proving key is shared.
    pub fn create_batch<const DEPTH: usize>(
        pk: &ProvingKey<DEPTH>,
        transactions: &[(TransactionWitness<DEPTH>, PublicInputs)],
    ) -> Vec<Result<Self, ProofError>> {
        debug!(count = transactions.len(), "proving batch");
        transactions
            .par_iter()
            .map(|(witness, public)| Self::create(pk, witness, public, OsRng))
            .collect()
    }

    /// Verify this proof against the public inputs
    pub fn verify<const DEPTH: usize>(
        &self,
        vk: &VerifyingKey<DEPTH>,
        public: &PublicInputs,
    ) -> Result<(), ProofError> {
        check(&vk.params, &vk.vk, &self.0, &public.to_fields()).map_err(|_| {
            warn!("transaction proof rejected");
            ProofError::VerificationFailed
        })?;

        info!("verified transaction proof");
        Ok(())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

fn reject() -> ProofError {
    warn!("proof generation failed: witness invalid");
    ProofError::InvalidWitness
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::Blinding;
    use crate::constants::K;
    use crate::keys::SecretKey;
    use crate::merkle::MerkleTree;

    const D: usize = 2;

    fn witness(old_amount: u64, amount_sent: u64) -> TransactionWitness<D> {
        let sk = SecretKey::random(&mut OsRng);
        let mut tree = MerkleTree::<D>::new();
        let position = tree.append(sk.public_key()).unwrap();
        let path = tree.witness(position).unwrap();

        TransactionWitness::with_split(
            sk,
            old_amount,
            amount_sent,
            Blinding::random(&mut OsRng),
            path,
            &mut OsRng,
        )
    }

    #[test]
    fn test_prove_and_verify() {
        let pk = ProvingKey::<D>::build(K).unwrap();
        let vk = VerifyingKey::<D>::build(K).unwrap();

        let honest = witness(1000, 250);
        let public = honest.public_inputs();
        let proof = Proof::create(&pk, &honest, &public, OsRng).unwrap();

        // Keys built independently agree
        assert!(proof.verify(&vk, &public).is_ok());
        assert!(proof.verify(&pk.verifying_key(), &public).is_ok());

        // Wrong public inputs
        let mut tampered = public;
        tampered.merkle_root = witness(1000, 250).public_inputs().merkle_root;
        assert!(matches!(
            proof.verify(&vk, &tampered),
            Err(ProofError::VerificationFailed)
        ));

        // Corrupted proof bytes
        let mut bytes = proof.as_bytes().to_vec();
        bytes[0] ^= 1;
        assert!(Proof::from_bytes(bytes).verify(&vk, &public).is_err());

        // Batch: one honest transaction, one unconserved
        let mut unconserved = witness(500, 100);
        unconserved.r_new = unconserved.r_new + Blinding::from(1);
        let full_send = witness(80, 80);
        let batch = vec![
            (full_send.clone(), full_send.public_inputs()),
            (unconserved.clone(), unconserved.public_inputs()),
        ];
        let results = Proof::create_batch(&pk, &batch);

        assert_eq!(results.len(), 2);
        let proof = results[0].as_ref().unwrap();
        assert!(proof.verify(&vk, &full_send.public_inputs()).is_ok());
        assert!(matches!(results[1], Err(ProofError::InvalidWitness)));
    }
}
