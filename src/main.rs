//! Shielded transfer demonstration
//!
//! 1. Alice sends part of her balance to Bob: a proof is created, verified,
//!    and its nullifier recorded so a replay is detected.
//! 2. Carol tries to send more than she holds: the subtraction wraps in the
//!    field, the range check fails, and no proof can be produced.
//!
//! Set `RUST_LOG=debug` for key building details.

use anyhow::{bail, Context, Result};
use rand::rngs::OsRng;
use tracing::info;

use shielded_transfer::{
    constants::K, Blinding, MerkleTree, NullifierSet, Proof, ProofError, ProvingKey, SecretKey,
    TransactionWitness,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(k = K, "building keys");
    let pk: ProvingKey = ProvingKey::build(K)?;
    let vk = pk.verifying_key();

    // ===== Setup: register spenders in the identity tree =====
    let alice = SecretKey::random(&mut OsRng);
    let carol = SecretKey::random(&mut OsRng);

    let mut tree: MerkleTree = MerkleTree::new();
    let alice_position = tree.append(alice.public_key())?;
    let carol_position = tree.append(carol.public_key())?;
    info!(size = tree.size(), root = ?tree.root(), "identity tree ready");

    let mut nullifiers = NullifierSet::new();

    // ===== Example 1: Alice sends 400 of 1000 to Bob =====
    let path = tree
        .witness(alice_position)
        .context("alice is in the tree")?;
    let witness = TransactionWitness::with_split(
        alice,
        1000,
        400,
        Blinding::random(&mut OsRng),
        path,
        &mut OsRng,
    );
    let public = witness.public_inputs();
    info!(
        nullifier = ?public.nullifier,
        new_sender = ?public.new_sender_commitment,
        receiver = ?public.receiver_commitment,
        "alice -> bob"
    );

    let proof = Proof::create(&pk, &witness, &public, OsRng)?;
    proof.verify(&vk, &public)?;

    if !nullifiers.insert(public.nullifier) {
        bail!("fresh nullifier already recorded");
    }
    // Replaying the same spend yields the same nullifier
    let replay = witness.public_inputs();
    info!(
        rejected = nullifiers.contains(&replay.nullifier),
        "replay of alice's spend"
    );

    // ===== Example 2: Carol sends 400 out of 300 =====
    let path = tree
        .witness(carol_position)
        .context("carol is in the tree")?;
    let overspend = TransactionWitness::with_split(
        carol,
        300,
        400,
        Blinding::random(&mut OsRng),
        path,
        &mut OsRng,
    );

    match Proof::create(&pk, &overspend, &overspend.public_inputs(), OsRng) {
        Err(ProofError::InvalidWitness) => info!("carol's overspend cannot be proven"),
        Err(e) => return Err(e.into()),
        Ok(_) => bail!("overspend produced a proof"),
    }

    info!(spent = nullifiers.len(), "done");
    Ok(())
}
