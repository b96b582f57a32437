//! Local end-to-end run: deploy, init, fund, deposit, then replay

use std::error::Error;

use deposit_ledger::{Address, Call, LedgerConfig, LedgerError, LocalChain, Transaction, DEPOSIT_AMOUNT};
use ed25519_dalek::SigningKey;
use tracing::info;
use zkdeposit::{DepositProgram, MerkleTree, ProgramConfig, TransitionInput, SET};

fn random_key() -> SigningKey {
    SigningKey::from_bytes(&rand::random::<[u8; 32]>())
}

pub fn run(height: usize, deposits: u64) -> Result<(), Box<dyn Error>> {
    println!("🧾 zkdeposit - local ledger simulation\n");

    let program = DepositProgram::compile(ProgramConfig::default().with_height(height))?;
    let mut chain = LocalChain::new(LedgerConfig::default().with_height(height));
    let mut tree = MerkleTree::new(height)?;

    let contract_key = random_key();
    let admin_key = random_key();
    let sender_key = random_key();
    let sender = Address::of(&sender_key.verifying_key());

    chain.submit(
        Transaction::new(Call::Deploy {
            contract: contract_key.verifying_key(),
            verification_key: program.verification_key().clone(),
        })
        .sign(&contract_key),
    )?;
    let contract = chain.contract_address().ok_or(LedgerError::NotDeployed)?;
    chain.submit(
        Transaction::new(Call::init(&admin_key))
            .with_nonce(chain.nonce(&contract))
            .sign(&contract_key),
    )?;

    chain.fund(sender, (deposits + 1) * DEPOSIT_AMOUNT)?;
    println!("   Contract: {}", contract.to_hex());
    println!("   Sender:   {}", sender.to_hex());
    println!("   Root:     {}\n", tree.root());

    let mut first = None;
    for index in 0..deposits {
        let witness = tree.get_witness(index)?;
        let input = TransitionInput::from_witness(&witness);
        let proof = program.create_deposit_proof(&input, &witness)?;
        info!(index, bytes = proof.to_bytes().len(), "submitting deposit");

        if first.is_none() {
            first = Some((witness.clone(), proof.clone()));
        }
        chain.submit(
            Transaction::new(Call::DepositBase {
                sender,
                witness,
                proof,
            })
            .with_nonce(chain.nonce(&sender))
            .sign(&sender_key),
        )?;
        tree.set_leaf(index, SET)?;

        println!("   ✅ deposit #{index}: {} -> {}", input.pre_root, input.pos_root);
    }

    if let Some((witness, proof)) = first {
        // fresh nonce, so only the root check stands in the way
        let replay = Transaction::new(Call::DepositBase {
            sender,
            witness,
            proof,
        })
        .with_nonce(chain.nonce(&sender))
        .sign(&sender_key);
        match chain.submit(replay) {
            Err(err @ LedgerError::RootMismatch { .. }) => {
                println!("\n   ❌ replay of deposit #0 rejected: {err}")
            }
            other => return Err(format!("replay was not rejected as stale: {:?}", other).into()),
        }
    }

    println!("\n   Root:             {}", chain.m_root().ok_or(LedgerError::NotInitialized)?);
    println!("   Contract balance: {}", chain.balance(&contract));
    println!("   Sender balance:   {}", chain.balance(&sender));
    Ok(())
}
