//! Signed transactions and their receipts

use std::collections::HashSet;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use zkdeposit::{DepositProof, Digest, MerkleWitness, VerificationKey};
use zkdeposit_prover::hash::{keccak_hash, Hash32};

use crate::account::Address;
use crate::contract::DepositEvent;
use crate::error::{LedgerError, LedgerResult};

const TX_DOMAIN: &[u8] = b"zkdeposit/tx/v2";

/// A contract or account operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Install the deposit contract at the address of `contract`
    Deploy {
        contract: VerifyingKey,
        verification_key: VerificationKey,
    },
    /// One-time setup: record the admin key and the empty-tree root
    Init { admin: VerifyingKey },
    /// Pull the deposit amount from `sender` and advance the root
    DepositBase {
        sender: Address,
        witness: MerkleWitness,
        proof: DepositProof,
    },
    /// Plain balance transfer
    Transfer { from: Address, to: Address, amount: u64 },
}

impl Call {
    /// `Init` for the admin behind `admin_key`. Only the public half is sent.
    pub fn init(admin_key: &SigningKey) -> Self {
        Call::Init {
            admin: admin_key.verifying_key(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Call::Deploy { .. } => "deploy",
            Call::Init { .. } => "init",
            Call::DepositBase { .. } => "deposit_base",
            Call::Transfer { .. } => "transfer",
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Call::Deploy {
                contract,
                verification_key,
            } => {
                out.push(0);
                out.extend_from_slice(contract.as_bytes());
                out.extend_from_slice(&(verification_key.tree_height as u32).to_le_bytes());
                out.extend_from_slice(&(verification_key.num_queries as u32).to_le_bytes());
                out.extend_from_slice(&(verification_key.seed_domain.len() as u32).to_le_bytes());
                out.extend_from_slice(&verification_key.seed_domain);
                out.extend_from_slice(&verification_key.circuit_digest);
            }
            Call::Init { admin } => {
                out.push(1);
                out.extend_from_slice(admin.as_bytes());
            }
            Call::DepositBase {
                sender,
                witness,
                proof,
            } => {
                out.push(2);
                out.extend_from_slice(sender.as_bytes());
                out.extend_from_slice(&(witness.height() as u32).to_le_bytes());
                for step in witness.steps() {
                    out.extend_from_slice(&step.sibling.to_bytes());
                    out.push(step.is_left as u8);
                }
                out.extend_from_slice(&proof.to_bytes());
            }
            Call::Transfer { from, to, amount } => {
                out.push(3);
                out.extend_from_slice(from.as_bytes());
                out.extend_from_slice(to.as_bytes());
                out.extend_from_slice(&amount.to_le_bytes());
            }
        }
    }
}

/// One ed25519 signature over a transaction digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSignature {
    pub signer: VerifyingKey,
    pub signature: Signature,
}

/// A call plus the signatures authorizing it
///
/// The nonce must equal the current nonce of the account the call
/// originates from; accepting the transaction increments it, so a signed
/// transaction runs at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    call: Call,
    nonce: u64,
    root_precondition: Option<Digest>,
    signatures: Vec<TxSignature>,
}

impl Transaction {
    pub fn new(call: Call) -> Self {
        Self {
            call,
            nonce: 0,
            root_precondition: None,
            signatures: Vec::new(),
        }
    }

    /// Part of the signed digest, so set it before signing.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Require the stored root to still be `root` when the transaction runs.
    /// Part of the signed digest, so set it before signing.
    pub fn with_root_precondition(mut self, root: Digest) -> Self {
        self.root_precondition = Some(root);
        self
    }

    pub fn call(&self) -> &Call {
        &self.call
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn root_precondition(&self) -> Option<Digest> {
        self.root_precondition
    }

    pub fn signatures(&self) -> &[TxSignature] {
        &self.signatures
    }

    /// Digest every signature commits to
    pub fn digest(&self) -> Hash32 {
        let mut body = Vec::new();
        self.call.encode(&mut body);
        body.extend_from_slice(&self.nonce.to_le_bytes());
        match self.root_precondition {
            Some(root) => {
                body.push(1);
                body.extend_from_slice(&root.to_bytes());
            }
            None => body.push(0),
        }
        keccak_hash(&[TX_DOMAIN, &body])
    }

    /// Add a signature by `key`
    pub fn sign(mut self, key: &SigningKey) -> Self {
        let signature = key.sign(&self.digest());
        self.signatures.push(TxSignature {
            signer: key.verifying_key(),
            signature,
        });
        self
    }

    /// Check every attached signature and collect the signing addresses.
    /// A single bad signature rejects the whole transaction.
    pub fn signers(&self) -> LedgerResult<Signers> {
        let digest = self.digest();
        let mut addresses = HashSet::with_capacity(self.signatures.len());
        for sig in &self.signatures {
            sig.signer.verify(&digest, &sig.signature).map_err(|e| {
                LedgerError::unauthorized(format!("bad signature from {}: {}", Address::of(&sig.signer), e))
            })?;
            addresses.insert(Address::of(&sig.signer));
        }
        Ok(Signers(addresses))
    }
}

/// Addresses whose signatures on a transaction checked out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signers(HashSet<Address>);

impl Signers {
    pub fn contains(&self, address: &Address) -> bool {
        self.0.contains(address)
    }

    /// Fail with `AuthorizationError` unless `address` signed
    pub fn require(&self, address: &Address, role: &str) -> LedgerResult<()> {
        if !self.contains(address) {
            return Err(LedgerError::unauthorized(format!(
                "missing {} signature from {}",
                role, address
            )));
        }
        Ok(())
    }
}

/// Effect of an accepted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    Deployed { contract: Address },
    Initialized { admin: Address, root: Digest },
    Deposit(DepositEvent),
    Transfer { from: Address, to: Address, amount: u64 },
}

/// Receipt for an accepted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: Hash32,
    pub event: LedgerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn transfer() -> Call {
        Call::Transfer {
            from: Address::of(&key(1).verifying_key()),
            to: Address::of(&key(2).verifying_key()),
            amount: 5,
        }
    }

    #[test]
    fn test_signers() {
        let tx = Transaction::new(transfer()).sign(&key(1)).sign(&key(3));
        let signers = tx.signers().unwrap();

        assert!(signers.contains(&Address::of(&key(1).verifying_key())));
        assert!(signers.contains(&Address::of(&key(3).verifying_key())));
        assert!(signers
            .require(&Address::of(&key(2).verifying_key()), "recipient")
            .is_err());
    }

    #[test]
    fn test_digest_covers_precondition() {
        let plain = Transaction::new(transfer());
        let pinned = Transaction::new(transfer()).with_root_precondition(Digest::default());
        assert_ne!(plain.digest(), pinned.digest());
    }

    #[test]
    fn test_digest_covers_nonce() {
        let first = Transaction::new(transfer());
        let second = Transaction::new(transfer()).with_nonce(1);
        assert_eq!(first.nonce(), 0);
        assert_ne!(first.digest(), second.digest());

        // a signature for nonce 0 does not carry over to nonce 1
        let resigned = Transaction::new(transfer()).sign(&key(1)).with_nonce(1);
        assert!(matches!(resigned.signers(), Err(LedgerError::AuthorizationError(_))));
    }

    #[test]
    fn test_signature_invalidated_by_later_change() {
        let tx = Transaction::new(transfer())
            .sign(&key(1))
            .with_root_precondition(Digest::default());

        assert!(matches!(tx.signers(), Err(LedgerError::AuthorizationError(_))));
    }
}
