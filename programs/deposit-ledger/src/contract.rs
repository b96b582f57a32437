//! The deposit contract
//!
//! Two state slots: the admin public key and the current Merkle root. The
//! root only moves by accepting a proof whose pre-root equals it, so every
//! accepted post-root is the next required pre-root.

use ed25519_dalek::VerifyingKey;
use tracing::debug;
use zkdeposit::{empty_root, DepositProof, MerkleWitness, VerificationKey, Digest, UNSET};

use crate::account::{Accounts, Address, Authorization, Permissions};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::transaction::Signers;

/// Persisted contract state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    /// Set once by `init`, never reassigned
    pub admin_public_key: Option<VerifyingKey>,
    /// Root of the committed tree; `None` until `init`
    pub m_root: Option<Digest>,
}

/// Emitted by every accepted deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositEvent {
    pub sender: Address,
    pub pre_root: Digest,
    pub pos_root: Digest,
    pub amount: u64,
}

/// A deployed deposit contract
#[derive(Debug, Clone)]
pub struct DepositContract {
    address: Address,
    verification_key: VerificationKey,
    config: LedgerConfig,
    state: LedgerState,
}

impl DepositContract {
    /// Deploy at `address`, installing the contract's permission table.
    pub fn deploy(
        accounts: &mut Accounts,
        address: Address,
        verification_key: VerificationKey,
        config: LedgerConfig,
    ) -> LedgerResult<Self> {
        if verification_key.tree_height != config.tree_height {
            return Err(LedgerError::ConfigMismatch(format!(
                "key for height {}, ledger uses height {}",
                verification_key.tree_height, config.tree_height
            )));
        }
        verification_key
            .check()
            .map_err(|e| LedgerError::ConfigMismatch(e.to_string()))?;

        accounts.set_permissions(address, Permissions::deposit_contract());
        debug!(contract = %address, vk = %verification_key.id(), "contract deployed");
        Ok(Self {
            address,
            verification_key,
            config,
            state: LedgerState::default(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn verification_key(&self) -> &VerificationKey {
        &self.verification_key
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// One-time setup, authorized by the contract's own signature.
    pub fn init(
        &mut self,
        accounts: &Accounts,
        signers: &Signers,
        admin: VerifyingKey,
    ) -> LedgerResult<Digest> {
        signers.require(&self.address, "contract")?;
        accounts
            .permissions(&self.address)
            .require_edit_state(Authorization::Signature)?;
        if self.state.admin_public_key.is_some() || self.state.m_root.is_some() {
            return Err(LedgerError::AlreadyInitialized);
        }

        let root = empty_root(self.config.tree_height)
            .map_err(|e| LedgerError::ConfigMismatch(e.to_string()))?;
        self.state.admin_public_key = Some(admin);
        self.state.m_root = Some(root);
        Ok(root)
    }

    /// Accept one deposit.
    ///
    /// Checks run in a fixed order and the first failure aborts. Nothing is
    /// written before the last check passes.
    pub fn deposit_base(
        &mut self,
        accounts: &mut Accounts,
        signers: &Signers,
        root_precondition: Option<Digest>,
        sender: Address,
        witness: &MerkleWitness,
        proof: &DepositProof,
    ) -> LedgerResult<DepositEvent> {
        // 1. current root, pinned for the rest of the call
        let m_root = self.state.m_root.ok_or(LedgerError::NotInitialized)?;
        if let Some(expected) = root_precondition {
            if expected != m_root {
                return Err(LedgerError::StaleState {
                    expected,
                    found: m_root,
                });
            }
        }

        // 2. proof
        proof
            .verify(&self.verification_key)
            .map_err(|e| LedgerError::InvalidProof(e.to_string()))?;

        // 3. proof starts from the stored root
        if proof.pre_root() != m_root {
            return Err(LedgerError::RootMismatch {
                expected: m_root,
                found: proof.pre_root(),
            });
        }

        // 4. witness describes an unset slot of the stored tree
        if witness.calculate_root(UNSET) != m_root {
            return Err(LedgerError::WitnessMismatch);
        }

        // 5. pull the deposit, signed by the sender
        signers.require(&sender, "sender")?;
        accounts
            .permissions(&self.address)
            .require_edit_state(Authorization::Proof)?;
        accounts.transfer(
            sender,
            self.address,
            self.config.deposit_amount,
            Authorization::Signature,
        )?;

        // 6. advance
        self.state.m_root = Some(proof.pos_root());

        Ok(DepositEvent {
            sender,
            pre_root: m_root,
            pos_root: proof.pos_root(),
            amount: self.config.deposit_amount,
        })
    }
}
