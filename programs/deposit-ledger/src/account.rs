//! Accounts, balances and permissions

use std::collections::HashMap;
use std::fmt;

use ed25519_dalek::VerifyingKey;
use tracing::debug;
use zkdeposit_prover::hash::keccak_hash;

use crate::error::{LedgerError, LedgerResult};

const ADDRESS_DOMAIN: &[u8] = b"zkdeposit/address";

/// Account address (32 bytes, keccak of the ed25519 public key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 32]);

impl Address {
    pub fn of(key: &VerifyingKey) -> Self {
        Self(keccak_hash(&[ADDRESS_DOMAIN, key.as_bytes()]))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<&VerifyingKey> for Address {
    fn from(key: &VerifyingKey) -> Self {
        Self::of(key)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form; logs only need to tell accounts apart
        write!(f, "0x{}", hex::encode(&self.0[..6]))
    }
}

/// How an account update was authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// Signed by the account's key
    Signature,
    /// Produced by a contract method that verified a proof
    Proof,
}

/// Authorization an account demands for one kind of update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequired {
    None,
    Signature,
    Proof,
    ProofOrSignature,
    Impossible,
}

impl AuthRequired {
    pub fn allows(self, auth: Authorization) -> bool {
        match self {
            AuthRequired::None | AuthRequired::ProofOrSignature => true,
            AuthRequired::Signature => auth == Authorization::Signature,
            AuthRequired::Proof => auth == Authorization::Proof,
            AuthRequired::Impossible => false,
        }
    }
}

/// Per-account permission table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    /// Writing contract state
    pub edit_state: AuthRequired,
    /// Moving funds out of the account
    pub send: AuthRequired,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            edit_state: AuthRequired::Signature,
            send: AuthRequired::Signature,
        }
    }
}

impl Permissions {
    /// Table installed by the deposit contract on deploy: state edits by
    /// proof or signature, outgoing funds only by proof.
    pub fn deposit_contract() -> Self {
        Self {
            edit_state: AuthRequired::ProofOrSignature,
            send: AuthRequired::Proof,
        }
    }

    pub(crate) fn require_edit_state(&self, auth: Authorization) -> LedgerResult<()> {
        if !self.edit_state.allows(auth) {
            return Err(LedgerError::unauthorized(format!(
                "edit_state requires {:?}, got {:?}",
                self.edit_state, auth
            )));
        }
        Ok(())
    }

    pub(crate) fn require_send(&self, auth: Authorization) -> LedgerResult<()> {
        if !self.send.allows(auth) {
            return Err(LedgerError::unauthorized(format!(
                "send requires {:?}, got {:?}",
                self.send, auth
            )));
        }
        Ok(())
    }
}

/// Balances, permissions and transaction counters of every known account
#[derive(Debug, Clone, Default)]
pub struct Accounts {
    balances: HashMap<Address, u64>,
    permissions: HashMap<Address, Permissions>,
    nonces: HashMap<Address, u64>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.balances.contains_key(address)
    }

    /// Balance of an account; unknown accounts hold nothing
    pub fn balance(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn permissions(&self, address: &Address) -> Permissions {
        self.permissions.get(address).copied().unwrap_or_default()
    }

    /// Nonce the next transaction originating from `address` must carry
    pub fn nonce(&self, address: &Address) -> u64 {
        self.nonces.get(address).copied().unwrap_or(0)
    }

    pub(crate) fn check_nonce(&self, address: &Address, found: u64) -> LedgerResult<()> {
        let expected = self.nonce(address);
        if found != expected {
            return Err(LedgerError::InvalidNonce { expected, found });
        }
        Ok(())
    }

    pub(crate) fn bump_nonce(&mut self, address: Address) {
        *self.nonces.entry(address).or_insert(0) += 1;
    }

    pub(crate) fn set_permissions(&mut self, address: Address, permissions: Permissions) {
        self.balances.entry(address).or_insert(0);
        self.permissions.insert(address, permissions);
    }

    /// Mint into an account, creating it if needed
    pub fn credit(&mut self, address: Address, amount: u64) -> LedgerResult<()> {
        let balance = self.balances.entry(address).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(address))?;
        Ok(())
    }

    /// Move funds, checking the sender's `send` permission against `auth`
    pub(crate) fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: u64,
        auth: Authorization,
    ) -> LedgerResult<()> {
        if !self.contains(&from) {
            return Err(LedgerError::UnknownAccount(from));
        }
        self.permissions(&from).require_send(auth)?;

        let available = self.balance(&from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        self.balances.insert(from, available - amount);
        self.credit(to, amount)?;
        debug!(%from, %to, amount, "transfer applied");
        Ok(())
    }
}
