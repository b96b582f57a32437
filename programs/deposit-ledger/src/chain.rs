//! In-memory chain hosting one deposit contract
//!
//! Transactions run one at a time against a copy of the chain state. The
//! copy replaces the live state only if the whole transaction succeeded, so
//! a rejected transaction changes neither balances nor contract slots.

use ed25519_dalek::VerifyingKey;
use tracing::{info, warn};
use zkdeposit::Digest;

use crate::account::{Accounts, Address, Authorization};
use crate::config::LedgerConfig;
use crate::contract::{DepositContract, LedgerState};
use crate::error::{LedgerError, LedgerResult};
use crate::transaction::{Call, LedgerEvent, Receipt, Signers, Transaction};

#[derive(Debug, Clone, Default)]
struct ChainState {
    accounts: Accounts,
    contract: Option<DepositContract>,
}

impl ChainState {
    /// Account whose nonce a call consumes
    fn origin(&self, call: &Call) -> LedgerResult<Address> {
        match call {
            Call::Deploy { contract, .. } => Ok(Address::of(contract)),
            Call::Init { .. } => self
                .contract
                .as_ref()
                .map(DepositContract::address)
                .ok_or(LedgerError::NotDeployed),
            Call::DepositBase { sender, .. } => Ok(*sender),
            Call::Transfer { from, .. } => Ok(*from),
        }
    }

    fn execute(&mut self, tx: &Transaction, config: &LedgerConfig) -> LedgerResult<LedgerEvent> {
        let signers = tx.signers()?;
        let origin = self.origin(tx.call())?;
        self.accounts.check_nonce(&origin, tx.nonce())?;

        let event = self.apply(tx, &signers, config)?;
        self.accounts.bump_nonce(origin);
        Ok(event)
    }

    fn apply(
        &mut self,
        tx: &Transaction,
        signers: &Signers,
        config: &LedgerConfig,
    ) -> LedgerResult<LedgerEvent> {
        match tx.call() {
            Call::Deploy {
                contract,
                verification_key,
            } => {
                if self.contract.is_some() {
                    return Err(LedgerError::AlreadyDeployed);
                }
                let address = Address::of(contract);
                signers.require(&address, "contract")?;
                self.contract = Some(DepositContract::deploy(
                    &mut self.accounts,
                    address,
                    verification_key.clone(),
                    config.clone(),
                )?);
                Ok(LedgerEvent::Deployed { contract: address })
            }
            Call::Init { admin } => {
                let contract = self.contract.as_mut().ok_or(LedgerError::NotDeployed)?;
                let root = contract.init(&self.accounts, signers, *admin)?;
                Ok(LedgerEvent::Initialized {
                    admin: Address::of(admin),
                    root,
                })
            }
            Call::DepositBase {
                sender,
                witness,
                proof,
            } => {
                let contract = self.contract.as_mut().ok_or(LedgerError::NotDeployed)?;
                let event = contract.deposit_base(
                    &mut self.accounts,
                    signers,
                    tx.root_precondition(),
                    *sender,
                    witness,
                    proof,
                )?;
                Ok(LedgerEvent::Deposit(event))
            }
            Call::Transfer { from, to, amount } => {
                signers.require(from, "sender")?;
                self.accounts
                    .transfer(*from, *to, *amount, Authorization::Signature)?;
                Ok(LedgerEvent::Transfer {
                    from: *from,
                    to: *to,
                    amount: *amount,
                })
            }
        }
    }
}

/// Local chain with balances and a single deposit contract
#[derive(Debug, Clone, Default)]
pub struct LocalChain {
    config: LedgerConfig,
    state: ChainState,
    height: u64,
}

impl LocalChain {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            state: ChainState::default(),
            height: 0,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Number of accepted transactions
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Genesis funding for test accounts
    pub fn fund(&mut self, address: Address, amount: u64) -> LedgerResult<()> {
        self.state.accounts.credit(address, amount)?;
        info!(account = %address, amount, "account funded");
        Ok(())
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.state.accounts.balance(address)
    }

    pub fn contract(&self) -> Option<&DepositContract> {
        self.state.contract.as_ref()
    }

    pub fn contract_address(&self) -> Option<Address> {
        self.contract().map(DepositContract::address)
    }

    /// Contract slots, if deployed
    pub fn ledger_state(&self) -> Option<&LedgerState> {
        self.contract().map(DepositContract::state)
    }

    /// Nonce the next transaction from `address` must carry
    pub fn nonce(&self, address: &Address) -> u64 {
        self.state.accounts.nonce(address)
    }

    pub fn m_root(&self) -> Option<Digest> {
        self.ledger_state().and_then(|s| s.m_root)
    }

    pub fn admin_public_key(&self) -> Option<VerifyingKey> {
        self.ledger_state().and_then(|s| s.admin_public_key)
    }

    /// Apply a transaction atomically
    pub fn submit(&mut self, tx: Transaction) -> LedgerResult<Receipt> {
        let mut next = self.state.clone();
        match next.execute(&tx, &self.config) {
            Ok(event) => {
                self.state = next;
                self.height += 1;
                let receipt = Receipt {
                    tx_hash: tx.digest(),
                    event,
                };
                info!(
                    call = tx.call().name(),
                    tx = %hex::encode(&receipt.tx_hash[..8]),
                    nonce = tx.nonce(),
                    height = self.height,
                    "transaction accepted"
                );
                if let LedgerEvent::Deposit(deposit) = &receipt.event {
                    info!(
                        sender = %deposit.sender,
                        pre_root = %deposit.pre_root,
                        pos_root = %deposit.pos_root,
                        amount = deposit.amount,
                        "deposit accepted"
                    );
                }
                Ok(receipt)
            }
            Err(err) => {
                warn!(call = tx.call().name(), error = %err, "transaction rejected");
                Err(err)
            }
        }
    }
}
