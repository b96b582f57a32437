//! Deposit ledger
//!
//! A contract holding one Merkle root and accepting fixed-size deposits,
//! each gated by a zkdeposit transition proof, plus the in-memory chain
//! ([`LocalChain`]) that carries accounts, signatures and balances.
//!
//! # Operations
//!
//! - `deploy` - install the contract and its permission table
//! - `init` - record the admin key and the empty-tree root, once
//! - `deposit_base` - verify a proof, check it against the stored root,
//!   pull [`DEPOSIT_AMOUNT`] from the sender, advance the root

pub mod account;
pub mod chain;
pub mod config;
pub mod contract;
pub mod error;
pub mod transaction;

pub use account::{Accounts, Address, AuthRequired, Authorization, Permissions};
pub use chain::LocalChain;
pub use config::{LedgerConfig, DEPOSIT_AMOUNT};
pub use contract::{DepositContract, DepositEvent, LedgerState};
pub use error::{LedgerError, LedgerResult};
pub use transaction::{Call, LedgerEvent, Receipt, Signers, Transaction, TxSignature};
