use zkdeposit::TREE_HEIGHT;

/// Fixed amount pulled from the sender by every deposit
pub const DEPOSIT_AMOUNT: u64 = 1_000_000_000;

/// Ledger parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Height of the committed tree; must match the deployed verification key
    pub tree_height: usize,
    /// Amount transferred to the contract per deposit
    pub deposit_amount: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tree_height: TREE_HEIGHT,
            deposit_amount: DEPOSIT_AMOUNT,
        }
    }
}

impl LedgerConfig {
    pub fn with_height(mut self, tree_height: usize) -> Self {
        self.tree_height = tree_height;
        self
    }
}
