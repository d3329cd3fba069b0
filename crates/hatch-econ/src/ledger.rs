use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The hatchery's cash balance. A negative balance is the bankruptcy signal,
/// not an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    cash: Decimal,
}

impl Ledger {
    pub fn new(cash: Decimal) -> Self {
        Self { cash }
    }

    pub fn credit(&mut self, amount: Decimal) {
        self.cash += amount;
    }

    /// Debit may exceed the balance.
    pub fn debit(&mut self, amount: Decimal) {
        self.cash -= amount;
    }

    pub fn balance(&self) -> Decimal {
        self.cash
    }

    pub fn is_negative(&self) -> bool {
        self.cash < Decimal::ZERO
    }
}
