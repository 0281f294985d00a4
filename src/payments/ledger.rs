use serde::{Deserialize, Serialize};

use crate::decimal::Money;

use super::{Allocation, Payment};

/// a payment together with the allocation it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment: Payment,
    pub allocation: Allocation,
}

/// Append-only payment history of a loan.
///
/// Overpayments accumulate as advance credit owed back to the borrower or
/// carried onto a restructured schedule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ledger {
    pub records: Vec<PaymentRecord>,
    pub overpayment_credit: Money,
    pub total_received: Money,
    pub total_fees_paid: Money,
    pub total_interest_paid: Money,
    pub total_principal_paid: Money,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, payment: Payment, allocation: Allocation) {
        self.total_received += payment.amount;
        self.total_fees_paid += allocation.to_fees;
        self.total_interest_paid += allocation.to_interest;
        self.total_principal_paid += allocation.to_principal;
        self.overpayment_credit += allocation.overpayment;
        self.records.push(PaymentRecord { payment, allocation });
    }

    pub fn payment_count(&self) -> usize {
        self.records.len()
    }

    pub fn has_payments(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn last_allocation(&self) -> Option<&Allocation> {
        self.records.last().map(|r| &r.allocation)
    }

    /// hand the accumulated advance credit out of the ledger
    pub fn release_credit(&mut self) -> Money {
        std::mem::take(&mut self.overpayment_credit)
    }
}
