pub mod ledger;
pub mod waterfall;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{Component, PaymentId};

pub use ledger::{Ledger, PaymentRecord};
pub use waterfall::PaymentAllocator;

/// funds received against a loan, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub amount: Money,
    pub received_date: NaiveDate,
    pub reference: Option<String>,
}

impl Payment {
    pub fn new(amount: Money, received_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            received_date,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// funds applied to one component of one installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub sequence: u32,
    pub component: Component,
    pub amount: Money,
}

/// breakdown of a payment across installments and components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub payment_id: PaymentId,
    pub received_date: NaiveDate,
    pub amount: Money,
    pub to_fees: Money,
    pub to_interest: Money,
    pub to_principal: Money,
    /// funds left after every installment was satisfied, held as advance credit
    pub overpayment: Money,
    pub lines: Vec<AllocationLine>,
}

impl Allocation {
    pub(crate) fn empty(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            received_date: payment.received_date,
            amount: payment.amount,
            to_fees: Money::ZERO,
            to_interest: Money::ZERO,
            to_principal: Money::ZERO,
            overpayment: Money::ZERO,
            lines: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, line: AllocationLine) {
        match line.component {
            Component::Fee => self.to_fees += line.amount,
            Component::Interest => self.to_interest += line.amount,
            Component::Principal => self.to_principal += line.amount,
        }
        self.lines.push(line);
    }

    pub fn total_applied(&self) -> Money {
        self.to_fees + self.to_interest + self.to_principal
    }

    /// total applied to one installment
    pub fn applied_to(&self, sequence: u32) -> Money {
        self.lines
            .iter()
            .filter(|l| l.sequence == sequence)
            .map(|l| l.amount)
            .sum()
    }

    /// lines and overpayment add up to the payment, and component totals match the lines
    pub fn is_balanced(&self) -> bool {
        let lines_total: Money = self.lines.iter().map(|l| l.amount).sum();
        let component_total = |c: Component| -> Money {
            self.lines
                .iter()
                .filter(|l| l.component == c)
                .map(|l| l.amount)
                .sum()
        };

        lines_total + self.overpayment == self.amount
            && self.total_applied() == lines_total
            && component_total(Component::Fee) == self.to_fees
            && component_total(Component::Interest) == self.to_interest
            && component_total(Component::Principal) == self.to_principal
            && !self.overpayment.is_negative()
            && self.lines.iter().all(|l| l.amount.is_positive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_balance_check() {
        let payment = Payment::new(Money::from_minor(500), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_reference("till-42");
        assert_eq!(payment.reference.as_deref(), Some("till-42"));

        let mut allocation = Allocation::empty(&payment);
        allocation.push(AllocationLine {
            sequence: 1,
            component: Component::Interest,
            amount: Money::from_minor(100),
        });
        allocation.push(AllocationLine {
            sequence: 1,
            component: Component::Principal,
            amount: Money::from_minor(300),
        });
        assert!(!allocation.is_balanced());

        allocation.overpayment = Money::from_minor(100);
        assert!(allocation.is_balanced());
        assert_eq!(allocation.applied_to(1), Money::from_minor(400));
        assert_eq!(allocation.to_interest, Money::from_minor(100));
    }
}
