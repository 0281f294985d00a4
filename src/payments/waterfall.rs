use tracing::debug;

use crate::errors::{LoanError, Result};
use crate::schedule::Schedule;
use crate::types::{Component, EntryStatus};

use super::{Allocation, AllocationLine, Payment};

/// Applies payments to a schedule oldest installment first.
///
/// Within an installment funds go to fees, then interest, then principal.
/// Nothing reaches a later installment until every earlier one is settled.
#[derive(Debug, Clone, Copy)]
pub struct PaymentAllocator {
    order: [Component; 3],
}

impl Default for PaymentAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentAllocator {
    /// standard waterfall: fees -> interest -> principal
    pub fn new() -> Self {
        Self {
            order: Component::WATERFALL,
        }
    }

    /// process payment through the waterfall, updating entry balances and statuses
    pub fn allocate(&self, schedule: &mut Schedule, payment: &Payment) -> Result<Allocation> {
        if !payment.amount.is_positive() {
            return Err(LoanError::NonPositiveAmount {
                amount: payment.amount,
            });
        }

        let mut remaining = payment.amount;
        let mut allocation = Allocation::empty(payment);

        // records loaded from storage are not guaranteed to be in due-date order
        let mut order: Vec<usize> = (0..schedule.entries.len()).collect();
        order.sort_by_key(|&i| (schedule.entries[i].due_date, schedule.entries[i].sequence));

        for index in order {
            let entry = &mut schedule.entries[index];
            if !entry.status.is_open() {
                continue;
            }
            // entries owing nothing still close once reached
            if remaining.is_zero() && !entry.is_settled() {
                break;
            }

            for component in self.order {
                let owed = entry.remaining(component);
                let applied = remaining.min(owed);
                if applied.is_zero() {
                    continue;
                }

                entry.credit(component, applied);
                remaining = remaining.try_sub(applied)?;
                allocation.push(AllocationLine {
                    sequence: entry.sequence,
                    component,
                    amount: applied,
                });

                if remaining.is_zero() {
                    break;
                }
            }

            if entry.is_settled() {
                entry.status = EntryStatus::Paid;
            } else if !entry.total_paid().is_zero() {
                entry.status = EntryStatus::PartiallyPaid;
            }

            debug!(
                sequence = entry.sequence,
                status = ?entry.status,
                remaining_on_entry = %entry.total_remaining(),
                "installment allocated"
            );
        }

        allocation.overpayment = remaining;
        Ok(allocation)
    }
}
