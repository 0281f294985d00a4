pub mod calendar;
pub mod generator;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{Component, EntryStatus};

pub use calendar::InstallmentCalendar;
pub use generator::ScheduleGenerator;

/// one installment of a repayment schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 1-based position, fixed once generated
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub principal_due: Money,
    pub interest_due: Money,
    pub fee_due: Money,
    /// principal still owed once this entry is repaid
    pub balance_after: Money,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub fee_paid: Money,
    pub status: EntryStatus,
}

impl ScheduleEntry {
    pub fn new(
        sequence: u32,
        due_date: NaiveDate,
        principal_due: Money,
        interest_due: Money,
        fee_due: Money,
        balance_after: Money,
    ) -> Self {
        Self {
            sequence,
            due_date,
            principal_due,
            interest_due,
            fee_due,
            balance_after,
            principal_paid: Money::ZERO,
            interest_paid: Money::ZERO,
            fee_paid: Money::ZERO,
            status: EntryStatus::Upcoming,
        }
    }

    pub fn total_due(&self) -> Money {
        self.principal_due + self.interest_due + self.fee_due
    }

    pub fn total_paid(&self) -> Money {
        self.principal_paid + self.interest_paid + self.fee_paid
    }

    /// amount still owed on one component
    pub fn remaining(&self, component: Component) -> Money {
        match component {
            Component::Fee => self.fee_due.saturating_sub(self.fee_paid),
            Component::Interest => self.interest_due.saturating_sub(self.interest_paid),
            Component::Principal => self.principal_due.saturating_sub(self.principal_paid),
        }
    }

    pub fn total_remaining(&self) -> Money {
        Component::WATERFALL.iter().map(|c| self.remaining(*c)).sum()
    }

    pub fn is_settled(&self) -> bool {
        self.total_remaining().is_zero()
    }

    /// record funds against one component
    pub(crate) fn credit(&mut self, component: Component, amount: Money) {
        match component {
            Component::Fee => self.fee_paid += amount,
            Component::Interest => self.interest_paid += amount,
            Component::Principal => self.principal_paid += amount,
        }
    }
}

/// ordered repayment schedule owned by a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub principal: Money,
    pub disbursement_date: NaiveDate,
    /// disbursement date shifted by the grace period
    pub first_period_start: NaiveDate,
    pub entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, sequence: u32) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.sequence == sequence)
    }

    pub fn total_principal_due(&self) -> Money {
        self.entries.iter().map(|e| e.principal_due).sum()
    }

    pub fn total_interest_due(&self) -> Money {
        self.entries.iter().map(|e| e.interest_due).sum()
    }

    pub fn total_fee_due(&self) -> Money {
        self.entries.iter().map(|e| e.fee_due).sum()
    }

    /// remaining amount of a component over entries that can still be paid
    pub fn remaining(&self, component: Component) -> Money {
        self.entries
            .iter()
            .filter(|e| e.status != EntryStatus::WrittenOff)
            .map(|e| e.remaining(component))
            .sum()
    }

    pub fn total_remaining(&self) -> Money {
        Component::WATERFALL.iter().map(|c| self.remaining(*c)).sum()
    }

    pub fn is_fully_paid(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.status == EntryStatus::Paid)
    }

    /// earliest entry still accepting funds
    pub fn next_open_entry(&self) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.status.is_open())
    }

    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.entries.last().map(|e| e.due_date)
    }
}
