use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a loan product
pub type ProductId = Uuid;

/// unique identifier for a payment
pub type PaymentId = Uuid;

/// how interest is charged over the life of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestType {
    /// computed once on the original principal and spread evenly
    Flat,
    /// computed each period on the remaining principal
    ReducingBalance,
}

/// installment frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    Daily,
    Weekly,
    /// calendar month, keeping the day of month where the month allows
    Monthly,
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// created but not yet disbursed
    Pending,
    /// disbursed and performing
    Active,
    /// every installment paid
    Completed,
    /// at least one installment past due
    Overdue,
    /// past due beyond the default threshold
    Defaulted,
    /// balance written off, frozen
    WrittenOff,
}

impl LoanStatus {
    /// no further payments can be allocated
    pub fn is_closed(&self) -> bool {
        matches!(self, LoanStatus::Completed | LoanStatus::WrittenOff)
    }

    /// disbursed and not closed
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Overdue | LoanStatus::Defaulted)
    }
}

/// schedule entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Upcoming,
    Due,
    PartiallyPaid,
    Paid,
    Overdue,
    WrittenOff,
}

impl EntryStatus {
    /// entry can still receive funds
    pub fn is_open(&self) -> bool {
        !matches!(self, EntryStatus::Paid | EntryStatus::WrittenOff)
    }
}

/// component of an installment, in waterfall order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Fee,
    Interest,
    Principal,
}

impl Component {
    pub const WATERFALL: [Component; 3] = [Component::Fee, Component::Interest, Component::Principal];
}
