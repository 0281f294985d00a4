use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::LoanStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    #[error("invalid term configuration: {message}")]
    InvalidTermConfiguration {
        message: String,
    },

    #[error("unschedulable term: {message}")]
    UnschedulableTerm {
        message: String,
    },

    #[error("schedule locked: {payments} payment(s) already applied")]
    ScheduleLocked {
        payments: usize,
    },

    #[error("amount must be positive: {amount}")]
    NonPositiveAmount {
        amount: Money,
    },

    #[error("loan closed: current status is {status:?}")]
    LoanClosed {
        status: LoanStatus,
    },

    #[error("negative result: balance {balance}, deducted {deducted}")]
    NegativeResult {
        balance: Money,
        deducted: Money,
    },

    #[error("loan not disbursed: current status is {status:?}")]
    LoanNotDisbursed {
        status: LoanStatus,
    },

    #[error("duplicate payment: {id} already allocated")]
    DuplicatePayment {
        id: Uuid,
    },

    #[error("duplicate loan: {id} already registered")]
    DuplicateLoan {
        id: Uuid,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict {
        expected: u64,
        found: u64,
    },

    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: LoanStatus,
        to: LoanStatus,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LoanError>;
