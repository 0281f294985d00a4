use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::Money;
use crate::schedule::Schedule;
use crate::types::{Component, LoanId};

/// aging bucket by days overdue, ordered from healthiest to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgingBucket {
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "1-30")]
    Days1To30,
    #[serde(rename = "31-60")]
    Days31To60,
    #[serde(rename = "61-90")]
    Days61To90,
    #[serde(rename = "90+")]
    Over90,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 5] = [
        AgingBucket::Current,
        AgingBucket::Days1To30,
        AgingBucket::Days31To60,
        AgingBucket::Days61To90,
        AgingBucket::Over90,
    ];

    pub fn from_days_overdue(days: u32) -> Self {
        match days {
            0 => AgingBucket::Current,
            1..=30 => AgingBucket::Days1To30,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        }
    }

    pub fn is_overdue(&self) -> bool {
        *self != AgingBucket::Current
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::Current => "current",
            AgingBucket::Days1To30 => "1-30",
            AgingBucket::Days31To60 => "31-60",
            AgingBucket::Days61To90 => "61-90",
            AgingBucket::Over90 => "90+",
        }
    }
}

impl fmt::Display for AgingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// arrears position of one loan at a date; derived, never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrearsClassification {
    pub loan_id: LoanId,
    pub as_of: NaiveDate,
    pub days_overdue: u32,
    pub bucket: AgingBucket,
    /// remaining principal over every open installment, not only overdue ones
    pub outstanding_principal: Money,
    pub outstanding_interest: Money,
    pub outstanding_fees: Money,
    /// remaining on installments due on or before `as_of`
    pub overdue_amount: Money,
    pub overdue_installments: u32,
}

impl ArrearsClassification {
    /// classification for a loan with nothing scheduled
    pub fn clear(loan_id: LoanId, as_of: NaiveDate) -> Self {
        Self {
            loan_id,
            as_of,
            days_overdue: 0,
            bucket: AgingBucket::Current,
            outstanding_principal: Money::ZERO,
            outstanding_interest: Money::ZERO,
            outstanding_fees: Money::ZERO,
            overdue_amount: Money::ZERO,
            overdue_installments: 0,
        }
    }

    pub fn total_outstanding(&self) -> Money {
        self.outstanding_principal + self.outstanding_interest + self.outstanding_fees
    }
}

/// Derives arrears positions from a schedule.
///
/// Reads only; whether a bucket change moves the loan's status is decided
/// separately by `Loan::apply_arrears_transition`.
pub struct ArrearsClassifier;

impl ArrearsClassifier {
    pub fn classify(loan_id: LoanId, schedule: &Schedule, as_of: NaiveDate) -> ArrearsClassification {
        let mut result = ArrearsClassification::clear(loan_id, as_of);
        let mut earliest_unpaid: Option<NaiveDate> = None;

        for entry in schedule.entries.iter().filter(|e| e.status.is_open()) {
            result.outstanding_principal += entry.remaining(Component::Principal);
            result.outstanding_interest += entry.remaining(Component::Interest);
            result.outstanding_fees += entry.remaining(Component::Fee);

            if entry.due_date <= as_of {
                result.overdue_amount += entry.total_remaining();
                result.overdue_installments += 1;
                earliest_unpaid = Some(earliest_unpaid.map_or(entry.due_date, |d| d.min(entry.due_date)));
            }
        }

        if let Some(due) = earliest_unpaid {
            let days = (as_of - due).num_days().max(0);
            result.days_overdue = u32::try_from(days).unwrap_or(u32::MAX);
        }
        result.bucket = AgingBucket::from_days_overdue(result.days_overdue);
        result
    }
}
