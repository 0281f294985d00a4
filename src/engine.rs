/// in-process entry points; no clock is read and the caller's loan is never mutated
use chrono::NaiveDate;

use crate::arrears::ArrearsClassification;
use crate::config::LoanTerms;
use crate::decimal::Money;
use crate::errors::Result;
use crate::loan::Loan;
use crate::payments::{Allocation, Payment};
use crate::reports::{ReportAggregator, ReportFilter, ReportInput, ReportKind, ReportRows};
use crate::schedule::{Schedule, ScheduleGenerator};

/// build the repayment schedule for `principal` under `terms`
pub fn generate_schedule(terms: &LoanTerms, principal: Money, disbursement_date: NaiveDate) -> Result<Schedule> {
    ScheduleGenerator::new(terms).generate(principal, disbursement_date)
}

/// allocate `payment` against a copy of `loan`, returning the allocation and the updated copy
pub fn allocate_payment(loan: &Loan, payment: Payment) -> Result<(Allocation, Loan)> {
    let mut updated = loan.clone();
    let allocation = updated.apply_payment(payment)?;
    Ok((allocation, updated))
}

pub fn classify_arrears(loan: &Loan, as_of: NaiveDate) -> ArrearsClassification {
    loan.classify(as_of)
}

pub fn aggregate(inputs: &[ReportInput], kind: ReportKind, filter: &ReportFilter) -> ReportRows {
    ReportAggregator::aggregate(inputs, kind, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoanProduct;
    use crate::errors::LoanError;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_allocate_payment_leaves_input_untouched() {
        let loan = Loan::disburse(&LoanProduct::daily_microloan(), "CUST-1", Money::from_major(300), date(1, 1)).unwrap();

        let (allocation, updated) = allocate_payment(&loan, Payment::new(Money::from_major(11), date(1, 2))).unwrap();

        assert!(allocation.is_balanced());
        assert!(!loan.ledger.has_payments());
        assert_eq!(updated.ledger.payment_count(), 1);
        assert_eq!(updated.version, loan.version + 1);
    }

    #[test]
    fn test_rejections_surface_unchanged() {
        let loan = Loan::disburse(&LoanProduct::daily_microloan(), "CUST-1", Money::from_major(300), date(1, 1)).unwrap();
        let err = allocate_payment(&loan, Payment::new(Money::ZERO, date(1, 2))).unwrap_err();
        assert_eq!(err, LoanError::NonPositiveAmount { amount: Money::ZERO });
    }

    #[test]
    fn test_generate_schedule_matches_loan() {
        let product = LoanProduct::weekly_group_loan();
        let loan = Loan::disburse(&product, "CUST-1", Money::from_major(500), date(1, 1)).unwrap();
        let schedule = generate_schedule(&product.terms(), Money::from_major(500), date(1, 1)).unwrap();
        assert_eq!(Some(&schedule), loan.schedule.as_ref());
        assert_eq!(classify_arrears(&loan, date(1, 2)).total_outstanding(), schedule.total_remaining());
    }
}
