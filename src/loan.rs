use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::arrears::{AgingBucket, ArrearsClassification, ArrearsClassifier};
use crate::config::{ArrearsPolicy, LoanProduct, LoanTerms};
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::payments::{Allocation, Ledger, Payment, PaymentAllocator, PaymentRecord};
use crate::schedule::{Schedule, ScheduleGenerator};
use crate::state::{RestructureRecord, WriteOff};
use crate::types::{Component, EntryStatus, LoanId, LoanStatus};

/// A disbursed (or pending) loan with the schedule and ledger it owns.
///
/// Every mutation goes through a method here and bumps `version`, so the
/// persistence layer can detect concurrent writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub customer_id: String,
    pub principal: Money,
    pub disbursement_date: NaiveDate,
    /// copy of the product terms taken at creation
    pub terms: LoanTerms,
    pub status: LoanStatus,
    /// `None` until the loan is activated
    pub schedule: Option<Schedule>,
    pub ledger: Ledger,
    pub write_off: Option<WriteOff>,
    pub restructures: Vec<RestructureRecord>,
    pub version: u64,
    #[serde(skip)]
    pub events: EventStore,
}

impl Loan {
    /// create a pending loan without a schedule
    pub fn pending(
        product: &LoanProduct,
        customer_id: impl Into<String>,
        principal: Money,
        disbursement_date: NaiveDate,
    ) -> Result<Self> {
        if !principal.is_positive() {
            return Err(LoanError::NonPositiveAmount { amount: principal });
        }
        let terms = product.terms();
        terms.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            customer_id: customer_id.into(),
            principal,
            disbursement_date,
            terms,
            status: LoanStatus::Pending,
            schedule: None,
            ledger: Ledger::new(),
            write_off: None,
            restructures: Vec::new(),
            version: 0,
            events: EventStore::new(),
        })
    }

    /// create and disburse a loan, generating its schedule
    pub fn disburse(
        product: &LoanProduct,
        customer_id: impl Into<String>,
        principal: Money,
        disbursement_date: NaiveDate,
    ) -> Result<Self> {
        let mut loan = Self::pending(product, customer_id, principal, disbursement_date)?;
        loan.activate()?;
        Ok(loan)
    }

    /// generate the schedule for a pending loan and mark it active
    pub fn activate(&mut self) -> Result<()> {
        if self.status != LoanStatus::Pending {
            return Err(LoanError::InvalidTransition {
                from: self.status,
                to: LoanStatus::Active,
            });
        }

        let schedule = ScheduleGenerator::new(&self.terms).generate(self.principal, self.disbursement_date)?;

        self.events.emit(Event::LoanDisbursed {
            loan_id: self.id,
            principal: self.principal,
            disbursement_date: self.disbursement_date,
        });
        self.install_schedule(schedule);
        self.set_status(LoanStatus::Active, None, "disbursed", self.disbursement_date);

        Ok(())
    }

    /// rebuild the schedule from the loan's own terms; only before any funds move
    pub fn regenerate_schedule(&mut self) -> Result<()> {
        if self.status.is_closed() {
            return Err(LoanError::LoanClosed { status: self.status });
        }
        if self.ledger.has_payments() {
            return Err(LoanError::ScheduleLocked {
                payments: self.ledger.payment_count(),
            });
        }
        let Some(current) = self.schedule.as_ref() else {
            return self.activate();
        };

        // a restructured schedule is rebuilt from its own capitalized base
        let (principal, start) = (current.principal, current.disbursement_date);
        let schedule = ScheduleGenerator::new(&self.terms).generate(principal, start)?;
        self.install_schedule(schedule);
        Ok(())
    }

    /// apply a payment through the waterfall
    pub fn apply_payment(&mut self, payment: Payment) -> Result<Allocation> {
        if self.status.is_closed() {
            warn!(loan_id = %self.id, status = ?self.status, "payment rejected on closed loan");
            return Err(LoanError::LoanClosed { status: self.status });
        }
        if self.payment_history().any(|r| r.payment.id == payment.id) {
            warn!(loan_id = %self.id, payment_id = %payment.id, "payment already allocated");
            return Err(LoanError::DuplicatePayment { id: payment.id });
        }
        let schedule = self.schedule.as_mut().ok_or(LoanError::LoanNotDisbursed {
            status: self.status,
        })?;

        let allocation = PaymentAllocator::new().allocate(schedule, &payment)?;
        let fully_paid = schedule.is_fully_paid();

        info!(
            loan_id = %self.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            fees = %allocation.to_fees,
            interest = %allocation.to_interest,
            principal = %allocation.to_principal,
            overpayment = %allocation.overpayment,
            "payment allocated"
        );

        self.events.emit(Event::PaymentAllocated {
            loan_id: self.id,
            payment_id: payment.id,
            amount: payment.amount,
            applied_to_fees: allocation.to_fees,
            applied_to_interest: allocation.to_interest,
            applied_to_principal: allocation.to_principal,
            received_date: payment.received_date,
        });
        if allocation.overpayment.is_positive() {
            self.events.emit(Event::OverpaymentRecorded {
                loan_id: self.id,
                payment_id: payment.id,
                amount: allocation.overpayment,
                received_date: payment.received_date,
            });
        }

        let received_date = payment.received_date;
        let amount = payment.amount;
        self.ledger.record(payment, allocation.clone());
        self.version += 1;

        if fully_paid {
            self.events.emit(Event::LoanCompleted {
                loan_id: self.id,
                final_payment: amount,
                date: received_date,
            });
            self.set_status(LoanStatus::Completed, None, "schedule fully paid", received_date);
        }

        Ok(allocation)
    }

    /// arrears position at `as_of`
    pub fn classify(&self, as_of: NaiveDate) -> ArrearsClassification {
        match &self.schedule {
            Some(schedule) => ArrearsClassifier::classify(self.id, schedule, as_of),
            None => ArrearsClassification::clear(self.id, as_of),
        }
    }

    /// Move unfunded installments between upcoming, due and overdue for `as_of`.
    ///
    /// Installments that already received funds keep their status.
    pub fn refresh_entry_statuses(&mut self, as_of: NaiveDate) -> usize {
        let Some(schedule) = self.schedule.as_mut() else {
            return 0;
        };

        let mut changed = 0;
        for entry in schedule.entries.iter_mut() {
            if !matches!(entry.status, EntryStatus::Upcoming | EntryStatus::Due | EntryStatus::Overdue) {
                continue;
            }
            let status = match entry.due_date.cmp(&as_of) {
                std::cmp::Ordering::Greater => EntryStatus::Upcoming,
                std::cmp::Ordering::Equal => EntryStatus::Due,
                std::cmp::Ordering::Less => EntryStatus::Overdue,
            };
            if status != entry.status {
                entry.status = status;
                changed += 1;
            }
        }

        if changed > 0 {
            self.version += 1;
        }
        changed
    }

    /// Explicit status transition driven by a classification.
    ///
    /// Open loans move between active, overdue and defaulted according to
    /// the policy thresholds. Returns the new status when it changed.
    pub fn apply_arrears_transition(
        &mut self,
        classification: &ArrearsClassification,
        policy: &ArrearsPolicy,
    ) -> Result<Option<LoanStatus>> {
        if classification.loan_id != self.id {
            return Err(LoanError::LoanNotFound {
                id: classification.loan_id,
            });
        }
        if !self.status.is_open() {
            return Ok(None);
        }

        let days = classification.days_overdue;
        let target = if days >= policy.default_after_days {
            LoanStatus::Defaulted
        } else if days >= policy.overdue_after_days {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        };

        if target == self.status {
            return Ok(None);
        }

        let reason = format!("{days} days past due");
        self.set_status(target, Some(classification.bucket), &reason, classification.as_of);
        self.version += 1;
        Ok(Some(target))
    }

    /// write the outstanding balance off and freeze the loan
    pub fn write_off(&mut self, date: NaiveDate) -> Result<WriteOff> {
        if self.status.is_closed() {
            return Err(LoanError::LoanClosed { status: self.status });
        }
        let schedule = self.schedule.as_mut().ok_or(LoanError::LoanNotDisbursed {
            status: self.status,
        })?;

        let write_off = WriteOff {
            date,
            principal: schedule.remaining(Component::Principal),
            interest: schedule.remaining(Component::Interest),
            fees: schedule.remaining(Component::Fee),
        };
        for entry in schedule.entries.iter_mut().filter(|e| e.status.is_open()) {
            entry.status = EntryStatus::WrittenOff;
        }

        self.events.emit(Event::LoanWrittenOff {
            loan_id: self.id,
            principal: write_off.principal,
            interest: write_off.interest,
            fees: write_off.fees,
            date,
        });
        self.write_off = Some(write_off);
        self.set_status(LoanStatus::WrittenOff, None, "written off", date);
        self.version += 1;

        Ok(write_off)
    }

    /// Replace the schedule of an open loan with one built from `terms`.
    ///
    /// Everything still owed is capitalized into the new principal starting
    /// at `date`. The prior schedule and its payments are kept as audit data.
    pub fn restructure(&mut self, terms: LoanTerms, date: NaiveDate) -> Result<&Schedule> {
        if !self.status.is_open() {
            return Err(match self.status {
                LoanStatus::Pending => LoanError::LoanNotDisbursed { status: self.status },
                status => LoanError::LoanClosed { status },
            });
        }
        terms.validate()?;

        let prior_schedule = self.schedule.take().ok_or(LoanError::LoanNotDisbursed {
            status: self.status,
        })?;
        let capitalized = prior_schedule.total_remaining();

        let schedule = match ScheduleGenerator::new(&terms).generate(capitalized, date) {
            Ok(schedule) => schedule,
            Err(e) => {
                self.schedule = Some(prior_schedule);
                return Err(e);
            }
        };

        let mut prior_ledger = std::mem::take(&mut self.ledger);
        self.ledger.overpayment_credit = prior_ledger.release_credit();

        self.restructures.push(RestructureRecord {
            date,
            capitalized,
            prior_schedule,
            prior_ledger,
        });
        self.terms = terms;
        self.events.emit(Event::LoanRestructured {
            loan_id: self.id,
            outstanding_principal: capitalized,
            installments: schedule.len(),
            date,
        });
        self.install_schedule(schedule);
        if self.status != LoanStatus::Active {
            self.set_status(LoanStatus::Active, None, "restructured", date);
        }

        info!(loan_id = %self.id, capitalized = %capitalized, "loan restructured");
        self.schedule.as_ref().ok_or(LoanError::LoanNotDisbursed { status: self.status })
    }

    /// fail unless the loan is still at the version the caller read
    pub fn ensure_version(&self, expected: u64) -> Result<()> {
        if self.version != expected {
            return Err(LoanError::VersionConflict {
                expected,
                found: self.version,
            });
        }
        Ok(())
    }

    /// payments on restructured schedules, oldest first, followed by those on the current one
    pub fn payment_history(&self) -> impl Iterator<Item = &PaymentRecord> {
        self.restructures
            .iter()
            .flat_map(|r| r.prior_ledger.records.iter())
            .chain(self.ledger.records.iter())
    }

    pub fn outstanding_principal(&self) -> Money {
        self.schedule
            .as_ref()
            .map(|s| s.remaining(Component::Principal))
            .unwrap_or(Money::ZERO)
    }

    pub fn total_outstanding(&self) -> Money {
        self.schedule
            .as_ref()
            .map(|s| s.total_remaining())
            .unwrap_or(Money::ZERO)
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn install_schedule(&mut self, schedule: Schedule) {
        self.events.emit(Event::ScheduleGenerated {
            loan_id: self.id,
            installments: schedule.len(),
            total_interest: schedule.total_interest_due(),
            maturity_date: schedule.maturity_date().unwrap_or(schedule.first_period_start),
        });
        self.schedule = Some(schedule);
        self.version += 1;
    }

    fn set_status(
        &mut self,
        new_status: LoanStatus,
        bucket: Option<AgingBucket>,
        reason: &str,
        date: NaiveDate,
    ) {
        let old_status = self.status;
        if old_status == new_status {
            return;
        }
        self.status = new_status;

        info!(loan_id = %self.id, from = ?old_status, to = ?new_status, reason, "loan status changed");
        self.events.emit(Event::StatusChanged {
            loan_id: self.id,
            old_status,
            new_status,
            bucket,
            reason: reason.to_string(),
            date,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TermConfig;
    use crate::decimal::Rate;
    use crate::types::{InterestType, PaymentFrequency};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn weekly_product() -> LoanProduct {
        LoanProduct::new(
            "weekly",
            InterestType::Flat,
            TermConfig::Fixed { fixed_term_days: 28 },
            PaymentFrequency::Weekly,
            0,
            Rate::ZERO,
        )
        .with_installment_fee(Money::from_minor(10))
    }

    fn loan() -> Loan {
        // 4 x (1000 principal + 10 fee), due Jan 8, 15, 22, 29
        Loan::disburse(&weekly_product(), "CUST-1", Money::from_minor(4_000), date(1, 1)).unwrap()
    }

    #[test]
    fn test_disbursement_generates_schedule() {
        let mut loan = loan();
        assert_eq!(loan.status, LoanStatus::Active);
        let schedule = loan.schedule.as_ref().unwrap();
        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule.entries[0].due_date, date(1, 8));
        assert_eq!(schedule.total_fee_due(), Money::from_minor(40));

        let events = loan.take_events();
        assert!(matches!(events[0], Event::LoanDisbursed { .. }));
        assert!(events.iter().any(|e| matches!(e, Event::ScheduleGenerated { installments: 4, .. })));
    }

    #[test]
    fn test_product_edits_do_not_touch_existing_loan() {
        let mut product = weekly_product();
        let loan = Loan::disburse(&product, "CUST-1", Money::from_minor(4_000), date(1, 1)).unwrap();

        product.interest_rate = Rate::from_percentage(50);
        product.term = TermConfig::Fixed { fixed_term_days: 70 };

        assert_eq!(loan.terms.interest_rate, Rate::ZERO);
        assert_eq!(loan.schedule.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn test_pending_loan_rejects_payment() {
        let mut loan = Loan::pending(&weekly_product(), "CUST-1", Money::from_minor(4_000), date(1, 1)).unwrap();
        let err = loan.apply_payment(Payment::new(Money::from_minor(100), date(1, 2))).unwrap_err();
        assert!(matches!(err, LoanError::LoanNotDisbursed { .. }));

        loan.activate().unwrap();
        assert!(loan.apply_payment(Payment::new(Money::from_minor(100), date(1, 2))).is_ok());
        assert!(matches!(loan.activate(), Err(LoanError::InvalidTransition { .. })));
    }

    #[test]
    fn test_completion_on_final_payment() {
        let mut loan = loan();
        loan.apply_payment(Payment::new(Money::from_minor(2_020), date(1, 15))).unwrap();
        assert_eq!(loan.status, LoanStatus::Active);

        let allocation = loan.apply_payment(Payment::new(Money::from_minor(2_100), date(1, 29))).unwrap();
        assert_eq!(allocation.overpayment, Money::from_minor(80));
        assert_eq!(loan.status, LoanStatus::Completed);
        assert_eq!(loan.ledger.overpayment_credit, Money::from_minor(80));

        let err = loan.apply_payment(Payment::new(Money::from_minor(1), date(2, 1))).unwrap_err();
        assert!(matches!(err, LoanError::LoanClosed { status: LoanStatus::Completed }));
    }

    #[test]
    fn test_schedule_locked_after_payment() {
        let mut loan = loan();
        assert!(loan.regenerate_schedule().is_ok());

        loan.apply_payment(Payment::new(Money::from_minor(500), date(1, 8))).unwrap();
        let err = loan.regenerate_schedule().unwrap_err();
        assert_eq!(err, LoanError::ScheduleLocked { payments: 1 });
    }

    #[test]
    fn test_write_off_freezes_loan() {
        let mut loan = loan();
        loan.apply_payment(Payment::new(Money::from_minor(1_010), date(1, 8))).unwrap();

        let write_off = loan.write_off(date(3, 1)).unwrap();
        assert_eq!(write_off.principal, Money::from_minor(3_000));
        assert_eq!(write_off.fees, Money::from_minor(30));
        assert_eq!(loan.status, LoanStatus::WrittenOff);
        assert_eq!(loan.total_outstanding(), Money::ZERO);

        let err = loan.apply_payment(Payment::new(Money::from_minor(100), date(3, 2))).unwrap_err();
        assert!(matches!(err, LoanError::LoanClosed { status: LoanStatus::WrittenOff }));
        assert!(loan.write_off(date(3, 3)).is_err());
    }

    #[test]
    fn test_arrears_transitions() {
        let mut loan = loan();
        let policy = ArrearsPolicy::default();

        let c = loan.classify(date(1, 20));
        assert_eq!(c.days_overdue, 12);
        assert_eq!(loan.apply_arrears_transition(&c, &policy).unwrap(), Some(LoanStatus::Overdue));
        assert_eq!(loan.apply_arrears_transition(&c, &policy).unwrap(), None);

        let c = loan.classify(date(4, 10));
        assert_eq!(c.bucket, AgingBucket::Over90);
        assert_eq!(loan.apply_arrears_transition(&c, &policy).unwrap(), Some(LoanStatus::Defaulted));

        // paying everything cures and completes the loan
        loan.apply_payment(Payment::new(Money::from_minor(4_040), date(4, 11))).unwrap();
        assert_eq!(loan.status, LoanStatus::Completed);
        let c = loan.classify(date(4, 12));
        assert_eq!(loan.apply_arrears_transition(&c, &policy).unwrap(), None);
    }

    #[test]
    fn test_refresh_entry_statuses() {
        let mut loan = loan();
        loan.apply_payment(Payment::new(Money::from_minor(500), date(1, 8))).unwrap();

        let changed = loan.refresh_entry_statuses(date(1, 15));
        let entries = &loan.schedule.as_ref().unwrap().entries;
        assert_eq!(changed, 1);
        assert_eq!(entries[0].status, EntryStatus::PartiallyPaid);
        assert_eq!(entries[1].status, EntryStatus::Due);
        assert_eq!(entries[2].status, EntryStatus::Upcoming);

        loan.refresh_entry_statuses(date(1, 16));
        assert_eq!(loan.schedule.as_ref().unwrap().entries[1].status, EntryStatus::Overdue);
    }

    #[test]
    fn test_restructure_keeps_prior_history() {
        let mut loan = loan();
        let before = Payment::new(Money::from_minor(1_010), date(1, 8));
        loan.apply_payment(before.clone()).unwrap();

        let mut terms = loan.terms;
        terms.term = TermConfig::Fixed { fixed_term_days: 42 };
        terms.installment_fee = Money::ZERO;

        let schedule = loan.restructure(terms, date(2, 1)).unwrap();
        assert_eq!(schedule.len(), 6);
        assert_eq!(schedule.total_principal_due(), Money::from_minor(3_030));

        assert_eq!(loan.restructures.len(), 1);
        assert_eq!(loan.restructures[0].capitalized, Money::from_minor(3_030));
        assert!(!loan.ledger.has_payments());
        assert_eq!(loan.payment_history().count(), 1);
        assert!(loan.regenerate_schedule().is_ok());

        // restructured history comes first, and stays protected against resubmission
        loan.apply_payment(Payment::new(Money::from_minor(505), date(2, 8))).unwrap();
        let dates: Vec<_> = loan.payment_history().map(|r| r.payment.received_date).collect();
        assert_eq!(dates, vec![date(1, 8), date(2, 8)]);
        assert_eq!(
            loan.apply_payment(before.clone()).unwrap_err(),
            LoanError::DuplicatePayment { id: before.id }
        );
    }

    #[test]
    fn test_same_payment_allocated_once() {
        let mut loan = Loan::disburse(&LoanProduct::daily_microloan(), "CUST-1", Money::from_major(300), date(1, 1)).unwrap();
        let payment = Payment::new(Money::from_major(11), date(1, 2));

        let first = loan.apply_payment(payment.clone()).unwrap();
        let version = loan.version;
        let err = loan.apply_payment(payment.clone()).unwrap_err();

        assert_eq!(err, LoanError::DuplicatePayment { id: payment.id });
        assert_eq!(loan.ledger.payment_count(), 1);
        assert_eq!(loan.ledger.total_received, Money::from_major(11));
        assert_eq!(loan.ledger.last_allocation(), Some(&first));
        assert_eq!(loan.version, version);
    }

    #[test]
    fn test_version_tracking() {
        let mut loan = loan();
        let read_version = loan.version;
        assert!(loan.ensure_version(read_version).is_ok());

        loan.apply_payment(Payment::new(Money::from_minor(100), date(1, 5))).unwrap();
        assert_eq!(
            loan.ensure_version(read_version).unwrap_err(),
            LoanError::VersionConflict {
                expected: read_version,
                found: read_version + 1
            }
        );
    }
}
