use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hourglass_rs::SafeTimeProvider;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

use crate::arrears::ArrearsClassification;
use crate::config::EngineConfig;
use crate::errors::{LoanError, Result};
use crate::events::Event;
use crate::loan::Loan;
use crate::payments::{Allocation, Payment};
use crate::reports::{ReportAggregator, ReportFilter, ReportInput, ReportKind, ReportRows};
use crate::state::WriteOff;
use crate::types::{LoanId, LoanStatus};

/// In-memory registry of loans with one lock per loan.
///
/// Every mutation holds that loan's mutex for its whole duration, so at most
/// one allocation is in flight per loan while different loans proceed in
/// parallel. Readers work on clones taken under the lock.
pub struct LoanBook {
    loans: DashMap<LoanId, Arc<Mutex<Loan>>>,
    config: EngineConfig,
}

impl LoanBook {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            loans: DashMap::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// register a loan; an id already in the book is never replaced
    pub fn insert(&self, loan: Loan) -> Result<LoanId> {
        let id = loan.id;
        match self.loans.entry(id) {
            Entry::Occupied(_) => {
                warn!(loan_id = %id, "loan already registered");
                Err(LoanError::DuplicateLoan { id })
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(loan)));
                Ok(id)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    pub fn contains(&self, id: LoanId) -> bool {
        self.loans.contains_key(&id)
    }

    /// allocate a payment while holding the loan's lock
    pub fn post_payment(&self, id: LoanId, payment: Payment) -> Result<Allocation> {
        let handle = self.handle(id)?;
        let mut loan = handle.lock();

        loan.apply_payment(payment).map_err(|e| {
            warn!(loan_id = %id, error = %e, "payment rejected");
            e
        })
    }

    /// consistent copy of a loan, never observed mid-allocation
    pub fn snapshot(&self, id: LoanId) -> Result<Loan> {
        Ok(self.handle(id)?.lock().clone())
    }

    /// Replace a loan with a copy mutated outside the book.
    ///
    /// Fails with `VersionConflict` when the stored loan moved on since
    /// `read_version`.
    pub fn commit(&self, loan: Loan, read_version: u64) -> Result<()> {
        let handle = self.handle(loan.id)?;
        let mut current = handle.lock();

        if let Err(e) = current.ensure_version(read_version) {
            warn!(loan_id = %loan.id, error = %e, "stale loan rejected");
            return Err(e);
        }
        *current = loan;
        Ok(())
    }

    pub fn write_off(&self, id: LoanId, date: NaiveDate) -> Result<WriteOff> {
        let handle = self.handle(id)?;
        let mut loan = handle.lock();

        loan.write_off(date).map_err(|e| {
            warn!(loan_id = %id, error = %e, "write-off rejected");
            e
        })
    }

    pub fn classify(&self, id: LoanId, as_of: NaiveDate) -> Result<ArrearsClassification> {
        Ok(self.handle(id)?.lock().classify(as_of))
    }

    /// refresh installment statuses and apply the configured arrears transition
    pub fn update_arrears(&self, id: LoanId, as_of: NaiveDate) -> Result<Option<LoanStatus>> {
        let handle = self.handle(id)?;
        let mut loan = handle.lock();

        loan.refresh_entry_statuses(as_of);
        let classification = loan.classify(as_of);
        loan.apply_arrears_transition(&classification, &self.config.arrears)
    }

    /// run `update_arrears` over the whole book; returns the loans whose status moved
    pub fn update_all_arrears(&self, as_of: NaiveDate) -> Vec<(LoanId, LoanStatus)> {
        let mut changed = Vec::new();
        for (id, handle) in self.handles() {
            let mut loan = handle.lock();
            loan.refresh_entry_statuses(as_of);
            let classification = loan.classify(as_of);
            match loan.apply_arrears_transition(&classification, &self.config.arrears) {
                Ok(Some(status)) => changed.push((id, status)),
                Ok(None) => {}
                Err(e) => warn!(loan_id = %id, error = %e, "arrears transition failed"),
            }
        }

        info!(%as_of, changed = changed.len(), "arrears updated");
        changed
    }

    /// classification of every loan, ordered by loan id
    pub fn classify_all(&self, as_of: NaiveDate) -> Vec<ArrearsClassification> {
        self.handles()
            .into_iter()
            .map(|(_, handle)| handle.lock().classify(as_of))
            .collect()
    }

    /// `classify_all` as of the provider's current date
    pub fn classify_all_now(&self, time: &SafeTimeProvider) -> Vec<ArrearsClassification> {
        self.classify_all(time.now().date_naive())
    }

    pub fn report(&self, kind: ReportKind, filter: &ReportFilter, as_of: NaiveDate) -> ReportRows {
        let inputs: Vec<ReportInput> = self
            .handles()
            .into_iter()
            .map(|(_, handle)| ReportInput::from_loan(&handle.lock(), as_of))
            .collect();

        ReportAggregator::aggregate(&inputs, kind, filter)
    }

    pub fn report_now(&self, kind: ReportKind, filter: &ReportFilter, time: &SafeTimeProvider) -> ReportRows {
        self.report(kind, filter, time.now().date_naive())
    }

    /// drain the pending domain events of one loan
    pub fn take_events(&self, id: LoanId) -> Result<Vec<Event>> {
        Ok(self.handle(id)?.lock().take_events())
    }

    fn handle(&self, id: LoanId) -> Result<Arc<Mutex<Loan>>> {
        self.loans
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LoanError::LoanNotFound { id })
    }

    /// handles sorted by id, cloned out so no map shard stays locked
    fn handles(&self) -> Vec<(LoanId, Arc<Mutex<Loan>>)> {
        let mut handles: Vec<_> = self
            .loans
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        handles.sort_by_key(|(id, _)| *id);
        handles
    }
}
