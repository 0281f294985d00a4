use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::arrears::AgingBucket;
use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus, PaymentId};

/// all events that can be emitted by a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanDisbursed {
        loan_id: LoanId,
        principal: Money,
        disbursement_date: NaiveDate,
    },
    ScheduleGenerated {
        loan_id: LoanId,
        installments: usize,
        total_interest: Money,
        maturity_date: NaiveDate,
    },
    LoanCompleted {
        loan_id: LoanId,
        final_payment: Money,
        date: NaiveDate,
    },
    LoanWrittenOff {
        loan_id: LoanId,
        principal: Money,
        interest: Money,
        fees: Money,
        date: NaiveDate,
    },
    LoanRestructured {
        loan_id: LoanId,
        outstanding_principal: Money,
        installments: usize,
        date: NaiveDate,
    },

    // payment events
    PaymentAllocated {
        loan_id: LoanId,
        payment_id: PaymentId,
        amount: Money,
        applied_to_fees: Money,
        applied_to_interest: Money,
        applied_to_principal: Money,
        received_date: NaiveDate,
    },
    OverpaymentRecorded {
        loan_id: LoanId,
        payment_id: PaymentId,
        amount: Money,
        received_date: NaiveDate,
    },

    // status change events
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        bucket: Option<AgingBucket>,
        reason: String,
        date: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
