/// serializable read models for the http layer
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::arrears::AgingBucket;
use crate::decimal::{Money, Rate};
use crate::loan::Loan;
use crate::payments::Allocation;
use crate::schedule::ScheduleEntry;
use crate::types::{Component, InterestType, LoanId, LoanStatus, PaymentFrequency, ProductId};

/// serializable view of a loan's state at a business date
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub customer_id: String,
    pub status: LoanStatus,
    pub disbursement_date: NaiveDate,
    pub version: u64,
    pub terms: TermsView,
    pub balances: BalanceView,
    pub payments: PaymentView,
    pub schedule: Vec<ScheduleEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TermsView {
    pub product_id: ProductId,
    pub interest_type: InterestType,
    pub payment_frequency: PaymentFrequency,
    pub interest_rate: Rate,
    pub grace_period_days: u32,
    pub installment_fee: Money,
    pub installments: usize,
    pub maturity_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceView {
    pub principal: Money,
    pub outstanding_principal: Money,
    pub outstanding_interest: Money,
    pub outstanding_fees: Money,
    pub total_outstanding: Money,
    pub overpayment_credit: Money,
    pub days_overdue: u32,
    pub bucket: AgingBucket,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentView {
    pub payment_count: usize,
    pub total_received: Money,
    pub total_principal_paid: Money,
    pub total_interest_paid: Money,
    pub total_fees_paid: Money,
    pub next_due_date: Option<NaiveDate>,
    pub next_due_amount: Option<Money>,
    pub last_allocation: Option<Allocation>,
}

impl LoanView {
    pub fn from_loan(loan: &Loan, as_of: NaiveDate) -> Self {
        let classification = loan.classify(as_of);
        let schedule = loan.schedule.as_ref();
        let next = schedule.and_then(|s| s.next_open_entry());

        LoanView {
            id: loan.id,
            customer_id: loan.customer_id.clone(),
            status: loan.status,
            disbursement_date: loan.disbursement_date,
            version: loan.version,
            terms: TermsView {
                product_id: loan.terms.product_id,
                interest_type: loan.terms.interest_type,
                payment_frequency: loan.terms.payment_frequency,
                interest_rate: loan.terms.interest_rate,
                grace_period_days: loan.terms.grace_period_days,
                installment_fee: loan.terms.installment_fee,
                installments: schedule.map_or(0, |s| s.len()),
                maturity_date: schedule.and_then(|s| s.maturity_date()),
            },
            balances: BalanceView {
                principal: loan.principal,
                outstanding_principal: classification.outstanding_principal,
                outstanding_interest: classification.outstanding_interest,
                outstanding_fees: classification.outstanding_fees,
                total_outstanding: classification.total_outstanding(),
                overpayment_credit: loan.ledger.overpayment_credit,
                days_overdue: classification.days_overdue,
                bucket: classification.bucket,
            },
            payments: PaymentView {
                payment_count: loan.ledger.payment_count(),
                total_received: loan.ledger.total_received,
                total_principal_paid: loan.ledger.total_principal_paid,
                total_interest_paid: loan.ledger.total_interest_paid,
                total_fees_paid: loan.ledger.total_fees_paid,
                next_due_date: next.map(|e| e.due_date),
                next_due_amount: next.map(|e| e.total_remaining()),
                last_allocation: loan.ledger.last_allocation().cloned(),
            },
            schedule: schedule.map(|s| s.entries.clone()).unwrap_or_default(),
        }
    }

    /// remaining principal of the next open installment, if any
    pub fn next_principal_due(&self) -> Option<Money> {
        self.schedule
            .iter()
            .find(|e| e.status.is_open())
            .map(|e| e.remaining(Component::Principal))
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
