pub mod arrears;
pub mod book;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod loan;
pub mod payments;
pub mod reports;
pub mod schedule;
pub mod serialization;
pub mod state;
pub mod types;

// re-export key types
pub use arrears::{AgingBucket, ArrearsClassification, ArrearsClassifier};
pub use book::LoanBook;
pub use config::{ArrearsPolicy, EngineConfig, LoanProduct, LoanProductRecord, LoanTerms, TermConfig};
pub use decimal::{Money, Rate};
pub use engine::{aggregate, allocate_payment, classify_arrears, generate_schedule};
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use loan::Loan;
pub use payments::{Allocation, AllocationLine, Ledger, Payment, PaymentAllocator, PaymentRecord};
pub use reports::{DateRange, ReportAggregator, ReportFilter, ReportInput, ReportKind, ReportRows};
pub use schedule::{InstallmentCalendar, Schedule, ScheduleEntry, ScheduleGenerator};
pub use serialization::LoanView;
pub use state::{RestructureRecord, WriteOff};
pub use types::{
    Component, EntryStatus, InterestType, LoanId, LoanStatus, PaymentFrequency, PaymentId,
    ProductId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
