use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::payments::Ledger;
use crate::schedule::Schedule;

/// balance frozen when a loan is written off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOff {
    pub date: NaiveDate,
    pub principal: Money,
    pub interest: Money,
    pub fees: Money,
}

impl WriteOff {
    pub fn total(&self) -> Money {
        self.principal + self.interest + self.fees
    }
}

/// audit record of a schedule replaced by a restructure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestructureRecord {
    pub date: NaiveDate,
    /// outstanding principal, interest and fees rolled into the new schedule
    pub capitalized: Money,
    pub prior_schedule: Schedule,
    /// payments as they were applied to the prior schedule
    pub prior_ledger: Ledger,
}
