/// concurrent postings - many threads paying into a shared loan book
use chrono::{Duration, TimeZone, Utc};
use loan_repayment_engine::{
    EngineConfig, Loan, LoanBook, LoanProduct, Money, Payment, SafeTimeProvider, TimeSource,
};
use std::sync::Arc;
use std::thread;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();
    let today = time.now().date_naive();

    let book = Arc::new(LoanBook::new(EngineConfig::default())?);
    let product = LoanProduct::daily_microloan();
    let ids: Vec<_> = (0..4)
        .map(|i| Loan::disburse(&product, format!("CUST-{i:03}"), Money::from_major(300), today).and_then(|loan| book.insert(loan)))
        .collect::<Result<_, _>>()?;

    // each loan receives payments from several tellers at once
    let handles: Vec<_> = ids
        .iter()
        .flat_map(|id| (0..3).map(move |teller| (*id, teller)))
        .map(|(id, teller)| {
            let book = Arc::clone(&book);
            thread::spawn(move || {
                for day in 1..=5i64 {
                    let received = today + Duration::days(day);
                    if let Err(e) = book.post_payment(id, Payment::new(Money::from_major(4), received).with_reference(format!("teller-{teller}"))) {
                        eprintln!("teller {teller}: {e}");
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().map_err(|_| "teller thread panicked")?;
    }

    controller.advance(Duration::days(10));
    for classification in book.classify_all_now(&time) {
        let loan = book.snapshot(classification.loan_id)?;
        println!(
            "{}  payments {:>2}  received {:>8}  days overdue {:>2}  bucket {}",
            loan.customer_id,
            loan.ledger.payment_count(),
            loan.ledger.total_received,
            classification.days_overdue,
            classification.bucket
        );
    }

    Ok(())
}
