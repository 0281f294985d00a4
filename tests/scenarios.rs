use chrono::NaiveDate;
use loan_repayment_engine::{
    classify_arrears, generate_schedule, AgingBucket, EngineConfig, EntryStatus, InterestType, Loan,
    LoanBook, LoanError, LoanProduct, LoanStatus, Money, Payment, PaymentFrequency, Rate,
    ReportFilter, ReportKind, ReportRows, TermConfig,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::thread;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn flat_daily_product() -> LoanProduct {
    LoanProduct::new(
        "ten day flat",
        InterestType::Flat,
        TermConfig::Fixed { fixed_term_days: 10 },
        PaymentFrequency::Daily,
        0,
        Rate::from_percentage(36),
    )
}

#[test]
fn test_reducing_balance_monthly_scenario() {
    // 24% annual is 2% per month
    let product = LoanProduct::new(
        "monthly",
        InterestType::ReducingBalance,
        TermConfig::Fixed { fixed_term_days: 365 },
        PaymentFrequency::Monthly,
        0,
        Rate::from_decimal(dec!(0.24)),
    );
    let schedule = generate_schedule(&product.terms(), Money::from_minor(12_000), date(2024, 1, 1)).unwrap();

    assert_eq!(schedule.len(), 12);
    assert_eq!(schedule.entries[0].interest_due, Money::from_minor(240));
    for pair in schedule.entries.windows(2) {
        assert!(pair[1].interest_due < pair[0].interest_due);
    }

    let last = schedule.entries.last().unwrap();
    let before_last = schedule.entries[10].balance_after;
    assert_eq!(last.principal_due, before_last);
    assert_eq!(last.balance_after, Money::ZERO);
    assert_eq!(schedule.total_principal_due(), Money::from_minor(12_000));
}

#[test]
fn test_flat_daily_scenario() {
    let schedule = generate_schedule(&flat_daily_product().terms(), Money::from_minor(10_000), date(2024, 1, 1)).unwrap();

    assert_eq!(schedule.len(), 10);
    assert!(schedule.entries.iter().all(|e| e.principal_due == Money::from_minor(1_000)));

    // 10000 * 36% * 10 / 365 = 98.63, rounded to 99 and split with the extra unit up front
    assert_eq!(schedule.total_interest_due(), Money::from_minor(99));
    assert!(schedule.entries[..9].iter().all(|e| e.interest_due == Money::from_minor(10)));
    assert_eq!(schedule.entries[9].interest_due, Money::from_minor(9));
}

#[test]
fn test_rejected_payments() {
    let mut loan = Loan::disburse(&flat_daily_product(), "CUST-1", Money::from_minor(10_000), date(2024, 1, 1)).unwrap();

    for amount in [0, -1] {
        let err = loan.apply_payment(Payment::new(Money::from_minor(amount), date(2024, 1, 2))).unwrap_err();
        assert_eq!(err, LoanError::NonPositiveAmount { amount: Money::from_minor(amount) });
    }
    assert!(!loan.ledger.has_payments());

    loan.write_off(date(2024, 2, 1)).unwrap();
    let err = loan.apply_payment(Payment::new(Money::from_minor(500), date(2024, 2, 2))).unwrap_err();
    assert_eq!(err, LoanError::LoanClosed { status: LoanStatus::WrittenOff });
}

#[test]
fn test_arrears_buckets_by_days_overdue() {
    // single installment due 2024-01-08
    let product = LoanProduct::new(
        "bullet",
        InterestType::Flat,
        TermConfig::Fixed { fixed_term_days: 7 },
        PaymentFrequency::Weekly,
        0,
        Rate::ZERO,
    );
    let loan = Loan::disburse(&product, "CUST-1", Money::from_minor(5_000), date(2024, 1, 1)).unwrap();
    let due = loan.schedule.as_ref().unwrap().entries[0].due_date;

    let at_45 = classify_arrears(&loan, due + chrono::Duration::days(45));
    assert_eq!(at_45.days_overdue, 45);
    assert_eq!(at_45.bucket, AgingBucket::Days31To60);

    let at_91 = classify_arrears(&loan, due + chrono::Duration::days(91));
    assert_eq!(at_91.bucket, AgingBucket::Over90);
}

#[test]
fn test_day_ten_paid_day_twenty_untouched() {
    let product = LoanProduct::new(
        "ten day installments",
        InterestType::Flat,
        TermConfig::Fixed { fixed_term_days: 20 },
        PaymentFrequency::Daily,
        0,
        Rate::ZERO,
    );
    let mut loan = Loan::disburse(&product, "CUST-1", Money::from_minor(2_000), date(2024, 1, 1)).unwrap();

    let tenth = loan.schedule.as_ref().unwrap().entries[9].clone();
    let through_tenth: Money = loan.schedule.as_ref().unwrap().entries[..10].iter().map(|e| e.total_due()).sum();

    // enough for everything through day 10 plus part of day 11
    loan.apply_payment(Payment::new(through_tenth + Money::from_minor(50), tenth.due_date)).unwrap();

    let entries = &loan.schedule.as_ref().unwrap().entries;
    assert!(entries[..10].iter().all(|e| e.status == EntryStatus::Paid));
    assert_eq!(entries[10].status, EntryStatus::PartiallyPaid);
    assert!(entries[11..].iter().all(|e| e.total_paid().is_zero()));
    assert_eq!(entries[19].status, EntryStatus::Upcoming);
}

#[test]
fn test_same_loan_payments_serialize_across_threads() {
    let book = Arc::new(LoanBook::new(EngineConfig::default()).unwrap());
    let id = book.insert(
        Loan::disburse(&LoanProduct::monthly_personal_loan(), "CUST-1", Money::from_major(10_000), date(2024, 1, 1)).unwrap(),
    )
    .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let book = Arc::clone(&book);
            thread::spawn(move || {
                for _ in 0..25 {
                    book.post_payment(id, Payment::new(Money::from_minor(1_337), date(2024, 2, 1))).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let loan = book.snapshot(id).unwrap();
    assert_eq!(loan.ledger.payment_count(), 200);
    assert_eq!(loan.ledger.total_received, Money::from_minor(1_337 * 200));
    assert!(loan.ledger.records.iter().all(|r| r.allocation.is_balanced()));

    // the schedule holds exactly what the ledger says was applied
    let schedule = loan.schedule.as_ref().unwrap();
    let paid: Money = schedule.entries.iter().map(|e| e.total_paid()).sum();
    assert_eq!(paid + loan.ledger.overpayment_credit, loan.ledger.total_received);

    // and it is the same result as posting the payments one by one
    let mut sequential = Loan::disburse(&LoanProduct::monthly_personal_loan(), "CUST-1", Money::from_major(10_000), date(2024, 1, 1)).unwrap();
    for _ in 0..200 {
        sequential.apply_payment(Payment::new(Money::from_minor(1_337), date(2024, 2, 1))).unwrap();
    }
    assert_eq!(sequential.schedule.as_ref().unwrap().entries, schedule.entries);
}

#[test]
fn test_different_loans_progress_in_parallel() {
    let book = Arc::new(LoanBook::new(EngineConfig::default()).unwrap());
    let product = LoanProduct::daily_microloan();
    let ids: Vec<_> = (0..6)
        .map(|i| book.insert(Loan::disburse(&product, format!("CUST-{i}"), Money::from_major(300), date(2024, 1, 1)).unwrap()).unwrap())
        .collect();

    let handles: Vec<_> = ids
        .iter()
        .map(|id| {
            let (book, id) = (Arc::clone(&book), *id);
            thread::spawn(move || {
                for day in 2..=11 {
                    book.post_payment(id, Payment::new(Money::from_major(11), date(2024, 1, day))).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let ReportRows::Collections(rows) = book.report(ReportKind::Collections, &ReportFilter::all(), date(2024, 1, 12)) else {
        panic!("expected collections rows");
    };
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(|r| r.payment_count == 6 && r.amount == Money::from_major(66)));
    assert!(book.classify_all(date(2024, 1, 11)).iter().all(|c| c.bucket == AgingBucket::Current));
}
