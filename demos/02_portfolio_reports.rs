/// portfolio reports - aging, arrears, collections and revenue over a small book
use chrono::NaiveDate;
use loan_repayment_engine::{
    DateRange, EngineConfig, Loan, LoanBook, LoanProduct, Money, Payment, ReportFilter, ReportKind,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let date = |m: u32, d: u32| NaiveDate::from_ymd_opt(2024, m, d).ok_or("bad date");
    let book = LoanBook::new(EngineConfig::from_json(r#"{"arrears": {"overdue_after_days": 1, "default_after_days": 60}}"#)?)?;

    let daily = LoanProduct::daily_microloan();
    let weekly = LoanProduct::weekly_group_loan();
    let monthly = LoanProduct::monthly_personal_loan();

    // a performing daily loan
    let performing = book.insert(Loan::disburse(&daily, "MKT-01", Money::from_major(300), date(2, 1)?)?)?;
    for day in 2..=20 {
        book.post_payment(performing, Payment::new(Money::from_major(11), date(2, day)?))?;
    }

    // a weekly loan that never paid
    book.insert(Loan::disburse(&weekly, "GROUP-02", Money::from_major(800), date(1, 2)?)?)?;

    // a monthly loan paid twice, then written off
    let written = book.insert(Loan::disburse(&monthly, "CUST-03", Money::from_major(2_400), date(1, 10)?)?)?;
    book.post_payment(written, Payment::new(Money::from_major(230), date(2, 10)?))?;
    book.post_payment(written, Payment::new(Money::from_major(230), date(3, 11)?))?;
    book.write_off(written, date(3, 15)?)?;

    let as_of = date(3, 31)?;
    book.update_all_arrears(as_of);

    let filter = ReportFilter::all().received_between(DateRange::new(date(2, 1)?, date(3, 31)?));
    for kind in [
        ReportKind::Portfolio,
        ReportKind::Aging,
        ReportKind::Arrears,
        ReportKind::WriteOffs,
        ReportKind::Collections,
        ReportKind::Products,
        ReportKind::Revenue,
    ] {
        let rows = book.report(kind, &filter, as_of);
        println!("=== {:?} ===", kind);
        println!("{}\n", serde_json::to_string_pretty(&rows)?);
    }

    Ok(())
}
