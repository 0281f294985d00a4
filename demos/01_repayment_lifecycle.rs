/// repayment lifecycle - schedule, partial payments, arrears, restructure and write-off
use chrono::{Duration, NaiveDate};
use loan_repayment_engine::{
    ArrearsPolicy, Loan, LoanProduct, Money, Payment, TermConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("info,loan_repayment_engine=debug")
        .init();

    println!("=== repayment lifecycle ===\n");

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let product = LoanProduct::weekly_group_loan();
    let mut loan = Loan::disburse(&product, "GROUP-17", Money::from_major(500), start)?;
    let policy = ArrearsPolicy::default();

    // 1. schedule
    println!("1. schedule");
    println!("-----------");
    let schedule = loan.schedule.as_ref().ok_or("loan has no schedule")?;
    for entry in &schedule.entries {
        println!(
            "  #{:>2} {}  principal {:>8}  interest {:>6}  fee {:>5}  balance {:>8}",
            entry.sequence, entry.due_date, entry.principal_due, entry.interest_due, entry.fee_due, entry.balance_after
        );
    }

    // 2. pay the first installments on time
    println!("\n2. on-time payments");
    println!("-------------------");
    let dues: Vec<_> = schedule.entries.iter().take(3).map(|e| (e.due_date, e.total_due())).collect();
    for (due_date, amount) in dues {
        let allocation = loan.apply_payment(Payment::new(amount, due_date))?;
        println!(
            "  {}: paid {} (fees {}, interest {}, principal {})",
            due_date, amount, allocation.to_fees, allocation.to_interest, allocation.to_principal
        );
    }

    // 3. a short payment followed by silence
    println!("\n3. arrears");
    println!("----------");
    let next_due = loan
        .schedule
        .as_ref()
        .and_then(|s| s.next_open_entry())
        .map(|e| e.due_date)
        .ok_or("nothing left to pay")?;
    loan.apply_payment(Payment::new(Money::from_major(5), next_due))?;

    for days in [0, 10, 45, 95] {
        let as_of = next_due + Duration::days(days);
        loan.refresh_entry_statuses(as_of);
        let classification = loan.classify(as_of);
        let transition = loan.apply_arrears_transition(&classification, &policy)?;
        println!(
            "  {}: {} days overdue, bucket {}, overdue amount {}, status {:?}{}",
            as_of,
            classification.days_overdue,
            classification.bucket,
            classification.overdue_amount,
            loan.status,
            if transition.is_some() { " (changed)" } else { "" }
        );
    }

    // 4. restructure everything still owed over 10 weeks
    println!("\n4. restructure");
    println!("--------------");
    let restructure_date = next_due + Duration::days(96);
    let mut terms = loan.terms;
    terms.term = TermConfig::Fixed { fixed_term_days: 70 };
    let schedule = loan.restructure(terms, restructure_date)?;
    println!("  new schedule: {} installments of principal {}", schedule.len(), schedule.total_principal_due());
    println!("  status: {:?}", loan.status);

    // 5. borrower stops paying again; write the balance off
    println!("\n5. write-off");
    println!("------------");
    let write_off = loan.write_off(restructure_date + Duration::days(200))?;
    println!("  written off {} (principal {}, interest {}, fees {})", write_off.total(), write_off.principal, write_off.interest, write_off.fees);
    println!("  further payments: {:?}", loan.apply_payment(Payment::new(Money::from_major(1), restructure_date + Duration::days(201))).err());

    println!("\n{} events recorded", loan.take_events().len());

    Ok(())
}
