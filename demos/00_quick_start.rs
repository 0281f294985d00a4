/// quick start - disburse a loan, take a payment and print its state
use chrono::NaiveDate;
use loan_repayment_engine::{Loan, LoanProduct, LoanView, Money, Payment};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let disbursed = NaiveDate::from_ymd_opt(2024, 1, 15).ok_or("bad date")?;

    // a $1,200 personal loan repaid monthly over a year
    let mut loan = Loan::disburse(
        &LoanProduct::monthly_personal_loan(),
        "CUST-001",
        Money::from_major(1_200),
        disbursed,
    )?;

    // first installment paid on its due date
    let first_due = loan
        .schedule
        .as_ref()
        .and_then(|s| s.next_open_entry())
        .map(|e| (e.due_date, e.total_due()))
        .ok_or("loan has no schedule")?;
    loan.apply_payment(Payment::new(first_due.1, first_due.0))?;

    println!("{}", LoanView::from_loan(&loan, first_due.0).to_json_pretty()?);

    Ok(())
}
