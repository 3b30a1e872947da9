use chrono::{Datelike, Local, NaiveDate};
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::Context;
use crate::error::{Result, SsrfError};
use crate::fmt::{money, signed_money};
use crate::models::{PeriodFilter, PeriodType};

const RECENT_ROWS: usize = 10;

/// First day of `today`'s month through `today`, unless given.
pub(crate) fn period(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let start = from.unwrap_or_else(|| today.with_day(1).unwrap_or(today));
    let end = to.unwrap_or(today);
    if start > end {
        return Err(SsrfError::Other(format!(
            "Start date {start} is after end date {end}"
        )));
    }
    Ok((start, end))
}

pub fn run(
    ctx: &Context,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    project: Option<i64>,
    period_type: Option<PeriodType>,
) -> Result<()> {
    let (start_date, end_date) = period(from, to, Local::now().date_naive())?;
    let filter = PeriodFilter {
        project_id: project,
        start_date,
        end_date,
        period_type,
    };
    let stats = ctx.books()?.dashboard_stats(&filter)?;
    let cur = stats.display_currency().to_string();

    println!(
        "{}",
        format!("Dashboard {} to {}", stats.start_date, stats.end_date).bold()
    );
    let mut totals = Table::new();
    totals.set_header(vec!["", "Amount"]);
    totals.add_row(vec![
        Cell::new("Income".green()),
        Cell::new(money(stats.total_income, &cur)),
    ]);
    totals.add_row(vec![
        Cell::new("Expenses".red()),
        Cell::new(money(stats.total_expenses.abs(), &cur)),
    ]);
    totals.add_row(vec![
        Cell::new("Net".bold()),
        Cell::new(signed_money(stats.net_amount, &cur)),
    ]);
    totals.add_row(vec![
        Cell::new("Transactions"),
        Cell::new(format!(
            "{} bank, {} cash",
            stats.bank_transaction_count, stats.cash_transaction_count
        )),
    ]);
    println!("{totals}");

    if !stats.project_stats.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Project", "Income", "Expenses", "Net", "Count"]);
        for p in &stats.project_stats {
            table.add_row(vec![
                Cell::new(p.project_name.as_deref().unwrap_or("(untagged)")),
                Cell::new(money(p.income, &cur)),
                Cell::new(money(p.expenses.abs(), &cur)),
                Cell::new(signed_money(p.net_amount, &cur)),
                Cell::new(p.transaction_count),
            ]);
        }
        println!("By project\n{table}");
    }

    if !stats.transactions.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Kind", "Amount", "Description"]);
        for t in stats.transactions.iter().take(RECENT_ROWS) {
            table.add_row(vec![
                Cell::new(t.date()),
                Cell::new(t.kind()),
                Cell::new(signed_money(t.amount(), t.currency())),
                Cell::new(t.description()),
            ]);
        }
        println!("Recent transactions\n{table}");
    }
    Ok(())
}
