use chrono::{Local, NaiveDate};
use comfy_table::{Cell, Table};
use log::{debug, warn};

use crate::api::ApiClient;
use crate::cli::confirm::ask;
use crate::cli::transactions::{print_allocations, project_names};
use crate::cli::{print_empty, Context, DateFilterArgs};
use crate::error::{Result, SsrfError};
use crate::fmt::{money, signed_money};
use crate::models::{CashTransaction, CashTransactionUpdate, NewCashTransaction};
use crate::splitter::{resolve, Allocation};

fn print_table(rows: &[CashTransaction]) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Amount", "Description", "Projects"]);
    for t in rows {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.date),
            Cell::new(signed_money(t.amount, &t.currency)),
            Cell::new(t.description.as_deref().unwrap_or("")),
            Cell::new(project_names(&t.projects, t.project.as_ref())),
        ]);
    }
    println!("{table}");
}

pub fn list(ctx: &Context, filter: &DateFilterArgs) -> Result<()> {
    let mut api = ctx.books()?;
    let rows = api.cash_transactions(&filter.into())?;
    if rows.is_empty() {
        print_empty("cash transactions");
        return Ok(());
    }
    println!("Cash transactions ({})", rows.len());
    print_table(&rows);
    Ok(())
}

/// Rows to create for a new cash transaction split across `projects`.
pub(crate) fn new_rows(
    date: NaiveDate,
    amount: f64,
    currency: &str,
    description: Option<&str>,
    projects: &[i64],
) -> Vec<NewCashTransaction> {
    resolve(amount, projects)
        .into_iter()
        .map(|a| NewCashTransaction {
            date,
            amount: a.amount,
            currency: currency.to_string(),
            description: description.map(str::to_string),
            project_id: a.project_id,
        })
        .collect()
}

/// Create `rows` in order. When one fails, the rows already created are
/// removed again so a split is stored completely or not at all.
pub(crate) fn create_rows(
    api: &mut ApiClient,
    rows: &[NewCashTransaction],
) -> Result<Vec<CashTransaction>> {
    let mut created = Vec::with_capacity(rows.len());
    for row in rows {
        debug!("creating cash row for project {:?}", row.project_id);
        match api.create_cash_transaction(row) {
            Ok(t) => created.push(t),
            Err(e) => return Err(rollback(api, &created, e)),
        }
    }
    Ok(created)
}

/// Delete `created` after a failed split step and describe what is left.
fn rollback(api: &mut ApiClient, created: &[CashTransaction], cause: SsrfError) -> SsrfError {
    let mut left = Vec::new();
    for row in created {
        if let Err(e) = api.delete_cash_transaction(row.id) {
            warn!("could not remove cash transaction {}: {e}", row.id);
            left.push(row.id.to_string());
        }
    }
    if left.is_empty() {
        SsrfError::Other(format!("Split failed, nothing was saved: {cause}"))
    } else {
        SsrfError::Other(format!(
            "Split failed: {cause}. Cash transactions {} were saved and could not be removed",
            left.join(", ")
        ))
    }
}

pub fn add(
    ctx: &Context,
    date: Option<NaiveDate>,
    amount: f64,
    currency: Option<&str>,
    description: Option<&str>,
    projects: &[i64],
) -> Result<()> {
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let currency = currency
        .map(|c| c.trim().to_uppercase())
        .unwrap_or_else(|| ctx.settings.default_currency.clone());

    let mut api = ctx.books()?;
    let rows = new_rows(date, amount, &currency, description, projects);
    let created = create_rows(&mut api, &rows)?;
    println!("Recorded {} cash transaction(s)", created.len());
    print_table(&created);
    Ok(())
}

/// Persist a split of an existing row. The extra shares are created first
/// and the row itself is rewritten to the first share last, so a failure
/// at any step leaves the stored total unchanged.
pub(crate) fn apply_split(
    api: &mut ApiClient,
    current: &CashTransaction,
    allocations: &[Allocation],
) -> Result<Vec<CashTransaction>> {
    let Some((first, rest)) = allocations.split_first() else {
        return Ok(vec![]);
    };
    let extra: Vec<NewCashTransaction> = rest
        .iter()
        .map(|a| NewCashTransaction {
            date: current.date,
            amount: a.amount,
            currency: current.currency.clone(),
            description: current.description.clone(),
            project_id: a.project_id,
        })
        .collect();
    let created = create_rows(api, &extra)?;

    let update = CashTransactionUpdate {
        amount: Some(first.amount),
        project_id: Some(first.project_id),
        ..Default::default()
    };
    let updated = match api.update_cash_transaction(current.id, &update) {
        Ok(row) => row,
        Err(e) => return Err(rollback(api, &created, e)),
    };
    let mut rows = vec![updated];
    rows.extend(created);
    Ok(rows)
}

pub fn tag(ctx: &Context, id: i64, projects: &[i64]) -> Result<()> {
    let mut api = ctx.books()?;
    let current = api.cash_transaction(id)?;
    let allocations = resolve(current.amount, projects);
    let rows = apply_split(&mut api, &current, &allocations)?;
    println!(
        "Tagged cash transaction {id} ({}):",
        money(current.amount, &current.currency)
    );
    print_allocations(&allocations, &current.currency);
    if rows.len() > 1 {
        println!("Created {} additional row(s)", rows.len() - 1);
    }
    print_table(&rows);
    Ok(())
}

pub fn edit(ctx: &Context, id: i64, update: &CashTransactionUpdate) -> Result<()> {
    let mut api = ctx.books()?;
    let row = api.update_cash_transaction(id, update)?;
    println!("Updated cash transaction {id}");
    print_table(&[row]);
    Ok(())
}

pub fn delete(ctx: &Context, id: i64, yes: bool) -> Result<()> {
    if !yes && !ask(&format!("Delete cash transaction {id}?"))? {
        return Err(SsrfError::Cancelled);
    }
    ctx.books()?.delete_cash_transaction(id)?;
    println!("Deleted cash transaction {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::serve_sequence;

    #[test]
    fn test_new_rows_split() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let rows = new_rows(date, 10.0, "EUR", Some("Lunch"), &[1, 2, 3]);
        assert_eq!(rows.len(), 3);
        let amounts: Vec<f64> = rows.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![3.34, 3.33, 3.33]);
        assert!(rows.iter().all(|r| r.description.as_deref() == Some("Lunch")));
    }

    #[test]
    fn test_new_rows_untagged() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let rows = new_rows(date, -7.5, "CHF", None, &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].project_id, None);
        assert_eq!(rows[0].amount, -7.5);
    }

    const ROW: &str = r#"{"id": 5, "date": "2025-04-02", "amount": 90.0, "currency": "EUR",
                      "description": "Fee", "created_at": "2025-04-02T08:00:00"}"#;

    fn row_with_id(id: i64) -> String {
        ROW.replace("\"id\": 5", &format!("\"id\": {id}"))
    }

    fn failure() -> (u16, String) {
        (500, r#"{"detail": "db down"}"#.to_string())
    }

    #[test]
    fn test_apply_split_creates_then_updates() {
        let (url, handle) = serve_sequence(vec![
            (200, row_with_id(6)),
            (200, format!("[{ROW}]")),
            (200, ROW.to_string()),
        ]);
        let mut api = ApiClient::new(&url).unwrap();
        let current: CashTransaction = serde_json::from_str(ROW).unwrap();
        let allocations = resolve(current.amount, &[3, 4]);
        let rows = apply_split(&mut api, &current, &allocations).unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 6]);

        let requests = handle.join().unwrap();
        assert!(requests[0].starts_with("POST /api/cash-transactions"));
        assert!(requests[0].contains(r#""project_id":4"#));
        assert!(requests[0].contains(r#""description":"Fee""#));
        assert!(requests[2].starts_with("PATCH /api/cash-transactions/5"));
        assert!(requests[2].contains(r#""amount":45.0"#));
        assert!(requests[2].contains(r#""project_id":3"#));
    }

    #[test]
    fn test_failed_extra_row_leaves_original_untouched() {
        let (url, handle) = serve_sequence(vec![failure()]);
        let mut api = ApiClient::new(&url).unwrap();
        let current: CashTransaction = serde_json::from_str(ROW).unwrap();
        let allocations = resolve(current.amount, &[3, 4]);
        let err = apply_split(&mut api, &current, &allocations).unwrap_err();
        assert_eq!(err.to_string(), "Split failed, nothing was saved: db down");

        let requests = handle.join().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("POST /api/cash-transactions"));
    }

    #[test]
    fn test_failed_update_removes_created_rows() {
        let (url, handle) = serve_sequence(vec![
            (200, row_with_id(6)),
            (200, format!("[{ROW}]")),
            failure(),
            (200, "{}".to_string()),
        ]);
        let mut api = ApiClient::new(&url).unwrap();
        let current: CashTransaction = serde_json::from_str(ROW).unwrap();
        let allocations = resolve(current.amount, &[3, 4]);
        let err = apply_split(&mut api, &current, &allocations).unwrap_err();
        assert_eq!(err.to_string(), "Split failed, nothing was saved: db down");

        let requests = handle.join().unwrap();
        assert!(requests[2].starts_with("PATCH /api/cash-transactions/5"));
        assert!(requests[3].starts_with("DELETE /api/cash-transactions/6"));
    }

    #[test]
    fn test_failed_add_reports_rows_left_behind() {
        let (url, handle) = serve_sequence(vec![
            (200, row_with_id(6)),
            (200, row_with_id(7)),
            failure(),
            (200, "{}".to_string()),
            failure(),
        ]);
        let mut api = ApiClient::new(&url).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        let rows = new_rows(date, 90.0, "EUR", Some("Fee"), &[1, 2, 3]);
        let err = create_rows(&mut api, &rows).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Split failed: db down. Cash transactions 7 were saved and could not be removed"
        );

        let requests = handle.join().unwrap();
        assert!(requests[3].starts_with("DELETE /api/cash-transactions/6"));
        assert!(requests[4].starts_with("DELETE /api/cash-transactions/7"));
    }
}
