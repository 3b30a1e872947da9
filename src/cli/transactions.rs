use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::confirm::{ask, confirm_twice};
use crate::cli::{print_empty, Context, DateFilterArgs};
use crate::error::{Result, SsrfError};
use crate::fmt::{money, signed_money};
use crate::models::{Project, Transaction, TransactionFilter, TransactionUpdate};
use crate::splitter::{dedup_tags, resolve, Allocation};

impl From<&DateFilterArgs> for TransactionFilter {
    fn from(args: &DateFilterArgs) -> Self {
        Self {
            project_id: args.project,
            start_date: args.from_date,
            end_date: args.to_date,
        }
    }
}

/// Project names for a row: the many-to-many list when present, else the
/// single project.
pub(crate) fn project_names(projects: &[Project], single: Option<&Project>) -> String {
    if !projects.is_empty() {
        projects
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        single.map(|p| p.name.clone()).unwrap_or_default()
    }
}

pub(crate) fn print_table(rows: &[Transaction]) {
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Amount", "Description", "Reference", "Projects"]);
    for t in rows {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.date),
            Cell::new(signed_money(t.amount, &t.currency)),
            Cell::new(t.description.as_deref().unwrap_or("")),
            Cell::new(t.reference.as_deref().unwrap_or("")),
            Cell::new(project_names(&t.projects, t.project.as_ref())),
        ]);
    }
    println!("{table}");
}

pub(crate) fn print_allocations(allocations: &[Allocation], currency: &str) {
    let mut table = Table::new();
    table.set_header(vec!["Project", "Amount"]);
    for a in allocations {
        table.add_row(vec![
            Cell::new(a.project_id.map(|p| p.to_string()).unwrap_or_else(|| "(none)".into())),
            Cell::new(money(a.amount, currency)),
        ]);
    }
    println!("{table}");
}

pub fn list(ctx: &Context, filter: &DateFilterArgs) -> Result<()> {
    let mut api = ctx.books()?;
    let rows = api.transactions(&filter.into())?;
    if rows.is_empty() {
        print_empty("transactions");
        return Ok(());
    }
    println!("Bank transactions ({})", rows.len());
    print_table(&rows);
    Ok(())
}

pub fn show(ctx: &Context, id: i64) -> Result<()> {
    let mut api = ctx.books()?;
    let t = api.transaction(id)?;
    println!("ID:           {}", t.id);
    println!("Date:         {}", t.date);
    println!("Amount:       {}", signed_money(t.amount, &t.currency));
    println!("Description:  {}", t.description.as_deref().unwrap_or(""));
    println!("Reference:    {}", t.reference.as_deref().unwrap_or(""));
    println!("Account:      {}", t.account_number.as_deref().unwrap_or(""));
    println!("Statement:    {}", t.statement_number.as_deref().unwrap_or(""));
    println!("Projects:     {}", project_names(&t.projects, t.project.as_ref()));
    if let Some(batch) = &t.upload_batch_id {
        println!("Batch:        {batch}");
    }
    Ok(())
}

/// Body for tagging a bank transaction with `tags` (already de-duplicated).
pub(crate) fn tag_update(tags: &[i64]) -> TransactionUpdate {
    match tags {
        [] => TransactionUpdate {
            project_id: Some(None),
            ..Default::default()
        },
        [one] => TransactionUpdate {
            project_id: Some(Some(*one)),
            ..Default::default()
        },
        many => TransactionUpdate {
            project_ids: Some(many.to_vec()),
            ..Default::default()
        },
    }
}

/// True when the rows the server returned carry exactly the requested
/// projects, one row per allocation.
pub(crate) fn split_applied(rows: &[Transaction], allocations: &[Allocation]) -> bool {
    rows.len() == allocations.len()
        && allocations
            .iter()
            .all(|a| rows.iter().any(|r| r.project_id == a.project_id))
}

pub fn tag(ctx: &Context, id: i64, projects: &[i64]) -> Result<()> {
    let mut api = ctx.books()?;
    let txn = api.transaction(id)?;
    let tags = dedup_tags(projects);
    let allocations = resolve(txn.amount, &tags);

    let updated = api.update_transaction(id, &tag_update(&tags))?;
    if split_applied(&updated, &allocations) {
        println!(
            "Tagged transaction {id} ({}) across {} project(s):",
            money(txn.amount, &txn.currency),
            tags.len()
        );
        print_allocations(&allocations, &txn.currency);
    } else {
        println!(
            "{}",
            format!("The server did not store the requested split of transaction {id}.").yellow()
        );
        println!("Requested allocation:");
        print_allocations(&allocations, &txn.currency);
        println!("Stored:");
    }
    print_table(&updated);
    Ok(())
}

pub fn describe(ctx: &Context, id: i64, description: &str) -> Result<()> {
    let mut api = ctx.books()?;
    let update = TransactionUpdate {
        description: Some(description.to_string()),
        ..Default::default()
    };
    api.update_transaction(id, &update)?;
    println!("Updated description of transaction {id}");
    print_table(&[api.transaction(id)?]);
    Ok(())
}

pub fn delete(ctx: &Context, id: i64) -> Result<()> {
    ctx.books()?.delete_transaction(id)
}

/// Wipe every bank transaction after two confirmations. Each `--yes`
/// answers one of them.
pub fn delete_all(ctx: &Context, yes: u8) -> Result<()> {
    let first = "Delete ALL bank transactions?";
    let second = "This cannot be undone. Really delete everything?";
    let confirmed = match yes {
        0 => {
            let stdin = std::io::stdin();
            confirm_twice(&mut stdin.lock(), &mut std::io::stderr(), first, second)?
        }
        1 => ask(second)?,
        _ => true,
    };
    if !confirmed {
        return Err(SsrfError::Cancelled);
    }
    let mut api = ctx.books()?;
    let summary = api.delete_all_transactions()?;
    println!("{} ({} deleted)", summary.message.green(), summary.deleted_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_update_shapes() {
        let none = serde_json::to_value(tag_update(&[])).unwrap();
        assert_eq!(none, serde_json::json!({"project_id": null}));
        let one = serde_json::to_value(tag_update(&[7])).unwrap();
        assert_eq!(one, serde_json::json!({"project_id": 7}));
        let many = serde_json::to_value(tag_update(&[7, 8])).unwrap();
        assert_eq!(many, serde_json::json!({"project_ids": [7, 8]}));
    }

    fn stored(id: i64, amount: f64, project_id: Option<i64>) -> Transaction {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "date": "2025-03-01",
            "amount": amount,
            "currency": "EUR",
            "project_id": project_id,
            "created_at": "2025-03-01T09:00:00",
        }))
        .unwrap()
    }

    #[test]
    fn test_split_applied_matches_projects() {
        let allocations = resolve(90.0, &[3, 4]);
        let split = [stored(1, 45.0, Some(3)), stored(2, 45.0, Some(4))];
        assert!(split_applied(&split, &allocations));
    }

    #[test]
    fn test_split_ignored_by_server() {
        let allocations = resolve(90.0, &[3, 4]);
        assert!(!split_applied(&[stored(1, 90.0, None)], &allocations));
        let wrong = [stored(1, 45.0, Some(3)), stored(2, 45.0, Some(9))];
        assert!(!split_applied(&wrong, &allocations));
    }

    #[test]
    fn test_single_tag_applied() {
        assert!(split_applied(&[stored(1, 10.0, Some(7))], &resolve(10.0, &[7])));
        assert!(split_applied(&[stored(1, 10.0, None)], &resolve(10.0, &[])));
    }

    #[test]
    fn test_project_names_prefers_list() {
        let p = |id: i64, name: &str| Project {
            id,
            name: name.into(),
            description: None,
            created_at: chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        assert_eq!(project_names(&[p(1, "Roof"), p(2, "Barn")], None), "Roof, Barn");
        assert_eq!(project_names(&[], Some(&p(3, "Shed"))), "Shed");
        assert_eq!(project_names(&[], None), "");
    }
}
