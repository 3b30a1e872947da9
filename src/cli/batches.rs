use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::confirm::ask;
use crate::cli::{print_empty, Context};
use crate::error::{Result, SsrfError};

pub fn list(ctx: &Context) -> Result<()> {
    let batches = ctx.books()?.upload_batches()?;
    if batches.is_empty() {
        print_empty("upload batches");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Batch", "Type", "Transactions", "Uploaded", "Account", "Statement"]);
    for b in &batches {
        table.add_row(vec![
            Cell::new(&b.upload_batch_id),
            Cell::new(&b.upload_type),
            Cell::new(b.transaction_count),
            Cell::new(b.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(b.account_number.as_deref().unwrap_or("")),
            Cell::new(b.statement_number.as_deref().unwrap_or("")),
        ]);
    }
    println!("Upload batches ({})\n{table}", batches.len());
    Ok(())
}

pub fn delete(ctx: &Context, batch_id: &str, yes: bool) -> Result<()> {
    if !yes && !ask(&format!("Delete batch {batch_id} and all its transactions?"))? {
        return Err(SsrfError::Cancelled);
    }
    let summary = ctx.books()?.delete_upload_batch(batch_id)?;
    println!("{} ({} deleted)", summary.message.green(), summary.deleted_count);
    Ok(())
}
