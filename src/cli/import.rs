use std::path::PathBuf;

use comfy_table::{Cell, Table};
use log::info;

use crate::cli::mapping_editor::MappingEditor;
use crate::cli::{transactions, Context};
use crate::error::{Result, SsrfError};
use crate::mapping::{auto_detect, DISPLAY_ORDER};
use crate::models::CsvPreview;
use crate::settings::shellexpand_path;
use crate::tui::run_screen;
use crate::upload::UploadSession;

fn existing_file(file: &str) -> Result<PathBuf> {
    let path = PathBuf::from(shellexpand_path(file));
    if !path.is_file() {
        return Err(SsrfError::Other(format!("File not found: {}", path.display())));
    }
    Ok(path)
}

pub fn mt940(ctx: &Context, file: &str) -> Result<()> {
    let path = existing_file(file)?;
    let mut api = ctx.books()?;
    let created = api.upload_mt940(&path)?;
    println!("{} transactions imported from {}", created.len(), path.display());
    transactions::print_table(&created);
    Ok(())
}

pub fn preview(ctx: &Context, file: &str) -> Result<()> {
    let path = existing_file(file)?;
    let mut api = ctx.books()?;
    let preview = api.preview_csv(&path)?;
    print_preview(&preview);

    let mapping = auto_detect(&preview.columns);
    let mut table = Table::new();
    table.set_header(vec!["Field", "Column"]);
    for field in DISPLAY_ORDER {
        let desc = field.descriptor();
        let label = if desc.required {
            format!("{} *", desc.label)
        } else {
            desc.label.to_string()
        };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(mapping.get(field).unwrap_or("")),
        ]);
    }
    println!("Detected mapping\n{table}");
    for problem in mapping.problems() {
        println!("  ! {problem}");
    }
    Ok(())
}

fn print_preview(preview: &CsvPreview) {
    let mut table = Table::new();
    table.set_header(preview.columns.clone());
    for row in 0..preview.sample_rows.len() {
        table.add_row(
            preview
                .columns
                .iter()
                .map(|c| Cell::new(preview.cell(row, c)))
                .collect::<Vec<_>>(),
        );
    }
    println!("Sample rows\n{table}");
}

/// Preview, map (interactively unless `yes`), then upload.
pub fn csv(ctx: &Context, file: &str, overrides: &[String], yes: bool) -> Result<()> {
    let path = existing_file(file)?;
    let mut api = ctx.books()?;
    let mut session = UploadSession::new();

    let preview = api.preview_csv(&path)?;
    session.load_preview(&path, preview);
    session.begin_editing()?;
    session.apply_overrides(overrides)?;

    let mapping = if yes {
        session.confirm()?
    } else {
        let mut editor = MappingEditor::new(&mut session);
        match run_screen(&mut editor)? {
            Some(mapping) => mapping,
            None => {
                println!("Upload cancelled.");
                return Ok(());
            }
        }
    };
    for (field, column) in mapping.assigned() {
        info!("uploading with {field} = {column}");
    }

    match api.upload_csv(&path, mapping) {
        Ok(created) => {
            session.finish();
            println!("{} transactions imported from {}", created.len(), path.display());
            transactions::print_table(&created);
            Ok(())
        }
        Err(e) => {
            session.fail(e.to_string());
            let message = session.last_error().unwrap_or_default();
            Err(SsrfError::Other(format!(
                "Upload of {} failed: {message}",
                path.display()
            )))
        }
    }
}
