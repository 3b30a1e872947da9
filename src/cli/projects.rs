use comfy_table::{Cell, Table};

use crate::cli::confirm::ask;
use crate::cli::{print_empty, Context};
use crate::error::{Result, SsrfError};
use crate::models::{Project, ProjectInput};

fn print_table(rows: &[Project]) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Description", "Created"]);
    for p in rows {
        table.add_row(vec![
            Cell::new(p.id),
            Cell::new(&p.name),
            Cell::new(p.description.as_deref().unwrap_or("")),
            Cell::new(p.created_at.format("%Y-%m-%d")),
        ]);
    }
    println!("{table}");
}

pub fn list(ctx: &Context) -> Result<()> {
    let projects = ctx.books()?.projects()?;
    if projects.is_empty() {
        print_empty("projects");
        return Ok(());
    }
    println!("Projects ({})", projects.len());
    print_table(&projects);
    Ok(())
}

pub fn show(ctx: &Context, id: i64) -> Result<()> {
    let project = ctx.books()?.project(id)?;
    print_table(&[project]);
    Ok(())
}

pub fn add(ctx: &Context, name: &str, description: Option<&str>) -> Result<()> {
    let input = ProjectInput {
        name: name.trim().to_string(),
        description: description.map(str::to_string),
    };
    if input.name.is_empty() {
        return Err(SsrfError::Other("Project name is required".into()));
    }
    let project = ctx.books()?.create_project(&input)?;
    println!("Added project: {} (ID {})", project.name, project.id);
    Ok(())
}

pub fn edit(ctx: &Context, id: i64, name: &str, description: Option<&str>) -> Result<()> {
    let input = ProjectInput {
        name: name.trim().to_string(),
        description: description.map(str::to_string),
    };
    let project = ctx.books()?.update_project(id, &input)?;
    println!("Updated project: {}", project.name);
    Ok(())
}

pub fn delete(ctx: &Context, id: i64, yes: bool) -> Result<()> {
    if !yes && !ask(&format!("Delete project {id}?"))? {
        return Err(SsrfError::Cancelled);
    }
    ctx.books()?.delete_project(id)?;
    println!("Deleted project {id}");
    Ok(())
}
