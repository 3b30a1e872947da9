use colored::Colorize;

use crate::cli::Context;
use crate::error::Result;
use crate::session::{FileSession, SessionContext};
use crate::settings::session_path;

pub fn run(ctx: &Context) -> Result<()> {
    let mut api = ctx.books()?;
    println!("API url:    {}", api.base_url());
    println!("Currency:   {}", ctx.settings.default_currency);

    let session = FileSession::open(session_path());
    match (session.token(), session.user()) {
        (Some(_), Some(user)) => println!("Portfolio:  signed in as {}", user.email),
        (Some(_), None) => println!("Portfolio:  signed in"),
        _ => println!("Portfolio:  not signed in"),
    }

    match api.health() {
        Ok(health) => {
            let line = format!("{} {}", health.status, health.message);
            println!("Backend:    {}", line.trim().green());
        }
        Err(e) => println!("Backend:    {}", e.to_string().red()),
    }
    Ok(())
}
