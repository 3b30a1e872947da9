use chrono::{Local, NaiveDate};
use colored::Colorize;
use comfy_table::{Cell, Table};
use zeroize::{Zeroize, Zeroizing};

use crate::api::ApiClient;
use crate::cli::confirm::ask;
use crate::cli::{
    print_empty, Context, InvestmentFields, OpportunityFields, PortfolioFields,
};
use crate::error::{Result, SsrfError};
use crate::fmt::{format_bytes, money, percent, signed_money};
use crate::models::{
    ConvertToInvestment, InvestmentFilter, InvestmentInput, NewPerformanceRecord,
    OpportunityInput, PortfolioInput, Registration, SubscriptionInput, SubscriptionUpdate,
};

const PORTFOLIOS: &str = "/portfolio/portfolios";
const OPPORTUNITIES: &str = "/portfolio/opportunities";
const SUBSCRIPTIONS: &str = "/portfolio/subscriptions";
const INVITATIONS: &str = "/portfolio/invitations";
const INVESTMENTS: &str = "/portfolio/investments";

fn require_confirmation(yes: bool, question: &str) -> Result<()> {
    if yes || ask(question)? {
        Ok(())
    } else {
        Err(SsrfError::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

pub fn login(ctx: &Context, email: &str) -> Result<()> {
    let password = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    let mut api = ctx.portfolio("/portfolio/login")?;
    api.login(email.trim(), &password)?;
    let user = api.me()?;
    println!("Signed in as {}", user.email.green());
    Ok(())
}

pub fn register(
    ctx: &Context,
    email: &str,
    full_name: Option<&str>,
    invitation_token: Option<&str>,
) -> Result<()> {
    let password = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    let again = Zeroizing::new(rpassword::prompt_password("Repeat password: ")?);
    if *password != *again {
        return Err(SsrfError::Other("Passwords do not match".into()));
    }
    let mut registration = Registration {
        email: email.trim().to_string(),
        password: password.to_string(),
        full_name: full_name.map(str::to_string),
        invitation_token: invitation_token.map(str::to_string),
    };
    let mut api = ctx.portfolio("/portfolio/register")?;
    let result = api.register(&registration);
    registration.password.zeroize();
    let user = result?;
    println!(
        "Registered {}. Sign in with `ssrf portfolio login {}`.",
        user.email, user.email
    );
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    ctx.portfolio("/portfolio")?.logout()?;
    println!("Signed out");
    Ok(())
}

/// Client with the stored session, refusing early when nobody is signed in.
fn signed_in(ctx: &Context, route: &str) -> Result<ApiClient> {
    let api = ctx.portfolio(route)?;
    match api.session().and_then(|s| s.token()) {
        Some(_) => Ok(api),
        None => Err(SsrfError::Unauthorized),
    }
}

pub fn me(ctx: &Context) -> Result<()> {
    let user = signed_in(ctx, "/portfolio")?.me()?;
    println!("ID:      {}", user.id);
    println!("Email:   {}", user.email);
    println!("Name:    {}", user.full_name.as_deref().unwrap_or(""));
    println!("Admin:   {}", if user.is_admin { "yes" } else { "no" });
    println!("Active:  {}", if user.is_active { "yes" } else { "no" });
    Ok(())
}

// ---------------------------------------------------------------------------
// Portfolios
// ---------------------------------------------------------------------------

impl From<&PortfolioFields> for PortfolioInput {
    fn from(f: &PortfolioFields) -> Self {
        Self {
            name: f.name.clone(),
            description: f.description.clone(),
            initial_value: f.initial_value,
            current_value: f.current_value,
            currency: f.currency.as_ref().map(|c| c.to_uppercase()),
            is_active: f.is_active,
        }
    }
}

pub fn portfolios_list(ctx: &Context) -> Result<()> {
    let rows = ctx.portfolio(PORTFOLIOS)?.portfolios()?;
    if rows.is_empty() {
        print_empty("portfolios");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Initial", "Current", "Active"]);
    for p in &rows {
        table.add_row(vec![
            Cell::new(p.id),
            Cell::new(&p.name),
            Cell::new(money(p.initial_value, &p.currency)),
            Cell::new(money(p.current_value, &p.currency)),
            Cell::new(if p.is_active { "yes" } else { "no" }),
        ]);
    }
    println!("Portfolios ({})\n{table}", rows.len());
    Ok(())
}

pub fn portfolios_show(ctx: &Context, id: i64) -> Result<()> {
    let p = ctx.portfolio(PORTFOLIOS)?.portfolio(id)?;
    println!("ID:           {}", p.id);
    println!("Name:         {}", p.name);
    println!("Description:  {}", p.description.as_deref().unwrap_or(""));
    println!("Initial:      {}", money(p.initial_value, &p.currency));
    println!("Current:      {}", money(p.current_value, &p.currency));
    println!("Active:       {}", if p.is_active { "yes" } else { "no" });
    Ok(())
}

pub fn portfolios_add(ctx: &Context, fields: &PortfolioFields) -> Result<()> {
    let mut input = PortfolioInput::from(fields);
    if input.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
        return Err(SsrfError::Other("--name is required".into()));
    }
    if input.currency.is_none() {
        input.currency = Some(ctx.settings.default_currency.clone());
    }
    let p = ctx.portfolio(PORTFOLIOS)?.create_portfolio(&input)?;
    println!("Added portfolio: {} (ID {})", p.name, p.id);
    Ok(())
}

pub fn portfolios_edit(ctx: &Context, id: i64, fields: &PortfolioFields) -> Result<()> {
    let p = ctx.portfolio(PORTFOLIOS)?.update_portfolio(id, &fields.into())?;
    println!("Updated portfolio: {}", p.name);
    Ok(())
}

pub fn portfolios_delete(ctx: &Context, id: i64, yes: bool) -> Result<()> {
    require_confirmation(yes, &format!("Delete portfolio {id}?"))?;
    ctx.portfolio(PORTFOLIOS)?.delete_portfolio(id)?;
    println!("Deleted portfolio {id}");
    Ok(())
}

pub fn portfolios_stats(ctx: &Context) -> Result<()> {
    let rows = ctx.portfolio(PORTFOLIOS)?.performance_stats()?;
    if rows.is_empty() {
        print_empty("portfolios");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Portfolio", "Initial", "Current", "Return", "Return %", "As of"]);
    for s in &rows {
        table.add_row(vec![
            Cell::new(&s.portfolio_name),
            Cell::new(money(s.initial_value, "")),
            Cell::new(money(s.current_value, "")),
            Cell::new(signed_money(s.total_return, "")),
            Cell::new(percent(s.total_return_percentage)),
            Cell::new(s.latest_date.map(|d| d.to_string()).unwrap_or_default()),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn portfolios_performance(
    ctx: &Context,
    id: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let rows = ctx
        .portfolio(PORTFOLIOS)?
        .portfolio_performance(id, from, to)?;
    if rows.is_empty() {
        print_empty("performance records");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Date", "Value", "Return %"]);
    for r in &rows {
        table.add_row(vec![
            Cell::new(r.date),
            Cell::new(money(r.value, "")),
            Cell::new(r.return_percentage.map(percent).unwrap_or_default()),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn portfolios_record(
    ctx: &Context,
    id: i64,
    date: NaiveDate,
    value: f64,
    return_percentage: Option<f64>,
) -> Result<()> {
    let record = NewPerformanceRecord {
        date,
        value,
        return_percentage,
    };
    let r = ctx
        .portfolio(PORTFOLIOS)?
        .add_performance_record(id, &record)?;
    println!("Recorded {} on {} for portfolio {id}", money(r.value, ""), r.date);
    Ok(())
}

// ---------------------------------------------------------------------------
// Opportunities
// ---------------------------------------------------------------------------

impl From<&OpportunityFields> for OpportunityInput {
    fn from(f: &OpportunityFields) -> Self {
        Self {
            title: f.title.clone(),
            description: f.description.clone(),
            investment_amount: f.amount,
            currency: f.currency.as_ref().map(|c| c.to_uppercase()),
            kind: f.kind.clone(),
            status: f.status.clone(),
        }
    }
}

pub fn opportunities_list(ctx: &Context, status: Option<&str>) -> Result<()> {
    let rows = ctx.portfolio(OPPORTUNITIES)?.opportunities(status)?;
    if rows.is_empty() {
        print_empty("opportunities");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Type", "Amount", "Status", "Docs"]);
    for o in &rows {
        table.add_row(vec![
            Cell::new(o.id),
            Cell::new(&o.title),
            Cell::new(&o.kind),
            Cell::new(
                o.investment_amount
                    .map(|a| money(a, &o.currency))
                    .unwrap_or_default(),
            ),
            Cell::new(&o.status),
            Cell::new(o.documents.len()),
        ]);
    }
    println!("Opportunities ({})\n{table}", rows.len());
    Ok(())
}

pub fn opportunities_show(ctx: &Context, id: i64) -> Result<()> {
    let mut api = ctx.portfolio(OPPORTUNITIES)?;
    let o = api.opportunity(id)?;
    println!("ID:           {}", o.id);
    println!("Title:        {}", o.title);
    println!("Type:         {}", o.kind);
    println!("Status:       {}", o.status);
    if let Some(amount) = o.investment_amount {
        println!("Amount:       {}", money(amount, &o.currency));
    }
    println!("Description:  {}", o.description.as_deref().unwrap_or(""));
    if !o.documents.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["ID", "File", "Size", "Uploaded", "Link"]);
        for d in &o.documents {
            table.add_row(vec![
                Cell::new(d.id),
                Cell::new(&d.filename),
                Cell::new(
                    d.file_size
                        .map(|s| format_bytes(s.max(0) as u64))
                        .unwrap_or_default(),
                ),
                Cell::new(d.uploaded_at.format("%Y-%m-%d")),
                Cell::new(api.document_download_url(o.id, d.id)),
            ]);
        }
        println!("Documents\n{table}");
    }
    Ok(())
}

pub fn opportunities_add(ctx: &Context, fields: &OpportunityFields) -> Result<()> {
    let mut input = OpportunityInput::from(fields);
    if input.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        return Err(SsrfError::Other("--title is required".into()));
    }
    if input.currency.is_none() {
        input.currency = Some(ctx.settings.default_currency.clone());
    }
    let o = ctx.portfolio(OPPORTUNITIES)?.create_opportunity(&input)?;
    println!("Added opportunity: {} (ID {})", o.title, o.id);
    Ok(())
}

pub fn opportunities_edit(ctx: &Context, id: i64, fields: &OpportunityFields) -> Result<()> {
    let o = ctx
        .portfolio(OPPORTUNITIES)?
        .update_opportunity(id, &fields.into())?;
    println!("Updated opportunity: {}", o.title);
    Ok(())
}

pub fn opportunities_delete(ctx: &Context, id: i64, yes: bool) -> Result<()> {
    require_confirmation(yes, &format!("Delete opportunity {id}?"))?;
    ctx.portfolio(OPPORTUNITIES)?.delete_opportunity(id)?;
    println!("Deleted opportunity {id}");
    Ok(())
}

pub fn opportunities_upload(ctx: &Context, id: i64, file: &str) -> Result<()> {
    let path = std::path::PathBuf::from(crate::settings::shellexpand_path(file));
    if !path.is_file() {
        return Err(SsrfError::Other(format!("File not found: {}", path.display())));
    }
    let doc = ctx.portfolio(OPPORTUNITIES)?.upload_document(id, &path)?;
    println!("Uploaded {} (document {})", doc.filename, doc.id);
    Ok(())
}

pub fn opportunities_delete_doc(ctx: &Context, id: i64, document: i64) -> Result<()> {
    ctx.portfolio(OPPORTUNITIES)?.delete_document(id, document)?;
    println!("Deleted document {document}");
    Ok(())
}

pub fn opportunities_doc_url(ctx: &Context, id: i64, document: i64) -> Result<()> {
    println!("{}", ctx.portfolio(OPPORTUNITIES)?.document_download_url(id, document));
    Ok(())
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

fn print_subscriptions(rows: &[crate::models::Subscription]) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Opportunity", "Investor", "Amount", "Status", "Investment"]);
    for s in rows {
        let opportunity = s
            .opportunity
            .as_ref()
            .map(|o| o.title.clone())
            .unwrap_or_else(|| s.opportunity_id.to_string());
        let investor = s
            .user
            .as_ref()
            .map(|u| u.email.clone())
            .unwrap_or_else(|| s.user_id.to_string());
        table.add_row(vec![
            Cell::new(s.id),
            Cell::new(opportunity),
            Cell::new(investor),
            Cell::new(s.subscribed_amount.map(|a| money(a, "")).unwrap_or_default()),
            Cell::new(&s.status),
            Cell::new(s.investment.as_ref().map(|i| i.id.to_string()).unwrap_or_default()),
        ]);
    }
    println!("{table}");
}

pub fn subscribe(
    ctx: &Context,
    opportunity: i64,
    amount: Option<f64>,
    notes: Option<&str>,
) -> Result<()> {
    let input = SubscriptionInput {
        subscribed_amount: amount,
        notes: notes.map(str::to_string),
    };
    let s = ctx
        .portfolio(SUBSCRIPTIONS)?
        .subscribe(opportunity, &input)?;
    println!("Subscribed to opportunity {opportunity} (subscription {}, {})", s.id, s.status);
    Ok(())
}

pub fn subscriptions_mine(ctx: &Context) -> Result<()> {
    let rows = ctx.portfolio(SUBSCRIPTIONS)?.my_subscriptions()?;
    if rows.is_empty() {
        print_empty("subscriptions");
        return Ok(());
    }
    print_subscriptions(&rows);
    Ok(())
}

pub fn subscriptions_all(ctx: &Context, opportunity: Option<i64>) -> Result<()> {
    let rows = ctx.portfolio(SUBSCRIPTIONS)?.all_subscriptions(opportunity)?;
    if rows.is_empty() {
        print_empty("subscriptions");
        return Ok(());
    }
    print_subscriptions(&rows);
    Ok(())
}

pub fn subscriptions_update(ctx: &Context, id: i64, update: &SubscriptionUpdate) -> Result<()> {
    let s = ctx
        .portfolio(SUBSCRIPTIONS)?
        .update_subscription(id, update)?;
    println!("Subscription {} is now {}", s.id, s.status);
    Ok(())
}

pub fn subscriptions_convert(
    ctx: &Context,
    id: i64,
    portfolio_id: i64,
    date: Option<NaiveDate>,
    current_value: Option<f64>,
    notes: Option<&str>,
) -> Result<()> {
    let data = ConvertToInvestment {
        portfolio_id,
        investment_date: date.unwrap_or_else(|| Local::now().date_naive()),
        current_value,
        notes: notes.map(str::to_string),
    };
    let inv = ctx
        .portfolio(SUBSCRIPTIONS)?
        .convert_to_investment(id, &data)?;
    println!(
        "Created investment {} ({}) in portfolio {}",
        inv.id,
        money(inv.initial_amount, &inv.currency),
        inv.portfolio_id
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

pub fn invitations_create(ctx: &Context, email: &str) -> Result<()> {
    let inv = ctx.portfolio(INVITATIONS)?.create_invitation(email.trim())?;
    println!("Invited {} (token {}, expires {})", inv.email, inv.token, inv.expires_at);
    Ok(())
}

pub fn invitations_list(ctx: &Context) -> Result<()> {
    let rows = ctx.portfolio(INVITATIONS)?.invitations()?;
    if rows.is_empty() {
        print_empty("invitations");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Email", "Used", "Expires", "Created"]);
    for i in &rows {
        table.add_row(vec![
            Cell::new(i.id),
            Cell::new(&i.email),
            Cell::new(if i.is_used { "yes" } else { "no" }),
            Cell::new(i.expires_at.format("%Y-%m-%d")),
            Cell::new(i.created_at.format("%Y-%m-%d")),
        ]);
    }
    println!("{table}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Investments
// ---------------------------------------------------------------------------

impl From<&InvestmentFields> for InvestmentInput {
    fn from(f: &InvestmentFields) -> Self {
        Self {
            portfolio_id: f.portfolio,
            opportunity_id: f.opportunity,
            name: f.name.clone(),
            description: f.description.clone(),
            initial_amount: f.amount,
            current_value: f.current_value,
            currency: f.currency.as_ref().map(|c| c.to_uppercase()),
            kind: f.kind.clone(),
            investment_date: f.date,
            status: f.status.clone(),
            notes: f.notes.clone(),
        }
    }
}

/// Fields the server needs to create an investment.
pub(crate) fn missing_investment_fields(input: &InvestmentInput) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if input.portfolio_id.is_none() {
        missing.push("--portfolio");
    }
    if input.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
        missing.push("--name");
    }
    if input.initial_amount.is_none() {
        missing.push("--amount");
    }
    missing
}

pub fn investments_list(
    ctx: &Context,
    portfolio: Option<i64>,
    opportunity: Option<i64>,
    status: Option<&str>,
) -> Result<()> {
    let filter = InvestmentFilter {
        portfolio_id: portfolio,
        opportunity_id: opportunity,
        status: status.map(str::to_string),
    };
    let rows = ctx.portfolio(INVESTMENTS)?.investments(&filter)?;
    if rows.is_empty() {
        print_empty("investments");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Portfolio", "Type", "Invested", "Current", "Status"]);
    for i in &rows {
        table.add_row(vec![
            Cell::new(i.id),
            Cell::new(&i.name),
            Cell::new(i.portfolio_id),
            Cell::new(&i.kind),
            Cell::new(money(i.initial_amount, &i.currency)),
            Cell::new(
                i.current_value
                    .map(|v| money(v, &i.currency))
                    .unwrap_or_default(),
            ),
            Cell::new(&i.status),
        ]);
    }
    println!("Investments ({})\n{table}", rows.len());
    Ok(())
}

pub fn investments_show(ctx: &Context, id: i64) -> Result<()> {
    let i = ctx.portfolio(INVESTMENTS)?.investment(id)?;
    println!("ID:           {}", i.id);
    println!("Name:         {}", i.name);
    println!("Portfolio:    {}", i.portfolio_id);
    println!("Type:         {}", i.kind);
    println!("Status:       {}", i.status);
    println!("Invested:     {}", money(i.initial_amount, &i.currency));
    if let Some(v) = i.current_value {
        println!("Current:      {}", money(v, &i.currency));
    }
    if let Some(d) = i.investment_date {
        println!("Date:         {d}");
    }
    if let Some(sub) = i.subscription_id {
        println!("Subscription: {sub}");
    }
    println!("Notes:        {}", i.notes.as_deref().unwrap_or(""));
    Ok(())
}

pub fn investments_add(ctx: &Context, fields: &InvestmentFields) -> Result<()> {
    let mut input = InvestmentInput::from(fields);
    let missing = missing_investment_fields(&input);
    if !missing.is_empty() {
        return Err(SsrfError::Other(format!("Missing {}", missing.join(", "))));
    }
    if input.currency.is_none() {
        input.currency = Some(ctx.settings.default_currency.clone());
    }
    let i = ctx.portfolio(INVESTMENTS)?.create_investment(&input)?;
    println!("Added investment: {} (ID {})", i.name, i.id);
    Ok(())
}

pub fn investments_edit(ctx: &Context, id: i64, fields: &InvestmentFields) -> Result<()> {
    let i = ctx
        .portfolio(INVESTMENTS)?
        .update_investment(id, &fields.into())?;
    println!("Updated investment: {}", i.name);
    Ok(())
}

pub fn investments_delete(ctx: &Context, id: i64, yes: bool) -> Result<()> {
    require_confirmation(yes, &format!("Delete investment {id}?"))?;
    ctx.portfolio(INVESTMENTS)?.delete_investment(id)?;
    println!("Deleted investment {id}");
    Ok(())
}
