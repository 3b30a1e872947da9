pub mod batches;
pub mod cash;
pub mod config;
pub mod confirm;
pub mod dashboard;
pub mod import;
pub mod mapping_editor;
pub mod portfolio;
pub mod projects;
pub mod status;
pub mod transactions;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::api::ApiClient;
use crate::error::Result;
use crate::models::PeriodType;
use crate::session::{FileSession, TerminalNavigator};
use crate::settings::{load_settings, session_path, Settings};

/// What every command needs: the resolved backend url and saved settings.
pub struct Context {
    pub api_url: String,
    pub settings: Settings,
}

impl Context {
    pub fn new(api_override: Option<&str>) -> Self {
        let settings = load_settings();
        Self {
            api_url: settings.effective_api_url(api_override),
            settings,
        }
    }

    /// Client for the bookkeeping endpoints, which need no credentials.
    pub fn books(&self) -> Result<ApiClient> {
        ApiClient::new(&self.api_url)
    }

    /// Client for the portfolio endpoints, carrying the stored token. `route`
    /// is the screen the command stands for, used by the 401 redirect.
    pub fn portfolio(&self, route: &str) -> Result<ApiClient> {
        Ok(ApiClient::new(&self.api_url)?.with_session(
            Box::new(FileSession::open(session_path())),
            Box::new(TerminalNavigator::new(route)),
        ))
    }
}

#[derive(Parser)]
#[command(
    name = "ssrf",
    version,
    about = "Bookkeeping and portfolio client for the SSRF accounting API."
)]
pub struct Cli {
    /// Backend base URL (overrides the saved setting)
    #[arg(long = "api-url", env = "SSRF_API_URL", global = true)]
    pub api_url: Option<String>,
    /// Log every request (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show or change saved settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Show API url, session state and backend health.
    Status,
    /// Upload bank statements.
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Bank transactions.
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// Upload batches (one per imported file).
    Batches {
        #[command(subcommand)]
        command: BatchesCommands,
    },
    /// Cash transactions.
    Cash {
        #[command(subcommand)]
        command: CashCommands,
    },
    /// Projects used to tag transactions.
    Projects {
        #[command(subcommand)]
        command: ProjectsCommands,
    },
    /// Totals and per-project breakdown for a period.
    Dashboard {
        /// Start date: YYYY-MM-DD (default: first day of this month)
        #[arg(long = "from")]
        from_date: Option<NaiveDate>,
        /// End date: YYYY-MM-DD (default: today)
        #[arg(long = "to")]
        to_date: Option<NaiveDate>,
        /// Only this project
        #[arg(long)]
        project: Option<i64>,
        #[arg(long, value_enum)]
        period: Option<PeriodType>,
    },
    /// Investment portfolio product.
    Portfolio {
        #[command(subcommand)]
        command: PortfolioCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the settings file and its values.
    Show,
    /// Save the backend base URL.
    SetUrl { url: String },
    /// Save the currency used for new cash transactions.
    SetCurrency { code: String },
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Upload an MT940 statement.
    Mt940 { file: String },
    /// Show CSV columns, sample rows and the detected mapping.
    Preview { file: String },
    /// Upload a CSV statement after confirming the column mapping.
    Csv {
        file: String,
        /// Override a mapping entry: field=Column (empty column clears it)
        #[arg(long = "map", value_name = "FIELD=COLUMN")]
        overrides: Vec<String>,
        /// Skip the interactive editor and upload the detected mapping
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct DateFilterArgs {
    /// Only transactions tagged with this project
    #[arg(long)]
    pub project: Option<i64>,
    /// Start date: YYYY-MM-DD
    #[arg(long = "from")]
    pub from_date: Option<NaiveDate>,
    /// End date: YYYY-MM-DD
    #[arg(long = "to")]
    pub to_date: Option<NaiveDate>,
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// List bank transactions.
    List {
        #[command(flatten)]
        filter: DateFilterArgs,
    },
    /// Show one bank transaction.
    Show { id: i64 },
    /// Tag a transaction with zero, one or several projects.
    Tag {
        id: i64,
        /// Project ID (repeat to split the amount equally)
        #[arg(long = "project")]
        projects: Vec<i64>,
    },
    /// Change a transaction's description.
    Describe { id: i64, description: String },
    /// Bank transactions cannot be deleted one by one.
    Delete { id: i64 },
    /// Delete every bank transaction (asks twice).
    DeleteAll {
        /// Answer yes to a confirmation; give twice to skip both
        #[arg(long, action = ArgAction::Count)]
        yes: u8,
    },
}

#[derive(Subcommand)]
pub enum BatchesCommands {
    /// List upload batches.
    List,
    /// Delete a batch and all its transactions.
    Delete {
        batch_id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum CashCommands {
    /// List cash transactions.
    List {
        #[command(flatten)]
        filter: DateFilterArgs,
    },
    /// Record a cash transaction.
    Add {
        /// Date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Signed amount; negative for expenses
        #[arg(long, allow_hyphen_values = true, value_parser = parse_amount)]
        amount: f64,
        /// Currency code (default: saved setting)
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Project ID (repeat to split the amount equally)
        #[arg(long = "project")]
        projects: Vec<i64>,
    },
    /// Tag a cash transaction with zero, one or several projects.
    Tag {
        id: i64,
        /// Project ID (repeat to split the amount equally)
        #[arg(long = "project")]
        projects: Vec<i64>,
    },
    /// Change fields of a cash transaction.
    Edit {
        id: i64,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, allow_hyphen_values = true, value_parser = parse_amount)]
        amount: Option<f64>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a cash transaction.
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ProjectsCommands {
    /// List projects.
    List,
    /// Show one project.
    Show { id: i64 },
    /// Create a project.
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Rename or describe a project.
    Edit {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a project.
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum PortfolioCommands {
    /// Sign in; the password is prompted for.
    Login { email: String },
    /// Create an account (password is prompted for).
    Register {
        email: String,
        #[arg(long = "name")]
        full_name: Option<String>,
        /// Invitation token received by email
        #[arg(long = "invitation")]
        invitation_token: Option<String>,
    },
    /// Forget the stored token.
    Logout,
    /// Show the signed-in user.
    Me,
    /// Portfolios and their performance.
    Portfolios {
        #[command(subcommand)]
        command: PortfoliosCommands,
    },
    /// Investment opportunities.
    Opportunities {
        #[command(subcommand)]
        command: OpportunitiesCommands,
    },
    /// Subscriptions to opportunities.
    Subscriptions {
        #[command(subcommand)]
        command: SubscriptionsCommands,
    },
    /// Invitations (admin).
    Invitations {
        #[command(subcommand)]
        command: InvitationsCommands,
    },
    /// Investments held in portfolios.
    Investments {
        #[command(subcommand)]
        command: InvestmentsCommands,
    },
}

#[derive(Args)]
pub struct PortfolioFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long = "initial-value", value_parser = parse_amount)]
    pub initial_value: Option<f64>,
    #[arg(long = "current-value", value_parser = parse_amount)]
    pub current_value: Option<f64>,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long = "active")]
    pub is_active: Option<bool>,
}

#[derive(Subcommand)]
pub enum PortfoliosCommands {
    List,
    Show { id: i64 },
    Add {
        #[command(flatten)]
        fields: PortfolioFields,
    },
    Edit {
        id: i64,
        #[command(flatten)]
        fields: PortfolioFields,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
    /// Return on every portfolio.
    Stats,
    /// Performance records of one portfolio.
    Performance {
        id: i64,
        #[arg(long = "from")]
        from_date: Option<NaiveDate>,
        #[arg(long = "to")]
        to_date: Option<NaiveDate>,
    },
    /// Add a performance record.
    Record {
        id: i64,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_amount)]
        value: f64,
        #[arg(long = "return", allow_hyphen_values = true, value_parser = parse_amount)]
        return_percentage: Option<f64>,
    },
}

#[derive(Args)]
pub struct OpportunityFields {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_parser = parse_amount)]
    pub amount: Option<f64>,
    #[arg(long)]
    pub currency: Option<String>,
    /// e.g. equity, debt, real_estate
    #[arg(long = "type")]
    pub kind: Option<String>,
    /// open, closed, funded
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Subcommand)]
pub enum OpportunitiesCommands {
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Show { id: i64 },
    Add {
        #[command(flatten)]
        fields: OpportunityFields,
    },
    Edit {
        id: i64,
        #[command(flatten)]
        fields: OpportunityFields,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
    /// Attach a document.
    Upload { id: i64, file: String },
    /// Remove a document.
    DeleteDoc { id: i64, document: i64 },
    /// Print a document's download link.
    DocUrl { id: i64, document: i64 },
}

#[derive(Subcommand)]
pub enum SubscriptionsCommands {
    /// Subscribe to an opportunity.
    Subscribe {
        opportunity: i64,
        #[arg(long, value_parser = parse_amount)]
        amount: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Your subscriptions.
    Mine,
    /// Every subscription (admin).
    All {
        #[arg(long)]
        opportunity: Option<i64>,
    },
    /// Change status, amount or notes (admin).
    Update {
        id: i64,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, value_parser = parse_amount)]
        amount: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Turn an approved subscription into an investment (admin).
    Convert {
        id: i64,
        #[arg(long)]
        portfolio: i64,
        /// Investment date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long = "current-value", value_parser = parse_amount)]
        current_value: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum InvitationsCommands {
    Create { email: String },
    List,
}

#[derive(Args)]
pub struct InvestmentFields {
    #[arg(long)]
    pub portfolio: Option<i64>,
    #[arg(long)]
    pub opportunity: Option<i64>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_parser = parse_amount)]
    pub amount: Option<f64>,
    #[arg(long = "current-value", value_parser = parse_amount)]
    pub current_value: Option<f64>,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long = "type")]
    pub kind: Option<String>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand)]
pub enum InvestmentsCommands {
    List {
        #[arg(long)]
        portfolio: Option<i64>,
        #[arg(long)]
        opportunity: Option<i64>,
        #[arg(long)]
        status: Option<String>,
    },
    Show { id: i64 },
    Add {
        #[command(flatten)]
        fields: InvestmentFields,
    },
    Edit {
        id: i64,
        #[command(flatten)]
        fields: InvestmentFields,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
}

/// Parse a money amount; NaN and infinities are rejected.
fn parse_amount(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{s}' is not a finite amount"))
    }
}

/// Print a one-line "nothing found" note instead of an empty table.
pub(crate) fn print_empty(what: &str) {
    println!("No {what} found.");
}
