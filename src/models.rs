use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

fn default_currency() -> String {
    "EUR".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub statement_number: Option<String>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub upload_batch_id: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashTransaction {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub projects: Vec<Project>,
    pub created_at: NaiveDateTime,
}

/// Dashboard rows mix both kinds; bank rows are the ones that carry
/// statement metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnyTransaction {
    Bank(Transaction),
    Cash(CashTransaction),
}

const BANK_ONLY_KEYS: &[&str] = &["reference", "account_number", "statement_number", "upload_batch_id"];

impl<'de> Deserialize<'de> for AnyTransaction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let value = serde_json::Value::deserialize(deserializer)?;
        let is_bank = value
            .as_object()
            .is_some_and(|o| BANK_ONLY_KEYS.iter().any(|k| o.contains_key(*k)));
        if is_bank {
            serde_json::from_value(value).map(Self::Bank).map_err(D::Error::custom)
        } else {
            serde_json::from_value(value).map(Self::Cash).map_err(D::Error::custom)
        }
    }
}

impl AnyTransaction {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Bank(t) => t.date,
            Self::Cash(t) => t.date,
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            Self::Bank(t) => t.amount,
            Self::Cash(t) => t.amount,
        }
    }

    pub fn currency(&self) -> &str {
        match self {
            Self::Bank(t) => &t.currency,
            Self::Cash(t) => &t.currency,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Bank(t) => t.description.as_deref().unwrap_or(""),
            Self::Cash(t) => t.description.as_deref().unwrap_or(""),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bank(_) => "bank",
            Self::Cash(_) => "cash",
        }
    }
}

/// PATCH /api/transactions/{id} answers with one row, or several when the
/// server splits across projects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UpdatedTransactions {
    One(Transaction),
    Many(Vec<Transaction>),
}

impl UpdatedTransactions {
    pub fn into_vec(self) -> Vec<Transaction> {
        match self {
            Self::One(t) => vec![t],
            Self::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadBatch {
    pub upload_batch_id: String,
    pub upload_type: String,
    pub transaction_count: i64,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub statement_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvPreview {
    pub columns: Vec<String>,
    #[serde(default)]
    pub sample_rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl CsvPreview {
    /// Cell text for a sample row, as shown in previews.
    pub fn cell(&self, row: usize, column: &str) -> String {
        match self.sample_rows.get(row).and_then(|r| r.get(column)) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub message: String,
    #[serde(default)]
    pub deleted_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

// Requests ------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionUpdate {
    /// `Some(None)` asks for the project to be cleared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCashTransaction {
    pub date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
}

/// Edits to a cash transaction. Unset fields keep their current value;
/// `project_id: Some(None)` clears the project.
#[derive(Debug, Clone, Default)]
pub struct CashTransactionUpdate {
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<Option<i64>>,
}

impl CashTransactionUpdate {
    /// The server replaces the whole row, so edits are merged into the
    /// current values before sending.
    pub fn apply_to(&self, current: &CashTransaction) -> NewCashTransaction {
        NewCashTransaction {
            date: self.date.unwrap_or(current.date),
            amount: self.amount.unwrap_or(current.amount),
            currency: self
                .currency
                .clone()
                .unwrap_or_else(|| current.currency.clone()),
            description: self
                .description
                .clone()
                .or_else(|| current.description.clone()),
            project_id: self.project_id.unwrap_or(current.project_id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Week,
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_type: Option<PeriodType>,
}

// Dashboard -----------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStats {
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project_name: Option<String>,
    pub income: f64,
    pub expenses: f64,
    pub net_amount: f64,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub project_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_amount: f64,
    pub bank_transaction_count: i64,
    pub cash_transaction_count: i64,
    #[serde(default)]
    pub transactions: Vec<AnyTransaction>,
    #[serde(default)]
    pub project_stats: Vec<ProjectStats>,
}

impl DashboardStats {
    /// Currency shown next to totals: the first row's, else EUR.
    pub fn display_currency(&self) -> &str {
        self.transactions
            .first()
            .map(|t| t.currency())
            .unwrap_or("EUR")
    }
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: i64,
    pub email: String,
    pub token: String,
    pub is_used: bool,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub invited_by_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub initial_value: f64,
    pub current_value: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PortfolioInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub id: i64,
    #[serde(default)]
    pub portfolio_id: Option<i64>,
    pub date: NaiveDate,
    pub value: f64,
    #[serde(default)]
    pub return_percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPerformanceRecord {
    pub date: NaiveDate,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub portfolio_id: i64,
    pub portfolio_name: String,
    pub current_value: f64,
    pub initial_value: f64,
    pub total_return: f64,
    pub total_return_percentage: f64,
    #[serde(default)]
    pub latest_date: Option<NaiveDate>,
    #[serde(default)]
    pub performance_records: Vec<PerformanceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub investment_amount: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OpportunityInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentRef {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub opportunity_id: i64,
    #[serde(default)]
    pub subscribed_amount: Option<f64>,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub opportunity: Option<Opportunity>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub investment: Option<InvestmentRef>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SubscriptionInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SubscriptionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertToInvestment {
    pub portfolio_id: i64,
    pub investment_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investment {
    pub id: i64,
    pub portfolio_id: i64,
    #[serde(default)]
    pub opportunity_id: Option<i64>,
    #[serde(default)]
    pub subscription_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub initial_amount: f64,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub investment_date: Option<NaiveDate>,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InvestmentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InvestmentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
