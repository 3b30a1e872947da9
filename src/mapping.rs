use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SsrfError};

// ---------------------------------------------------------------------------
// Semantic fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Date,
    Amount,
    Debit,
    Credit,
    TransactionType,
    Reference,
    Description,
    Currency,
    AccountNumber,
    StatementNumber,
}

/// Order in which fields are matched against headers.
pub const DETECTION_ORDER: [Field; 10] = [
    Field::Date,
    Field::Amount,
    Field::Debit,
    Field::Credit,
    Field::TransactionType,
    Field::Reference,
    Field::Description,
    Field::Currency,
    Field::AccountNumber,
    Field::StatementNumber,
];

/// Order in which the editor lists fields before the user moves anything.
pub const DISPLAY_ORDER: [Field; 10] = [
    Field::Date,
    Field::Amount,
    Field::TransactionType,
    Field::Debit,
    Field::Credit,
    Field::Reference,
    Field::Description,
    Field::Currency,
    Field::AccountNumber,
    Field::StatementNumber,
];

pub struct FieldDescriptor {
    pub label: &'static str,
    pub required: bool,
    pub help: Option<&'static str>,
}

impl Field {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::TransactionType => "transaction_type",
            Self::Reference => "reference",
            Self::Description => "description",
            Self::Currency => "currency",
            Self::AccountNumber => "account_number",
            Self::StatementNumber => "statement_number",
        }
    }

    pub fn descriptor(&self) -> FieldDescriptor {
        let (label, required, help) = match self {
            Self::Date => ("Date", true, None),
            Self::Amount => (
                "Amount",
                true,
                Some("Or use Transaction Type + Amount, or Debit/Credit columns"),
            ),
            Self::TransactionType => (
                "Transaction Type (Debit or Credit)",
                false,
                Some(
                    "Column containing \"Debit\" or \"Credit\" text. If \"Debit\", amount will be \
                     negative. If \"Credit\", amount will be positive.",
                ),
            ),
            Self::Debit => ("Debit (will be negative)", false, None),
            Self::Credit => ("Credit (will be positive)", false, None),
            Self::Reference => ("Reference", false, None),
            Self::Description => ("Description", false, None),
            Self::Currency => ("Currency", false, Some("Defaults to EUR if not specified")),
            Self::AccountNumber => ("Account Number", false, None),
            Self::StatementNumber => ("Statement Number", false, None),
        };
        FieldDescriptor {
            label,
            required,
            help,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = SsrfError;

    fn from_str(s: &str) -> Result<Self> {
        DETECTION_ORDER
            .iter()
            .find(|f| f.key() == s.trim())
            .copied()
            .ok_or_else(|| SsrfError::UnknownField(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ColumnMapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    columns: BTreeMap<Field, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    pub fn is_assigned(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Assign or clear a field. Empty column names clear the assignment.
    pub fn set(&mut self, field: Field, column: Option<String>) {
        match column.filter(|c| !c.is_empty()) {
            Some(c) => {
                self.columns.insert(field, c);
            }
            None => {
                self.columns.remove(&field);
            }
        }
    }

    pub fn assigned(&self) -> impl Iterator<Item = (Field, &str)> {
        self.columns.iter().map(|(f, c)| (*f, c.as_str()))
    }

    /// Whether this mapping may be submitted with an upload.
    pub fn validate(&self) -> bool {
        self.problems().is_empty()
    }

    /// Human-readable reasons the mapping cannot be submitted.
    pub fn problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if !self.is_assigned(Field::Date) {
            problems.push("a Date column is required");
        }
        let has_value = [Field::Amount, Field::Debit, Field::Credit]
            .iter()
            .any(|f| self.is_assigned(*f));
        if !has_value {
            problems.push("map Amount, Debit or Credit");
        }
        if self.is_assigned(Field::TransactionType) && !self.is_assigned(Field::Amount) {
            problems.push("Transaction Type needs an Amount column");
        }
        problems
    }

    /// JSON object sent as `column_mapping`: only assigned fields.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .map(|(f, c)| (f.key().to_string(), serde_json::Value::String(c.clone())))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Apply `field=Column` overrides. An empty column clears the field.
    pub fn apply_overrides(&mut self, overrides: &[String]) -> Result<()> {
        for pair in overrides {
            let (key, column) = pair.split_once('=').ok_or_else(|| {
                SsrfError::InvalidMapping(format!("expected field=column, got '{pair}'"))
            })?;
            let field: Field = key.parse()?;
            self.set(field, Some(column.trim().to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Auto-detection
// ---------------------------------------------------------------------------

const TYPE_CONTAINS: &[&str] = &["debit or credit", "debit/credit", "transaction type"];
const TYPE_EXACT: &[&str] = &["type", "d/c", "dc"];

fn is_type_column(lower: &str) -> bool {
    TYPE_CONTAINS.iter().any(|p| lower.contains(p)) || TYPE_EXACT.contains(&lower)
}

/// Best-guess mapping from raw CSV headers. Never fails; required fields may
/// stay unassigned.
pub fn auto_detect(columns: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();
    for col in columns {
        let lower = col.to_lowercase();
        for field in DETECTION_ORDER {
            if lower.contains(field.key()) && !mapping.is_assigned(field) {
                mapping.set(field, Some(col.clone()));
            }
        }
        if !mapping.is_assigned(Field::TransactionType) && is_type_column(&lower) {
            mapping.set(Field::TransactionType, Some(col.clone()));
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detects_exact_headers() {
        let m = auto_detect(&cols(&["Date", "Amount", "Reference"]));
        assert_eq!(m.get(Field::Date), Some("Date"));
        assert_eq!(m.get(Field::Amount), Some("Amount"));
        assert_eq!(m.get(Field::Reference), Some("Reference"));
        assert_eq!(m.assigned().count(), 3);
    }

    #[test]
    fn test_detects_substring_headers() {
        let m = auto_detect(&cols(&["Value Date", "Debit", "Credit"]));
        assert_eq!(m.get(Field::Date), Some("Value Date"));
        assert_eq!(m.get(Field::Debit), Some("Debit"));
        assert_eq!(m.get(Field::Credit), Some("Credit"));
        assert!(!m.is_assigned(Field::Amount));
    }

    #[test]
    fn test_first_match_wins() {
        let m = auto_detect(&cols(&["Booking Date", "Value Date", "Amount"]));
        assert_eq!(m.get(Field::Date), Some("Booking Date"));
    }

    #[test]
    fn test_transaction_type_special_cases() {
        for header in ["Debit or Credit", "DEBIT/CREDIT", "Transaction Type", "Type", "D/C", "dc"] {
            let m = auto_detect(&cols(&["Date", "Amount", header]));
            assert_eq!(m.get(Field::TransactionType), Some(header), "header {header}");
        }
    }

    #[test]
    fn test_type_exact_match_only() {
        let m = auto_detect(&cols(&["Date", "Amount", "Account Type"]));
        assert!(!m.is_assigned(Field::TransactionType));
    }

    #[test]
    fn test_debit_or_credit_header_also_claims_debit_and_credit() {
        let m = auto_detect(&cols(&["Date", "Debit or Credit", "Amount"]));
        assert_eq!(m.get(Field::Debit), Some("Debit or Credit"));
        assert_eq!(m.get(Field::Credit), Some("Debit or Credit"));
        assert_eq!(m.get(Field::TransactionType), Some("Debit or Credit"));
    }

    #[test]
    fn test_snake_case_headers() {
        let m = auto_detect(&cols(&["account_number", "statement_number", "currency"]));
        assert_eq!(m.get(Field::AccountNumber), Some("account_number"));
        assert_eq!(m.get(Field::StatementNumber), Some("statement_number"));
        assert_eq!(m.get(Field::Currency), Some("currency"));
    }

    #[test]
    fn test_no_matches() {
        let m = auto_detect(&cols(&["foo", "bar"]));
        assert_eq!(m.assigned().count(), 0);
        assert!(!m.validate());
    }

    #[test]
    fn test_validate_requires_value_column() {
        let mut m = ColumnMapping::new();
        m.set(Field::Date, Some("D".into()));
        assert!(!m.validate());
    }

    #[test]
    fn test_validate_type_with_amount() {
        let mut m = ColumnMapping::new();
        m.set(Field::Date, Some("D".into()));
        m.set(Field::Amount, Some("A".into()));
        m.set(Field::TransactionType, Some("T".into()));
        assert!(m.validate());
    }

    #[test]
    fn test_validate_type_without_amount() {
        let mut m = ColumnMapping::new();
        m.set(Field::Date, Some("D".into()));
        m.set(Field::Debit, Some("Dr".into()));
        m.set(Field::TransactionType, Some("T".into()));
        assert!(!m.validate());
        assert_eq!(m.problems(), vec!["Transaction Type needs an Amount column"]);
    }

    #[test]
    fn test_validate_requires_date() {
        let mut m = ColumnMapping::new();
        m.set(Field::Credit, Some("Cr".into()));
        assert!(!m.validate());
    }

    #[test]
    fn test_set_empty_clears() {
        let mut m = ColumnMapping::new();
        m.set(Field::Date, Some("D".into()));
        m.set(Field::Date, Some(String::new()));
        assert!(!m.is_assigned(Field::Date));
    }

    #[test]
    fn test_to_json_only_assigned() {
        let mut m = ColumnMapping::new();
        m.set(Field::Date, Some("Booking Date".into()));
        m.set(Field::TransactionType, Some("D/C".into()));
        let json = m.to_json();
        assert_eq!(json["date"], "Booking Date");
        assert_eq!(json["transaction_type"], "D/C");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_apply_overrides() {
        let mut m = auto_detect(&cols(&["Date", "Amount"]));
        m.apply_overrides(&["amount=".into(), "debit=Out".into()]).unwrap();
        assert!(!m.is_assigned(Field::Amount));
        assert_eq!(m.get(Field::Debit), Some("Out"));
        assert!(m.apply_overrides(&["bogus=x".into()]).is_err());
        assert!(m.apply_overrides(&["no-equals".into()]).is_err());
    }

    #[test]
    fn test_field_keys_roundtrip() {
        for f in DETECTION_ORDER {
            assert_eq!(f.key().parse::<Field>().unwrap(), f);
        }
    }

    #[test]
    fn test_only_date_and_amount_required() {
        let required: Vec<Field> = DISPLAY_ORDER
            .iter()
            .filter(|f| f.descriptor().required)
            .copied()
            .collect();
        assert_eq!(required, vec![Field::Date, Field::Amount]);
    }
}
