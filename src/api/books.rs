use std::path::Path;

use reqwest::blocking::multipart::Form;

use super::ApiClient;
use crate::error::{Result, SsrfError};
use crate::mapping::ColumnMapping;
use crate::models::{
    CashTransaction, CashTransactionUpdate, CsvPreview, DashboardStats, DeleteSummary, Health,
    NewCashTransaction, PeriodFilter, Project, ProjectInput, Transaction, TransactionFilter,
    TransactionUpdate, UpdatedTransactions, UploadBatch,
};

fn file_form(file: &Path) -> Result<Form> {
    Ok(Form::new().file("file", file)?)
}

impl ApiClient {
    pub fn health(&mut self) -> Result<Health> {
        self.get("/api/health")
    }

    // -- imports -------------------------------------------------------------

    pub fn upload_mt940(&mut self, file: &Path) -> Result<Vec<Transaction>> {
        self.post_multipart("/api/upload-mt940", file_form(file)?)
    }

    pub fn preview_csv(&mut self, file: &Path) -> Result<CsvPreview> {
        self.post_multipart("/api/preview-csv", file_form(file)?)
    }

    /// Upload a CSV with a confirmed mapping. The mapping is consumed here so
    /// it cannot be submitted twice.
    pub fn upload_csv(&mut self, file: &Path, mapping: ColumnMapping) -> Result<Vec<Transaction>> {
        if !mapping.validate() {
            return Err(SsrfError::InvalidMapping(mapping.problems().join(", ")));
        }
        let form = file_form(file)?.text("column_mapping", mapping.to_json().to_string());
        self.post_multipart("/api/upload-csv", form)
    }

    // -- bank transactions ---------------------------------------------------

    pub fn transactions(&mut self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        self.get_with("/api/transactions", filter)
    }

    pub fn transaction(&mut self, id: i64) -> Result<Transaction> {
        self.get(&format!("/api/transactions/{id}"))
    }

    pub fn update_transaction(&mut self, id: i64, update: &TransactionUpdate) -> Result<Vec<Transaction>> {
        let updated: UpdatedTransactions = self.patch(&format!("/api/transactions/{id}"), update)?;
        Ok(updated.into_vec())
    }

    /// Bank rows only disappear with their upload batch or a full wipe.
    pub fn delete_transaction(&mut self, _id: i64) -> Result<()> {
        Err(SsrfError::NotSupported(
            "Bank transactions cannot be deleted".to_string(),
        ))
    }

    pub fn delete_all_transactions(&mut self) -> Result<DeleteSummary> {
        self.delete("/api/transactions/all")
    }

    // -- upload batches ------------------------------------------------------

    pub fn upload_batches(&mut self) -> Result<Vec<UploadBatch>> {
        self.get("/api/upload-batches")
    }

    pub fn delete_upload_batch(&mut self, batch_id: &str) -> Result<DeleteSummary> {
        self.delete(&format!("/api/upload-batches/{batch_id}"))
    }

    // -- cash transactions ---------------------------------------------------

    pub fn create_cash_transaction(&mut self, txn: &NewCashTransaction) -> Result<CashTransaction> {
        self.post("/api/cash-transactions", txn)
    }

    pub fn cash_transactions(&mut self, filter: &TransactionFilter) -> Result<Vec<CashTransaction>> {
        self.get_with("/api/cash-transactions", filter)
    }

    /// There is no single-row GET for cash transactions; filter the listing.
    pub fn cash_transaction(&mut self, id: i64) -> Result<CashTransaction> {
        self.cash_transactions(&TransactionFilter::default())?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| SsrfError::Other(format!("No cash transaction with ID {id}")))
    }

    /// Merge `update` into the stored row and send the full record back.
    pub fn update_cash_transaction(
        &mut self,
        id: i64,
        update: &CashTransactionUpdate,
    ) -> Result<CashTransaction> {
        let current = self.cash_transaction(id)?;
        self.patch(
            &format!("/api/cash-transactions/{id}"),
            &update.apply_to(&current),
        )
    }

    pub fn delete_cash_transaction(&mut self, id: i64) -> Result<()> {
        self.delete_discard(&format!("/api/cash-transactions/{id}"))
    }

    // -- projects ------------------------------------------------------------

    pub fn create_project(&mut self, input: &ProjectInput) -> Result<Project> {
        self.post("/api/projects", input)
    }

    pub fn projects(&mut self) -> Result<Vec<Project>> {
        self.get("/api/projects")
    }

    pub fn project(&mut self, id: i64) -> Result<Project> {
        self.get(&format!("/api/projects/{id}"))
    }

    pub fn update_project(&mut self, id: i64, input: &ProjectInput) -> Result<Project> {
        self.put(&format!("/api/projects/{id}"), input)
    }

    pub fn delete_project(&mut self, id: i64) -> Result<()> {
        self.delete_discard(&format!("/api/projects/{id}"))
    }

    // -- dashboard -----------------------------------------------------------

    pub fn dashboard_stats(&mut self, filter: &PeriodFilter) -> Result<DashboardStats> {
        self.post("/api/dashboard/stats", filter)
    }
}
