use std::path::Path;

use chrono::NaiveDate;
use reqwest::blocking::multipart::Form;
use serde::Serialize;

use super::ApiClient;
use crate::error::{Result, SsrfError};
use crate::models::{
    ConvertToInvestment, Document, Invitation, Investment, InvestmentFilter, InvestmentInput,
    NewPerformanceRecord, Opportunity, OpportunityInput, PerformanceRecord, Portfolio,
    PortfolioInput, PortfolioStats, Registration, Subscription, SubscriptionInput,
    SubscriptionUpdate, Token, User,
};

const BASE: &str = "/api/portfolio";

#[derive(Serialize)]
struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct StatusFilter<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
}

#[derive(Serialize)]
struct OpportunityFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    opportunity_id: Option<i64>,
}

impl ApiClient {
    // -- auth ----------------------------------------------------------------

    /// Exchange credentials for a token and keep it in the session.
    pub fn login(&mut self, email: &str, password: &str) -> Result<Token> {
        let token: Token = self.post_form(
            &format!("{BASE}/auth/login"),
            &[("username", email), ("password", password)],
        )?;
        if !token.access_token.is_empty() {
            let session = self
                .session_mut()
                .ok_or_else(|| SsrfError::Other("No session store configured".into()))?;
            session.set_token(&token.access_token)?;
        }
        Ok(token)
    }

    pub fn register(&mut self, registration: &Registration) -> Result<User> {
        self.post(&format!("{BASE}/auth/register"), registration)
    }

    /// Fetch the signed-in user and cache it in the session.
    pub fn me(&mut self) -> Result<User> {
        let user: User = self.get(&format!("{BASE}/auth/me"))?;
        if let Some(session) = self.session_mut() {
            session.set_user(&user)?;
        }
        Ok(user)
    }

    /// Local only: forget the token and cached user.
    pub fn logout(&mut self) -> Result<()> {
        match self.session_mut() {
            Some(session) => session.clear(),
            None => Ok(()),
        }
    }

    // -- portfolios ----------------------------------------------------------

    pub fn portfolios(&mut self) -> Result<Vec<Portfolio>> {
        self.get(&format!("{BASE}/portfolios"))
    }

    pub fn portfolio(&mut self, id: i64) -> Result<Portfolio> {
        self.get(&format!("{BASE}/portfolios/{id}"))
    }

    pub fn create_portfolio(&mut self, input: &PortfolioInput) -> Result<Portfolio> {
        self.post(&format!("{BASE}/portfolios"), input)
    }

    pub fn update_portfolio(&mut self, id: i64, input: &PortfolioInput) -> Result<Portfolio> {
        self.put(&format!("{BASE}/portfolios/{id}"), input)
    }

    pub fn delete_portfolio(&mut self, id: i64) -> Result<()> {
        self.delete_discard(&format!("{BASE}/portfolios/{id}"))
    }

    pub fn performance_stats(&mut self) -> Result<Vec<PortfolioStats>> {
        self.get(&format!("{BASE}/portfolios/performance/stats"))
    }

    pub fn portfolio_performance(
        &mut self,
        id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PerformanceRecord>> {
        self.get_with(
            &format!("{BASE}/portfolios/{id}/performance"),
            &DateRange {
                start_date,
                end_date,
            },
        )
    }

    pub fn add_performance_record(
        &mut self,
        id: i64,
        record: &NewPerformanceRecord,
    ) -> Result<PerformanceRecord> {
        self.post(&format!("{BASE}/portfolios/{id}/performance"), record)
    }

    // -- opportunities -------------------------------------------------------

    pub fn opportunities(&mut self, status: Option<&str>) -> Result<Vec<Opportunity>> {
        self.get_with(&format!("{BASE}/opportunities"), &StatusFilter { status })
    }

    pub fn opportunity(&mut self, id: i64) -> Result<Opportunity> {
        self.get(&format!("{BASE}/opportunities/{id}"))
    }

    pub fn create_opportunity(&mut self, input: &OpportunityInput) -> Result<Opportunity> {
        self.post(&format!("{BASE}/opportunities"), input)
    }

    pub fn update_opportunity(&mut self, id: i64, input: &OpportunityInput) -> Result<Opportunity> {
        self.put(&format!("{BASE}/opportunities/{id}"), input)
    }

    pub fn delete_opportunity(&mut self, id: i64) -> Result<()> {
        self.delete_discard(&format!("{BASE}/opportunities/{id}"))
    }

    pub fn upload_document(&mut self, opportunity_id: i64, file: &Path) -> Result<Document> {
        let form = Form::new().file("file", file)?;
        self.post_multipart(&format!("{BASE}/opportunities/{opportunity_id}/documents"), form)
    }

    /// Direct link; downloads are not proxied through the client.
    pub fn document_download_url(&self, opportunity_id: i64, document_id: i64) -> String {
        self.url(&format!(
            "{BASE}/opportunities/{opportunity_id}/documents/{document_id}/download"
        ))
    }

    pub fn delete_document(&mut self, opportunity_id: i64, document_id: i64) -> Result<()> {
        self.delete_discard(&format!(
            "{BASE}/opportunities/{opportunity_id}/documents/{document_id}"
        ))
    }

    // -- subscriptions -------------------------------------------------------

    pub fn subscribe(&mut self, opportunity_id: i64, input: &SubscriptionInput) -> Result<Subscription> {
        self.post(&format!("{BASE}/opportunities/{opportunity_id}/subscribe"), input)
    }

    pub fn my_subscriptions(&mut self) -> Result<Vec<Subscription>> {
        self.get(&format!("{BASE}/subscriptions"))
    }

    pub fn all_subscriptions(&mut self, opportunity_id: Option<i64>) -> Result<Vec<Subscription>> {
        self.get_with(
            &format!("{BASE}/subscriptions/all"),
            &OpportunityFilter { opportunity_id },
        )
    }

    pub fn update_subscription(&mut self, id: i64, update: &SubscriptionUpdate) -> Result<Subscription> {
        self.patch(&format!("{BASE}/subscriptions/{id}"), update)
    }

    pub fn convert_to_investment(&mut self, id: i64, data: &ConvertToInvestment) -> Result<Investment> {
        self.post(&format!("{BASE}/subscriptions/{id}/convert-to-investment"), data)
    }

    // -- invitations ---------------------------------------------------------

    pub fn create_invitation(&mut self, email: &str) -> Result<Invitation> {
        self.post(
            &format!("{BASE}/invitations"),
            &serde_json::json!({ "email": email }),
        )
    }

    pub fn invitations(&mut self) -> Result<Vec<Invitation>> {
        self.get(&format!("{BASE}/invitations"))
    }

    // -- investments ---------------------------------------------------------

    pub fn investments(&mut self, filter: &InvestmentFilter) -> Result<Vec<Investment>> {
        self.get_with(&format!("{BASE}/investments"), filter)
    }

    pub fn investment(&mut self, id: i64) -> Result<Investment> {
        self.get(&format!("{BASE}/investments/{id}"))
    }

    pub fn create_investment(&mut self, input: &InvestmentInput) -> Result<Investment> {
        self.post(&format!("{BASE}/investments"), input)
    }

    pub fn update_investment(&mut self, id: i64, input: &InvestmentInput) -> Result<Investment> {
        self.put(&format!("{BASE}/investments/{id}"), input)
    }

    pub fn delete_investment(&mut self, id: i64) -> Result<()> {
        self.delete_discard(&format!("{BASE}/investments/{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::serve_once;
    use super::*;
    use crate::session::{MemorySession, SessionContext, TerminalNavigator};

    fn client(url: &str, session: MemorySession, route: &str) -> ApiClient {
        ApiClient::new(url)
            .unwrap()
            .with_session(Box::new(session), Box::new(TerminalNavigator::new(route)))
    }

    #[test]
    fn test_login_stores_token() {
        let (url, handle) = serve_once(200, r#"{"access_token": "jwt-1", "token_type": "bearer"}"#);
        let mut api = client(&url, MemorySession::new(), "/portfolio/login");
        api.login("ada@example.org", "pw&1").unwrap();
        assert_eq!(api.session().unwrap().token().as_deref(), Some("jwt-1"));
        let request = handle.join().unwrap();
        assert!(request.contains("application/x-www-form-urlencoded"));
        assert!(request.ends_with("username=ada%40example.org&password=pw%261"));
    }

    #[test]
    fn test_failed_login_keeps_message() {
        let (url, handle) = serve_once(401, r#"{"detail": "Incorrect email or password"}"#);
        let mut api = client(&url, MemorySession::new(), "/portfolio/login");
        let err = api.login("ada@example.org", "nope").unwrap_err();
        handle.join().unwrap();
        assert_eq!(err.to_string(), "Incorrect email or password");
    }

    #[test]
    fn test_me_caches_user() {
        let (url, handle) = serve_once(
            200,
            r#"{"id": 9, "email": "ada@example.org", "full_name": null, "is_admin": true, "is_active": true}"#,
        );
        let mut api = client(&url, MemorySession::with_token("t"), "/portfolio");
        let user = api.me().unwrap();
        handle.join().unwrap();
        assert!(user.is_admin);
        assert_eq!(api.session().unwrap().user().unwrap().id, 9);
    }

    #[test]
    fn test_logout_is_local() {
        let mut api = client("http://127.0.0.1:9", MemorySession::with_token("t"), "/portfolio");
        api.logout().unwrap();
        assert!(api.session().unwrap().token().is_none());
    }

    #[test]
    fn test_investment_filters() {
        let (url, handle) = serve_once(200, "[]");
        let mut api = client(&url, MemorySession::with_token("t"), "/portfolio/investments");
        let filter = InvestmentFilter {
            portfolio_id: Some(2),
            opportunity_id: None,
            status: Some("active".into()),
        };
        api.investments(&filter).unwrap();
        let request = handle.join().unwrap();
        assert!(request.starts_with("GET /api/portfolio/investments?portfolio_id=2&status=active "));
    }

    #[test]
    fn test_opportunities_without_status() {
        let (url, handle) = serve_once(200, "[]");
        let mut api = client(&url, MemorySession::with_token("t"), "/portfolio/opportunities");
        api.opportunities(None).unwrap();
        let request = handle.join().unwrap();
        assert!(request.starts_with("GET /api/portfolio/opportunities HTTP/1.1"));
    }

    #[test]
    fn test_download_url() {
        let api = client("http://books.local:8000/", MemorySession::new(), "/portfolio");
        assert_eq!(
            api.document_download_url(3, 11),
            "http://books.local:8000/api/portfolio/opportunities/3/documents/11/download"
        );
    }
}
