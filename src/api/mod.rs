pub mod books;
pub mod portfolio;

use log::{debug, warn};
use reqwest::blocking::{multipart, Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SsrfError};
use crate::session::{handle_unauthorized, Navigator, SessionContext};

struct Auth {
    session: Box<dyn SessionContext>,
    navigator: Box<dyn Navigator>,
}

/// Thin REST client: every request goes through [`ApiClient::execute`], which
/// attaches the bearer token, turns failures into [`SsrfError`] and applies
/// the 401 policy.
pub struct ApiClient {
    base_url: String,
    http: Client,
    auth: Option<Auth>,
}

impl ApiClient {
    /// Requests wait for the server as long as it takes; there is no client
    /// side timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder().timeout(None).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            auth: None,
        })
    }

    /// Enable bearer auth backed by `session`; `navigator` receives the
    /// redirect when the server rejects the token.
    pub fn with_session(
        mut self,
        session: Box<dyn SessionContext>,
        navigator: Box<dyn Navigator>,
    ) -> Self {
        self.auth = Some(Auth { session, navigator });
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> Option<&dyn SessionContext> {
        self.auth.as_ref().map(|a| a.session.as_ref())
    }

    pub fn session_mut(&mut self) -> Option<&mut (dyn SessionContext + 'static)> {
        self.auth.as_mut().map(|a| a.session.as_mut())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // -- verbs ---------------------------------------------------------------

    pub fn get<T: DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        let req = self.http.get(self.url(path));
        self.execute(req)
    }

    pub fn get_with<Q: Serialize, T: DeserializeOwned>(&mut self, path: &str, query: &Q) -> Result<T> {
        let req = self.http.get(self.url(path)).query(query);
        self.execute(req)
    }

    pub fn post<B: Serialize, T: DeserializeOwned>(&mut self, path: &str, body: &B) -> Result<T> {
        let req = self.http.post(self.url(path)).json(body);
        self.execute(req)
    }

    pub fn put<B: Serialize, T: DeserializeOwned>(&mut self, path: &str, body: &B) -> Result<T> {
        let req = self.http.put(self.url(path)).json(body);
        self.execute(req)
    }

    pub fn patch<B: Serialize, T: DeserializeOwned>(&mut self, path: &str, body: &B) -> Result<T> {
        let req = self.http.patch(self.url(path)).json(body);
        self.execute(req)
    }

    pub fn delete<T: DeserializeOwned>(&mut self, path: &str) -> Result<T> {
        let req = self.http.delete(self.url(path));
        self.execute(req)
    }

    /// DELETE where the body is irrelevant.
    pub fn delete_discard(&mut self, path: &str) -> Result<()> {
        let req = self.http.delete(self.url(path));
        self.execute::<serde_json::Value>(req).map(|_| ())
    }

    pub fn post_multipart<T: DeserializeOwned>(&mut self, path: &str, form: multipart::Form) -> Result<T> {
        let req = self.http.post(self.url(path)).multipart(form);
        self.execute(req)
    }

    pub fn post_form<T: DeserializeOwned>(&mut self, path: &str, fields: &[(&str, &str)]) -> Result<T> {
        let req = self.http.post(self.url(path)).form(fields);
        self.execute(req)
    }

    // -- core ----------------------------------------------------------------

    fn execute<T: DeserializeOwned>(&mut self, mut req: RequestBuilder) -> Result<T> {
        if let Some(token) = self.auth.as_ref().and_then(|a| a.session.token()) {
            req = req.bearer_auth(token);
        }
        let req = req.build()?;
        debug!("{} {}", req.method(), req.url().path());

        let resp = self.http.execute(req).map_err(|e| {
            debug!("transport failure: {e}");
            SsrfError::NoResponse
        })?;

        let status = resp.status();
        let body = resp.text().map_err(|e| {
            debug!("failed reading body: {e}");
            SsrfError::NoResponse
        })?;

        if status.is_success() {
            let text = if body.trim().is_empty() { "null" } else { body.as_str() };
            return Ok(serde_json::from_str(text)?);
        }

        warn!("server answered {status}");
        if status == StatusCode::UNAUTHORIZED {
            if let Some(auth) = self.auth.as_mut() {
                handle_unauthorized(auth.session.as_mut(), auth.navigator.as_mut())?;
            }
            return Err(match server_detail(&body) {
                Some(message) => SsrfError::Server {
                    status: status.as_u16(),
                    message,
                },
                None => SsrfError::Unauthorized,
            });
        }
        Err(SsrfError::Server {
            status: status.as_u16(),
            message: error_message(status.as_u16(), &body),
        })
    }
}

/// `detail` (string or validation list) or `message` from an error body.
fn server_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail") {
        Some(serde_json::Value::String(s)) => return Some(s.clone()),
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<String> = items
                .iter()
                .map(|i| match i.get("msg").and_then(|m| m.as_str()) {
                    Some(m) => m.to_string(),
                    None => i.to_string(),
                })
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

pub fn error_message(status: u16, body: &str) -> String {
    server_detail(body).unwrap_or_else(|| format!("Server error: {status}"))
}
