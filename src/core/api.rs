use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use url::Url;

use crate::core::models::{
    EmailId, EmailRecord, Mutation, ProcessOutcome, ProcessRequest, SpamVerdict,
};

/// Failure talking to the dashboard backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Invalid(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Request/response operations against the backend.
///
/// Implemented by [`ApiClient`] over HTTP; tests substitute an in-memory fake.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// `GET /emails`.
    async fn fetch_snapshot(&self) -> Result<Vec<EmailRecord>, ApiError>;

    /// One workflow request for one id. Returns the record echoed back by the
    /// server, when the body carries one.
    async fn mutate(
        &self,
        mutation: Mutation,
        id: EmailId,
    ) -> Result<Option<EmailRecord>, ApiError>;

    /// `POST /test-spam`.
    async fn test_spam(&self, text: &str) -> Result<SpamVerdict, ApiError>;

    /// `POST /run-email-processor`.
    async fn run_processor(&self, request: &ProcessRequest) -> Result<ProcessOutcome, ApiError>;
}

/// HTTP client for the dashboard backend. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: String) -> Result<Self, ApiError> {
        let base = normalize_base(base_url)?;
        let http = Client::builder()
            .user_agent(concat!("mailguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(format!("client init: {e}")))?;
        Ok(ApiClient { http, base, token })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Invalid(format!("bad endpoint {path}: {e}")))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, ApiError> {
        let url = self.endpoint(path)?;
        log::debug!("{} {}", method, url);
        let mut req = self.http.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(resp)
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn fetch_snapshot(&self) -> Result<Vec<EmailRecord>, ApiError> {
        let resp = self.send(Method::GET, "emails", None).await?;
        let body: serde_json::Value = resp.json().await?;
        decode_snapshot(body)
    }

    async fn mutate(
        &self,
        mutation: Mutation,
        id: EmailId,
    ) -> Result<Option<EmailRecord>, ApiError> {
        let (method, path) = mutation_route(mutation, id);
        let resp = self.send(method, &path, None).await?;
        if mutation == Mutation::Delete {
            return Ok(None);
        }
        // Status is authoritative; the echoed record is best effort.
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice::<EmailRecord>(&bytes)
            .ok()
            .filter(|r| r.id == id))
    }

    async fn test_spam(&self, text: &str) -> Result<SpamVerdict, ApiError> {
        validate_spam_text(text)?;
        let body = serde_json::json!({ "text": text });
        let resp = self.send(Method::POST, "test-spam", Some(body)).await?;
        Ok(resp.json().await?)
    }

    async fn run_processor(&self, request: &ProcessRequest) -> Result<ProcessOutcome, ApiError> {
        request.validate().map_err(ApiError::Invalid)?;
        let body = serde_json::to_value(request).map_err(|e| ApiError::Invalid(e.to_string()))?;
        let resp = self
            .send(Method::POST, "run-email-processor", Some(body))
            .await?;
        let outcome: ProcessOutcome = resp.json().await?;
        if outcome.success {
            Ok(outcome)
        } else {
            Err(ApiError::Rejected(
                outcome
                    .message
                    .unwrap_or_else(|| "Failed to process emails".into()),
            ))
        }
    }
}

/// Method and relative path for a workflow request.
pub fn mutation_route(mutation: Mutation, id: EmailId) -> (Method, String) {
    match mutation {
        Mutation::MarkImportant => (Method::PUT, format!("emails/{id}/mark-important")),
        Mutation::ToggleArchive => (Method::PUT, format!("emails/{id}/toggle-archive")),
        Mutation::ToggleRead => (Method::PUT, format!("emails/{id}/toggle-read")),
        Mutation::Delete => (Method::DELETE, format!("emails/{id}")),
    }
}

/// A body that is not a JSON array is an empty listing. Rows that do not
/// decode are skipped so one bad row does not hide the rest.
pub fn decode_snapshot(body: serde_json::Value) -> Result<Vec<EmailRecord>, ApiError> {
    match body {
        serde_json::Value::Array(rows) => Ok(rows
            .into_iter()
            .enumerate()
            .filter_map(|(i, row)| match serde_json::from_value::<EmailRecord>(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping snapshot row {}: {}", i, e);
                    None
                }
            })
            .collect()),
        other => {
            log::warn!("Snapshot body is not a list ({}), treating as empty", kind_of(&other));
            Ok(Vec::new())
        }
    }
}

pub fn validate_spam_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::Invalid("Please enter some text to analyze".into()));
    }
    Ok(())
}

/// Parse the base URL and make sure relative joins append to its path.
fn normalize_base(base_url: &str) -> Result<Url, ApiError> {
    let mut url =
        Url::parse(base_url).map_err(|e| ApiError::Invalid(format!("bad API URL: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn kind_of(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
