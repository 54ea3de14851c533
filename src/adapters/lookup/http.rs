//! HTTP lookup client
//!
//! Queries a FOLIO-style REST module with CQL:
//!
//! ```text
//! GET {base_url}/{endpoint}?query=barcode=="111"&limit=100
//! X-Okapi-Tenant: diku
//! ```
//!
//! The response is a JSON object holding the matched records under the
//! collection key (`{"items": [...], "totalRecords": 1}`).

use super::{group_by_value, LookupClient, LookupTarget};
use crate::config::LookupConfig;
use crate::domain::{LookupError, Result, ShelfportError};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

const TENANT_HEADER: &str = "X-Okapi-Tenant";
const TOKEN_HEADER: &str = "X-Okapi-Token";

/// Lookup client for a REST lookup service
pub struct HttpLookupClient {
    base_url: String,
    client: Client,
    tenant: String,
    auth_header: Option<String>,
    token: Option<String>,
    page_limit: usize,
}

impl HttpLookupClient {
    /// Build a client from the lookup section
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds.min(30)))
            .build()
            .map_err(|e| {
                ShelfportError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        let auth_header = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                let credentials = format!("{username}:{}", password.expose_secret());
                let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
                Some(format!("Basic {encoded}"))
            }
            _ => None,
        };

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            tenant: config.tenant.clone().unwrap_or_default(),
            auth_header,
            token: config.token.as_ref().map(|t| t.expose_secret().to_string()),
            page_limit: config.page_limit,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn query(
        &self,
        target: &LookupTarget,
        cql: &str,
    ) -> std::result::Result<Vec<Value>, LookupError> {
        let url = format!("{}/{}", self.base_url, target.endpoint.trim_start_matches('/'));
        tracing::debug!(url = %url, query = %cql, "Querying lookup service");

        let limit = self.page_limit.to_string();
        let mut request = self
            .client
            .get(&url)
            .query(&[("query", cql), ("limit", limit.as_str())])
            .header(TENANT_HEADER, &self.tenant)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }
        if let Some(auth) = &self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout(format!("{url}: {e}"))
            } else {
                LookupError::Unavailable(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LookupError::InvalidResponse(format!("{url}: {e}")))?;
        extract_collection(body, &target.collection)
    }
}

#[async_trait]
impl LookupClient for HttpLookupClient {
    async fn find(
        &self,
        target: &LookupTarget,
        field: &str,
        value: &str,
    ) -> std::result::Result<Vec<Value>, LookupError> {
        self.query(target, &format!("{field}=={}", cql_quote(value)))
            .await
    }

    async fn find_batch(
        &self,
        target: &LookupTarget,
        field: &str,
        values: &[String],
    ) -> std::result::Result<HashMap<String, Vec<Value>>, LookupError> {
        if values.is_empty() {
            return Ok(HashMap::new());
        }

        let terms: Vec<String> = values.iter().map(|v| cql_quote(v)).collect();
        let cql = format!("{field}==({})", terms.join(" or "));
        let entities = self.query(target, &cql).await?;

        // A full page may have dropped matches
        if entities.len() >= self.page_limit {
            return Err(LookupError::InvalidResponse(format!(
                "batch lookup returned {} records, the page limit; results may be truncated",
                entities.len()
            )));
        }

        Ok(group_by_value(entities, field, values))
    }
}

impl std::fmt::Debug for HttpLookupClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLookupClient")
            .field("base_url", &self.base_url)
            .field("tenant", &self.tenant)
            .field("page_limit", &self.page_limit)
            .finish_non_exhaustive()
    }
}

fn classify_status(status: StatusCode, body: String) -> LookupError {
    let message = if body.is_empty() {
        status.canonical_reason().unwrap_or("no reason").to_string()
    } else {
        body
    };
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            LookupError::Timeout(format!("{status}: {message}"))
        }
        StatusCode::TOO_MANY_REQUESTS => LookupError::Unavailable(format!("{status}: {message}")),
        s if s.is_server_error() => LookupError::Unavailable(format!("{status}: {message}")),
        s => LookupError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

fn extract_collection(
    body: Value,
    collection: &str,
) -> std::result::Result<Vec<Value>, LookupError> {
    match body {
        Value::Object(mut map) => match map.remove(collection) {
            Some(Value::Array(records)) => Ok(records),
            Some(_) => Err(LookupError::InvalidResponse(format!(
                "'{collection}' is not an array"
            ))),
            None => Err(LookupError::InvalidResponse(format!(
                "response has no '{collection}' collection"
            ))),
        },
        _ => Err(LookupError::InvalidResponse(
            "response is not a JSON object".to_string(),
        )),
    }
}

/// Quote a value as a CQL string, escaping CQL special characters
pub fn cql_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '*' | '?' | '^') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
