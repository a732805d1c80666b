//! Low-level client for the Neo4j HTTP transactional API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Graph-store connection configuration. Read-only after construction.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Neo4j HTTP endpoint base URL.
    #[serde(default = "default_http_url")]
    pub http_url: String,
    /// Database name.
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_http_url() -> String {
    "http://localhost:7474".into()
}
fn default_database() -> String {
    "facilities".into()
}
fn default_user() -> String {
    "neo4j".into()
}
fn default_password() -> String {
    "password".into()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            http_url: default_http_url(),
            database: default_database(),
            user: default_user(),
            password: default_password(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GraphConfig {
    /// Load configuration from `NEO4J_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_url: std::env::var("NEO4J_HTTP_URL").unwrap_or(defaults.http_url),
            database: std::env::var("NEO4J_DATABASE").unwrap_or(defaults.database),
            user: std::env::var("NEO4J_USER").unwrap_or(defaults.user),
            password: std::env::var("NEO4J_PASSWORD").unwrap_or(defaults.password),
            timeout_secs: std::env::var("NEO4J_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct TxRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: &'a Map<String, Value>,
}

#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxDatum>,
}

#[derive(Deserialize)]
struct TxDatum {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct TxError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Client issuing single auto-commit transactions against
/// `POST /db/{database}/tx/commit`.
pub struct Neo4jHttpClient {
    client: reqwest::Client,
    config: GraphConfig,
}

impl Neo4jHttpClient {
    pub fn new(config: GraphConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build reqwest client");
        Self { client, config }
    }

    /// Execute one parameterized read query; each result row is mapped
    /// from column names to values.
    pub async fn execute(
        &self,
        statement: &str,
        parameters: &Map<String, Value>,
    ) -> StoreResult<Vec<Map<String, Value>>> {
        let url = format!(
            "{}/db/{}/tx/commit",
            self.config.http_url, self.config.database
        );
        let body = TxRequest {
            statements: vec![Statement {
                statement,
                parameters,
            }],
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
            });
        }

        let parsed: TxResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Shape(format!("invalid transaction response: {e}")))?;

        if let Some(err) = parsed.errors.into_iter().next() {
            return Err(StoreError::Query {
                code: err.code,
                message: err.message,
            });
        }

        let result = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Shape("response contains no result set".into()))?;

        let rows = result
            .data
            .into_iter()
            .map(|datum| {
                result
                    .columns
                    .iter()
                    .cloned()
                    .zip(datum.row)
                    .collect::<Map<String, Value>>()
            })
            .collect();
        Ok(rows)
    }
}
