//! HTTP proxy accessor for the WordPress database.
//!
//! For hosts that don't expose MySQL, queries are posted to a site-side
//! endpoint (`/wp-json/custom/v1/sql-query`) that runs them and returns the
//! result rows as json. Authentication is HTTP Basic with an application
//! password.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use tracing::debug;

use super::{Row, SourceQueryError, WpSource};

const QUERY_PATH: &str = "/wp-json/custom/v1/sql-query";

pub struct HttpSource {
    client: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Option<Vec<JsonValue>>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpSource {
    pub fn new(
        site_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceQueryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SourceQueryError::new(format!("http client build failed: {err}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}{QUERY_PATH}", site_url.trim_end_matches('/')),
            username: username.into(),
            password: password.into(),
        })
    }
}

#[async_trait]
impl WpSource for HttpSource {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>, SourceQueryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(&json!({ "sql": sql }))
            .send()
            .await
            .map_err(|err| SourceQueryError::new(format!("wordpress proxy request failed: {err}")))?;

        let status = response.status();
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|err| SourceQueryError::new(format!("wordpress proxy returned invalid json: {err}")))?;

        // The proxy reports query errors in-band as {"code", "message"}.
        if let Some(code) = body.code {
            let message = body.message.unwrap_or_default();
            return Err(SourceQueryError::new(format!(
                "wordpress proxy error {code}: {message}"
            )));
        }
        if !status.is_success() {
            return Err(SourceQueryError::new(format!(
                "wordpress proxy returned status {status}"
            )));
        }

        let rows = body.result.unwrap_or_default();
        debug!(rows = rows.len(), "wordpress proxy query returned");
        rows.into_iter()
            .map(|value| match value {
                JsonValue::Object(object) => Ok(Row::from_json_object(&object)),
                other => Err(SourceQueryError::new(format!(
                    "wordpress proxy returned a non-object row: {other}"
                ))),
            })
            .collect()
    }
}
