//! PostgREST-style HTTP transport.

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::sync::transport::{Filter, RemoteTransport};

/// Longest error-body excerpt quoted in a transport error message.
const ERROR_BODY_LIMIT: usize = 180;

/// Production transport against the backend's REST endpoint.
///
/// Scoped to one authenticated session: the bearer token is fixed at
/// construction, and callers rebuild the transport after a token refresh.
#[derive(Clone)]
pub struct RestTransport {
    config: BackendConfig,
    access_token: String,
    client: Client,
}

impl RestTransport {
    pub fn new(config: BackendConfig, access_token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            config,
            access_token: access_token.into(),
            client: Client::builder().build()?,
        })
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn check_status(collection: &str, response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Transport(format!(
            "{collection}: {}",
            parse_api_error(status, &body)
        )))
    }
}

impl RemoteTransport for RestTransport {
    async fn select(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let query: Vec<(&str, String)> = filters.iter().map(Filter::to_query_pair).collect();
        let response = self
            .request(reqwest::Method::GET, self.config.rest_url(collection))
            .query(&query)
            .send()
            .await?;
        let response = Self::check_status(collection, response).await?;

        let rows = response.json::<Vec<Value>>().await?;
        Ok(rows)
    }

    async fn insert(&self, collection: &str, record: &Value) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, self.config.rest_url(collection))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        Self::check_status(collection, response).await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<()> {
        let response = self
            .request(reqwest::Method::PATCH, self.config.rest_url(collection))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        Self::check_status(collection, response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RestErrorBody {
    message: Option<String>,
    hint: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<RestErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.hint) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        let excerpt: String = trimmed.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{excerpt} ({})", status.as_u16())
    }
}
