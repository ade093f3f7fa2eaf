//! telegra.ph publishing boundary
//!
//! Telegraph pages are created from a DOM-like node tree, not raw HTML, so
//! this module also carries the conversion from the small markup subset the
//! HTML renderer emits into Telegraph nodes.

pub mod nodes;

pub use nodes::{html_to_nodes, Node};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const API_BASE: &str = "https://api.telegra.ph";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait PagePublisher: Send + Sync {
    /// Publish an HTML fragment as a page and return its public URL.
    async fn create_page(
        &self,
        title: &str,
        author_name: &str,
        author_url: &str,
        html: &str,
    ) -> Result<String>;
}

pub struct TelegraphClient {
    client: Client,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Account {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Page {
    path: String,
}

fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("banlog/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .context("failed to build HTTP client for telegra.ph")
}

fn into_result<T>(response: ApiResponse<T>) -> Result<T> {
    if !response.ok {
        bail!(
            "telegra.ph API error: {}",
            response.error.unwrap_or_else(|| "unknown".to_string())
        );
    }
    response
        .result
        .ok_or_else(|| anyhow::anyhow!("telegra.ph API returned ok without a result"))
}

impl TelegraphClient {
    pub fn new(access_token: &str) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            access_token: access_token.to_string(),
        })
    }

    /// Mint a new account and return its access token. This is a one-time
    /// step; the operator persists the token in the configuration file.
    pub async fn create_account(
        short_name: &str,
        author_name: &str,
        author_url: &str,
    ) -> Result<String> {
        let client = build_client()?;
        let response: ApiResponse<Account> = client
            .post(format!("{API_BASE}/createAccount"))
            .form(&[
                ("short_name", short_name),
                ("author_name", author_name),
                ("author_url", author_url),
            ])
            .send()
            .await
            .context("telegra.ph createAccount request failed")?
            .json()
            .await
            .context("failed to decode telegra.ph createAccount response")?;

        Ok(into_result(response)?.access_token)
    }
}

#[async_trait]
impl PagePublisher for TelegraphClient {
    async fn create_page(
        &self,
        title: &str,
        author_name: &str,
        author_url: &str,
        html: &str,
    ) -> Result<String> {
        let content = serde_json::to_string(&html_to_nodes(html))
            .context("failed to encode telegra.ph page content")?;

        let response: ApiResponse<Page> = self
            .client
            .post(format!("{API_BASE}/createPage"))
            .form(&[
                ("access_token", self.access_token.as_str()),
                ("title", title),
                ("author_name", author_name),
                ("author_url", author_url),
                ("content", content.as_str()),
                ("return_content", "false"),
            ])
            .send()
            .await
            .context("telegra.ph createPage request failed")?
            .json()
            .await
            .context("failed to decode telegra.ph createPage response")?;

        let page = into_result(response)?;
        Ok(format!("https://telegra.ph/{}", page.path))
    }
}
