use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::config::{Credentials, NotionConfig};
use crate::error::{Error, Result};
use crate::notion::{self, BlockPage};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
}

/// The content API calls the blog needs
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Query the posts database (single round trip)
    async fn query_database(&self) -> Result<Value>;

    /// One page of a block's children
    async fn list_block_children(&self, block_id: &str, cursor: Option<&str>) -> Result<BlockPage>;

    async fn retrieve_user(&self, user_id: &str) -> Result<User>;
}

/// Notion REST client
pub struct NotionClient {
    http: reqwest::Client,
    api_base: String,
    version: String,
    page_size: u32,
    credentials: Credentials,
}

impl NotionClient {
    pub fn new(config: &NotionConfig, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            version: config.version.clone(),
            page_size: config.page_size,
            credentials,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.api_base, path);
        Url::parse(&raw).map_err(|source| Error::InvalidUrl { url: raw, source })
    }

    fn database_query_url(&self) -> Result<Url> {
        self.url(&format!("databases/{}/query", self.credentials.database_id))
    }

    fn block_children_url(&self, block_id: &str, cursor: Option<&str>) -> Result<Url> {
        let mut url = self.url(&format!("blocks/{block_id}/children"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page_size", &self.page_size.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("start_cursor", cursor);
            }
        }
        Ok(url)
    }

    fn user_url(&self, user_id: &str) -> Result<Url> {
        self.url(&format!("users/{user_id}"))
    }

    /// Send an authenticated request and decode the JSON body
    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Value> {
        let response = request
            .bearer_auth(&self.credentials.api_key)
            .header("Notion-Version", &self.version)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                url: url.to_string(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ContentApi for NotionClient {
    async fn query_database(&self) -> Result<Value> {
        let url = self.database_query_url()?;
        log::debug!("POST {url}");
        self.send(self.http.post(url.clone()).json(&json!({})), &url)
            .await
    }

    async fn list_block_children(&self, block_id: &str, cursor: Option<&str>) -> Result<BlockPage> {
        let url = self.block_children_url(block_id, cursor)?;
        log::debug!("GET {url}");
        let value = self.send(self.http.get(url.clone()), &url).await?;
        notion::parse_block_page(value)
    }

    async fn retrieve_user(&self, user_id: &str) -> Result<User> {
        let url = self.user_url(user_id)?;
        log::debug!("GET {url}");
        let value = self.send(self.http.get(url.clone()), &url).await?;
        Ok(serde_json::from_value(value)?)
    }
}
