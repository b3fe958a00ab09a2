use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::error::{Error, Result};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A proxied media file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub content_type: String,
    pub content_length: u64,
    pub content_disposition: String,
    pub bytes: Vec<u8>,
}

pub fn asset_filename(block_id: &str) -> String {
    format!("block-{block_id}")
}

pub fn content_disposition(block_id: &str) -> String {
    format!("inline; filename=\"{}\"", asset_filename(block_id))
}

/// Fetch `asset_url` on behalf of block `block_id`.
pub async fn fetch_asset(http: &reqwest::Client, asset_url: &str, block_id: &str) -> Result<Asset> {
    if asset_url.trim().is_empty() || block_id.trim().is_empty() {
        return Err(Error::MissingAssetParams);
    }
    let url = Url::parse(asset_url).map_err(|source| Error::InvalidUrl {
        url: asset_url.to_string(),
        source,
    })?;

    let response = http.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("Error fetching asset {asset_url}: HTTP {status}");
        return Err(Error::Api {
            status: status.as_u16(),
            url: asset_url.to_string(),
            body,
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string();
    let declared_length = response.content_length();
    let bytes = response.bytes().await?.to_vec();

    Ok(Asset {
        content_type,
        content_length: declared_length.unwrap_or(bytes.len() as u64),
        content_disposition: content_disposition(block_id),
        bytes,
    })
}
