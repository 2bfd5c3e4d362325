//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}", port)
}

/// Error body returned by the daemon for any failed request.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

async fn decode<R: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<R> {
    let status = resp.status();
    if !status.is_success() {
        match resp.json::<ErrorBody>().await {
            Ok(body) => bail!("{} ({}, HTTP {})", body.error, body.code, status.as_u16()),
            Err(_) => bail!("request failed with HTTP {}", status.as_u16()),
        }
    }
    resp.json::<R>().await.context("failed to parse response")
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to livecastd at {}; is it running?", url))?;
    decode(resp).await
}

pub async fn post_json_body<T, R>(url: &str, body: &T) -> Result<R>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to livecastd at {}; is it running?", url))?;
    decode(resp).await
}
