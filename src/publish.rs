use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, info};

pub const PUBLISH_TOKEN_HEADER: &str = "X-Publish-Token";

const BODY_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct PublishResponse {
    pub status: String,
    pub rows: Option<u64>,
    pub seconds: Option<f64>,
    pub message: Option<String>,
}

impl PublishResponse {
    pub fn render_alert(&self) -> String {
        let rows = self
            .rows
            .map(|r| r.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!(
            "Publish complete ✅\n\nRows: {rows}\nSeconds: {:.2}",
            self.seconds.unwrap_or(0.0)
        )
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Ask the publish endpoint to refresh the public snapshot.
///
/// Errors carry only the reason; callers prefix `"Publish failed."`.
pub async fn publish_database(url: &str, token: &str) -> Result<PublishResponse> {
    let url = url.trim_end_matches('/');
    let response = reqwest::Client::new()
        .post(url)
        .header(PUBLISH_TOKEN_HEADER, token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .context("failed to read publish response")?;
    debug!(status = status.as_u16(), "publish endpoint replied");
    if !status.is_success() {
        bail!("HTTP {}. Body: {}", status.as_u16(), preview(&text));
    }
    let data: PublishResponse = serde_json::from_str(&text)
        .map_err(|_| anyhow::anyhow!("Response was not JSON. Body: {}", preview(&text)))?;
    if data.status != "success" {
        bail!(
            "{}",
            data.message
                .clone()
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        );
    }
    info!(rows = ?data.rows, seconds = ?data.seconds, "database published");
    Ok(data)
}
