use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::CommandOutput;
use crate::config::RegistryConfig;
use crate::publish::publish_database;

pub async fn publish(config: &RegistryConfig) -> Result<CommandOutput> {
    let url = config
        .publish_url
        .as_deref()
        .context("no publish URL configured; pass --publish-url or set MM_REGISTRY_PUBLISH_URL")?;
    let token = config.publish_token.as_deref().context(
        "no publish token configured; pass --publish-token or set MM_REGISTRY_PUBLISH_TOKEN",
    )?;
    let response = publish_database(url, token).await?;
    Ok(CommandOutput {
        summary: response.render_alert(),
        payload: json!({
            "status": response.status,
            "rows": response.rows,
            "seconds": response.seconds,
        }),
    })
}
