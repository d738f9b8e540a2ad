use anyhow::Result;
use tracing::info;

use crate::cli::CommandOutput;
use crate::cloud::CloudClient;
use crate::config::RegistryConfig;
use crate::lock::DocumentLock;
use crate::model::Operation;
use crate::ops::run_operation;
use crate::workbook::XlsxWorkbook;

pub fn run_local(config: &RegistryConfig, op: Operation, dry_run: bool) -> Result<CommandOutput> {
    let path = config.require_workbook()?;
    let doc = DocumentLock::with_timeout(XlsxWorkbook::open(path)?, config.lock_timeout);
    let report = run_operation(op, &doc, &config.operation_context(dry_run))?;
    Ok(CommandOutput {
        summary: report.summary(),
        payload: serde_json::to_value(&report)?,
    })
}

pub async fn run_remote(
    config: &RegistryConfig,
    url: &str,
    op: Operation,
    dry_run: bool,
) -> Result<CommandOutput> {
    let client = CloudClient::new(url, config.cloud_secret.clone());
    let response = client.run_operation(op, dry_run).await?;
    info!(operation = %op, count = response.count(op), "remote operation finished");
    Ok(CommandOutput {
        summary: response.render_alert(op),
        payload: serde_json::to_value(&response)?,
    })
}
