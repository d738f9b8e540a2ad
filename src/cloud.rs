use crate::auth::{SIGNATURE_HEADER, sign_body};
use crate::errors::CloudError;
use crate::model::{Operation, RowError};
use crate::ops::format_errors;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Request body every workflow endpoint accepts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
}

/// A successful endpoint reply. The count field name depends on the operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub errors_by_row: Vec<RowError>,
    #[serde(default)]
    pub skipped_not_ready: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CloudResponse {
    pub fn count(&self, op: Operation) -> usize {
        self.extra
            .get(op.count_field())
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize
    }

    /// The single alert for this reply.
    pub fn render_alert(&self, op: Operation) -> String {
        if !self.errors_by_row.is_empty() {
            return format_errors(&self.errors_by_row, self.count(op), op, self.dry_run);
        }
        match self.message.as_deref().filter(|m| !m.is_empty()) {
            Some(message) => message.to_string(),
            None => format!("{} completed.", op.action_label()),
        }
    }
}

pub fn format_cloud_error(action: &str, err: &anyhow::Error) -> String {
    format!("{action} failed. {err:#}")
}

/// Runs workflow actions on a remote endpoint server.
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: String,
    hmac_secret: Option<String>,
}

impl CloudClient {
    pub fn new(base_url: &str, hmac_secret: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            hmac_secret: hmac_secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// POST `body` as JSON to `endpoint`, signed when a secret is configured.
    pub async fn call_endpoint<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<Value> {
        let url = self.endpoint_url(endpoint);
        let payload = serde_json::to_vec(body)?;
        let mut request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(secret) = self.hmac_secret.as_deref() {
            request = request.header(SIGNATURE_HEADER, sign_body(secret, &payload)?);
        }
        debug!(url = %url, "calling cloud endpoint");
        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|e| CloudError::new(format!("Request to {url} failed: {e}")))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| {
                CloudError::new(format!("Failed to read cloud API response: {e}")).with_status(status)
            })?;
        let data: Value = if text.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(&text).map_err(|_| {
                CloudError::new(format!("Invalid JSON from cloud API ({status})."))
                    .with_status(status)
            })?
        };

        if status >= 400 {
            let text_field = |key: &str| {
                data.get(key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            let mut message = text_field("error")
                .or_else(|| text_field("message"))
                .unwrap_or_else(|| format!("HTTP {status} from cloud API."));
            let details = data.get("details").filter(|d| !d.is_null()).cloned();
            if let Some(details) = details.as_ref() {
                message.push_str(&format!(" Details: {details}"));
            }
            let mut err = CloudError::new(message).with_status(status);
            if let Some(details) = details {
                err = err.with_details(details);
            }
            warn!(status, url = %url, "cloud endpoint returned an error");
            return Err(err.into());
        }
        Ok(data)
    }

    /// Run a workflow operation remotely.
    pub async fn run_operation(&self, op: Operation, dry_run: bool) -> Result<CloudResponse> {
        let data = self
            .call_endpoint(op.endpoint(), &OperationRequest { dry_run })
            .await?;
        let mut response: CloudResponse = serde_json::from_value(data)
            .map_err(|e| CloudError::new(format!("Unexpected cloud API response: {e}")))?;
        // `dryRun` is optional in replies.
        response.dry_run |= dry_run;
        Ok(response)
    }
}
