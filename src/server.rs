use crate::auth::{SIGNATURE_HEADER, verify_signature};
use crate::cloud::OperationRequest;
use crate::config::RegistryConfig;
use crate::errors::RequestError;
use crate::lock::DocumentLock;
use crate::model::Operation;
use crate::ops::{OperationContext, run_operation};
use crate::workbook::{Workbook, XlsxWorkbook};
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use strum::IntoEnumIterator;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub struct AppState<W> {
    doc: Arc<DocumentLock<W>>,
    context: Arc<OperationContext>,
    hmac_secret: Option<Arc<str>>,
}

impl<W> Clone for AppState<W> {
    fn clone(&self) -> Self {
        Self {
            doc: Arc::clone(&self.doc),
            context: Arc::clone(&self.context),
            hmac_secret: self.hmac_secret.clone(),
        }
    }
}

impl<W: Workbook + 'static> AppState<W> {
    pub fn new(
        doc: Arc<DocumentLock<W>>,
        context: OperationContext,
        hmac_secret: Option<String>,
    ) -> Self {
        Self {
            doc,
            context: Arc::new(context),
            hmac_secret: hmac_secret.map(Arc::from),
        }
    }
}

/// `GET /healthz` plus one `POST /<endpoint>` per operation, taking an
/// optional `{"dryRun": true}` body. With a secret configured the raw body
/// must be signed in `X-Signature`.
pub fn router<W: Workbook + 'static>(state: AppState<W>) -> Router {
    let mut router = Router::new().route("/healthz", get(healthz));
    for op in Operation::iter() {
        router = router.route(
            &format!("/{}", op.endpoint()),
            post(
                move |State(state): State<AppState<W>>, headers: HeaderMap, body: Bytes| {
                    handle_operation(op, state, headers, body)
                },
            ),
        );
    }
    router.with_state(state)
}

/// Open the configured workbook and serve until ctrl-c.
pub async fn serve(config: &RegistryConfig) -> Result<()> {
    let path = config.require_workbook()?;
    let workbook = XlsxWorkbook::open(path)?;
    if config.hmac_secret.is_none() {
        warn!("no HMAC secret configured; requests are accepted unsigned");
    }
    let state = AppState::new(
        Arc::new(DocumentLock::with_timeout(workbook, config.lock_timeout)),
        config.operation_context(false),
        config.hmac_secret.clone(),
    );

    let listener = TcpListener::bind(config.http_bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.http_bind_address))?;
    info!(addr = %config.http_bind_address, workbook = ?path, "endpoint server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}

async fn healthz() -> &'static str {
    "ok"
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "ok": false, "error": message }))).into_response()
}

fn parse_request(op: Operation, body: &[u8]) -> Result<OperationRequest, RequestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(OperationRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| RequestError::new(op.endpoint(), format!("Invalid request body: {e}")))
}

async fn handle_operation<W: Workbook + 'static>(
    op: Operation,
    state: AppState<W>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let endpoint = op.endpoint();
    info!(endpoint, "request received");

    if let Some(secret) = state.hmac_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if let Err(err) = verify_signature(secret, &body, signature) {
            warn!(endpoint, reason = err.message(), "request rejected");
            return error_response(StatusCode::FORBIDDEN, err.message());
        }
    }

    let request = match parse_request(op, &body) {
        Ok(request) => request,
        Err(err) => {
            warn!(endpoint = err.endpoint(), reason = err.message(), "bad request");
            return error_response(StatusCode::BAD_REQUEST, err.message());
        }
    };

    let doc = Arc::clone(&state.doc);
    let ctx = OperationContext::clone(&state.context).dry_run(request.dry_run);
    let outcome = tokio::task::spawn_blocking(move || run_operation(op, &doc, &ctx)).await;
    let response = match outcome {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(err)) => {
            error!(endpoint, error = %format!("{err:#}"), "operation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
        Err(join_err) => {
            error!(endpoint, error = %join_err, "operation task panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    };
    info!(
        endpoint,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request finished"
    );
    response
}
