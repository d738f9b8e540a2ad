use anyhow::Result;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use museum_registry::publish::{PUBLISH_TOKEN_HEADER, publish_database};
use tokio::net::TcpListener;

const TOKEN: &str = "publish-token";

/// Stub publish endpoint answering `reply` to a correct token and 401 otherwise.
async fn spawn_stub(status: StatusCode, reply: &'static str) -> Result<String> {
    let app = Router::new().route(
        "/publish",
        post(move |headers: HeaderMap| async move {
            let token = headers
                .get(PUBLISH_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok());
            if token != Some(TOKEN) {
                return (StatusCode::UNAUTHORIZED, "bad token".to_string());
            }
            (status, reply.to_string())
        }),
    );
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/publish"))
}

#[tokio::test]
async fn successful_publish_reports_rows_and_seconds() -> Result<()> {
    let url = spawn_stub(
        StatusCode::OK,
        r#"{"status":"success","rows":1520,"seconds":3.14159}"#,
    )
    .await?;
    let response = publish_database(&url, TOKEN).await?;
    assert_eq!(response.rows, Some(1520));
    assert_eq!(
        response.render_alert(),
        "Publish complete ✅\n\nRows: 1520\nSeconds: 3.14"
    );
    Ok(())
}

#[tokio::test]
async fn wrong_token_surfaces_status_and_body() -> Result<()> {
    let url = spawn_stub(StatusCode::OK, r#"{"status":"success"}"#).await?;
    let err = publish_database(&url, "nope").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 401. Body: bad token");
    Ok(())
}

#[tokio::test]
async fn non_json_and_failed_status_are_errors() -> Result<()> {
    let url = spawn_stub(StatusCode::OK, "<html>oops</html>").await?;
    let err = publish_database(&url, TOKEN).await.unwrap_err();
    assert_eq!(err.to_string(), "Response was not JSON. Body: <html>oops</html>");

    let url = spawn_stub(
        StatusCode::OK,
        r#"{"status":"error","message":"Snapshot locked"}"#,
    )
    .await?;
    let err = publish_database(&url, TOKEN).await.unwrap_err();
    assert_eq!(err.to_string(), "Snapshot locked");

    let url = spawn_stub(StatusCode::OK, r#"{"status":"error"}"#).await?;
    let err = publish_database(&url, TOKEN).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 200");
    Ok(())
}
