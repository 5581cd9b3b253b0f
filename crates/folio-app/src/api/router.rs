// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Router construction and the HTTP server loop.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use folio_core::config::ServerConfig;
use folio_core::error::{FolioError, Result};
use folio_session::WorkflowController;
use tower_http::trace::TraceLayer;

use super::handlers::{
    approve_handler, cancel_scan_handler, crop_handler, deskew_handler, get_spread_handler,
    get_state_handler, list_spreads_handler, page_handler, process_handler, put_state_handler,
    rotate_handler, scan_handler, serve_image_handler,
};
use super::types::ApiState;

pub fn create_router(workflow: Arc<WorkflowController>) -> Router {
    let state = ApiState { workflow };

    Router::new()
        .route("/", get(page_handler))
        .route("/api/scan", post(scan_handler))
        .route("/api/scan/cancel", post(cancel_scan_handler))
        .route("/api/process", post(process_handler))
        .route("/api/process/rotate-180", post(rotate_handler))
        .route("/api/process/deskew", post(deskew_handler))
        .route("/api/process/crop-borders", post(crop_handler))
        .route("/api/approve", post(approve_handler))
        .route("/api/state", get(get_state_handler).put(put_state_handler))
        .route("/api/spreads", get(list_spreads_handler))
        .route("/api/spreads/{index}", get(get_spread_handler))
        .route("/api/serve/{area}/{file}", get(serve_image_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.host:config.port` and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, workflow: Arc<WorkflowController>) -> Result<()> {
    let ip: IpAddr = config.host.parse().map_err(|err| {
        FolioError::InvalidArgument(format!("invalid host address {:?}: {}", config.host, err))
    })?;
    let addr = SocketAddr::new(ip, config.port);
    let app = create_router(workflow);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Folio operator page on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::Path;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use folio_core::config::AppConfig;
    use folio_document::ImageProcessor;
    use folio_session::Acquirer;
    use image::{DynamicImage, GrayImage, Luma};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    struct Frames(std::sync::Mutex<VecDeque<std::result::Result<Vec<u8>, String>>>);

    #[async_trait]
    impl Acquirer for Frames {
        fn name(&self) -> &str {
            "frames"
        }

        async fn acquire(&self) -> Result<Vec<u8>> {
            match self.0.lock().expect("lock").pop_front() {
                Some(Ok(bytes)) => Ok(bytes),
                Some(Err(message)) => Err(FolioError::Acquisition(message)),
                None => Err(FolioError::Acquisition("no more frames".into())),
            }
        }
    }

    fn page() -> Vec<u8> {
        let img = GrayImage::from_fn(40, 30, |x, _| Luma([if x % 10 == 0 { 0 } else { 255 }]));
        ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(img))
            .to_png_bytes()
            .expect("png")
    }

    fn router(dir: &Path, frames: Vec<std::result::Result<Vec<u8>, String>>) -> Router {
        let mut config = AppConfig::default();
        config.work_dir = dir.to_path_buf();
        let acquirer = Arc::new(Frames(std::sync::Mutex::new(frames.into())));
        let workflow = WorkflowController::open(&config, acquirer, None).expect("workflow");
        create_router(Arc::new(workflow))
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).expect("json body")
    }

    #[tokio::test]
    async fn state_of_fresh_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(dir.path(), vec![]);
        let (status, body) = call(&app, "GET", "/api/state", None).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["next_scan_index"], 1);
        assert_eq!(body["spreads"], json!([]));
    }

    #[tokio::test]
    async fn scan_failure_is_422_with_device_message() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(dir.path(), vec![Err("device offline".into())]);
        let (status, body) = call(&app, "POST", "/api/scan", Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(&body);
        assert_eq!(body["detail"], "device offline");
        assert_eq!(body["message"], "The scanner reported a problem.");
        assert!(body["suggestion"].as_str().is_some_and(|s| !s.is_empty()));
        assert_eq!(body["retriable"], true);
    }

    #[tokio::test]
    async fn scan_accepts_an_empty_body() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(dir.path(), vec![Ok(page())]);
        let (status, body) = call(&app, "POST", "/api/scan", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["index"], 1);
    }

    #[tokio::test]
    async fn scan_process_approve_over_http() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(dir.path(), vec![Ok(page())]);

        let (status, body) = call(&app, "POST", "/api/scan", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        let spread = json_body(&body);
        assert_eq!(spread["index"], 1);
        assert_eq!(spread["status"], "scanned");

        let (status, _) = call(&app, "POST", "/api/approve", Some(json!({"index": 1}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(&app, "POST", "/api/process", Some(json!({"index": 1}))).await;
        assert_eq!(status, StatusCode::OK);
        let spread = json_body(&body);
        assert_eq!(spread["status"], "processed");
        let url = spread["cleaned_url"].as_str().expect("cleaned url").to_string();
        assert!(url.starts_with("/api/serve/cleaned/image_001.png?v="));

        let (status, body) = call(&app, "GET", &url, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with(b"\x89PNG"));

        let (status, body) = call(&app, "POST", "/api/approve", Some(json!({"index": 1}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["status"], "approved");

        let (status, body) = call(&app, "GET", "/api/spreads/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["status"], "approved");
    }

    #[tokio::test]
    async fn unknown_spread_is_404() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(dir.path(), vec![]);
        let (status, _) = call(&app, "POST", "/api/process", Some(json!({"index": 5}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "GET", "/api/spreads/5", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "GET", "/api/serve/cleaned/session.json", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn next_index_is_settable_but_not_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(dir.path(), vec![]);

        let (status, body) = call(&app, "PUT", "/api/state", Some(json!({"next_scan_index": 0}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_body(&body)["detail"].as_str().is_some());

        let (status, body) = call(&app, "PUT", "/api/state", Some(json!({"next_scan_index": 12}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["next_scan_index"], 12);
    }

    #[tokio::test]
    async fn cancel_without_scan_reports_false() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(dir.path(), vec![]);
        let (status, body) = call(&app, "POST", "/api/scan/cancel", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["cancelled"], false);
    }

    #[tokio::test]
    async fn operator_page_is_served() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = router(dir.path(), vec![]);
        let (status, body) = call(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8_lossy(&body).contains("<title>Folio</title>"));
    }
}
