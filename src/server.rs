//! HTTP surface: routes, auth middleware and static artifact serving.
//!
//! | Route | Auth | Handler |
//! |---|---|---|
//! | `GET /health` | no | [`Gateway::health`] |
//! | `POST /convert/*` | yes | one per conversion |
//! | `POST /cleanup` | yes | [`Gateway::cleanup`] |
//! | `GET /outputs/{name}` | no | artifact bytes from the store |
//!
//! The API-key check is a route layer on the protected routes, so a rejected
//! request is answered before its multipart body is read.

use crate::auth::API_KEY_HEADER;
use crate::convert::Gateway;
use crate::error::GatewayError;
use crate::output::{ArtifactListResponse, CleanupResponse, HealthResponse, SingleArtifactResponse};
use crate::pipeline::upload::UploadForm;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{debug, Level};

/// Shared handler state.
pub type AppState = Arc<Gateway>;

/// Build the full router for `gateway`.
pub fn build_router(gateway: AppState) -> Router {
    let body_limit = gateway.config().max_upload_bytes;

    let protected = Router::new()
        .route("/convert/image-to-pdf", post(image_to_pdf))
        .route("/convert/scan-to-pdf", post(scan_to_pdf))
        .route("/convert/image-to-image", post(image_to_image))
        .route("/convert/image-compress", post(image_compress))
        .route("/convert/pdf-to-images", post(pdf_to_images))
        .route("/convert/pdf-merge", post(pdf_merge))
        .route("/convert/pdf-split", post(pdf_split))
        .route("/cleanup", post(cleanup))
        .route_layer(middleware::from_fn_with_state(gateway.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .route("/outputs/{name}", get(serve_artifact))
        .merge(protected)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(gateway)
}

/// Bind the listening socket. `host` may be an IP literal (v4 or v6) or a
/// hostname; every resolved address is tried in turn.
pub async fn bind_listener(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind((host, port)).await?;
    debug!("Bound {}", listener.local_addr()?);
    Ok(listener)
}

/// Wait for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

// ── Middleware ───────────────────────────────────────────────────────────

async fn require_api_key(
    State(gateway): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let supplied = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    gateway.authorize(supplied)?;
    Ok(next.run(request).await)
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn health(State(gateway): State<AppState>) -> Json<HealthResponse> {
    Json(gateway.health())
}

async fn image_to_pdf(
    State(gateway): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SingleArtifactResponse>, GatewayError> {
    let form = UploadForm::read(multipart).await?;
    Ok(Json(gateway.image_to_pdf(form).await?))
}

async fn scan_to_pdf(
    State(gateway): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SingleArtifactResponse>, GatewayError> {
    let form = UploadForm::read(multipart).await?;
    Ok(Json(gateway.scan_to_pdf(form).await?))
}

async fn image_to_image(
    State(gateway): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SingleArtifactResponse>, GatewayError> {
    let form = UploadForm::read(multipart).await?;
    Ok(Json(gateway.image_to_image(form).await?))
}

async fn image_compress(
    State(gateway): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SingleArtifactResponse>, GatewayError> {
    let form = UploadForm::read(multipart).await?;
    Ok(Json(gateway.image_compress(form).await?))
}

async fn pdf_to_images(
    State(gateway): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ArtifactListResponse>, GatewayError> {
    let form = UploadForm::read(multipart).await?;
    Ok(Json(gateway.pdf_to_images(form).await?))
}

async fn pdf_merge(
    State(gateway): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SingleArtifactResponse>, GatewayError> {
    let form = UploadForm::read(multipart).await?;
    Ok(Json(gateway.pdf_merge(form).await?))
}

async fn pdf_split(
    State(gateway): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ArtifactListResponse>, GatewayError> {
    let form = UploadForm::read(multipart).await?;
    Ok(Json(gateway.pdf_split(form).await?))
}

async fn cleanup(State(gateway): State<AppState>) -> Result<Json<CleanupResponse>, GatewayError> {
    Ok(Json(gateway.cleanup().await?))
}

async fn serve_artifact(
    State(gateway): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, GatewayError> {
    match gateway.fetch(&name).await? {
        Some((name, bytes)) => {
            let mime = mime_guess::from_path(name.as_str()).first_or_octet_stream();
            Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
        }
        None => {
            debug!("No artifact named {:?}", name);
            Ok((
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "detail": "Not Found" })),
            )
                .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_hostnames_and_ip_literals() {
        for host in ["localhost", "127.0.0.1"] {
            let listener = bind_listener(host, 0).await.unwrap();
            let addr = listener.local_addr().unwrap();
            assert!(addr.ip().is_loopback(), "{host} bound {addr}");
            assert_ne!(addr.port(), 0);
        }
    }

    #[tokio::test]
    async fn binds_bracketless_ipv6_literal() {
        // Skip on hosts without an IPv6 loopback.
        if std::net::TcpListener::bind("[::1]:0").is_err() {
            return;
        }
        let listener = bind_listener("::1", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().is_ipv6());
    }
}
