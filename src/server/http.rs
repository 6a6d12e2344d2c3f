//! JSON-over-HTTP transport for the RPC surface.
//!
//! Each RPC is `POST /rpc/<Name>` with the request message as the body.

use crate::config::ServerConfig;
use crate::core::{Result, SphynxError};
use crate::facade::*;
use crate::storage::PersistenceStats;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub struct ApiError(pub SphynxError);

impl From<SphynxError> for ApiError {
    fn from(err: SphynxError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            SphynxError::OperationNotSupported { .. } => {
                (StatusCode::NOT_IMPLEMENTED, "operation_not_supported")
            }
            SphynxError::InputNotFound { .. } => (StatusCode::NOT_FOUND, "input_not_found"),
            SphynxError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            SphynxError::TypeMismatch(_) => (StatusCode::BAD_REQUEST, "type_mismatch"),
            SphynxError::InvalidOperation(_) => (StatusCode::BAD_REQUEST, "invalid_operation"),
            SphynxError::InvalidGuid(_) => (StatusCode::BAD_REQUEST, "invalid_guid"),
            SphynxError::Execution(_) => (StatusCode::INTERNAL_SERVER_ERROR, "execution_error"),
            SphynxError::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error")
            }
            SphynxError::Transport(_) | SphynxError::LockError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

pub fn router(service: Arc<SphynxService>) -> Router {
    Router::new()
        .route("/rpc/CanCompute", post(can_compute))
        .route("/rpc/Compute", post(compute))
        .route("/rpc/GetScalar", post(get_scalar))
        .route("/rpc/HasInSphynxMemory", post(has_in_sphynx_memory))
        .route("/rpc/HasOnOrderedSphynxDisk", post(has_on_ordered_sphynx_disk))
        .route("/rpc/ReadFromOrderedSphynxDisk", post(read_from_ordered_sphynx_disk))
        .route("/health", get(health))
        .route("/stats/persistence", get(persistence_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn can_compute(
    State(service): State<Arc<SphynxService>>,
    Json(request): Json<CanComputeRequest>,
) -> ApiResult<CanComputeReply> {
    Ok(Json(service.can_compute(request)?))
}

async fn compute(
    State(service): State<Arc<SphynxService>>,
    Json(request): Json<ComputeRequest>,
) -> ApiResult<ComputeReply> {
    Ok(Json(service.compute(request).await?))
}

async fn get_scalar(
    State(service): State<Arc<SphynxService>>,
    Json(request): Json<GetScalarRequest>,
) -> ApiResult<GetScalarReply> {
    Ok(Json(service.get_scalar(request)?))
}

async fn has_in_sphynx_memory(
    State(service): State<Arc<SphynxService>>,
    Json(request): Json<HasInSphynxMemoryRequest>,
) -> ApiResult<HasInSphynxMemoryReply> {
    Ok(Json(service.has_in_sphynx_memory(request)?))
}

async fn has_on_ordered_sphynx_disk(
    State(service): State<Arc<SphynxService>>,
    Json(request): Json<HasOnOrderedSphynxDiskRequest>,
) -> ApiResult<HasOnOrderedSphynxDiskReply> {
    Ok(Json(service.has_on_ordered_sphynx_disk(request).await?))
}

async fn read_from_ordered_sphynx_disk(
    State(service): State<Arc<SphynxService>>,
    Json(request): Json<ReadFromOrderedSphynxDiskRequest>,
) -> ApiResult<ReadFromOrderedSphynxDiskReply> {
    Ok(Json(service.read_from_ordered_sphynx_disk(request).await?))
}

async fn health(State(service): State<Arc<SphynxService>>) -> ApiResult<HealthReply> {
    Ok(Json(service.health()?))
}

async fn persistence_stats(State(service): State<Arc<SphynxService>>) -> Json<PersistenceStats> {
    Json(service.persistence_stats())
}

/// Serves `service` until `shutdown` resolves. With a key dir configured the
/// listener uses TLS; a key pair that cannot be loaded or a port that
/// cannot be bound is an error.
pub async fn serve<F>(config: &ServerConfig, service: Arc<SphynxService>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(service);
    let addr = config.address();

    match config.tls_files() {
        Some((cert, key)) => {
            let tls = RustlsConfig::from_pem_file(&cert, &key).await.map_err(|e| {
                SphynxError::Transport(format!(
                    "failed to read credentials from {}: {}",
                    cert.display(),
                    e
                ))
            })?;
            let socket: SocketAddr = addr
                .parse()
                .map_err(|e| SphynxError::Transport(format!("bad address {}: {}", addr, e)))?;

            let handle = Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown.await;
                shutdown_handle.graceful_shutdown(None);
            });

            info!("Sphynx listening on https://{}", addr);
            axum_server::bind_rustls(socket, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(|e| SphynxError::Transport(format!("failed to serve: {}", e)))
        }
        None => {
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|e| SphynxError::Transport(format!("failed to listen on {}: {}", addr, e)))?;
            info!("Sphynx listening on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
                .map_err(|e| SphynxError::Transport(format!("failed to serve: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let response = ApiError(SphynxError::NotFound("g".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError(SphynxError::TypeMismatch("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_key_pair_is_transport_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ServerConfig::new()
            .ordered_data_dir(dir.path().join("ordered"))
            .unordered_data_dir(dir.path().join("unordered"))
            .host("127.0.0.1")
            .port(0)
            .key_dir(dir.path().join("keys"));
        let service = Arc::new(SphynxService::from_config(&config).unwrap());

        let err = serve(&config, service, std::future::pending()).await.unwrap_err();
        assert!(matches!(err, SphynxError::Transport(_)));
    }
}
