//! In-process mock of the Artifactory-style admin REST API.
//!
//! # Design
//! Routes mirror the real management endpoints under `/artifactory/api/` and
//! enforce basic auth with the fixture credentials, so client tests exercise
//! the full preemptive-auth path. The configuration document lives in memory
//! behind an `RwLock`; everything else is canned. Two query switches exist
//! purely for failure-path tests: `compress?fail=true` returns a 500, and
//! `export/system?stall=true` sends one chunk and then never completes,
//! which lets clients hit a socket read timeout mid-body.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde::Deserialize;
use tokio::{net::TcpListener, sync::RwLock};

/// Fixture credentials every route expects.
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "password";

pub const DEFAULT_CONFIG: &str =
    "<config><fileStoreDir>data/filestore</fileStoreDir></config>";
const SECURITY_DOCUMENT: &str =
    "<security><users><user><name>admin</name><admin>true</admin></user></users></security>";

pub type ConfigStore = Arc<RwLock<String>>;

pub fn app() -> Router {
    let config: ConfigStore = Arc::new(RwLock::new(DEFAULT_CONFIG.to_string()));
    Router::new()
        .route("/artifactory/api/system/storage/compress", post(compress))
        .route(
            "/artifactory/api/system/configuration",
            get(get_configuration).post(set_configuration).put(set_configuration),
        )
        .route("/artifactory/api/system/security", get(get_security))
        .route("/artifactory/api/export/system", post(export_system))
        .route("/artifactory/api/import/system", post(import_system))
        .with_state(config)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Basic {}", STANDARD.encode(format!("{USERNAME}:{PASSWORD}")));
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"Artifactory Realm\"")],
    )
        .into_response()
}

#[derive(Deserialize)]
struct CompressParams {
    #[serde(default)]
    fail: bool,
}

async fn compress(headers: HeaderMap, Query(params): Query<CompressParams>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if params.fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Could not compress storage tables").into_response();
    }
    // 200 with no body entity at all
    StatusCode::OK.into_response()
}

async fn get_configuration(headers: HeaderMap, State(config): State<ConfigStore>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let document = config.read().await.clone();
    ([(header::CONTENT_TYPE, "application/xml")], document).into_response()
}

async fn set_configuration(
    headers: HeaderMap,
    State(config): State<ConfigStore>,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    *config.write().await = String::from_utf8_lossy(&body).into_owned();
    StatusCode::OK.into_response()
}

async fn get_security(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    ([(header::CONTENT_TYPE, "application/xml")], SECURITY_DOCUMENT).into_response()
}

#[derive(Deserialize)]
struct ExportParams {
    #[serde(default)]
    stall: bool,
}

async fn export_system(headers: HeaderMap, Query(params): Query<ExportParams>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if params.stall {
        // One chunk, then the connection goes silent without closing.
        let stream = futures_util::stream::unfold(0u32, |step| async move {
            match step {
                0 => Some((Ok::<_, Infallible>(Bytes::from_static(b"export started\n")), 1)),
                _ => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    None
                }
            }
        });
        return (
            [(header::CONTENT_TYPE, "text/plain")],
            Body::from_stream(stream),
        )
            .into_response();
    }
    ([(header::CONTENT_TYPE, "text/plain")], "export completed\n").into_response()
}

async fn import_system(headers: HeaderMap, body: Bytes) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "Import settings are required").into_response();
    }
    StatusCode::OK.into_response()
}
