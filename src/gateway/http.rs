// Vaultgate — HTTP Server
//
// axum router exposing the gate. Every request, including unknown routes,
// passes through two middleware layers before its handler: the
// secure-transport redirect (outermost) and the access gate. Failures of any
// kind are answered with the same deny response; only storage faults surface
// as 500.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use zeroize::Zeroizing;

use crate::config::GateConfig;
use crate::crypto::{CryptoProvider, OpenSslCompatCipher};
use crate::error::{AccessError, GateError};
use crate::vault::DirectoryVault;

use super::pipeline::Pipeline;
use super::source::client_address;

const DENY_BODY: &str = "Access Denied";
const BANNER: &str = "<h1>Vaultgate</h1>";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

const DEFAULT_HEX_LENGTH: usize = 32;
const MAX_HEX_LENGTH: usize = 4096;

// ─── Options ─────────────────────────────────────────────────────────────────

/// Boundary behaviour of the HTTP surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpOptions {
    /// Status of every denial (401 or 403).
    pub deny_status: StatusCode,
    /// Redirect plain-HTTP requests forwarded by a proxy to HTTPS.
    pub force_https: bool,
    /// Rate-limit by the first `X-Forwarded-For` hop instead of the peer.
    pub trust_forwarded_for: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            deny_status: StatusCode::FORBIDDEN,
            force_https: true,
            trust_forwarded_for: false,
        }
    }
}

impl HttpOptions {
    /// Take the boundary settings of a validated config.
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            deny_status: StatusCode::from_u16(config.deny_status).unwrap_or(StatusCode::FORBIDDEN),
            force_https: config.force_https,
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }
}

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    options: HttpOptions,
}

impl AppState {
    fn deny(&self) -> Response {
        (self.options.deny_status, DENY_BODY).into_response()
    }

    fn reject_query(&self, rejection: &QueryRejection) -> Response {
        tracing::warn!(reason = %rejection, "Access denied: malformed query string");
        self.deny()
    }

    /// Map a pipeline failure to its response. The reason is logged only.
    fn reject(&self, err: GateError) -> Response {
        match err {
            GateError::Denied(AccessError::NotFound) => {
                tracing::error!(
                    reason = %AccessError::NotFound,
                    "Vault entry vanished after key validation"
                );
                self.deny()
            }
            GateError::Denied(reason) => {
                tracing::warn!(reason = %reason, "Access denied");
                self.deny()
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the gate's router around a shared pipeline.
pub fn router(pipeline: Arc<Pipeline>, options: HttpOptions) -> Router {
    let state = AppState { pipeline, options };

    Router::new()
        .route("/", get(banner).fallback(deny))
        .route("/open", get(open).fallback(deny))
        .route("/take", get(take).fallback(deny))
        .route("/randomhex", get(random_hex).fallback(deny))
        .route("/hash", get(hash).fallback(deny))
        .route("/encrypt", get(encrypt).fallback(deny))
        .route("/decrypt", get(decrypt).fallback(deny))
        .fallback(deny)
        .layer(middleware::from_fn_with_state(state.clone(), access_gate))
        .layer(middleware::from_fn_with_state(state.clone(), secure_transport))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Middleware ──────────────────────────────────────────────────────────────

/// Record the request against its source and refuse it when rate limited.
async fn access_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let source = client_address(
        request.headers(),
        request.extensions(),
        state.options.trust_forwarded_for,
    );

    if let Err(reason) = state.pipeline.admit(source, Instant::now()) {
        tracing::warn!(source = %source, reason = %reason, "Request refused");
        return state.deny();
    }

    next.run(request).await
}

/// Redirect requests that a proxy reports as plain HTTP to HTTPS.
/// Without `X-Forwarded-Proto` the connection is taken as already secure.
async fn secure_transport(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.options.force_https || !forwarded_as_plaintext(request.headers()) {
        return next.run(request).await;
    }

    let Some(location) = https_location(request.headers(), request.uri()) else {
        tracing::warn!("Plain HTTP request without a usable Host header");
        return state.deny();
    };

    tracing::debug!(location = %location, "Redirecting to HTTPS");
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn forwarded_as_plaintext(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(FORWARDED_PROTO) else {
        return false;
    };
    let proto = value
        .to_str()
        .ok()
        .and_then(|raw| raw.split(',').next())
        .map(str::trim)
        .unwrap_or_default();
    !proto.eq_ignore_ascii_case("https")
}

fn https_location(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let host = headers.get(header::HOST)?.to_str().ok()?;
    if host.is_empty() {
        return None;
    }
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    Some(format!("https://{host}{path}"))
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Default, Deserialize)]
struct OpenParams {
    target: Option<String>,
    key: Option<String>,
    ttl: Option<String>,
}

#[derive(Default, Deserialize)]
struct TakeParams {
    target: Option<String>,
}

#[derive(Default, Deserialize)]
struct RandomHexParams {
    length: Option<String>,
}

#[derive(Default, Deserialize)]
struct HashParams {
    input: Option<String>,
}

#[derive(Default, Deserialize)]
struct CipherParams {
    data: Option<String>,
    key: Option<String>,
}

/// Query parameters of a utility route. A malformed query string counts as
/// no parameters at all.
fn params_or_default<T: Default>(query: Result<Query<T>, QueryRejection>) -> T {
    match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            tracing::debug!(reason = %rejection, "Malformed query string ignored");
            T::default()
        }
    }
}

async fn banner() -> Html<&'static str> {
    Html(BANNER)
}

async fn deny(State(state): State<AppState>, uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "Unknown route");
    state.deny()
}

async fn open(
    State(state): State<AppState>,
    query: Result<Query<OpenParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return state.reject_query(&rejection),
    };
    let key = params.key.map(Zeroizing::new);
    let result = state.pipeline.open_session(
        params.target.as_deref(),
        key,
        params.ttl.as_deref(),
        Instant::now(),
    );

    match result {
        Ok(handle) => format!("ok, ttl={}", handle.ttl.as_millis()).into_response(),
        Err(err) => state.reject(err),
    }
}

async fn take(
    State(state): State<AppState>,
    query: Result<Query<TakeParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return state.reject_query(&rejection),
    };
    match state
        .pipeline
        .take_session(params.target.as_deref(), Instant::now())
    {
        Ok(plaintext) => plaintext.as_str().to_owned().into_response(),
        Err(err) => state.reject(err),
    }
}

async fn random_hex(
    State(state): State<AppState>,
    query: Result<Query<RandomHexParams>, QueryRejection>,
) -> String {
    let length = params_or_default(query)
        .length
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_HEX_LENGTH)
        .min(MAX_HEX_LENGTH);
    state.pipeline.crypto().random_hex(length)
}

async fn hash(
    State(state): State<AppState>,
    query: Result<Query<HashParams>, QueryRejection>,
) -> String {
    let params = params_or_default(query);
    state
        .pipeline
        .crypto()
        .digest(params.input.as_deref().unwrap_or_default())
}

async fn encrypt(
    State(state): State<AppState>,
    query: Result<Query<CipherParams>, QueryRejection>,
) -> String {
    let params: CipherParams = params_or_default(query);
    let key = Zeroizing::new(params.key.unwrap_or_default());
    state
        .pipeline
        .crypto()
        .encrypt(params.data.as_deref().unwrap_or_default(), &key)
}

async fn decrypt(
    State(state): State<AppState>,
    query: Result<Query<CipherParams>, QueryRejection>,
) -> String {
    let params: CipherParams = params_or_default(query);
    let key = Zeroizing::new(params.key.unwrap_or_default());
    state
        .pipeline
        .crypto()
        .decrypt(params.data.as_deref().unwrap_or_default(), &key)
}

// ─── Server ──────────────────────────────────────────────────────────────────

/// TCP server running the gate until Ctrl-C.
pub struct GateServer {
    config: GateConfig,
}

impl GateServer {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<(), GateError> {
        self.config.validate()?;
        let options = HttpOptions::from_config(&self.config);
        let crypto: Arc<dyn CryptoProvider> = Arc::new(OpenSslCompatCipher::new());
        let vault = DirectoryVault::new(self.config.vault_dir.clone(), Arc::clone(&crypto));
        if !vault.root().is_dir() {
            tracing::warn!(
                vault = %vault.root().display(),
                "Vault directory is missing; /open will fail until it exists"
            );
        }

        let pipeline = Arc::new(Pipeline::new(&self.config, Arc::new(vault), crypto));
        let sweeper = pipeline.spawn_sweeper(self.config.sweep_interval());
        let app = router(Arc::clone(&pipeline), options);

        let listener = TcpListener::bind(self.config.bind).await?;
        tracing::info!(
            addr = %listener.local_addr()?,
            vault = %self.config.vault_dir.display(),
            "Vaultgate listening"
        );

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        sweeper.abort();
        tracing::info!("Vaultgate stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

// ─── Tests ───────────────────────────────────────────────────────────────────
