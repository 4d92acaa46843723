//! The procedure HTTP server.
//!
//! Every registered procedure is served as `POST /procedures/{name}` with a
//! JSON body holding the raw input. The response body is always the
//! procedure's envelope; the status is 200 for success and the failure
//! code's [`http_status`](giveaway_core::ErrorCode::http_status) otherwise.
//!
//! | Route | Response |
//! |---|---|
//! | `POST /procedures/{name}` | procedure envelope |
//! | `GET /health` | [`HealthStatus`](crate::HealthStatus) |
//! | `GET /ready` | [`ReadinessStatus`](crate::ReadinessStatus), 503 while draining |
//! | `GET /metrics` | Prometheus text, when a recorder is installed |
//! | anything else | 404 `NOT_FOUND` envelope |

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use giveaway_config::ServerConfig;
use giveaway_core::{ErrorCode, Outcome};
use giveaway_procedure::{Credentials, Environment, ProcedureRegistry};
use giveaway_store::Store;
use giveaway_telemetry::metrics::record_http_request;
use giveaway_telemetry::render_metrics;
use http::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};

use crate::error::ServerError;
use crate::health::{HealthCheck, ReadinessCheck};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Path prefix under which procedures are served.
pub const PROCEDURE_PREFIX: &str = "/procedures/";

const BODY_READ_TIMEOUT: Duration = Duration::from_secs(30);
const JSON: &str = "application/json";
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";
const FALLBACK_BODY: &str =
    r#"{"ok":false,"code":"INTERNAL_SERVER_ERROR","message":"An internal error occurred"}"#;

type HttpResponse = Response<Full<Bytes>>;

/// An assembled server, not yet bound.
pub struct Server {
    config: ServerConfig,
    registry: ProcedureRegistry<dyn Store>,
    env: Environment<dyn Store>,
    token_header: HeaderName,
    health: HealthCheck,
    readiness: ReadinessCheck,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("procedures", &self.registry.names())
            .field("token_header", &self.token_header)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Starts building a server.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server settings.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the served procedures.
    #[must_use]
    pub fn registry(&self) -> &ProcedureRegistry<dyn Store> {
        &self.registry
    }

    /// Returns the readiness probe. Clones share its switch.
    #[must_use]
    pub fn readiness(&self) -> &ReadinessCheck {
        &self.readiness
    }

    /// Binds the configured address.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let addr: SocketAddr = self.config.http_addr.parse().map_err(|e| {
            ServerError::bind(format!("Invalid address '{}': {e}", self.config.http_addr))
        })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::bind(format!("Failed to bind to {addr}: {e}")))?;

        Ok(BoundServer {
            server: Arc::new(self),
            listener,
        })
    }

    /// Binds and serves until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Binds and serves until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        self.bind().await?.run_with_shutdown(shutdown).await
    }

    async fn handle_request(
        self: Arc<Self>,
        req: Request<Incoming>,
    ) -> Result<HttpResponse, Infallible> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let (route, response) = match (&method, path.as_str()) {
            (&Method::GET, "/health") => {
                ("/health", json_response(StatusCode::OK, &self.health.status()))
            }
            (&Method::GET, "/ready") => ("/ready", self.handle_ready()),
            (&Method::GET, "/metrics") => ("/metrics", handle_metrics()),
            (_, p) if p.starts_with(PROCEDURE_PREFIX) => {
                let name = &p[PROCEDURE_PREFIX.len()..];
                ("/procedures", self.handle_procedure(&method, name, req).await)
            }
            _ => (
                "unmatched",
                failure(ErrorCode::NotFound, format!("No route for {method} {path}")),
            ),
        };

        let status = response.status().as_u16();
        record_http_request(route, status);
        tracing::debug!(
            http.method = %method,
            http.path = %path,
            http.status_code = status,
            "request served"
        );
        Ok(response)
    }

    fn handle_ready(&self) -> HttpResponse {
        let status = self.readiness.status();
        let code = if status.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        json_response(code, &status)
    }

    async fn handle_procedure(
        &self,
        method: &Method,
        name: &str,
        req: Request<Incoming>,
    ) -> HttpResponse {
        if !self.registry.contains(name) {
            return failure(
                ErrorCode::NotFound,
                format!("Procedure '{name}' not found"),
            );
        }
        if method != Method::POST {
            let mut response = failure(
                ErrorCode::BadRequest,
                format!("Procedure '{name}' must be called with POST"),
            );
            *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
            return response;
        }

        let env = match self.bearer_credentials(req.headers()) {
            Some(credentials) => self.env.with_credentials(credentials),
            None => self.env.anonymous(),
        };

        let body = match self.read_body(req.into_body()).await {
            Ok(body) => body,
            Err(response) => return response,
        };
        let raw = match parse_input(&body) {
            Ok(raw) => raw,
            Err(response) => return response,
        };

        match self.registry.invoke(name, &env, raw).await {
            Some(outcome) => {
                let status = outcome.code().map_or(StatusCode::OK, |code| code.http_status());
                json_response(status, &outcome)
            }
            None => failure(
                ErrorCode::NotFound,
                format!("Procedure '{name}' not found"),
            ),
        }
    }

    fn bearer_credentials(&self, headers: &HeaderMap) -> Option<Credentials> {
        let value = headers.get(&self.token_header)?.to_str().ok()?;
        crate::sessions::bearer_token(value).map(Credentials::bearer)
    }

    async fn read_body(&self, body: Incoming) -> Result<Bytes, HttpResponse> {
        let limited = Limited::new(body, self.config.max_body_bytes);
        match tokio::time::timeout(BODY_READ_TIMEOUT, limited.collect()).await {
            Ok(Ok(collected)) => Ok(collected.to_bytes()),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                let mut response = failure(
                    ErrorCode::ValidationError,
                    format!(
                        "Request body exceeds {} bytes",
                        self.config.max_body_bytes
                    ),
                );
                *response.status_mut() = StatusCode::PAYLOAD_TOO_LARGE;
                Err(response)
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "failed to read request body");
                Err(failure(ErrorCode::BadRequest, "Could not read request body"))
            }
            Err(_) => {
                tracing::warn!("request body read timed out");
                let mut response =
                    failure(ErrorCode::BadRequest, "Request body read timed out");
                *response.status_mut() = StatusCode::REQUEST_TIMEOUT;
                Err(response)
            }
        }
    }
}

/// An empty body is an empty object; anything else must be JSON.
fn parse_input(body: &[u8]) -> Result<Value, HttpResponse> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "malformed request body");
        failure(
            ErrorCode::ValidationError,
            format!(
                "Request body is not valid JSON (line {}, column {})",
                e.line(),
                e.column()
            ),
        )
    })
}

fn handle_metrics() -> HttpResponse {
    match render_metrics() {
        Some(text) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, PROMETHEUS_TEXT)
            .body(Full::new(Bytes::from(text)))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new()))),
        None => failure(ErrorCode::NotFound, "Metrics are not enabled"),
    }
}

fn failure(code: ErrorCode, message: impl Into<String>) -> HttpResponse {
    json_response(code.http_status(), &Outcome::<()>::failure(code, message))
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    let body = serde_json::to_vec(body).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize response body");
        FALLBACK_BODY.as_bytes().to_vec()
    });
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(FALLBACK_BODY.as_bytes()))))
}

/// A server holding its listening socket.
#[derive(Debug)]
pub struct BoundServer {
    server: Arc<Server>,
    listener: TcpListener,
}

impl BoundServer {
    /// Returns the bound address, useful after binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until `shutdown` triggers, then drains open connections for
    /// up to the configured shutdown timeout.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let Self { server, listener } = self;
        let tracker = ConnectionTracker::new();
        let max_connections = server.config.max_connections;

        let addr = listener.local_addr()?;
        tracing::info!(
            %addr,
            procedures = server.registry.len(),
            "server listening"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };
                    let Some(token) = tracker.try_acquire(max_connections) else {
                        tracing::warn!(%remote, max_connections, "connection limit reached, dropping connection");
                        continue;
                    };
                    let server = Arc::clone(&server);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(server, stream, shutdown).await {
                            tracing::debug!(%remote, error = %e, "connection closed with error");
                        }
                        drop(token);
                    });
                }
                () = shutdown.recv() => {
                    tracing::info!("shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        server.readiness.set_ready(false);
        drop(listener);

        let timeout = Duration::from_secs(server.config.shutdown_timeout_secs);
        tracing::info!(
            active = tracker.active_connections(),
            timeout_secs = timeout.as_secs(),
            "draining connections"
        );
        tokio::select! {
            () = tracker.wait_for_shutdown() => tracing::info!("all connections closed"),
            () = tokio::time::sleep(timeout) => tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            ),
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn serve_connection(
    server: Arc<Server>,
    stream: TcpStream,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let service = service_fn(move |req| Arc::clone(&server).handle_request(req));
    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            // Finish the in-flight request, then close.
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

/// Builder for [`Server`].
#[derive(Debug, Default)]
#[must_use]
pub struct ServerBuilder {
    config: ServerConfig,
    registry: Option<ProcedureRegistry<dyn Store>>,
    env: Option<Environment<dyn Store>>,
    token_header: Option<String>,
    service_name: Option<String>,
    service_version: Option<String>,
}

impl ServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server settings.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the listen address.
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Sets the procedures to serve.
    pub fn registry(mut self, registry: ProcedureRegistry<dyn Store>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the shared environment. Each request gets a copy scoped to its
    /// own credentials.
    pub fn environment(mut self, env: Environment<dyn Store>) -> Self {
        self.env = Some(env);
        self
    }

    /// Sets the header carrying the bearer token. Defaults to `authorization`.
    pub fn token_header(mut self, header: impl Into<String>) -> Self {
        self.token_header = Some(header.into());
        self
    }

    /// Sets the name reported by `/health`.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Sets the version reported by `/health`.
    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Assembles the server.
    ///
    /// Fails when no environment was given or the token header is not a
    /// valid header name.
    pub fn build(self) -> Result<Server, ServerError> {
        let env = self
            .env
            .ok_or_else(|| ServerError::config("an environment is required"))?;
        let token_header = match self.token_header {
            Some(name) => HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
                .map_err(|e| ServerError::config(format!("invalid token header '{name}': {e}")))?,
            None => AUTHORIZATION,
        };
        let registry = self.registry.unwrap_or_default();

        let procedures = registry.len();
        let health = HealthCheck::new(
            self.service_name
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
            self.service_version
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            procedures,
        );
        let readiness = ReadinessCheck::new().add_check("procedures", move || procedures > 0);

        Ok(Server {
            config: self.config,
            registry,
            env,
            token_header,
            health,
            readiness,
        })
    }
}
