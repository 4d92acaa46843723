//! Transports that carry a call to a procedure.

use std::marker::PhantomData;

use giveaway_core::{ErrorCode, Failure, Outcome};
use giveaway_procedure::{BoxFuture, Environment, Procedure};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Message shown for every transport failure.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Could not reach the server";

/// A call that never produced an envelope.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something other than an envelope.
    #[error("unexpected response (status {status}): {reason}")]
    UnexpectedResponse {
        /// HTTP status of the response.
        status: u16,
        /// Why the body was rejected.
        reason: String,
    },
}

impl TransportError {
    /// The `UNKNOWN_HTTP_ERROR` failure shown to the caller.
    ///
    /// Transport details stay in the logs.
    #[must_use]
    pub fn to_failure(&self) -> Failure {
        Failure::new(ErrorCode::UnknownHttpError, TRANSPORT_FAILURE_MESSAGE)
    }
}

/// Something that can invoke one procedure.
pub trait ProcedureCaller<O>: Send + Sync {
    /// Name of the procedure being called.
    fn name(&self) -> &str;

    /// Sends raw JSON input and waits for the envelope.
    fn call(&self, input: Value) -> BoxFuture<'_, Result<Outcome<O>, TransportError>>;
}

/// Calls a procedure in-process against an environment.
///
/// Never fails at the transport level.
pub struct LocalCaller<I, O, D: ?Sized> {
    procedure: Procedure<I, O, D>,
    env: Environment<D>,
}

impl<I, O, D: ?Sized> LocalCaller<I, O, D> {
    /// Binds `procedure` to `env`.
    #[must_use]
    pub fn new(procedure: Procedure<I, O, D>, env: Environment<D>) -> Self {
        Self { procedure, env }
    }
}

impl<I, O, D: ?Sized> std::fmt::Debug for LocalCaller<I, O, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCaller")
            .field("procedure", &self.procedure.name())
            .finish_non_exhaustive()
    }
}

impl<I, O, D> ProcedureCaller<O> for LocalCaller<I, O, D>
where
    I: DeserializeOwned + Send + Sync + 'static,
    O: Serialize + Send + Sync + 'static,
    D: ?Sized + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.procedure.name()
    }

    fn call(&self, input: Value) -> BoxFuture<'_, Result<Outcome<O>, TransportError>> {
        Box::pin(async move { Ok(self.procedure.call(&self.env, input).await) })
    }
}

/// Calls a procedure on a remote server with `POST {base}/procedures/{name}`.
pub struct HttpCaller<O> {
    client: reqwest::Client,
    url: String,
    name: String,
    token: Option<String>,
    _output: PhantomData<fn() -> O>,
}

impl<O> std::fmt::Debug for HttpCaller<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCaller")
            .field("url", &self.url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl<O> HttpCaller<O> {
    /// Creates a caller for procedure `name` on the server at `base_url`.
    #[must_use]
    pub fn new(base_url: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/procedures/{name}", base_url.trim_end_matches('/')),
            name,
            token: None,
            _output: PhantomData,
        }
    }

    /// Sends `token` as `Authorization: Bearer <token>`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Reuses an existing HTTP client (and its connection pool).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl<O> ProcedureCaller<O> for HttpCaller<O>
where
    O: DeserializeOwned + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, input: Value) -> BoxFuture<'_, Result<Outcome<O>, TransportError>> {
        Box::pin(async move {
            let mut request = self.client.post(&self.url).json(&input);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;

            serde_json::from_slice(&body).map_err(|e| TransportError::UnexpectedResponse {
                status,
                reason: e.to_string(),
            })
        })
    }
}
