//! Routes and request handling.

use axum::Router;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use latchkey_auth::TokenAuthenticator;
use latchkey_core::{DeviceState, StatusLine};
use latchkey_driver::{Driver, DriverError};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::action::Action;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct GatewayState {
    driver: Arc<Driver>,
    auth: Arc<TokenAuthenticator>,
}

impl GatewayState {
    /// Bundle a running driver with the token authenticator.
    pub fn new(driver: Arc<Driver>, auth: Arc<TokenAuthenticator>) -> Self {
        Self { driver, auth }
    }

    async fn authenticate(&self, token: String) -> bool {
        let auth = Arc::clone(&self.auth);
        tokio::task::spawn_blocking(move || auth.authenticate(&token))
            .await
            .unwrap_or(false)
    }
}

/// Request parameters, from the query string or a form body.
#[derive(Debug, Default, Deserialize)]
struct Params {
    action: Option<String>,
    token: Option<String>,
}

impl Params {
    /// Body values win over query values.
    fn merge(self, body: Option<Self>) -> Self {
        match body {
            Some(body) => Self {
                action: body.action.or(self.action),
                token: body.token.or(self.token),
            },
            None => self,
        }
    }
}

/// Body of a gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Terminal status line the device sent for the command.
    Status(StatusLine),
    /// Cached device state.
    State(DeviceState),
    /// Missing or invalid token.
    NotAllowed,
    /// Unknown or missing action.
    InvalidAction,
    /// Another command is outstanding.
    Busy,
    /// The device could not be reached. Answered with the body text
    /// deployed clients already match on.
    Unavailable,
    /// The firmware does not accept this command.
    NotSupported,
}

impl Reply {
    /// Response body text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Status(line) => line.as_str(),
            Self::State(state) => state.as_str(),
            Self::NotAllowed => "NOT ALLOWED",
            Self::InvalidAction => "INVALID ACTION",
            Self::Busy => "BUSY",
            Self::Unavailable => "FAILED TO CALL SPHINCTER",
            Self::NotSupported => "NOT SUPPORTED",
        }
    }
}

impl From<std::result::Result<StatusLine, DriverError>> for Reply {
    fn from(result: std::result::Result<StatusLine, DriverError>) -> Self {
        match result {
            Ok(line) => Self::Status(line),
            Err(DriverError::Busy) => Self::Busy,
            Err(DriverError::Unsupported { .. }) => Self::NotSupported,
            Err(e) => {
                tracing::warn!(error = %e, "device unavailable");
                Self::Unavailable
            }
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.as_str().to_owned()).into_response()
    }
}

/// Build the gateway router. Every path and method is handled.
pub fn router(state: GatewayState) -> Router {
    Router::new().fallback(handle).with_state(state)
}

async fn handle(
    State(state): State<GatewayState>,
    Query(query): Query<Params>,
    body: Option<Form<Params>>,
) -> Reply {
    let params = query.merge(body.map(|Form(body)| body));

    let Some(action) = params.action.as_deref().and_then(|a| a.parse::<Action>().ok()) else {
        tracing::debug!(action = ?params.action, "invalid action");
        return Reply::InvalidAction;
    };

    if action.requires_auth() && !state.authenticate(params.token.unwrap_or_default()).await {
        return Reply::NotAllowed;
    }

    tracing::debug!(%action, "request");

    let driver = &state.driver;
    match action {
        Action::Open => driver.open().await.into(),
        Action::Close => driver.close().await.into(),
        Action::Reset => driver.reset().await.into(),
        Action::State => Reply::State(driver.query()),
    }
}

/// Serve the gateway until `shutdown` resolves.
///
/// # Errors
///
/// [`GatewayError::Bind`] if the listener cannot be bound,
/// [`GatewayError::Serve`] if the server fails.
pub async fn serve<F>(config: &GatewayConfig, state: GatewayState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| GatewayError::bind(config.bind_addr, e))?;

    tracing::info!(addr = %config.bind_addr, "gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("gateway stopped");
    Ok(())
}
