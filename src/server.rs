use crate::auth::{Authenticator, Credentials};
use crate::config::Config;
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Clone)]
struct AppState {
    authenticator: Arc<dyn Authenticator>,
}

pub struct LoginServer {
    config: Arc<Config>,
    authenticator: Arc<dyn Authenticator>,
}

impl LoginServer {
    pub fn new(config: Arc<Config>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self { config, authenticator }
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.authenticator), self.config.cors.enabled)
    }

    pub async fn start(&self) -> Result<()> {
        let addr = self.config.bind_addr()?;
        let listener = TcpListener::bind(addr).await?;

        info!("LDAP login server listening on {}", addr);
        if self.config.cors.enabled {
            info!("CORS enabled for all origins");
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("LDAP login server stopped");
        Ok(())
    }
}

/// Build the `/login` router. With `cors` set, preflight requests are answered
/// before they reach the handler.
pub fn router(authenticator: Arc<dyn Authenticator>, cors: bool) -> Router {
    let router = Router::new()
        .route("/login", any(login_handler))
        .with_state(AppState { authenticator });

    if cors {
        router.layer(middleware::from_fn(cors_middleware))
    } else {
        router
    }
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST, OPTIONS"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));

    response
}

async fn login_handler(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if method != Method::POST {
        return reply(StatusCode::METHOD_NOT_ALLOWED, false, "Method Not Allowed");
    }

    let credentials: Credentials = match serde_json::from_slice(&body) {
        Ok(credentials) => credentials,
        Err(e) => {
            debug!("Rejecting login request body: {}", e);
            return reply(StatusCode::BAD_REQUEST, false, "Invalid JSON");
        }
    };

    match state.authenticator.authenticate(&credentials).await {
        Ok(()) => {
            info!("Login successful for '{}'", credentials.username);
            reply(StatusCode::OK, true, "Login successful")
        }
        Err(e) => {
            warn!("Login failed for '{}': {}", credentials.username, e);
            reply(e.status(), false, e.public_message())
        }
    }
}

fn reply(status: StatusCode, success: bool, message: &str) -> Response {
    let body = LoginResponse {
        success,
        message: message.to_string(),
    };
    (status, Json(body)).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
