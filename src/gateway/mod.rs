//! Axum-based HTTP gateway that answers messaging webhooks.
//!
//! - `POST /webhook` accepts the gateway's form-encoded inbound message and
//!   replies with a TwiML document (always HTTP 200)
//! - `GET /health` reports liveness and the number of loaded tenants
//! - Request body size limits (64KB max) and request timeouts (30s)

pub mod twiml;

use crate::config::Config;
use crate::routing::{self, ReplyRouter};
use crate::tenants::{self, TenantDirectory};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

pub use twiml::MessagingResponse;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn TenantDirectory>,
    pub router: Arc<dyn ReplyRouter>,
}

impl AppState {
    /// Build the registry and router from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let directory: Arc<dyn TenantDirectory> = Arc::new(
            tenants::create_registry(&config.tenants).context("Invalid [tenants] configuration")?,
        );
        let router: Arc<dyn ReplyRouter> =
            Arc::from(routing::create_router(directory.clone(), &config.responder));
        Ok(Self { directory, router })
    }
}

/// Inbound message fields posted by the messaging gateway. `To` and `Body`
/// drive routing and `MessageSid` is logged; other fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "To", default)]
    pub to: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "MessageSid", default)]
    pub message_sid: Option<String>,
}

/// Returns true when `host` is not a loopback address.
fn is_public_bind(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return false;
    }
    match host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        Ok(ip) => !ip.is_loopback(),
        Err(_) => true,
    }
}

/// Build the axum router with body limit and timeout layers.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/webhook", post(handle_webhook))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Run the HTTP gateway until Ctrl+C or SIGTERM.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    if is_public_bind(host) && !config.gateway.allow_public_bind {
        anyhow::bail!(
            "Refusing to bind to {host}: the webhook would be exposed beyond this machine.\n\
             Fix: use --host 127.0.0.1 (default) behind a reverse proxy, or set\n\
             [gateway] allow_public_bind = true in config.toml."
        );
    }

    let state = AppState::from_config(&config)?;

    let listener = bind_listener(host, port).await?;
    let actual_port = listener.local_addr()?.port();

    tracing::info!(
        addr = %format!("{host}:{actual_port}"),
        tenants = state.directory.len(),
        router = state.router.name(),
        "Gateway listening (POST /webhook, GET /health)"
    );

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

/// Bind `host:port`, resolving hostnames and accepting bracketed IPv6.
async fn bind_listener(host: &str, port: u16) -> Result<tokio::net::TcpListener> {
    let bare_host = host.trim_matches(|c| c == '[' || c == ']');
    tokio::net::TcpListener::bind((bare_host, port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received CTRL+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// AXUM HANDLERS
// ══════════════════════════════════════════════════════════════════════════════

/// GET /health: liveness and tenant count
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "tenants": state.directory.len(),
    }))
}

/// POST /webhook: inbound message from the messaging gateway.
/// Unknown destination numbers and unparseable forms still get a 200 with
/// the unavailable reply.
async fn handle_webhook(
    State(state): State<AppState>,
    form: Result<Form<InboundMessage>, FormRejection>,
) -> MessagingResponse {
    let message = match form {
        Ok(Form(message)) => message,
        Err(e) => {
            tracing::warn!("Webhook form parse error: {e}");
            InboundMessage::default()
        }
    };
    let outcome = state.router.route(&message.to, &message.body);

    tracing::info!(
        to = %message.to,
        sid = message.message_sid.as_deref().unwrap_or("-"),
        tenant = outcome.tenant.as_deref().unwrap_or("-"),
        matched_by = ?outcome.matched_by,
        "Webhook handled"
    );

    MessagingResponse::new().message(outcome.reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        build_app(AppState::from_config(&Config::default()).unwrap())
    }

    fn form_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn security_body_limit_is_64kb() {
        assert_eq!(MAX_BODY_SIZE, 65_536);
    }

    #[test]
    fn security_timeout_is_30_seconds() {
        assert_eq!(REQUEST_TIMEOUT_SECS, 30);
    }

    #[test]
    fn app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn loopback_hosts_are_not_public() {
        assert!(!is_public_bind("127.0.0.1"));
        assert!(!is_public_bind("localhost"));
        assert!(!is_public_bind("::1"));
        assert!(!is_public_bind("[::1]"));
        assert!(is_public_bind("0.0.0.0"));
        assert!(is_public_bind("192.168.1.10"));
        assert!(is_public_bind("example.com"));
    }

    #[test]
    fn inbound_message_fields_default_to_empty() {
        let parsed: InboundMessage = serde_json::from_str("{}").unwrap();
        assert!(parsed.to.is_empty());
        assert!(parsed.body.is_empty());
        assert!(parsed.message_sid.is_none());
    }

    #[tokio::test]
    async fn run_gateway_refuses_public_bind_without_opt_in() {
        let err = run_gateway("0.0.0.0", 0, Config::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Refusing to bind"));
    }

    #[tokio::test]
    async fn bind_listener_resolves_localhost() {
        let listener = bind_listener("localhost", 0).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn bind_listener_accepts_bracketed_ipv4_loopback() {
        let listener = bind_listener("[127.0.0.1]", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }

    #[tokio::test]
    async fn webhook_without_content_type_returns_unavailable_twiml() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .body(Body::from("To=%2B15551112222&Body=hola"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some(twiml::TWIML_CONTENT_TYPE)
        );
        let text = body_text(response).await;
        assert!(text.contains("Lo sentimos, este servicio no está disponible"));
    }

    #[tokio::test]
    async fn webhook_duplicate_fields_return_unavailable_twiml() {
        let response = test_app()
            .oneshot(form_request(
                "To=%2B15551112222&To=%2B15551112222&Body=hola",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("Lo sentimos"));
    }

    #[tokio::test]
    async fn webhook_greeting_returns_welcome_twiml() {
        let response = test_app()
            .oneshot(form_request("To=%2B15551112222&Body=Hola&From=%2B15550000000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some(twiml::TWIML_CONTENT_TYPE)
        );
        let text = body_text(response).await;
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<Message>¡Hola! 🍕 Bienvenido a Pizzería Don Gato."));
        assert!(text.ends_with("</Message></Response>"));
    }

    #[tokio::test]
    async fn webhook_keyword_returns_keyword_reply() {
        let response = test_app()
            .oneshot(form_request("To=%2B15551112222&Body=quiero+ver+el+menu"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("Claro, nuestro menú es:"));
    }

    #[tokio::test]
    async fn webhook_escapes_reply_text() {
        let response = test_app()
            .oneshot(form_request("To=%2B15551112222&Body=hay+estacionamiento"))
            .await
            .unwrap();

        let text = body_text(response).await;
        assert!(text.contains("intenta con &apos;MENU&apos;"));
    }

    #[tokio::test]
    async fn webhook_unknown_number_still_returns_ok() {
        let response = test_app()
            .oneshot(form_request("To=%2B19990001111&Body=hola"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("Lo sentimos, este servicio no está disponible"));
    }

    #[tokio::test]
    async fn webhook_missing_fields_route_as_empty() {
        let response = test_app().oneshot(form_request("")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("Lo sentimos"));
    }

    #[tokio::test]
    async fn webhook_rejects_get() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/webhook")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_reports_tenant_count() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["tenants"], 2);
    }
}
