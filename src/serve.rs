//! Purpose: Provide the HTTP/JSON server for the feedback resource.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based server implementing the `/feedback` wire contract.
//! Invariants: Validation failures are 400s with fixed messages; internal
//! detail is logged and never leaves the process.
//! Invariants: Unknown verbs on known paths yield 405 from the method router.

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Value, json};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use corkboard::api::{Board, Error, ErrorKind};

/// Rejection body for unparsable request payloads.
const INVALID_JSON: &str = "Invalid JSON";

/// Generic body for unexpected failures; the detail stays in the log.
const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub store_path: PathBuf,
    pub max_body_bytes: u64,
}

#[derive(Clone)]
struct AppState {
    board: Board,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let board = Board::open(&config.store_path)?;
    let state = Arc::new(AppState { board });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/feedback", get(list_feedback).post(submit_feedback))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;

    tracing::info!(
        bind = %config.bind,
        store = %config.store_path.display(),
        "corkboard listening"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 65536."));
    }

    if config.max_body_bytes > usize::MAX as u64 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes exceeds platform limits")
            .with_hint("Use a smaller value that fits in memory."));
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

async fn healthz() -> Response {
    Json(json!({ "ok": true })).into_response()
}

async fn list_feedback(State(state): State<Arc<AppState>>) -> Response {
    match state.board.list() {
        Ok(page) => Json(page).into_response(),
        Err(err) => error_response(err),
    }
}

async fn submit_feedback(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let message = match parse_submit_body(&body) {
        Ok(message) => message,
        Err(()) => return error_body(StatusCode::BAD_REQUEST, INVALID_JSON),
    };
    match state.board.submit(message.as_deref()) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

// The body must be a JSON object; `message` must be a string, null, or
// absent. Anything else (arrays, bare strings, wrong-typed fields) is the
// malformed-body class, not a validation failure.
fn parse_submit_body(body: &[u8]) -> Result<Option<String>, ()> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ())?;
    let Value::Object(fields) = value else {
        return Err(());
    };
    match fields.get("message") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(message)) => Ok(Some(message.clone())),
        Some(_) => Err(()),
    }
}

fn error_response(err: Error) -> Response {
    if err.kind() == ErrorKind::Validation {
        let message = err.message().unwrap_or("invalid request").to_string();
        return error_body(StatusCode::BAD_REQUEST, message);
    }
    tracing::error!(error = %err, "request failed");
    error_body(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::{parse_submit_body, serve, validate_config, ErrorKind, ServeConfig};

    #[test]
    fn submit_body_accepts_object_with_string_message() {
        assert_eq!(
            parse_submit_body(br#"{"message": "hi"}"#),
            Ok(Some("hi".to_string()))
        );
    }

    #[test]
    fn submit_body_treats_missing_and_null_message_as_absent() {
        assert_eq!(parse_submit_body(b"{}"), Ok(None));
        assert_eq!(parse_submit_body(br#"{"message": null}"#), Ok(None));
    }

    #[test]
    fn submit_body_ignores_extra_fields() {
        assert_eq!(
            parse_submit_body(br#"{"message": "hi", "id": 9999, "admin": true}"#),
            Ok(Some("hi".to_string()))
        );
    }

    #[test]
    fn submit_body_rejects_non_object_bodies() {
        for body in [
            &br#"["message"]"#[..],
            br#""message""#,
            b"42",
            b"null",
            b"not json at all",
        ] {
            assert_eq!(parse_submit_body(body), Err(()));
        }
    }

    #[test]
    fn submit_body_rejects_wrong_typed_message_field() {
        assert_eq!(parse_submit_body(br#"{"message": 42}"#), Err(()));
        assert_eq!(parse_submit_body(br#"{"message": ["hi"]}"#), Err(()));
    }

    fn config(bind: &str, store: std::path::PathBuf, max_body_bytes: u64) -> ServeConfig {
        ServeConfig {
            bind: bind.parse().expect("bind"),
            store_path: store,
            max_body_bytes,
        }
    }

    #[test]
    fn body_limit_requires_positive_value() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = validate_config(&config(
            "127.0.0.1:0",
            temp.path().join("feedback.jsonl"),
            0,
        ))
        .expect_err("expected usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[tokio::test]
    async fn serve_rejects_zero_body_limit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = serve(config(
            "127.0.0.1:0",
            temp.path().join("feedback.jsonl"),
            0,
        ))
        .await
        .expect_err("expected usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[tokio::test]
    async fn serve_surfaces_store_open_failures_before_binding() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("not-a-directory");
        std::fs::write(&blocker, b"plain file").expect("write");

        let err = serve(config(
            "127.0.0.1:0",
            blocker.join("feedback.jsonl"),
            65_536,
        ))
        .await
        .expect_err("expected store error");
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
