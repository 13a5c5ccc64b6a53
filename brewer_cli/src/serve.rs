//! HTTP control surface.
//!
//! Thin axum routes over the four control operations plus the forced-status
//! hook. Controller calls that block (device writes, the submit settle
//! interval) run on the blocking pool.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use brewer_core::{BrewError, BrewOrder, OrderController, OrderError};
use eyre::{Result, WrapErr};
use serde_json::json;
use tokio::signal;

use crate::link::Link;

#[derive(Clone)]
struct AppState {
    controller: OrderController,
}

/// Reset the device, start the monitor and serve until Ctrl-C/SIGTERM.
pub fn run_server(cfg: &brewer_config::Config, link: Link, bind: &str) -> Result<()> {
    let controller = crate::controller_for(cfg, link.writer);
    tracing::info!("initially resetting the device");
    controller.stop_order()?;
    let mut monitor = controller.spawn_monitor(link.reader);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("start async runtime")?;
    let served = rt.block_on(serve(controller.clone(), bind));

    tracing::info!("shutting down");
    if let Err(e) = controller.stop_order() {
        tracing::warn!(error = %e, "failed to force the device idle on shutdown");
    }
    monitor.shutdown();
    served
}

pub(crate) fn router(controller: OrderController) -> Router {
    Router::new()
        .route("/", get(|| async { "Use: /status" }))
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/history", get(history))
        .route("/order", get(order))
        .route("/orders", post(submit))
        .route("/stop", post(stop))
        .route("/force/:code", post(force))
        // routes of the original webservice, kept for existing clients
        .route("/getStatus", get(status))
        .route("/getLastNStatus", get(history))
        .route("/createNewOrder", post(submit))
        .route("/stopOrder", get(stop))
        .route("/forceDone", get(force_done))
        .with_state(AppState { controller })
}

async fn serve(controller: OrderController, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .wrap_err_with(|| format!("bind {bind}"))?;
    tracing::info!(addr = %bind, "serving control API");
    axum::serve(listener, router(controller))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("http server")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
}

fn error_response(e: &eyre::Report) -> Response {
    let code = match e.downcast_ref::<BrewError>() {
        Some(BrewError::Order(_) | BrewError::UnknownCode(_)) => StatusCode::BAD_REQUEST,
        Some(BrewError::Link(_)) => StatusCode::SERVICE_UNAVAILABLE,
        _ if e.downcast_ref::<OrderError>().is_some() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(status = code.as_u16(), error = %e, "request failed");
    (code, Json(json!({ "error": e.to_string() }))).into_response()
}

async fn blocking<T, F>(f: F) -> std::result::Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(error_response(&e)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response()),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.current_status())
}

async fn history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.recent_history())
}

async fn order(State(state): State<AppState>) -> Response {
    let ctl = state.controller;
    match blocking(move || Ok(ctl.order_snapshot())).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(resp) => resp,
    }
}

async fn submit(State(state): State<AppState>, body: String) -> Response {
    let order = match BrewOrder::from_json(&body) {
        Ok(o) => o,
        Err(e) => return error_response(&eyre::Report::new(e)),
    };
    let name = order.name.clone();
    let ctl = state.controller;
    match blocking(move || ctl.submit_order(order)).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({ "accepted": name, "message": "Order received" })),
        )
            .into_response(),
        Err(resp) => resp,
    }
}

async fn stop(State(state): State<AppState>) -> Response {
    let ctl = state.controller;
    match blocking(move || ctl.stop_order()).await {
        Ok(()) => Json(json!({ "message": "Order stopped" })).into_response(),
        Err(resp) => resp,
    }
}

async fn force(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    let ctl = state.controller;
    let forced = code.clone();
    match blocking(move || ctl.force_status(&forced)).await {
        Ok(()) => Json(json!({ "forced": code })).into_response(),
        Err(resp) => resp,
    }
}

async fn force_done(state: State<AppState>) -> Response {
    force(state, Path("done".to_string())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use brewer_core::mocks::RecordingWriter;
    use tower::util::ServiceExt; // for `oneshot`

    fn app() -> (Router, RecordingWriter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let writer = RecordingWriter::default();
        let ctl = OrderController::builder()
            .with_writer(writer.clone())
            .with_storage_dir(dir.path())
            .build();
        (router(ctl), writer, dir)
    }

    async fn call(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn submit_then_status() {
        let (app, writer, _dir) = app();
        let (code, _) = call(
            app.clone(),
            "POST",
            "/orders",
            r#"{"name":"IPA","steps":[{"temperature":65,"duration":30}]}"#,
        )
        .await;
        assert_eq!(code, StatusCode::ACCEPTED);
        assert_eq!(writer.lines(), vec!["heat;65;30;"]);

        let (code, body) = call(app, "GET", "/order", "").await;
        assert_eq!(code, StatusCode::OK);
        let v: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["phase"], "running");
        assert_eq!(v["cursor"]["step"], 0);
    }

    #[tokio::test]
    async fn invalid_order_is_400() {
        let (app, writer, _dir) = app();
        let (code, body) = call(app, "POST", "/orders", r#"{"name":"IPA","steps":[]}"#).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body.contains("no mash steps"));
        assert!(writer.lines().is_empty());
    }

    #[tokio::test]
    async fn unknown_force_code_is_400() {
        let (app, writer, _dir) = app();
        let (code, _) = call(app.clone(), "POST", "/force/boil", "").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        let (code, _) = call(app, "GET", "/forceDone", "").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(writer.lines(), vec!["done;"]);
    }
}
