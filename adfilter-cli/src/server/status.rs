use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notification", get(current_notification))
        .route("/health", get(health_check))
}

/// The toast a player overlay should show right now, or 204 when there is none.
async fn current_notification(State(state): State<AppState>) -> Response {
    match state.toast.current() {
        Some(toast) => Json(toast).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    filter_enabled: bool,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        filter_enabled: state.filter.is_enabled(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use hls_adfilter::{AdFilterConfig, Notifier};
    use tower::ServiceExt;

    use crate::server::create_router;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn notification_is_empty_until_something_is_filtered() {
        let state = AppState::new(&AdFilterConfig::default()).unwrap();
        let app = create_router(state.clone());

        let response = app.clone().oneshot(get("/notification")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        state.toast.notify("已过滤 30 秒 广告");
        let response = app.oneshot(get("/notification")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["message"], "已过滤 30 秒 广告");
        assert_eq!(json["id"], 1);
        assert!(json["remaining_ms"].as_u64().unwrap() <= 3000);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let state = AppState::new(&AdFilterConfig::default()).unwrap();
        let response = create_router(state).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["filter_enabled"], true);
    }
}
