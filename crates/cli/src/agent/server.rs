//! HTTP surface: scrape endpoint, self-metrics and liveness.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use handlers::{exposition::CONTENT_TYPE, SnapshotCache};
use observability::PrometheusHandle;

/// State shared by every route
#[derive(Clone)]
pub struct ServerState {
    /// One cache per Prometheus handler
    pub caches: Arc<Vec<Arc<SnapshotCache>>>,
    /// Self-metrics recorder, when installed
    pub internal: Option<PrometheusHandle>,
}

impl ServerState {
    pub fn new(caches: Vec<Arc<SnapshotCache>>, internal: Option<PrometheusHandle>) -> Self {
        Self {
            caches: Arc::new(caches),
            internal,
        }
    }
}

/// Builds the `Router` with all routes.
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/internal/metrics", get(internal_metrics))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Combined payload of every Prometheus handler
async fn metrics(State(state): State<ServerState>) -> Response {
    let body = SnapshotCache::render_all(&state.caches);
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

async fn internal_metrics(State(state): State<ServerState>) -> Response {
    match &state.internal {
        Some(handle) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "internal metrics disabled").into_response(),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MetricRecord;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn body_of(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn published_cache() -> Arc<SnapshotCache> {
        let cache = Arc::new(SnapshotCache::new("prometheus").without_timestamps());
        cache.begin_generation("LoadAvg");
        cache.append("LoadAvg", MetricRecord::with_value("loadavg.1", 0.5));
        cache.end_generation("LoadAvg");
        cache
    }

    #[tokio::test]
    async fn test_metrics_skips_empty_caches() {
        let empty = Arc::new(SnapshotCache::new("other"));
        let state = ServerState::new(vec![published_cache(), empty], None);

        let response = metrics(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
        let body = body_of(response).await;
        assert_eq!(body, "# TYPE loadavg_1 gauge\nloadavg_1{} 0.5\n");
    }

    #[tokio::test]
    async fn test_metrics_shares_type_lines_across_caches() {
        let state = ServerState::new(vec![published_cache(), published_cache()], None);

        let body = body_of(metrics(State(state)).await).await;
        assert_eq!(body.matches("# TYPE loadavg_1 gauge\n").count(), 1);
        assert_eq!(
            body,
            "# TYPE loadavg_1 gauge\nloadavg_1{} 0.5\nloadavg_1{} 0.5\n"
        );
    }

    #[tokio::test]
    async fn test_internal_metrics_disabled() {
        let state = ServerState::new(vec![], None);
        let response = internal_metrics(State(state)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_router_serves_routes() {
        let state = ServerState::new(vec![published_cache()], None);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });

        for (path, expected) in [("/healthz", "ok"), ("/metrics", "loadavg_1{} 0.5")] {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            let request =
                format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
            stream.write_all(request.as_bytes()).await.unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
            assert!(response.contains(expected), "got: {response}");
        }

        server.abort();
    }
}
