use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use channel_store::StorageSink;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::{resolver::ChannelResolver, AudioPipeline};

/// Health check plus a manual trigger for the shared pipeline.
pub fn router<R, S>(pipeline: Arc<AudioPipeline<R, S>>) -> Router
where
    R: ChannelResolver + Send + Sync + 'static,
    S: StorageSink + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .route("/health", get(health))
        .route("/run", post(trigger_run::<R, S>))
        .layer(cors)
        .with_state(pipeline)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Starts a run in the background and returns at once; the outcome only
/// shows up in the logs.
async fn trigger_run<R, S>(State(pipeline): State<Arc<AudioPipeline<R, S>>>) -> impl IntoResponse
where
    R: ChannelResolver + Send + Sync + 'static,
    S: StorageSink + Send + Sync + 'static,
{
    if pipeline.is_running() {
        tracing::info!("Manual trigger rejected, run in progress");
        return (StatusCode::CONFLICT, Json(json!({ "status": "busy" })));
    }

    tracing::info!("Manual trigger accepted");
    tokio::spawn(async move {
        pipeline.run().await;
    });

    (StatusCode::ACCEPTED, Json(json!({ "status": "started" })))
}

#[cfg(test)]
mod tests {
    use std::{path::Path, time::Duration};

    use axum::body::Body;
    use axum::http::Request;
    use channel_store::UploadReceipt;
    use tokio::sync::Notify;
    use tower::util::ServiceExt;

    use super::*;
    use crate::{AudioPipelineBuilder, VideoDescriptor};

    /// Holds the run open until notified, then finds nothing.
    struct GatedResolver(Arc<Notify>);

    impl ChannelResolver for GatedResolver {
        async fn resolve_latest(&self) -> Option<VideoDescriptor> {
            self.0.notified().await;
            None
        }
    }

    struct NoopSink;

    impl StorageSink for NoopSink {
        async fn upload(&self, _path: &Path) -> anyhow::Result<UploadReceipt> {
            anyhow::bail!("not used")
        }
    }

    fn pipeline(gate: Arc<Notify>) -> Arc<AudioPipeline<GatedResolver, NoopSink>> {
        let workdir = std::env::temp_dir().join(format!("channel-pulse-{}", uuid::Uuid::new_v4()));
        Arc::new(
            AudioPipelineBuilder::new(workdir)
                .resolver(GatedResolver(gate))
                .sink(NoopSink)
                .build(),
        )
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(pipeline(Arc::new(Notify::new())));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_trigger_starts_run() {
        let gate = Arc::new(Notify::new());
        let pipeline = pipeline(gate.clone());
        let app = router(pipeline.clone());

        let response = app
            .oneshot(Request::post("/run").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await, json!({ "status": "started" }));

        gate.notify_one();
    }

    #[tokio::test]
    async fn test_trigger_while_running_is_busy() {
        let gate = Arc::new(Notify::new());
        let pipeline = pipeline(gate.clone());

        let running = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run().await })
        };
        tokio::time::timeout(Duration::from_secs(5), async {
            while !pipeline.is_running() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let response = router(pipeline.clone())
            .oneshot(Request::post("/run").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await, json!({ "status": "busy" }));

        gate.notify_one();
        assert!(running.await.unwrap().is_ok());
        assert!(!pipeline.is_running());
    }

    #[tokio::test]
    async fn test_get_run_not_allowed() {
        let app = router(pipeline(Arc::new(Notify::new())));
        let response = app
            .oneshot(Request::get("/run").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
