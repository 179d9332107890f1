//! End-to-end read path tests: the real router, HTTP upstream client and
//! sync pipeline, against an in-process mock submission service.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use catalog_cache::api;
use catalog_cache::app_state::AppState;
use catalog_cache::metrics::CatalogMetrics;
use catalog_cache::persistence::{CatalogStore, InMemoryCatalogStore};
use catalog_cache::resilience::{CircuitBreaker, CircuitBreakerConfig};
use catalog_cache::service::CatalogReadPath;
use catalog_cache::sync::{EventStream, EventSyncPipeline, InMemoryEventStream, SyncStats};
use catalog_cache::upstream::{HttpSubmissionSource, ProtectedRemoteClient, UpstreamSource};

const TOPIC: &str = "paper-events";
const KNOWN: &str = "11111111-1111-1111-1111-111111111111";

#[derive(Debug, Default)]
struct Upstream {
    down: AtomicBool,
    calls: AtomicU32,
}

async fn upstream_item(State(upstream): State<Arc<Upstream>>, Path(id): Path<String>) -> Response {
    upstream.calls.fetch_add(1, Ordering::SeqCst);
    if upstream.down.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if id == KNOWN {
        return axum::Json(json!({
            "id": KNOWN,
            "title": "Remote paper",
            "author": "Grace",
            "abstractText": "upstream only",
            "status": "SUBMITTED",
            "createdAt": "2024-03-05T10:00:00Z",
        }))
        .into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}

async fn serve(app: Router) -> String {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

struct Service {
    base: String,
    upstream: Arc<Upstream>,
    store: Arc<InMemoryCatalogStore>,
    shutdown: CancellationToken,
    http: reqwest::Client,
}

impl Service {
    async fn start() -> Self {
        let upstream = Arc::new(Upstream::default());
        let upstream_base = serve(
            Router::new()
                .route("/api/internal/papers/{id}", get(upstream_item))
                .with_state(Arc::clone(&upstream)),
        )
        .await;

        let store = Arc::new(InMemoryCatalogStore::new());
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            max_failures: 2,
            reset_timeout: Duration::from_secs(60),
            call_timeout: Duration::from_secs(2),
            single_trial: false,
        }));
        let Ok(source) = HttpSubmissionSource::new(&upstream_base, Duration::from_secs(2)) else {
            panic!("client build failed");
        };
        let remote = Arc::new(ProtectedRemoteClient::new(
            Arc::new(source) as Arc<dyn UpstreamSource>,
            Arc::clone(&breaker),
        ));
        let read_path = Arc::new(CatalogReadPath::new(
            Arc::clone(&store) as Arc<dyn CatalogStore>,
            remote,
        ));

        let Ok(metrics) = CatalogMetrics::new() else {
            panic!("metrics registry builds");
        };
        let Ok(sync_stats) = SyncStats::new() else {
            panic!("sync metrics build");
        };
        if sync_stats.register(metrics.registry()).is_err() {
            panic!("sync metrics register");
        }
        let sync_stats = Arc::new(sync_stats);

        let events = InMemoryEventStream::new(4);
        let shutdown = CancellationToken::new();
        let pipeline = EventSyncPipeline::new(
            Arc::new(events.clone()) as Arc<dyn EventStream>,
            Arc::clone(&store) as Arc<dyn CatalogStore>,
            TOPIC,
            Arc::clone(&sync_stats),
        )
        .with_retry_interval(Duration::from_millis(20));
        tokio::spawn(pipeline.run(shutdown.child_token()));

        let state = AppState {
            read_path,
            breaker,
            events,
            event_topic: TOPIC.to_string(),
            event_publish_timeout: Duration::from_secs(2),
            sync_stats,
            metrics: Arc::new(metrics),
        };
        let base = serve(api::build_router(state)).await;

        Self {
            base,
            upstream,
            store,
            shutdown,
            http: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> (reqwest::StatusCode, Value) {
        let Ok(response) = self.http.get(format!("{}{path}", self.base)).send().await else {
            panic!("request to {path} failed");
        };
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn publish(&self, payload: &Value) -> reqwest::StatusCode {
        let Ok(response) = self
            .http
            .post(format!("{}/api/v1/internal/events", self.base))
            .json(payload)
            .send()
            .await
        else {
            panic!("publish failed");
        };
        response.status()
    }

    async fn metrics(&self) -> String {
        let Ok(response) = self.http.get(format!("{}/metrics", self.base)).send().await else {
            panic!("metrics request failed");
        };
        response.text().await.unwrap_or_default()
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[tokio::test]
async fn miss_falls_back_to_submission_service() {
    let service = Service::start().await;

    let (status, body) = service.get(&format!("/api/v1/catalog/{KNOWN}")).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["title"], "Remote paper");
    assert_eq!(body["source"], "submission_service");
    assert_eq!(service.upstream.calls.load(Ordering::SeqCst), 1);
    assert!(service.store.is_empty().await, "remote hits are not cached");
}

#[tokio::test]
async fn unknown_everywhere_is_not_found() {
    let service = Service::start().await;

    let (status, body) = service
        .get("/api/v1/catalog/99999999-9999-9999-9999-999999999999")
        .await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 2001);

    let (_, status_body) = service.get("/status").await;
    assert_eq!(status_body["circuit_breaker"]["state"], "CLOSED");
    assert_eq!(status_body["circuit_breaker"]["failure_count"], 0);
}

#[tokio::test]
async fn failing_upstream_trips_the_breaker() {
    let service = Service::start().await;
    service.upstream.down.store(true, Ordering::SeqCst);
    let path = format!("/api/v1/catalog/{KNOWN}");

    for _ in 0..2 {
        let (status, _) = service.get(&path).await;
        assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    }
    assert_eq!(service.upstream.calls.load(Ordering::SeqCst), 2);

    // Open: short-circuited without reaching the upstream.
    let (status, _) = service.get(&path).await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    assert_eq!(service.upstream.calls.load(Ordering::SeqCst), 2);

    let (_, body) = service.get("/status").await;
    assert_eq!(body["circuit_breaker"]["state"], "OPEN");
    assert_eq!(body["circuit_breaker"]["failure_count"], 2);
}

#[tokio::test]
async fn ingested_event_is_served_locally() {
    let service = Service::start().await;

    let id = "44444444-4444-4444-4444-444444444444";
    let status = service
        .publish(&json!({
            "id": id,
            "title": "Synced paper",
            "author": "Ada",
            "createdAt": "2024-01-01T00:00:00Z",
        }))
        .await;
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    let path = format!("/api/v1/catalog/{id}");
    let mut served = Value::Null;
    for _ in 0..200 {
        let (status, body) = service.get(&path).await;
        if status == reqwest::StatusCode::OK && body["source"] == "local_db" {
            served = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(served["title"], "Synced paper");
    assert_eq!(served["status"], "SUBMITTED");
    assert_eq!(served["abstract_text"], "");

    let (_, body) = service.get("/status").await;
    assert_eq!(body["sync"]["connected"], true);
    assert_eq!(body["sync"]["applied"], 1);
}

#[tokio::test]
async fn malformed_event_is_skipped_and_counted() {
    let service = Service::start().await;

    let status = service.publish(&json!({ "id": "not-a-uuid", "title": "x" })).await;
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    let mut rejected = Value::Null;
    for _ in 0..200 {
        let (_, body) = service.get("/status").await;
        if body["sync"]["rejected"] == 1 {
            rejected = body["sync"]["rejected"].clone();
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(rejected, 1);
    assert!(service.store.is_empty().await);
}

#[tokio::test]
async fn burst_of_events_beyond_capacity_is_fully_synced() {
    let service = Service::start().await;

    let ids: Vec<String> = (0..12)
        .map(|n| format!("55555555-5555-5555-5555-{n:012}"))
        .collect();
    for id in &ids {
        let status = service
            .publish(&json!({ "id": id, "title": "Burst", "author": "Ada" }))
            .await;
        assert_eq!(status, reqwest::StatusCode::ACCEPTED);
    }

    for _ in 0..200 {
        if service.store.len().await == ids.len() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(service.store.len().await, ids.len());

    let (_, body) = service.get("/status").await;
    assert_eq!(body["sync"]["applied"], 12);
    assert_eq!(body["sync"]["lost"], 0);
}

#[tokio::test]
async fn metrics_endpoint_reports_consumed_events_and_breaker() {
    let service = Service::start().await;
    let _ = service.publish(&json!({ "id": "not-a-uuid" })).await;
    for _ in 0..200 {
        let (_, body) = service.get("/status").await;
        if body["sync"]["rejected"] == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let text = service.metrics().await;
    assert!(text.lines().any(|l| l.starts_with("catalog_events_consumed_total{status=\"rejected\"} 1")));
    assert!(text.lines().any(|l| l == "catalog_circuit_breaker_state 0"));
    assert!(text.contains("catalog_request_duration_seconds_bucket"));
}
