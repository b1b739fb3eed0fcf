// Integration tests for the push dispatcher and dispatch worker against a
// local fake push backend.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use fleetwatch::agreement::Agreement;
use fleetwatch::config::PushConfig;
use fleetwatch::directory::InMemoryTokenDirectory;
use fleetwatch::notify::{
    DispatchError, DispatchWorker, Notification, PushDispatcher, Recipient,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Recorded request: Authorization header value + JSON body.
struct FakeBackend {
    requests: Mutex<Vec<(String, serde_json::Value)>>,
    /// When true, topic-addressed requests are answered with 500
    reject_topics: bool,
}

impl FakeBackend {
    fn new(reject_topics: bool) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reject_topics,
        })
    }

    fn recorded(&self) -> Vec<(String, serde_json::Value)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle_push(
    State(backend): State<Arc<FakeBackend>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let auth = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let is_topic = body["to"]
        .as_str()
        .map(|to| to.starts_with("/topics/"))
        .unwrap_or(false);

    backend.requests.lock().unwrap().push((auth, body));

    if backend.reject_topics && is_topic {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

/// Start the fake backend on a loopback port; returns its URL.
async fn spawn_backend(backend: Arc<FakeBackend>) -> String {
    let app = Router::new()
        .route("/", post(handle_push))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

fn agreement() -> Agreement {
    let now = Utc::now();
    Agreement {
        id: "agr-1".to_string(),
        asset_id: "vehicle123".to_string(),
        customer_id: "cust-9".to_string(),
        speed_limit: 60.0,
        start_time: now - Duration::hours(1),
        end_time: now + Duration::hours(1),
    }
}

fn dispatcher_for(backend_url: String, directory: Arc<InMemoryTokenDirectory>) -> PushDispatcher {
    let config = PushConfig {
        backend_url,
        company_topic: "fleet-alerts".to_string(),
        timeout_seconds: 5,
        max_retries: 1,
        retry_base_delay_ms: 10,
        ..PushConfig::default()
    };
    PushDispatcher::new(&config, "test-key".to_string(), directory).unwrap()
}

async fn wait_for_requests(backend: &Arc<FakeBackend>, n: usize) {
    for _ in 0..200 {
        if backend.requests.lock().unwrap().len() >= n {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("fake backend never received {} requests", n);
}

#[tokio::test]
async fn test_company_notification_is_topic_addressed_and_authorized() {
    let backend = FakeBackend::new(false);
    let url = spawn_backend(Arc::clone(&backend)).await;
    let dispatcher = dispatcher_for(url, Arc::new(InMemoryTokenDirectory::new()));

    dispatcher
        .notify_company(&agreement(), "Speed exceeded: 65.0 > 60.0")
        .await
        .unwrap();

    let recorded = backend.recorded();
    assert_eq!(recorded.len(), 1);
    let (auth, body) = &recorded[0];
    assert_eq!(auth, "key=test-key");
    assert_eq!(body["to"], "/topics/fleet-alerts");
    assert_eq!(body["notification"]["body"], "Speed exceeded: 65.0 > 60.0");
    assert_eq!(body["data"]["assetId"], "vehicle123");
    assert_eq!(body["data"]["agreementId"], "agr-1");
}

#[tokio::test]
async fn test_customer_notification_uses_registered_device_token() {
    let backend = FakeBackend::new(false);
    let url = spawn_backend(Arc::clone(&backend)).await;
    let directory = Arc::new(InMemoryTokenDirectory::new());
    directory.register("cust-9", "device-token-xyz");
    let dispatcher = dispatcher_for(url, directory);

    dispatcher
        .notify_customer(&agreement(), "Speed exceeded: 65.0 > 60.0")
        .await
        .unwrap();

    let recorded = backend.recorded();
    assert_eq!(recorded.len(), 1);
    let (_, body) = &recorded[0];
    assert_eq!(body["to"], "device-token-xyz");
    assert_eq!(body["data"]["customerId"], "cust-9");
    assert!(body["data"].get("agreementId").is_none());
}

#[tokio::test]
async fn test_unresolved_recipient_makes_no_request() {
    let backend = FakeBackend::new(false);
    let url = spawn_backend(Arc::clone(&backend)).await;
    let dispatcher = dispatcher_for(url, Arc::new(InMemoryTokenDirectory::new()));

    let result = dispatcher.notify_customer(&agreement(), "msg").await;

    assert_eq!(
        result,
        Err(DispatchError::UnresolvedRecipient("cust-9".to_string()))
    );
    assert!(backend.recorded().is_empty());
}

#[tokio::test]
async fn test_non_success_status_is_rejected_without_retry() {
    let backend = FakeBackend::new(true);
    let url = spawn_backend(Arc::clone(&backend)).await;
    let dispatcher = dispatcher_for(url, Arc::new(InMemoryTokenDirectory::new()));

    let result = dispatcher.notify_company(&agreement(), "msg").await;

    assert_eq!(result, Err(DispatchError::TransportRejected(500)));
    // Rejections are terminal: exactly one attempt
    assert_eq!(backend.recorded().len(), 1);
}

#[tokio::test]
async fn test_unreachable_backend_surfaces_after_retries() {
    // Bind then drop a listener to get a port nothing is listening on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dispatcher = dispatcher_for(
        format!("http://{}/", addr),
        Arc::new(InMemoryTokenDirectory::new()),
    );

    let result = dispatcher.notify_company(&agreement(), "msg").await;
    assert!(matches!(result, Err(DispatchError::Unreachable(_))));
}

#[tokio::test]
async fn test_company_failure_does_not_block_customer_dispatch() {
    // Topic requests fail with 500; device requests succeed
    let backend = FakeBackend::new(true);
    let url = spawn_backend(Arc::clone(&backend)).await;
    let directory = Arc::new(InMemoryTokenDirectory::new());
    directory.register("cust-9", "device-token-xyz");
    let dispatcher = dispatcher_for(url, directory);

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(DispatchWorker::new(dispatcher, rx).run());

    let message = "Speed exceeded: 65.0 > 60.0".to_string();
    tx.send(Notification {
        recipient: Recipient::Company,
        agreement: agreement(),
        message: message.clone(),
    })
    .await
    .unwrap();
    tx.send(Notification {
        recipient: Recipient::Customer,
        agreement: agreement(),
        message,
    })
    .await
    .unwrap();

    wait_for_requests(&backend, 2).await;

    let recorded = backend.recorded();
    let targets: Vec<&str> = recorded
        .iter()
        .map(|(_, body)| body["to"].as_str().unwrap())
        .collect();
    assert!(targets.contains(&"/topics/fleet-alerts"));
    assert!(targets.contains(&"device-token-xyz"));
}
