//! Integration tests for the HTTP transport.
//!
//! Each test starts an in-process Axum server on an ephemeral port that
//! plays the backend, then drives [`HttpTransport`] against it over real
//! HTTP.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use goldenhour_client::{
    ClientConfig, EmergencyApi, ErrorClass, HttpTransport, MemoryCredentials, Operation,
    TransportError,
};
use goldenhour_types::{
    Coordinates, EmergencyId, EmergencyReport, EmergencyStatus, HospitalId, NotifyRequest,
    Severity,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Default)]
struct Seen {
    authorization: Mutex<Vec<Option<String>>>,
    request_ids: Mutex<Vec<String>>,
    notify_bodies: Mutex<Vec<Value>>,
}

impl Seen {
    fn record(&self, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        self.authorization
            .lock()
            .unwrap()
            .push(header("authorization"));
        if let Some(id) = header("x-request-id") {
            self.request_ids.lock().unwrap().push(id);
        }
    }
}

async fn triage(State(seen): State<Arc<Seen>>, headers: HeaderMap) -> Json<Value> {
    seen.record(&headers);
    Json(json!({
        "emergencyId": "e-42",
        "severity": "critical",
        "recommendedSpecialty": "cardiology",
        "estimatedResponseTime": 8
    }))
}

async fn status(
    State(seen): State<Arc<Seen>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    seen.record(&headers);
    match id.as_str() {
        "unauthorized" => StatusCode::UNAUTHORIZED.into_response(),
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "missing" => StatusCode::NOT_FOUND.into_response(),
        "teapot" => StatusCode::IM_A_TEAPOT.into_response(),
        "garbled" => "this is not json".into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"status": "PROCESSING"})).into_response()
        }
        _ => Json(json!({
            "emergencyId": id,
            "status": "ASSIGNED",
            "assignedHospital": "city_general",
            "agentName": "Routing Agent"
        }))
        .into_response(),
    }
}

async fn hospitals(State(seen): State<Arc<Seen>>, headers: HeaderMap) -> Json<Value> {
    seen.record(&headers);
    Json(json!({
        "hospitals": [
            {"id": "city_general", "name": "City General", "distance": 2.4, "eta": 9},
            {"id": "st_marys", "name": "St. Mary's", "isRecommended": true}
        ]
    }))
}

async fn notify(
    State(seen): State<Arc<Seen>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    seen.record(&headers);
    seen.notify_bodies.lock().unwrap().push(body);
    Json(json!({"success": true, "status": "alerts_sent", "eta": 12}))
}

/// Start the fake backend and return its API base URL.
async fn spawn_backend(seen: Arc<Seen>) -> String {
    let router = Router::new()
        .route("/api/v1/triage", post(triage))
        .route("/api/v1/status/{id}", get(status))
        .route("/api/v1/hospitals/{id}", get(hospitals))
        .route("/api/v1/notify", post(notify))
        .with_state(seen);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

fn sample_report() -> EmergencyReport {
    EmergencyReport {
        location: Coordinates::new(28.6139, 77.209),
        symptoms: vec!["chest pain".to_owned(), "shortness of breath".to_owned()],
        vitals: BTreeMap::from([("heart_rate".to_owned(), json!(128))]),
        age: 61,
        description: "Collapsed while walking".to_owned(),
        contact_email: "family@example.com".to_owned(),
    }
}

#[tokio::test]
async fn submit_attaches_token_and_request_id() {
    let seen = Arc::new(Seen::default());
    let api_url = spawn_backend(Arc::clone(&seen)).await;
    let mut config = ClientConfig::new(api_url);
    config.auth_token = Some("secret-token".to_owned());
    let transport = HttpTransport::new(&config).unwrap();

    let triage = transport.submit_emergency(&sample_report()).await.unwrap();
    assert_eq!(triage.emergency_id, EmergencyId::new("e-42"));
    assert_eq!(triage.severity, Some(Severity::Critical));
    assert_eq!(triage.estimated_response_time, Some(8));

    let auth = seen.authorization.lock().unwrap().clone();
    assert_eq!(auth, vec![Some("Bearer secret-token".to_owned())]);
    let ids = seen.request_ids.lock().unwrap().clone();
    assert_eq!(ids.len(), 1);
    assert!(ids.first().is_some_and(|id| uuid_like(id)));
}

#[tokio::test]
async fn token_is_read_from_store_on_every_call() {
    let seen = Arc::new(Seen::default());
    let api_url = spawn_backend(Arc::clone(&seen)).await;
    let store = Arc::new(MemoryCredentials::new(None));
    let transport =
        HttpTransport::with_credentials(&ClientConfig::new(api_url), Arc::clone(&store) as _)
            .unwrap();
    let id = EmergencyId::new("e-1");

    transport.get_status(&id).await.unwrap();
    store.set("after-login");
    transport.get_status(&id).await.unwrap();

    let auth = seen.authorization.lock().unwrap().clone();
    assert_eq!(auth, vec![None, Some("Bearer after-login".to_owned())]);
}

#[tokio::test]
async fn status_payload_decodes() {
    let seen = Arc::new(Seen::default());
    let transport = HttpTransport::new(&ClientConfig::new(spawn_backend(seen).await)).unwrap();

    let payload = transport
        .get_status(&EmergencyId::new("e-9"))
        .await
        .unwrap();
    assert_eq!(payload.status, Some(EmergencyStatus::Assigned));
    assert_eq!(payload.emergency_id, Some(EmergencyId::new("e-9")));
    assert_eq!(payload.assigned_hospital, Some(json!("city_general")));
    assert_eq!(payload.activity.agent_name.as_deref(), Some("Routing Agent"));
    assert!(payload.signals_assignment());
}

#[tokio::test]
async fn http_failures_are_classified() {
    let seen = Arc::new(Seen::default());
    let transport = HttpTransport::new(&ClientConfig::new(spawn_backend(seen).await)).unwrap();

    let cases = [
        ("unauthorized", ErrorClass::Unauthorized),
        ("broken", ErrorClass::ServerFault),
        ("missing", ErrorClass::NotFound),
        ("teapot", ErrorClass::Unknown),
        ("garbled", ErrorClass::Unknown),
    ];
    for (id, expected) in cases {
        let err = transport
            .get_status(&EmergencyId::new(id))
            .await
            .unwrap_err();
        assert_eq!(err.class(), expected, "emergency id {id}");
        assert_eq!(err.operation(), Operation::GetStatus);
    }

    let err = transport
        .get_status(&EmergencyId::new("broken"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TransportError::ServerFault {
            operation: Operation::GetStatus,
            status: 500
        }
    );
}

#[tokio::test]
async fn hospital_detail_is_returned_raw() {
    let seen = Arc::new(Seen::default());
    let transport = HttpTransport::new(&ClientConfig::new(spawn_backend(seen).await)).unwrap();

    let raw = transport
        .get_hospital_detail(&EmergencyId::new("e-1"))
        .await
        .unwrap();
    let list = raw.get("hospitals").and_then(Value::as_array).unwrap();
    assert_eq!(list.len(), 2);
}

#[tokio::test]
async fn notify_sends_camel_case_body() {
    let seen = Arc::new(Seen::default());
    let api_url = spawn_backend(Arc::clone(&seen)).await;
    let transport = HttpTransport::new(&ClientConfig::new(api_url)).unwrap();

    let ack = transport
        .notify_hospital(&NotifyRequest {
            hospital_id: HospitalId::new("city_general"),
            emergency_id: EmergencyId::new("e-42"),
        })
        .await
        .unwrap();
    assert_eq!(ack.success, Some(true));
    assert_eq!(ack.eta_minutes, Some(12));

    let bodies = seen.notify_bodies.lock().unwrap().clone();
    assert_eq!(
        bodies,
        vec![json!({"hospitalId": "city_general", "emergencyId": "e-42"})]
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport =
        HttpTransport::new(&ClientConfig::new(format!("http://{addr}/api/v1"))).unwrap();
    let err = transport
        .get_status(&EmergencyId::new("e-1"))
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Network);
    assert!(err.class().is_retryable());
}

#[tokio::test]
async fn slow_backend_times_out_as_network_error() {
    let seen = Arc::new(Seen::default());
    let mut config = ClientConfig::new(spawn_backend(seen).await);
    config.request_timeout = Duration::from_millis(200);
    let transport = HttpTransport::new(&config).unwrap();

    let err = transport
        .get_status(&EmergencyId::new("slow"))
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Network);
    assert!(err.to_string().contains("timed out"));
}

fn uuid_like(value: &str) -> bool {
    value.len() == 36 && value.chars().filter(|c| *c == '-').count() == 4
}
