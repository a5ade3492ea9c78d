//! HttpBackend against an in-process axum server speaking the assistant API.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::{json, Value};

use medassist_lib::assistant::appointment_command::AppointmentInterpreter;
use medassist_lib::assistant::backend::{
    AppointmentService, ChatBackend, ConsultationChatRequest, GeneralChatRequest, HealthProbe,
    HistoryEntry, HistoryRole,
};
use medassist_lib::assistant::client::{BackendError, HttpBackend};
use medassist_lib::assistant::clock::FixedClock;
use medassist_lib::assistant::connectivity::ConnectivityMonitor;
use medassist_lib::assistant::context::ContextLimits;
use medassist_lib::assistant::notify::TracingNotifier;
use medassist_lib::assistant::orchestrator::{ChatOrchestrator, TurnOutcome};
use medassist_lib::config::AssistantConfig;
use medassist_lib::models::{AppointmentRequest, Consultation, PatientRecord};

#[derive(Clone, Default)]
struct Seen {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

impl Seen {
    fn record(&self, headers: &HeaderMap, body: Value) {
        self.auth.lock().unwrap().push(
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        );
        self.bodies.lock().unwrap().push(body);
    }
}

async fn consultation_chat(
    State(seen): State<Seen>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let message = body["message"].as_str().unwrap_or_default().to_string();
    seen.record(&headers, body);
    Json(json!({ "response": format!("consultation {id}: {message}") }))
}

async fn general_chat(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    seen.record(&headers, body);
    Json(json!({ "response": "réponse générale" }))
}

async fn create_appointment(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let created = json!({ "id": 99, "date": body["date"], "time": body["time"] });
    seen.record(&headers, body);
    (StatusCode::CREATED, Json(created))
}

fn healthy_api(seen: Seen) -> Router {
    Router::new()
        .route("/api/health", get(|| async { StatusCode::OK }))
        .route("/api/assistant/consultations/:id/chat", post(consultation_chat))
        .route("/api/assistant/chat", post(general_chat))
        .route("/api/appointments", post(create_appointment))
        .with_state(seen)
}

fn broken_api() -> Router {
    Router::new()
        .route(
            "/api/health",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }),
        )
        .route(
            "/api/assistant/consultations/:id/chat",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        )
        .route(
            "/api/assistant/chat",
            post(|| async { Json(json!({ "answer": "wrong field" })) }),
        )
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn backend(base_url: &str) -> HttpBackend {
    let config = AssistantConfig {
        backend_url: base_url.to_string(),
        api_token: Some("secret".into()),
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
        ..AssistantConfig::default()
    };
    HttpBackend::new(&config).unwrap()
}

fn consultation() -> Consultation {
    Consultation {
        id: 42,
        patient_id: 3,
        doctor_id: 1,
        patient_name: Some("Jeanne Martin".into()),
        date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
        reason: "Toux persistante".into(),
        diagnosis: None,
        notes: None,
    }
}

#[tokio::test]
async fn consultation_chat_posts_camel_case_with_token() {
    let seen = Seen::default();
    let base = serve(healthy_api(seen.clone())).await;
    let backend = backend(&base);

    let reply = backend
        .consultation_chat(&ConsultationChatRequest {
            consultation_id: 42,
            message: "Synthèse ?".into(),
            message_history: vec![HistoryEntry {
                role: HistoryRole::System,
                content: "<CONSULTATION ACTIVE>".into(),
                timestamp: "2026-03-10T10:00:00".into(),
            }],
        })
        .await
        .unwrap();

    assert_eq!(reply, "consultation 42: Synthèse ?");
    let bodies = seen.bodies.lock().unwrap();
    assert_eq!(bodies[0]["consultationId"], 42);
    assert_eq!(bodies[0]["messageHistory"][0]["role"], "system");
    assert_eq!(
        seen.auth.lock().unwrap()[0].as_deref(),
        Some("Bearer secret")
    );
}

#[tokio::test]
async fn general_chat_uses_general_endpoint() {
    let seen = Seen::default();
    let base = serve(healthy_api(seen.clone())).await;

    let reply = backend(&base)
        .general_chat(&GeneralChatRequest {
            message: "Bonjour".into(),
            message_history: Vec::new(),
        })
        .await
        .unwrap();

    assert_eq!(reply, "réponse générale");
    assert_eq!(seen.bodies.lock().unwrap()[0]["messageHistory"], json!([]));
}

#[tokio::test]
async fn appointment_creation_returns_record() {
    let seen = Seen::default();
    let base = serve(healthy_api(seen.clone())).await;

    let record = backend(&base)
        .create_appointment(&AppointmentRequest {
            patient_id: 3,
            doctor_id: 1,
            date: NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(),
            time: "15:00".into(),
            reason: "douleur thoracique".into(),
        })
        .await
        .unwrap();

    assert_eq!(record["id"], 99);
    let bodies = seen.bodies.lock().unwrap();
    assert_eq!(bodies[0]["patientId"], 3);
    assert_eq!(bodies[0]["doctorId"], 1);
    assert_eq!(bodies[0]["date"], "2026-03-11");
}

#[tokio::test]
async fn health_probe_follows_status() {
    let ok = serve(healthy_api(Seen::default())).await;
    assert!(backend(&ok).probe().await.is_ok());

    let down = serve(broken_api()).await;
    assert!(matches!(
        backend(&down).probe().await,
        Err(BackendError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn non_success_status_keeps_body() {
    let base = serve(broken_api()).await;
    let err = backend(&base)
        .consultation_chat(&ConsultationChatRequest {
            consultation_id: 1,
            message: "toux".into(),
            message_history: Vec::new(),
        })
        .await
        .unwrap_err();

    match err {
        BackendError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_response_field_is_malformed() {
    let base = serve(broken_api()).await;
    let err = backend(&base)
        .general_chat(&GeneralChatRequest {
            message: "toux".into(),
            message_history: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::MalformedResponse(_)));
}

#[tokio::test]
async fn refused_connection_is_a_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = backend(&format!("http://{addr}")).probe().await.unwrap_err();
    assert!(matches!(err, BackendError::Connection(_)));
}

#[tokio::test]
async fn orchestrator_end_to_end_over_http() {
    let seen = Seen::default();
    let base = serve(healthy_api(seen.clone())).await;
    let http = Arc::new(backend(&base));
    let clock = Arc::new(FixedClock(
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
    ));
    let notifier = Arc::new(TracingNotifier);
    let connectivity = ConnectivityMonitor::new(http.clone(), notifier.clone(), clock.clone());
    let orchestrator = ChatOrchestrator::new(
        http.clone(),
        AppointmentInterpreter::new(http.clone(), clock.clone()),
        connectivity.clone(),
        notifier,
        clock,
        ContextLimits::default(),
    );
    orchestrator.select_consultation(PatientRecord::new(consultation()));

    assert!(connectivity.probe_once().await);
    orchestrator.welcome().await.unwrap();

    let outcome = orchestrator
        .submit("planifie un rdv demain à 15h pour contrôle")
        .await
        .unwrap();
    assert!(matches!(outcome, TurnOutcome::AppointmentScheduled(_)));

    let outcome = orchestrator.submit("toux depuis 3 jours").await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Answered { .. }));

    let turns = orchestrator.conversation();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[3].text, "consultation 42: toux depuis 3 jours");

    let bodies = seen.bodies.lock().unwrap();
    // welcome, appointment, chat
    assert_eq!(bodies.len(), 3);
    assert_eq!(bodies[1]["date"], "2026-03-11");
    assert_eq!(bodies[1]["reason"], "contrôle");
    let history = bodies[2]["messageHistory"].as_array().unwrap();
    assert_eq!(history[0]["role"], "system");
    assert_eq!(history.len(), 3);
}
