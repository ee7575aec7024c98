use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use patient_cell::models::Patient;
use patient_cell::services::InMemoryPatientRepository;
use patient_cell::{staff_patient_routes, PatientState};
use shared_utils::test_utils::{TestConfig, TestPrincipal};

fn patient(first: &str, last: &str) -> Patient {
    Patient {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        phone: None,
        notes: None,
    }
}

async fn setup(patients: Vec<Patient>) -> (Router, TestConfig) {
    let test_config = TestConfig::default();
    let repo = Arc::new(InMemoryPatientRepository::new());
    for p in patients {
        repo.insert(p).await;
    }

    let router = staff_patient_routes(PatientState {
        config: test_config.to_arc(),
        patients: repo,
    });
    (router, test_config)
}

fn form_request(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_search_by_last_name_orders_by_name() {
    let (router, config) = setup(vec![
        patient("John", "Smith"),
        patient("Anna", "Smith"),
        patient("Mary", "Jones"),
    ])
    .await;
    let cookie = TestPrincipal::cookie(&TestPrincipal::staff(Uuid::new_v4()), &config.session_secret);

    let response = router
        .oneshot(form_request("/patient-search", Some(&cookie), "last_name=Smith&first_name="))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["results"][0]["first_name"], "Anna");
    assert_eq!(body["results"][1]["first_name"], "John");
    assert_eq!(body["input"]["last_name"], "Smith");
}

#[tokio::test]
async fn test_patient_session_is_redirected_to_login() {
    let (router, config) = setup(vec![patient("John", "Smith")]).await;
    let cookie = TestPrincipal::cookie(&TestPrincipal::patient(Uuid::new_v4()), &config.session_secret);

    let response = router
        .oneshot(form_request("/patient-search", Some(&cookie), "last_name=Smith"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/auth/login");
}

#[tokio::test]
async fn test_anonymous_request_is_redirected_to_login() {
    let (router, _) = setup(vec![]).await;

    let response = router
        .oneshot(Request::builder().uri("/patient-search").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/auth/login");
}

#[tokio::test]
async fn test_update_notes() {
    let target = patient("John", "Smith");
    let (router, config) = setup(vec![target.clone()]).await;
    let cookie = TestPrincipal::cookie(&TestPrincipal::staff(Uuid::new_v4()), &config.session_secret);

    let response = router
        .oneshot(form_request(
            &format!("/patients/{}/notes", target.id),
            Some(&cookie),
            "notes=Follow+up+in+two+weeks",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["patient"]["notes"], "Follow up in two weeks");
}

#[tokio::test]
async fn test_overlong_notes_echo_input() {
    let target = patient("John", "Smith");
    let (router, config) = setup(vec![target.clone()]).await;
    let cookie = TestPrincipal::cookie(&TestPrincipal::staff(Uuid::new_v4()), &config.session_secret);
    let notes = "a".repeat(2001);

    let response = router
        .oneshot(form_request(
            &format!("/patients/{}/notes", target.id),
            Some(&cookie),
            &format!("notes={}", notes),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Notes must be 2000 characters or fewer.");
    assert_eq!(body["input"]["notes"], notes);
}

#[tokio::test]
async fn test_notes_for_unknown_patient_is_not_found() {
    let (router, config) = setup(vec![]).await;
    let cookie = TestPrincipal::cookie(&TestPrincipal::staff(Uuid::new_v4()), &config.session_secret);

    let response = router
        .oneshot(form_request(
            &format!("/patients/{}/notes", Uuid::new_v4()),
            Some(&cookie),
            "notes=hello",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
