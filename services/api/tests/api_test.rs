use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::test;
use api::create_app;
use api::state::AppState;
use auth::JwtKeys;
use serde_json::{json, Value};
use uuid::Uuid;

/// Integration tests run against a real Postgres. They skip (not fail)
/// when neither TEST_DATABASE_URL nor DATABASE_URL is set.
async fn test_state() -> Option<AppState> {
    dotenvy::dotenv().ok();
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;
    let db = db::connect(&url, 5).await.expect("db connect");
    db::migrate(&db).await.expect("migrations");
    Some(AppState {
        db,
        jwt: JwtKeys::from_secret("test_secret_key"),
        token_ttl: 3600,
    })
}

macro_rules! state_or_skip {
    () => {
        match test_state().await {
            Some(s) => s,
            None => {
                eprintln!("skipping: TEST_DATABASE_URL not set");
                return;
            }
        }
    };
}

async fn register<S>(app: &S, role: &str) -> (String, String, String)
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let tag = Uuid::new_v4().simple().to_string();
    let email = format!("{role}-{tag}@clinic.test");
    let payload = json!({
        "username": format!("{role}-{tag}"),
        "email": email,
        "password": "supersecret",
        "firstName": "Test",
        "lastName": "User",
        "role": role,
    });
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201, "register {role}");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    let id = body["data"]["user"]["id"].as_str().unwrap().to_string();
    let token = body["data"]["token"].as_str().unwrap().to_string();
    (id, token, email)
}

async fn create_patient<S>(app: &S, token: &str) -> String
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let tag = Uuid::new_v4().simple().to_string();
    let req = test::TestRequest::post()
        .uri("/patients")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({
            "firstName": "Pat",
            "lastName": "Example",
            "email": format!("pat-{tag}@clinic.test"),
            "phone": "555-0101",
            "dateOfBirth": "1990-05-12",
            "gender": "female",
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), 201, "create patient");
    let body: Value = test::read_body_json(resp).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

#[actix_web::test]
async fn booked_slot_disappears_from_availability() {
    let state = state_or_skip!();
    let app = test::init_service(create_app(state)).await;

    let (doctor_id, _reg_token, email) = register(&app, "doctor").await;

    // fresh login, then work with that token
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": email, "password": "supersecret" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "login");
    let body: Value = test::read_body_json(resp).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let patient_id = create_patient(&app, &token).await;

    let req = test::TestRequest::post()
        .uri("/appointments")
        .insert_header(bearer(&token))
        .set_json(json!({
            "patientId": patient_id,
            "doctorId": doctor_id,
            "type": "checkup",
            "date": "2024-02-01",
            "time": "10:00",
            "duration": 30,
            "reason": "annual physical",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201, "create appointment");

    let req = test::TestRequest::get()
        .uri(&format!(
            "/appointments/doctor/{doctor_id}/availability?date=2024-02-01"
        ))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "availability");
    let body: Value = test::read_body_json(resp).await;
    let available: Vec<&str> = body["data"]["availableSlots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(!available.contains(&"10:00"));
    assert!(available.contains(&"09:00"));
    let booked = body["data"]["bookedSlots"].as_array().unwrap();
    assert!(booked
        .iter()
        .any(|b| b["time"] == "10:00" && b["duration"] == 30));
}

#[actix_web::test]
async fn exact_duplicate_slot_is_rejected() {
    let state = state_or_skip!();
    let app = test::init_service(create_app(state)).await;

    let (doctor_id, token, _) = register(&app, "doctor").await;
    let patient_id = create_patient(&app, &token).await;

    let payload = json!({
        "patientId": patient_id,
        "doctorId": doctor_id,
        "type": "consultation",
        "date": "2024-02-02",
        "time": "11:00",
        "duration": 45,
        "reason": "follow-up",
    });

    let req = test::TestRequest::post()
        .uri("/appointments")
        .insert_header(bearer(&token))
        .set_json(&payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::post()
        .uri("/appointments")
        .insert_header(bearer(&token))
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400, "duplicate slot must conflict");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn cancelled_slot_still_blocks_recreation_at_storage_layer() {
    let state = state_or_skip!();
    let app = test::init_service(create_app(state)).await;

    let (doctor_id, token, _) = register(&app, "doctor").await;
    let patient_id = create_patient(&app, &token).await;

    let payload = json!({
        "patientId": patient_id,
        "doctorId": doctor_id,
        "type": "checkup",
        "date": "2024-02-03",
        "time": "10:00",
        "duration": 30,
        "reason": "first visit",
    });

    let req = test::TestRequest::post()
        .uri("/appointments")
        .insert_header(bearer(&token))
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    let appointment_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/appointments/{appointment_id}"))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "cancelled");

    // the application-level check ignores cancelled rows, but the unique
    // (doctor, date, time) index spans every status, so this insert fails
    let req = test::TestRequest::post()
        .uri("/appointments")
        .insert_header(bearer(&token))
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400, "storage constraint wins");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn soft_deleted_patient_reads_as_missing() {
    let state = state_or_skip!();
    let app = test::init_service(create_app(state)).await;

    let (_, admin_token, _) = register(&app, "admin").await;
    let patient_id = create_patient(&app, &admin_token).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/patients/{patient_id}"))
        .insert_header(bearer(&admin_token))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let req = test::TestRequest::get()
        .uri(&format!("/patients/{patient_id}"))
        .insert_header(bearer(&admin_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    // the record is never destroyed; the admin audit view still sees it
    let req = test::TestRequest::get()
        .uri(&format!("/patients/{patient_id}?includeInactive=true"))
        .insert_header(bearer(&admin_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["isActive"], false);
}

#[actix_web::test]
async fn staff_can_read_but_not_create_patients() {
    let state = state_or_skip!();
    let app = test::init_service(create_app(state)).await;

    let (_, staff_token, _) = register(&app, "staff").await;

    let req = test::TestRequest::post()
        .uri("/patients")
        .insert_header(bearer(&staff_token))
        .set_json(json!({
            "firstName": "No",
            "lastName": "Access",
            "email": format!("na-{}@clinic.test", Uuid::new_v4().simple()),
            "phone": "555-0102",
            "dateOfBirth": "1980-01-01",
            "gender": "other",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri("/patients")
        .insert_header(bearer(&staff_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_web::test]
async fn admin_creates_user_without_token_issuance() {
    let state = state_or_skip!();
    let app = test::init_service(create_app(state)).await;

    let (_, admin_token, _) = register(&app, "admin").await;
    let (_, staff_token, _) = register(&app, "staff").await;

    let tag = Uuid::new_v4().simple().to_string();
    let email = format!("nurse-{tag}@clinic.test");
    let payload = json!({
        "username": format!("nurse-{tag}"),
        "email": email,
        "password": "supersecret",
        "firstName": "New",
        "lastName": "Nurse",
        "role": "nurse",
    });

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer(&staff_token))
        .set_json(&payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer(&admin_token))
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201, "admin creates user");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["role"], "nurse");
    assert!(body["data"]["token"].is_null(), "no token for the new account");
    assert!(body["data"]["passwordHash"].is_null());

    // the created account signs in on its own
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": email, "password": "supersecret" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    // duplicate email is a conflict, same as self-registration
    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer(&admin_token))
        .set_json(&payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_web::test]
async fn token_flow_me_refresh_and_missing_token() {
    let state = state_or_skip!();
    let app = test::init_service(create_app(state)).await;

    let (id, token, email) = register(&app, "nurse").await;

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["email"], email.as_str());
    assert!(body["data"]["passwordHash"].is_null());

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["data"]["token"].as_str().unwrap().starts_with("ey"));

    let req = test::TestRequest::get().uri("/auth/me").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
}
