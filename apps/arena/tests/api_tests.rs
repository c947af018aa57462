//! Integration tests for the Arena HTTP API.
//!
//! Every test runs against an in-memory store frozen at Monday 2025-03-10 09:00.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use arena::api::auth::hash_password;
use arena::api::{AppState, create_router};
use arena::config::ServerConfig;
use arena_core::{FixedClock, NewUser, Role, Store};
use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::num::NonZeroU32;
use std::sync::Arc;

const ADMIN_EMAIL: &str = "admin@campus.edu";
const PASSWORD: &str = "secret123";
const MONDAY: &str = "2025-03-10";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Server with one bootstrapped admin account.
fn create_server() -> TestServer {
    create_server_with(ServerConfig::for_tests())
}

fn create_server_with(config: ServerConfig) -> TestServer {
    let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let store = Store::in_memory()
        .unwrap()
        .with_clock(Arc::new(FixedClock::at(monday, 9, 0)));
    store
        .create_user(
            NewUser {
                email: ADMIN_EMAIL.into(),
                first_name: "Ada".into(),
                last_name: "Admin".into(),
                password: PASSWORD.into(),
                phone: None,
                role: Some(Role::Admin),
            },
            hash_password(PASSWORD).unwrap(),
        )
        .unwrap();
    let app = create_router(AppState::new(store, &config), &config.cors_origins);
    TestServer::new(app).unwrap()
}

/// Sign up a student or staff member and return their user id.
async fn register(server: &TestServer, email: &str, role: &str) -> String {
    let res = server
        .post("/api/v1/users")
        .json(&json!({
            "email": email,
            "first_name": "Sam",
            "last_name": "Student",
            "password": PASSWORD,
            "role": role,
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()["data"]["user_id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn login(server: &TestServer, email: &str) -> String {
    let res = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": email, "password": PASSWORD }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    res.json::<Value>()["data"]["token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Register and log in; returns (user id, token).
async fn student(server: &TestServer, email: &str) -> (String, String) {
    let id = register(server, email, "student").await;
    let token = login(server, email).await;
    (id, token)
}

async fn create_facility(server: &TestServer, admin: &str, name: &str) -> String {
    let res = server
        .post("/api/v1/facility")
        .authorization_bearer(admin)
        .json(&json!({
            "name": name,
            "type": "court",
            "description": "Indoor tennis court",
            "capacity": 4,
            "open_time": "08:00",
            "close_time": "20:00",
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()["data"]["id"].as_str().unwrap().to_string()
}

async fn book(server: &TestServer, token: &str, facility: &str, start: &str, end: &str) -> axum_test::TestResponse {
    server
        .post("/api/v1/bookings")
        .authorization_bearer(token)
        .json(&json!({
            "facility_id": facility,
            "date": MONDAY,
            "start_time": start,
            "end_time": end,
        }))
        .await
}

// =============================================================================
// ACCOUNT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let server = create_server();
    let res = server.get("/health").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["success"], json!(true));
}

#[tokio::test]
async fn test_register_login_and_me() {
    let server = create_server();
    let (id, token) = student(&server, "sam@campus.edu").await;

    let res = server.get("/api/v1/users/me").authorization_bearer(&token).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let body = res.json::<Value>();
    assert_eq!(body["data"]["id"], json!(id));
    assert_eq!(body["data"]["role"], json!("student"));
    assert_eq!(body["data"]["credit_score"], json!(100));
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_admin_role() {
    let server = create_server();
    register(&server, "sam@campus.edu", "student").await;

    let dup = server
        .post("/api/v1/users")
        .json(&json!({
            "email": "SAM@campus.edu",
            "first_name": "Sam",
            "last_name": "Again",
            "password": PASSWORD,
        }))
        .await;
    assert_eq!(dup.status_code(), StatusCode::CONFLICT);
    assert_eq!(dup.json::<Value>()["success"], json!(false));

    let admin = server
        .post("/api/v1/users")
        .json(&json!({
            "email": "mallory@campus.edu",
            "first_name": "Mal",
            "last_name": "Lory",
            "password": PASSWORD,
            "role": "admin",
        }))
        .await;
    assert_eq!(admin.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let server = create_server();
    register(&server, "sam@campus.edu", "student").await;

    let wrong = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "sam@campus.edu", "password": "nope-nope" }))
        .await;
    let unknown = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "ghost@campus.edu", "password": PASSWORD }))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        wrong.json::<Value>()["message"],
        unknown.json::<Value>()["message"]
    );
}

#[tokio::test]
async fn test_missing_or_forged_token_is_rejected() {
    let server = create_server();
    let res = server.get("/api/v1/users/me").await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);

    let res = server
        .get("/api/v1/users/me")
        .authorization_bearer("eyJzdWIiOiJ4In0.deadbeef")
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deactivated_user_loses_access() {
    let server = create_server();
    let admin = login(&server, ADMIN_EMAIL).await;
    let (id, token) = student(&server, "sam@campus.edu").await;

    let res = server
        .delete(&format!("/api/v1/users/{id}"))
        .authorization_bearer(&admin)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["data"]["is_active"], json!(false));

    let res = server.get("/api/v1/users/me").authorization_bearer(&token).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_is_rate_limited_per_email() {
    let mut config = ServerConfig::for_tests();
    config.login_per_minute = NonZeroU32::MIN;
    let server = create_server_with(config);
    register(&server, "sam@campus.edu", "student").await;

    login(&server, "sam@campus.edu").await;
    let res = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": " SAM@campus.edu", "password": PASSWORD }))
        .await;
    assert_eq!(res.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let body = res.json::<Value>();
    assert_eq!(body["success"], json!(false));
    assert!(body["message"].as_str().unwrap().contains("too many"));

    // Another account is not held back by Sam's attempts.
    login(&server, ADMIN_EMAIL).await;
}

#[tokio::test]
async fn test_admin_cannot_lock_themself_out_by_patch() {
    let server = create_server();
    let admin = login(&server, ADMIN_EMAIL).await;
    let me = server.get("/api/v1/users/me").authorization_bearer(&admin).await;
    let id = me.json::<Value>()["data"]["id"].as_str().unwrap().to_string();

    for patch in [json!({ "is_active": false }), json!({ "role": "staff" })] {
        let res = server
            .patch(&format!("/api/v1/users/{id}"))
            .authorization_bearer(&admin)
            .json(&patch)
            .await;
        assert_eq!(res.status_code(), StatusCode::CONFLICT);
        assert_eq!(res.json::<Value>()["success"], json!(false));
    }

    let res = server.get("/api/v1/users/me").authorization_bearer(&admin).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["data"]["role"], json!("admin"));

    // The same patch on someone else goes through.
    let (other, _) = student(&server, "sam@campus.edu").await;
    let res = server
        .patch(&format!("/api/v1/users/{other}"))
        .authorization_bearer(&admin)
        .json(&json!({ "is_active": false }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["data"]["is_active"], json!(false));
}

#[tokio::test]
async fn test_students_cannot_touch_admin_fields_or_others() {
    let server = create_server();
    let (id, token) = student(&server, "sam@campus.edu").await;
    let (other, _) = student(&server, "kim@campus.edu").await;

    let res = server
        .patch(&format!("/api/v1/users/{id}"))
        .authorization_bearer(&token)
        .json(&json!({ "credit_score": 1000 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let res = server
        .get(&format!("/api/v1/users/{other}"))
        .authorization_bearer(&token)
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let res = server
        .patch(&format!("/api/v1/users/{id}"))
        .authorization_bearer(&token)
        .json(&json!({ "phone": "555-0100" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["data"]["phone"], json!("555-0100"));

    let res = server.get("/api/v1/users/all").authorization_bearer(&token).await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
}

// =============================================================================
// FACILITY & BOOKING TESTS
// =============================================================================

#[tokio::test]
async fn test_only_admin_creates_facilities() {
    let server = create_server();
    let (_, token) = student(&server, "sam@campus.edu").await;
    let res = server
        .post("/api/v1/facility")
        .authorization_bearer(&token)
        .json(&json!({
            "name": "Court",
            "type": "court",
            "description": "Outdoor court",
            "capacity": 4,
            "open_time": "08:00",
            "close_time": "20:00",
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_booking_rules_and_slot_grid() {
    let server = create_server();
    let admin = login(&server, ADMIN_EMAIL).await;
    let facility = create_facility(&server, &admin, "Court A").await;
    let (_, sam) = student(&server, "sam@campus.edu").await;
    let (_, kim) = student(&server, "kim@campus.edu").await;

    let res = book(&server, &sam, &facility, "10:00", "12:00").await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    // One booking per facility per day.
    let res = book(&server, &sam, &facility, "14:00", "15:00").await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);

    // Someone else cannot take the same hours.
    let res = book(&server, &kim, &facility, "11:00", "12:00").await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);

    // Three hours is malformed; past hours break a booking rule.
    let res = book(&server, &kim, &facility, "13:00", "16:00").await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    let res = book(&server, &kim, &facility, "08:00", "09:00").await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);

    let res = server
        .get(&format!("/api/v1/facility/{facility}/slots"))
        .authorization_bearer(&sam)
        .add_query_param("date", MONDAY)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let grid = res.json::<Value>();
    let slots = grid["data"][0]["slots"].as_array().unwrap();
    let status_at = |hour: u64| {
        slots
            .iter()
            .find(|s| s["hour"] == json!(hour))
            .map(|s| s["status"].clone())
            .unwrap()
    };
    assert_eq!(status_at(8), json!("past"));
    assert_eq!(status_at(10), json!("my-booking"));
    assert_eq!(status_at(11), json!("my-booking"));
    assert_eq!(status_at(12), json!("available"));

    let res = server
        .get(&format!("/api/v1/facility/{facility}/slots"))
        .authorization_bearer(&kim)
        .add_query_param("date", MONDAY)
        .await;
    let grid = res.json::<Value>();
    let ten = grid["data"][0]["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["hour"] == json!(10))
        .unwrap()
        .clone();
    assert_eq!(ten["status"], json!("booked"));
}

#[tokio::test]
async fn test_cancel_booking_owner_only_and_once() {
    let server = create_server();
    let admin = login(&server, ADMIN_EMAIL).await;
    let facility = create_facility(&server, &admin, "Court A").await;
    let (sam_id, sam) = student(&server, "sam@campus.edu").await;
    let (_, kim) = student(&server, "kim@campus.edu").await;

    let res = book(&server, &sam, &facility, "10:00", "11:00").await;
    let booking = res.json::<Value>()["data"]["id"].as_str().unwrap().to_string();

    let res = server
        .post(&format!("/api/v1/bookings/cancel/{booking}"))
        .authorization_bearer(&kim)
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let res = server
        .post(&format!("/api/v1/bookings/cancel/{booking}"))
        .authorization_bearer(&admin)
        .json(&json!({ "admin_note": "court maintenance" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let body = res.json::<Value>();
    assert_eq!(body["data"]["is_canceled"], json!(true));
    assert_eq!(body["data"]["admin_note"], json!("court maintenance"));

    let res = server
        .post(&format!("/api/v1/bookings/cancel/{booking}"))
        .authorization_bearer(&sam)
        .await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);

    let res = server
        .get(&format!("/api/v1/users/{sam_id}/bookings"))
        .authorization_bearer(&sam)
        .await;
    assert_eq!(res.json::<Value>()["data"]["total"], json!(1));
}

#[tokio::test]
async fn test_admin_lists_bookings_in_interval() {
    let server = create_server();
    let admin = login(&server, ADMIN_EMAIL).await;
    let facility = create_facility(&server, &admin, "Court A").await;
    let (_, sam) = student(&server, "sam@campus.edu").await;
    book(&server, &sam, &facility, "10:00", "11:00").await;

    let res = server
        .get("/api/v1/bookings")
        .authorization_bearer(&admin)
        .add_query_param("start_date", MONDAY)
        .add_query_param("end_date", "2025-03-16")
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["data"]["items"].as_array().unwrap().len(), 1);

    let res = server
        .get("/api/v1/bookings")
        .authorization_bearer(&admin)
        .add_query_param("start_date", "2025-03-16")
        .add_query_param("end_date", MONDAY)
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// REVIEW TESTS
// =============================================================================

#[tokio::test]
async fn test_rating_averages_reviews() {
    let server = create_server();
    let admin = login(&server, ADMIN_EMAIL).await;
    let facility = create_facility(&server, &admin, "Court A").await;
    let (_, sam) = student(&server, "sam@campus.edu").await;

    let res = server
        .get(&format!("/api/v1/facility/{facility}/rating"))
        .authorization_bearer(&sam)
        .await;
    assert_eq!(res.json::<Value>()["data"]["average_rating"], Value::Null);

    for rating in [4, 5] {
        let res = server
            .post(&format!("/api/v1/facility/{facility}/review"))
            .authorization_bearer(&sam)
            .json(&json!({ "rating": rating, "comment": "great court" }))
            .await;
        assert_eq!(res.status_code(), StatusCode::CREATED);
    }
    let res = server
        .get(&format!("/api/v1/facility/{facility}/rating"))
        .authorization_bearer(&sam)
        .await;
    let body = res.json::<Value>();
    assert_eq!(body["data"]["average_rating"], json!(4.5));
    assert_eq!(body["data"]["review_count"], json!(2));
}

// =============================================================================
// TRAINING TESTS
// =============================================================================

#[tokio::test]
async fn test_trainer_schedule_registration_and_penalty() {
    let server = create_server();
    let admin = login(&server, ADMIN_EMAIL).await;
    let facility = create_facility(&server, &admin, "Gym").await;
    let trainer_id = register(&server, "coach@campus.edu", "staff").await;
    let (sam_id, sam) = student(&server, "sam@campus.edu").await;

    let res = server
        .post("/api/v1/trainers")
        .authorization_bearer(&admin)
        .json(&json!({ "user_id": trainer_id }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let coach = login(&server, "coach@campus.edu").await;

    // Monday schedule: today and next Monday.
    let res = server
        .post("/api/v1/schedules")
        .authorization_bearer(&coach)
        .json(&json!({
            "facility_id": facility,
            "weekday": 1,
            "start_time": "18:00",
            "end_time": "19:00",
            "capacity": 1,
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let sessions = res.json::<Value>()["data"]["sessions"].clone();
    assert_eq!(sessions.as_array().unwrap().len(), 2);
    let session = sessions[0]["id"].as_str().unwrap().to_string();

    // The session blocks bookings over its hours.
    let res = book(&server, &sam, &facility, "18:00", "19:00").await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);

    let res = server
        .post("/api/v1/registrations")
        .authorization_bearer(&sam)
        .json(&json!({ "session_id": session }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    let (_, kim) = student(&server, "kim@campus.edu").await;
    let res = server
        .post("/api/v1/registrations")
        .authorization_bearer(&kim)
        .json(&json!({ "session_id": session }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);

    let res = server
        .get(&format!("/api/v1/registrations/session/{session}"))
        .authorization_bearer(&coach)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let regs = res.json::<Value>();
    assert_eq!(regs["data"][0]["user"]["id"], json!(sam_id));

    let res = server
        .get(&format!("/api/v1/sessions/facility/{facility}"))
        .authorization_bearer(&sam)
        .add_query_param("date", MONDAY)
        .await;
    assert_eq!(res.json::<Value>()["data"][0]["registered_count"], json!(1));

    // Penalty deducts, revoking restores.
    let res = server
        .post("/api/v1/penalties")
        .authorization_bearer(&coach)
        .json(&json!({
            "user_id": sam_id,
            "session_id": session,
            "reason": "arrived late",
            "points": 10,
            "penalty_type": "late",
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let penalty = res.json::<Value>()["data"]["id"].as_str().unwrap().to_string();

    let me = server.get("/api/v1/users/me").authorization_bearer(&sam).await;
    assert_eq!(me.json::<Value>()["data"]["credit_score"], json!(90));

    let res = server
        .delete(&format!("/api/v1/penalties/{penalty}"))
        .authorization_bearer(&coach)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let me = server.get("/api/v1/users/me").authorization_bearer(&sam).await;
    assert_eq!(me.json::<Value>()["data"]["credit_score"], json!(100));
}

#[tokio::test]
async fn test_students_cannot_create_schedules_or_penalties() {
    let server = create_server();
    let admin = login(&server, ADMIN_EMAIL).await;
    let facility = create_facility(&server, &admin, "Gym").await;
    let (sam_id, sam) = student(&server, "sam@campus.edu").await;

    let res = server
        .post("/api/v1/schedules")
        .authorization_bearer(&sam)
        .json(&json!({
            "facility_id": facility,
            "weekday": 1,
            "start_time": "18:00",
            "end_time": "19:00",
            "capacity": 5,
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let res = server
        .post("/api/v1/penalties")
        .authorization_bearer(&sam)
        .json(&json!({
            "user_id": sam_id,
            "reason": "self-report",
            "points": 1,
            "penalty_type": "other",
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
}
