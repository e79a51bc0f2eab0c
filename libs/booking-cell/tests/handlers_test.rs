use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Query, State};
use axum::Json;
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::handlers::*;
use booking_cell::models::{CreateBookingRequest, DateQuery, UpdateBookingStatusRequest};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

fn config_for(mock_server: &MockServer) -> AppConfig {
    TestConfig::with_supabase_url(&mock_server.uri()).to_app_config()
}

fn auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

fn token_for(user: &TestUser, config: &AppConfig) -> String {
    JwtTestUtils::create_test_token(user, &config.supabase_jwt_secret, Some(24))
}

async fn mount_user(mock_server: &MockServer, user: &TestUser) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("auth_id", format!("eq.{}", user.auth_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([MockRows::user_row(user)])))
        .mount(mock_server)
        .await;
}

fn create_request(date: &str, slot: &str) -> CreateBookingRequest {
    CreateBookingRequest {
        date: date.to_string(),
        time_slot: slot.to_string(),
        reason: None,
        notes: None,
    }
}

// Scenario: creating a booking always yields PENDING owned by the caller.
#[tokio::test]
async fn create_booking_starts_pending_and_owned_by_caller() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);

    mount_user(&mock_server, &patient).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("select", "time_slot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let booking_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([MockRows::booking_row(
            booking_id,
            patient.user_id,
            "2024-06-01",
            "SLOT_09_10",
            "PENDING"
        )])))
        .mount(&mock_server)
        .await;

    let result = create_booking(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(create_request("2024-06-01", "SLOT_09_10")),
    )
    .await;

    let response = result.unwrap().0;
    assert_eq!(response["booking"]["status"], "PENDING");
    assert_eq!(response["booking"]["user_id"], json!(patient.user_id));
    assert_eq!(response["booking"]["time_slot"], "SLOT_09_10");
}

#[tokio::test]
async fn create_booking_rejects_taken_slot() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);

    mount_user(&mock_server, &patient).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("select", "time_slot"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "time_slot": "SLOT_09_10" }])),
        )
        .mount(&mock_server)
        .await;

    let err = create_booking(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(create_request("2024-06-01", "SLOT_09_10")),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::Conflict(_));
}

#[tokio::test]
async fn create_booking_rejects_malformed_date_and_unknown_slot() {
    let mock_server = MockServer::start().await;
    let config = Arc::new(config_for(&mock_server));
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);

    mount_user(&mock_server, &patient).await;

    let err = create_booking(
        State(Arc::clone(&config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(create_request("01/06/2024", "SLOT_09_10")),
    )
    .await
    .unwrap_err();
    assert_matches!(err, AppError::BadRequest(_));

    let err = create_booking(
        State(config),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(create_request("2024-06-01", "SLOT_15_16")),
    )
    .await
    .unwrap_err();
    assert_matches!(err, AppError::BadRequest(_));
}

#[tokio::test]
async fn create_booking_fails_for_unprovisioned_user() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let err = create_booking(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(create_request("2024-06-01", "SLOT_09_10")),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::NotFound(_));
}

#[tokio::test]
async fn booked_slots_requires_a_date() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);

    mount_user(&mock_server, &patient).await;

    let err = get_booked_slots(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Query(DateQuery { date: None }),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::BadRequest(_));
}

#[tokio::test]
async fn booked_slots_returns_occupied_slots_for_the_day() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);

    mount_user(&mock_server, &patient).await;

    // A cancelled booking still occupies its slot.
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("select", "time_slot"))
        .and(query_param("scheduled_date", "gte.2024-06-01T00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!([{ "time_slot": "SLOT_10_11" }, { "time_slot": "SLOT_09_10" }]),
        ))
        .mount(&mock_server)
        .await;

    let response = get_booked_slots(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Query(DateQuery {
            date: Some("2024-06-01".to_string()),
        }),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(response["bookedSlots"], json!(["SLOT_10_11", "SLOT_09_10"]));
}

// Scenario: PATCH /me with a non-CANCELLED status is refused outright.
#[tokio::test]
async fn owner_update_accepts_only_cancellation() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);

    mount_user(&mock_server, &patient).await;

    let err = update_my_booking(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(UpdateBookingStatusRequest {
            booking_id: Uuid::new_v4(),
            status: "CONFIRMED".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::BadRequest(_));
}

// Scenario: owner cancels their own PENDING booking, then cannot repeat it.
#[tokio::test]
async fn owner_cancels_own_pending_booking() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);
    let booking_id = Uuid::new_v4();

    mount_user(&mock_server, &patient).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([MockRows::booking_row(
            booking_id,
            patient.user_id,
            "2024-06-01",
            "SLOT_09_10",
            "PENDING"
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([MockRows::booking_row(
            booking_id,
            patient.user_id,
            "2024-06-01",
            "SLOT_09_10",
            "CANCELLED"
        )])))
        .mount(&mock_server)
        .await;

    let response = update_my_booking(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(UpdateBookingStatusRequest {
            booking_id,
            status: "CANCELLED".to_string(),
        }),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(response["booking"]["status"], "CANCELLED");
}

#[tokio::test]
async fn cancelling_a_non_pending_booking_is_refused() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);
    let booking_id = Uuid::new_v4();

    mount_user(&mock_server, &patient).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([MockRows::booking_row(
            booking_id,
            patient.user_id,
            "2024-06-01",
            "SLOT_09_10",
            "CANCELLED"
        )])))
        .mount(&mock_server)
        .await;

    let err = update_my_booking(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(UpdateBookingStatusRequest {
            booking_id,
            status: "CANCELLED".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::BadRequest(_));
}

// Scenario: cancelling another patient's booking is forbidden.
#[tokio::test]
async fn owner_cannot_cancel_someone_elses_booking() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let other = TestUser::patient("other@example.com");
    let token = token_for(&patient, &config);
    let booking_id = Uuid::new_v4();

    mount_user(&mock_server, &patient).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([MockRows::booking_row(
            booking_id,
            other.user_id,
            "2024-06-01",
            "SLOT_09_10",
            "PENDING"
        )])))
        .mount(&mock_server)
        .await;

    let err = update_my_booking(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(UpdateBookingStatusRequest {
            booking_id,
            status: "CANCELLED".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::Forbidden(_));
}

#[tokio::test]
async fn owner_cancel_of_unknown_booking_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);

    mount_user(&mock_server, &patient).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let err = update_my_booking(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(UpdateBookingStatusRequest {
            booking_id: Uuid::new_v4(),
            status: "CANCELLED".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_matches!(err, AppError::NotFound(_));
}

#[tokio::test]
async fn list_my_bookings_is_scoped_to_the_owner() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);

    mount_user(&mock_server, &patient).await;

    // The owner filter is part of the query; anything else would 404 here.
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("user_id", format!("eq.{}", patient.user_id)))
        .and(query_param("order", "scheduled_date.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([MockRows::booking_row(
            Uuid::new_v4(),
            patient.user_id,
            "2024-06-02",
            "SLOT_11_12",
            "PENDING"
        )])))
        .mount(&mock_server)
        .await;

    let response = list_my_bookings(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(patient.to_principal()),
    )
    .await
    .unwrap()
    .0;

    let bookings = response["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["user_id"], json!(patient.user_id));
}

// Scenario: staff listing filtered by day, ordered (date, slot) ascending.
#[tokio::test]
async fn staff_list_filters_by_day_and_embeds_owner() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let doctor = TestUser::doctor("doctor@example.com");
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&doctor, &config);

    mount_user(&mock_server, &doctor).await;

    let mut first = MockRows::booking_row(
        Uuid::new_v4(),
        patient.user_id,
        "2024-06-01",
        "SLOT_09_10",
        "PENDING",
    );
    first["user"] = MockRows::user_row(&patient);
    let mut second = MockRows::booking_row(
        Uuid::new_v4(),
        patient.user_id,
        "2024-06-01",
        "SLOT_12_13",
        "CONFIRMED",
    );
    second["user"] = MockRows::user_row(&patient);

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("select", "*,user:users(*)"))
        .and(query_param("order", "scheduled_date.asc,time_slot.asc"))
        .and(query_param("scheduled_date", "gte.2024-06-01T00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([first, second])))
        .mount(&mock_server)
        .await;

    let response = list_bookings_for_staff(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(doctor.to_principal()),
        Query(DateQuery {
            date: Some("2024-06-01".to_string()),
        }),
    )
    .await
    .unwrap()
    .0;

    let bookings = response.as_array().unwrap();
    assert_eq!(bookings.len(), 2);
    assert_eq!(bookings[0]["time_slot"], "SLOT_09_10");
    assert_eq!(bookings[1]["time_slot"], "SLOT_12_13");
    assert_eq!(bookings[0]["user"]["id"], json!(patient.user_id));
}

#[tokio::test]
async fn patient_is_denied_on_staff_paths() {
    let mock_server = MockServer::start().await;
    let config = Arc::new(config_for(&mock_server));
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&patient, &config);

    mount_user(&mock_server, &patient).await;

    let err = list_bookings_for_staff(
        State(Arc::clone(&config)),
        auth_header(&token),
        Extension(patient.to_principal()),
        Query(DateQuery { date: None }),
    )
    .await
    .unwrap_err();
    assert_matches!(err, AppError::Forbidden(_));

    let err = update_booking_status(
        State(config),
        auth_header(&token),
        Extension(patient.to_principal()),
        Json(UpdateBookingStatusRequest {
            booking_id: Uuid::new_v4(),
            status: "CONFIRMED".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_matches!(err, AppError::Forbidden(_));
}

#[tokio::test]
async fn staff_update_moves_booking_between_statuses() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let doctor = TestUser::doctor("doctor@example.com");
    let patient = TestUser::patient("patient@example.com");
    let token = token_for(&doctor, &config);
    let booking_id = Uuid::new_v4();

    mount_user(&mock_server, &doctor).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([MockRows::booking_row(
            booking_id,
            patient.user_id,
            "2024-06-01",
            "SLOT_09_10",
            "PENDING"
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("id", format!("eq.{}", booking_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([MockRows::booking_row(
            booking_id,
            patient.user_id,
            "2024-06-01",
            "SLOT_09_10",
            "COMPLETED"
        )])))
        .mount(&mock_server)
        .await;

    let response = update_booking_status(
        State(Arc::new(config)),
        auth_header(&token),
        Extension(doctor.to_principal()),
        Json(UpdateBookingStatusRequest {
            booking_id,
            status: "COMPLETED".to_string(),
        }),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(response["status"], "COMPLETED");
}

#[tokio::test]
async fn staff_update_rejects_unknown_status_and_unknown_booking() {
    let mock_server = MockServer::start().await;
    let config = Arc::new(config_for(&mock_server));
    let admin = TestUser::admin("admin@example.com");
    let token = token_for(&admin, &config);

    mount_user(&mock_server, &admin).await;

    let err = update_booking_status(
        State(Arc::clone(&config)),
        auth_header(&token),
        Extension(admin.to_principal()),
        Json(UpdateBookingStatusRequest {
            booking_id: Uuid::new_v4(),
            status: "NO_SHOW".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_matches!(err, AppError::BadRequest(_));

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let err = update_booking_status(
        State(config),
        auth_header(&token),
        Extension(admin.to_principal()),
        Json(UpdateBookingStatusRequest {
            booking_id: Uuid::new_v4(),
            status: "CANCELLED".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_matches!(err, AppError::NotFound(_));
}
