use std::sync::Arc;
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

use autograph::config::AppConfig;
use autograph::middlewares::rate_limit::RATE_LIMIT_MESSAGE;
use autograph::models::visit::VisitRecord;
use autograph::routes::init_routes;
use autograph::state::AppState;
use autograph::store::{
    GlobalTotals, HourlyCount, MemoryVisitStore, PeriodCounts, StoreError, StoreResult,
    VisitStore, VisitWrite,
};

fn state_over(store: Arc<dyn VisitStore>, overrides: &[(&str, &str)]) -> web::Data<AppState> {
    let mut vars = vec![("STORE_BACKEND", "memory")];
    vars.extend_from_slice(overrides);
    let config = AppConfig::from_lookup(|key| {
        vars.iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .unwrap();

    web::Data::new(AppState::new(config, None, store))
}

fn test_state(overrides: &[(&str, &str)]) -> (web::Data<AppState>, Arc<MemoryVisitStore>) {
    let store = Arc::new(MemoryVisitStore::new());
    (state_over(store.clone(), overrides), store)
}

/// Every call either fails with a driver error or never finishes.
enum BrokenStore {
    Failing,
    Hanging,
}

impl BrokenStore {
    async fn fail<T>(&self) -> StoreResult<T> {
        match self {
            BrokenStore::Failing => Err(StoreError::Database(
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset by peer")
                    .into(),
            )),
            BrokenStore::Hanging => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(StoreError::Timeout(Duration::from_secs(30)))
            }
        }
    }
}

#[async_trait]
impl VisitStore for BrokenStore {
    async fn init(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_by_ip(&self, _ip_address: &str) -> StoreResult<Option<VisitRecord>> {
        self.fail().await
    }

    async fn record_if_due(&self, _write: VisitWrite<'_>) -> StoreResult<Option<VisitRecord>> {
        self.fail().await
    }

    async fn global_totals(&self) -> StoreResult<GlobalTotals> {
        self.fail().await
    }

    async fn period_counts(&self, _since: DateTime<Utc>) -> StoreResult<PeriodCounts> {
        self.fail().await
    }

    async fn hourly_distribution(&self, _since: DateTime<Utc>) -> StoreResult<Vec<HourlyCount>> {
        self.fail().await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.fail().await
    }
}

fn record_from(ip: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/visits/record")
        .peer_addr(format!("{}:50000", ip).parse().unwrap())
        .insert_header((header::USER_AGENT, "integration-test/1.0"))
}

fn parse_time(value: &Value) -> DateTime<Utc> {
    value.as_str().unwrap().parse().unwrap()
}

async fn send<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

#[actix_web::test]
async fn fresh_ip_is_recorded_then_throttled() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let (status, body) = send(&app, record_from("1.2.3.4").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Visit recorded successfully");
    assert_eq!(body["visitData"]["totalVisits"], 1);
    assert_eq!(body["visitData"]["isNewVisitor"], true);
    assert_eq!(body["visitData"]["isReturningVisitor"], false);
    let first_visit = parse_time(&body["visitData"]["firstVisit"]);

    let (status, body) = send(&app, record_from("1.2.3.4").to_request()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Visit recorded too soon after previous visit");
    let next_valid = parse_time(&body["nextValidVisitTime"]);
    assert_eq!(next_valid - first_visit, TimeDelta::seconds(60));
}

#[actix_web::test]
async fn statistics_on_empty_store_are_zero() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::get()
        .uri("/api/visits/statistics?range=month")
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({
            "totalUniqueVisitors": 0,
            "totalVisits": 0,
            "periodStats": {
                "uniqueVisitors": 0,
                "returningVisitors": 0,
                "activeVisitors": 0
            },
            "hourlyDistribution": []
        })
    );
}

#[actix_web::test]
async fn statistics_match_stored_records() {
    let (state, store) = test_state(&[]);
    let now = Utc::now();
    let mut returning =
        VisitRecord::first_sight("10.0.0.1".into(), None, now - TimeDelta::days(3));
    returning.register_visit(None, now - TimeDelta::hours(1), None);
    returning.register_visit(None, now - TimeDelta::minutes(5), None);
    store.insert(returning);
    store.insert(VisitRecord::first_sight(
        "10.0.0.2".into(),
        None,
        now - TimeDelta::minutes(30),
    ));
    store.insert(VisitRecord::first_sight(
        "10.0.0.3".into(),
        None,
        now - TimeDelta::days(10),
    ));

    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::get()
        .uri("/api/visits/statistics?range=week")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUniqueVisitors"], 3);
    assert_eq!(body["totalVisits"], 5);
    assert_eq!(body["periodStats"]["uniqueVisitors"], 2);
    assert_eq!(body["periodStats"]["returningVisitors"], 1);
    assert_eq!(body["periodStats"]["activeVisitors"], 2);

    let hourly = body["hourlyDistribution"].as_array().unwrap();
    let total: u64 = hourly.iter().map(|b| b["visits"].as_u64().unwrap()).sum();
    assert_eq!(total, 2);
    let hours: Vec<u64> = hourly.iter().map(|b| b["hour"].as_u64().unwrap()).collect();
    let mut sorted = hours.clone();
    sorted.sort_unstable();
    assert_eq!(hours, sorted);

    // Unknown ranges fall back to the last 24 hours
    let req = test::TestRequest::get()
        .uri("/api/visits/statistics?range=decade")
        .to_request();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["periodStats"]["uniqueVisitors"], 1);
    assert_eq!(body["periodStats"]["activeVisitors"], 2);
}

#[actix_web::test]
async fn unknown_visitor_is_not_found() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::get()
        .uri("/api/visits/203.0.113.77")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, serde_json::json!({ "message": "Visitor not found" }));
}

#[actix_web::test]
async fn visitor_details_include_history() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let (status, _) = send(&app, record_from("198.51.100.4").to_request()).await;
    assert_eq!(status, StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/visits/198.51.100.4")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ipAddress"], "198.51.100.4");
    assert_eq!(body["totalVisits"], 1);
    assert_eq!(body["isActive"], true);
    assert_eq!(body["firstVisit"], body["lastVisit"]);
    let history = body["visitHistory"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["userAgent"], "integration-test/1.0");
}

#[actix_web::test]
async fn rate_limiter_rejects_bursts_per_ip() {
    let (state, _) = test_state(&[("RATE_LIMIT_MAX", "3")]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let (status, _) = send(&app, record_from("192.0.2.1").to_request()).await;
    assert_eq!(status, StatusCode::OK);

    // Cooldown rejections still count against the window
    for _ in 0..2 {
        let (status, body) = send(&app, record_from("192.0.2.1").to_request()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["message"], "Visit recorded too soon after previous visit");
    }

    let (status, body) = send(&app, record_from("192.0.2.1").to_request()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, serde_json::json!({ "message": RATE_LIMIT_MESSAGE }));

    let (status, _) = send(&app, record_from("192.0.2.2").to_request()).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn statistics_are_not_rate_limited() {
    let (state, _) = test_state(&[("RATE_LIMIT_MAX", "1")]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    for _ in 0..5 {
        let req = test::TestRequest::get()
            .uri("/api/visits/statistics")
            .peer_addr("192.0.2.9:1234".parse().unwrap())
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[actix_web::test]
async fn forwarded_ip_is_used_behind_trusted_proxy() {
    let (state, store) = test_state(&[("TRUST_PROXY", "true")]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/visits/record")
        .peer_addr("10.0.0.1:443".parse().unwrap())
        .insert_header(("X-Forwarded-For", "203.0.113.50"))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/visits/203.0.113.50")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["visitHistory"][0]["userAgent"].is_null());
}

#[actix_web::test]
async fn health_and_index_respond() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::get().uri("/api/health/check").to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let req = test::TestRequest::get().uri("/").to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "This API is available!!");
}

#[actix_web::test]
async fn content_endpoints_need_a_database() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::get().uri("/api/getAllNews").to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Content store is not configured");
}

#[actix_web::test]
async fn newsletter_signup_requires_email() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/newsletter-signup")
        .set_json(serde_json::json!({}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is required.");
}

#[actix_web::test]
async fn store_failures_hide_detail_outside_development() {
    let state = state_over(Arc::new(BrokenStore::Failing), &[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::get()
        .uri("/api/visits/statistics")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, serde_json::json!({ "message": "Internal server error" }));

    let (status, body) = send(&app, record_from("192.0.2.30").to_request()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, serde_json::json!({ "message": "Internal server error" }));

    let req = test::TestRequest::get()
        .uri("/api/visits/192.0.2.30")
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn store_failures_show_detail_in_development() {
    let state = state_over(Arc::new(BrokenStore::Failing), &[("APP_ENV", "development")]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::get()
        .uri("/api/visits/statistics?range=week")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("connection reset by peer")
    );

    let (status, body) = send(&app, record_from("192.0.2.31").to_request()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn slow_store_hits_the_request_deadline() {
    let state = state_over(
        Arc::new(BrokenStore::Hanging),
        &[("STORE_TIMEOUT_SECS", "1"), ("APP_ENV", "development")],
    );
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let started = std::time::Instant::now();
    let (status, body) = send(&app, record_from("192.0.2.32").to_request()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("deadline"));
    assert!(started.elapsed() < Duration::from_secs(10));

    let req = test::TestRequest::get()
        .uri("/api/visits/statistics")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
}

#[actix_web::test]
async fn empty_news_update_is_rejected() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::put()
        .uri("/api/updateNews/65f1c2a9b3e4d5f6a7b8c9d0")
        .set_json(serde_json::json!({}))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No fields to update");
}

#[actix_web::test]
async fn padded_newsletter_email_passes_validation() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/newsletter-signup")
        .set_json(serde_json::json!({ "email": "  Reader@Example.com " }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Content store is not configured");

    let req = test::TestRequest::post()
        .uri("/api/newsletter-signup")
        .set_json(serde_json::json!({ "email": "not-an-email" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid email address");
}

#[actix_web::test]
async fn section_and_profile_routes_are_served() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    for uri in [
        "/api/getAllFashion",
        "/api/getAllFamily",
        "/api/getAllLatest",
        "/api/getAllDigitalEditions",
        "/api/getAllVideos",
        "/api/getVideosBySlug/launch-reel",
        "/api/getUsers",
        "/api/getAllProfiles",
        "/api/getNewsletterSubscribers",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert_eq!(body["message"], "Content store is not configured");
    }
}

#[actix_web::test]
async fn section_posts_are_checked_before_storage() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    let cases = [
        ("/api/createFashion", serde_json::json!({ "title": "Coats" }), "Image1 is required"),
        (
            "/api/createFamily",
            serde_json::json!({ "title": "Picnics", "image1": "/uploads/p.png" }),
            "Author is required",
        ),
        (
            "/api/createLatest",
            serde_json::json!({ "title": "Today", "image1": "/uploads/t.png", "authorId": "42" }),
            "Invalid author ID",
        ),
        (
            "/api/createDigitalEdition",
            serde_json::json!({ "title": "June issue" }),
            "Cover image is required",
        ),
        ("/api/UploadVideo", serde_json::json!({ "title": "Reel" }), "Image cover is required"),
    ];
    for (uri, payload, message) in cases {
        let req = test::TestRequest::post()
            .uri(uri)
            .set_json(payload)
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["message"], message);
    }

    // Videos carry no author, so a complete one only fails on storage
    let req = test::TestRequest::post()
        .uri("/api/UploadVideo")
        .set_json(serde_json::json!({ "title": "Reel", "image": "/uploads/cover.png" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn empty_post_and_profile_updates_are_rejected() {
    let (state, _) = test_state(&[]);
    let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;

    for uri in [
        "/api/updateFashion/65f1c2a9b3e4d5f6a7b8c9d0",
        "/api/updateDigitalEdition/65f1c2a9b3e4d5f6a7b8c9d0",
        "/api/updateProfile/65f1c2a9b3e4d5f6a7b8c9d0",
    ] {
        let req = test::TestRequest::put()
            .uri(uri)
            .set_json(serde_json::json!({}))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["message"], "No fields to update");
    }

    let req = test::TestRequest::delete()
        .uri("/api/deleteUser/not-an-id")
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid User ID");
}
