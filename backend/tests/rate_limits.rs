//! Per-IP rate limiting across the mounted API.

mod support;

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::http::header::RETRY_AFTER;
use actix_web::test::{self, TestRequest};
use recruit_backend::test_support::MemoryStack;
use serde_json::{Value, json};
use support::{peer, recruit_app};

fn wrong_recovery() -> Value {
    json!({ "email": support::ADMIN_EMAIL, "recoveryCode": "not-the-code" })
}

#[actix_web::test]
async fn sixth_login_attempt_is_blocked_for_an_hour() {
    let stack = MemoryStack::new(support::fixed_now());
    let app = recruit_app!(stack);

    let mut statuses = Vec::new();
    let mut retry_after = None;
    for _ in 0..6 {
        let req = TestRequest::post()
            .uri("/api/v1/login")
            .peer_addr(peer(20))
            .set_json(wrong_recovery())
            .to_request();
        let res = test::call_service(&app, req).await;
        statuses.push(res.status());
        retry_after = res
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
    }

    assert_eq!(statuses[..5], [StatusCode::UNAUTHORIZED; 5]);
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(retry_after.as_deref(), Some("3600"));
    assert_eq!(
        stack.sleeper.recorded(),
        [1, 2, 4, 8].map(Duration::from_secs).to_vec()
    );
}

#[actix_web::test]
async fn login_blocks_do_not_leak_to_other_addresses() {
    let stack = MemoryStack::new(support::fixed_now());
    let app = recruit_app!(stack);

    for _ in 0..6 {
        let req = TestRequest::post()
            .uri("/api/v1/login")
            .peer_addr(peer(21))
            .set_json(wrong_recovery())
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = TestRequest::post()
        .uri("/api/v1/login")
        .peer_addr(peer(22))
        .set_json(wrong_recovery())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn ten_rejections_block_the_address_for_a_day_across_classes() {
    let stack = MemoryStack::new(support::fixed_now());
    let app = recruit_app!(stack);

    // Five admitted attempts, then ten rejected ones.
    for _ in 0..15 {
        let req = TestRequest::post()
            .uri("/api/v1/login")
            .peer_addr(peer(23))
            .set_json(wrong_recovery())
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = TestRequest::get()
        .uri("/api/v1/leaderboard")
        .peer_addr(peer(23))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let seconds: u64 = res
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .expect("retry-after seconds");
    assert!((86_399..=86_400).contains(&seconds), "retry after {seconds}");
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "too_many_requests");

    let elsewhere = TestRequest::get()
        .uri("/api/v1/leaderboard")
        .peer_addr(peer(24))
        .to_request();
    let res = test::call_service(&app, elsewhere).await;
    assert_eq!(res.status(), StatusCode::OK);
}
