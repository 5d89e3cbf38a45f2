//! End-to-end points flows over the in-memory adapters.

mod support;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use recruit_backend::test_support::MemoryStack;
use serde_json::{Value, json};
use support::{peer, recruit_app, sign_in_admin};
use uuid::Uuid;

#[actix_web::test]
async fn direct_award_creates_the_recipient_and_logs_the_credit() {
    let stack = MemoryStack::new(support::fixed_now());
    let app = recruit_app!(stack);
    let admin = sign_in_admin!(app, peer(10));
    let user_id = Uuid::new_v4().to_string();

    let award = TestRequest::post()
        .uri("/api/v1/admin/points/award")
        .peer_addr(peer(10))
        .cookie(admin.clone())
        .set_json(json!({
            "userId": user_id,
            "points": 500,
            "activity": "application_submission",
            "email": "walk-in@example.org",
            "displayName": "Walk In"
        }))
        .to_request();
    let res = test::call_service(&app, award).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["userId"], user_id);
    assert_eq!(body["pointsAwarded"], 500);
    assert_eq!(body["newBalance"], 500);

    let audit = TestRequest::get()
        .uri(&format!("/api/v1/admin/points/{user_id}/audit"))
        .peer_addr(peer(10))
        .cookie(admin)
        .to_request();
    let res = test::call_service(&app, audit).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["recordedBalance"], 500);
    assert_eq!(body["ledgerTotal"], 500);
    assert_eq!(body["entryCount"], 1);
    assert_eq!(body["consistent"], true);
}

#[actix_web::test]
async fn award_to_an_unknown_user_without_details_is_not_found() {
    let stack = MemoryStack::new(support::fixed_now());
    let app = recruit_app!(stack);
    let admin = sign_in_admin!(app, peer(11));

    let award = TestRequest::post()
        .uri("/api/v1/admin/points/award")
        .peer_addr(peer(11))
        .cookie(admin)
        .set_json(json!({
            "userId": Uuid::new_v4().to_string(),
            "points": 50,
            "activity": "event_attended"
        }))
        .to_request();
    let res = test::call_service(&app, award).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "not_found");
}

#[actix_web::test]
async fn awarded_recruits_appear_on_the_public_leaderboard() {
    let stack = MemoryStack::new(support::fixed_now());
    let app = recruit_app!(stack);
    let admin = sign_in_admin!(app, peer(12));

    for (points, name) in [(120, "Deputy Ada"), (300, "Deputy Bo")] {
        let award = TestRequest::post()
            .uri("/api/v1/admin/points/award")
            .peer_addr(peer(12))
            .cookie(admin.clone())
            .set_json(json!({
                "userId": Uuid::new_v4().to_string(),
                "points": points,
                "activity": "event_attended",
                "email": format!("{}@example.org", name.replace(' ', ".").to_lowercase()),
                "displayName": name
            }))
            .to_request();
        let res = test::call_service(&app, award).await;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let board = TestRequest::get()
        .uri("/api/v1/leaderboard")
        .peer_addr(peer(13))
        .to_request();
    let res = test::call_service(&app, board).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    let items = body["items"].as_array().expect("items");
    assert_eq!(items.len(), 2, "admin accounts are not ranked: {body}");
    assert_eq!(items[0]["displayName"], "Deputy Bo");
    assert_eq!(items[0]["rank"], 1);
    assert_eq!(items[1]["displayName"], "Deputy Ada");
}
