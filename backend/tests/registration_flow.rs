//! Registration, passwordless sign-in, and volunteer approval end to end.

mod support;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use recruit_backend::domain::ports::TokenPurpose;
use recruit_backend::test_support::MemoryStack;
use serde_json::{Value, json};
use support::{peer, recruit_app, sign_in_admin};

#[actix_web::test]
async fn recruits_confirm_by_email_and_earn_points() {
    let stack = MemoryStack::new(support::fixed_now());
    let app = recruit_app!(stack);

    let register = TestRequest::post()
        .uri("/api/v1/registrations")
        .peer_addr(peer(30))
        .set_json(json!({
            "email": "dana@example.org",
            "displayName": "Deputy Dana",
            "role": "recruit"
        }))
        .to_request();
    let res = test::call_service(&app, register).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let token = stack
        .mailer
        .last_token("dana@example.org", TokenPurpose::Confirmation)
        .expect("confirmation email");
    let confirm = TestRequest::post()
        .uri("/api/v1/login/confirm")
        .peer_addr(peer(30))
        .set_json(json!({ "token": token.expose() }))
        .to_request();
    let res = test::call_service(&app, confirm).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = support::session_cookie(&res);

    let report = TestRequest::post()
        .uri("/api/v1/engagement/activities")
        .peer_addr(peer(30))
        .cookie(cookie.clone())
        .set_json(json!({ "activity": "trivia_completed" }))
        .to_request();
    let res = test::call_service(&app, report).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let summary = TestRequest::get()
        .uri("/api/v1/engagement/summary")
        .peer_addr(peer(30))
        .cookie(cookie)
        .to_request();
    let res = test::call_service(&app, summary).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["balance"], 20);
    assert_eq!(body["rank"], 1);

    // Tokens are single use.
    let replay = TestRequest::post()
        .uri("/api/v1/login/confirm")
        .peer_addr(peer(31))
        .set_json(json!({ "token": token.expose() }))
        .to_request();
    let res = test::call_service(&app, replay).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn duplicate_volunteer_registration_is_a_conflict() {
    let stack = MemoryStack::new(support::fixed_now());
    let app = recruit_app!(stack);
    let volunteer = json!({
        "email": "vera@example.org",
        "displayName": "Volunteer Vera",
        "role": "volunteer_recruiter",
        "organisation": "County Rotary"
    });

    let first = TestRequest::post()
        .uri("/api/v1/registrations")
        .peer_addr(peer(32))
        .set_json(volunteer.clone())
        .to_request();
    let res = test::call_service(&app, first).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["volunteerStatus"], "pending");

    let mut again = volunteer;
    again["email"] = json!("  VERA@example.org ");
    let second = TestRequest::post()
        .uri("/api/v1/registrations")
        .peer_addr(peer(32))
        .set_json(again)
        .to_request();
    let res = test::call_service(&app, second).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let admin = sign_in_admin!(app, peer(33));
    let list = TestRequest::get()
        .uri("/api/v1/admin/users")
        .peer_addr(peer(33))
        .cookie(admin)
        .to_request();
    let res = test::call_service(&app, list).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    let volunteers = body["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter(|account| account["email"] == "vera@example.org")
        .count();
    assert_eq!(volunteers, 1);
    assert_eq!(stack.mailer.sent().len(), 1);
}

#[actix_web::test]
async fn pending_volunteers_earn_only_after_approval() {
    let stack = MemoryStack::new(support::fixed_now());
    let app = recruit_app!(stack);

    let register = TestRequest::post()
        .uri("/api/v1/registrations")
        .peer_addr(peer(34))
        .set_json(json!({
            "email": "vic@example.org",
            "displayName": "Volunteer Vic",
            "role": "volunteer_recruiter"
        }))
        .to_request();
    let res = test::call_service(&app, register).await;
    let body: Value = test::read_body_json(res).await;
    let user_id = body["userId"].as_str().expect("user id").to_owned();

    let admin = sign_in_admin!(app, peer(35));
    let award = |admin: actix_web::cookie::Cookie<'static>| {
        TestRequest::post()
            .uri("/api/v1/admin/points/award")
            .peer_addr(peer(35))
            .cookie(admin)
            .set_json(json!({ "userId": user_id, "points": 25, "activity": "event_attended" }))
            .to_request()
    };

    let res = test::call_service(&app, award(admin.clone())).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let approve = TestRequest::post()
        .uri(&format!("/api/v1/admin/volunteers/{user_id}/approve"))
        .peer_addr(peer(35))
        .cookie(admin.clone())
        .to_request();
    let res = test::call_service(&app, approve).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = test::call_service(&app, award(admin)).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["newBalance"], 25);
}
