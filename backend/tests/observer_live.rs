//! The snapshot observer following a running server over the event stream.

mod support;

use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::Key;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, web};
use recruit_backend::domain::UserId;
use recruit_backend::domain::points::{ActivityType, AwardRequest, PointAmount};
use recruit_backend::domain::ports::TokenPurpose;
use recruit_backend::inbound::http::configure_api;
use recruit_backend::observer::{HttpSnapshotSource, PolicyConfig, SnapshotObserver};
use recruit_backend::test_support::MemoryStack;
use reqwest::header::SET_COOKIE;
use serde_json::{Value, json};
use tokio::time::timeout;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

fn session_pair(response: &reqwest::Response) -> String {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_owned)
        .expect("session cookie")
}

#[actix_rt::test]
async fn observer_receives_a_fresh_snapshot_after_an_award() {
    let stack = MemoryStack::new(support::fixed_now());
    let state = stack.http_state(None);
    let key = Key::generate();
    let server_state = web::Data::new(state.clone());
    let server = HttpServer::new(move || {
        App::new().app_data(server_state.clone()).service(
            web::scope("/api/v1")
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
                        .cookie_name(support::SESSION_COOKIE.to_owned())
                        .cookie_secure(false)
                        .build(),
                )
                .configure(configure_api),
        )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind");
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_rt::spawn(server);
    let base = Url::parse(&format!("http://{addr}/")).expect("base url");

    let client = reqwest::Client::new();
    let registered: Value = client
        .post(base.join("api/v1/registrations").expect("url"))
        .json(&json!({
            "email": "dana@example.org",
            "displayName": "Deputy Dana",
            "role": "recruit"
        }))
        .send()
        .await
        .expect("register")
        .json()
        .await
        .expect("registration body");
    let user_id: UserId = registered["userId"]
        .as_str()
        .expect("user id")
        .parse()
        .expect("uuid");
    let token = stack
        .mailer
        .last_token("dana@example.org", TokenPurpose::Confirmation)
        .expect("confirmation token");
    let confirmed = client
        .post(base.join("api/v1/login/confirm").expect("url"))
        .json(&json!({ "token": token.expose() }))
        .send()
        .await
        .expect("confirm");
    assert!(confirmed.status().is_success());
    let cookie = session_pair(&confirmed);

    let source = HttpSnapshotSource::connect(base, Some(cookie)).expect("source");
    let (observer, mut snapshots) = SnapshotObserver::new(Arc::new(source), PolicyConfig::default());
    let task = actix_rt::spawn(observer.run());

    timeout(WAIT, snapshots.wait_for(|latest| latest.is_some()))
        .await
        .expect("initial snapshot in time")
        .expect("observer running");

    state
        .points
        .award(&AwardRequest {
            user_id,
            points: PointAmount::new(50).expect("points"),
            activity: ActivityType::new("event_attended").expect("activity"),
            description: None,
        })
        .await
        .expect("award");

    let balance = timeout(
        WAIT,
        snapshots.wait_for(|latest| latest.as_ref().is_some_and(|s| s.balance == 50)),
    )
    .await
    .expect("updated snapshot in time")
    .expect("observer running")
    .as_ref()
    .map(|snapshot| snapshot.balance);
    assert_eq!(balance, Some(50));

    drop(snapshots);
    timeout(WAIT, task)
        .await
        .expect("observer stops once unobserved")
        .expect("observer task");
    handle.stop(true).await;
}
