//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::{HttpResponse, Route, web};

use crate::domain::ports::{
    MockAdminConsole, MockEngagementQuery, MockLoginService, MockPointsCommand, MockPointsQuery,
    MockRegistrationCommand,
};
use crate::domain::{AuthenticatedUser, Error, RoleKind, UserId};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::{HttpState, HttpStatePorts, StreamSettings};
use crate::outbound::events::BroadcastEngagementEvents;

/// Name of the session cookie used in tests.
pub const SESSION_COOKIE: &str = "session";

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Disables the `Secure` flag for local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name(SESSION_COOKIE.to_owned())
        .cookie_secure(false)
        .build()
}

/// Extract the session cookie set by a response.
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Route that signs the caller in as `user_id` with `role`.
pub fn sign_in_route(user_id: UserId, role: RoleKind) -> Route {
    web::get().to(move |session: SessionContext| async move {
        session.persist_user(&AuthenticatedUser { user_id, role })?;
        Ok::<_, Error>(HttpResponse::Ok().finish())
    })
}

/// Builds [`HttpState`] from mocks; unset ports reject every call.
#[derive(Default)]
pub struct StateBuilder {
    registration: MockRegistrationCommand,
    login: MockLoginService,
    engagement: MockEngagementQuery,
    points: MockPointsCommand,
    points_query: MockPointsQuery,
    admin: MockAdminConsole,
    events: BroadcastEngagementEvents,
    stream: StreamSettings,
}

impl StateBuilder {
    pub fn registration(mut self, mock: MockRegistrationCommand) -> Self {
        self.registration = mock;
        self
    }

    pub fn login(mut self, mock: MockLoginService) -> Self {
        self.login = mock;
        self
    }

    pub fn engagement(mut self, mock: MockEngagementQuery) -> Self {
        self.engagement = mock;
        self
    }

    pub fn points(mut self, mock: MockPointsCommand) -> Self {
        self.points = mock;
        self
    }

    pub fn points_query(mut self, mock: MockPointsQuery) -> Self {
        self.points_query = mock;
        self
    }

    pub fn admin(mut self, mock: MockAdminConsole) -> Self {
        self.admin = mock;
        self
    }

    pub fn events(mut self, bus: BroadcastEngagementEvents) -> Self {
        self.events = bus;
        self
    }

    pub fn stream(mut self, stream: StreamSettings) -> Self {
        self.stream = stream;
        self
    }

    pub fn build(self) -> HttpState {
        HttpState::with_stream(
            HttpStatePorts {
                registration: Arc::new(self.registration),
                login: Arc::new(self.login),
                engagement: Arc::new(self.engagement),
                points: Arc::new(self.points),
                points_query: Arc::new(self.points_query),
                admin: Arc::new(self.admin),
                events: Arc::new(self.events),
            },
            self.stream,
        )
    }
}
