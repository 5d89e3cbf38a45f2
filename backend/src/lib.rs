//! Deputy recruitment engagement backend.
//!
//! Hexagonal layout: [`domain`] holds entities, services, and ports;
//! [`inbound`] and [`outbound`] adapt them to HTTP, PostgreSQL, Redis, and
//! in-process infrastructure. [`observer`] is the client that follows a
//! user's engagement snapshot over the event stream.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod observer;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::{RateLimit, Trace};
