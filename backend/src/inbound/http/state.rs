//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and depend only on domain
//! ports, so they stay testable with mocks and no I/O.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::ports::{
    AdminConsole, EngagementEventBus, EngagementQuery, LoginService, PointsCommand, PointsQuery,
    RegistrationCommand,
};

/// Default interval between unsolicited snapshot frames.
pub const DEFAULT_STREAM_REFRESH: Duration = Duration::from_secs(30);
/// Reconnect hint sent to event-stream clients.
pub const DEFAULT_STREAM_RETRY: Duration = Duration::from_secs(5);

/// Timing of the engagement event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub refresh_interval: Duration,
    pub retry_hint: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_STREAM_REFRESH,
            retry_hint: DEFAULT_STREAM_RETRY,
        }
    }
}

/// Parameter object bundling the port implementations.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub registration: Arc<dyn RegistrationCommand>,
    pub login: Arc<dyn LoginService>,
    pub engagement: Arc<dyn EngagementQuery>,
    pub points: Arc<dyn PointsCommand>,
    pub points_query: Arc<dyn PointsQuery>,
    pub admin: Arc<dyn AdminConsole>,
    pub events: Arc<dyn EngagementEventBus>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub registration: Arc<dyn RegistrationCommand>,
    pub login: Arc<dyn LoginService>,
    pub engagement: Arc<dyn EngagementQuery>,
    pub points: Arc<dyn PointsCommand>,
    pub points_query: Arc<dyn PointsQuery>,
    pub admin: Arc<dyn AdminConsole>,
    pub events: Arc<dyn EngagementEventBus>,
    pub stream: StreamSettings,
}

impl HttpState {
    /// Construct state with default stream timing.
    pub fn new(ports: HttpStatePorts) -> Self {
        Self::with_stream(ports, StreamSettings::default())
    }

    /// Construct state with explicit stream timing.
    pub fn with_stream(ports: HttpStatePorts, stream: StreamSettings) -> Self {
        let HttpStatePorts {
            registration,
            login,
            engagement,
            points,
            points_query,
            admin,
            events,
        } = ports;
        Self {
            registration,
            login,
            engagement,
            points,
            points_query,
            admin,
            events,
            stream,
        }
    }
}
