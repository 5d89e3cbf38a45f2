//! Prometheus request metrics and the `/metrics` endpoint.
//!
//! The layer boxes the wrapped service so the app has one type whether or
//! not an exporter is configured.

use std::sync::Arc;

use actix_service::{
    Service, ServiceExt as _, Transform,
    boxed::{self, BoxService},
};
use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Compat;
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use futures_util::future::{LocalBoxFuture, ready};

type BoxedService = BoxService<ServiceRequest, ServiceResponse<BoxBody>, actix_web::Error>;

/// Build the exporter served at `/metrics`.
///
/// # Errors
/// Returns an error when the default HTTP collectors cannot be registered.
pub fn make_metrics() -> std::io::Result<PrometheusMetrics> {
    PrometheusMetricsBuilder::new("recruit")
        .endpoint("/metrics")
        .build()
        .map_err(|err| std::io::Error::other(format!("prometheus setup failed: {err}")))
}

/// Wraps the app with the exporter when one is configured.
#[derive(Clone, Default)]
pub(crate) struct PrometheusLayer {
    exporter: Option<Arc<PrometheusMetrics>>,
}

impl PrometheusLayer {
    pub(crate) fn new(exporter: Option<PrometheusMetrics>) -> Self {
        Self {
            exporter: exporter.map(Arc::new),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for PrometheusLayer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = BoxedService;
    type Future = LocalBoxFuture<'static, Result<BoxedService, ()>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let Some(exporter) = self.exporter.as_deref() else {
            let passthrough = service.map(ServiceResponse::<B>::map_into_boxed_body);
            return Box::pin(ready(Ok(boxed::service(passthrough))));
        };
        let pending = Compat::new(exporter.clone()).new_transform(service);
        Box::pin(async move { pending.await.map(boxed::service) })
    }
}
