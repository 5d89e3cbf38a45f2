//! Driven port for diagnostics checks against backing services.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Failure reported by a dependency probe.
    pub enum ProbeError {
        /// The dependency could not be reached or answered with an error.
        Unavailable { message: String } => "dependency unavailable: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    /// Stable dependency name shown in diagnostics.
    fn name(&self) -> &'static str;

    /// Perform a cheap round trip.
    async fn check(&self) -> Result<(), ProbeError>;
}
