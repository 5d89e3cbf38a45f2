//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel
//! - **rate_limit**: Redis-backed counters with an in-process fallback
//! - **memory**: process-local account, ledger, and token store
//! - **events**: in-process broadcast of engagement changes
//! - **mail**: token email delivery
//! - **metrics**: Prometheus-backed metrics exporters (feature-gated)
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod events;
pub mod mail;
pub mod memory;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod persistence;
pub mod rate_limit;
