//! CardVault Admin - operator-side state.
//!
//! Everything the admin panel shows that is not plain catalog CRUD (which
//! is the client crate's `CatalogStore`, injected unchanged): the support
//! desk with its unread counters, the visitor directory, broadcast
//! publishing, and the dashboard metrics.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod broadcast;
pub mod metrics;
pub mod support;
pub mod visitors;

pub use broadcast::Broadcaster;
pub use metrics::DashboardMetrics;
pub use support::SupportDesk;
pub use visitors::VisitorDirectory;
