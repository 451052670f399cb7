//! Client for the controller's API server.
//!
//! Only the two read-only listings the lister needs are implemented: the
//! cluster list (which carries the cached application count) and the
//! application list.

pub mod client;
pub mod config;
pub mod types;

pub use client::{ApiError, ArgoCdClient, ControllerApi};
pub use config::{ArgoCdConfig, ConfigError, Endpoint, EndpointOverrides};
pub use types::{ApiCluster, Application, Destination};
