//! Mock Argo CD API server for testing.
//!
//! Serves the read-only REST listings (`/api/v1/clusters` and
//! `/api/v1/applications`) over HTTP, optionally behind a bearer token.

pub mod fixtures;
pub mod http;

pub use fixtures::{application, cluster};
pub use http::{HttpMockArgoCdServer, RunningHttpMockArgoCdServer};
