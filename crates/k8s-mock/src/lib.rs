//! Mock Kubernetes API server for testing.
//!
//! Provides an HTTP server that can be used with kubeconfig-based connections.

pub mod http;
pub mod secrets;

pub use http::{HttpMockK8sServer, RunningHttpMockK8sServer};
pub use secrets::cluster_secret;
