//! Kubernetes access for the cluster registry.
//!
//! The controller declares every managed cluster as a labelled Secret in its
//! namespace. This module connects to the hosting cluster with kube-rs and
//! decodes those secrets.

pub mod client;
pub mod registry;
