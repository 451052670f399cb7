pub mod argocd;
pub mod cache;
pub mod commands;
pub mod k8s;
pub mod lister;
pub mod model;
pub mod output;
pub mod sharding;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
