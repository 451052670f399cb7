//! Cluster view shared by the lister, the sharding filter and the output layer.

use serde::Serialize;

/// A managed cluster as seen by the controller, enriched with its registry record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
	pub name: String,
	pub server: String,
	/// Shard pinned through the registry secret, if any.
	pub shard: Option<i64>,
	/// Registry ID (the secret UID). Empty for clusters without a secret.
	pub id: String,
	/// Number of applications the controller has cached for this cluster.
	pub applications_count: i64,
}

impl Cluster {
	/// Whether `reference` names this cluster, either by name or by server URL.
	pub fn is_referenced_by(&self, reference: &str) -> bool {
		self.name == reference || self.server == reference
	}
}
