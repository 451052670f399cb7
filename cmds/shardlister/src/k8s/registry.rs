//! Cluster registry backed by the controller's cluster secrets.

use std::{collections::BTreeMap, future::Future};

use k8s_openapi::{api::core::v1::Secret, ByteString};
use kube::{api::ListParams, Api, Client};
use thiserror::Error;
use tracing::instrument;

use super::client::ClusterConnection;

/// Label selector matching the secrets that declare managed clusters.
pub const CLUSTER_SECRET_SELECTOR: &str = "argocd.argoproj.io/secret-type=cluster";

/// A cluster as declared in the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisteredCluster {
	/// UID of the backing secret; the sharding hash input.
	pub id: String,
	pub name: String,
	pub server: String,
	/// Shard pinned through the secret's `shard` field.
	pub shard: Option<i64>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("cluster secret `{secret}` has no `{key}` field")]
	MissingField { secret: String, key: &'static str },

	#[error("cluster secret `{secret}` field `{key}` is not valid UTF-8")]
	InvalidUtf8 { secret: String, key: &'static str },

	#[error("cluster secret `{secret}` has a non-numeric shard `{value}`")]
	InvalidShard { secret: String, value: String },

	#[error(transparent)]
	Kube(#[from] kube::Error),
}

/// Source of registered clusters.
pub trait ClusterRegistry: Send + Sync {
	fn list_clusters(
		&self,
		namespace: &str,
	) -> impl Future<Output = Result<Vec<RegisteredCluster>, RegistryError>> + Send;
}

/// Registry reading cluster secrets through the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterRegistry {
	client: Client,
}

impl KubeClusterRegistry {
	pub fn new(connection: &ClusterConnection) -> Self {
		Self {
			client: connection.client().clone(),
		}
	}
}

impl ClusterRegistry for KubeClusterRegistry {
	#[instrument(skip(self))]
	async fn list_clusters(&self, namespace: &str) -> Result<Vec<RegisteredCluster>, RegistryError> {
		let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
		let list = secrets
			.list(&ListParams::default().labels(CLUSTER_SECRET_SELECTOR))
			.await?;

		tracing::debug!(count = list.items.len(), "listed cluster secrets");

		// a malformed secret only hides its own cluster
		Ok(list
			.items
			.iter()
			.filter_map(|secret| match RegisteredCluster::from_secret(secret) {
				Ok(cluster) => Some(cluster),
				Err(err) => {
					tracing::error!(%err, "could not decode cluster secret, skipping");
					None
				}
			})
			.collect())
	}
}

impl RegisteredCluster {
	/// Decode a cluster secret.
	///
	/// `server` is required; `name` defaults to empty and `shard` to unpinned.
	pub fn from_secret(secret: &Secret) -> Result<Self, RegistryError> {
		let secret_name = secret.metadata.name.clone().unwrap_or_default();
		let empty = BTreeMap::new();
		let data = secret.data.as_ref().unwrap_or(&empty);

		let server = field(data, &secret_name, "server")?.ok_or_else(|| RegistryError::MissingField {
			secret: secret_name.clone(),
			key: "server",
		})?;
		let name = field(data, &secret_name, "name")?.unwrap_or_default();
		let shard = field(data, &secret_name, "shard")?
			.map(|value| {
				value.parse::<i64>().map_err(|_| RegistryError::InvalidShard {
					secret: secret_name.clone(),
					value,
				})
			})
			.transpose()?;

		Ok(Self {
			id: secret.metadata.uid.clone().unwrap_or_default(),
			name,
			server,
			shard,
		})
	}
}

fn field(
	data: &BTreeMap<String, ByteString>,
	secret: &str,
	key: &'static str,
) -> Result<Option<String>, RegistryError> {
	data.get(key)
		.map(|bytes| {
			String::from_utf8(bytes.0.clone()).map_err(|_| RegistryError::InvalidUtf8 {
				secret: secret.to_string(),
				key,
			})
		})
		.transpose()
}
