//! Shard membership queries.
//!
//! The lister joins the API server's cluster list (names, servers, cached
//! application counts) with the cluster registry (IDs and pinned shards), runs
//! the sharding filter over the result, and matches applications against the
//! clusters of a shard by destination.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use thiserror::Error;
use tracing::instrument;

use crate::{
	argocd::{ApiCluster, ApiError, Application, ControllerApi},
	cache::ReadThroughCache,
	k8s::registry::{ClusterRegistry, RegisteredCluster, RegistryError},
	model::Cluster,
	sharding::{LegacyShardingFilter, ShardingFilter},
};

#[derive(Debug, Clone, Error)]
pub enum ListerError {
	#[error("cannot have less than 1 shard")]
	NoShards,

	#[error("shard {shard} is out of range, there are only {replicas} shards (0..{replicas})")]
	ShardOutOfRange { shard: usize, replicas: usize },

	#[error("cluster {0} not found")]
	ClusterNotFound(String),

	#[error("error listing clusters from the registry: {0}")]
	Registry(#[source] Arc<RegistryError>),

	#[error("error querying the API server: {0}")]
	Api(#[source] Arc<ApiError>),
}

impl From<RegistryError> for ListerError {
	fn from(err: RegistryError) -> Self {
		Self::Registry(Arc::new(err))
	}
}

impl From<ApiError> for ListerError {
	fn from(err: ApiError) -> Self {
		Self::Api(Arc::new(err))
	}
}

/// Result of one shard in a fan-out query.
#[derive(Debug)]
pub struct ShardListing<T> {
	pub shard: usize,
	pub result: Result<Vec<T>, ListerError>,
}

pub struct Lister<R, A, F = LegacyShardingFilter> {
	registry: R,
	api: A,
	filter: F,
	namespace: String,
	clusters: ReadThroughCache<Arc<Vec<Cluster>>, ListerError>,
	applications: ReadThroughCache<Arc<Vec<Application>>, ListerError>,
}

impl<R, A> Lister<R, A>
where
	R: ClusterRegistry,
	A: ControllerApi,
{
	/// Lister using the controller's legacy sharding and the default cache TTL.
	pub fn new(registry: R, api: A, namespace: impl Into<String>) -> Self {
		Self {
			registry,
			api,
			filter: LegacyShardingFilter,
			namespace: namespace.into(),
			clusters: ReadThroughCache::default(),
			applications: ReadThroughCache::default(),
		}
	}
}

impl<R, A, F> Lister<R, A, F>
where
	R: ClusterRegistry,
	A: ControllerApi,
	F: ShardingFilter,
{
	/// Swap the sharding filter.
	pub fn with_filter<G: ShardingFilter>(self, filter: G) -> Lister<R, A, G> {
		Lister {
			registry: self.registry,
			api: self.api,
			filter,
			namespace: self.namespace,
			clusters: self.clusters,
			applications: self.applications,
		}
	}

	/// Change how long upstream listings are reused.
	pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
		self.clusters = ReadThroughCache::new(ttl);
		self.applications = ReadThroughCache::new(ttl);
		self
	}

	/// All clusters known to the API server, with registry IDs and pinned shards.
	pub async fn list_clusters(&self) -> Result<Arc<Vec<Cluster>>, ListerError> {
		self.clusters.get_or_try_fetch(|| self.fetch_clusters()).await
	}

	#[instrument(skip(self), fields(namespace = %self.namespace))]
	async fn fetch_clusters(&self) -> Result<Arc<Vec<Cluster>>, ListerError> {
		let (api_clusters, registered) = futures::try_join!(
			async { self.api.list_clusters().await.map_err(ListerError::from) },
			async {
				self.registry
					.list_clusters(&self.namespace)
					.await
					.map_err(ListerError::from)
			},
		)?;

		Ok(Arc::new(merge_clusters(api_clusters, &registered)))
	}

	async fn applications(&self) -> Result<Arc<Vec<Application>>, ListerError> {
		self.applications
			.get_or_try_fetch(|| async { Ok::<_, ListerError>(Arc::new(self.api.list_applications().await?)) })
			.await
	}

	/// Clusters owned by `shard` out of `replicas` shards.
	pub async fn list_shard_clusters(
		&self,
		replicas: usize,
		shard: usize,
	) -> Result<Vec<Cluster>, ListerError> {
		validate_shard(replicas, shard)?;
		let clusters = self.list_clusters().await?;

		Ok(clusters
			.iter()
			.filter(|cluster| self.filter.matches(cluster, replicas, shard))
			.cloned()
			.collect())
	}

	/// Applications deployed to any cluster owned by `shard`.
	pub async fn list_shard_apps(
		&self,
		replicas: usize,
		shard: usize,
	) -> Result<Vec<Application>, ListerError> {
		let clusters = self.list_shard_clusters(replicas, shard).await?;
		let applications = self.applications().await?;

		Ok(applications
			.iter()
			.filter(|app| {
				clusters
					.iter()
					.any(|cluster| app.destination().targets(&cluster.name, &cluster.server))
			})
			.cloned()
			.collect())
	}

	/// Applications targeting the cluster with the given name or server URL.
	pub async fn list_cluster_apps(&self, cluster: &str) -> Result<Vec<Application>, ListerError> {
		let clusters = self.list_clusters().await?;
		let target = clusters
			.iter()
			.find(|c| c.is_referenced_by(cluster))
			.ok_or_else(|| ListerError::ClusterNotFound(cluster.to_string()))?;

		let applications = self.applications().await?;

		Ok(applications
			.iter()
			.filter(|app| app.destination().targets(&target.name, &target.server))
			.cloned()
			.collect())
	}

	/// Clusters of every shard, queried concurrently.
	pub async fn list_all_shard_clusters(
		&self,
		replicas: usize,
	) -> Result<Vec<ShardListing<Cluster>>, ListerError> {
		validate_replicas(replicas)?;

		Ok(join_all((0..replicas).map(|shard| async move {
			ShardListing {
				shard,
				result: self.list_shard_clusters(replicas, shard).await,
			}
		}))
		.await)
	}

	/// Applications of every shard, queried concurrently.
	pub async fn list_all_shard_apps(
		&self,
		replicas: usize,
	) -> Result<Vec<ShardListing<Application>>, ListerError> {
		validate_replicas(replicas)?;

		Ok(join_all((0..replicas).map(|shard| async move {
			ShardListing {
				shard,
				result: self.list_shard_apps(replicas, shard).await,
			}
		}))
		.await)
	}
}

pub fn validate_replicas(replicas: usize) -> Result<(), ListerError> {
	if replicas < 1 {
		return Err(ListerError::NoShards);
	}
	Ok(())
}

pub fn validate_shard(replicas: usize, shard: usize) -> Result<(), ListerError> {
	validate_replicas(replicas)?;
	if shard >= replicas {
		return Err(ListerError::ShardOutOfRange { shard, replicas });
	}
	Ok(())
}

/// Attach registry IDs and pinned shards to the API server's clusters.
///
/// A registry record matches when both name and server agree. Clusters the
/// registry does not know (the in-cluster destination, typically) keep the
/// shard reported by the API server and an empty ID.
fn merge_clusters(api_clusters: Vec<ApiCluster>, registered: &[RegisteredCluster]) -> Vec<Cluster> {
	api_clusters
		.into_iter()
		.map(|api| {
			let record = registered
				.iter()
				.find(|r| r.name == api.name && r.server == api.server);

			Cluster {
				shard: record.map_or(api.shard, |r| r.shard),
				id: record.map(|r| r.id.clone()).unwrap_or_default(),
				applications_count: api.info.applications_count,
				name: api.name,
				server: api.server,
			}
		})
		.collect()
}
