//! Cluster to shard assignment.
//!
//! The application controller places clusters on replicas with a fixed rule:
//! a cluster whose registry secret pins a shard stays on that shard, every
//! other cluster is placed by hashing its registry ID. The rule is reproduced
//! here so shard membership can be computed client-side.

use tracing::warn;

use crate::model::Cluster;

const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// Predicate deciding which shard owns a cluster for a given replica count.
pub trait ShardingFilter: Send + Sync {
	/// Shard index in `0..replicas` owning `cluster`.
	fn shard_for(&self, cluster: &Cluster, replicas: usize) -> usize;

	fn matches(&self, cluster: &Cluster, replicas: usize, shard: usize) -> bool {
		self.shard_for(cluster, replicas) == shard
	}
}

/// The controller's legacy assignment: pinned shard, otherwise FNV-1a of the cluster ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyShardingFilter;

impl ShardingFilter for LegacyShardingFilter {
	fn shard_for(&self, cluster: &Cluster, replicas: usize) -> usize {
		match cluster.shard {
			Some(requested) if requested >= 0 && (requested as u64) < replicas as u64 => {
				requested as usize
			}
			Some(requested) => {
				warn!(
					requested,
					server = %cluster.server,
					replicas,
					"specified cluster shard is greater than the number of available shards, using shard 0"
				);
				0
			}
			None => shard_by_id(&cluster.id, replicas),
		}
	}
}

/// Hash-based placement for clusters without a pinned shard.
///
/// An empty ID (clusters not backed by a registry secret) always lands on shard 0.
pub fn shard_by_id(id: &str, replicas: usize) -> usize {
	if id.is_empty() || replicas == 0 {
		return 0;
	}
	(u64::from(fnv1a_32(id.as_bytes())) % replicas as u64) as usize
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
	bytes.iter().fold(FNV32_OFFSET_BASIS, |hash, byte| {
		(hash ^ u32::from(*byte)).wrapping_mul(FNV32_PRIME)
	})
}
