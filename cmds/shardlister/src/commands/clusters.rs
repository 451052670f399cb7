//! Root command: clusters of every shard.

use std::io::Write;

use anyhow::Result;

use super::{util::report_failed_shards, GlobalArgs};
use crate::{
	argocd::ControllerApi,
	k8s::registry::ClusterRegistry,
	lister::Lister,
	output::{write_rows, ClusterRow},
};

/// List the clusters of all shards, in shard order.
pub async fn run<R, A, W>(global: &GlobalArgs, lister: &Lister<R, A>, writer: W) -> Result<()>
where
	R: ClusterRegistry,
	A: ControllerApi,
	W: Write,
{
	let replicas = global.replicas()?;
	let listings = lister.list_all_shard_clusters(replicas).await?;

	let mut rows = Vec::new();
	let mut failed = Vec::new();
	for listing in listings {
		match listing.result {
			Ok(clusters) => rows.extend(clusters.iter().map(|c| ClusterRow::new(listing.shard, c))),
			Err(err) => failed.push((listing.shard, err)),
		}
	}

	write_rows(writer, global.output, &rows)?;
	report_failed_shards("clusters", replicas, failed)
}
