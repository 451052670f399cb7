//! Apps command handler.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use super::{util::report_failed_shards, GlobalArgs};
use crate::{
	argocd::ControllerApi,
	k8s::registry::ClusterRegistry,
	lister::Lister,
	output::{write_rows, ShardAppCountRow, ShardAppRow},
};

#[derive(Args, Debug)]
pub struct AppsArgs {
	/// Only show the number of applications per shard
	#[arg(long)]
	pub count: bool,
}

/// Run the apps command.
pub async fn run<R, A, W>(args: AppsArgs, global: &GlobalArgs, lister: &Lister<R, A>, writer: W) -> Result<()>
where
	R: ClusterRegistry,
	A: ControllerApi,
	W: Write,
{
	let replicas = global.replicas()?;
	let listings = lister.list_all_shard_apps(replicas).await?;

	let mut apps = Vec::new();
	let mut failed = Vec::new();
	for listing in listings {
		match listing.result {
			Ok(found) => apps.push((listing.shard, found)),
			Err(err) => failed.push((listing.shard, err)),
		}
	}

	if args.count {
		let rows: Vec<_> = apps
			.iter()
			.map(|(shard, found)| ShardAppCountRow {
				shard: *shard,
				app_count: found.len(),
			})
			.collect();
		write_rows(writer, global.output, &rows)?;
	} else {
		let rows: Vec<_> = apps
			.iter()
			.flat_map(|(shard, found)| found.iter().map(|app| ShardAppRow::new(*shard, app)))
			.collect();
		write_rows(writer, global.output, &rows)?;
	}

	report_failed_shards("apps", replicas, failed)
}
