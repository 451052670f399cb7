//! Shard command handler.

use std::io::Write;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use super::GlobalArgs;
use crate::{
	argocd::ControllerApi,
	k8s::registry::ClusterRegistry,
	lister::Lister,
	output::{write_rows, ClusterRow, ShardAppCountRow, ShardAppRow},
};

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct ShardArgs {
	/// Shard index, starting at 0
	#[arg(value_name = "SHARD", required = true)]
	pub shard: Option<usize>,

	#[command(subcommand)]
	pub command: Option<ShardCommands>,
}

#[derive(Subcommand, Debug)]
pub enum ShardCommands {
	/// List all apps for a shard
	Apps(ShardAppsArgs),
}

#[derive(Args, Debug)]
pub struct ShardAppsArgs {
	/// Shard index, starting at 0
	#[arg(value_name = "SHARD")]
	pub shard: usize,

	/// Only show the number of applications
	#[arg(long)]
	pub count: bool,
}

/// Run the shard command.
pub async fn run<R, A, W>(args: ShardArgs, global: &GlobalArgs, lister: &Lister<R, A>, writer: W) -> Result<()>
where
	R: ClusterRegistry,
	A: ControllerApi,
	W: Write,
{
	match (args.command, args.shard) {
		(Some(ShardCommands::Apps(apps)), _) => run_apps(apps, global, lister, writer).await,
		(None, Some(shard)) => run_clusters(shard, global, lister, writer).await,
		(None, None) => anyhow::bail!("a shard index is required"),
	}
}

async fn run_clusters<R, A, W>(shard: usize, global: &GlobalArgs, lister: &Lister<R, A>, writer: W) -> Result<()>
where
	R: ClusterRegistry,
	A: ControllerApi,
	W: Write,
{
	let replicas = global.replicas()?;
	let clusters = lister
		.list_shard_clusters(replicas, shard)
		.await
		.with_context(|| format!("error getting clusters for shard {shard}"))?;

	let rows: Vec<_> = clusters.iter().map(|c| ClusterRow::new(shard, c)).collect();
	write_rows(writer, global.output, &rows)?;
	Ok(())
}

async fn run_apps<R, A, W>(args: ShardAppsArgs, global: &GlobalArgs, lister: &Lister<R, A>, writer: W) -> Result<()>
where
	R: ClusterRegistry,
	A: ControllerApi,
	W: Write,
{
	let replicas = global.replicas()?;
	let apps = lister
		.list_shard_apps(replicas, args.shard)
		.await
		.with_context(|| format!("error listing apps for shard {}", args.shard))?;

	if args.count {
		let rows = [ShardAppCountRow {
			shard: args.shard,
			app_count: apps.len(),
		}];
		write_rows(writer, global.output, &rows)?;
	} else {
		let rows: Vec<_> = apps.iter().map(|app| ShardAppRow::new(args.shard, app)).collect();
		write_rows(writer, global.output, &rows)?;
	}
	Ok(())
}
