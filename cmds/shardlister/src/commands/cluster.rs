//! Cluster command handler.

use std::io::Write;

use anyhow::Result;
use clap::{Args, Subcommand};

use super::GlobalArgs;
use crate::{
	argocd::ControllerApi,
	k8s::registry::ClusterRegistry,
	lister::Lister,
	output::{write_rows, ClusterAppCountRow, ClusterAppRow},
};

#[derive(Args, Debug)]
pub struct ClusterArgs {
	#[command(subcommand)]
	pub command: ClusterCommands,
}

#[derive(Subcommand, Debug)]
pub enum ClusterCommands {
	/// List all apps targeting a cluster
	Apps(ClusterAppsArgs),
}

#[derive(Args, Debug)]
pub struct ClusterAppsArgs {
	/// Cluster name or server URL
	pub cluster: String,

	/// Only show the number of applications
	#[arg(long)]
	pub count: bool,
}

/// Run the cluster command.
pub async fn run<R, A, W>(args: ClusterArgs, global: &GlobalArgs, lister: &Lister<R, A>, writer: W) -> Result<()>
where
	R: ClusterRegistry,
	A: ControllerApi,
	W: Write,
{
	let ClusterCommands::Apps(args) = args.command;
	let apps = lister.list_cluster_apps(&args.cluster).await?;

	if args.count {
		let rows = [ClusterAppCountRow {
			cluster: args.cluster,
			app_count: apps.len(),
		}];
		write_rows(writer, global.output, &rows)?;
	} else {
		let rows: Vec<_> = apps.iter().map(ClusterAppRow::from).collect();
		write_rows(writer, global.output, &rows)?;
	}
	Ok(())
}
