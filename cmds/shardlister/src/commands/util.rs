//! Utilities for command handlers.

use std::io::{self, ErrorKind, Write};

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use super::GlobalArgs;
use crate::{
	argocd::{config::default_config_path, ArgoCdClient, ArgoCdConfig, Endpoint},
	k8s::{client::ClusterConnection, registry::KubeClusterRegistry},
	lister::{Lister, ListerError},
};

/// Lister wired to the live registry and API server.
pub type ControllerLister = Lister<KubeClusterRegistry, ArgoCdClient>;

/// A writer wrapper that silently handles broken pipe errors.
///
/// When the underlying writer returns a broken pipe error (EPIPE), this wrapper
/// converts it to a successful write. This allows commands to exit cleanly when
/// output is piped to a process that closes early (e.g., `shardlister apps | head -1`).
pub struct BrokenPipeGuard<W> {
	inner: W,
}

impl<W> BrokenPipeGuard<W> {
	pub fn new(inner: W) -> Self {
		Self { inner }
	}
}

impl<W: Write> Write for BrokenPipeGuard<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		match self.inner.write(buf) {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(buf.len()),
			other => other,
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		match self.inner.flush() {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
			other => other,
		}
	}
}

pub fn create_tokio_runtime() -> Result<Runtime> {
	tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.context("creating tokio runtime")
}

/// Resolve the API server endpoint from the CLI config and flags.
///
/// An explicitly passed config file must exist; the default one is optional.
pub fn resolve_endpoint(global: &GlobalArgs) -> Result<Endpoint> {
	let config = match &global.argocd_config {
		Some(path) => Some(ArgoCdConfig::load(path)?),
		None => match default_config_path() {
			Some(path) => ArgoCdConfig::load_optional(&path)?,
			None => None,
		},
	};

	let endpoint = Endpoint::resolve(config.as_ref(), &global.endpoint_overrides())?;
	tracing::debug!(?endpoint, "resolved API server endpoint");
	Ok(endpoint)
}

/// Connect to both upstreams and build a lister over them.
pub async fn connect_lister(global: &GlobalArgs) -> Result<ControllerLister> {
	let endpoint = resolve_endpoint(global).context("error creating argo client")?;
	let api = ArgoCdClient::new(&endpoint).context("error creating argo client")?;

	let connection = ClusterConnection::connect(global.kubeconfig.as_deref(), global.context.as_deref())
		.await
		.context("error connecting to the cluster hosting the cluster secrets")?;

	Ok(Lister::new(
		KubeClusterRegistry::new(&connection),
		api,
		global.namespace.clone(),
	))
}

/// Report shards whose listing failed on stderr.
///
/// Fails when at least one shard could not be listed, after every failure has
/// been printed.
pub fn report_failed_shards(what: &str, replicas: usize, failed: Vec<(usize, ListerError)>) -> Result<()> {
	if failed.is_empty() {
		return Ok(());
	}

	for (shard, err) in &failed {
		eprintln!("error listing {what} for shard {shard}: {err}");
	}
	anyhow::bail!("failed to list {what} for {} of {replicas} shards", failed.len())
}
