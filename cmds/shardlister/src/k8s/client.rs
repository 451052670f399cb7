//! Connection to the cluster hosting the controller.

use std::{path::Path, time::Duration};

use k8s_openapi::apimachinery::pkg::version::Info;
use kube::{
	config::{KubeConfigOptions, Kubeconfig, KubeconfigError},
	Client, Config,
};
use thiserror::Error;
use tracing::instrument;

/// Default timeout for Kubernetes API requests.
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when connecting to the hosting cluster.
#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("no context named `{0}` was found. Please check your kubeconfig")]
	ContextNotFound(String),

	#[error("kubeconfig has no current context, pass --context to pick one")]
	NoCurrentContext,

	#[error(transparent)]
	Kubeconfig(#[from] KubeconfigError),

	#[error(transparent)]
	Kube(#[from] kube::Error),
}

/// A live connection to the cluster that stores the controller's registry.
#[derive(Clone)]
pub struct ClusterConnection {
	client: Client,
	server_version: Info,
	context: String,
}

impl std::fmt::Debug for ClusterConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClusterConnection")
			.field("context", &self.context)
			.field("server_version", &self.server_version.git_version)
			.finish_non_exhaustive()
	}
}

impl ClusterConnection {
	/// Connect using a kubeconfig file.
	///
	/// Without an explicit path the usual lookup applies (`$KUBECONFIG`, then
	/// `~/.kube/config`). Without an explicit context the kubeconfig's current
	/// context is used.
	#[instrument(skip_all)]
	pub async fn connect(
		kubeconfig_path: Option<&Path>,
		context: Option<&str>,
	) -> Result<Self, ConnectionError> {
		let kubeconfig = match kubeconfig_path {
			Some(path) => Kubeconfig::read_from(path)?,
			None => Kubeconfig::read()?,
		};
		Self::from_kubeconfig(kubeconfig, context).await
	}

	/// Connect using an already loaded kubeconfig.
	#[instrument(skip_all)]
	pub async fn from_kubeconfig(
		kubeconfig: Kubeconfig,
		context: Option<&str>,
	) -> Result<Self, ConnectionError> {
		let context = select_context(&kubeconfig, context)?;

		let mut config = Config::from_custom_kubeconfig(
			kubeconfig,
			&KubeConfigOptions {
				context: Some(context.clone()),
				..Default::default()
			},
		)
		.await?;
		config.read_timeout = Some(DEFAULT_API_TIMEOUT);

		let client = Client::try_from(config)?;
		let server_version = client.apiserver_version().await?;

		tracing::debug!(
			context = %context,
			version = %server_version.git_version,
			"connected to registry cluster"
		);

		Ok(Self {
			client,
			server_version,
			context,
		})
	}

	/// Get a reference to the underlying kube client.
	pub fn client(&self) -> &Client {
		&self.client
	}

	pub fn server_version(&self) -> &Info {
		&self.server_version
	}

	/// Name of the kubeconfig context in use.
	pub fn context(&self) -> &str {
		&self.context
	}
}

fn select_context(kubeconfig: &Kubeconfig, requested: Option<&str>) -> Result<String, ConnectionError> {
	match requested {
		Some(name) => {
			if kubeconfig.contexts.iter().any(|c| c.name == name) {
				Ok(name.to_string())
			} else {
				Err(ConnectionError::ContextNotFound(name.to_string()))
			}
		}
		None => kubeconfig
			.current_context
			.clone()
			.filter(|name| !name.is_empty())
			.ok_or(ConnectionError::NoCurrentContext),
	}
}
