//! Command-line interface.

use std::{io::Write, path::PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tokio::runtime::Runtime;

use crate::{
	argocd::{ControllerApi, EndpointOverrides},
	k8s::registry::ClusterRegistry,
	lister::{Lister, ListerError},
	output::OutputFormat,
};

pub mod apps;
pub mod cluster;
pub mod clusters;
pub mod completion;
pub mod shard;
pub mod util;

#[derive(Parser, Debug)]
#[command(name = "shardlister")]
#[command(about = "List clusters and applications owned by each application controller shard", long_about = None)]
#[command(version = env!("SHARDLISTER_VERSION"))]
pub struct Cli {
	#[command(flatten)]
	pub global: GlobalArgs,

	// without a subcommand, all clusters of all shards are listed
	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List all clusters for a given shard
	Shard(shard::ShardArgs),

	/// List the apps of every shard
	Apps(apps::AppsArgs),

	/// Inspect a single cluster
	Cluster(cluster::ClusterArgs),

	/// Generate shell completions
	Completion(completion::CompletionArgs),
}

impl Commands {
	fn requires_shards(command: Option<&Self>) -> bool {
		matches!(command, None | Some(Self::Shard(_) | Self::Apps(_)))
	}
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
	/// Number of total shards in the cluster
	#[arg(long, global = true, env = "SHARDLISTER_SHARDS", default_value_t = 0, allow_negative_numbers = true)]
	pub shards: i64,

	/// Namespace where the cluster secrets are located
	#[arg(short = 'n', long, global = true, env = "SHARDLISTER_NAMESPACE", default_value = "argocd")]
	pub namespace: String,

	/// Path to the kubeconfig used to read cluster secrets (default: $KUBECONFIG or ~/.kube/config)
	#[arg(long, global = true, env = "SHARDLISTER_KUBECONFIG")]
	pub kubeconfig: Option<PathBuf>,

	/// Kubeconfig context to use (default: current context)
	#[arg(long, global = true, env = "SHARDLISTER_CONTEXT")]
	pub context: Option<String>,

	/// Path to the Argo CD CLI config (default: ~/.argocd/config)
	#[arg(long, global = true, env = "SHARDLISTER_ARGOCD_CONFIG")]
	pub argocd_config: Option<PathBuf>,

	/// Argo CD CLI context to use (default: current context)
	#[arg(long, global = true, env = "SHARDLISTER_ARGOCD_CONTEXT")]
	pub argocd_context: Option<String>,

	/// Argo CD API server address, overriding the CLI config
	#[arg(long, global = true, env = "ARGOCD_SERVER")]
	pub server: Option<String>,

	/// Bearer token for the Argo CD API server
	#[arg(long, global = true, env = "ARGOCD_AUTH_TOKEN", hide_env_values = true)]
	pub auth_token: Option<String>,

	/// Talk to the API server over plain HTTP
	#[arg(long, global = true, env = "SHARDLISTER_PLAINTEXT")]
	pub plaintext: bool,

	/// Skip TLS certificate verification
	#[arg(long, global = true, env = "SHARDLISTER_INSECURE")]
	pub insecure: bool,

	/// Output format
	#[arg(short = 'o', long, global = true, env = "SHARDLISTER_OUTPUT", value_enum, default_value_t)]
	pub output: OutputFormat,

	/// Log level (overrides RUST_LOG): trace, debug, info, warn, error
	#[arg(long, global = true, env = "SHARDLISTER_LOG_LEVEL")]
	pub log_level: Option<tracing::Level>,
}

impl GlobalArgs {
	/// The shard count as a replica count, rejecting values below one.
	pub fn replicas(&self) -> Result<usize, ListerError> {
		usize::try_from(self.shards)
			.ok()
			.filter(|replicas| *replicas >= 1)
			.ok_or(ListerError::NoShards)
	}

	pub fn endpoint_overrides(&self) -> EndpointOverrides {
		EndpointOverrides {
			server: self.server.clone(),
			auth_token: self.auth_token.clone(),
			context: self.argocd_context.clone(),
			plaintext: self.plaintext,
			insecure: self.insecure,
		}
	}
}

/// Run the parsed command line on `runtime`.
pub fn run<W: Write>(cli: Cli, runtime: &Runtime, writer: W) -> Result<()> {
	if let Some(Commands::Completion(args)) = cli.command {
		return completion::run(args, writer);
	}

	if Commands::requires_shards(cli.command.as_ref()) {
		cli.global.replicas()?;
	}

	runtime.block_on(async {
		let lister = util::connect_lister(&cli.global).await?;
		execute(cli.command, &cli.global, &lister, writer).await
	})
}

/// Dispatch a listing command against an existing lister.
pub async fn execute<R, A, W>(
	command: Option<Commands>,
	global: &GlobalArgs,
	lister: &Lister<R, A>,
	writer: W,
) -> Result<()>
where
	R: ClusterRegistry,
	A: ControllerApi,
	W: Write,
{
	match command {
		None => clusters::run(global, lister, writer).await,
		Some(Commands::Shard(args)) => shard::run(args, global, lister, writer).await,
		Some(Commands::Apps(args)) => apps::run(args, global, lister, writer).await,
		Some(Commands::Cluster(args)) => cluster::run(args, global, lister, writer).await,
		Some(Commands::Completion(args)) => completion::run(args, writer),
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use clap::{error::ErrorKind, CommandFactory};

	use super::*;

	fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
		Cli::try_parse_from(std::iter::once("shardlister").chain(args.iter().copied()))
	}

	#[test]
	fn test_cli_is_well_formed() {
		Cli::command().debug_assert();
	}

	#[test]
	fn test_root_command_lists_all() {
		let cli = parse(&["--shards", "3"]).unwrap();
		assert!(cli.command.is_none());
		assert_eq!(cli.global.replicas().unwrap(), 3);
		assert_eq!(cli.global.namespace, "argocd");
		assert_eq!(cli.global.output, OutputFormat::Table);
	}

	#[test]
	fn test_global_flags_after_subcommand() {
		let cli = parse(&["shard", "1", "--shards", "2", "-n", "cd", "-o", "json"]).unwrap();
		assert_matches!(cli.command, Some(Commands::Shard(ref args)) if args.shard == Some(1));
		assert_eq!(cli.global.shards, 2);
		assert_eq!(cli.global.namespace, "cd");
		assert_eq!(cli.global.output, OutputFormat::Json);
	}

	#[test]
	fn test_shard_apps_subcommand() {
		let cli = parse(&["--shards", "2", "shard", "apps", "0", "--count"]).unwrap();
		assert_matches!(
			cli.command,
			Some(Commands::Shard(shard::ShardArgs {
				shard: None,
				command: Some(shard::ShardCommands::Apps(shard::ShardAppsArgs { shard: 0, count: true })),
			}))
		);
	}

	#[test]
	fn test_cluster_apps_subcommand() {
		let cli = parse(&["cluster", "apps", "https://prod.example", "--count"]).unwrap();
		assert_matches!(
			cli.command,
			Some(Commands::Cluster(cluster::ClusterArgs {
				command: cluster::ClusterCommands::Apps(ref args),
			})) if args.cluster == "https://prod.example" && args.count
		);
	}

	#[test]
	fn test_shard_must_be_a_number() {
		let err = parse(&["--shards", "2", "shard", "one"]).err().unwrap();
		assert_eq!(err.kind(), ErrorKind::ValueValidation);
	}

	#[test]
	fn test_shard_requires_an_index() {
		let err = parse(&["shard"]).err().unwrap();
		assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
	}

	#[test]
	fn test_replicas_below_one_are_rejected() {
		for shards in ["0", "-2"] {
			let cli = parse(&["--shards", shards]).unwrap();
			assert_matches!(cli.global.replicas(), Err(ListerError::NoShards));
		}
	}

	#[test]
	fn test_only_cluster_and_completion_skip_shard_validation() {
		let needs = |args: &[&str]| Commands::requires_shards(parse(args).unwrap().command.as_ref());

		assert!(needs(&[]));
		assert!(needs(&["apps"]));
		assert!(needs(&["shard", "0"]));
		assert!(!needs(&["cluster", "apps", "prod"]));
		assert!(!needs(&["completion", "bash"]));
	}

	mod execute {
		use std::time::Duration;

		use indoc::indoc;

		use super::*;
		use crate::{
			argocd::{types::ClusterInfo, ApiCluster},
			k8s::registry::RegisteredCluster,
			test_utils::{app, FakeApi, FakeRegistry},
		};

		fn lister() -> Lister<FakeRegistry, FakeApi> {
			lister_with(|api| api)
		}

		fn lister_with(api: impl FnOnce(FakeApi) -> FakeApi) -> Lister<FakeRegistry, FakeApi> {
			let cluster = |name: &str, count| ApiCluster {
				name: name.to_string(),
				server: format!("https://{name}.example"),
				shard: None,
				info: ClusterInfo {
					applications_count: count,
				},
			};
			let registry = FakeRegistry::new(vec![
				RegisteredCluster {
					id: "uid-prod".to_string(),
					name: "prod".to_string(),
					server: "https://prod.example".to_string(),
					shard: None,
				},
				RegisteredCluster {
					id: "uid-us".to_string(),
					name: "us".to_string(),
					server: "https://us.example".to_string(),
					shard: None,
				},
			]);
			let api = api(FakeApi::new(
				vec![cluster("prod", 2), cluster("us", 1)],
				vec![
					app("billing", "prod", ""),
					app("search", "", "https://prod.example"),
					app("maps", "us", ""),
				],
			));
			Lister::new(registry, api, "argocd")
		}

		async fn output(args: &[&str]) -> Result<String> {
			let cli = parse(args)?;
			let mut out = Vec::new();
			execute(cli.command, &cli.global, &lister(), &mut out).await?;
			Ok(String::from_utf8(out)?)
		}

		#[tokio::test]
		async fn test_root_lists_clusters_in_shard_order() {
			assert_eq!(
				output(&["--shards", "2"]).await.unwrap(),
				indoc! {"
					SHARD  CLUSTER  CACHED APP COUNT
					0      us       1
					1      prod     2
				"}
			);
		}

		#[tokio::test]
		async fn test_apps_count_per_shard() {
			assert_eq!(
				output(&["--shards", "2", "apps", "--count"]).await.unwrap(),
				indoc! {"
					SHARD  APP COUNT
					0      1
					1      2
				"}
			);
		}

		#[tokio::test]
		async fn test_shard_apps() {
			assert_eq!(
				output(&["--shards", "2", "shard", "apps", "1"]).await.unwrap(),
				indoc! {"
					SHARD  APP NAME
					1      billing
					1      search
				"}
			);
		}

		#[tokio::test]
		async fn test_shard_out_of_range() {
			let err = output(&["--shards", "2", "shard", "2"]).await.unwrap_err();
			assert_matches!(
				err.downcast_ref::<ListerError>(),
				Some(ListerError::ShardOutOfRange { shard: 2, replicas: 2 })
			);
		}

		#[tokio::test]
		async fn test_cluster_apps_count() {
			assert_eq!(
				output(&["cluster", "apps", "prod", "--count"]).await.unwrap(),
				indoc! {"
					CLUSTER  APP COUNT
					prod     2
				"}
			);
		}

		#[tokio::test]
		async fn test_failed_shard_does_not_hide_the_others() {
			// a zero TTL makes every shard fetch on its own; the first fetch fails
			let lister = lister_with(|api| api.failing_application_call(1)).with_cache_ttl(Duration::ZERO);
			let cli = parse(&["--shards", "2", "apps"]).unwrap();
			let mut out = Vec::new();

			let err = execute(cli.command, &cli.global, &lister, &mut out).await.unwrap_err();

			assert_eq!(err.to_string(), "failed to list apps for 1 of 2 shards");
			assert_eq!(
				String::from_utf8(out).unwrap(),
				indoc! {"
					SHARD  APP NAME
					1      billing
					1      search
				"}
			);
		}

		#[tokio::test]
		async fn test_failed_shard_count_keeps_other_rows() {
			let lister = lister_with(|api| api.failing_application_call(2)).with_cache_ttl(Duration::ZERO);
			let cli = parse(&["--shards", "2", "apps", "--count"]).unwrap();
			let mut out = Vec::new();

			let err = execute(cli.command, &cli.global, &lister, &mut out).await.unwrap_err();

			assert_eq!(err.to_string(), "failed to list apps for 1 of 2 shards");
			assert_eq!(
				String::from_utf8(out).unwrap(),
				indoc! {"
					SHARD  APP COUNT
					0      1
				"}
			);
		}

		#[tokio::test]
		async fn test_unknown_cluster_fails() {
			let err = output(&["cluster", "apps", "nowhere"]).await.unwrap_err();
			assert_eq!(err.to_string(), "cluster nowhere not found");
		}
	}

	#[test]
	fn test_endpoint_overrides_from_flags() {
		let cli = parse(&[
			"--server",
			"localhost:8080",
			"--auth-token",
			"t0k3n",
			"--argocd-context",
			"local",
			"--plaintext",
		])
		.unwrap();
		let overrides = cli.global.endpoint_overrides();

		assert_eq!(overrides.server.as_deref(), Some("localhost:8080"));
		assert_eq!(overrides.auth_token.as_deref(), Some("t0k3n"));
		assert_eq!(overrides.context.as_deref(), Some("local"));
		assert!(overrides.plaintext);
		assert!(!overrides.insecure);
	}
}
