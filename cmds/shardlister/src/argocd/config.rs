//! API server endpoint resolution.
//!
//! The endpoint comes from the local CLI config file (`~/.argocd/config`),
//! written by the controller's own CLI on login. Command-line flags override
//! whatever the config file says; with `--server` set the file is optional.

use std::{
	fs,
	path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read {}: {source}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse {}: {source}", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("no API server configured: log in with the controller CLI or pass --server")]
	NoServer,

	#[error("context `{0}` not found in the CLI config")]
	ContextNotFound(String),
}

/// The local CLI config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArgoCdConfig {
	#[serde(default)]
	pub contexts: Vec<ContextRef>,
	#[serde(default)]
	pub current_context: String,
	#[serde(default)]
	pub servers: Vec<ServerEntry>,
	#[serde(default)]
	pub users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextRef {
	pub name: String,
	pub server: String,
	#[serde(default)]
	pub user: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerEntry {
	pub server: String,
	#[serde(default)]
	pub insecure: bool,
	#[serde(default)]
	pub plain_text: bool,
	#[serde(default)]
	pub grpc_web_root_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserEntry {
	pub name: String,
	#[serde(default)]
	pub auth_token: Option<String>,
}

impl ArgoCdConfig {
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}

	/// Load the config if the file exists.
	pub fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
		if path.exists() {
			Self::load(path).map(Some)
		} else {
			Ok(None)
		}
	}

	fn context(&self, name: &str) -> Option<&ContextRef> {
		self.contexts.iter().find(|c| c.name == name)
	}

	fn server(&self, server: &str) -> Option<&ServerEntry> {
		self.servers.iter().find(|s| s.server == server)
	}

	fn token_for_user(&self, user: &str) -> Option<String> {
		self.users
			.iter()
			.find(|u| u.name == user)
			.and_then(|u| u.auth_token.clone())
	}

	/// Token of the first context pointing at `server`.
	fn token_for_server(&self, server: &str) -> Option<String> {
		self.contexts
			.iter()
			.filter(|c| c.server == server)
			.find_map(|c| self.token_for_user(&c.user))
	}
}

/// Settings taken from the command line; they take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct EndpointOverrides {
	pub server: Option<String>,
	pub auth_token: Option<String>,
	pub context: Option<String>,
	pub plaintext: bool,
	pub insecure: bool,
}

/// A resolved API server endpoint.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
	/// `host[:port]`, or a full URL including the scheme.
	pub server: String,
	pub root_path: String,
	pub plaintext: bool,
	pub insecure: bool,
	pub auth_token: Option<String>,
}

impl std::fmt::Debug for Endpoint {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Endpoint")
			.field("server", &self.server)
			.field("root_path", &self.root_path)
			.field("plaintext", &self.plaintext)
			.field("insecure", &self.insecure)
			.field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

impl Endpoint {
	/// Resolve the endpoint from the optional config file and command-line overrides.
	pub fn resolve(
		config: Option<&ArgoCdConfig>,
		overrides: &EndpointOverrides,
	) -> Result<Self, ConfigError> {
		let (server, user) = match (&overrides.server, config) {
			(Some(server), _) => (server.clone(), None),
			(None, Some(config)) => {
				let context_name = overrides
					.context
					.clone()
					.unwrap_or_else(|| config.current_context.clone());
				if context_name.is_empty() {
					return Err(ConfigError::NoServer);
				}
				let context = config
					.context(&context_name)
					.ok_or_else(|| ConfigError::ContextNotFound(context_name.clone()))?;
				(context.server.clone(), Some(context.user.clone()))
			}
			(None, None) => return Err(ConfigError::NoServer),
		};

		let entry = config.and_then(|c| c.server(&server));
		let stored_token = config.and_then(|c| match &user {
			Some(user) => c.token_for_user(user),
			None => c.token_for_server(&server),
		});

		Ok(Self {
			root_path: entry.map(|e| e.grpc_web_root_path.clone()).unwrap_or_default(),
			plaintext: overrides.plaintext || entry.is_some_and(|e| e.plain_text),
			insecure: overrides.insecure || entry.is_some_and(|e| e.insecure),
			auth_token: overrides.auth_token.clone().or(stored_token),
			server,
		})
	}

	/// Base URL for REST requests, without a trailing slash.
	pub fn base_url(&self) -> String {
		let server = self.server.trim_end_matches('/');
		let root = self.root_path.trim_matches('/');

		let mut url = if server.starts_with("http://") || server.starts_with("https://") {
			server.to_string()
		} else if self.plaintext {
			format!("http://{server}")
		} else {
			format!("https://{server}")
		};

		if !root.is_empty() {
			url.push('/');
			url.push_str(root);
		}
		url
	}
}

/// Default location of the CLI config file.
pub fn default_config_path() -> Option<PathBuf> {
	dirs::home_dir().map(|home| home.join(".argocd").join("config"))
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;

	use super::*;

	const CONFIG: &str = indoc! {"
		contexts:
		- name: prod
		  server: cd.example.com
		  user: prod
		- name: local
		  server: localhost:8080
		  user: local
		current-context: prod
		servers:
		- grpc-web-root-path: /argo-cd
		  server: cd.example.com
		- plain-text: true
		  insecure: true
		  server: localhost:8080
		users:
		- auth-token: prod-token
		  name: prod
		  refresh-token: ignored
		- auth-token: local-token
		  name: local
	"};

	fn config() -> ArgoCdConfig {
		serde_yaml::from_str(CONFIG).unwrap()
	}

	#[test]
	fn test_resolve_current_context() {
		let endpoint = Endpoint::resolve(Some(&config()), &EndpointOverrides::default()).unwrap();

		assert_eq!(endpoint.server, "cd.example.com");
		assert_eq!(endpoint.auth_token.as_deref(), Some("prod-token"));
		assert!(!endpoint.plaintext);
		assert_eq!(endpoint.base_url(), "https://cd.example.com/argo-cd");
	}

	#[test]
	fn test_resolve_named_context() {
		let overrides = EndpointOverrides {
			context: Some("local".to_string()),
			..Default::default()
		};
		let endpoint = Endpoint::resolve(Some(&config()), &overrides).unwrap();

		assert!(endpoint.plaintext);
		assert!(endpoint.insecure);
		assert_eq!(endpoint.auth_token.as_deref(), Some("local-token"));
		assert_eq!(endpoint.base_url(), "http://localhost:8080");
	}

	#[test]
	fn test_server_override_reuses_stored_token() {
		let overrides = EndpointOverrides {
			server: Some("localhost:8080".to_string()),
			..Default::default()
		};
		let endpoint = Endpoint::resolve(Some(&config()), &overrides).unwrap();

		assert_eq!(endpoint.auth_token.as_deref(), Some("local-token"));
		assert!(endpoint.plaintext);
	}

	#[test]
	fn test_flags_win_over_config() {
		let overrides = EndpointOverrides {
			auth_token: Some("flag-token".to_string()),
			plaintext: true,
			..Default::default()
		};
		let endpoint = Endpoint::resolve(Some(&config()), &overrides).unwrap();

		assert_eq!(endpoint.auth_token.as_deref(), Some("flag-token"));
		assert_eq!(endpoint.base_url(), "http://cd.example.com/argo-cd");
	}

	#[test]
	fn test_server_without_config() {
		let overrides = EndpointOverrides {
			server: Some("http://127.0.0.1:9000/".to_string()),
			..Default::default()
		};
		let endpoint = Endpoint::resolve(None, &overrides).unwrap();

		assert_eq!(endpoint.auth_token, None);
		assert_eq!(endpoint.base_url(), "http://127.0.0.1:9000");
	}

	#[test]
	fn test_missing_server_errors() {
		assert_matches!(
			Endpoint::resolve(None, &EndpointOverrides::default()),
			Err(ConfigError::NoServer)
		);
		assert_matches!(
			Endpoint::resolve(Some(&ArgoCdConfig::default()), &EndpointOverrides::default()),
			Err(ConfigError::NoServer)
		);
	}

	#[test]
	fn test_unknown_context_errors() {
		let overrides = EndpointOverrides {
			context: Some("staging".to_string()),
			..Default::default()
		};
		assert_matches!(
			Endpoint::resolve(Some(&config()), &overrides),
			Err(ConfigError::ContextNotFound(name)) if name == "staging"
		);
	}

	#[test]
	fn test_load_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config");
		std::fs::write(&path, CONFIG).unwrap();

		let loaded = ArgoCdConfig::load(&path).unwrap();
		assert_eq!(loaded.current_context, "prod");
		assert_eq!(loaded.servers.len(), 2);

		assert_matches!(ArgoCdConfig::load_optional(&dir.path().join("missing")), Ok(None));
	}

	#[test]
	fn test_load_malformed_file_errors() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config");
		std::fs::write(&path, "contexts: [oops").unwrap();

		assert_matches!(ArgoCdConfig::load(&path), Err(ConfigError::Parse { .. }));
	}

	#[test]
	fn test_debug_redacts_token() {
		let endpoint = Endpoint {
			server: "cd.example.com".to_string(),
			auth_token: Some("secret".to_string()),
			..Default::default()
		};
		assert!(!format!("{endpoint:?}").contains("secret"));
	}
}
