//! HTTP-based mock Kubernetes server using wiremock.
//!
//! Serves namespaced core (`v1`) resources: single GETs by name and LISTs
//! filtered by equality label selectors. Enough for clients that read
//! secrets or config maps through a real kubeconfig connection.

use std::collections::BTreeMap;

use bon::Builder;
use kube::config::{
	AuthInfo, Cluster, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext,
};
use tracing::{debug, trace};
use wiremock::{
	matchers::{method, path, path_regex},
	Mock, MockServer, Request, ResponseTemplate,
};

/// Resources keyed by (collection path, name).
type Resources = BTreeMap<(String, String), serde_json::Value>;

/// A mock Kubernetes server exposed over HTTP.
#[derive(Builder)]
pub struct HttpMockK8sServer {
	/// Namespaced core resources to serve, as raw manifests.
	#[builder(default)]
	resources: Vec<serde_json::Value>,
	/// Reject every resource request with 403 Forbidden.
	#[builder(default)]
	forbidden: bool,
}

/// A running HTTP mock server instance.
pub struct RunningHttpMockK8sServer {
	server: MockServer,
}

impl HttpMockK8sServer {
	/// Start the mock server with all configured resources.
	pub async fn start(self) -> RunningHttpMockK8sServer {
		let server = MockServer::start().await;
		debug!(uri = %server.uri(), "Started mock K8s server");

		let resources: Resources = self
			.resources
			.into_iter()
			.filter_map(|manifest| {
				let key = collection_path(&manifest)?;
				trace!(path = %key.0, name = %key.1, "Registered resource");
				Some((key, manifest))
			})
			.collect();

		mount_version(&server).await;
		if self.forbidden {
			mount_forbidden(&server).await;
		} else {
			mount_resources(&server, resources).await;
		}

		RunningHttpMockK8sServer { server }
	}
}

impl RunningHttpMockK8sServer {
	/// Get the server's URI (e.g., "http://127.0.0.1:12345").
	pub fn uri(&self) -> String {
		self.server.uri()
	}

	/// Number of LIST requests received for the collection at `path`.
	pub async fn list_requests(&self, path: &str) -> usize {
		self.server
			.received_requests()
			.await
			.unwrap_or_default()
			.iter()
			.filter(|req| req.method.as_str() == "GET" && req.url.path() == path)
			.count()
	}

	/// Create a Kubeconfig pointing to this mock server.
	pub fn kubeconfig(&self) -> Kubeconfig {
		self.kubeconfig_with_context("mock-context")
	}

	/// Create a Kubeconfig pointing to this mock server with a custom context name.
	pub fn kubeconfig_with_context(&self, context_name: &str) -> Kubeconfig {
		let cluster_name = "mock-cluster";
		let user_name = "mock-user";

		Kubeconfig {
			clusters: vec![NamedCluster {
				name: cluster_name.to_string(),
				cluster: Some(Cluster {
					server: Some(self.uri()),
					insecure_skip_tls_verify: Some(true),
					..Default::default()
				}),
			}],
			contexts: vec![NamedContext {
				name: context_name.to_string(),
				context: Some(Context {
					cluster: cluster_name.to_string(),
					user: Some(user_name.to_string()),
					namespace: Some("default".to_string()),
					..Default::default()
				}),
			}],
			auth_infos: vec![NamedAuthInfo {
				name: user_name.to_string(),
				auth_info: Some(AuthInfo::default()),
			}],
			current_context: Some(context_name.to_string()),
			..Default::default()
		}
	}
}

/// Collection path and name of a namespaced core manifest.
///
/// `Secret` in `argocd` maps to `/api/v1/namespaces/argocd/secrets`.
fn collection_path(manifest: &serde_json::Value) -> Option<(String, String)> {
	if manifest.get("apiVersion")?.as_str()? != "v1" {
		return None;
	}
	let kind = manifest.get("kind")?.as_str()?;
	let metadata = manifest.get("metadata")?;
	let name = metadata.get("name")?.as_str()?;
	let namespace = metadata
		.get("namespace")
		.and_then(|n| n.as_str())
		.unwrap_or("default");

	let plural = format!("{}s", kind.to_lowercase());
	Some((
		format!("/api/v1/namespaces/{namespace}/{plural}"),
		name.to_string(),
	))
}

/// Whether `manifest` carries every `key=value` pair of an equality selector.
fn matches_selector(manifest: &serde_json::Value, selector: &str) -> bool {
	let labels = manifest.pointer("/metadata/labels");
	selector
		.split(',')
		.map(str::trim)
		.filter(|term| !term.is_empty())
		.all(|term| {
			let (key, value) = term.split_once("==").or_else(|| term.split_once('=')).unwrap_or((term, ""));
			labels
				.and_then(|l| l.get(key))
				.and_then(|v| v.as_str())
				.is_some_and(|actual| actual == value)
		})
}

async fn mount_version(server: &MockServer) {
	Mock::given(method("GET"))
		.and(path("/version"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"major": "1",
			"minor": "31",
			"gitVersion": "v1.31.0",
			"gitCommit": "fake",
			"gitTreeState": "clean",
			"buildDate": "2024-08-13T00:00:00Z",
			"goVersion": "go1.22.5",
			"compiler": "gc",
			"platform": "linux/amd64"
		})))
		.mount(server)
		.await;
}

async fn mount_forbidden(server: &MockServer) {
	Mock::given(method("GET"))
		.and(path_regex(r"^/api/v1/.*"))
		.respond_with(ResponseTemplate::new(403).set_body_json(status(
			403,
			"Forbidden",
			"secrets is forbidden: User \"mock-user\" cannot list resource \"secrets\"",
		)))
		.mount(server)
		.await;
}

async fn mount_resources(server: &MockServer, resources: Resources) {
	// GET handles both single resources and LISTs
	Mock::given(method("GET"))
		.and(path_regex(r"^/api/v1/namespaces/.*"))
		.respond_with(move |req: &Request| {
			let request_path = req.url.path().trim_end_matches('/');

			let selector = req
				.url
				.query_pairs()
				.find(|(key, _)| key == "labelSelector")
				.map(|(_, value)| value.into_owned())
				.unwrap_or_default();

			let items: Vec<_> = resources
				.iter()
				.filter(|((collection, _), _)| collection == request_path)
				.filter(|(_, manifest)| matches_selector(manifest, &selector))
				.map(|(_, manifest)| manifest.clone())
				.collect();

			// collections are /api/v1/namespaces/{namespace}/{plural}
			let is_list = request_path
				.trim_start_matches("/api/v1/namespaces/")
				.split('/')
				.count() == 2;
			if is_list {
				trace!(path = %request_path, count = items.len(), "Serving list");
				return ResponseTemplate::new(200).set_body_json(serde_json::json!({
					"kind": "List",
					"apiVersion": "v1",
					"metadata": {"resourceVersion": "1"},
					"items": items
				}));
			}

			let (collection, name) = request_path.rsplit_once('/').unwrap_or((request_path, ""));
			match resources.get(&(collection.to_string(), name.to_string())) {
				Some(resource) => ResponseTemplate::new(200).set_body_json(resource.clone()),
				None => ResponseTemplate::new(404).set_body_json(status(404, "NotFound", "not found")),
			}
		})
		.mount(server)
		.await;
}

fn status(code: u16, reason: &str, message: &str) -> serde_json::Value {
	serde_json::json!({
		"kind": "Status",
		"apiVersion": "v1",
		"metadata": {},
		"status": "Failure",
		"message": message,
		"reason": reason,
		"code": code
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cluster_secret;

	#[test]
	fn test_collection_path() {
		let secret = cluster_secret("argocd", "uid", "prod", "https://prod.example", None);
		assert_eq!(
			collection_path(&secret),
			Some((
				"/api/v1/namespaces/argocd/secrets".to_string(),
				"cluster-prod".to_string()
			))
		);
	}

	#[test]
	fn test_selector_matching() {
		let secret = cluster_secret("argocd", "uid", "prod", "https://prod.example", None);

		assert!(matches_selector(&secret, ""));
		assert!(matches_selector(&secret, "argocd.argoproj.io/secret-type=cluster"));
		assert!(matches_selector(&secret, "argocd.argoproj.io/secret-type==cluster"));
		assert!(!matches_selector(&secret, "argocd.argoproj.io/secret-type=repository"));
		assert!(!matches_selector(&secret, "team=payments"));
	}

	#[tokio::test]
	async fn test_list_filters_by_namespace_and_label() {
		use k8s_openapi::api::core::v1::Secret;
		use kube::{
			api::ListParams,
			config::{Config, KubeConfigOptions},
			Api, Client,
		};

		let mut repo = cluster_secret("argocd", "uid-repo", "repo", "https://git.example", None);
		repo["metadata"]["labels"]["argocd.argoproj.io/secret-type"] = "repository".into();

		let server = HttpMockK8sServer::builder()
			.resources(vec![
				cluster_secret("argocd", "uid-prod", "prod", "https://prod.example", None),
				cluster_secret("other", "uid-eu", "eu", "https://eu.example", None),
				repo,
			])
			.build()
			.start()
			.await;

		let config = Config::from_custom_kubeconfig(server.kubeconfig(), &KubeConfigOptions::default())
			.await
			.unwrap();
		let secrets: Api<Secret> = Api::namespaced(Client::try_from(config).unwrap(), "argocd");
		let list = secrets
			.list(&ListParams::default().labels("argocd.argoproj.io/secret-type=cluster"))
			.await
			.unwrap();

		assert_eq!(list.items.len(), 1);
		assert_eq!(list.items[0].metadata.uid.as_deref(), Some("uid-prod"));
		assert_eq!(server.list_requests("/api/v1/namespaces/argocd/secrets").await, 1);
	}

	#[tokio::test]
	async fn test_get_single_resource_and_missing() {
		let server = HttpMockK8sServer::builder()
			.resources(vec![cluster_secret("argocd", "uid-prod", "prod", "https://prod.example", None)])
			.build()
			.start()
			.await;

		let config = kube::Config::from_custom_kubeconfig(server.kubeconfig(), &Default::default())
			.await
			.unwrap();
		let secrets: kube::Api<k8s_openapi::api::core::v1::Secret> =
			kube::Api::namespaced(kube::Client::try_from(config).unwrap(), "argocd");

		let found = secrets.get("cluster-prod").await.unwrap();
		assert_eq!(found.metadata.uid.as_deref(), Some("uid-prod"));
		assert!(secrets.get_opt("cluster-missing").await.unwrap().is_none());
	}
}
