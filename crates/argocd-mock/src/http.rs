//! HTTP-based mock API server using wiremock.

use bon::Builder;
use tracing::debug;
use wiremock::{
	matchers::{header, method, path},
	Mock, MockBuilder, MockServer, ResponseTemplate,
};

pub const CLUSTERS_PATH: &str = "/api/v1/clusters";
pub const APPLICATIONS_PATH: &str = "/api/v1/applications";

/// A mock API server exposed over HTTP.
#[derive(Builder)]
pub struct HttpMockArgoCdServer {
	/// Items of the cluster listing.
	#[builder(default)]
	clusters: Vec<serde_json::Value>,
	/// Items of the application listing.
	#[builder(default)]
	applications: Vec<serde_json::Value>,
	/// Require `Authorization: Bearer <token>`; other requests get 401.
	auth_token: Option<String>,
	/// Fail the application listing with this status code.
	applications_status: Option<u16>,
	/// Fail the cluster listing with this status code.
	clusters_status: Option<u16>,
}

/// A running mock API server.
pub struct RunningHttpMockArgoCdServer {
	server: MockServer,
}

impl HttpMockArgoCdServer {
	/// Start the mock server with the configured listings.
	pub async fn start(self) -> RunningHttpMockArgoCdServer {
		let server = MockServer::start().await;
		debug!(uri = %server.uri(), "Started mock API server");

		let listings = [
			(CLUSTERS_PATH, self.clusters, self.clusters_status),
			(APPLICATIONS_PATH, self.applications, self.applications_status),
		];

		for (list_path, items, status) in listings {
			let response = match status {
				Some(code) => ResponseTemplate::new(code).set_body_json(error_body(
					code,
					&format!("failed to list {}", list_path.rsplit('/').next().unwrap_or(list_path)),
				)),
				None => ResponseTemplate::new(200).set_body_json(serde_json::json!({
					"metadata": {"resourceVersion": "1"},
					"items": items,
				})),
			};

			authorized(Mock::given(method("GET")).and(path(list_path)), self.auth_token.as_deref())
				.respond_with(response)
				.mount(&server)
				.await;
		}

		if self.auth_token.is_some() {
			// lower priority than the authorized listings
			Mock::given(method("GET"))
				.respond_with(
					ResponseTemplate::new(401).set_body_json(error_body(16, "no session information")),
				)
				.with_priority(10)
				.mount(&server)
				.await;
		}

		RunningHttpMockArgoCdServer { server }
	}
}

fn authorized(mock: MockBuilder, token: Option<&str>) -> MockBuilder {
	match token {
		Some(token) => mock.and(header("authorization", format!("Bearer {token}").as_str())),
		None => mock,
	}
}

/// Error body in the API server's gateway format.
fn error_body(code: u16, message: &str) -> serde_json::Value {
	serde_json::json!({
		"error": message,
		"code": code,
		"message": message,
	})
}

impl RunningHttpMockArgoCdServer {
	/// Get the server's URI (e.g., "http://127.0.0.1:12345").
	pub fn uri(&self) -> String {
		self.server.uri()
	}

	/// `host:port` without a scheme, the way the CLI config stores servers.
	pub fn address(&self) -> String {
		self.server.address().to_string()
	}

	/// Number of requests received for `path`, authorized or not.
	pub async fn requests(&self, path: &str) -> usize {
		self.server
			.received_requests()
			.await
			.unwrap_or_default()
			.iter()
			.filter(|req| req.url.path() == path)
			.count()
	}
}
