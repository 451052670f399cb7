//! REST client for the API server.

use std::{future::Future, time::Duration};

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::instrument;

use super::{
	config::Endpoint,
	types::{ApiCluster, Application, ApplicationList, ClusterList},
};

/// Default timeout for API server requests.
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
	#[error("failed to build HTTP client: {0}")]
	Client(#[source] reqwest::Error),

	#[error("request to {url} failed: {source}")]
	Request {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	#[error("{url} returned {status}: {message}")]
	Status {
		status: StatusCode,
		url: String,
		message: String,
	},

	#[error("failed to decode response from {url}: {source}")]
	Decode {
		url: String,
		#[source]
		source: reqwest::Error,
	},
}

/// Read-only listings served by the controller's API server.
pub trait ControllerApi: Send + Sync {
	fn list_clusters(&self) -> impl Future<Output = Result<Vec<ApiCluster>, ApiError>> + Send;

	fn list_applications(&self) -> impl Future<Output = Result<Vec<Application>, ApiError>> + Send;
}

pub struct ArgoCdClient {
	http: reqwest::Client,
	base_url: String,
	auth_token: Option<String>,
}

impl std::fmt::Debug for ArgoCdClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ArgoCdClient")
			.field("base_url", &self.base_url)
			.finish_non_exhaustive()
	}
}

impl ArgoCdClient {
	pub fn new(endpoint: &Endpoint) -> Result<Self, ApiError> {
		let http = reqwest::Client::builder()
			.timeout(DEFAULT_API_TIMEOUT)
			.danger_accept_invalid_certs(endpoint.insecure)
			.build()
			.map_err(ApiError::Client)?;

		Ok(Self {
			http,
			base_url: endpoint.base_url(),
			auth_token: endpoint.auth_token.clone(),
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
		let url = format!("{}{}", self.base_url, path);
		tracing::debug!(url = %url, "requesting API server");

		let mut request = self.http.get(&url);
		if let Some(token) = &self.auth_token {
			request = request.bearer_auth(token);
		}

		let response = request.send().await.map_err(|source| ApiError::Request {
			url: url.clone(),
			source,
		})?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(ApiError::Status {
				status,
				url,
				message: error_message(&body),
			});
		}

		response
			.json::<T>()
			.await
			.map_err(|source| ApiError::Decode { url, source })
	}
}

impl ControllerApi for ArgoCdClient {
	#[instrument(skip_all)]
	async fn list_clusters(&self) -> Result<Vec<ApiCluster>, ApiError> {
		let list: ClusterList = self.get("/api/v1/clusters").await?;
		tracing::debug!(count = list.items.len(), "listed clusters");
		Ok(list.items)
	}

	#[instrument(skip_all)]
	async fn list_applications(&self) -> Result<Vec<Application>, ApiError> {
		tracing::info!("getting apps from API");
		let list: ApplicationList = self.get("/api/v1/applications").await?;
		tracing::debug!(count = list.items.len(), "listed applications");
		Ok(list.items)
	}
}

#[derive(Deserialize)]
struct ErrorBody {
	#[serde(default)]
	message: String,
	#[serde(default)]
	error: String,
}

/// Human-readable message out of an error response body.
fn error_message(body: &str) -> String {
	match serde_json::from_str::<ErrorBody>(body) {
		Ok(ErrorBody { message, .. }) if !message.is_empty() => message,
		Ok(ErrorBody { error, .. }) if !error.is_empty() => error,
		_ => body.trim().to_string(),
	}
}
