//! Common test utilities.

use std::{
	io::{self, ErrorKind, Write},
	sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
	argocd::{
		types::{ApplicationMetadata, ApplicationSpec},
		ApiCluster, ApiError, Application, ControllerApi, Destination,
	},
	k8s::registry::{ClusterRegistry, RegisteredCluster, RegistryError},
};

/// A writer that simulates a broken pipe (SIGPIPE scenario).
pub struct BrokenPipeWriter;

impl Write for BrokenPipeWriter {
	fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
		Err(io::Error::new(ErrorKind::BrokenPipe, "broken pipe"))
	}

	fn flush(&mut self) -> io::Result<()> {
		Err(io::Error::new(ErrorKind::BrokenPipe, "broken pipe"))
	}
}

/// Application deployed to the given destination name and server.
pub fn app(name: &str, dest_name: &str, dest_server: &str) -> Application {
	Application {
		metadata: ApplicationMetadata {
			name: name.to_string(),
			namespace: "argocd".to_string(),
		},
		spec: ApplicationSpec {
			project: "default".to_string(),
			destination: Destination {
				server: dest_server.to_string(),
				name: dest_name.to_string(),
				namespace: String::new(),
			},
		},
	}
}

/// In-memory registry counting how often it is listed.
#[derive(Default)]
pub struct FakeRegistry {
	clusters: Vec<RegisteredCluster>,
	fail: bool,
	calls: AtomicUsize,
}

impl FakeRegistry {
	pub fn new(clusters: Vec<RegisteredCluster>) -> Self {
		Self {
			clusters,
			..Default::default()
		}
	}

	/// Registry whose every listing fails.
	pub fn failing() -> Self {
		Self {
			fail: true,
			..Default::default()
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl ClusterRegistry for FakeRegistry {
	async fn list_clusters(&self, _namespace: &str) -> Result<Vec<RegisteredCluster>, RegistryError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if self.fail {
			return Err(RegistryError::MissingField {
				secret: "broken".to_string(),
				key: "server",
			});
		}
		Ok(self.clusters.clone())
	}
}

/// In-memory API server counting requests per listing.
#[derive(Default)]
pub struct FakeApi {
	clusters: Vec<ApiCluster>,
	applications: Vec<Application>,
	cluster_calls: AtomicUsize,
	application_calls: AtomicUsize,
	/// 1-based application listing that answers 503.
	failing_application_call: Option<usize>,
}

impl FakeApi {
	pub fn new(clusters: Vec<ApiCluster>, applications: Vec<Application>) -> Self {
		Self {
			clusters,
			applications,
			..Default::default()
		}
	}

	/// Make the `call`-th application listing fail, counting from 1.
	pub fn failing_application_call(mut self, call: usize) -> Self {
		self.failing_application_call = Some(call);
		self
	}

	pub fn cluster_calls(&self) -> usize {
		self.cluster_calls.load(Ordering::SeqCst)
	}

	pub fn application_calls(&self) -> usize {
		self.application_calls.load(Ordering::SeqCst)
	}
}

impl ControllerApi for FakeApi {
	async fn list_clusters(&self) -> Result<Vec<ApiCluster>, ApiError> {
		self.cluster_calls.fetch_add(1, Ordering::SeqCst);
		Ok(self.clusters.clone())
	}

	async fn list_applications(&self) -> Result<Vec<Application>, ApiError> {
		let call = self.application_calls.fetch_add(1, Ordering::SeqCst) + 1;
		if self.failing_application_call == Some(call) {
			return Err(ApiError::Status {
				status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
				url: "/api/v1/applications".to_string(),
				message: "failed to list applications".to_string(),
			});
		}
		Ok(self.applications.clone())
	}
}
