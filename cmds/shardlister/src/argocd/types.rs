//! Wire types of the API server's REST listings.
//!
//! Only the fields the lister reads are modelled; everything else in the
//! responses is ignored.

use serde::{de, Deserialize, Deserializer, Serialize};

/// Response of `GET /api/v1/clusters`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterList {
	#[serde(default, deserialize_with = "null_as_default")]
	pub items: Vec<ApiCluster>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCluster {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub server: String,
	#[serde(default, deserialize_with = "optional_int_or_string")]
	pub shard: Option<i64>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub info: ClusterInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
	#[serde(default, deserialize_with = "int_or_string")]
	pub applications_count: i64,
}

/// Response of `GET /api/v1/applications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationList {
	#[serde(default, deserialize_with = "null_as_default")]
	pub items: Vec<Application>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
	pub metadata: ApplicationMetadata,
	#[serde(default)]
	pub spec: ApplicationSpec,
}

impl Application {
	pub fn name(&self) -> &str {
		&self.metadata.name
	}

	pub fn destination(&self) -> &Destination {
		&self.spec.destination
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationMetadata {
	pub name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub namespace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSpec {
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub project: String,
	#[serde(default)]
	pub destination: Destination,
}

/// Where an application is deployed. Either `name` or `server` identifies the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
	#[serde(default)]
	pub server: String,
	#[serde(default)]
	pub name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub namespace: String,
}

impl Destination {
	/// Whether this destination points at the cluster with the given name or server.
	///
	/// Empty destination fields never match.
	pub fn targets(&self, cluster_name: &str, cluster_server: &str) -> bool {
		(!self.name.is_empty() && self.name == cluster_name)
			|| (!self.server.is_empty() && self.server == cluster_server)
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
	Int(i64),
	String(String),
}

impl IntOrString {
	fn into_i64<E: de::Error>(self) -> Result<i64, E> {
		match self {
			Self::Int(v) => Ok(v),
			Self::String(s) => s
				.parse()
				.map_err(|_| E::custom(format!("expected an integer, got `{s}`"))),
		}
	}
}

// int64 fields may be rendered either as numbers or as decimal strings
fn int_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
	Option::<IntOrString>::deserialize(deserializer)?.map_or(Ok(0), IntOrString::into_i64)
}

fn optional_int_or_string<'de, D: Deserializer<'de>>(
	deserializer: D,
) -> Result<Option<i64>, D::Error> {
	Option::<IntOrString>::deserialize(deserializer)?
		.map(IntOrString::into_i64)
		.transpose()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
