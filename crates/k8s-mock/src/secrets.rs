//! Manifests for cluster secrets.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Label marking a secret as a cluster declaration.
pub const SECRET_TYPE_LABEL: &str = "argocd.argoproj.io/secret-type";

/// A cluster secret in `namespace`, with the given UID and data fields.
///
/// `shard` is stored verbatim so malformed values can be served too.
pub fn cluster_secret(
	namespace: &str,
	uid: &str,
	cluster_name: &str,
	server: &str,
	shard: Option<&str>,
) -> serde_json::Value {
	let mut data = serde_json::Map::new();
	data.insert("name".into(), STANDARD.encode(cluster_name).into());
	data.insert("server".into(), STANDARD.encode(server).into());
	data.insert("config".into(), STANDARD.encode(r#"{"tlsClientConfig":{"insecure":false}}"#).into());
	if let Some(shard) = shard {
		data.insert("shard".into(), STANDARD.encode(shard).into());
	}

	serde_json::json!({
		"apiVersion": "v1",
		"kind": "Secret",
		"type": "Opaque",
		"metadata": {
			"name": format!("cluster-{cluster_name}"),
			"namespace": namespace,
			"uid": uid,
			"labels": {SECRET_TYPE_LABEL: "cluster"},
		},
		"data": data,
	})
}
