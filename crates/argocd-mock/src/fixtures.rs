//! JSON bodies shaped like the API server's list items.

/// A cluster item with its cached application count.
pub fn cluster(name: &str, server: &str, applications_count: i64) -> serde_json::Value {
	serde_json::json!({
		"server": server,
		"name": name,
		"config": {"tlsClientConfig": {"insecure": false}},
		"connectionState": {"status": "Successful"},
		"info": {
			"serverVersion": "1.31",
			"applicationsCount": applications_count,
		},
	})
}

/// An application deployed to the given destination.
///
/// Empty `dest_name` or `dest_server` are left out of the destination.
pub fn application(name: &str, dest_name: &str, dest_server: &str) -> serde_json::Value {
	let mut destination = serde_json::Map::new();
	if !dest_name.is_empty() {
		destination.insert("name".into(), dest_name.into());
	}
	if !dest_server.is_empty() {
		destination.insert("server".into(), dest_server.into());
	}
	destination.insert("namespace".into(), name.into());

	serde_json::json!({
		"metadata": {"name": name, "namespace": "argocd"},
		"spec": {
			"project": "default",
			"source": {"repoURL": format!("https://git.example/{name}.git"), "path": "."},
			"destination": destination,
		},
		"status": {"sync": {"status": "Synced"}, "health": {"status": "Healthy"}},
	})
}
