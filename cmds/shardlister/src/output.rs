//! Table and JSON rendering of listing results.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;
use tabwriter::TabWriter;

use crate::{argocd::Application, model::Cluster};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Aligned columns
	#[default]
	Table,
	/// JSON array of rows
	Json,
}

/// A record printable as one table line.
pub trait Row: Serialize {
	const HEADERS: &'static [&'static str];

	fn cells(&self) -> Vec<String>;
}

/// Write `rows` in the requested format.
///
/// Tables always carry the header line, even without rows.
pub fn write_rows<W: Write, R: Row>(writer: W, format: OutputFormat, rows: &[R]) -> io::Result<()> {
	match format {
		OutputFormat::Table => write_table(writer, rows),
		OutputFormat::Json => write_json(writer, rows),
	}
}

fn write_table<W: Write, R: Row>(writer: W, rows: &[R]) -> io::Result<()> {
	let mut tw = TabWriter::new(writer).padding(2);

	writeln!(tw, "{}", R::HEADERS.join("\t"))?;
	for row in rows {
		writeln!(tw, "{}", row.cells().join("\t"))?;
	}

	tw.flush()
}

fn write_json<W: Write, R: Row>(mut writer: W, rows: &[R]) -> io::Result<()> {
	serde_json::to_writer_pretty(&mut writer, rows)?;
	writeln!(writer)?;
	writer.flush()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRow {
	pub shard: usize,
	pub cluster: String,
	pub server: String,
	pub cached_app_count: i64,
}

impl ClusterRow {
	pub fn new(shard: usize, cluster: &Cluster) -> Self {
		Self {
			shard,
			cluster: cluster.name.clone(),
			server: cluster.server.clone(),
			cached_app_count: cluster.applications_count,
		}
	}
}

impl Row for ClusterRow {
	const HEADERS: &'static [&'static str] = &["SHARD", "CLUSTER", "CACHED APP COUNT"];

	fn cells(&self) -> Vec<String> {
		vec![
			self.shard.to_string(),
			self.cluster.clone(),
			self.cached_app_count.to_string(),
		]
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardAppRow {
	pub shard: usize,
	pub app: String,
}

impl ShardAppRow {
	pub fn new(shard: usize, app: &Application) -> Self {
		Self {
			shard,
			app: app.name().to_string(),
		}
	}
}

impl Row for ShardAppRow {
	const HEADERS: &'static [&'static str] = &["SHARD", "APP NAME"];

	fn cells(&self) -> Vec<String> {
		vec![self.shard.to_string(), self.app.clone()]
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardAppCountRow {
	pub shard: usize,
	pub app_count: usize,
}

impl Row for ShardAppCountRow {
	const HEADERS: &'static [&'static str] = &["SHARD", "APP COUNT"];

	fn cells(&self) -> Vec<String> {
		vec![self.shard.to_string(), self.app_count.to_string()]
	}
}

/// An application with the destination it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAppRow {
	pub app: String,
	pub cluster_name: String,
	pub cluster_server: String,
}

impl From<&Application> for ClusterAppRow {
	fn from(app: &Application) -> Self {
		Self {
			app: app.name().to_string(),
			cluster_name: app.destination().name.clone(),
			cluster_server: app.destination().server.clone(),
		}
	}
}

impl Row for ClusterAppRow {
	const HEADERS: &'static [&'static str] = &["APP NAME", "CLUSTER NAME", "CLUSTER SERVER"];

	fn cells(&self) -> Vec<String> {
		vec![
			self.app.clone(),
			self.cluster_name.clone(),
			self.cluster_server.clone(),
		]
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAppCountRow {
	pub cluster: String,
	pub app_count: usize,
}

impl Row for ClusterAppCountRow {
	const HEADERS: &'static [&'static str] = &["CLUSTER", "APP COUNT"];

	fn cells(&self) -> Vec<String> {
		vec![self.cluster.clone(), self.app_count.to_string()]
	}
}
