use anyhow::Result;
use clap::Parser;
use shardlister::{
	commands::{
		self,
		util::{create_tokio_runtime, BrokenPipeGuard},
		Cli,
	},
	telemetry,
};

#[cfg(all(
	target_os = "linux",
	feature = "mimalloc",
	not(feature = "system-alloc")
))]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

fn main() -> Result<()> {
	let cli = Cli::parse();

	let runtime = create_tokio_runtime()?;
	let _enter = runtime.enter();
	let _telemetry = telemetry::init(cli.global.log_level)?;

	let stdout = BrokenPipeGuard::new(std::io::stdout());
	commands::run(cli, &runtime, stdout)
}
