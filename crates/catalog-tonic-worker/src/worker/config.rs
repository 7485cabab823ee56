use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `catalog-tonic-worker` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "catalog-tonic-worker",
    version,
    about = "Periodically adds synthetic products to the catalog service"
)]
pub struct CliArgs {
    /// Catalog service endpoint.
    ///
    /// Environment variable: `SERVER_URL`
    #[arg(long, env = "SERVER_URL", default_value_t = String::from("http://127.0.0.1:50051"))]
    pub server_url: String,

    /// Milliseconds to wait between ticks.
    ///
    /// Environment variable: `TASK_INTERVAL_MS`
    #[arg(long, env = "TASK_INTERVAL_MS", default_value_t = 5000)]
    pub task_interval_ms: u64,

    /// Identifier used as the prefix of generated product names.
    ///
    /// Environment variable: `WORKER_ID`
    #[arg(long, env = "WORKER_ID", default_value_t = String::from("worker"))]
    pub worker_id: String,

    /// Stop cleanly after adding this many products. Runs until stopped when
    /// unset.
    ///
    /// Environment variable: `MAX_TICKS`
    #[arg(long, env = "MAX_TICKS")]
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub server_url: String,
    pub task_interval: Duration,
    pub worker_id: String,
    pub max_ticks: Option<u64>,
}

impl TryFrom<CliArgs> for WorkerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.task_interval_ms == 0 {
            bail!("TASK_INTERVAL_MS must be greater than 0");
        }

        if !(args.server_url.starts_with("http://") || args.server_url.starts_with("https://")) {
            bail!(
                "SERVER_URL ({}) must start with http:// or https://",
                args.server_url
            );
        }

        Ok(Self {
            server_url: args.server_url,
            task_interval: Duration::from_millis(args.task_interval_ms),
            worker_id: args.worker_id,
            max_ticks: args.max_ticks,
        })
    }
}
