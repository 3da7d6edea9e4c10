mod app;
mod console;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "palaver", about = "Palaver — multi-platform chat orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config directory holding `palaver.toml` and `pipelines/`.
    #[arg(long, global = true, env = "PALAVER_CONFIG_DIR", default_value = ".")]
    config_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service with a console chat (default when no subcommand is
    /// provided).
    Run,
    /// List the persisted pipeline records.
    Pipelines,
}

fn init_tracing(level: &str, json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    match cli.command {
        None | Some(Commands::Run) => {
            let config = palaver_config::discover_and_load(&cli.config_dir);
            let records = palaver_config::load_pipeline_records(&cli.config_dir)?;
            app::App::build(config, records).await?.run().await
        },
        Some(Commands::Pipelines) => {
            let records = palaver_config::load_pipeline_records(&cli.config_dir)?;
            if records.is_empty() {
                println!("no pipeline records in {}", cli.config_dir.display());
                return Ok(());
            }
            for record in records {
                println!(
                    "{}  {}  [{}]",
                    record.id,
                    record.name,
                    record.stages.join(" -> ")
                );
            }
            Ok(())
        },
    }
}
