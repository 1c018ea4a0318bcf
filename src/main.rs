//! service-dashboards command line.
//!
//! ```text
//! config.toml ──▶ AppConfig ──┬──▶ logging / metrics exporter
//!                             │
//! service.json ──▶ ServiceInput ──▶ discovery ──▶ pipeline ──▶ dashboard.json
//!                                                         └──▶ dashboard API (--push)
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use service_dashboards::config::{self, AppConfig, DependencyDetail};
use service_dashboards::dashboard::{BatchRunner, BuildOutput};
use service_dashboards::discovery::DiscoveryClient;
use service_dashboards::observability::{logging, metrics};
use service_dashboards::output::{self, DashboardEnvelope, GrafanaClient};
use service_dashboards::templates::TemplateKind;
use service_dashboards::{ServiceInput, TemplateRegistry};

#[derive(Parser)]
#[command(name = "service-dashboards")]
#[command(about = "Generate monitoring dashboards backed by live metrics", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (overrides the config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one dashboard from a service description
    Build {
        /// Service description (JSON: {service, resources})
        #[arg(short, long)]
        input: PathBuf,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip metric discovery and use naming conventions only
        #[arg(long)]
        no_discovery: bool,
        /// Push the result to the dashboard API
        #[arg(long)]
        push: bool,
        /// Dependency row detail
        #[arg(long, value_enum)]
        detail: Option<Detail>,
    },
    /// Show the metrics discovered for a service
    Discover {
        #[arg(short, long)]
        service: String,
    },
    /// Build dashboards for many services concurrently
    Batch {
        /// JSON array of service descriptions
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = "dashboards")]
        output_dir: PathBuf,
        #[arg(long)]
        no_discovery: bool,
        #[arg(long)]
        push: bool,
    },
    /// List the built-in templates
    Templates,
}

#[derive(Clone, Copy, ValueEnum)]
enum Detail {
    Overview,
    Full,
}

impl From<Detail> for DependencyDetail {
    fn from(detail: Detail) -> Self {
        match detail {
            Detail::Overview => DependencyDetail::Overview,
            Detail::Full => DependencyDetail::Full,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = config::load_or_default(cli.config.as_deref())?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init(&level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-dashboards starting");

    if let Some(address) = &config.observability.metrics_address {
        match address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(metrics_address = %address, error = %e, "Failed to parse metrics address"),
        }
    }

    match cli.command {
        Commands::Build {
            input,
            output,
            no_discovery,
            push,
            detail,
        } => {
            if let Some(detail) = detail {
                config.dashboard.dependency_detail = detail.into();
            }
            let input: ServiceInput = read_json(&input)?;
            let runner = runner(&config, no_discovery)?;
            let built = runner.build(&input).await?;
            report(&input.service.name, &built);
            match output {
                Some(path) => output::write_json(&path, &built.json)?,
                None => println!("{}", serde_json::to_string_pretty(&built.json)?),
            }
            if push {
                push_dashboard(&config, &input.service.name, built).await?;
            }
        }
        Commands::Discover { service } => {
            let client = DiscoveryClient::new(config.discovery.clone())?;
            let result = client.try_discover(&service).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Batch {
            input,
            output_dir,
            no_discovery,
            push,
        } => {
            let inputs: Vec<ServiceInput> = read_json(&input)?;
            let names: Vec<String> = inputs.iter().map(|i| i.service.name.clone()).collect();
            let runner = runner(&config, no_discovery)?;
            let results = runner.run(inputs).await;

            let mut failed = 0;
            for (name, result) in names.iter().zip(results) {
                match result {
                    Ok(built) => {
                        report(name, &built);
                        output::write_json(&output_dir.join(output::file_name(name)), &built.json)?;
                        if push {
                            if let Err(e) = push_dashboard(&config, name, built).await {
                                tracing::error!(service = %name, error = %e, "Push failed");
                                failed += 1;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(service = %name, error = %e, "Build failed");
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                return Err(format!("{} of {} services failed", failed, names.len()).into());
            }
        }
        Commands::Templates => {
            let registry = TemplateRegistry::global();
            println!("service types: {}", registry.names(TemplateKind::ServiceType).join(", "));
            println!("technologies:  {}", registry.names(TemplateKind::Technology).join(", "));
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let value = serde_json::from_str(&text)
        .map_err(|e| format!("failed to parse {}: {}", path.display(), e))?;
    Ok(value)
}

fn runner(config: &AppConfig, no_discovery: bool) -> Result<BatchRunner, Box<dyn Error>> {
    let client = if no_discovery || !config.discovery.enabled {
        tracing::info!("Discovery disabled");
        None
    } else {
        Some(DiscoveryClient::new(config.discovery.clone())?)
    };
    Ok(BatchRunner::new(config.dashboard.clone(), &config.batch, client))
}

fn report(service: &str, built: &BuildOutput) {
    for warning in &built.warnings {
        tracing::warn!(service = %service, kind = %warning.kind, "{}", warning.message);
    }
}

async fn push_dashboard(config: &AppConfig, service: &str, built: BuildOutput) -> Result<(), Box<dyn Error>> {
    let client = GrafanaClient::new(&config.grafana)?;
    let envelope = DashboardEnvelope::new(
        built.json,
        &config.grafana,
        format!("Generated for {}", service),
    );
    client.push(&envelope).await?;
    Ok(())
}
