use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ev_forecast::{
    config::AppConfig,
    io,
    models::{ReferenceTables, RegionForecast},
    visualization::{
        print_adoption_chart, print_forecast, print_model_issues, print_projection_table,
        print_region_list,
    },
    Forecaster,
};

#[derive(Parser)]
#[command(
    name = "ev-forecast",
    about = "EV Forecast - County and statewide EV adoption and charging infrastructure projections",
    version,
    author
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Equation table (.xlsx or .csv), overrides the config file
    #[arg(long, global = true)]
    equations: Option<PathBuf>,

    /// Charging-site summary table (.xlsx or .csv), overrides the config file
    #[arg(long, global = true)]
    summary: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast one county for one year
    Forecast {
        /// County name, with or without the "County" suffix
        #[arg(short, long)]
        region: String,

        /// Forecast year (2024-2050)
        #[arg(short, long)]
        year: i32,
    },

    /// Forecast the whole state for one year
    Statewide {
        /// Forecast year (2024-2050)
        #[arg(short, long)]
        year: i32,
    },

    /// Project a county (or the state) over a range of years
    Project {
        /// County name; omit for a statewide projection
        #[arg(short, long)]
        region: Option<String>,

        /// First year of the projection
        #[arg(long, default_value = "2024")]
        from: i32,

        /// Last year of the projection
        #[arg(long, default_value = "2050")]
        to: i32,

        /// Write the projection to a file (.csv, .json, or .xlsx) instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the loaded counties and their known charging-site counts
    Regions,

    /// Evaluate every county's equations and report problems
    Check,

    /// Start the web UI server
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_tables(config: &AppConfig) -> Result<ReferenceTables> {
    Ok(ReferenceTables::load(
        &config.data.equations,
        &config.data.infrastructure_summary,
    )?)
}

/// Statewide forecasts need no equation table; the summary only supplies the
/// known statewide count, so a missing summary is not fatal here.
fn statewide_tables(config: &AppConfig) -> ReferenceTables {
    match io::load_infrastructure_summary(&config.data.infrastructure_summary) {
        Ok(summaries) => ReferenceTables::new(Vec::new(), summaries),
        Err(e) => {
            warn!(error = %e, "infrastructure summary unavailable, statewide count omitted");
            ReferenceTables::default()
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.equations {
        config.data.equations = path;
    }
    if let Some(path) = cli.summary {
        config.data.infrastructure_summary = path;
    }

    match cli.command {
        Commands::Forecast { region, year } => {
            let tables = load_tables(&config)?;
            let forecast = Forecaster::new(&tables).region_forecast(&region, year)?;
            print_forecast(&forecast);
        }

        Commands::Statewide { year } => {
            let tables = statewide_tables(&config);
            let result = Forecaster::new(&tables).forecast_statewide(year)?;
            print_forecast(&RegionForecast::statewide(result));
        }

        Commands::Project {
            region,
            from,
            to,
            output,
            pretty,
        } => {
            let forecasts = match &region {
                Some(region) => {
                    let tables = load_tables(&config)?;
                    Forecaster::new(&tables).project_region(region, from, to)?
                }
                None => {
                    let tables = statewide_tables(&config);
                    Forecaster::new(&tables).project_statewide(from, to)?
                }
            };

            match output {
                Some(path) => {
                    io::write_forecasts(&forecasts, &path, pretty)?;
                    println!(
                        "{} Wrote {} forecasts -> {}",
                        "Success:".green().bold(),
                        forecasts.len(),
                        path.display()
                    );
                }
                None => {
                    print_projection_table(&forecasts);
                    print_adoption_chart(&forecasts);
                }
            }
        }

        Commands::Regions => {
            let tables = load_tables(&config)?;
            println!(
                "  Loaded {} counties from {}",
                tables.num_regions(),
                config.data.equations.display()
            );
            print_region_list(&tables);
        }

        Commands::Check => {
            let tables = load_tables(&config)?;
            let issues = Forecaster::new(&tables).audit_models();
            print_model_issues(&issues);
            if !issues.is_empty() {
                anyhow::bail!("{} model issue(s) found", issues.len());
            }
        }

        #[cfg(feature = "web")]
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let state = ev_forecast::web::AppState::load(&config.data)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(ev_forecast::web::start_server(
                state,
                &config.server.host,
                config.server.port,
            ))?;
        }
    }

    Ok(())
}
