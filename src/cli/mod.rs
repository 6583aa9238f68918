use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::api::{ClientConfig, ReportClient, ReportQuery, DEFAULT_BASE_URL};
use crate::application::{build_view, product_detail_at, Dashboard};
use crate::domain::Side;

pub mod render;
pub mod watch;

use render::{write_dashboard, write_product_detail, write_rankings_csv, write_status};

/// Reforma - tax reform impact dashboard
#[derive(Parser)]
#[command(name = "reforma")]
#[command(about = "Compare current and reform tax regimes using figures from the reporting API")]
#[command(version)]
pub struct Cli {
    /// Base URL of the reporting service
    #[arg(long, default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Dashboard URL whose query string seeds the filters
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Company identifier
    #[arg(long, global = true)]
    pub empresa: Option<String>,

    /// First period (YYYY-MM)
    #[arg(long, global = true)]
    pub periodo_inicial: Option<String>,

    /// Last period (YYYY-MM)
    #[arg(long, global = true)]
    pub periodo_final: Option<String>,

    /// IBS rate in percent (default 18.5)
    #[arg(long, global = true)]
    pub aliquota_ibs: Option<String>,

    /// CBS rate in percent (default 8.5)
    #[arg(long, global = true)]
    pub aliquota_cbs: Option<String>,

    /// IS rate in percent (default 0)
    #[arg(long, global = true)]
    pub aliquota_is: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    pub timeout: u64,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the report once and print the dashboard
    Show {
        /// Output format: table, json, csv (csv lists the product rankings)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Fetch the report once and print the detail of a ranked product
    Product {
        /// Side: compras or vendas
        side: String,

        /// Position in the top-10 ranking (1-based)
        rank: usize,

        /// Output format: table, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Keep the dashboard open, redrawing on every update
    Watch {
        /// Start with auto-refresh (every 30 seconds) enabled
        #[arg(long)]
        auto_refresh: bool,
    },
}

impl Cli {
    /// Default log filter when RUST_LOG is not set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Filters from `--url`, then overridden by explicit flags.
    pub fn filters(&self) -> Result<ReportQuery> {
        let mut query = match &self.url {
            Some(url) => ReportQuery::from_dashboard_url(url)?,
            None => ReportQuery::default(),
        };
        let overrides = [
            ("empresa", &self.empresa),
            ("periodo_inicial", &self.periodo_inicial),
            ("periodo_final", &self.periodo_final),
            ("aliquota_ibs", &self.aliquota_ibs),
            ("aliquota_cbs", &self.aliquota_cbs),
            ("aliquota_is", &self.aliquota_is),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                query.set(field, value.clone());
            }
        }
        Ok(query)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }

    fn dashboard(&self) -> Result<Dashboard> {
        let client = ReportClient::new(&self.client_config())
            .with_context(|| format!("Invalid base URL '{}'", self.base_url))?;
        tracing::info!(endpoint = %client.endpoint(), "using report endpoint");
        Ok(Dashboard::new(Arc::new(client), self.filters()?))
    }

    pub async fn run(self) -> Result<()> {
        let mut dashboard = self.dashboard()?;

        match self.command {
            Commands::Show { format, output } => {
                fetch_once(&mut dashboard).await?;
                run_show_command(&dashboard, &format, output.as_deref())?;
            }

            Commands::Product { side, rank, format } => {
                let side = Side::from_str(&side).ok_or_else(|| {
                    anyhow!("Invalid side '{}'. Valid sides: compras, vendas", side)
                })?;
                fetch_once(&mut dashboard).await?;
                run_product_command(&dashboard, side, rank, &format)?;
            }

            Commands::Watch { auto_refresh } => {
                watch::run_watch(dashboard, auto_refresh).await?;
            }
        }

        Ok(())
    }
}

/// Mount, wait for the initial fetch and surface its error, if any.
async fn fetch_once(dashboard: &mut Dashboard) -> Result<()> {
    dashboard.mount();
    dashboard.settle().await;
    if let Some(error) = dashboard.state().error() {
        return Err(anyhow::Error::new(error.clone()));
    }
    Ok(())
}

fn run_show_command(dashboard: &Dashboard, format: &str, output: Option<&str>) -> Result<()> {
    let Some(report) = dashboard.report() else {
        println!("Nenhum dado disponível.");
        return Ok(());
    };
    let view = build_view(report);
    let mut writer = output_writer(output)?;

    match format {
        "json" => {
            serde_json::to_writer_pretty(&mut writer, &view)?;
            writeln!(writer)?;
        }
        "csv" => {
            let rows = write_rankings_csv(&mut writer, &view)?;
            if output.is_some() {
                eprintln!("Exported {} products", rows);
            }
        }
        "table" => {
            write_status(&mut writer, dashboard.state(), dashboard.filters())?;
            writeln!(writer)?;
            write_dashboard(&mut writer, &view)?;
        }
        other => bail!("Invalid format '{}'. Valid: table, json, csv", other),
    }

    writer.flush()?;
    Ok(())
}

fn run_product_command(dashboard: &Dashboard, side: Side, rank: usize, format: &str) -> Result<()> {
    let detail = dashboard
        .report()
        .and_then(|report| product_detail_at(report, side, rank))
        .ok_or_else(|| anyhow!("No product at position {} of {}", rank, side))?;

    let mut out = io::stdout().lock();
    match format {
        "json" => {
            serde_json::to_writer_pretty(&mut out, &detail)?;
            writeln!(out)?;
        }
        "table" => write_product_detail(&mut out, &detail)?,
        other => bail!("Invalid format '{}'. Valid: table, json", other),
    }
    Ok(())
}

fn output_writer(output: Option<&str>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create output file '{}'", path))?,
        ),
        None => Box::new(io::stdout()),
    })
}
