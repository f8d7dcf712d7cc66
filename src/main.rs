//! Command line entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dssat_weather::{
    parse_calendar_date, DssatWeather, ExistingArtifacts, ExtractionStrategy, RunConfig, RunReport,
    CHIRPS_BASE_URL, POWER_BASE_URL,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "dssat-weather")]
#[command(about = "Build DSSAT weather files from NASA POWER and CHIRPS")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Concurrent NASA POWER requests
    #[arg(long, global = true, default_value = "5")]
    workers: usize,

    /// Timeout of one NASA POWER request, in seconds
    #[arg(long, global = true, default_value = "80")]
    timeout: u64,

    #[arg(long, global = true, env = "DSSAT_POWER_URL", default_value = POWER_BASE_URL)]
    power_url: String,

    #[arg(long, global = true, env = "DSSAT_CHIRPS_URL", default_value = CHIRPS_BASE_URL)]
    chirps_url: String,

    /// How rasters are sampled
    #[arg(long, global = true, value_enum, default_value = "auto")]
    raster_strategy: Strategy,

    /// Keep NASA POWER files from an earlier run over the same period
    #[arg(long, global = true)]
    skip_existing: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build WTH files for a period
    Get {
        /// CSV with ID, Latitude, Longitude, nasapid, LatNP, LonNP
        points_csv: PathBuf,
        /// First day, YYYYMMDD
        start: String,
        /// Last day, YYYYMMDD
        end: String,
        out_dir: PathBuf,
    },
    /// Extend existing WTH files up to the latest usable day
    Update {
        points_csv: PathBuf,
        /// Directory holding the WTH files to extend
        in_dir: PathBuf,
        out_dir: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Strategy {
    Auto,
    PerLocation,
    WholeGrid,
}

impl From<Strategy> for ExtractionStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Auto => ExtractionStrategy::Auto,
            Strategy::PerLocation => ExtractionStrategy::PerLocation,
            Strategy::WholeGrid => ExtractionStrategy::WholeGrid,
        }
    }
}

impl Args {
    fn config(&self) -> RunConfig {
        RunConfig::builder()
            .workers(self.workers)
            .request_timeout(Duration::from_secs(self.timeout))
            .power_base_url(self.power_url.clone())
            .chirps_base_url(self.chirps_url.clone())
            .raster_strategy(self.raster_strategy.into())
            .existing_artifacts(if self.skip_existing {
                ExistingArtifacts::SkipExisting
            } else {
                ExistingArtifacts::Overwrite
            })
            .build()
    }
}

async fn run(args: Args) -> Result<RunReport> {
    let app = DssatWeather::new(args.config());
    match args.command {
        Command::Get {
            points_csv,
            start,
            end,
            out_dir,
        } => {
            let start = parse_calendar_date(&start).context("invalid start date")?;
            let end = parse_calendar_date(&end).context("invalid end date")?;
            let report = app
                .get()
                .points_csv(&points_csv)
                .start(start)
                .end(end)
                .out_dir(&out_dir)
                .call()
                .await?;
            Ok(report)
        }
        Command::Update {
            points_csv,
            in_dir,
            out_dir,
        } => {
            let report = app
                .update()
                .points_csv(&points_csv)
                .historical_dir(&in_dir)
                .out_dir(&out_dir)
                .call()
                .await?;
            Ok(report)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    tokio::select! {
        result = run(args) => match result {
            Ok(report) => {
                println!("{}", report);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            ExitCode::from(130)
        }
    }
}
