//! XPropagator CLI - drive the propagation core from a terminal.
//!
//! Wires configuration and logging, builds the service over the
//! in-process analytic engine, and exposes the three operations as
//! subcommands:
//!
//! ```text
//! xpropagator info
//! xpropagator prop  --line1 '1 25544U ...' --line2 '2 25544 ...' --ds50 27744.5
//! xpropagator ephem --line1 '1 25544U ...' --line2 '2 25544 ...' \
//!     --start 2025-12-18T00:00:00Z --end 2025-12-28T00:00:00Z --step PT8.5M
//! ```
//!
//! Settings load from the config file (`XPROP_CONFIG`, default
//! `config/xpropagator.ini`) with environment overrides.

mod error;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use xpropagator::api::{
    EphemRequest, EphemResponse, EphemSink, EphemTask, PropRequest, PropTask, Satellite,
    SinkSendError, TimeGrid, TimeStep,
};
use xpropagator::config::ConfigFile;
use xpropagator::engine::{AnalyticEngine, Frame, TimeKind};
use xpropagator::logging::init_logging;
use xpropagator::service::PropagationService;

use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "xpropagator", version, about = "Satellite orbit propagation service core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum FrameArg {
    /// True-equator mean-equinox ECI
    Eci,
    /// J2000 ECI
    J2k,
}

impl From<FrameArg> for Frame {
    fn from(arg: FrameArg) -> Self {
        match arg {
            FrameArg::Eci => Frame::Eci,
            FrameArg::J2k => Frame::J2k,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print service and engine identification
    Info,

    /// Propagate a satellite to a single point in time
    Prop {
        /// TLE line 1
        #[arg(long)]
        line1: String,
        /// TLE line 2
        #[arg(long)]
        line2: String,
        /// Time in DS50 (days since 1950-01-01 12:00 UTC)
        #[arg(long, conflicts_with_all = ["mse", "utc"])]
        ds50: Option<f64>,
        /// Time in minutes since element set epoch
        #[arg(long, conflicts_with = "utc")]
        mse: Option<f64>,
        /// Time as RFC 3339 UTC, e.g. 2025-12-18T00:00:00Z
        #[arg(long)]
        utc: Option<String>,
    },

    /// Generate a streaming ephemeris over a time grid
    Ephem {
        /// TLE line 1
        #[arg(long)]
        line1: String,
        /// TLE line 2
        #[arg(long)]
        line2: String,
        /// Span start: RFC 3339 UTC or a DS50 number
        #[arg(long)]
        start: String,
        /// Span end: RFC 3339 UTC or a DS50 number
        #[arg(long)]
        end: String,
        /// Step as an ISO-8601 duration (e.g. PT8.5M); omit for the
        /// engine-chosen dynamic step
        #[arg(long)]
        step: Option<String>,
        /// Output reference frame
        #[arg(long, value_enum, default_value = "j2k")]
        frame: FrameArg,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ConfigFile::load().map_err(|e| CliError::Config(e.to_string()))?;
    let _logging = init_logging(&config.logging.directory, &config.logging.file)?;

    let service = PropagationService::new(Arc::new(AnalyticEngine::new()), &config);
    let cancel = CancellationToken::new();

    let result = match cli.command {
        Commands::Info => {
            let info = service.info();
            println!("{} v{}", info.name, info.version);
            println!("commit:     {}", info.commit);
            println!("build date: {}", info.build_date);
            println!("astro lib:  {}", info.astro_lib_info);
            println!("sgp4 lib:   {}", info.sgp4_lib_info);
            println!("timestamp:  {}", info.timestamp.to_rfc3339());
            Ok(())
        }
        Commands::Prop {
            line1,
            line2,
            ds50,
            mse,
            utc,
        } => run_prop(&service, &cancel, line1, line2, ds50, mse, utc).await,
        Commands::Ephem {
            line1,
            line2,
            start,
            end,
            step,
            frame,
        } => run_ephem(&service, &cancel, line1, line2, start, end, step, frame.into()).await,
    };

    service.shutdown().await;
    result
}

async fn run_prop(
    service: &PropagationService,
    cancel: &CancellationToken,
    line1: String,
    line2: String,
    ds50: Option<f64>,
    mse: Option<f64>,
    utc: Option<String>,
) -> Result<(), CliError> {
    let (time_kind, time, time_utc) = match (ds50, mse, utc) {
        (Some(t), _, _) => (Some(TimeKind::Ds50), Some(t), None),
        (_, Some(t), _) => (Some(TimeKind::Mse), Some(t), None),
        (_, _, Some(raw)) => (None, None, Some(parse_utc(&raw)?)),
        _ => {
            return Err(CliError::Args(
                "one of --ds50, --mse, or --utc is required".to_string(),
            ))
        }
    };

    let request = PropRequest {
        req_id: 1,
        time_kind,
        task: Some(PropTask {
            sat: Some(Satellite::from_lines(line1, line2)),
            time,
            time_utc,
        }),
    };

    let response = service.prop(cancel, request).await?;
    let p = response.result;
    println!("ds50:     {:.8}", p.ds50_time);
    println!("mse:      {:.4} min", p.mse_time);
    println!("position: [{:.3}, {:.3}, {:.3}] km", p.x, p.y, p.z);
    println!("velocity: [{:.6}, {:.6}, {:.6}] km/s", p.vx, p.vy, p.vz);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_ephem(
    service: &PropagationService,
    cancel: &CancellationToken,
    line1: String,
    line2: String,
    start: String,
    end: String,
    step: Option<String>,
    frame: Frame,
) -> Result<(), CliError> {
    let mut grid = TimeGrid {
        step: Some(match step {
            Some(period) => TimeStep::Period(period),
            None => TimeStep::Dynamic,
        }),
        ..TimeGrid::default()
    };
    match parse_time_bound(&start)? {
        TimeBound::Utc(t) => grid.start_utc = Some(t),
        TimeBound::Ds50(t) => grid.start_ds50 = Some(t),
    }
    match parse_time_bound(&end)? {
        TimeBound::Utc(t) => grid.end_utc = Some(t),
        TimeBound::Ds50(t) => grid.end_ds50 = Some(t),
    }

    let request = EphemRequest {
        req_id: 1,
        frame: Some(frame),
        common_time_grid: Some(grid),
        tasks: vec![EphemTask {
            task_id: 1,
            time_grid: None,
            sat: Some(Satellite::from_lines(line1, line2)),
        }],
    };

    service.ephem(cancel, request, StdoutSink).await?;
    Ok(())
}

enum TimeBound {
    Utc(DateTime<Utc>),
    Ds50(f64),
}

/// Accept a span bound as either a DS50 number or an RFC 3339 timestamp.
fn parse_time_bound(raw: &str) -> Result<TimeBound, CliError> {
    if let Ok(ds50) = raw.parse::<f64>() {
        return Ok(TimeBound::Ds50(ds50));
    }
    Ok(TimeBound::Utc(parse_utc(raw)?))
}

fn parse_utc(raw: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CliError::Args(format!("cannot parse {raw:?} as RFC 3339: {e}")))
}

/// Sink printing each chunk's points as CSV to stdout.
#[derive(Default)]
struct StdoutSink;

impl EphemSink for StdoutSink {
    fn send(&mut self, chunk: EphemResponse) -> Result<(), SinkSendError> {
        eprintln!(
            "# chunk {} (stream {}): {} points",
            chunk.stream_chunk_id, chunk.stream_id, chunk.result.count
        );
        for p in &chunk.result.points {
            println!(
                "{:.8},{:.3},{:.3},{:.3},{:.6},{:.6},{:.6}",
                p.ds50_time, p.x, p.y, p.z, p.vx, p.vy, p.vz
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_bound_parses_both_forms() {
        match parse_time_bound("27744.5").unwrap() {
            TimeBound::Ds50(t) => assert_eq!(t, 27_744.5),
            TimeBound::Utc(_) => panic!("expected DS50"),
        }
        match parse_time_bound("2025-12-18T00:00:00Z").unwrap() {
            TimeBound::Utc(t) => assert_eq!(t.to_rfc3339(), "2025-12-18T00:00:00+00:00"),
            TimeBound::Ds50(_) => panic!("expected UTC"),
        }
        assert!(parse_time_bound("next tuesday").is_err());
    }

    #[test]
    fn cli_parses_prop_command() {
        let cli = Cli::parse_from([
            "xpropagator",
            "prop",
            "--line1",
            "1 25544U ...",
            "--line2",
            "2 25544 ...",
            "--ds50",
            "27744.5",
        ]);
        match cli.command {
            Commands::Prop { ds50, .. } => assert_eq!(ds50, Some(27_744.5)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_conflicting_times() {
        assert!(Cli::try_parse_from([
            "xpropagator",
            "prop",
            "--line1",
            "x",
            "--line2",
            "y",
            "--ds50",
            "1.0",
            "--utc",
            "2025-12-18T00:00:00Z",
        ])
        .is_err());
    }

    #[test]
    fn cli_parses_ephem_with_default_frame() {
        let cli = Cli::parse_from([
            "xpropagator",
            "ephem",
            "--line1",
            "x",
            "--line2",
            "y",
            "--start",
            "27744.0",
            "--end",
            "27754.0",
            "--step",
            "PT8.5M",
        ]);
        match cli.command {
            Commands::Ephem { frame, step, .. } => {
                assert!(matches!(frame, FrameArg::J2k));
                assert_eq!(step.as_deref(), Some("PT8.5M"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
