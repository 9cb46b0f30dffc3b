use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use uvdose_core::*;

#[derive(Parser)]
#[command(name = "uvdose")]
#[command(about = "UV exposure budget for the rest of the day", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Forecast payload (JSON); reads stdin when omitted or "-"
    #[arg(long, global = true)]
    forecast: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skin class (I-VI)
    #[arg(long, global = true)]
    skin: Option<String>,

    /// Fraction of the MED to treat as the limit, in (0, 1]
    #[arg(long, global = true)]
    margin: Option<f64>,

    /// Evaluate as if it were this instant (RFC 3339)
    #[arg(long, global = true, value_parser = parse_instant)]
    at: Option<DateTime<Utc>>,

    /// Fail instead of assuming safety when the forecast does not cover today
    #[arg(long, global = true)]
    strict: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Percent of the limit used by going out now until midnight
    Now,

    /// Earliest time it is safe to go out for the rest of the day
    SafeTime {
        /// Search resolution in seconds
        #[arg(long)]
        precision_secs: Option<i64>,
    },

    /// Both of the above against the same window (default)
    Assess {
        /// Search resolution in seconds
        #[arg(long)]
        precision_secs: Option<i64>,
    },
}

fn parse_instant(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 instant: {}", e))
}

/// Everything an evaluation needs, resolved from flags and config
struct Request {
    series: ForecastSeries,
    med: MedTable,
    skin: SkinClass,
    margin: SafetyMargin,
    policy: CoveragePolicy,
    now: DateTime<Utc>,
}

fn main() -> Result<()> {
    // Initialize logging
    uvdose_core::logging::init();

    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let request = build_request(&cli, &config)?;

    match cli.command {
        Some(Commands::Now) => cmd_now(&request, cli.json),
        Some(Commands::SafeTime { precision_secs }) => {
            cmd_safe_time(&request, precision(precision_secs, &config)?, cli.json)
        }
        Some(Commands::Assess { precision_secs }) => {
            cmd_assess(&request, precision(precision_secs, &config)?, cli.json)
        }
        None => {
            // Default to "assess" command
            cmd_assess(&request, precision(None, &config)?, cli.json)
        }
    }
}

fn build_request(cli: &Cli, config: &Config) -> Result<Request> {
    let payload = load_payload(cli.forecast.as_deref())?;
    let series = ForecastSeries::from_payload(&payload)?;

    let skin = match cli.skin.as_deref() {
        Some(s) => s.parse()?,
        None => config.evaluation.skin_class,
    };
    let margin = match cli.margin {
        Some(m) => SafetyMargin::new(m)?,
        None => config.margin()?,
    };
    let policy = if cli.strict {
        CoveragePolicy::Fail
    } else {
        config.evaluation.insufficient_coverage
    };

    Ok(Request {
        series,
        med: config.med_table()?,
        skin,
        margin,
        policy,
        now: cli.at.unwrap_or_else(Utc::now),
    })
}

fn load_payload(path: Option<&Path>) -> Result<ForecastPayload> {
    match path {
        Some(p) if p != Path::new("-") => ForecastPayload::load_from(p),
        _ => {
            tracing::debug!("Reading forecast payload from stdin");
            ForecastPayload::from_reader(std::io::stdin().lock())
        }
    }
}

fn precision(flag: Option<i64>, config: &Config) -> Result<Duration> {
    let secs = flag.unwrap_or(config.evaluation.precision_seconds);
    Duration::try_seconds(secs).ok_or(Error::InvalidPrecision(secs))
}

fn evaluator(request: &Request) -> ExposureEvaluator<'_> {
    ExposureEvaluator::new(&request.med).with_policy(request.policy)
}

fn cmd_now(request: &Request, json: bool) -> Result<()> {
    let report = evaluator(request).percent_exposure_if_outside_now(
        &request.series,
        request.skin,
        request.margin,
        request.now,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_exposure(&report);
    }
    Ok(())
}

fn cmd_safe_time(request: &Request, precision: Duration, json: bool) -> Result<()> {
    let report = evaluator(request)
        .with_precision(precision)?
        .safe_start_time_for_rest_of_day(
            &request.series,
            request.skin,
            request.margin,
            request.now,
        )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_safe_time(&report);
    }
    Ok(())
}

fn cmd_assess(request: &Request, precision: Duration, json: bool) -> Result<()> {
    let assessment = evaluator(request).with_precision(precision)?.assess(
        &request.series,
        request.skin,
        request.margin,
        request.now,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        display_exposure(&assessment.exposure);
        display_safe_time(&assessment.safe_time);
    }
    Ok(())
}

fn display_exposure(report: &ExposureReport) {
    println!(
        "Safety index if you go out now: {:.2}%",
        report.percent
    );
    println!(
        "  Skin class {}: {:.2} of {:.2} SED until {}",
        report.skin_class,
        report.dose_sed,
        report.threshold_sed,
        report.window_end.format("%Y-%m-%d %H:%M")
    );
    if !report.covered {
        println!("  (forecast does not cover the rest of the day; assuming no exposure)");
    }
}

fn display_safe_time(report: &SafeTimeReport) {
    match report.status {
        SafeStatus::RightNow => println!("Safe to go outside for the rest of the day"),
        SafeStatus::Later => println!(
            "Safe to go outside at: {} ({})",
            report.safe_time.format("%Y-%m-%d %H:%M:%S"),
            report.zone
        ),
    }
}
