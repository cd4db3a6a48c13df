//! standbyd — the Standby failover daemon.
//!
//! Assembles the prober, router, promotion executor, and notifier over the
//! control API and runs reconciliation cycles:
//! - `once` runs a single cycle and prints the report
//! - `run` repeats cycles on an interval until Ctrl-C
//! - `restore` moves traffic back to a recovered primary
//!
//! # Usage
//!
//! ```text
//! standbyd init --primary orders-db --replica orders-db-replica \
//!     --record orders.db.internal > standby.toml
//! standbyd once --config standby.toml --control-api 127.0.0.1:8600
//! standbyd run --config standby.toml --control-api 127.0.0.1:8600 --interval 30s
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::info;

use standby_core::config::parse_duration;
use standby_core::FailoverConfig;
use standby_failover::{CycleReport, Orchestrator};
use standby_http::ControlApiClient;

/// Exit code for a cycle that finished with both endpoints unavailable.
const EXIT_DEGRADED: u8 = 2;

#[derive(Parser)]
#[command(name = "standbyd", about = "Standby database failover daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Print a starter configuration.
    Init {
        /// Primary database identifier.
        #[arg(long)]
        primary: String,

        /// Replica database identifier.
        #[arg(long)]
        replica: String,

        /// DNS record name that clients resolve.
        #[arg(long)]
        record: String,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a configuration file.
    Check {
        #[arg(long, default_value = "standby.toml")]
        config: PathBuf,
    },

    /// Run one reconciliation cycle and print the report as JSON.
    Once {
        #[arg(long, default_value = "standby.toml")]
        config: PathBuf,

        /// Control API address (`host:port`).
        #[arg(long)]
        control_api: String,
    },

    /// Run reconciliation cycles until interrupted.
    Run {
        #[arg(long, default_value = "standby.toml")]
        config: PathBuf,

        /// Control API address (`host:port`).
        #[arg(long)]
        control_api: String,

        /// Time between cycles (e.g. "30s", "1m").
        #[arg(long, default_value = "30s", value_parser = parse_interval)]
        interval: Duration,
    },

    /// Move all traffic back to a recovered primary.
    Restore {
        #[arg(long, default_value = "standby.toml")]
        config: PathBuf,

        /// Control API address (`host:port`).
        #[arg(long)]
        control_api: String,
    },
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    match parse_duration(s) {
        Some(d) if !d.is_zero() => Ok(d),
        Some(_) => Err("interval must be greater than zero".to_string()),
        None => Err(format!("invalid duration: {s}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Init {
            primary,
            replica,
            record,
            output,
        } => cmd_init(&primary, &replica, &record, output.as_deref()),
        Command::Check { config } => cmd_check(&config),
        Command::Once {
            config,
            control_api,
        } => {
            let orchestrator = build_orchestrator(&config, &control_api)?;
            let report = orchestrator.run_cycle().await?;
            print_report(&report)?;
            Ok(ExitCode::from(exit_status(&report)))
        }
        Command::Run {
            config,
            control_api,
            interval,
        } => {
            let orchestrator = build_orchestrator(&config, &control_api)?;
            run_until_ctrl_c(&orchestrator, interval).await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Restore {
            config,
            control_api,
        } => {
            let orchestrator = build_orchestrator(&config, &control_api)?;
            let report = orchestrator.restore_to_primary().await?;
            print_report(&report)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,standby=debug,standbyd=debug")
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn cmd_init(
    primary: &str,
    replica: &str,
    record: &str,
    output: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let config = FailoverConfig::scaffold(primary, replica, record);
    config.validate()?;
    let toml = config.to_toml_string()?;

    match output {
        Some(path) => {
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            std::fs::write(path, toml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "configuration written");
        }
        None => print!("{toml}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_check(path: &Path) -> anyhow::Result<ExitCode> {
    let config = FailoverConfig::from_file(path)?;
    let policy = config.retry_policy()?;
    println!(
        "{}: {} -> {} via {} (ttl {}s, {} attempt(s), backoff {:?})",
        path.display(),
        config.primary.id,
        config.replica.id,
        config.routing.record_name,
        config.routing.ttl,
        policy.max_attempts,
        policy.initial_backoff,
    );
    Ok(ExitCode::SUCCESS)
}

fn build_orchestrator(path: &Path, control_api: &str) -> anyhow::Result<Orchestrator> {
    let config = FailoverConfig::from_file(path)?;
    let client = Arc::new(ControlApiClient::new(control_api));
    info!(
        primary = %config.primary.id,
        replica = %config.replica.id,
        record = %config.routing.record_name,
        control_api = %client.authority(),
        "orchestrator configured"
    );
    let orchestrator = Orchestrator::new(config, client.clone(), client.clone(), client)?;
    Ok(orchestrator)
}

async fn run_until_ctrl_c(orchestrator: &Orchestrator, interval: Duration) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    };

    let (cycles, ()) = tokio::join!(orchestrator.run(interval, shutdown_rx), signal);
    info!(cycles, "standby daemon stopped");
}

fn print_report(report: &CycleReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn exit_status(report: &CycleReport) -> u8 {
    if report.is_degraded() { EXIT_DEGRADED } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use standby_core::memory::{MemoryDatabase, MemoryTopic};
    use standby_core::{EndpointState, EndpointStatus, FailoverAction};
    use standby_failover::CycleOutcome;
    use standby_routing::MemoryRecordSet;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults_interval_to_thirty_seconds() {
        let cli = Cli::try_parse_from(["standbyd", "run", "--control-api", "127.0.0.1:8600"])
            .unwrap();
        match cli.command {
            Command::Run {
                config, interval, ..
            } => {
                assert_eq!(config, PathBuf::from("standby.toml"));
                assert_eq!(interval, Duration::from_secs(30));
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn interval_and_log_format_parse() {
        let cli = Cli::try_parse_from([
            "standbyd",
            "run",
            "--control-api",
            "db-api:8600",
            "--interval",
            "1m",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(
            cli.command,
            Command::Run { interval, .. } if interval == Duration::from_secs(60)
        ));
    }

    #[test]
    fn zero_or_garbage_interval_is_rejected() {
        for bad in ["0s", "soon"] {
            let result = Cli::try_parse_from([
                "standbyd",
                "run",
                "--control-api",
                "db-api:8600",
                "--interval",
                bad,
            ]);
            assert!(result.is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn once_requires_control_api() {
        assert!(Cli::try_parse_from(["standbyd", "once"]).is_err());
    }

    #[test]
    fn init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standby.toml");

        cmd_init("orders-db", "orders-db-replica", "orders.db.internal", Some(&path)).unwrap();
        let config = FailoverConfig::from_file(&path).unwrap();
        assert_eq!(config.replica.id, "orders-db-replica");
        assert_eq!(config.routing.ttl, 60);

        // Refuses to overwrite.
        assert!(cmd_init("a", "b", "c", Some(&path)).is_err());
    }

    #[test]
    fn check_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cmd_check(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn degraded_report_exits_with_distinct_code() {
        let mut report = CycleReport {
            action: FailoverAction::BothUnavailable,
            outcome: CycleOutcome::Degraded,
            primary: EndpointStatus::new(EndpointState::Unavailable, false, ""),
            replica: None,
            promotion: None,
            weights: None,
        };
        assert_eq!(exit_status(&report), EXIT_DEGRADED);

        report.action = FailoverAction::NoAction;
        report.outcome = CycleOutcome::Healthy;
        assert_eq!(exit_status(&report), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scaffolded_config_drives_a_cycle() {
        let db = MemoryDatabase::new();
        db.add_primary("orders-db", "failed", "orders-db.db.internal");
        db.add_replica(
            "orders-db-replica",
            "orders-db",
            "available",
            "orders-db-replica.db.internal",
        );
        let records = MemoryRecordSet::new();
        let topic = MemoryTopic::new();

        let config =
            FailoverConfig::scaffold("orders-db", "orders-db-replica", "orders.db.internal");
        let orchestrator = Orchestrator::new(
            config,
            Arc::new(db.clone()),
            Arc::new(records.clone()),
            Arc::new(topic),
        )
        .unwrap();

        let report = orchestrator.run_cycle().await.unwrap();
        assert_eq!(report.outcome, CycleOutcome::FailedOver);
        assert_eq!(exit_status(&report), 0);
        assert_eq!(records.batches(), 1);
    }
}
