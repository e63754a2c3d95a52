use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use runscan::{
    client::ResultsQuery,
    commands::{Orchestrator, ResultOptions},
    config::{service_api_key_from_env, Config, Credentials},
    emit::EventEmitter,
    enrich::{Enricher, ServiceApiClient},
    output::OutputFormat,
    targets::{load_targets, SubnetFilter},
    Requestor,
};
use std::io::{IsTerminal, Stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "runscan")]
#[command(
    author,
    version,
    about = "Run scans and fetch results from a vulnerability scanning API",
    after_help = "The targets argument can either contain a comma separated list of targets, \
                  or a path to a file containing a target list. If a file is used, it should \
                  contain one target per line; lines starting with # are ignored.\n\n\
                  SCANAPIURL and SCANAPIKEY must be set in the environment. SERVICEAPIKEY is \
                  also required when --serviceapi is used."
)]
struct Cli {
    /// Skip verification of the scan service certificate
    #[arg(long, global = true)]
    noverify: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available scan policies
    Policies {
        /// Output format (plain, table, json)
        #[arg(long, default_value = "plain")]
        format: String,
    },

    /// Start a scan
    Scan {
        /// Comma separated targets, or a file with one target per line
        targets: String,

        /// Policy to use when running the scan
        #[arg(short, long)]
        policy: String,

        /// Drop any IP target that falls inside a subnet listed in this file
        #[arg(long, value_name = "SUBNETS_FILE")]
        filter_subnets: Option<PathBuf>,

        /// Follow the scan until complete, then fetch results
        #[arg(short, long)]
        follow: bool,

        #[command(flatten)]
        results: ResultArgs,
    },

    /// Fetch results for a scan
    Results {
        /// Scan id returned when the scan was started
        scan_id: String,

        #[command(flatten)]
        results: ResultArgs,
    },

    /// Purge scans older than the given number of seconds (at least 300)
    Purge {
        seconds: u64,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Args)]
struct ResultArgs {
    /// Fetch raw results in CSV format instead of JSON
    #[arg(long)]
    csv: bool,

    /// Filter vulnerabilities below the specified CVSS score
    #[arg(long, value_name = "CVSS")]
    mincvss: Option<f64>,

    /// Don't include plugin output in results
    #[arg(long)]
    nooutput: bool,

    /// Emit results as security events to this URL; use 'stdout' to print them
    #[arg(long, value_name = "URL")]
    mozdef: Option<String>,

    /// Integrate with serviceapi for host ownership and indicators
    #[arg(long, value_name = "URL")]
    serviceapi: Option<String>,
}

impl ResultArgs {
    fn options(&self) -> ResultOptions {
        ResultOptions {
            csv: self.csv,
            query: ResultsQuery {
                min_cvss: self.mincvss,
                no_output: self.nooutput,
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();
    init_logging(cli.verbose, &config.log_level);

    match cli.command {
        Commands::Config { init, path } => handle_config(init, path)?,
        Commands::Policies { format } => {
            let format = OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))?;
            let mut runner = build_runner(cli.noverify, &config)?;
            runner.list_policies(format).await?;
        }
        Commands::Results { scan_id, results } => {
            let runner = build_runner(cli.noverify, &config)?;
            let mut runner = configure_results(runner, &results, &config)?;
            runner.fetch_results(&scan_id, results.options()).await?;
        }
        Commands::Purge { seconds } => {
            let mut runner = build_runner(cli.noverify, &config)?;
            runner.purge_scans(seconds).await?;
        }
        Commands::Scan {
            targets,
            policy,
            filter_subnets,
            follow,
            results,
        } => {
            let runner = build_runner(cli.noverify, &config)?;
            let mut runner = configure_results(runner, &results, &config)?;

            let filter = match filter_subnets {
                Some(path) => SubnetFilter::load(path)?,
                None => SubnetFilter::default(),
            };
            let targets = filter.apply(load_targets(&targets));

            let scan_id = runner.start_scan(&targets, &policy).await?;

            if follow {
                runner.follow_scan(&scan_id).await?;
                runner.fetch_results(&scan_id, results.options()).await?;
            } else {
                println!("{}", scan_id);
            }
        }
    }

    Ok(())
}

fn build_runner(noverify: bool, config: &Config) -> Result<Orchestrator<Stdout>> {
    let credentials = Credentials::from_env()?;
    let verify_tls = config.verify_tls && !noverify;
    let requestor = Requestor::new(&credentials, verify_tls)?;

    Ok(Orchestrator::new(Box::new(requestor), std::io::stdout())
        .with_poll_interval(config.poll_interval())
        .with_progress(std::io::stderr().is_terminal()))
}

/// Attaches enrichment and event emission when they are requested on the
/// command line or in the settings file.
fn configure_results(
    mut runner: Orchestrator<Stdout>,
    args: &ResultArgs,
    config: &Config,
) -> Result<Orchestrator<Stdout>> {
    if let Some(url) = args.serviceapi.clone().or_else(|| config.service_api_url.clone()) {
        let key = service_api_key_from_env()?;
        runner = runner.with_enricher(Enricher::new(Box::new(ServiceApiClient::new(url, key))));
    }

    if let Some(destination) = args.mozdef.as_deref().or(config.event_destination.as_deref()) {
        runner = runner.with_emitter(EventEmitter::for_destination(
            destination,
            config.event_source_name.clone(),
        ));
    }

    Ok(runner)
}

/// Logs go to stderr; stdout carries command output.
fn init_logging(verbose: u8, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new(default_level),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let path = Config::config_path();

    if show_path {
        println!("{}", path.display());
    } else if init {
        if Config::init_at(&path)? {
            println!("Created config file at: {}", path.display());
        } else {
            println!("Config file already exists at: {}", path.display());
        }
    } else {
        // Effective settings, with defaults filled in for anything unset.
        let config = Config::load_from(&path)?;
        println!("# {}", path.display());
        print!("{}", toml::to_string_pretty(&config)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_arguments() {
        let cli = Cli::try_parse_from([
            "runscan",
            "scan",
            "10.0.0.1,web.example.com",
            "-p",
            "default",
            "--follow",
            "--mincvss",
            "7.5",
            "--mozdef",
            "stdout",
            "--noverify",
        ])
        .unwrap();

        assert!(cli.noverify);
        match cli.command {
            Commands::Scan {
                targets,
                policy,
                follow,
                results,
                ..
            } => {
                assert_eq!(targets, "10.0.0.1,web.example.com");
                assert_eq!(policy, "default");
                assert!(follow);
                assert_eq!(results.options().query.min_cvss, Some(7.5));
                assert_eq!(results.mozdef.as_deref(), Some("stdout"));
            }
            _ => panic!("expected scan command"),
        }
    }

    #[test]
    fn test_scan_requires_policy() {
        assert!(Cli::try_parse_from(["runscan", "scan", "10.0.0.1"]).is_err());
    }

    #[test]
    fn test_results_csv() {
        let cli =
            Cli::try_parse_from(["runscan", "results", "abc", "--csv", "--nooutput"]).unwrap();
        match cli.command {
            Commands::Results { scan_id, results } => {
                assert_eq!(scan_id, "abc");
                let options = results.options();
                assert!(options.csv);
                assert!(options.query.no_output);
            }
            _ => panic!("expected results command"),
        }
    }
}
