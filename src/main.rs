//! Device Farm Lane CLI
//!
//! Entry point for the `devicefarm-lane` command-line tool.

use clap::{Parser, Subcommand};
use devicefarm_lane::host::{AwsCliConfig, AwsCliTransport, HttpTransfer};
use devicefarm_lane::{
    install_handler, read_run_record, write_run_record, CancelToken, EffectiveConfig, ExitCode,
    FarmError, LaneConfig, MonitorOutputs, MonitorResult, Pipeline, RemoteJob, TestRunSpec,
    DEFAULT_CONFIG_PATH,
};
use df_protocol::TestType;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Per-request timeout of presigned URL transfers
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Parser)]
#[command(name = "devicefarm-lane")]
#[command(about = "Upload, schedule and monitor device farm test runs", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: .devicefarm/lane.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Region of every remote call
    #[arg(long, global = true)]
    region: Option<String>,

    /// Named credentials profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Vendor CLI executable
    #[arg(long, global = true)]
    aws_cli: Option<String>,

    /// Exit non-zero when tests errored
    #[arg(long, global = true)]
    fail_on_error: bool,

    /// Do not print progress dots while polling
    #[arg(long, global = true)]
    no_progress: bool,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload the app and tests, then schedule a run
    Schedule {
        /// Project ARN
        #[arg(long)]
        project: String,

        /// Run name
        #[arg(long)]
        name: String,

        /// BUILTIN_FUZZ, XCTEST, XCTEST_UI or APPIUM_NODE
        #[arg(long)]
        test_type: TestType,

        /// Application package (.ipa)
        #[arg(long)]
        app: Option<PathBuf>,

        /// Test package
        #[arg(long)]
        test_package: Option<PathBuf>,

        /// Test spec (YAML)
        #[arg(long)]
        test_spec: Option<PathBuf>,

        /// Device pool ARN (default: first PRIVATE pool of the project)
        #[arg(long)]
        device_pool: Option<String>,

        /// Write the run record here
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Monitor the run after scheduling it
        #[arg(long)]
        wait: bool,

        #[command(flatten)]
        monitor: MonitorArgs,
    },

    /// Monitor a scheduled run to completion
    Monitor {
        /// Run ARN
        #[arg(long, conflicts_with = "run_record", required_unless_present = "run_record")]
        run_arn: Option<String>,

        /// Run record written by `schedule --output`
        #[arg(long)]
        run_record: Option<PathBuf>,

        #[command(flatten)]
        monitor: MonitorArgs,
    },

    /// List a run's artifacts, optionally downloading them
    Artifacts {
        /// Run ARN
        run_arn: String,

        /// Download allow-listed artifacts here
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// List a project's device pools
    Pools {
        /// Project ARN
        project: String,
    },

    /// List projects
    Projects,

    /// Print the effective configuration
    Config,
}

#[derive(clap::Args)]
struct MonitorArgs {
    /// Write the final run payload here
    #[arg(long)]
    result_file: Option<PathBuf>,

    /// Download allow-listed artifacts here
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    /// Run polling budget in seconds (default: none)
    #[arg(long)]
    timeout: Option<u64>,

    /// Run polling interval in seconds
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Print the result as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

impl MonitorArgs {
    fn outputs(&self) -> MonitorOutputs {
        MonitorOutputs {
            artifact_dir: self.artifacts_dir.clone(),
            output_file: self.result_file.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancelToken::new();
    if let Err(e) = install_handler(&cancel) {
        tracing::warn!(error = %e, "failed to install signal handler");
    }

    let monitor_args = match &cli.command {
        Commands::Schedule { monitor, .. } | Commands::Monitor { monitor, .. } => Some(monitor),
        _ => None,
    };
    let effective = load_config(&cli, monitor_args);

    match cli.command {
        Commands::Schedule {
            project,
            name,
            test_type,
            app,
            test_package,
            test_spec,
            device_pool,
            output,
            wait,
            monitor,
        } => {
            let spec = TestRunSpec {
                project_arn: project,
                device_pool_arn: device_pool,
                name,
                test_type,
                app,
                test_package,
                test_spec,
            };
            run_schedule(&effective.lane, cancel, &spec, output.as_deref(), wait, &monitor);
        }
        Commands::Monitor {
            run_arn,
            run_record,
            monitor,
        } => {
            run_monitor(&effective.lane, cancel, run_arn, run_record, &monitor);
        }
        Commands::Artifacts { run_arn, dest } => {
            run_artifacts(&effective.lane, cancel, &run_arn, dest.as_deref());
        }
        Commands::Pools { project } => {
            run_pools(&effective.lane, cancel, &project);
        }
        Commands::Projects => {
            run_projects(&effective.lane, cancel);
        }
        Commands::Config => match effective.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(ExitCode::ConfigError.as_i32());
            }
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Merge defaults, the config file and command-line flags
fn load_config(cli: &Cli, monitor: Option<&MonitorArgs>) -> EffectiveConfig {
    let mut overrides = serde_json::Map::new();
    if let Some(region) = &cli.region {
        overrides.insert("region".into(), region.clone().into());
    }
    if let Some(profile) = &cli.profile {
        overrides.insert("profile".into(), profile.clone().into());
    }
    if let Some(aws_cli) = &cli.aws_cli {
        overrides.insert("aws_cli".into(), aws_cli.clone().into());
    }
    if cli.fail_on_error {
        overrides.insert("fail_on_error".into(), true.into());
    }
    if cli.no_progress {
        overrides.insert("progress".into(), false.into());
    }
    if let Some(args) = monitor {
        let mut run = serde_json::Map::new();
        if let Some(timeout) = args.timeout {
            run.insert("timeout_seconds".into(), timeout.into());
        }
        if let Some(interval) = args.poll_interval {
            run.insert("poll_interval_seconds".into(), interval.into());
        }
        if !run.is_empty() {
            overrides.insert("run".into(), run.into());
        }
    }

    let (path, required) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let cli_overrides = (!overrides.is_empty()).then(|| serde_json::Value::Object(overrides));

    match EffectiveConfig::build(Some(&path), required, cli_overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(ExitCode::ConfigError.as_i32());
        }
    }
}

fn build_pipeline(lane: &LaneConfig, cancel: CancelToken) -> Pipeline {
    let transport = AwsCliTransport::new(AwsCliConfig {
        program: lane.aws_cli.clone(),
        region: lane.region.clone(),
        profile: lane.profile.clone(),
    });
    let transfer = match HttpTransfer::new(TRANSFER_TIMEOUT) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error creating HTTP client: {}", e);
            process::exit(ExitCode::ConfigError.as_i32());
        }
    };
    Pipeline::new(lane.clone(), Arc::new(transport), Arc::new(transfer), cancel)
}

/// Report a fatal error with its last known payload and exit
fn fail(context: &str, error: &FarmError, code: ExitCode) -> ! {
    eprintln!("Error {}: {}", context, error);
    if let Some(payload) = error.diagnostic_payload() {
        eprintln!("{}", render_payload(payload));
    }
    process::exit(code.as_i32());
}

/// Pretty JSON of a diagnostic payload
fn render_payload(payload: &serde_json::Value) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
}

fn run_schedule(
    lane: &LaneConfig,
    cancel: CancelToken,
    spec: &TestRunSpec,
    output: Option<&Path>,
    wait: bool,
    monitor: &MonitorArgs,
) {
    let pipeline = build_pipeline(lane, cancel);

    let scheduled = match pipeline.schedule_test(spec) {
        Ok(s) => s,
        Err(e @ FarmError::InvalidRunRequest(_)) => fail("in run request", &e, ExitCode::ConfigError),
        Err(e) => fail("scheduling run", &e, ExitCode::ErroredWithException),
    };

    if let Some(path) = output {
        if let Err(e) = write_run_record(path, &scheduled) {
            fail("writing run record", &e, ExitCode::ErroredWithException);
        }
    }

    if !wait {
        println!("{}", scheduled.job.arn);
        return;
    }

    let mut job = scheduled.job;
    let result = pipeline.monitor_run(&mut job, &monitor.outputs());
    finish(lane, &result, monitor.json);
}

fn run_monitor(
    lane: &LaneConfig,
    cancel: CancelToken,
    run_arn: Option<String>,
    run_record: Option<PathBuf>,
    monitor: &MonitorArgs,
) {
    let mut job = match (run_arn, run_record) {
        (Some(arn), _) => RemoteJob::run(arn, ""),
        (None, Some(path)) => match read_run_record(&path) {
            Ok(job) => job,
            Err(e) => fail("reading run record", &e, ExitCode::ConfigError),
        },
        (None, None) => {
            eprintln!("Error: one of --run-arn or --run-record is required");
            process::exit(ExitCode::ConfigError.as_i32());
        }
    };

    let pipeline = build_pipeline(lane, cancel);
    let result = pipeline.monitor_run(&mut job, &monitor.outputs());
    finish(lane, &result, monitor.json);
}

/// Print the monitor result and exit with its code
fn finish(lane: &LaneConfig, result: &MonitorResult, json: bool) -> ! {
    if json {
        match result.to_json().and_then(|v| Ok(serde_json::to_string_pretty(&v)?)) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error serializing result: {}", e),
        }
    } else {
        match result {
            MonitorResult::Finished(outcome) => println!("{}", outcome.human_summary()),
            MonitorResult::ErroredWithException { run_arn, error } => {
                eprintln!("Error monitoring run {}: {}", run_arn, error);
                if let Some(payload) = error.diagnostic_payload() {
                    eprintln!("{}", render_payload(payload));
                }
            }
        }
    }

    process::exit(result.exit_code(lane.fail_on_error).as_i32());
}

fn run_artifacts(lane: &LaneConfig, cancel: CancelToken, run_arn: &str, dest: Option<&Path>) {
    let pipeline = build_pipeline(lane, cancel);
    match pipeline.collect_artifacts(run_arn, dest) {
        Ok(collection) => {
            for artifact in &collection.artifacts {
                println!("{:?}\t{}\t{}", artifact.artifact_type, artifact.name, artifact.arn);
            }
            if let Some(path) = collection.manifest_path {
                println!();
                println!("Manifest: {}", path.display());
                println!("Downloaded: {}", collection.downloaded.len());
            }
        }
        Err(e) => fail("collecting artifacts", &e, ExitCode::ErroredWithException),
    }
}

fn run_pools(lane: &LaneConfig, cancel: CancelToken, project: &str) {
    let pipeline = build_pipeline(lane, cancel);
    match pipeline.list_device_pools(project) {
        Ok(response) => {
            for pool in &response.device_pools {
                println!("{:?}\t{}\t{}", pool.pool_type, pool.name, pool.arn);
            }
        }
        Err(e) => fail("listing device pools", &e, ExitCode::ErroredWithException),
    }
}

fn run_projects(lane: &LaneConfig, cancel: CancelToken) {
    let pipeline = build_pipeline(lane, cancel);
    match pipeline.list_projects() {
        Ok(response) => {
            for project in &response.projects {
                println!("{}\t{}", project.name, project.arn);
            }
        }
        Err(e) => fail("listing projects", &e, ExitCode::ErroredWithException),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_payload_is_pretty() {
        let payload = serde_json::json!({"run": {"status": "RUNNING"}});
        let text = render_payload(&payload);
        assert!(text.contains("\n  \"run\": {"));
        assert_eq!(serde_json::from_str::<serde_json::Value>(&text).unwrap(), payload);
    }
}
