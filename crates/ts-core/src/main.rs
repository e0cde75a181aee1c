//! Tactile Search Core - active-inference controller for a touch-searching arm
//!
//! The main entry point for ts-core, handling:
//! - The decision endpoint (belief update, policy scoring, action selection)
//! - The robot endpoint (Sense and Act tasks over the configured devices)
//! - In-process simulation of both endpoints
//! - Configuration checks

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use ts_common::{Error, OutputFormat, StructuredError};
use ts_core::config::{
    config_error, load_config, validate_config, validate_connector, validation_error, Config,
    ConfigSnapshot, DeviceKind, PriorMode, ResolvedConfig, SenseMode,
};
use ts_core::control::{run_decision_endpoint, RunHistory};
use ts_core::exit_codes::ExitCode;
use ts_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use ts_core::robot::{run_endpoint, RobotReport};
use ts_core::simulate::{run_simulation, SimulationReport};

/// Tactile Search Core - find where the arm is touched, one move at a time
#[derive(Parser)]
#[command(name = "ts-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Config file (TOML, or JSON for any other extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for the command payload on stdout
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the decision endpoint: listen, run the control loop, print the run history
    Decide(RunOverrides),

    /// Run the robot endpoint: Sense and Act tasks against the configured devices
    Robot(RunOverrides),

    /// Run both endpoints in one process against the simulated robot
    Simulate(RunOverrides),

    /// Validate configuration and print the resolved settings
    Check,

    /// Print version information
    Version,
}

/// Field overrides applied on top of the resolved config file.
#[derive(Args, Debug, Default, Clone)]
struct RunOverrides {
    /// Channel host
    #[arg(long)]
    host: Option<String>,

    /// Channel port (0 picks an ephemeral port when listening)
    #[arg(long)]
    port: Option<u16>,

    /// Channel receive timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Act cycles before the end token
    #[arg(long)]
    cycles: Option<u64>,

    /// Robot devices (simulated, bridge)
    #[arg(long)]
    device: Option<DeviceKind>,

    /// Touch source (sensor, random, state, list)
    #[arg(long)]
    sense_mode: Option<SenseMode>,

    /// Prior supply for each belief update (propagate, static)
    #[arg(long)]
    prior_mode: Option<PriorMode>,

    /// Seed for action sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Seed for the random touch source
    #[arg(long)]
    sense_seed: Option<u64>,
}

impl RunOverrides {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.channel.host = host.clone();
        }
        if let Some(port) = self.port {
            config.channel.port = port;
        }
        if let Some(t) = self.timeout_secs {
            config.channel.timeout_secs = t;
        }
        if let Some(cycles) = self.cycles {
            config.robot.cycles = cycles;
        }
        if let Some(device) = self.device {
            config.robot.device = device;
        }
        if let Some(mode) = self.sense_mode {
            config.sense.mode = mode;
        }
        if let Some(mode) = self.prior_mode {
            config.inference.prior_mode = mode;
        }
        if self.seed.is_some() {
            config.inference.seed = self.seed;
        }
        if self.sense_seed.is_some() {
            config.sense.seed = self.sense_seed;
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    init_logging(&log_config);

    let exit_code = match &cli.command {
        Commands::Decide(args) => run_decide(&cli.global, args),
        Commands::Robot(args) => run_robot(&cli.global, args),
        Commands::Simulate(args) => run_simulate(&cli.global, args),
        Commands::Check => run_check(&cli.global),
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Clean
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Commands
// ============================================================================

fn run_decide(global: &GlobalOpts, args: &RunOverrides) -> ExitCode {
    let run_id = generate_run_id();
    let _run = LogContext::new(&run_id, "decision").span().entered();

    let result = prepare_config(global, args, false).and_then(|config| {
        log_run_started(&config);
        run_decision_endpoint(&config, &run_id)
    });
    match result.and_then(|history| emit_history(global.format, &history).map(|()| history)) {
        Ok(history) => {
            ts_core::log_event!(
                INFO,
                event_names::RUN_FINISHED,
                Stage::Shutdown,
                "Decision endpoint finished",
                cycles = history.steps.len() as u64,
            );
            ExitCode::Clean
        }
        Err(err) => fail(global, &err),
    }
}

fn run_robot(global: &GlobalOpts, args: &RunOverrides) -> ExitCode {
    let run_id = generate_run_id();
    let _run = LogContext::new(&run_id, "robot").span().entered();

    let result = prepare_config(global, args, true).and_then(|config| {
        log_run_started(&config);
        run_endpoint(&config)
    });
    match result.and_then(|report| emit_robot_report(global.format, &report).map(|()| report)) {
        Ok(report) => {
            ts_core::log_event!(
                INFO,
                event_names::RUN_FINISHED,
                Stage::Shutdown,
                "Robot endpoint finished",
                cycles = report.act.cycles_completed,
                touches = report.act.touches,
            );
            ExitCode::Clean
        }
        Err(err) => fail(global, &err),
    }
}

fn run_simulate(global: &GlobalOpts, args: &RunOverrides) -> ExitCode {
    let run_id = generate_run_id();
    let _run = LogContext::new(&run_id, "simulate").span().entered();

    let result = prepare_config(global, args, false).and_then(|config| {
        log_run_started(&config);
        run_simulation(&config, &run_id)
    });
    match result.and_then(|report| emit_simulation(global.format, &report).map(|()| report)) {
        Ok(report) => {
            ts_core::log_event!(
                INFO,
                event_names::RUN_FINISHED,
                Stage::Shutdown,
                "Simulation finished",
                cycles = report.history.steps.len() as u64,
                touches = report.robot.act.touches,
            );
            ExitCode::Clean
        }
        Err(err) => fail(global, &err),
    }
}

fn run_check(global: &GlobalOpts) -> ExitCode {
    let resolved = match load_config(global.config.as_deref()) {
        Ok(r) => r,
        Err(err) => return fail(global, &config_error(err)),
    };
    if let Err(err) = validate_config(&resolved.config) {
        return fail(global, &validation_error(err));
    }

    let snapshot = ConfigSnapshot::capture(&resolved);
    let out = match global.format {
        OutputFormat::Json | OutputFormat::Jsonl => {
            let payload = serde_json::json!({
                "valid": true,
                "snapshot": snapshot,
                "config": resolved.config,
            });
            to_json(&payload, global.format == OutputFormat::Json)
        }
        OutputFormat::Summary => Ok(format!(
            "config ok: source={} hash={}",
            snapshot.source, snapshot.effective_hash
        )),
        OutputFormat::Exitcode => return ExitCode::Clean,
    };
    match out {
        Ok(text) => {
            println!("{text}");
            ExitCode::Clean
        }
        Err(err) => fail(global, &err),
    }
}

fn print_version(global: &GlobalOpts) {
    let version_info = serde_json::json!({
        "ts_core_version": env!("CARGO_PKG_VERSION"),
        "config_schema_version": ts_config::CONFIG_SCHEMA_VERSION,
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
    });

    match global.format {
        OutputFormat::Json | OutputFormat::Jsonl => {
            if let Ok(text) = to_json(&version_info, global.format == OutputFormat::Json) {
                println!("{text}");
            }
        }
        OutputFormat::Exitcode => {}
        OutputFormat::Summary => {
            println!("ts-core {}", env!("CARGO_PKG_VERSION"));
            println!("config schema version: {}", ts_config::CONFIG_SCHEMA_VERSION);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve the config file, apply CLI overrides, validate the result.
fn prepare_config(
    global: &GlobalOpts,
    args: &RunOverrides,
    connector: bool,
) -> Result<Config, Error> {
    let mut resolved: ResolvedConfig = load_config(global.config.as_deref()).map_err(config_error)?;
    args.apply(&mut resolved.config);
    validate_config(&resolved.config).map_err(validation_error)?;
    if connector {
        validate_connector(&resolved.config.channel).map_err(validation_error)?;
    }

    let snapshot = ConfigSnapshot::capture(&resolved);
    ts_core::log_event!(
        INFO,
        event_names::CONFIG_LOADED,
        Stage::Init,
        "Configuration loaded",
        source = tracing::field::display(&snapshot.source),
        path = tracing::field::debug(&snapshot.path),
        effective_hash = tracing::field::display(&snapshot.effective_hash),
    );
    Ok(resolved.config)
}

fn log_run_started(config: &Config) {
    ts_core::log_event!(
        INFO,
        event_names::RUN_STARTED,
        Stage::Init,
        "Run started",
        channel = tracing::field::display(config.channel.address()),
        cycles = config.robot.cycles,
        sense_mode = config.sense.mode.as_str(),
        prior_mode = config.inference.prior_mode.as_str(),
    );
}

fn fail(global: &GlobalOpts, err: &Error) -> ExitCode {
    let code = ExitCode::from(err);
    ts_core::log_event!(
        ERROR,
        event_names::RUN_FAILED,
        Stage::Shutdown,
        "Run failed",
        error = tracing::field::display(err),
        exit_code = code.as_i32() as i64,
    );
    if global.format != OutputFormat::Exitcode {
        let structured = StructuredError::from(err).with_context("exit_code", code.code_name());
        if let Ok(text) = serde_json::to_string(&structured) {
            eprintln!("{text}");
        }
    }
    code
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, Error> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(text)
}

fn emit_history(format: OutputFormat, history: &RunHistory) -> Result<(), Error> {
    match format {
        OutputFormat::Json => println!("{}", to_json(history, true)?),
        OutputFormat::Jsonl => {
            for step in &history.steps {
                println!("{}", to_json(step, false)?);
            }
        }
        OutputFormat::Summary => println!("{}", history_line(history)),
        OutputFormat::Exitcode => {}
    }
    Ok(())
}

fn emit_robot_report(format: OutputFormat, report: &RobotReport) -> Result<(), Error> {
    match format {
        OutputFormat::Json => println!("{}", to_json(report, true)?),
        OutputFormat::Jsonl => println!("{}", to_json(report, false)?),
        OutputFormat::Summary => println!(
            "cycles={} touches={} device_errors={} sense_polls={}",
            report.act.cycles_completed,
            report.act.touches,
            report.act.device_errors + report.sense.device_errors,
            report.sense.polls
        ),
        OutputFormat::Exitcode => {}
    }
    Ok(())
}

fn emit_simulation(format: OutputFormat, report: &SimulationReport) -> Result<(), Error> {
    match format {
        OutputFormat::Json => println!("{}", to_json(report, true)?),
        OutputFormat::Jsonl => emit_history(format, &report.history)?,
        OutputFormat::Summary => println!(
            "{} sense_polls={}",
            history_line(&report.history),
            report.robot.sense.polls
        ),
        OutputFormat::Exitcode => {}
    }
    Ok(())
}

fn history_line(history: &RunHistory) -> String {
    let summary = history.summary();
    let context = summary
        .final_context
        .map(|c| {
            c.iter()
                .map(|p| format!("{p:.3}"))
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default();
    format!(
        "cycles={} touches={} non_converged={} final_position={} context=[{}]",
        summary.cycles,
        summary.touches,
        summary.non_converged,
        summary
            .final_position
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
        context
    )
}
