//! Flow Analyzer - statistical validation of flow exporter output
//!
//! The entry point for ft-analyzer, handling:
//! - Validation of a candidate flow file against a reference
//! - Rule-file checking
//! - Flow file inspection (raw vs reconciled)

use clap::{Args, Parser, Subcommand};
use ft_analyzer::exit_codes::ExitCode;
use ft_analyzer::flows::{load_flows, reconcile, Timeouts};
use ft_analyzer::logging::{
    emit, event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel,
    Stage,
};
use ft_analyzer::model::{aggregate, rules_from_file, MetricType};
use ft_analyzer::{StatisticalModel, StatisticalReport};
use ft_common::error::format_error_human;
use ft_common::{parse_timestamp, ErrorCategory, OutputFormat, StructuredError, TimestampMs};
use ft_config::{
    validate_rule_file, ModelSettings, OffsetScope, RuleFile, SettingsOverrides,
    DEFAULT_ACTIVE_TIMEOUT_SECS, DEFAULT_INACTIVE_TIMEOUT_SECS,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Flow Analyzer - compare exported flows against a reference dataset
#[derive(Parser)]
#[command(name = "ft-analyzer")]
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
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true, env = "FT_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

impl GlobalOpts {
    fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a candidate flow file with a reference flow file
    Validate(ValidateArgs),
    /// Validate a rule file without loading any flows
    Check(CheckArgs),
    /// Show record counts and totals of one flow file before and after reconciliation
    Inspect(InspectArgs),
    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Flow file produced by the exporter under test
    #[arg(long)]
    candidate: PathBuf,

    /// Trusted reference flow file
    #[arg(long)]
    reference: PathBuf,

    /// Rule file (TOML, or JSON by extension)
    #[arg(long, env = "FT_RULES")]
    rules: PathBuf,

    #[command(flatten)]
    model: ModelArgs,
}

/// Overrides of the rule file's [model] section
#[derive(Args, Debug)]
struct ModelArgs {
    /// Active timeout in seconds
    #[arg(long)]
    active_timeout: Option<u64>,

    /// Inactive timeout in seconds
    #[arg(long)]
    inactive_timeout: Option<u64>,

    /// Absolute instant the flow timestamps are relative to (ms or RFC 3339)
    #[arg(long, value_parser = parse_start_time)]
    start_time: Option<TimestampMs>,

    /// Datasets the start time applies to (reference, both) [default: reference]
    #[arg(long)]
    offset_scope: Option<OffsetScope>,
}

impl ModelArgs {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            active_timeout: self.active_timeout,
            inactive_timeout: self.inactive_timeout,
            start_time: self.start_time,
            offset_scope: self.offset_scope,
        }
    }
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Rule file to check
    #[arg(long, env = "FT_RULES")]
    rules: PathBuf,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Flow file to inspect
    #[arg(long)]
    file: PathBuf,

    /// Active timeout in seconds
    #[arg(long, default_value_t = DEFAULT_ACTIVE_TIMEOUT_SECS)]
    active_timeout: u64,

    /// Inactive timeout in seconds
    #[arg(long, default_value_t = DEFAULT_INACTIVE_TIMEOUT_SECS)]
    inactive_timeout: u64,
}

fn parse_start_time(raw: &str) -> Result<TimestampMs, String> {
    parse_timestamp(raw).map_err(|e| e.to_string())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version also arrive here, on stdout.
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Passing
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let cli_level = LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet);
    let log_config = LogConfig::from_env(cli_level, cli.global.log_format);
    init_logging(&log_config);

    let ctx = LogContext::new(generate_run_id());

    let exit_code = match &cli.command {
        Commands::Validate(args) => run_validate(&cli.global, &ctx, args),
        Commands::Check(args) => run_check(&cli.global, &ctx, args),
        Commands::Inspect(args) => run_inspect(&cli.global, &ctx, args),
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Passing
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_validate(global: &GlobalOpts, ctx: &LogContext, args: &ValidateArgs) -> ExitCode {
    emit(
        &ctx.info(event_names::RUN_STARTED, Stage::Init, "Starting validation")
            .with_field("candidate", args.candidate.display().to_string())
            .with_field("reference", args.reference.display().to_string()),
    );

    let report = match validate(ctx, args) {
        Ok(report) => report,
        Err(err) => return output_error(global, ctx, &err),
    };

    if let Err(err) = print_report(global, &report) {
        return output_error(global, ctx, &err);
    }

    let exit_code = ExitCode::from_outcome(report.is_passing());
    emit(
        &ctx.info(event_names::RUN_FINISHED, Stage::Report, "Validation complete")
            .with_field("tests", report.len())
            .with_field("failed", report.get_failed().len())
            .with_field("exit_code", exit_code.as_i32()),
    );
    exit_code
}

fn validate(ctx: &LogContext, args: &ValidateArgs) -> ft_common::Result<StatisticalReport> {
    let (file, settings) = load_rule_file(ctx, &args.rules, &args.model.overrides())?;
    let rules = rules_from_file(&file)?;
    let model = StatisticalModel::with_settings(&args.candidate, &args.reference, &settings)?;
    Ok(model.validate(&rules)?)
}

fn load_rule_file(
    ctx: &LogContext,
    path: &Path,
    overrides: &SettingsOverrides,
) -> ft_common::Result<(RuleFile, ModelSettings)> {
    let file = RuleFile::from_file(path)?;
    validate_rule_file(&file)?;
    let settings = ModelSettings::resolve(&file.model, overrides)?;

    emit(
        &ctx.info(event_names::CONFIG_LOADED, Stage::Init, "Loaded rule file")
            .with_field("path", path.display().to_string())
            .with_field("rules", file.rules.len())
            .with_field("settings", settings),
    );
    Ok((file, settings))
}

fn print_report(global: &GlobalOpts, report: &StatisticalReport) -> ft_common::Result<()> {
    match global.format {
        OutputFormat::Text => print!("{}", report.render_text(global.use_color())),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Md => print!("{}", report.render_markdown()),
        OutputFormat::Summary => println!("{}", report.render_summary()),
    }
    Ok(())
}

fn run_check(global: &GlobalOpts, ctx: &LogContext, args: &CheckArgs) -> ExitCode {
    let checked = load_rule_file(ctx, &args.rules, &SettingsOverrides::default())
        .and_then(|(file, settings)| Ok((rules_from_file(&file)?, settings)));

    let (rules, settings) = match checked {
        Ok(checked) => checked,
        Err(err) => return output_error(global, ctx, &err),
    };

    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "status": "valid",
                "path": args.rules.display().to_string(),
                "settings": settings,
                "rules": rules,
            });
            match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{}", json),
                Err(e) => return output_error(global, ctx, &e.into()),
            }
        }
        OutputFormat::Summary => {
            println!("{}: {} rules valid", args.rules.display(), rules.len());
        }
        OutputFormat::Text | OutputFormat::Md => {
            println!("Rule file: {}", args.rules.display());
            println!(
                "Timeouts: active {}s, inactive {}s",
                settings.active_timeout, settings.inactive_timeout
            );
            if let Some(start) = settings.start_time {
                println!(
                    "Start time: {} ({})",
                    ft_common::format_timestamp(start),
                    settings.offset_scope
                );
            }
            for (index, rule) in rules.iter().enumerate() {
                let metrics: Vec<String> = rule
                    .metrics
                    .iter()
                    .map(|m| format!("{}<={}", m.key(), m.tolerance()))
                    .collect();
                let segment = rule
                    .segment
                    .as_ref()
                    .map_or_else(|| "whole dataset".to_string(), |s| s.to_string());
                let name = rule
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("rule #{}", index + 1));
                println!("  {}: {} [{}]", name, metrics.join(", "), segment);
            }
        }
    }

    ExitCode::Passing
}

fn run_inspect(global: &GlobalOpts, ctx: &LogContext, args: &InspectArgs) -> ExitCode {
    let records = match load_flows(&args.file) {
        Ok(records) => records,
        Err(e) => return output_error(global, ctx, &e.into()),
    };
    let timeouts = Timeouts::from_secs(args.active_timeout, args.inactive_timeout);
    let (flows, stats) = match reconcile(&records, timeouts) {
        Ok(result) => result,
        Err(e) => return output_error(global, ctx, &e.into()),
    };

    let packets = aggregate(&flows, MetricType::Packets);
    let bytes = aggregate(&flows, MetricType::Bytes);

    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "path": args.file.display().to_string(),
                "timeouts": timeouts,
                "reconcile": stats,
                "packets": packets,
                "bytes": bytes,
            });
            match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{}", json),
                Err(e) => return output_error(global, ctx, &e.into()),
            }
        }
        OutputFormat::Summary => {
            println!(
                "{}: {} records, {} flows, {} packets, {} bytes",
                args.file.display(),
                stats.records_in,
                stats.flows_out,
                packets,
                bytes
            );
        }
        OutputFormat::Text | OutputFormat::Md => {
            println!("File:     {}", args.file.display());
            println!("Records:  {}", stats.records_in);
            println!("Flows:    {} ({} merges, {} keys)", stats.flows_out, stats.merges, stats.keys);
            println!("Conversations: {}", stats.conversations);
            println!("Packets:  {}", packets);
            println!("Bytes:    {}", bytes);
        }
    }

    ExitCode::Passing
}

fn print_version(global: &GlobalOpts) {
    let version = env!("CARGO_PKG_VERSION");
    match global.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "name": "ft-analyzer", "version": version })
            );
        }
        _ => println!("ft-analyzer {}", version),
    }
}

/// Report an error on stderr and map it to an exit code.
fn output_error(global: &GlobalOpts, ctx: &LogContext, err: &ft_common::Error) -> ExitCode {
    let exit_code = ExitCode::from(err.category());
    let event = match err.category() {
        ErrorCategory::Config => event_names::CONFIG_ERROR,
        _ => event_names::INPUT_ERROR,
    };
    emit(
        &ctx.error(event, Stage::Init, err.to_string())
            .with_field("code", err.code())
            .with_field("category", err.category()),
    );

    match global.format {
        OutputFormat::Json => {
            eprintln!("{}", StructuredError::from(err).to_json());
        }
        _ => {
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            eprintln!("{}", format_error_human(err, use_color));
        }
    }

    exit_code
}
