//! Structured logging.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for CI harnesses
//!
//! # Usage
//!
//! ```ignore
//! use ft_analyzer::logging::{
//!     emit, event_names, generate_run_id, init_logging, LogConfig, LogContext, Stage,
//! };
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config);
//!
//! let ctx = LogContext::new(generate_run_id());
//! emit(&ctx.info(event_names::RUN_STARTED, Stage::Init, "Starting validation"));
//! ```
//!
//! stdout is reserved for the report; all log output goes to stderr.

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, LogContext, LogEvent, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// Must be called once at startup. `RUST_LOG` directives, when set, replace
/// the level from `config`.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from(config.level).into())
            .parse_lossy("")
    });

    // try_init: tests and embedders may have installed a subscriber already.
    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init();
            } else {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init();
            }
        }
        LogFormat::Jsonl => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(JsonlLayer::stderr())
                .try_init();
        }
    }
}

/// Forward a prepared [`LogEvent`] to the active subscriber.
pub fn emit(event: &LogEvent) {
    let fields = if event.fields.is_empty() {
        None
    } else {
        serde_json::to_string(&event.fields).ok()
    };
    macro_rules! forward {
        ($level:ident) => {
            tracing::$level!(
                event = %event.event,
                run_id = %event.run_id,
                stage = %event.stage,
                extra = fields.as_deref(),
                "{}",
                event.message
            )
        };
    }
    match event.level {
        Level::Trace => forward!(trace),
        Level::Debug => forward!(debug),
        Level::Info => forward!(info),
        Level::Warn => forward!(warn),
        Level::Error => forward!(error),
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    // First 12 hex chars are enough to correlate one run's lines.
    format!("run-{}", &uuid.simple().to_string()[..12])
}
