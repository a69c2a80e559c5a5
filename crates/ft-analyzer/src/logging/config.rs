//! Where the log level and format come from.
//!
//! Lowest to highest precedence: built-in defaults (info, human), then
//! `RUST_LOG`, then `FT_LOG` (which shadows `RUST_LOG` entirely), then
//! `FT_LOG_FORMAT`, then `-v`/`-q`/`--log-format`.

use std::fmt;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// Shape of the records written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.trim().to_ascii_lowercase().as_str() {
            "human" | "pretty" | "console" => LogFormat::Human,
            "jsonl" | "json" => LogFormat::Jsonl,
            other => return Err(format!("unknown log format '{other}' (expected human or jsonl)")),
        };
        Ok(format)
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        })
    }
}

/// Verbosity threshold, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

// Index order matches the declaration order above.
static LEVELS: [(LogLevel, &str, LevelFilter); 6] = [
    (LogLevel::Trace, "trace", LevelFilter::TRACE),
    (LogLevel::Debug, "debug", LevelFilter::DEBUG),
    (LogLevel::Info, "info", LevelFilter::INFO),
    (LogLevel::Warn, "warn", LevelFilter::WARN),
    (LogLevel::Error, "error", LevelFilter::ERROR),
    (LogLevel::Off, "off", LevelFilter::OFF),
];

impl LogLevel {
    fn entry(self) -> &'static (LogLevel, &'static str, LevelFilter) {
        &LEVELS[self as usize]
    }

    /// One step more verbose; trace stays trace.
    pub fn louder(self) -> Self {
        LEVELS[(self as usize).saturating_sub(1)].0
    }

    /// Level requested by the `-q` flag and `-v` count, if any.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Option<Self> {
        if quiet {
            return Some(LogLevel::Error);
        }
        (verbose > 0).then(|| (0..verbose).fold(LogLevel::Info, |level, _| level.louder()))
    }

    /// Most verbose level named in a `RUST_LOG` directive list.
    ///
    /// Accepts bare levels and `target=level` pairs; anything else is skipped.
    fn from_directives(directives: &str) -> Option<Self> {
        directives
            .split(',')
            .filter_map(|directive| {
                let level = directive.rsplit_once('=').map_or(directive, |(_, level)| level);
                level.parse::<LogLevel>().ok()
            })
            .min()
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let alias = match wanted.as_str() {
            "warning" => "warn",
            "none" | "quiet" => "off",
            other => other,
        };
        LEVELS
            .iter()
            .find(|(_, name, _)| *name == alias)
            .map(|(level, _, _)| *level)
            .ok_or_else(|| format!("unknown log level '{wanted}'"))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry().1)
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        level.entry().2
    }
}

/// Resolved logging settings handed to [`init_logging`](super::init_logging).
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Prefix human records with a timestamp.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::default(),
            level: LogLevel::default(),
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment, then apply CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), cli_level, cli_format)
    }

    /// Resolve with variables read through `lookup`.
    ///
    /// Unparseable values leave the lower layer in place.
    pub fn from_lookup<F>(
        lookup: F,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_level = match lookup("FT_LOG") {
            Some(value) => value.parse().ok(),
            None => lookup("RUST_LOG").and_then(|value| LogLevel::from_directives(&value)),
        };
        let env_format = lookup("FT_LOG_FORMAT").and_then(|value| value.parse().ok());

        let defaults = LogConfig::default();
        LogConfig {
            level: cli_level.or(env_level).unwrap_or(defaults.level),
            format: cli_format.or(env_format).unwrap_or(defaults.format),
            ..defaults
        }
    }

    pub fn with_format(self, format: LogFormat) -> Self {
        LogConfig { format, ..self }
    }

    pub fn with_level(self, level: LogLevel) -> Self {
        LogConfig { level, ..self }
    }

    pub fn with_timestamps(self, timestamps: bool) -> Self {
        LogConfig { timestamps, ..self }
    }
}
