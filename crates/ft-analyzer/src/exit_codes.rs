//! Exit codes for the ft-analyzer CLI.
//!
//! Exit code ranges:
//! - 0-1: Validation outcomes (all tests passed / some failed)
//! - 10-19: User/input errors (fixable by changing arguments or files)
//! - 20-29: Internal errors

use ft_common::ErrorCategory;

/// Exit codes for analyzer commands.
///
/// These codes are a stable contract for CI harnesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every test outcome passed (or the command succeeded).
    Passing = 0,

    /// At least one test outcome failed its tolerance.
    Failing = 1,

    /// Invalid arguments.
    ArgsError = 10,

    /// Flow file missing, unreadable, malformed or unorderable.
    InputError = 11,

    /// Invalid rule (duplicate metric, bad tolerance, bad segment).
    RuleError = 12,

    /// Rule file cannot be read or parsed.
    ConfigError = 13,

    /// Internal error (bug - please report).
    InternalError = 20,

    /// Output I/O failure.
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Codes below 10 report a validation outcome, not an error.
    pub fn is_outcome(self) -> bool {
        (self as i32) < 10
    }

    /// Codes 10-19.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Stable name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Passing => "OK_PASSING",
            ExitCode::Failing => "OK_FAILING",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::RuleError => "ERR_RULE",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    pub fn from_outcome(passing: bool) -> Self {
        if passing {
            ExitCode::Passing
        } else {
            ExitCode::Failing
        }
    }
}

impl From<ErrorCategory> for ExitCode {
    fn from(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Input => ExitCode::InputError,
            ErrorCategory::Rule | ErrorCategory::Parameter => ExitCode::RuleError,
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
