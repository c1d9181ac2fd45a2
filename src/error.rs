//! Error types for harness operations.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Step of revision provisioning that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    /// Source checkout of the tagged revision
    Fetch,
    /// Build configuration (cmake)
    Configure,
    /// Compilation (make)
    Build,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionStep::Fetch => "fetch",
            ProvisionStep::Configure => "configure",
            ProvisionStep::Build => "build",
        };
        f.write_str(name)
    }
}

/// A revision could not be fetched, configured or built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionError {
    pub revision: String,
    pub step: ProvisionStep,
    pub detail: String,
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Revision {} failed at {} step: {}",
            self.revision, self.step, self.detail
        )
    }
}

impl std::error::Error for ProvisionError {}

/// Error type for malformed engine protocol commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Empty command line
    Empty,
    /// Coordinate move is not four characters of `<file><rank><file><rank>`
    InvalidMove { notation: String },
    /// Search method not known to the engine
    UnknownSearchMethod { name: String },
    /// Command is missing a required argument
    MissingArgument { command: &'static str, argument: &'static str },
    /// Numeric argument failed to parse
    InvalidNumber { command: &'static str, value: String },
    /// Command word not recognised
    Unknown { line: String },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "Empty command"),
            CommandError::InvalidMove { notation } => {
                write!(f, "Invalid coordinate move '{notation}'")
            }
            CommandError::UnknownSearchMethod { name } => {
                write!(f, "Unknown search method '{name}'")
            }
            CommandError::MissingArgument { command, argument } => {
                write!(f, "Command '{command}' is missing argument <{argument}>")
            }
            CommandError::InvalidNumber { command, value } => {
                write!(f, "Command '{command}' expects a number, found '{value}'")
            }
            CommandError::Unknown { line } => write!(f, "Unknown command '{line}'"),
        }
    }
}

impl std::error::Error for CommandError {}

/// Top-level error type of the harness.
#[derive(Debug)]
pub enum HarnessError {
    /// Configured executable path resolves to no runnable file
    ExecutableNotFound { path: PathBuf },
    /// Process creation failed after the path check passed
    Spawn { program: PathBuf, source: io::Error },
    /// Filesystem or pipe failure
    Io { context: String, source: io::Error },
    /// Engine did not terminate within the configured limit
    Timeout { program: PathBuf, limit: Duration },
    /// Revision provisioning failed
    Provision(ProvisionError),
    /// Captured output does not contain the expected board text
    AssertionMismatch {
        scenario: String,
        expected: String,
        output: String,
    },
    /// Malformed protocol command
    InvalidCommand(CommandError),
    /// Inconsistent harness configuration
    Config(String),
}

impl HarnessError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        HarnessError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the error must stop the whole run rather than a single row or scenario.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::ExecutableNotFound { .. } | HarnessError::Config(_)
        )
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::ExecutableNotFound { path } => write!(
                f,
                "No chx executable at '{}'; pass its path on the command line",
                path.display()
            ),
            HarnessError::Spawn { program, source } => {
                write!(f, "Failed to start '{}': {source}", program.display())
            }
            HarnessError::Io { context, source } => write!(f, "{context}: {source}"),
            HarnessError::Timeout { program, limit } => write!(
                f,
                "'{}' did not finish within {:.3}s",
                program.display(),
                limit.as_secs_f64()
            ),
            HarnessError::Provision(e) => write!(f, "{e}"),
            HarnessError::AssertionMismatch {
                scenario,
                expected,
                output,
            } => write!(
                f,
                "Scenario '{scenario}' failed.\n--- expected ---\n{expected}\n--- captured output ---\n{output}"
            ),
            HarnessError::InvalidCommand(e) => write!(f, "{e}"),
            HarnessError::Config(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Spawn { source, .. } | HarnessError::Io { source, .. } => Some(source),
            HarnessError::Provision(e) => Some(e),
            HarnessError::InvalidCommand(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProvisionError> for HarnessError {
    fn from(e: ProvisionError) -> Self {
        HarnessError::Provision(e)
    }
}

impl From<CommandError> for HarnessError {
    fn from(e: CommandError) -> Self {
        HarnessError::InvalidCommand(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_error_names_revision_and_step() {
        let err = ProvisionError {
            revision: "5433".to_string(),
            step: ProvisionStep::Configure,
            detail: "cmake exited with status 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("5433"));
        assert!(msg.contains("configure"));
        assert!(msg.contains("status 1"));
    }

    #[test]
    fn test_command_error_invalid_move() {
        let err = CommandError::InvalidMove {
            notation: "e9e4".to_string(),
        };
        assert!(err.to_string().contains("'e9e4'"));
    }

    #[test]
    fn test_missing_argument() {
        let err = CommandError::MissingArgument {
            command: "bench",
            argument: "ply",
        };
        assert!(err.to_string().contains("<ply>"));
    }

    #[test]
    fn test_executable_not_found_is_fatal() {
        let err = HarnessError::ExecutableNotFound {
            path: PathBuf::from("/nowhere/chx"),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/nowhere/chx"));
    }

    #[test]
    fn test_provision_failure_is_local() {
        let err: HarnessError = ProvisionError {
            revision: "6723".to_string(),
            step: ProvisionStep::Build,
            detail: "make failed".to_string(),
        }
        .into();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_mismatch_reports_output() {
        let err = HarnessError::AssertionMismatch {
            scenario: "castling".to_string(),
            expected: "1  . . K R".to_string(),
            output: "banner\n1  R . . .".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("castling"));
        assert!(msg.contains("1  . . K R"));
        assert!(msg.contains("banner"));
    }

    #[test]
    fn test_timeout_message() {
        let err = HarnessError::Timeout {
            program: PathBuf::from("chx"),
            limit: Duration::from_millis(1500),
        };
        assert!(err.to_string().contains("1.500s"));
    }
}
