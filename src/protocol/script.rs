//! Input scripts fed to the engine.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::bench::BenchmarkConfig;
use crate::config::{Dialect, HarnessConfig};
use crate::error::CommandError;
use crate::process::Invocation;

use super::command::{parse_engine_command, EngineCommand};

/// Flag older revisions use to load a settings file.
pub const SETTINGS_FLAG: &str = "-s";

/// Text payload for one engine invocation, tagged with its dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolScript {
    dialect: Dialect,
    text: String,
}

impl ProtocolScript {
    /// Render a sequence of unified-dialect commands, one per line.
    #[must_use]
    pub fn from_commands(commands: &[EngineCommand]) -> Self {
        let mut text = String::new();
        for cmd in commands {
            let _ = writeln!(text, "{cmd}");
        }
        ProtocolScript {
            dialect: Dialect::Unified,
            text,
        }
    }

    /// Parse literal unified-dialect text, rejecting malformed lines.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            parse_engine_command(line)?;
        }
        Ok(ProtocolScript {
            dialect: Dialect::Unified,
            text: text.to_string(),
        })
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the engine will exit on its own after consuming the script.
    ///
    /// Settings files always select benchmark mode, which exits when done.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        match self.dialect {
            Dialect::Ini => true,
            Dialect::Unified => self
                .text
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .and_then(|l| parse_engine_command(l).ok())
                .is_some_and(|cmd| cmd.is_terminal()),
        }
    }

    /// Invocation of `program` with this script staged at `staged`.
    ///
    /// Unified scripts are redirected to standard input; settings files are
    /// passed by path.
    #[must_use]
    pub fn invocation(&self, program: &Path, staged: &Path) -> Invocation {
        match self.dialect {
            Dialect::Ini => Invocation::new(program).arg(SETTINGS_FLAG).arg(staged),
            Dialect::Unified => Invocation::new(program).stdin_file(staged),
        }
    }
}

/// Builds benchmark scripts for either dialect.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    inputs_dir: PathBuf,
    runs: u32,
}

impl ScriptBuilder {
    #[must_use]
    pub fn new(inputs_dir: impl Into<PathBuf>, runs: u32) -> Self {
        ScriptBuilder {
            inputs_dir: inputs_dir.into(),
            runs,
        }
    }

    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(&config.inputs_dir, config.bench_runs)
    }

    fn board_path(&self, board: &str) -> String {
        self.inputs_dir.join(board).display().to_string()
    }

    #[must_use]
    pub fn build(&self, config: &BenchmarkConfig, dialect: Dialect) -> ProtocolScript {
        match dialect {
            Dialect::Unified => self.unified(config),
            Dialect::Ini => self.ini(config),
        }
    }

    fn unified(&self, config: &BenchmarkConfig) -> ProtocolScript {
        ProtocolScript::from_commands(&[
            EngineCommand::Search(config.method),
            EngineCommand::Eval(config.eval_method.clone()),
            EngineCommand::Bench {
                board: self.board_path(&config.board),
                ply: config.ply,
                runs: self.runs,
            },
        ])
    }

    fn ini(&self, config: &BenchmarkConfig) -> ProtocolScript {
        let mut text = String::new();
        let _ = writeln!(text, "[CHX Main]");
        let _ = writeln!(text, "search_method = {}", config.method.ini_name());
        let _ = writeln!(text, "eval_method = {}", config.eval_method);
        let _ = writeln!(text);
        let _ = writeln!(text, "[Benchmark]");
        let _ = writeln!(text, "mode=true");
        let _ = writeln!(text, "file={}", self.board_path(&config.board));
        let _ = writeln!(text, "max_ply={}", config.ply);
        let _ = writeln!(text, "num_runs={}", self.runs);
        ProtocolScript {
            dialect: Dialect::Ini,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SearchMethod;
    use proptest::prelude::*;
    use std::ffi::OsString;

    fn ini_value<'a>(text: &'a str, section: &str, key: &str) -> Option<&'a str> {
        let header = format!("[{section}]");
        let mut in_section = false;
        for line in text.lines().map(str::trim) {
            if line.starts_with('[') {
                in_section = line == header;
            } else if in_section {
                if let Some((k, v)) = line.split_once('=') {
                    if k.trim() == key {
                        return Some(v.trim());
                    }
                }
            }
        }
        None
    }

    fn config(method: SearchMethod, board: &str, ply: u32) -> BenchmarkConfig {
        BenchmarkConfig::new(method, board, ply)
    }

    #[test]
    fn test_unified_script() {
        let builder = ScriptBuilder::new("../inputs", 1);
        let script = builder.build(&config(SearchMethod::Mtdf, "board3", 4), Dialect::Unified);
        assert_eq!(
            script.text(),
            "search mtdf\neval original\nbench ../inputs/board3 4 1\n"
        );
        assert!(script.is_terminated());
    }

    #[test]
    fn test_ini_script_renames_mtdf() {
        let builder = ScriptBuilder::new("../inputs", 1);
        let cfg = config(SearchMethod::Mtdf, "board1", 2);
        let script = builder.build(&cfg, Dialect::Ini);
        assert_eq!(ini_value(script.text(), "CHX Main", "search_method"), Some("mtd-f"));
        assert_eq!(ini_value(script.text(), "CHX Main", "eval_method"), Some("original"));
        assert_eq!(ini_value(script.text(), "Benchmark", "mode"), Some("true"));
        assert_eq!(ini_value(script.text(), "Benchmark", "file"), Some("../inputs/board1"));
        assert_eq!(ini_value(script.text(), "Benchmark", "max_ply"), Some("2"));
        assert_eq!(ini_value(script.text(), "Benchmark", "num_runs"), Some("1"));
        // the canonical name is untouched for reporting
        assert_eq!(cfg.method.name(), "mtdf");
    }

    #[test]
    fn test_parse_and_termination() {
        let script = ProtocolScript::parse("e2e4\nd\nquit\n").unwrap();
        assert!(script.is_terminated());
        let script = ProtocolScript::parse("e2e4\nd\n").unwrap();
        assert!(!script.is_terminated());
        assert!(ProtocolScript::parse("e2e4\nzz\n").is_err());
    }

    #[test]
    fn test_invocations() {
        let builder = ScriptBuilder::new("../inputs", 1);
        let cfg = config(SearchMethod::Minimax, "board1", 2);
        let exe = Path::new("chx_5433/src/chx");
        let staged = Path::new(".test");

        let ini = builder.build(&cfg, Dialect::Ini).invocation(exe, staged);
        assert_eq!(ini.args(), &[OsString::from("-s"), OsString::from(".test")]);
        assert!(ini.stdin_path().is_none());

        let unified = builder.build(&cfg, Dialect::Unified).invocation(exe, staged);
        assert!(unified.args().is_empty());
        assert_eq!(unified.stdin_path(), Some(staged));
    }

    fn method_strategy() -> impl Strategy<Value = SearchMethod> {
        prop::sample::select(SearchMethod::ALL.to_vec())
    }

    proptest! {
        /// Unified scripts are exactly search, eval, bench with values substituted verbatim
        #[test]
        fn prop_unified_three_lines(
            method in method_strategy(),
            board in "board[0-9]{1,2}",
            ply in 2u32..=5,
        ) {
            let builder = ScriptBuilder::new("../inputs", 1);
            let script = builder.build(&config(method, &board, ply), Dialect::Unified);
            let lines: Vec<&str> = script.text().lines().collect();
            prop_assert_eq!(lines.len(), 3);
            prop_assert_eq!(lines[0].to_string(), format!("search {}", method.name()));
            prop_assert_eq!(lines[1], "eval original");
            prop_assert_eq!(lines[2].to_string(), format!("bench ../inputs/{board} {ply} 1"));
        }

        /// Only mtdf is respelled, and only in the settings file
        #[test]
        fn prop_ini_method_spelling(method in method_strategy(), ply in 2u32..=5) {
            let builder = ScriptBuilder::new("../inputs", 1);
            let script = builder.build(&config(method, "board1", ply), Dialect::Ini);
            let expected = if method == SearchMethod::Mtdf { "mtd-f" } else { method.name() };
            prop_assert_eq!(ini_value(script.text(), "CHX Main", "search_method"), Some(expected));
        }
    }
}
