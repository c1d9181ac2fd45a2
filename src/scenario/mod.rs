//! Move-sequence scenarios checked against the current executable.
//!
//! Each scenario plays a fixed list of coordinate moves, dumps the board with
//! `d` and passes when the captured output contains the expected board text.

pub mod board;

use std::time::Duration;

use log::{info, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::process::{is_executable, EngineRunner, Invocation, ScratchFile};
use crate::protocol::ProtocolScript;

use board::BoardGrid;

/// A scripted game position and the board dump it must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    /// Literal engine input
    pub script: &'static str,
    /// Text that must appear verbatim in the engine output
    pub expected: &'static str,
}

/// White captures en passant on d6 after black's double pawn push.
pub const EN_PASSANT: Scenario = Scenario {
    name: "en_passant",
    script: "e2e4\nh7h6\ne4e5\nd7d5\ne5d6\nd\nquit\n",
    expected: "8  r n b q k b n r\n\
               7  p p p . p p p .\n\
               6  . . . P . . . p\n\
               5  . . . . . . . .\n\
               4  . . . . . . . .\n\
               3  . . . . . . . .\n\
               2  P P P P . P P P\n\
               1  R N B Q K B N R",
};

/// Both sides castle queenside after clearing the back rank.
pub const CASTLING: Scenario = Scenario {
    name: "castling",
    script: "\na2a3\na7a6\nb1c3\nb8c6\nb2b3\nb7b6\nc1b2\nc8b7\nd2d3\nd7d6\nd1d2\nd8d7\ne1c1\ne8c8\nd\nquit\n\n",
    expected: "\n8  . . k r . b n r\n7  . b p q p p p p\n6  p p n p . . . .\n5  . . . . . . . .\n4  . . . . . . . .\n3  P P N P . . . .\n2  . B P Q P P P P\n1  . . K R . B N R\n\n   a b c d e f g h\n",
};

pub const ALL: [Scenario; 2] = [EN_PASSANT, CASTLING];

/// A scenario that passed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutcome {
    pub name: &'static str,
    pub output: String,
    pub elapsed: Duration,
}

impl Scenario {
    #[must_use]
    pub fn by_name(name: &str) -> Option<Scenario> {
        ALL.iter().copied().find(|s| s.name == name)
    }

    /// Feed the script to the current executable and check its output.
    ///
    /// A missing executable is a configuration error; a wrong board is an
    /// [`HarnessError::AssertionMismatch`] carrying the full output.
    pub fn run<R: EngineRunner>(
        &self,
        runner: &R,
        config: &HarnessConfig,
    ) -> Result<ScenarioOutcome, HarnessError> {
        if !is_executable(&config.current_exe) {
            return Err(HarnessError::ExecutableNotFound {
                path: config.current_exe.clone(),
            });
        }
        let script = ProtocolScript::parse(self.script)?;
        if !script.is_terminated() {
            warn!("scenario {} does not end with quit and may hang", self.name);
        }
        info!("Running scenario {}", self.name);
        let staged = ScratchFile::write(&config.scratch_dir, "test", script.text())?;
        let invocation = Invocation::new(&config.current_exe).stdin_file(staged.path());
        let result = runner.run(&invocation)?;
        self.check(&result.stdout)?;
        Ok(ScenarioOutcome {
            name: self.name,
            output: result.stdout,
            elapsed: result.elapsed,
        })
    }

    /// Pass when `output` contains the expected text.
    pub fn check(&self, output: &str) -> Result<(), HarnessError> {
        if output.contains(self.expected) {
            return Ok(());
        }
        if self.board_matches(output) {
            warn!("{}: board is right but laid out differently", self.name);
        } else if let (Some(want), Some(got)) =
            (BoardGrid::parse(self.expected), BoardGrid::parse(output))
        {
            for diff in want.differences(&got) {
                warn!("{}: {diff}", self.name);
            }
        }
        Err(HarnessError::AssertionMismatch {
            scenario: self.name.to_string(),
            expected: self.expected.to_string(),
            output: output.to_string(),
        })
    }

    /// Compare the first dump in `output` square by square.
    ///
    /// Looser than [`Scenario::check`]: spacing and the file footer are
    /// ignored. Used to explain a failed check, never to pass one.
    #[must_use]
    pub fn board_matches(&self, output: &str) -> bool {
        match (BoardGrid::parse(self.expected), BoardGrid::parse(output)) {
            (Some(want), Some(got)) => want == got,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ExecutionResult;

    /// Answers every invocation with canned output.
    struct CannedRunner(String);

    impl EngineRunner for CannedRunner {
        fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, HarnessError> {
            assert!(invocation.stdin_path().is_some());
            Ok(ExecutionResult {
                stdout: self.0.clone(),
                elapsed: Duration::from_millis(3),
                exit_code: Some(0),
            })
        }
    }

    #[test]
    fn test_fixture_shapes() {
        assert!(EN_PASSANT.script.ends_with("e5d6\nd\nquit\n"));
        assert!(!EN_PASSANT.expected.starts_with('\n'));
        assert!(!EN_PASSANT.expected.ends_with('\n'));
        assert!(CASTLING.script.starts_with("\na2a3\n"));
        assert!(CASTLING.script.ends_with("d\nquit\n\n"));
        assert!(CASTLING.expected.starts_with("\n8  . . k r"));
        assert!(CASTLING.expected.ends_with("\n\n   a b c d e f g h\n"));
        assert_eq!(EN_PASSANT.expected.lines().count(), 8);
    }

    #[test]
    fn test_fixture_scripts_are_well_formed() {
        for case in ALL {
            let script = ProtocolScript::parse(case.script).unwrap();
            assert!(script.is_terminated(), "{}", case.name);
        }
    }

    #[test]
    fn test_en_passant_grid() {
        let grid = BoardGrid::parse(EN_PASSANT.expected).unwrap();
        assert_eq!(grid.square('d', 6), Some('P'));
        assert_eq!(grid.square('d', 5), Some('.'));
        assert_eq!(grid.square('d', 7), Some('.'));
        assert_eq!(grid.to_string(), EN_PASSANT.expected);
    }

    #[test]
    fn test_castling_grid() {
        let grid = BoardGrid::parse(CASTLING.expected).unwrap();
        assert_eq!(grid.square('c', 1), Some('K'));
        assert_eq!(grid.square('d', 1), Some('R'));
        assert_eq!(grid.square('c', 8), Some('k'));
        assert_eq!(grid.square('d', 8), Some('r'));
        assert_eq!(grid.square('e', 1), Some('.'));
    }

    #[test]
    fn test_check_finds_substring() {
        let output = format!("CHX\n> \n{}\n\n   a b c d e f g h\n> ", EN_PASSANT.expected);
        assert!(EN_PASSANT.check(&output).is_ok());
        assert!(EN_PASSANT.board_matches(&output));
    }

    #[test]
    fn test_mismatch_carries_output() {
        let output = "8  r n b q k b n r\nsomething else";
        match CASTLING.check(output) {
            Err(HarnessError::AssertionMismatch { scenario, expected, output: got }) => {
                assert_eq!(scenario, "castling");
                assert_eq!(expected, CASTLING.expected);
                assert_eq!(got, output);
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_board_match_ignores_spacing() {
        let spaced = EN_PASSANT.expected.replace("  ", "   ");
        assert!(EN_PASSANT.check(&spaced).is_err());
        assert!(EN_PASSANT.board_matches(&spaced));
    }

    #[test]
    fn test_board_match_never_passes_a_wrong_board() {
        let castled = CASTLING.expected.to_string();
        assert!(!EN_PASSANT.board_matches(&castled));
        assert!(matches!(
            EN_PASSANT.check(&castled),
            Err(HarnessError::AssertionMismatch { .. })
        ));
        assert!(!EN_PASSANT.board_matches("no board here"));
    }

    #[test]
    fn test_missing_executable_aborts() {
        let config = HarnessConfig::default().with_current_exe("/no/such/chx");
        let runner = CannedRunner(String::new());
        let err = EN_PASSANT.run(&runner, &config).unwrap_err();
        assert!(matches!(err, HarnessError::ExecutableNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_canned_output() {
        let config = HarnessConfig::default()
            .with_current_exe("/bin/sh")
            .with_scratch_dir(std::env::temp_dir());
        let runner = CannedRunner(format!("banner\n{}", EN_PASSANT.expected));
        let outcome = EN_PASSANT.run(&runner, &config).unwrap();
        assert_eq!(outcome.name, "en_passant");
        assert!(CASTLING.run(&runner, &config).is_err());
    }

    #[test]
    fn test_by_name() {
        assert_eq!(Scenario::by_name("castling"), Some(CASTLING));
        assert!(Scenario::by_name("stalemate").is_none());
    }
}
