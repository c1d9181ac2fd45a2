//! Engine command-line protocol.
//!
//! Every command is a single line on the engine's standard input:
//! coordinate moves (`e2e4`), `d` to dump the board, `quit`, and the
//! benchmark controls `search`, `eval` and `bench`.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Search algorithm selectable with `search <name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SearchMethod {
    Minimax,
    AlphaBeta,
    Mtdf,
}

impl SearchMethod {
    pub const ALL: [SearchMethod; 3] = [
        SearchMethod::Minimax,
        SearchMethod::AlphaBeta,
        SearchMethod::Mtdf,
    ];

    /// Canonical name, used by the unified dialect and in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SearchMethod::Minimax => "minimax",
            SearchMethod::AlphaBeta => "alphabeta",
            SearchMethod::Mtdf => "mtdf",
        }
    }

    /// Spelling expected by the settings file of ini-dialect revisions.
    #[must_use]
    pub const fn ini_name(self) -> &'static str {
        match self {
            SearchMethod::Mtdf => "mtd-f",
            other => other.name(),
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchMethod {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimax" => Ok(SearchMethod::Minimax),
            "alphabeta" => Ok(SearchMethod::AlphaBeta),
            "mtdf" | "mtd-f" => Ok(SearchMethod::Mtdf),
            other => Err(CommandError::UnknownSearchMethod {
                name: other.to_string(),
            }),
        }
    }
}

/// A single line of the engine's input protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Coordinate move, from-square then to-square
    Move(String),
    /// Print the board
    Dump,
    /// Terminate the engine
    Quit,
    /// Select the search algorithm
    Search(SearchMethod),
    /// Select the evaluation method
    Eval(String),
    /// Run a benchmark on a board file, then exit
    Bench { board: String, ply: u32, runs: u32 },
}

impl EngineCommand {
    /// Validate and wrap a coordinate move such as `e2e4`.
    pub fn coordinate_move(notation: &str) -> Result<Self, CommandError> {
        if is_coordinate_move(notation) {
            Ok(EngineCommand::Move(notation.to_string()))
        } else {
            Err(CommandError::InvalidMove {
                notation: notation.to_string(),
            })
        }
    }

    /// Whether the engine exits after processing this command.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineCommand::Quit | EngineCommand::Bench { .. })
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::Move(mv) => f.write_str(mv),
            EngineCommand::Dump => f.write_str("d"),
            EngineCommand::Quit => f.write_str("quit"),
            EngineCommand::Search(method) => write!(f, "search {method}"),
            EngineCommand::Eval(name) => write!(f, "eval {name}"),
            EngineCommand::Bench { board, ply, runs } => write!(f, "bench {board} {ply} {runs}"),
        }
    }
}

impl FromStr for EngineCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        parse_engine_command(line)
    }
}

fn is_coordinate_move(notation: &str) -> bool {
    let bytes = notation.as_bytes();
    bytes.len() == 4
        && (b'a'..=b'h').contains(&bytes[0])
        && (b'1'..=b'8').contains(&bytes[1])
        && (b'a'..=b'h').contains(&bytes[2])
        && (b'1'..=b'8').contains(&bytes[3])
}

fn parse_number(command: &'static str, value: &str) -> Result<u32, CommandError> {
    value.parse::<u32>().map_err(|_| CommandError::InvalidNumber {
        command,
        value: value.to_string(),
    })
}

/// Parse one protocol line.
pub fn parse_engine_command(line: &str) -> Result<EngineCommand, CommandError> {
    let trimmed = line.trim();
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    let Some(&head) = parts.first() else {
        return Err(CommandError::Empty);
    };

    let cmd = match head {
        "d" => EngineCommand::Dump,
        "quit" | "exit" => EngineCommand::Quit,
        "search" => {
            let name = parts.get(1).ok_or(CommandError::MissingArgument {
                command: "search",
                argument: "method",
            })?;
            EngineCommand::Search(name.parse()?)
        }
        "eval" => {
            let name = parts.get(1).ok_or(CommandError::MissingArgument {
                command: "eval",
                argument: "method",
            })?;
            EngineCommand::Eval((*name).to_string())
        }
        "bench" => {
            let board = parts.get(1).ok_or(CommandError::MissingArgument {
                command: "bench",
                argument: "board",
            })?;
            let ply = parts.get(2).ok_or(CommandError::MissingArgument {
                command: "bench",
                argument: "ply",
            })?;
            let runs = match parts.get(3) {
                Some(runs) => parse_number("bench", runs)?,
                None => 1,
            };
            EngineCommand::Bench {
                board: (*board).to_string(),
                ply: parse_number("bench", ply)?,
                runs,
            }
        }
        mv if parts.len() == 1 && mv.len() == 4 => EngineCommand::coordinate_move(mv)?,
        _ => {
            return Err(CommandError::Unknown {
                line: trimmed.to_string(),
            })
        }
    };

    Ok(cmd)
}
