//! Harness configuration.
//!
//! A single immutable [`HarnessConfig`] is assembled at startup (defaults plus
//! command-line overrides) and handed by reference to every component.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::Lazy;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::process::is_executable;
use crate::protocol::SearchMethod;

/// Location of the locally built executable, relative to the testing folder.
pub const DEFAULT_CURRENT_EXE: &str = "../../build_chx/src/chx";

/// Source-control location historical revisions are checked out from.
pub const DEFAULT_REPOSITORY: &str =
    "https://svn.cct.lsu.edu/repos/projects/parallex/branches/chess/openmp";

/// Directory holding the benchmark board positions.
pub const DEFAULT_INPUTS_DIR: &str = "../inputs";

/// Evaluation method selected for every benchmark run.
pub const DEFAULT_EVAL_METHOD: &str = "original";

/// Built executable, relative to a revision's checkout.
pub const REVISION_EXE: &str = "src/chx";

/// Build-configuration file produced by the configure step.
pub const REVISION_BUILD_FILE: &str = "Makefile";

/// Revision label reserved for the locally built executable.
pub const CURRENT_LABEL: &str = "current";

/// Revisions benchmarked when none are given on the command line.
pub static DEFAULT_REVISIONS: Lazy<Vec<Revision>> = Lazy::new(|| {
    vec![
        Revision::new("5433", Dialect::Ini),
        Revision::new("5953", Dialect::Unified),
        Revision::new("6723", Dialect::Unified),
    ]
});

/// Input format understood by an engine revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Dialect {
    /// Settings file with `[CHX Main]` / `[Benchmark]` sections, passed with `-s`
    Ini,
    /// Line commands on standard input
    Unified,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Ini => f.write_str("ini"),
            Dialect::Unified => f.write_str("unified"),
        }
    }
}

impl FromStr for Dialect {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ini" => Ok(Dialect::Ini),
            "unified" => Ok(Dialect::Unified),
            other => Err(HarnessError::Config(format!(
                "unknown input dialect '{other}', expected 'ini' or 'unified'"
            ))),
        }
    }
}

/// A historical engine revision and the dialect it speaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Revision {
    pub id: String,
    pub dialect: Dialect,
}

impl Revision {
    #[must_use]
    pub fn new(id: impl Into<String>, dialect: Dialect) -> Self {
        Revision {
            id: id.into(),
            dialect,
        }
    }
}

/// Parses `<id>:<dialect>`, e.g. `5433:ini`.
impl FromStr for Revision {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, dialect) = s.split_once(':').ok_or_else(|| {
            HarnessError::Config(format!("revision '{s}' must look like <id>:<ini|unified>"))
        })?;
        let id = id.trim();
        if id.is_empty() {
            return Err(HarnessError::Config(format!("revision '{s}' has an empty id")));
        }
        Ok(Revision::new(id, dialect.parse()?))
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HarnessConfig {
    /// Locally built executable benchmarked as "current" and used by the scenarios
    pub current_exe: PathBuf,
    pub revisions: Vec<Revision>,
    pub repository: String,
    /// Parent of the `chx_<rev>` checkouts
    pub work_dir: PathBuf,
    pub inputs_dir: PathBuf,
    /// Where transient script files are written
    pub scratch_dir: PathBuf,
    pub methods: Vec<SearchMethod>,
    pub boards: Vec<String>,
    pub plies: Vec<u32>,
    pub eval_method: String,
    pub bench_runs: u32,
    /// Per-invocation limit; `None` waits for the engine indefinitely
    pub timeout: Option<Duration>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            current_exe: PathBuf::from(DEFAULT_CURRENT_EXE),
            revisions: DEFAULT_REVISIONS.clone(),
            repository: DEFAULT_REPOSITORY.to_string(),
            work_dir: PathBuf::from("."),
            inputs_dir: PathBuf::from(DEFAULT_INPUTS_DIR),
            scratch_dir: PathBuf::from("."),
            methods: SearchMethod::ALL.to_vec(),
            boards: (1..=4).map(|n| format!("board{n}")).collect(),
            plies: vec![2, 3, 4, 5],
            eval_method: DEFAULT_EVAL_METHOD.to_string(),
            bench_runs: 1,
            timeout: None,
        }
    }
}

impl HarnessConfig {
    #[must_use]
    pub fn with_current_exe(mut self, path: impl Into<PathBuf>) -> Self {
        self.current_exe = path.into();
        self
    }

    #[must_use]
    pub fn with_revisions(mut self, revisions: Vec<Revision>) -> Self {
        self.revisions = revisions;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_inputs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inputs_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_axes(
        mut self,
        methods: Vec<SearchMethod>,
        boards: Vec<String>,
        plies: Vec<u32>,
    ) -> Self {
        self.methods = methods;
        self.boards = boards;
        self.plies = plies;
        self
    }

    /// Path handed to the engine for a board name.
    #[must_use]
    pub fn board_path(&self, board: &str) -> PathBuf {
        self.inputs_dir.join(board)
    }

    /// Checkout directory of a revision, named deterministically from its id.
    #[must_use]
    pub fn revision_dir(&self, revision: &str) -> PathBuf {
        self.work_dir.join(format!("chx_{revision}"))
    }

    #[must_use]
    pub fn revision_exe(&self, revision: &str) -> PathBuf {
        self.revision_dir(revision).join(REVISION_EXE)
    }

    /// Check the settings that must hold before any subprocess is spawned.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if !is_executable(&self.current_exe) {
            return Err(HarnessError::ExecutableNotFound {
                path: self.current_exe.clone(),
            });
        }
        if self.bench_runs == 0 {
            return Err(HarnessError::Config("bench runs must be at least 1".to_string()));
        }
        if let Some(ply) = self.plies.iter().find(|&&p| p == 0) {
            return Err(HarnessError::Config(format!("ply depth {ply} is not searchable")));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(HarnessError::Config("timeout must be at least 1 second".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for revision in &self.revisions {
            if revision.id == CURRENT_LABEL {
                return Err(HarnessError::Config(format!(
                    "revision id '{CURRENT_LABEL}' is reserved for the local build"
                )));
            }
            if !is_plain_id(&revision.id) {
                return Err(HarnessError::Config(format!(
                    "revision id '{}' must be a plain name without path separators",
                    revision.id
                )));
            }
            if !seen.insert(revision.id.as_str()) {
                return Err(HarnessError::Config(format!(
                    "revision {} is listed twice",
                    revision.id
                )));
            }
        }
        Ok(())
    }
}

/// Ids become a single directory name under the work directory.
fn is_plain_id(id: &str) -> bool {
    !id.is_empty()
        && !id.contains("..")
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_revision_table() {
        let config = HarnessConfig::default();
        let ids: Vec<_> = config.revisions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["5433", "5953", "6723"]);
        assert_eq!(config.revisions[0].dialect, Dialect::Ini);
        assert_eq!(config.revisions[2].dialect, Dialect::Unified);
    }

    #[test]
    fn test_revision_parse() {
        let rev: Revision = "5433:ini".parse().unwrap();
        assert_eq!(rev, Revision::new("5433", Dialect::Ini));
        let rev: Revision = "6723:Unified".parse().unwrap();
        assert_eq!(rev.dialect, Dialect::Unified);
    }

    #[test]
    fn test_revision_parse_rejects_garbage() {
        assert!("5433".parse::<Revision>().is_err());
        assert!(":ini".parse::<Revision>().is_err());
        assert!("5433:xml".parse::<Revision>().is_err());
    }

    #[test]
    fn test_paths() {
        let config = HarnessConfig::default().with_work_dir("/tmp/work");
        assert_eq!(config.revision_dir("5953"), PathBuf::from("/tmp/work/chx_5953"));
        assert_eq!(
            config.revision_exe("5953"),
            PathBuf::from("/tmp/work/chx_5953/src/chx")
        );
        assert_eq!(
            config.board_path("board2"),
            PathBuf::from("../inputs/board2")
        );
    }

    #[test]
    fn test_validate_missing_executable() {
        let config = HarnessConfig::default().with_current_exe("/definitely/not/here/chx");
        match config.validate() {
            Err(HarnessError::ExecutableNotFound { path }) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here/chx"));
            }
            other => panic!("expected ExecutableNotFound, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_rejects_reserved_and_path_ids() {
        let base = HarnessConfig::default().with_current_exe("/bin/sh");
        assert!(base.validate().is_ok());
        for id in ["current", "../x", "a/b", "..", "a\\b", "5433 "] {
            let config = base
                .clone()
                .with_revisions(vec![Revision::new(id, Dialect::Unified)]);
            assert!(
                matches!(config.validate(), Err(HarnessError::Config(_))),
                "{id:?} should be rejected"
            );
        }
        let config = base.with_revisions(vec![Revision::new("r6723-omp_1.2", Dialect::Ini)]);
        assert!(config.validate().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = HarnessConfig::default().with_current_exe("/bin/sh");
        let zero = config.clone().with_timeout(Some(Duration::ZERO));
        assert!(matches!(zero.validate(), Err(HarnessError::Config(_))));
        assert!(config.with_timeout(Some(Duration::from_secs(1))).validate().is_ok());
    }
}
