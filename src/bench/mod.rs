//! Cross-revision benchmarking.
//!
//! Every (search method, board, ply) configuration is timed against each
//! configured historical revision and then against the current executable.

pub mod report;

use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{Dialect, HarnessConfig, Revision, DEFAULT_EVAL_METHOD};
use crate::error::HarnessError;
use crate::process::{EngineRunner, ScratchFile};
use crate::protocol::ScriptBuilder;
use crate::revision::{ArtifactProbe, RevisionProvisioner, Toolchain};

pub use crate::config::CURRENT_LABEL;
pub use crate::protocol::SearchMethod;

/// Ply at which minimax is not benchmarked.
pub const MINIMAX_SKIPPED_PLY: u32 = 5;

/// Whether a configuration is left out of the cross-product.
#[must_use]
pub fn is_excluded(method: SearchMethod, ply: u32) -> bool {
    method == SearchMethod::Minimax && ply == MINIMAX_SKIPPED_PLY
}

/// One benchmark cell, independent of the revision it is run against.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BenchmarkConfig {
    pub method: SearchMethod,
    pub eval_method: String,
    pub board: String,
    pub ply: u32,
}

impl BenchmarkConfig {
    #[must_use]
    pub fn new(method: SearchMethod, board: &str, ply: u32) -> Self {
        BenchmarkConfig {
            method,
            eval_method: DEFAULT_EVAL_METHOD.to_string(),
            board: board.to_string(),
            ply,
        }
    }

    #[must_use]
    pub fn with_eval(mut self, eval_method: &str) -> Self {
        self.eval_method = eval_method.to_string();
        self
    }

    /// All configurations in report order: method, then board, then ply.
    #[must_use]
    pub fn cross_product(
        methods: &[SearchMethod],
        boards: &[String],
        plies: &[u32],
        eval_method: &str,
    ) -> Vec<BenchmarkConfig> {
        let mut configs = Vec::new();
        for &method in methods {
            for board in boards {
                for &ply in plies {
                    if is_excluded(method, ply) {
                        continue;
                    }
                    configs.push(BenchmarkConfig::new(method, board, ply).with_eval(eval_method));
                }
            }
        }
        configs
    }
}

/// Outcome of timing one invocation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Measurement {
    Elapsed(Duration),
    /// The revision could not be provisioned or the run did not complete
    Failed(String),
}

impl Measurement {
    #[must_use]
    pub fn seconds(&self) -> Option<f64> {
        match self {
            Measurement::Elapsed(d) => Some(d.as_secs_f64()),
            Measurement::Failed(_) => None,
        }
    }
}

/// One line of the timing report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingRow {
    pub method: SearchMethod,
    pub board: String,
    pub ply: u32,
    /// Revision id, or [`CURRENT_LABEL`]
    pub revision: String,
    pub measurement: Measurement,
}

impl TimingRow {
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.revision == CURRENT_LABEL
    }
}

/// Times benchmark configurations against revisions and the current build.
pub struct BenchmarkRunner<'a, R, T, P>
where
    R: EngineRunner,
    T: Toolchain,
    P: ArtifactProbe,
{
    config: &'a HarnessConfig,
    runner: R,
    provisioner: &'a RevisionProvisioner<'a, T, P>,
    scripts: ScriptBuilder,
}

impl<'a, R, T, P> BenchmarkRunner<'a, R, T, P>
where
    R: EngineRunner,
    T: Toolchain,
    P: ArtifactProbe,
{
    #[must_use]
    pub fn new(
        config: &'a HarnessConfig,
        runner: R,
        provisioner: &'a RevisionProvisioner<'a, T, P>,
    ) -> Self {
        BenchmarkRunner {
            config,
            runner,
            provisioner,
            scripts: ScriptBuilder::from_config(config),
        }
    }

    /// Configurations this runner will time.
    #[must_use]
    pub fn configs(&self) -> Vec<BenchmarkConfig> {
        BenchmarkConfig::cross_product(
            &self.config.methods,
            &self.config.boards,
            &self.config.plies,
            &self.config.eval_method,
        )
    }

    /// Lazily time every configuration, one row per call to `next`.
    ///
    /// Nothing runs until the iterator is advanced; a fresh call restarts the
    /// whole cross-product.
    pub fn rows(&self) -> Rows<'_, 'a, R, T, P> {
        Rows {
            bench: self,
            configs: self.configs().into_iter(),
            active: None,
            target: 0,
        }
    }

    fn measure_revision(&self, bench: &BenchmarkConfig, revision: &Revision) -> Measurement {
        match self.provisioner.ensure(&revision.id) {
            Ok(exe) => self.measure(bench, exe, revision.dialect, &revision.id),
            Err(e) => Measurement::Failed(e.to_string()),
        }
    }

    fn measure(
        &self,
        bench: &BenchmarkConfig,
        exe: PathBuf,
        dialect: Dialect,
        label: &str,
    ) -> Measurement {
        match self.time_once(bench, exe, dialect) {
            Ok(elapsed) => {
                debug!(
                    "{} {} ply {} on {label}: {:.3}s",
                    bench.method,
                    bench.board,
                    bench.ply,
                    elapsed.as_secs_f64()
                );
                Measurement::Elapsed(elapsed)
            }
            Err(e) => {
                warn!("{} {} ply {} on {label}: {e}", bench.method, bench.board, bench.ply);
                Measurement::Failed(e.to_string())
            }
        }
    }

    fn time_once(
        &self,
        bench: &BenchmarkConfig,
        exe: PathBuf,
        dialect: Dialect,
    ) -> Result<Duration, HarnessError> {
        let script = self.scripts.build(bench, dialect);
        let label = match dialect {
            Dialect::Ini => "test",
            Dialect::Unified => "test_unified",
        };
        let staged = ScratchFile::write(&self.config.scratch_dir, label, script.text())?;
        let invocation = script.invocation(&exe, staged.path());
        let result = self.runner.run(&invocation)?;
        Ok(result.elapsed)
    }
}

/// Lazy iterator over timing rows, see [`BenchmarkRunner::rows`].
pub struct Rows<'r, 'a, R, T, P>
where
    R: EngineRunner,
    T: Toolchain,
    P: ArtifactProbe,
{
    bench: &'r BenchmarkRunner<'a, R, T, P>,
    configs: std::vec::IntoIter<BenchmarkConfig>,
    active: Option<BenchmarkConfig>,
    /// Index into the revision table; one past the end is the current build
    target: usize,
}

impl<R, T, P> Iterator for Rows<'_, '_, R, T, P>
where
    R: EngineRunner,
    T: Toolchain,
    P: ArtifactProbe,
{
    type Item = TimingRow;

    fn next(&mut self) -> Option<TimingRow> {
        if self.active.is_none() {
            let next = self.configs.next()?;
            info!("Benchmarking {} {} ply {}", next.method, next.board, next.ply);
            self.active = Some(next);
            self.target = 0;
        }
        let bench = self.active.as_ref()?;
        let revisions = &self.bench.config.revisions;

        let (revision, measurement) = match revisions.get(self.target) {
            Some(revision) => (
                revision.id.clone(),
                self.bench.measure_revision(bench, revision),
            ),
            None => (
                CURRENT_LABEL.to_string(),
                self.bench.measure(
                    bench,
                    self.bench.config.current_exe.clone(),
                    Dialect::Unified,
                    CURRENT_LABEL,
                ),
            ),
        };
        let row = TimingRow {
            method: bench.method,
            board: bench.board.clone(),
            ply: bench.ply,
            revision,
            measurement,
        };

        if self.target >= revisions.len() {
            self.active = None;
        } else {
            self.target += 1;
        }
        Some(row)
    }
}
