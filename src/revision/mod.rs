//! Provisioning historical engine revisions.
//!
//! A revision moves through [`ProvisionState`]s as its artifacts appear on
//! disk: checkout directory, build configuration, built executable. Each
//! step runs only when its artifact is missing, so checkouts and builds are
//! cached across harness runs.

mod toolchain;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{info, warn};
use parking_lot::Mutex;

use crate::config::{HarnessConfig, Revision, REVISION_BUILD_FILE};
use crate::error::{ProvisionError, ProvisionStep};

pub use toolchain::{SystemToolchain, Toolchain};

/// Answers whether an artifact exists.
pub trait ArtifactProbe {
    fn exists(&self, path: &Path) -> bool;
}

/// Probes the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl ArtifactProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// How far a revision has been provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProvisionState {
    Unfetched,
    Fetched,
    Configured,
    Built,
}

impl ProvisionState {
    /// Step that advances out of this state.
    #[must_use]
    pub fn next_step(self) -> Option<ProvisionStep> {
        match self {
            ProvisionState::Unfetched => Some(ProvisionStep::Fetch),
            ProvisionState::Fetched => Some(ProvisionStep::Configure),
            ProvisionState::Configured => Some(ProvisionStep::Build),
            ProvisionState::Built => None,
        }
    }
}

/// Fetches and builds revisions at most once per run.
pub struct RevisionProvisioner<'a, T: Toolchain, P: ArtifactProbe = FsProbe> {
    config: &'a HarnessConfig,
    toolchain: T,
    probe: P,
    ensured: Mutex<HashMap<String, Result<PathBuf, ProvisionError>>>,
}

impl<'a, T: Toolchain> RevisionProvisioner<'a, T, FsProbe> {
    #[must_use]
    pub fn new(config: &'a HarnessConfig, toolchain: T) -> Self {
        Self::with_probe(config, toolchain, FsProbe)
    }
}

impl<'a, T: Toolchain, P: ArtifactProbe> RevisionProvisioner<'a, T, P> {
    #[must_use]
    pub fn with_probe(config: &'a HarnessConfig, toolchain: T, probe: P) -> Self {
        RevisionProvisioner {
            config,
            toolchain,
            probe,
            ensured: Mutex::new(HashMap::new()),
        }
    }

    /// Current state of a revision, read from its on-disk artifacts.
    #[must_use]
    pub fn state(&self, revision: &str) -> ProvisionState {
        let dir = self.config.revision_dir(revision);
        if !self.probe.exists(&dir) {
            ProvisionState::Unfetched
        } else if !self.probe.exists(&dir.join(REVISION_BUILD_FILE)) {
            ProvisionState::Fetched
        } else if !self.probe.exists(&self.config.revision_exe(revision)) {
            ProvisionState::Configured
        } else {
            ProvisionState::Built
        }
    }

    /// Make sure `revision` is checked out and built, returning its executable.
    ///
    /// The outcome, success or failure, is remembered for the rest of the run.
    pub fn ensure(&self, revision: &str) -> Result<PathBuf, ProvisionError> {
        if let Some(outcome) = self.ensured.lock().get(revision) {
            return outcome.clone();
        }
        let outcome = self.provision(revision);
        self.ensured
            .lock()
            .insert(revision.to_string(), outcome.clone());
        outcome
    }

    /// Provision every configured revision; failures do not stop the others.
    pub fn ensure_all(&self) -> Vec<(Revision, Result<PathBuf, ProvisionError>)> {
        self.config
            .revisions
            .iter()
            .map(|revision| {
                let outcome = self.ensure(&revision.id);
                if let Err(e) = &outcome {
                    warn!("{e}");
                }
                (revision.clone(), outcome)
            })
            .collect()
    }

    fn provision(&self, revision: &str) -> Result<PathBuf, ProvisionError> {
        let dir = self.config.revision_dir(revision);
        let mut state = self.state(revision);
        while let Some(step) = state.next_step() {
            let fail = |detail: String| ProvisionError {
                revision: revision.to_string(),
                step,
                detail,
            };
            match step {
                ProvisionStep::Fetch => {
                    info!("Checking out revision {revision}");
                    self.toolchain
                        .fetch(&self.config.repository, revision, &dir)
                        .map_err(fail)?;
                }
                ProvisionStep::Configure => {
                    info!("Running cmake on revision {revision}");
                    self.toolchain.configure(&dir).map_err(fail)?;
                }
                ProvisionStep::Build => {
                    info!("Making revision {revision}");
                    self.toolchain.build(&dir).map_err(fail)?;
                }
            }
            let next = self.state(revision);
            if next <= state {
                return Err(fail(format!(
                    "step reported success but {} is still missing",
                    missing_artifact(state)
                )));
            }
            state = next;
        }
        Ok(self.config.revision_exe(revision))
    }
}

fn missing_artifact(state: ProvisionState) -> &'static str {
    match state {
        ProvisionState::Unfetched => "the checkout directory",
        ProvisionState::Fetched => REVISION_BUILD_FILE,
        ProvisionState::Configured | ProvisionState::Built => crate::config::REVISION_EXE,
    }
}
