//! External tools that fetch and build a revision.

use std::path::Path;
use std::process::{Command, Output};

use log::debug;

/// Source-control checkout, configuration and build of one revision.
///
/// Each step reports failure as a human-readable detail; the provisioner
/// attaches the revision and step.
pub trait Toolchain {
    fn fetch(&self, repository: &str, revision: &str, dest: &Path) -> Result<(), String>;
    fn configure(&self, dir: &Path) -> Result<(), String>;
    fn build(&self, dir: &Path) -> Result<(), String>;
}

impl<T: Toolchain + ?Sized> Toolchain for &T {
    fn fetch(&self, repository: &str, revision: &str, dest: &Path) -> Result<(), String> {
        (**self).fetch(repository, revision, dest)
    }

    fn configure(&self, dir: &Path) -> Result<(), String> {
        (**self).configure(dir)
    }

    fn build(&self, dir: &Path) -> Result<(), String> {
        (**self).build(dir)
    }
}

/// Runs `svn`, `cmake` and `make` found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolchain {
    offline: bool,
}

impl SystemToolchain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A toolchain that refuses every step, so only revisions already built
    /// on disk are usable.
    #[must_use]
    pub fn offline() -> Self {
        SystemToolchain { offline: true }
    }

    fn ensure_online(&self) -> Result<(), String> {
        if self.offline {
            Err("provisioning is disabled for this run".to_string())
        } else {
            Ok(())
        }
    }
}

impl Toolchain for SystemToolchain {
    fn fetch(&self, repository: &str, revision: &str, dest: &Path) -> Result<(), String> {
        self.ensure_online()?;
        let mut cmd = Command::new("svn");
        cmd.arg("checkout")
            .arg(format!("{repository}@{revision}"))
            .arg(dest);
        run_tool("svn", &mut cmd)
    }

    fn configure(&self, dir: &Path) -> Result<(), String> {
        self.ensure_online()?;
        let mut cmd = Command::new("cmake");
        cmd.arg(".").current_dir(dir);
        run_tool("cmake", &mut cmd)
    }

    fn build(&self, dir: &Path) -> Result<(), String> {
        self.ensure_online()?;
        let mut cmd = Command::new("make");
        cmd.current_dir(dir);
        run_tool("make", &mut cmd)
    }
}

fn run_tool(name: &str, cmd: &mut Command) -> Result<(), String> {
    let output = cmd
        .output()
        .map_err(|e| format!("failed to launch {name}: {e}"))?;
    log_output(name, &output);
    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{name} exited with {}: {}",
            output.status,
            tail(&String::from_utf8_lossy(&output.stderr))
        ))
    }
}

fn log_output(name: &str, output: &Output) {
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!("[{name}] {line}");
    }
}

/// Last few non-empty lines of tool output.
fn tail(text: &str) -> String {
    const KEEP: usize = 5;
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(KEEP)..].join("\n")
}
