//! Transient script files.

use std::fs;
use std::path::{Path, PathBuf};

use log::trace;

use crate::error::HarnessError;

/// A script written to disk for the duration of one invocation.
///
/// The file is removed when the value is dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Write `contents` to a fresh hidden file in `dir`, named
    /// `.<label>-<random suffix>`.
    pub fn write(dir: &Path, label: &str, contents: &str) -> Result<Self, HarnessError> {
        let suffix: u32 = rand::random();
        let path = dir.join(format!(".{label}-{suffix:08x}"));
        fs::write(&path, contents)
            .map_err(|e| HarnessError::io(format!("writing {}", path.display()), e))?;
        trace!("staged script at {}", path.display());
        Ok(ScratchFile { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
