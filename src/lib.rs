pub mod bench;
pub mod config;
pub mod error;
pub mod process;
pub mod protocol;
pub mod revision;
pub mod scenario;

pub use bench::{BenchmarkConfig, BenchmarkRunner, Measurement, TimingRow};
pub use config::{Dialect, HarnessConfig, Revision};
pub use error::{HarnessError, ProvisionError};
pub use process::{EngineRunner, Invocation, ProcessRunner};
pub use revision::RevisionProvisioner;
pub use scenario::Scenario;
