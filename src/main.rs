use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info, warn};

use chx_harness::bench::report;
use chx_harness::revision::SystemToolchain;
use chx_harness::scenario::{self, Scenario};
use chx_harness::{
    BenchmarkRunner, HarnessConfig, HarnessError, ProcessRunner, Revision, RevisionProvisioner,
};

#[derive(Parser, Debug)]
#[command(
    name = "chx_harness",
    about = "Regression and performance harness for the CHX chess engine",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    mode: Option<Mode>,

    /// Locally built engine executable
    #[arg(long, global = true)]
    exe: Option<PathBuf>,

    /// Abandon any engine invocation running longer than this
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Directory holding the chx_<rev> checkouts
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Directory holding the benchmark boards
    #[arg(long, global = true)]
    inputs_dir: Option<PathBuf>,

    /// Never fetch or build; only revisions already built are benchmarked
    #[arg(long, global = true)]
    skip_provision: bool,

    /// Replace the revision table, e.g. --revision 5433:ini --revision 6723:unified
    #[arg(long = "revision", global = true, value_name = "ID:DIALECT")]
    revisions: Vec<Revision>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Mode {
    /// Time every configuration against each revision and the current build
    Bench,
    /// Run the move-sequence scenarios against the current build
    Scenarios {
        /// Only run the named scenarios
        names: Vec<String>,
    },
    /// Benchmarks followed by scenarios
    All,
}

impl Args {
    fn config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::default()
            .with_timeout(self.timeout_secs.map(Duration::from_secs));
        if let Some(exe) = &self.exe {
            config = config.with_current_exe(exe);
        }
        if let Some(dir) = &self.work_dir {
            config = config.with_work_dir(dir).with_scratch_dir(dir);
        }
        if let Some(dir) = &self.inputs_dir {
            config = config.with_inputs_dir(dir);
        }
        if !self.revisions.is_empty() {
            config = config.with_revisions(self.revisions.clone());
        }
        config
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.config();
    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    let mode = args.mode.clone().unwrap_or(Mode::All);
    let runner = ProcessRunner::from_config(&config);
    let mut passed = true;

    if matches!(mode, Mode::Bench | Mode::All) {
        let toolchain = if args.skip_provision {
            SystemToolchain::offline()
        } else {
            SystemToolchain::new()
        };
        if let Err(e) = run_benchmarks(&config, &runner, toolchain) {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    match &mode {
        Mode::Scenarios { names } => passed &= run_scenarios(&config, &runner, names),
        Mode::All => passed &= run_scenarios(&config, &runner, &[]),
        Mode::Bench => {}
    }

    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_benchmarks(
    config: &HarnessConfig,
    runner: &ProcessRunner,
    toolchain: SystemToolchain,
) -> Result<(), HarnessError> {
    let provisioner = RevisionProvisioner::new(config, toolchain);
    for (revision, outcome) in provisioner.ensure_all() {
        if let Ok(exe) = outcome {
            info!("Revision {} ready at {}", revision.id, exe.display());
        }
    }

    let bench = BenchmarkRunner::new(config, runner, &provisioner);
    let mut out = io::stdout().lock();
    let write_err = |e| HarnessError::io("writing report", e);
    // Header first, then each row as soon as it is measured.
    write!(out, "{}", report::format(std::iter::empty())).map_err(write_err)?;
    for row in bench.rows() {
        writeln!(out, "{}", report::format_row(&row)).map_err(write_err)?;
        if row.is_current() {
            writeln!(out).map_err(write_err)?;
        }
        out.flush().map_err(write_err)?;
    }
    Ok(())
}

fn run_scenarios(config: &HarnessConfig, runner: &ProcessRunner, names: &[String]) -> bool {
    let selected: Vec<Scenario> = if names.is_empty() {
        scenario::ALL.to_vec()
    } else {
        let mut picked = Vec::new();
        for name in names {
            match Scenario::by_name(name) {
                Some(s) => picked.push(s),
                None => {
                    error!("unknown scenario '{name}'");
                    return false;
                }
            }
        }
        picked
    };

    let mut failures = 0;
    for case in &selected {
        match case.run(runner, config) {
            Ok(outcome) => println!(
                "{:<12} ok ({:.3}s)",
                outcome.name,
                outcome.elapsed.as_secs_f64()
            ),
            Err(HarnessError::AssertionMismatch { expected, output, .. }) => {
                failures += 1;
                println!("{:<12} FAILED", case.name);
                println!("--- expected ---\n{expected}\n--- output ---\n{output}");
            }
            Err(e) if e.is_fatal() => {
                error!("{e}");
                return false;
            }
            Err(e) => {
                failures += 1;
                warn!("{}: {e}", case.name);
                println!("{:<12} FAILED", case.name);
            }
        }
    }
    println!(
        "\n{} scenarios, {} passed, {failures} failed",
        selected.len(),
        selected.len() - failures
    );
    failures == 0
}
