use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use mutex_testbed::harness::{self, Config, Outcome, StressConfig};
use mutex_testbed::sync::AlgorithmKind;

mod verbosity;

use verbosity::VerbosityFlag;

const DEFAULT_THREADS: usize = 8;
const DEFAULT_SECONDS: u64 = 10;

#[derive(clap::Parser, Debug)]
#[command(
    name = "mutex-testbed",
    about = "Measures and exclusion-checks shared-memory mutual exclusion algorithms"
)]
struct Cli {
    /// Number of threads contending for the critical section.
    #[arg(default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Seconds per round that threads spend entering the critical section.
    #[arg(default_value_t = DEFAULT_SECONDS)]
    seconds: u64,

    /// Degree of tree-based lock variants.
    degree: Option<usize>,

    #[arg(short, long, value_enum, default_value_t = AlgorithmKind::LamportFast)]
    algorithm: AlgorithmKind,

    #[arg(long, help = "Use one physical thread that rotates through every logical id")]
    rotate: bool,

    #[arg(
        long,
        value_name = "MILLIS",
        help = "Vary the concurrency level every MILLIS milliseconds; runs until killed"
    )]
    stress: Option<u64>,

    #[arg(
        long,
        value_name = "COUNT",
        requires = "stress",
        help = "Stop stress mode after COUNT intervals"
    )]
    stress_epochs: Option<u64>,

    #[command(flatten)]
    verbosity: VerbosityFlag,
}

/// One-line usage message naming the rejected value.
fn usage(program: &str, reason: &mutex_testbed::Error) -> String {
    format!(
        "Usage: {program} {DEFAULT_THREADS} (number of threads) {DEFAULT_SECONDS} (time in seconds \
         threads spend entering critical section) [degree >= 2]: {reason}"
    )
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures
            let failed = e.use_stderr();
            e.print().context("cannot print usage")?;
            return Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS });
        }
    };

    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .parse_default_env()
        .init();

    let config = Config::new(cli.threads, cli.seconds).and_then(|c| c.with_degree(cli.degree));
    let config = match config {
        Ok(config) => Config {
            rotate: cli.rotate,
            stress: cli.stress.map(|ms| StressConfig {
                interval: Duration::from_millis(ms),
                epochs: cli.stress_epochs,
            }),
            ..config
        },
        Err(err) => {
            let program = std::env::args().next().unwrap_or_else(|| "mutex-testbed".to_string());
            eprintln!("{}", usage(&program, &err));
            return Ok(ExitCode::FAILURE);
        }
    };

    let outcome = harness::run(cli.algorithm, &config)
        .with_context(|| format!("{:?} failed with {} threads", cli.algorithm, config.threads))?;
    match outcome {
        Outcome::Summary(summary) => println!("{summary}"),
        Outcome::Stress(report) => {
            eprintln!("raised {} halts, completed {} epochs", report.raised, report.epochs)
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use mutex_testbed::Error;

    use super::*;

    #[test]
    fn usage_is_one_line_with_reason() {
        for err in [
            Config::new(0, 10).unwrap_err(),
            Config::new(8, 0).unwrap_err(),
            Config::new(8, 10).and_then(|c| c.with_degree(Some(1))).unwrap_err(),
        ] {
            let line = usage("mutex-testbed", &err);
            assert!(line.starts_with("Usage: mutex-testbed 8 "));
            assert!(line.ends_with(&err.to_string()));
            assert!(!line.contains('\n'));
        }
    }

    #[test]
    fn invalid_values_are_rejected_before_construction() {
        assert!(matches!(Config::new(0, 10), Err(Error::InvalidThreads(0))));
        assert!(Cli::try_parse_from(["mutex-testbed", "-1", "10"]).is_err());
        let cli = Cli::try_parse_from(["mutex-testbed"]).unwrap();
        assert_eq!((cli.threads, cli.seconds), (DEFAULT_THREADS, DEFAULT_SECONDS));
    }
}
