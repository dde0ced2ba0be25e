use clap::Args;
use log::LevelFilter;

#[derive(Args, Debug)]
pub struct VerbosityFlag {
    #[arg(short, long, global = true, help = "Only report errors")]
    quiet: bool,

    #[arg(short, long, global = true, help = "Report experiment progress")]
    verbose: bool,

    #[arg(short, long, global = true, help = "Also report rounds and construction")]
    debug: bool,

    #[arg(long, global = true, help = "Also report every stress epoch")]
    trace: bool,
}

impl VerbosityFlag {
    /// Returns the log level filter corresponding to the given verbosity flags.
    pub fn log_level_filter(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.trace {
            LevelFilter::Trace
        } else if self.debug {
            LevelFilter::Debug
        } else if self.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Warn
        }
    }
}
