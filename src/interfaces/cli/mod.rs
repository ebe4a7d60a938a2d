//! Command-line interface of the `orbopt` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::io::format::orbopt_output;

const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// Logs a nicely formatted `orbopt` heading to the `orbopt-output` logger.
pub fn log_heading() {
    let version = VERSION
        .map(|ver| format!("v{ver}"))
        .unwrap_or_else(|| "v unknown".to_string());
    orbopt_output!("╭────────────────────────────────────────────────────────────────────────────────────────╮");
    orbopt_output!("│                                                                                        │");
    orbopt_output!("│                                         orbopt                                         │");
    orbopt_output!("│                 Orbital-rotation optimisation for multiconfigurational                 │");
    orbopt_output!("│                                     wavefunctions                                      │");
    orbopt_output!("│                                                                                        │");
    orbopt_output!("│{version:>87} │");
    orbopt_output!("╰────────────────────────────────────────────────────────────────────────────────────────╯");
    orbopt_output!("");
}

/// Command-line arguments of the `orbopt` binary.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML input file.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Optional path to an output file. If not given, output is written to the console only.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Increases the verbosity of the diagnostic log. May be repeated.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
