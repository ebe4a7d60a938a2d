use anyhow::{self, format_err};
use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

use orbopt::auxiliary::timer::PhaseTimer;
use orbopt::interfaces::cli::{log_heading, Cli};
use orbopt::interfaces::input::Input;
use orbopt::interfaces::InputHandle;
use orbopt::io::read_orbopt_yaml;

/// Configures `log4rs` so that main output lines go to the console and, optionally, to an
/// output file, while diagnostics go to standard error at a level set by the verbosity.
fn init_logging(cli: &Cli) -> Result<(), anyhow::Error> {
    let output_pattern = "{m}{n}";
    let diagnostic_pattern = "{d(%Y-%m-%d %H:%M:%S)} {h({l:<5})} {t} - {m}{n}";

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(output_pattern)))
        .build();
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(diagnostic_pattern)))
        .build();

    let mut config_builder = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .appender(Appender::builder().build("stderr", Box::new(stderr)));
    let mut output_logger_builder = Logger::builder().appender("stdout").additive(false);
    if let Some(output) = cli.output.as_ref() {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(output_pattern)))
            .append(false)
            .build(output)?;
        config_builder =
            config_builder.appender(Appender::builder().build("output_file", Box::new(file)));
        output_logger_builder = output_logger_builder.appender("output_file");
    }

    let diagnostic_level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let config = config_builder
        .logger(output_logger_builder.build("orbopt-output", LevelFilter::Info))
        .build(Root::builder().appender("stderr").build(diagnostic_level))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    log_heading();
    PhaseTimer::log_format();
    let input = read_orbopt_yaml::<Input, _>(&cli.config)
        .map_err(|err| format_err!("Unable to read `{}`: {err}", cli.config.display()))?;
    input.handle().map_err(|err| {
        log::error!("{err}");
        err
    })
}
