//! Report formatting.
//!
//! Lines meant for the user go to the `orbopt-output` log target, which the binary routes to the
//! console and to the output file. Diagnostics use the ordinary `log` macros.

use std::fmt;

use log;

const ORBOPT_BANNER_LENGTH: usize = 90;

/// Logs an error to the diagnostic log and to the report.
macro_rules! orbopt_error {
    ($fmt:expr $(, $($arg:tt)*)?) => {
        log::error!($fmt, $($($arg)*)?);
        log::error!(target: "orbopt-output", $fmt, $($($arg)*)?);
    }
}

/// Logs a warning to the report.
macro_rules! orbopt_warn {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::warn!(target: "orbopt-output", $fmt, $($($arg)*)?); }
}

/// Logs a report line.
macro_rules! orbopt_output {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::info!(target: "orbopt-output", $fmt, $($($arg)*)?); }
}

pub(crate) use {orbopt_error, orbopt_output, orbopt_warn};

/// Logs a section title inside a box as wide as the report.
pub(crate) fn log_title(title: &str) {
    let length = title.chars().count().max(ORBOPT_BANNER_LENGTH - 6);
    let bar = "─".repeat(length);
    orbopt_output!("┌──{bar}──┐");
    orbopt_output!("│§ {title:^length$} §│");
    orbopt_output!("└──{bar}──┘");
}

/// Logs a subtitle underlined with a double rule.
pub(crate) fn log_subtitle(subtitle: &str) {
    let bar = "═".repeat(subtitle.chars().count());
    orbopt_output!("{subtitle}");
    orbopt_output!("{bar}");
}

/// Logs the opening marker of a block of step output.
pub(crate) fn log_macsec_begin(sectitle: &str) {
    let width = ORBOPT_BANNER_LENGTH - 14;
    let sectitle_space = sectitle.to_string() + " ";
    orbopt_output!("❬❬❬❬❬ [Begin] {sectitle_space:❬<width$}");
}

/// Logs the closing marker of a block of step output.
pub(crate) fn log_macsec_end(sectitle: &str) {
    let width = ORBOPT_BANNER_LENGTH - 14;
    let sectitle_space = sectitle.to_string() + " ";
    orbopt_output!("❭❭❭❭❭ [ End ] {sectitle_space:❭<width$}");
}

/// Formats a flag as `yes` or `no`.
pub(crate) fn nice_bool(b: bool) -> String {
    if b {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}

/// Trait for writing the [`fmt::Display`] form of a structure to the report, one line at a time.
pub(crate) trait OrbOptOutput: fmt::Display {
    fn log_output_display(&self) {
        self.to_string().lines().for_each(|line| {
            orbopt_output!("{line}");
        })
    }
}

impl<T> OrbOptOutput for T where T: fmt::Display {}
