//! Logger setup for the `dupeguard` binary.
//!
//! `RUST_LOG` wins when set. Otherwise `-q` keeps errors only and each `-v`
//! raises the level from info to debug to trace. Records go to stderr so a
//! report on stdout stays machine-readable.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

/// Install the global logger. Only the first call has an effect.
pub fn init_logging(verbose: u8, quiet: bool) {
    let from_env = std::env::var_os("RUST_LOG").is_some();
    let level = level_for(verbose, quiet);

    let mut builder = Builder::new();
    builder.target(Target::Stderr);
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }

    // Module paths only help once the user asked for detail.
    let with_module = verbose >= 1;
    builder.format(move |buf, record| {
        let style = buf.default_level_style(record.level());
        if with_module {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.module_path().unwrap_or("dupeguard"),
                record.args()
            )
        } else {
            writeln!(buf, "{style}{:<5}{style:#} {}", record.level(), record.args())
        }
    });

    if builder.try_init().is_ok() && !from_env {
        log::debug!("Logging initialized at level {level}");
    }
}

fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

/// Name of the active maximum level, for the run banner.
#[must_use]
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
