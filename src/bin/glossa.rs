//! Glossa CLI binary.

use std::io::Write;
use std::process;

use clap::Parser;
use env_logger::{Builder, Env};
use log::LevelFilter;

use glossa::cli::args::GlossaArgs;
use glossa::cli::commands::execute_command;

/// Overrides the `-v`/`-q` level, e.g. `GLOSSA_LOG=glossa::index=debug`.
const LOG_ENV: &str = "GLOSSA_LOG";
const LOG_STYLE_ENV: &str = "GLOSSA_LOG_STYLE";

fn log_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn logger(verbosity: u8, env: Env<'_>) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(log_level(verbosity))
        .parse_env(env)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()));
    builder
}

fn main() {
    let args = GlossaArgs::parse();

    logger(
        args.verbosity(),
        Env::new().filter(LOG_ENV).write_style(LOG_STYLE_ENV),
    )
    .init();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_sets_level() {
        let env = Env::new().filter("GLOSSA_TEST_LOG_UNSET");
        assert_eq!(logger(0, env).build().filter(), LevelFilter::Error);
        let env = Env::new().filter("GLOSSA_TEST_LOG_UNSET");
        assert_eq!(logger(3, env).build().filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_env_filter_overrides_verbosity() {
        // SAFETY: the variable is only read by this test.
        unsafe { std::env::set_var("GLOSSA_TEST_LOG", "glossa::index=trace") };
        let logger = logger(1, Env::new().filter("GLOSSA_TEST_LOG")).build();
        assert_eq!(logger.filter(), LevelFilter::Trace);
    }
}
