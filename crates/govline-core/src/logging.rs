//! Logging setup: env_logger, routed through indicatif when bars are live

use std::io::Write;

use indicatif::MultiProgress;

/// Padded label and ANSI color for a log level.
fn level_label(level: log::Level) -> (&'static str, &'static str) {
    match level {
        log::Level::Error => ("ERROR", "\x1b[31m"),
        log::Level::Warn => ("WARN ", "\x1b[33m"),
        log::Level::Info => ("INFO ", "\x1b[32m"),
        log::Level::Debug => ("DEBUG", "\x1b[36m"),
        log::Level::Trace => ("TRACE", "\x1b[35m"),
    }
}

/// Render one log line. Debug and trace lines carry the module target.
fn render(record: &log::Record, color: bool) -> String {
    let (label, ansi) = level_label(record.level());
    let label = if color {
        format!("{ansi}{label}\x1b[0m")
    } else {
        label.to_string()
    };
    if record.level() >= log::Level::Debug {
        format!("[{label}] {}: {}", record.target(), record.args())
    } else {
        format!("[{label}] {}", record.args())
    }
}

/// Logger that prints above indicatif bars instead of tearing them.
pub struct ProgressLogger {
    filter: env_logger::Logger,
    multi: MultiProgress,
}

impl log::Log for ProgressLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.filter.matches(record) {
            let line = render(record, true);
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {}
}

/// Default filter: `debug` wins over `quiet`; `RUST_LOG` overrides both.
fn default_level(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Initialize logging.
///
/// With `multi` (TTY mode) lines are colored and printed through the
/// progress bars; without it they are plain `[LEVEL] msg` lines for
/// log aggregation.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    let env = env_logger::Env::default().default_filter_or(default_level(quiet, debug));

    if let Some(multi) = multi {
        let filter = env_logger::Builder::from_env(env).build();
        let max_level = filter.filter();
        let logger = ProgressLogger {
            filter,
            multi: multi.clone(),
        };
        if log::set_boxed_logger(Box::new(logger)).is_ok() {
            log::set_max_level(max_level);
        }
    } else {
        let _ = env_logger::Builder::from_env(env)
            .format(|buf, record| writeln!(buf, "{}", render(record, false)))
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_precedence() {
        assert_eq!(default_level(false, false), "info");
        assert_eq!(default_level(true, false), "warn");
        assert_eq!(default_level(true, true), "debug");
    }

    fn render_line(level: log::Level, target: &str, msg: &str) -> String {
        render(
            &log::Record::builder()
                .level(level)
                .target(target)
                .args(format_args!("{msg}"))
                .build(),
            false,
        )
    }

    #[test]
    fn render_plain_info() {
        assert_eq!(
            render_line(log::Level::Info, "govline", "hello"),
            "[INFO ] hello"
        );
    }

    #[test]
    fn render_debug_has_target() {
        assert_eq!(
            render_line(log::Level::Debug, "govline_govinfo::paginator", "page 3"),
            "[DEBUG] govline_govinfo::paginator: page 3"
        );
    }
}
