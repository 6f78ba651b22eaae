//! Log output for the `checkout` binary.
//!
//! Console lines go to stderr so that quotes, charges and walkthrough
//! reports on stdout can be piped. An optional file receives the same lines
//! without colours.

use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::LoggingSettings;

/// `HH:MM:SS.mmm LEVEL module: message key=value`
struct CheckoutFmt;

impl<S, N> FormatEvent<S, N> for CheckoutFmt
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();
        let time = Local::now().format("%H:%M:%S%.3f");

        if ansi {
            let colour = match *meta.level() {
                Level::ERROR => "31",
                Level::WARN => "33",
                Level::INFO => "32",
                Level::DEBUG => "34",
                Level::TRACE => "35",
            };
            write!(writer, "\x1b[2m{time}\x1b[0m \x1b[1;{colour}m{:>5}\x1b[0m ", meta.level())?;
        } else {
            write!(writer, "{time} {:>5} ", meta.level())?;
        }
        write!(writer, "{}: ", short_target(meta.target()))?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Drops the crate prefix of our own targets: `checkout_core::session`
/// prints as `session`.
fn short_target(target: &str) -> &str {
    match target.split_once("::") {
        Some((krate, rest)) if krate.starts_with("checkout_") => rest,
        _ => target,
    }
}

/// Picks the filter directive: `RUST_LOG`, then `--log-level`, then the
/// configured level.
fn filter_directive<'a>(
    rust_log: Option<&'a str>,
    level_override: Option<&'a str>,
    configured: &'a str,
) -> &'a str {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .or(level_override)
        .unwrap_or(configured)
}

fn open_log_file(path: &Path) -> Result<File> {
    File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file '{}'", path.display()))
}

/// Installs the global subscriber from `[logging]`. Call once at startup.
///
/// # Errors
///
/// Fails on an invalid filter directive or an unwritable log file.
pub fn init_logging(
    settings: &LoggingSettings,
    level_override: Option<&str>,
) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(rust_log.as_deref(), level_override, &settings.level);
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log level '{directive}'"))?;

    let console = settings.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .event_format(CheckoutFmt)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
    });

    let file = match &settings.file {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .event_format(CheckoutFmt)
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("logging already initialized")
}
