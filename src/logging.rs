use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Log output formatter for the report CLI.
///
/// Logs go to stderr so stdout stays clean for table or JSON output. Info
/// lines are printed plain; warnings and errors get a colored level tag so
/// skipped inputs stand out next to the report.
pub struct ColorizedFormatter;

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut buffer = String::new();
        ctx.format_fields(Writer::new(&mut buffer), event)?;

        let line = match *event.metadata().level() {
            Level::ERROR => format!("{} {}", "error:".red().bold(), buffer.red()),
            Level::WARN => format!("{} {}", "warning:".yellow().bold(), buffer.yellow()),
            Level::INFO => buffer,
            Level::DEBUG => format!("{}", buffer.blue()),
            Level::TRACE => format!("{}", buffer.purple()),
        };

        writeln!(writer, "{}", line)
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` over `info`.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(ColorizedFormatter)
        .init();
}
