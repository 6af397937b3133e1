//! Console log formatting for the daemon.
//!
//! Formats events as `[timestamp] [component] [level] message`, with a
//! fixed-width component column so multi-bus logs stay aligned. Events
//! may set a `component` field to replace the daemon name in that
//! column (the packet hubs do, one per bus).

use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const COLOR_RESET: &str = "\x1b[0m";
const COLOR_GRAY: &str = "\x1b[90m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_YELLOW: &str = "\x1b[93m";
const COLOR_RED: &str = "\x1b[91m";

const COMPONENT_WIDTH: usize = 12;

/// Custom formatter for daemon console output.
pub struct MctpdLogFormatter {
    daemon_name: String,
    color_enabled: bool,
}

impl MctpdLogFormatter {
    pub fn new(daemon_name: impl Into<String>) -> Self {
        Self {
            daemon_name: daemon_name.into(),
            color_enabled: colors_wanted(),
        }
    }

    fn component_column(&self, component: Option<&str>) -> String {
        let name = component.unwrap_or(&self.daemon_name);
        if name.len() > COMPONENT_WIDTH {
            format!("{}…", &name[..COMPONENT_WIDTH - 1])
        } else {
            format!("{name:<width$}", width = COMPONENT_WIDTH)
        }
    }

    fn level_color(&self, level: &tracing::Level) -> &'static str {
        if !self.color_enabled {
            return "";
        }
        match *level {
            tracing::Level::ERROR => COLOR_RED,
            tracing::Level::WARN => COLOR_YELLOW,
            tracing::Level::INFO => COLOR_GREEN,
            _ => COLOR_GRAY,
        }
    }
}

impl<S, N> FormatEvent<S, N> for MctpdLogFormatter
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
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let level = event.metadata().level();

        let mut visitor = ComponentVisitor::default();
        event.record(&mut visitor);

        let color = self.level_color(level);
        let reset = if self.color_enabled { COLOR_RESET } else { "" };

        write!(
            writer,
            "[{timestamp}] [{}] [{color}{level:<5}{reset}] ",
            self.component_column(visitor.component.as_deref()),
        )?;

        // Render the remaining fields with the default field formatter.
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Extracts the optional `component` field.
#[derive(Default)]
struct ComponentVisitor {
    component: Option<String>,
}

impl tracing::field::Visit for ComponentVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "component" {
            self.component = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "component" {
            self.component = Some(format!("{value:?}").trim_matches('"').to_string());
        }
    }
}

/// Color unless the terminal is known-dumb or absent.
fn colors_wanted() -> bool {
    match std::env::var("TERM") {
        Ok(term) => term != "dumb",
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_column_padding() {
        let formatter = MctpdLogFormatter {
            daemon_name: "mctpd".to_string(),
            color_enabled: false,
        };
        assert_eq!(formatter.component_column(None), "mctpd       ");
        assert_eq!(formatter.component_column(Some("pkt-a")), "pkt-a       ");
    }

    #[test]
    fn test_component_column_truncation() {
        let formatter = MctpdLogFormatter {
            daemon_name: "mctpd".to_string(),
            color_enabled: false,
        };
        let long = formatter.component_column(Some("a-very-long-component"));
        assert!(long.len() <= COMPONENT_WIDTH + "…".len());
        assert!(long.ends_with('…'));
    }
}
