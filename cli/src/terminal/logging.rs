use std::fmt;

use colored::*;
use culler_common::log::{PRINT_TARGET, SUCCESS_TARGET};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

pub struct CullerFormatter;

/// Pulls the `raw_msg` field out of print events.
#[derive(Default)]
struct RawMessage(Option<String>);

impl Visit for RawMessage {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "raw_msg" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "raw_msg" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S, N> FormatEvent<S, N> for CullerFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        if meta.target() == PRINT_TARGET {
            let mut raw = RawMessage::default();
            event.record(&mut raw);
            return writeln!(writer, "{}", raw.0.unwrap_or_default());
        }

        let level: Level = *meta.level();
        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) = if meta.target() == SUCCESS_TARGET {
            ("[+]", |s| s.green().bold())
        } else if level == Level::ERROR {
            ("[-]", |s| s.red().bold())
        } else if level == Level::WARN {
            ("[!]", |s| s.yellow().bold())
        } else if level == Level::INFO {
            ("[*]", |s| s.cyan().bold())
        } else if level == Level::DEBUG {
            ("[?]", |s| s.blue())
        } else {
            ("[ ]", |s| s.dimmed())
        };

        write!(writer, "{} ", color_func(symbol.into()))?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default level.
pub fn init(quiet: u8) {
    let default_level: &str = if quiet > 1 { "warn" } else { "info" };
    let mut filter: EnvFilter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if let Ok(directive) = format!("{PRINT_TARGET}=info").parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    let indicatif_layer = IndicatifLayer::new();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(CullerFormatter)
        .with_writer(indicatif_layer.get_stdout_writer());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(indicatif_layer)
        .init();
}
