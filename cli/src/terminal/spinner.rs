use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

/// A span that shows a spinner with `message` while a phase runs inside it.
pub fn phase(message: &str) -> Span {
    let span = info_span!("phase");
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        span.pb_set_style(&style.tick_strings(TICKS));
    }
    span.pb_set_message(message);
    span
}
