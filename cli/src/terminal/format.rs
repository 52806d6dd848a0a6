use colored::*;
use culler_common::network::host::Host;
use culler_common::policy::objects::MatchedObject;
use culler_common::policy::outcome::{RemovalOutcome, Status};

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn hosts_to_value(hosts: &[&Host], color: Color) -> ColoredString {
    if hosts.is_empty() {
        return "none".color(colors::SECONDARY);
    }
    hosts
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<String>>()
        .join(", ")
        .color(color)
}

pub fn matched_to_details(matched: &MatchedObject) -> Vec<Detail> {
    vec![
        ("Value".to_string(), matched.object.value.color(colors::HOST_ADDR)),
        ("Host".to_string(), matched.host.to_string().color(colors::STALE)),
        ("Found in".to_string(), matched.grouping.to_string().color(colors::PRIMARY)),
    ]
}

pub fn status_to_value(status: &Status) -> ColoredString {
    match status {
        Status::Done { edits: 0 } => "clean".color(colors::SECONDARY),
        Status::Done { edits: 1 } => "1 edit".green(),
        Status::Done { edits } => format!("{edits} edits").green(),
        Status::Failed { reason } => format!("failed: {reason}").red().bold(),
        Status::Skipped { reason } => format!("skipped: {reason}").yellow(),
    }
}

pub fn outcome_to_detail(outcome: &RemovalOutcome) -> Detail {
    (
        format!("{} / {}", outcome.object, outcome.stage),
        status_to_value(&outcome.status),
    )
}
