//! Recovers tool decisions from the rendered error of an agent run that never
//! produced a structured trace. The markers mirror the agent's ReAct-style
//! output (`Action: <tool>` / `Action Input: <input>`); if the engine changes
//! its error formatting this is the only place to update.

use crate::constants::markers;
use once_cell::sync::Lazy;
use regex::Regex;

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("quoted regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveredTrace {
    /// Tool names from `Action:` lines, in order.
    pub tool_names: Vec<String>,
    /// Every double-quoted substring that starts with `http`, in order.
    pub quoted_urls: Vec<String>,
}

pub fn parse_failed_trace(raw_text: &str) -> RecoveredTrace {
    RecoveredTrace {
        tool_names: action_names(raw_text),
        quoted_urls: quoted_urls(raw_text),
    }
}

fn action_names(raw_text: &str) -> Vec<String> {
    raw_text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(markers::ACTION) && !line.starts_with(markers::ACTION_INPUT))
        .filter_map(|line| line.split(':').nth(1))
        .map(|name| name.trim().to_string())
        .collect()
}

fn quoted_urls(raw_text: &str) -> Vec<String> {
    QUOTED
        .captures_iter(raw_text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|candidate| candidate.starts_with("http"))
        .map(str::to_string)
        .collect()
}
