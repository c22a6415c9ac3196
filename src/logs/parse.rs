use std::sync::LazyLock;

use regex::Regex;

use crate::model::{LogLevel, LogLine, now_ts};

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[(.*?)\]\s*(?:(INFO|ERROR|SUCCESS)\b)?\s*(.*)$")
        .expect("invalid log line pattern")
});

/// Parses `[<timestamp>] <LEVEL>? <message>`. Lines that don't match are kept
/// verbatim at `info` level, stamped with the current time.
pub fn parse_log_line(raw: &str) -> LogLine {
    parse_log_line_at(raw, &now_ts())
}

pub fn parse_log_line_at(raw: &str, now: &str) -> LogLine {
    let raw = strip_newline(raw);
    parse_stamped(raw).unwrap_or_else(|| unstamped(raw, now.to_string()))
}

/// Parses a fetched batch against the lines already held for the same tail.
///
/// An unstamped line takes the timestamp of the nearest stamped line before
/// it in the batch. Failing that it keeps the timestamp it was held under,
/// then the next stamped line's, and only then the current time. This keeps
/// re-fetched batches stable, so merging them again appends nothing.
pub fn parse_batch(raw: &[String], held: &[LogLine]) -> Vec<LogLine> {
    let lines: Vec<&str> = raw.iter().map(|line| strip_newline(line)).collect();
    let parsed: Vec<Option<LogLine>> = lines.iter().map(|line| parse_stamped(line)).collect();
    let mut now = None;
    let mut previous: Option<&str> = None;
    let mut out = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        if let Some(stamped) = &parsed[idx] {
            previous = Some(stamped.timestamp.as_str());
            out.push(stamped.clone());
            continue;
        }

        let timestamp = previous
            .map(str::to_string)
            .or_else(|| {
                held.iter()
                    .rev()
                    .find(|h| h.message == *line)
                    .map(|h| h.timestamp.clone())
            })
            .or_else(|| {
                parsed[idx + 1..]
                    .iter()
                    .flatten()
                    .next()
                    .map(|next| next.timestamp.clone())
            })
            .unwrap_or_else(|| now.get_or_insert_with(now_ts).clone());
        out.push(unstamped(line, timestamp));
    }
    out
}

fn strip_newline(raw: &str) -> &str {
    raw.trim_end_matches(['\r', '\n'])
}

fn parse_stamped(raw: &str) -> Option<LogLine> {
    let caps = LINE_RE.captures(raw)?;

    let timestamp = caps.get(1).map_or("", |m| m.as_str()).trim();
    let level = caps
        .get(2)
        .and_then(|m| LogLevel::from_keyword(m.as_str()))
        .unwrap_or_default();
    let message = caps.get(3).map_or("", |m| m.as_str());

    Some(LogLine {
        timestamp: timestamp.to_string(),
        message: if message.is_empty() {
            raw.to_string()
        } else {
            message.to_string()
        },
        level,
    })
}

fn unstamped(raw: &str, timestamp: String) -> LogLine {
    LogLine {
        timestamp,
        message: raw.to_string(),
        level: LogLevel::Info,
    }
}
