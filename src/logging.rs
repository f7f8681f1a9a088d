//! In-memory capture of recent log lines
//!
//! Feeds the `/logs` command and the TUI log pane while the fmt layer writes
//! to stderr or the log file.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const RECENT_LOG_CAPACITY: usize = 500;

static RECENT_LOGS: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn buffer() -> &'static Mutex<VecDeque<String>> {
    RECENT_LOGS.get_or_init(|| Mutex::new(VecDeque::with_capacity(RECENT_LOG_CAPACITY)))
}

/// Push a formatted line, dropping the oldest one when full
pub fn record_line(line: String) {
    let Ok(mut logs) = buffer().lock() else {
        return;
    };
    if logs.len() >= RECENT_LOG_CAPACITY {
        logs.pop_front();
    }
    logs.push_back(line);
}

/// The newest `limit` captured lines, oldest first
pub fn recent_logs(limit: usize) -> Vec<String> {
    match buffer().lock() {
        Ok(logs) => {
            let skip = logs.len().saturating_sub(limit);
            logs.iter().skip(skip).cloned().collect()
        }
        Err(_) => Vec::new(),
    }
}

/// Tracing layer that copies every enabled event into the recent-log buffer
#[derive(Debug, Default, Clone, Copy)]
pub struct RecentLogLayer;

impl<S> Layer<S> for RecentLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        let mut line = format!(
            "{} {:<5} {}",
            chrono::Local::now().format("%H:%M:%S"),
            metadata.level(),
            visitor.message
        );
        if !visitor.fields.is_empty() {
            line.push(' ');
            line.push_str(&visitor.fields);
        }

        record_line(line);
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field, value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.push_field(field, &format!("{:?}", value));
        }
    }
}

impl LineVisitor {
    fn push_field(&mut self, field: &Field, value: &str) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", field.name(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_layer_captures_message_and_fields() {
        let subscriber = tracing_subscriber::registry().with(RecentLogLayer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(session = 7, "capture-check marker");
        });

        let logs = recent_logs(RECENT_LOG_CAPACITY);
        let line = logs
            .iter()
            .rev()
            .find(|line| line.contains("capture-check marker"))
            .expect("captured line");
        assert!(line.contains("INFO"));
        assert!(line.contains("session=7"));
    }

    #[test]
    fn test_recent_logs_limit() {
        for i in 0..3 {
            record_line(format!("limit-check {}", i));
        }
        let logs = recent_logs(2);
        assert_eq!(logs.len(), 2);
    }
}
