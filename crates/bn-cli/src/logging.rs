//! Console and file logging.
//!
//! Library crates log through the `log` facade; those records are bridged
//! into tracing. Events emitted inside a `step` span are also appended to
//! `<logs>/<step>.log`, the files the archival step uploads.

use chrono::Utc;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt as tfmt, prelude::*, EnvFilter};

/// Span field naming the step an event belongs to
const STEP_FIELD: &str = "step";

/// File collecting every event of one invocation
const COMMAND_LOG: &str = "bn.log";

/// Install the global subscriber. `bn.log` receives every event of the
/// invocation; keep the returned guard alive until exit so it is flushed.
pub fn init(logs_dir: &Path, verbose: bool) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let appender = tracing_appender::rolling::never(logs_dir, COMMAND_LOG);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(tfmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(tfmt::layer().with_ansi(false).with_writer(writer))
        .with(StepFileLayer::new(logs_dir))
        .init();

    Ok(guard)
}

struct StepName(String);

/// Appends each event to the log file of the step span it happened in
pub struct StepFileLayer {
    dir: PathBuf,
    files: Mutex<HashMap<String, File>>,
}

impl StepFileLayer {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files: Mutex::new(HashMap::new()),
        }
    }

    fn append(&self, step: &str, line: &str) {
        let mut files = self.files.lock().unwrap_or_else(|p| p.into_inner());
        if !files.contains_key(step) {
            let path = self.dir.join(format!("{}.log", step));
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => {
                    files.insert(step.to_string(), file);
                }
                Err(e) => {
                    eprintln!("[warn] Cannot open {}: {}", path.display(), e);
                    return;
                }
            }
        }
        if let Some(file) = files.get_mut(step) {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

impl<S> Layer<S> for StepFileLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = StepVisitor(None);
        attrs.record(&mut visitor);
        if let (Some(step), Some(span)) = (visitor.0, ctx.span(id)) {
            span.extensions_mut().insert(StepName(step));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(scope) = ctx.event_scope(event) else {
            return;
        };
        let Some(step) = scope
            .from_root()
            .find_map(|span| span.extensions().get::<StepName>().map(|s| s.0.clone()))
        else {
            return;
        };

        let mut line = LineVisitor::default();
        event.record(&mut line);
        self.append(
            &step,
            &format!(
                "{} {:>5} {}{}\n",
                Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                event.metadata().level(),
                line.message,
                line.fields
            ),
        );
    }
}

struct StepVisitor(Option<String>);

impl Visit for StepVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == STEP_FIELD {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == STEP_FIELD {
            self.0 = Some(format!("{:?}", value).trim_matches('"').to_string());
        }
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
            self.message.push_str(value);
        } else if !field.name().starts_with("log.") {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else if !field.name().starts_with("log.") {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_land_in_step_file() {
        let dir = tempfile::tempdir().unwrap();
        let subscriber = tracing_subscriber::registry().with(StepFileLayer::new(dir.path()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("outside any step");
            let span = tracing::info_span!("step", step = "fusion");
            let _entered = span.enter();
            tracing::info!(rows = 8, "table=fusion");
        });

        let content = std::fs::read_to_string(dir.path().join("fusion.log")).unwrap();
        assert!(content.contains("table=fusion rows=8"));
        assert!(!content.contains("outside any step"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
