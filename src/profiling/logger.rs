//! Process-wide JSONL sink for profiling events.

use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use chrono::Utc;

use super::event::{EventType, ProfileEvent};

/// Environment variable overriding the trace directory.
pub const PROFILE_DIR_ENV_VAR: &str = "STUDY_CORE_PROFILE_DIR";

const DEFAULT_PROFILE_DIR: &str = "data";
const FLUSH_EVERY: u64 = 100;

static SINK: Mutex<Option<ProfileSink>> = Mutex::new(None);

struct ProfileSink {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl ProfileSink {
    fn open(dir: &Path) -> std::io::Result<(Self, String)> {
        let trace_id = Utc::now().format("%Y%m%d_%H%M%S%.3f").to_string();
        let path = dir.join(format!("profile_{}.jsonl", trace_id));

        create_dir_all(dir)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok((
            Self {
                writer: BufWriter::new(file),
                path,
                written: 0,
            },
            trace_id,
        ))
    }

    fn write(&mut self, event: &ProfileEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Dropping unserializable profile event: {}", e);
                return;
            }
        };
        if let Err(e) = writeln!(self.writer, "{}", line) {
            tracing::warn!("Failed to write profile event: {}", e);
            return;
        }
        self.written += 1;
        if self.written % FLUSH_EVERY == 0 {
            let _ = self.writer.flush();
        }
        tracing::trace!(target: "study_core::profile", "{}", line);
    }
}

fn sink() -> Option<MutexGuard<'static, Option<ProfileSink>>> {
    match SINK.lock() {
        Ok(guard) => Some(guard),
        Err(_) => {
            tracing::error!("Profiling sink lock poisoned");
            None
        }
    }
}

/// Open a trace file in `$STUDY_CORE_PROFILE_DIR`, falling back to `data/`.
pub fn init() {
    let dir = std::env::var(PROFILE_DIR_ENV_VAR).unwrap_or_else(|_| DEFAULT_PROFILE_DIR.to_string());
    init_in(Path::new(&dir));
}

/// Open a trace file in `dir`. A second call while a trace is open is ignored.
pub fn init_in(dir: &Path) {
    let Some(mut guard) = sink() else { return };
    if guard.is_some() {
        tracing::warn!("Profiling already active");
        return;
    }

    match ProfileSink::open(dir) {
        Ok((mut opened, trace_id)) => {
            tracing::info!("Profiling to {}", opened.path.display());
            opened.write(&ProfileEvent::new(EventType::SessionStart { session_id: trace_id }));
            *guard = Some(opened);
        }
        Err(e) => tracing::error!("Could not open profile trace in {}: {}", dir.display(), e),
    }
}

/// Write the closing event, flush and close the trace.
pub fn shutdown() {
    let Some(mut guard) = sink() else { return };
    if let Some(mut open) = guard.take() {
        let total_events = open.written + 1;
        open.write(&ProfileEvent::new(EventType::SessionEnd { total_events }));
        let _ = open.writer.flush();
        tracing::info!(total_events, "Profiling stopped");
    }
}

/// File the active trace writes to.
pub fn current_path() -> Option<PathBuf> {
    sink().and_then(|guard| guard.as_ref().map(|open| open.path.clone()))
}

fn write_event(event: ProfileEvent) {
    if let Some(mut guard) = sink() {
        if let Some(open) = guard.as_mut() {
            open.write(&event);
        }
    }
}

/// Record an event; a no-op while no trace is open.
pub fn record(event_type: EventType) {
    write_event(ProfileEvent::new(event_type));
}

pub fn record_with_meta(event_type: EventType, metadata: serde_json::Value) {
    write_event(ProfileEvent::with_metadata(event_type, metadata));
}

/// Records a `TimedScope` event for its own lifetime when dropped.
pub struct ScopeTimer {
    name: &'static str,
    started: Instant,
}

impl ScopeTimer {
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            started: Instant::now(),
        }
    }
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        write_event(ProfileEvent::with_duration(
            EventType::TimedScope {
                name: self.name.to_string(),
                duration_ms: elapsed.as_millis() as u64,
            },
            elapsed,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ProfileEvent::new(EventType::ReviewScheduled {
            quality: 4,
            interval_before: 6.0,
            interval_after: 15.0,
            ease_factor: 2.5,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"review_scheduled""#));
        assert!(json.contains(r#""interval_after":15.0"#));
        assert!(!json.contains("duration_us"));
    }

    #[test]
    fn test_trace_file_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        init_in(dir.path());
        let path = current_path().unwrap();
        assert!(path.starts_with(dir.path()));

        record(EventType::LeechFlagged { lapses: 8 });
        let value = crate::profile_scope!("square", 12 * 12);
        assert_eq!(value, 144);
        shutdown();
        assert!(current_path().is_none());

        // Other tests may record into the same trace concurrently
        let events: Vec<serde_json::Value> = std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let kind = |event: &serde_json::Value| event["event_type"]["type"].as_str().unwrap_or("").to_string();

        assert_eq!(kind(&events[0]), "session_start");
        assert_eq!(kind(events.last().unwrap()), "session_end");
        assert!(events.iter().any(|e| kind(e) == "leech_flagged"));
        assert!(events
            .iter()
            .any(|e| kind(e) == "timed_scope" && e["event_type"]["name"] == "square" && e.get("duration_us").is_some()));
    }
}
