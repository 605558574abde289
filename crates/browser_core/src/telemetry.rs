//! Chrome Trace Event Format writer, grounded directly on
//! `original_source/task.py`'s `MeasureTime` (begin/end pairs keyed by
//! wall-clock timestamp and thread id), generalized from hand-built
//! JSON strings to `serde_json` (spec.md §5 "Persisted state").

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Serialize)]
struct TraceEvent<'name> {
    name: &'name str,
    ph: &'static str,
    ts: u128,
    pid: u32,
    tid: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    cat: Option<&'static str>,
}

fn now_micros() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_micros()).unwrap_or_default()
}

fn thread_id() -> u64 {
    // `ThreadId` carries no stable numeric accessor; its `Debug` output
    // ("ThreadId(7)") is the only portable way to recover one, matching
    // the teacher's reliance on `threading.get_ident()` for the same
    // trace-event field.
    let label = format!("{:?}", std::thread::current().id());
    label.chars().filter(char::is_ascii_digit).collect::<String>().parse().unwrap_or(0)
}

struct Writer {
    file: File,
    wrote_first: bool,
}

/// One instance per process, shared across tab threads behind a mutex
/// (spec.md §9 "process-wide state with explicit init").
pub struct Telemetry {
    inner: Mutex<Writer>,
}

impl Telemetry {
    /// # Errors
    /// Returns an error if `path` cannot be created or written to.
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let mut file = File::create(path).with_context(|| format!("creating trace file {}", path.display()))?;
        file.write_all(b"{\"traceEvents\": [")?;
        let metadata = serde_json::json!({
            "name": "process_name", "ph": "M", "ts": now_micros(), "pid": 1,
            "cat": "__metadata", "args": {"name": "Browser"},
        });
        write!(file, "{metadata}")?;
        file.flush()?;
        Ok(Self { inner: Mutex::new(Writer { file, wrote_first: true }) })
    }

    /// Records the start of a named span on the calling thread.
    pub fn begin(&self, name: &str) {
        self.write_event(name, "B", None);
    }

    /// Records the end of a named span on the calling thread.
    pub fn end(&self, name: &str) {
        self.write_event(name, "E", None);
    }

    fn write_event(&self, name: &str, ph: &'static str, cat: Option<&'static str>) {
        let event = TraceEvent { name, ph, ts: now_micros(), pid: 1, tid: thread_id(), cat: cat.or(Some("_")) };
        let mut writer = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let result = (|| -> Result<()> {
            write!(writer.file, ", {}", serde_json::to_string(&event)?)?;
            writer.file.flush()?;
            Ok(())
        })();
        if let Err(err) = result {
            log::warn!("telemetry write failed: {err}");
        }
    }

    /// Closes the JSON array. Call once, on process shutdown.
    pub fn finish(&self) {
        let mut writer = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(err) = writer.file.write_all(b"]}") {
            log::warn!("telemetry finish failed: {err}");
        }
        let _ = writer.file.flush();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test code may use unwrap for simplicity")]
mod tests {
    use super::*;

    #[test]
    fn begin_end_finish_produce_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("browser.trace");
        let telemetry = Telemetry::open(&path).unwrap();
        telemetry.begin("layout");
        telemetry.end("layout");
        telemetry.finish();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        let events = parsed["traceEvents"].as_array().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1]["ph"], "B");
        assert_eq!(events[2]["ph"], "E");
    }
}
