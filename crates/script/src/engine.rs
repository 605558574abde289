//! `ScriptEngine`: the embedded interpreter side of the script
//! boundary — runs script source, dispatches DOM events, and fires
//! `requestAnimationFrame` callbacks, calling back into the core
//! through a `ScriptHost`. The real engine (V8-backed, per the
//! teacher's `page_handler::js_stub` feature split) is out of scope
//! (spec.md §1); `StubScriptEngine` is a deterministic stand-in that
//! records what it was asked to run instead of interpreting anything.

use cinder_dom::NodeKey;

/// Side of the script boundary that owns script execution. A tab holds
/// one `ScriptEngine` alongside its `ScriptHost`.
pub trait ScriptEngine {
    /// Parses and runs `source` (spec.md §7: "script runtime error
    /// caught per script; execution continues; the offending script is
    /// considered dead").
    fn run_script(&mut self, source: &str);

    /// Dispatches a DOM event to any registered listener on `node`.
    /// Returns `true` if a listener called `preventDefault` (per
    /// `original_source/browser_ui.py`'s `dispatch_event` return-value
    /// convention), which suppresses the tab's default action.
    fn dispatch_event(&mut self, event: &str, node: NodeKey) -> bool;

    /// Runs every callback registered via `requestAnimationFrame` since
    /// the last frame, then clears the queue (spec.md §4.7 step 2).
    fn run_animation_frame_callbacks(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RanScript {
    pub source: String,
}

/// Records every call instead of interpreting anything — scripts never
/// actually run, events never actually call `preventDefault`, consistent
/// with there being no embedded interpreter in this workspace.
#[derive(Debug, Default)]
pub struct StubScriptEngine {
    pub ran_scripts: Vec<RanScript>,
    pub dispatched_events: Vec<(String, NodeKey)>,
    pub raf_runs: u32,
}

impl StubScriptEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScriptEngine for StubScriptEngine {
    fn run_script(&mut self, source: &str) {
        self.ran_scripts.push(RanScript { source: source.to_owned() });
    }

    fn dispatch_event(&mut self, event: &str, node: NodeKey) -> bool {
        self.dispatched_events.push((event.to_owned(), node));
        false
    }

    fn run_animation_frame_callbacks(&mut self) {
        self.raf_runs += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_script_is_recorded_not_executed() {
        let mut engine = StubScriptEngine::new();
        engine.run_script("document.title = 'x'");
        assert_eq!(engine.ran_scripts, vec![RanScript { source: "document.title = 'x'".to_owned() }]);
    }

    #[test]
    fn dispatch_event_never_prevents_default() {
        let mut engine = StubScriptEngine::new();
        assert!(!engine.dispatch_event("click", NodeKey::ROOT));
        assert_eq!(engine.dispatched_events, vec![("click".to_owned(), NodeKey::ROOT)]);
    }

    #[test]
    fn raf_runs_counts_each_invocation() {
        let mut engine = StubScriptEngine::new();
        engine.run_animation_frame_callbacks();
        engine.run_animation_frame_callbacks();
        assert_eq!(engine.raf_runs, 2);
    }
}
