//! `ScriptHost`: the exact function set spec.md §6 names for the
//! embedded script interpreter collaborator — `log`,
//! `querySelectorAll`, `getAttribute`/`setAttribute`, `innerHTML_set`,
//! `style_set`, `XMLHttpRequest_send`, `setTimeout`,
//! `requestAnimationFrame`, `parent`, `postMessage`. Grounded on the
//! function shapes in
//! `BigBadE-valor/crates/js/src/bindings/document/{core,query}.rs`
//! (createElement/getElementById/setTextContent argument-count
//! validation) and `js/src/bindings/net.rs` (XHR), with
//! `setTimeout`/`requestAnimationFrame` scheduling semantics from
//! `original_source/js.py`.

use cinder_dom::NodeKey;

/// Failure kinds spec.md §7 names for the script boundary: "cross-
/// origin DOM access (raises to script)" and CSP blocks (which the
/// embedder logs and skips, per §7 — here represented the same way a
/// failed fetch is, since both are "the caller skips the resource").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    CrossOrigin { handle_origin: String, host_origin: String },
    Csp(String),
    NotFound,
}

/// Opaque reference to a DOM node, carrying the origin of the document
/// it came from so cross-origin access can be detected without a
/// document lookup (spec.md §7 "cross-origin DOM access raises").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    pub node: NodeKey,
    pub origin: String,
}

/// The surface a script execution environment is granted. A single
/// `ScriptHost` instance is scoped to one frame/tab's document; cross-
/// frame access goes through `parent()`/`post_message`.
pub trait ScriptHost {
    fn log(&mut self, message: &str);

    /// Returns every element matching `selector` (tag-name matching
    /// only; full CSS selector support is the cascade engine's job,
    /// not the script host's).
    fn query_selector_all(&self, selector: &str) -> Vec<Handle>;

    /// # Errors
    /// Returns `ScriptError::CrossOrigin` if `handle` belongs to a
    /// different document than this host.
    fn get_attribute(&self, handle: &Handle, name: &str) -> Result<Option<String>, ScriptError>;

    /// # Errors
    /// Returns `ScriptError::CrossOrigin` if `handle` belongs to a
    /// different document than this host.
    fn set_attribute(&mut self, handle: &Handle, name: &str, value: &str) -> Result<(), ScriptError>;

    /// Replaces `handle`'s children with freshly parsed `html`,
    /// triggering a render (spec.md scenario 5).
    ///
    /// # Errors
    /// Returns `ScriptError::CrossOrigin` for a foreign-frame handle.
    fn inner_html_set(&mut self, handle: &Handle, html: &str) -> Result<(), ScriptError>;

    /// Sets the inline `style` attribute, triggering a restyle.
    ///
    /// # Errors
    /// Returns `ScriptError::CrossOrigin` for a foreign-frame handle.
    fn style_set(&mut self, handle: &Handle, style: &str) -> Result<(), ScriptError>;

    /// Starts an XHR; completion is delivered later via whatever
    /// callback-dispatch mechanism the embedder wires up (out of scope
    /// here — this call only validates and records the request).
    ///
    /// # Errors
    /// Returns `ScriptError::Csp` if the target URL is blocked.
    fn xml_http_request_send(&mut self, method: &str, url: &str, body: Option<&str>, is_async: bool, handle: u64) -> Result<(), ScriptError>;

    /// Schedules a deferred callback, identified by `handle`, to run
    /// after `ms` milliseconds (spec.md §9: "Coroutine-style
    /// rAF/setTimeout: model as deferred tasks posted from a timer
    /// thread into the tab's FIFO").
    fn set_timeout(&mut self, handle: u64, ms: u64);

    /// Requests that the rAF callback run on the next animation frame.
    fn request_animation_frame(&mut self);

    /// The parent frame's handle, or `None` for the top-level document.
    fn parent(&self) -> Option<Handle>;

    /// # Errors
    /// Returns `ScriptError::NotFound` if `target` does not name a
    /// frame this host can reach.
    fn post_message(&mut self, target: &Handle, data: &str, origin: &str) -> Result<(), ScriptError>;
}
