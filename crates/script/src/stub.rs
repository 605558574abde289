//! `StubScriptHost`: a deterministic stand-in for the embedded script
//! engine, the equivalent of the teacher's `js_stub` feature default —
//! a real V8-backed interpreter is out of scope (spec.md §1). Operates
//! directly on a `cinder_dom::Document` owned by the caller's tab.

use crate::host::{Handle, ScriptError, ScriptHost};
use cinder_dom::{parse_into, Document, NodeKey};

/// A request recorded by `xml_http_request_send` for the embedder to
/// dispatch; completion delivery is the tab's task runner's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingXhr {
    pub handle: u64,
    pub method: String,
    pub url: String,
    pub body: Option<String>,
    pub is_async: bool,
}

/// A `setTimeout` request recorded for the tab's timer thread to honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimeout {
    pub handle: u64,
    pub ms: u64,
}

pub struct StubScriptHost {
    doc: Document,
    origin: String,
    parent: Option<Handle>,
    csp_blocked_prefixes: Vec<String>,
    pub log_lines: Vec<String>,
    pub pending_xhr: Vec<PendingXhr>,
    pub pending_timeouts: Vec<PendingTimeout>,
    pub raf_requested: bool,
    pub messages_received: Vec<(String, String)>,
}

impl StubScriptHost {
    #[must_use]
    pub fn new(doc: Document, origin: impl Into<String>) -> Self {
        Self {
            doc,
            origin: origin.into(),
            parent: None,
            csp_blocked_prefixes: Vec::new(),
            log_lines: Vec::new(),
            pending_xhr: Vec::new(),
            pending_timeouts: Vec::new(),
            raf_requested: false,
            messages_received: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Handle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Any URL starting with one of these prefixes is rejected by
    /// `xml_http_request_send` as CSP-blocked (spec.md §7: a blocked
    /// subresource load is logged and skipped, never a hard failure).
    #[must_use]
    pub fn with_csp_blocklist(mut self, prefixes: Vec<String>) -> Self {
        self.csp_blocked_prefixes = prefixes;
        self
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Swaps in a freshly loaded document, e.g. on navigation, keeping
    /// this host's origin/parent/CSP settings.
    pub fn replace_document(&mut self, doc: Document) {
        self.doc = doc;
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn handle_for(&self, node: NodeKey) -> Handle {
        Handle { node, origin: self.origin.clone() }
    }

    fn check_origin(&self, handle: &Handle) -> Result<(), ScriptError> {
        if handle.origin == self.origin {
            Ok(())
        } else {
            Err(ScriptError::CrossOrigin { handle_origin: handle.origin.clone(), host_origin: self.origin.clone() })
        }
    }

    /// Recursively copies `node` (and its subtree) from `source` into
    /// `self.doc`, returning the new node's key. Needed because
    /// `NodeKey`s are only meaningful within the document that
    /// allocated them.
    fn clone_subtree(&mut self, source: &Document, node: NodeKey) -> NodeKey {
        let data = source.get(node);
        let new_key = match data.text() {
            Some(text) => self.doc.new_text(text),
            None => {
                let tag = data.tag().unwrap_or("div").to_owned();
                let key = self.doc.new_element(tag);
                if let cinder_dom::NodeVariant::Element { attributes, .. } = &data.variant {
                    for (name, value) in attributes {
                        self.doc.set_attribute(key, name.clone(), value.clone());
                    }
                }
                key
            }
        };
        let children: Vec<NodeKey> = data.children().iter().map(|&child| self.clone_subtree(source, child)).collect();
        if !children.is_empty() {
            self.doc.set_children(new_key, children);
        }
        new_key
    }
}

impl ScriptHost for StubScriptHost {
    fn log(&mut self, message: &str) {
        self.log_lines.push(message.to_owned());
    }

    fn query_selector_all(&self, selector: &str) -> Vec<Handle> {
        let mut found = Vec::new();
        self.doc.walk(|key| {
            if self.doc.get(key).tag() == Some(selector) {
                found.push(self.handle_for(key));
            }
        });
        found
    }

    fn get_attribute(&self, handle: &Handle, name: &str) -> Result<Option<String>, ScriptError> {
        self.check_origin(handle)?;
        Ok(self.doc.get(handle.node).attribute(name).map(str::to_owned))
    }

    fn set_attribute(&mut self, handle: &Handle, name: &str, value: &str) -> Result<(), ScriptError> {
        self.check_origin(handle)?;
        self.doc.set_attribute(handle.node, name.to_owned(), value.to_owned());
        Ok(())
    }

    fn inner_html_set(&mut self, handle: &Handle, html: &str) -> Result<(), ScriptError> {
        self.check_origin(handle)?;
        let mut scratch = Document::new();
        parse_into(&mut scratch, html);
        let mut body = None;
        scratch.walk(|key| {
            if body.is_none() && scratch.get(key).tag() == Some("body") {
                body = Some(key);
            }
        });
        let container = body.unwrap_or_else(|| scratch.root());
        let children: Vec<NodeKey> = scratch.get(container).children().to_vec();
        let cloned: Vec<NodeKey> = children.into_iter().map(|child| self.clone_subtree(&scratch, child)).collect();
        self.doc.set_children(handle.node, cloned);
        Ok(())
    }

    fn style_set(&mut self, handle: &Handle, style: &str) -> Result<(), ScriptError> {
        self.check_origin(handle)?;
        self.doc.set_attribute(handle.node, "style", style.to_owned());
        Ok(())
    }

    fn xml_http_request_send(&mut self, method: &str, url: &str, body: Option<&str>, is_async: bool, handle: u64) -> Result<(), ScriptError> {
        if self.csp_blocked_prefixes.iter().any(|prefix| url.starts_with(prefix.as_str())) {
            log::warn!("csp blocked xhr to {url}");
            self.log_lines.push(format!("csp blocked xhr to {url}"));
            return Err(ScriptError::Csp(url.to_owned()));
        }
        self.pending_xhr.push(PendingXhr { handle, method: method.to_owned(), url: url.to_owned(), body: body.map(str::to_owned), is_async });
        Ok(())
    }

    fn set_timeout(&mut self, handle: u64, ms: u64) {
        self.pending_timeouts.push(PendingTimeout { handle, ms });
    }

    fn request_animation_frame(&mut self) {
        self.raf_requested = true;
    }

    fn parent(&self) -> Option<Handle> {
        self.parent.clone()
    }

    fn post_message(&mut self, target: &Handle, data: &str, origin: &str) -> Result<(), ScriptError> {
        if target.node == self.doc.root() || self.parent.as_ref().is_some_and(|p| p.node == target.node) {
            self.messages_received.push((data.to_owned(), origin.to_owned()));
            Ok(())
        } else {
            Err(ScriptError::NotFound)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test code may use unwrap for simplicity")]
mod tests {
    use super::*;

    fn new_host() -> StubScriptHost {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.new_element("p");
        doc.set_attribute(p, "id", "greeting");
        doc.append_child(root, p);
        StubScriptHost::new(doc, "https://example.com")
    }

    #[test]
    fn query_selector_all_matches_by_tag() {
        let host = new_host();
        let found = host.query_selector_all("p");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn get_and_set_attribute_round_trip() {
        let mut host = new_host();
        let handle = host.query_selector_all("p").remove(0);
        host.set_attribute(&handle, "class", "bold").unwrap();
        assert_eq!(host.get_attribute(&handle, "class").unwrap(), Some("bold".to_owned()));
    }

    #[test]
    fn cross_origin_handle_is_rejected() {
        let mut host = new_host();
        let foreign = Handle { node: host.document().root(), origin: "https://evil.example".to_owned() };
        assert_eq!(host.set_attribute(&foreign, "x", "y"), Err(ScriptError::CrossOrigin { handle_origin: "https://evil.example".to_owned(), host_origin: "https://example.com".to_owned() }));
    }

    #[test]
    fn inner_html_set_replaces_children_and_triggers_render() {
        let mut host = new_host();
        let root = Handle { node: host.document().root(), origin: host.origin().to_owned() };
        host.inner_html_set(&root, "<div>new content</div>").unwrap();
        let mut found_text = false;
        host.document().walk(|key| {
            if host.document().get(key).text() == Some("new content") {
                found_text = true;
            }
        });
        assert!(found_text);
    }

    #[test]
    fn inner_html_set_on_foreign_handle_raises() {
        let mut host = new_host();
        let foreign = Handle { node: host.document().root(), origin: "https://evil.example".to_owned() };
        assert!(host.inner_html_set(&foreign, "<div>x</div>").is_err());
    }

    #[test]
    fn csp_blocked_xhr_is_rejected_and_logged() {
        let mut host = new_host().with_csp_blocklist(vec!["https://tracker.example".to_owned()]);
        let result = host.xml_http_request_send("GET", "https://tracker.example/pixel.gif", None, true, 1);
        assert!(result.is_err());
        assert!(host.log_lines.iter().any(|line| line.contains("csp blocked")));
    }

    #[test]
    fn set_timeout_and_request_animation_frame_are_recorded() {
        let mut host = new_host();
        host.set_timeout(42, 100);
        host.request_animation_frame();
        assert_eq!(host.pending_timeouts, vec![PendingTimeout { handle: 42, ms: 100 }]);
        assert!(host.raf_requested);
    }

    #[test]
    fn post_message_to_self_is_recorded() {
        let mut host = new_host();
        let root = Handle { node: host.document().root(), origin: host.origin().to_owned() };
        host.post_message(&root, "hello", "https://example.com").unwrap();
        assert_eq!(host.messages_received, vec![("hello".to_owned(), "https://example.com".to_owned())]);
    }
}
