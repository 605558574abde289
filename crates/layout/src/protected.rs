//! Protected-field dependency graph (spec.md §4.1), grounded on the
//! property/value separation in
//! `BigBadE-valor/crates/page_handler/src/core/dependencies.rs`'s
//! `PropertyId`/`Dependency`/`DependencyGraph` but restructured around
//! per-field memoizing cells rather than whole-node dependency sets, to
//! match spec.md's finer-grained `get`/`read`/`set`/`mark` contract.

use std::collections::{HashMap, HashSet};

/// Index of a node in a `LayoutArena`.
pub type NodeIdx = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    X,
    Y,
    Width,
    Height,
    Zoom,
    Font,
    Ascent,
    Descent,
    Children,
}

/// Identifies one protected field: which node, which attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey(pub NodeIdx, pub FieldKind);

/// Tracks dirty bits, dependent sets, and frozen-dependency declarations
/// across every protected field in a layout tree. Field *values* live in
/// the layout objects themselves (see `object.rs`); this graph is pure
/// bookkeeping, mirroring the separation the teacher's dependency
/// tracker draws between `Dependency` keys and node storage.
#[derive(Debug, Default)]
pub struct FieldGraph {
    dirty: HashSet<FieldKey>,
    invalidations: HashMap<FieldKey, HashSet<FieldKey>>,
    frozen_dependencies: HashSet<FieldKey>,
    parent: HashMap<NodeIdx, NodeIdx>,
    has_dirty_descendants: HashSet<NodeIdx>,
}

impl FieldGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_parent(&mut self, node: NodeIdx, parent: NodeIdx) {
        self.parent.insert(node, parent);
    }

    #[must_use]
    pub fn is_dirty(&self, key: FieldKey) -> bool {
        self.dirty.contains(&key)
    }

    /// Idempotent: marking an already-dirty field is a no-op.
    pub fn mark_dirty(&mut self, key: FieldKey) {
        self.dirty.insert(key);
    }

    fn clear_dirty(&mut self, key: FieldKey) {
        self.dirty.remove(&key);
    }

    /// Declares that `dependent` has enumerated all of its dependencies;
    /// any further unsubscribed `read` of it is a bug, not silently
    /// allowed incrementality loss (spec.md §4.1).
    pub fn freeze_dependencies(&mut self, dependent: FieldKey) {
        self.frozen_dependencies.insert(dependent);
    }

    /// Registers that `dependent` read `field`'s value; when `field`
    /// later changes, `dependent` is dirtied.
    ///
    /// # Panics
    /// Panics if `dependent`'s dependencies are frozen and this read was
    /// not already declared — an unsubscribed read of a
    /// frozen-dependency field is a fatal assertion (spec.md §4.1).
    pub fn record_read(&mut self, field: FieldKey, dependent: FieldKey) {
        let already_declared = self
            .invalidations
            .get(&field)
            .is_some_and(|deps| deps.contains(&dependent));
        assert!(
            !self.frozen_dependencies.contains(&dependent) || already_declared,
            "unsubscribed read of {field:?} by frozen-dependency field {dependent:?}"
        );
        self.invalidations.entry(field).or_default().insert(dependent);
    }

    /// Marks every registered dependent of `field` dirty, and topples
    /// `has_dirty_descendants` up the ancestor chain from each dependent's
    /// owning node.
    pub fn notify(&mut self, field: FieldKey) {
        let Some(dependents) = self.invalidations.get(&field).cloned() else {
            return;
        };
        for dependent in dependents {
            self.mark_dirty(dependent);
            self.propagate_dirty_descendants(dependent.0);
        }
    }

    fn propagate_dirty_descendants(&mut self, mut node: NodeIdx) {
        while self.has_dirty_descendants.insert(node) {
            match self.parent.get(&node) {
                Some(&parent) => node = parent,
                None => break,
            }
        }
    }

    #[must_use]
    pub fn has_dirty_descendants(&self, node: NodeIdx) -> bool {
        self.has_dirty_descendants.contains(&node)
    }

    pub fn clear_dirty_descendants(&mut self, node: NodeIdx) {
        self.has_dirty_descendants.remove(&node);
    }

    /// `layout_needed()` per spec.md §4.1: any of this node's own fields
    /// dirty, or a descendant has dirty state.
    #[must_use]
    pub fn layout_needed(&self, node: NodeIdx, own_fields: &[FieldKey]) -> bool {
        own_fields.iter().any(|&f| self.is_dirty(f)) || self.has_dirty_descendants(node)
    }
}

/// A memoizing cell whose value lives inline in a layout object, with
/// dirty/dependency bookkeeping delegated to a `FieldGraph`.
#[derive(Debug, Clone)]
pub struct ProtectedField<T> {
    key: FieldKey,
    value: T,
}

impl<T: Clone + PartialEq> ProtectedField<T> {
    pub fn new(key: FieldKey, initial: T) -> Self {
        Self { key, value: initial }
    }

    #[must_use]
    pub fn key(&self) -> FieldKey {
        self.key
    }

    /// # Panics
    /// Panics if this field is currently dirty (spec.md §4.1: "`get()`
    /// is callable only when `!dirty`; violation is a fatal assertion").
    #[must_use]
    pub fn get<'a>(&'a self, graph: &FieldGraph) -> &'a T {
        assert!(!graph.is_dirty(self.key), "read of dirty protected field {:?}", self.key);
        &self.value
    }

    /// Subscribing read: registers `self` as a dependency of `notify`.
    pub fn read(&self, graph: &mut FieldGraph, notify: FieldKey) -> T {
        graph.record_read(self.key, notify);
        assert!(!graph.is_dirty(self.key), "subscribed read of dirty protected field {:?}", self.key);
        self.value.clone()
    }

    /// Sets the value, clearing dirty. If the value actually changed,
    /// every registered dependent is notified (transitively dirtied).
    pub fn set(&mut self, graph: &mut FieldGraph, value: T) {
        graph.clear_dirty(self.key);
        let changed = self.value != value;
        self.value = value;
        if changed {
            graph.notify(self.key);
        }
    }

    pub fn mark(&self, graph: &mut FieldGraph) {
        graph.mark_dirty(self.key);
    }

    /// Sugar for `self.set(graph, other.read(graph, self.key))`
    /// (spec.md §4.1: `copy(G)`).
    pub fn copy(&mut self, graph: &mut FieldGraph, other: &ProtectedField<T>) {
        let key = self.key;
        let value = other.read(graph, key);
        self.set(graph, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "read of dirty protected field")]
    fn get_on_dirty_field_panics() {
        let graph = {
            let mut g = FieldGraph::new();
            g.mark_dirty(FieldKey(0, FieldKind::Width));
            g
        };
        let field = ProtectedField::new(FieldKey(0, FieldKind::Width), 10.0_f32);
        let _ = field.get(&graph);
    }

    #[test]
    fn set_notifies_registered_dependents_and_topples_ancestors() {
        let mut graph = FieldGraph::new();
        graph.set_parent(1, 0);
        let width_key = FieldKey(0, FieldKind::Width);
        let child_x_key = FieldKey(1, FieldKind::X);

        let mut width = ProtectedField::new(width_key, 100.0_f32);
        // child reads parent's width once, subscribing.
        let _ = width.read(&mut graph, child_x_key);

        width.set(&mut graph, 200.0);
        assert!(graph.is_dirty(child_x_key));
        assert!(graph.has_dirty_descendants(0));
    }

    #[test]
    fn set_with_unchanged_value_does_not_notify() {
        let mut graph = FieldGraph::new();
        let width_key = FieldKey(0, FieldKind::Width);
        let dependent = FieldKey(1, FieldKind::X);
        let mut width = ProtectedField::new(width_key, 100.0_f32);
        let _ = width.read(&mut graph, dependent);
        graph.mark_dirty(dependent); // simulate a prior dirty unrelated to this set
        graph.clear_dirty_descendants(0);
        width.set(&mut graph, 100.0);
        // value unchanged: notify() never ran, so `dependent`'s dirty bit
        // is untouched by this set (still dirty from the earlier mark).
        assert!(graph.is_dirty(dependent));
        assert!(!graph.has_dirty_descendants(0));
    }

    #[test]
    #[should_panic(expected = "unsubscribed read")]
    fn frozen_dependent_rejects_new_unsubscribed_read() {
        let mut graph = FieldGraph::new();
        let dependent = FieldKey(1, FieldKind::X);
        graph.freeze_dependencies(dependent);
        let field = ProtectedField::new(FieldKey(0, FieldKind::Width), 5.0_f32);
        let _ = field.read(&mut graph, dependent);
    }

    #[test]
    fn mark_is_idempotent() {
        let mut graph = FieldGraph::new();
        let key = FieldKey(0, FieldKind::Width);
        let field = ProtectedField::new(key, 1.0_f32);
        field.mark(&mut graph);
        field.mark(&mut graph);
        assert!(graph.is_dirty(key));
    }
}
