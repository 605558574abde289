//! Incremental layout: protected-field dependency graph, the
//! Document/Block/Line/Text/Input/Image/Iframe layout tree, and the
//! paint pass that turns a laid-out tree into a display arena
//! (spec.md §3 Layout object / Protected field, §4.1, §4.3, §4.4).

pub mod accessibility;
pub mod font;
pub mod object;
pub mod paint;
pub mod protected;

pub use accessibility::{accessibility_tree, AccessibilityNode};
pub use object::{LayoutArena, LayoutKind, LayoutNode};
pub use paint::paint_tree;
pub use protected::{FieldGraph, FieldKey, FieldKind, NodeIdx, ProtectedField};
