//! Document tree: the arena-backed node graph a tab parses its page
//! into (spec.md §3). Parsing itself is an out-of-scope external
//! collaborator (spec.md §1); `parse` is the thin adapter that lets it
//! write into the arena here.

pub mod node;
pub mod parse;

pub use node::{Document, NodeBackRefs, NodeData, NodeKey, NodeVariant};
pub use parse::parse_into;
