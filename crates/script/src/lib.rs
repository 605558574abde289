//! Script interpreter collaborator (spec.md §6): the function surface
//! a page's scripts are granted, plus a deterministic stub
//! implementation standing in for the out-of-scope V8 engine.

pub mod engine;
pub mod host;
pub mod stub;

pub use engine::{RanScript, ScriptEngine, StubScriptEngine};
pub use host::{Handle, ScriptError, ScriptHost};
pub use stub::{PendingTimeout, PendingXhr, StubScriptHost};
