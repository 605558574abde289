//! Cascade and per-property animation for a tab's document (spec.md §3
//! Style + Animation, §4.2 Style Engine), grounded primarily on
//! `original_source/css.py`.

pub mod animation;
pub mod engine;
pub mod parse;
pub mod selector;
pub mod value;

pub use animation::NumericAnimation;
pub use engine::{PropertyMap, StyleEngine};
pub use parse::{parse as parse_stylesheet, parse_inline};
pub use selector::{MediaQuery, Rule, Selector};
