//! `CommitData`: the value object a tab hands to the browser under
//! lock each animation frame (spec.md §3 "CommitData", §4.7 step 6),
//! grounded directly on `original_source/task.py`'s `CommitData`.

use cinder_compositor::CompositedUpdates;
use cinder_display::DisplayArena;

#[derive(Debug, Clone)]
pub struct CommitData {
    pub url: String,
    /// `None` means the tab did not move scroll locally this frame, so
    /// the browser's own scroll position (e.g. from a wheel event still
    /// in flight) should stand (spec.md §4.7 step 6).
    pub scroll: Option<f32>,
    pub height: f32,
    /// `None` when the tab held onto its display list because nothing
    /// painted (should not normally happen once a tab has rendered
    /// once, but kept optional to mirror the source's "moved; tab no
    /// longer holds it" ownership-transfer phrasing literally).
    pub display_list: Option<DisplayArena>,
    /// `None` means a full composite is required; `Some` carries the
    /// opacity-only blend substitutions the compositor can apply
    /// instead (spec.md §4.5, §4.7 step 6).
    pub composited_updates: Option<CompositedUpdates>,
}
