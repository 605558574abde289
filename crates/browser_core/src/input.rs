//! Window/event source interface (spec.md §6): the event shapes the
//! embedder's event loop adapts into, independent of any particular
//! windowing crate. `cinder` (the binary) adapts `winit` events into
//! this enum.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Ctrl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Quit,
    MouseDown { x: f32, y: f32 },
    /// Mouse moved while the button from `MouseDown` is still held
    /// (expansion: drives the text-selection overlay drag).
    MouseDrag { x: f32, y: f32 },
    /// Mouse button released, ending any active selection drag
    /// (expansion).
    MouseUp,
    /// Signed ticks, positive = scroll up (spec.md §6 "mouse-wheel
    /// (signed ticks)").
    MouseWheel { delta: f32 },
    KeyDown { keysym: String },
    TextInput { text: String },
    /// A chorded key press, e.g. Ctrl-`+` for zoom in (spec.md §6's
    /// named chords: `=`/`-`/`0` zoom, `←` back, `l` address bar, `d`
    /// dark mode, `a` accessibility toggle, `t` new tab, `Tab` cycle,
    /// `q` quit).
    Chord { modifier: Modifier, key: String },
    Resize { width: f32, height: f32 },
}
