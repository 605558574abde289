//! Per-property numeric animations, grounded on spec.md §3's
//! `Animation` data model (the `draw.NumericAnimation` class referenced
//! by `original_source/css.py` was not among the retrieved source files,
//! so `animate()`'s stepping behavior below is derived straight from
//! spec.md's own description rather than copied).

/// Linear interpolation from `old_value` to `new_value` over
/// `num_frames` calls to `animate()`. Only `opacity` drives one of
/// these today (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericAnimation {
    old_value: f32,
    new_value: f32,
    num_frames: u32,
    frame_count: u32,
    change_per_frame: f32,
}

impl NumericAnimation {
    #[must_use]
    pub fn new(old_value: f32, new_value: f32, num_frames: u32) -> Self {
        let change_per_frame = if num_frames == 0 {
            0.0
        } else {
            (new_value - old_value) / num_frames as f32
        };
        Self {
            old_value,
            new_value,
            num_frames,
            frame_count: 0,
            change_per_frame,
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.frame_count >= self.num_frames
    }

    /// Advances the animation by one frame, returning the new value, or
    /// `None` once exhausted (spec.md §3: "removed when exhausted").
    pub fn animate(&mut self) -> Option<f32> {
        self.frame_count += 1;
        if self.is_exhausted() {
            return None;
        }
        Some(self.old_value + self.change_per_frame * self.frame_count as f32)
    }
}

/// Parses a `transition` property value (`"opacity 0.5s, color 1s"`)
/// into property -> frame-count pairs, grounded on
/// `original_source/css.py`'s `parse_transition`.
#[must_use]
pub fn parse_transition(value: &str, refresh_rate_sec: f32) -> Vec<(String, u32)> {
    if value.is_empty() {
        return Vec::new();
    }
    value
        .split(',')
        .filter_map(|item| {
            let item = item.trim();
            let (property, duration) = item.split_once(' ')?;
            let seconds: f32 = duration.strip_suffix('s')?.parse().ok()?;
            let frames = (seconds / refresh_rate_sec) as u32;
            Some((property.to_owned(), frames))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_terminates_within_num_frames_and_reaches_new_value() {
        let mut anim = NumericAnimation::new(0.0, 1.0, 4);
        let mut last = None;
        for _ in 0..4 {
            last = anim.animate();
        }
        assert!(anim.is_exhausted());
        assert!(anim.animate().is_none());
        let last = last.unwrap_or(0.0);
        assert!((last - 1.0).abs() <= anim.change_per_frame.abs() + f32::EPSILON);
    }

    #[test]
    fn parse_transition_splits_comma_and_space() {
        let parsed = parse_transition("opacity 0.5s", 0.033);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].0, "opacity");
        assert_eq!(parsed[0].1, (0.5 / 0.033) as u32);
    }
}
