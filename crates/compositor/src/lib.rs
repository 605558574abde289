//! Compositing and draw-list engine (spec.md §3 Composited layer,
//! §4.5): partitions a finished display list into composited layers
//! keyed by effect ancestry, then rebuilds a draw list from those
//! layers, substituting `composited_updates` for opacity-only frames
//! so running transitions avoid a full recomposite.
//!
//! Grounded on `BigBadE-valor/crates/renderer/src/compositor.rs`'s
//! `OpacityCompositor`, generalized from "collect opacity stacking
//! contexts" to the finer per-paint-command partition spec.md §4.5
//! describes.

pub mod layer;

use cinder_display::{BlendMode, DisplayArena, DisplayNodeId, DisplayNodeKind, EffectKind, Rect};
use layer::CompositedLayer;
use std::collections::HashMap;

/// Maps a node key (see `EffectKind::Blend::source_node`) to a
/// replacement blend effect for an opacity-only animation frame. `None`
/// for a given key is not represented here; absence from the map means
/// "no substitution for this node" (spec.md §3 CommitData:
/// "composited_updates: mapping node→blend effect, or null meaning
/// 'full composite required'" — the null case is `Option<Compositor>`
/// being `None` at the call site, not an entry in this map).
pub type CompositedUpdates = HashMap<u64, EffectKind>;

/// Output of one composite pass: the ordered list of composited layers
/// plus the rebuilt draw list ready for raster.
pub struct CompositeResult {
    pub layers: Vec<CompositedLayer>,
    pub draw_list: DisplayArena,
}

/// Partitions `display`'s paint leaves into composited layers
/// (spec.md §4.5 algorithm), then rebuilds the draw list.
///
/// `updates` holds opacity-only substitutions to apply while rebuilding
/// blend effects, keyed by `EffectKind::Blend::source_node`. Pass an
/// empty map to force a full composite.
#[must_use]
pub fn composite(display: &DisplayArena, updates: &CompositedUpdates) -> CompositeResult {
    let layers = partition_into_layers(display);
    let draw_list = rebuild_draw_list(display, &layers, updates);
    CompositeResult { layers, draw_list }
}

/// spec.md §4.5 steps 1-4, applied to every paint command in paint
/// order. Resolves Open Question 2: on a bounds intersection with an
/// existing layer, always append a new layer rather than replacing the
/// old one in place (the naive "replace" approach can silently lose
/// the old layer's contents — see test `scenario_3_intersection_forces_append_not_replace`).
fn partition_into_layers(display: &DisplayArena) -> Vec<CompositedLayer> {
    let mut layers: Vec<CompositedLayer> = Vec::new();
    for id in display.paint_leaves() {
        let node = display.get(id);
        let parent = node.parent;
        let absolute_rect = display.local_to_absolute(id);
        // composited_bounds un-maps the absolute bounds back through the
        // same effect chain (spec.md §4.5), rather than using the item's
        // raw local rect, so a `destination-in` clip ancestor narrows it.
        let composited_rect = display.absolute_to_local(id, absolute_rect);

        let merge_target = layers.iter_mut().rev().find(|layer| layer.parent == parent);
        if let Some(layer) = merge_target {
            layer.add(id, composited_rect, absolute_rect);
            continue;
        }

        // Step 3 forces a new layer on a bounds intersection rather than
        // reusing an unrelated open layer. The naive version of this rule
        // replaces the intersecting layer in place, silently dropping its
        // items; we always append instead (Open Question 2, see
        // `scenario_3_intersection_forces_append_not_replace`).
        if layers.iter().rev().any(|layer| layer.intersects_absolute(absolute_rect)) {
            log::trace!("composite: bounds intersection forced a new layer for {id:?}");
        }
        layers.push(CompositedLayer::new(id, parent, composited_rect, absolute_rect));
    }
    // Outset each finished layer's bounds by 1px to cover stroke
    // antialiasing (spec.md §4.5), once per layer rather than per item.
    for layer in &mut layers {
        layer.composited_bounds = layer.composited_bounds.outset(1.0);
    }
    layers
}

/// Rebuilds a fresh draw list: one `DrawCompositedLayer` leaf per
/// composited layer, re-parented under clones of that layer's effect
/// ancestor chain (spec.md §4.5 "Rebuilding the draw list"). Ancestors
/// that share their `source_node` in `updates` get their blend effect
/// substituted, which is how an opacity-only animation frame avoids
/// re-partitioning.
fn rebuild_draw_list(display: &DisplayArena, layers: &[CompositedLayer], updates: &CompositedUpdates) -> DisplayArena {
    let mut out = DisplayArena::new();
    let mut roots = Vec::new();

    for layer in layers {
        let leaf = out.push_paint(cinder_display::PaintCommand::RRect {
            rect: layer.composited_bounds,
            radius: 0.0,
            color: cinder_display::Color::TRANSPARENT,
        });
        let wrapped = clone_ancestor_chain(display, layer.parent, leaf, updates, &mut out);
        roots.push(wrapped);
    }

    let root = match roots.len() {
        0 => out.push_effect(EffectKind::Transform { translation: (0.0, 0.0) }, Vec::new()),
        1 => roots[0],
        _ => out.push_effect(EffectKind::Transform { translation: (0.0, 0.0) }, roots),
    };
    out.set_root(root);
    out.assign_parents();
    out
}

fn clone_ancestor_chain(
    source: &DisplayArena,
    parent: Option<DisplayNodeId>,
    child: DisplayNodeId,
    updates: &CompositedUpdates,
    out: &mut DisplayArena,
) -> DisplayNodeId {
    let Some(parent_id) = parent else {
        return child;
    };
    let parent_node = source.get(parent_id);
    let DisplayNodeKind::Effect { effect, .. } = &parent_node.kind else {
        return child;
    };

    let effect = match effect {
        EffectKind::Blend { source_node, .. } => updates.get(source_node).cloned().unwrap_or_else(|| effect.clone()),
        EffectKind::Transform { .. } => effect.clone(),
    };
    let wrapped = out.push_effect(effect, vec![child]);
    clone_ancestor_chain(source, parent_node.parent, wrapped, updates, out)
}

/// Whether any layer requires offscreen compositing (spec.md §4.6
/// "needs_composite").
#[must_use]
pub fn any_needs_compositing(display: &DisplayArena) -> bool {
    display.root().is_some_and(|root| display.get(root).needs_compositing)
}

/// Absolute raster bounds for a layer, integer-aligned so the raster
/// stage can allocate a pixel-exact surface (spec.md §4.6: "allocate a
/// GPU render target sized to the rounded-out bounds").
#[must_use]
pub fn raster_bounds(layer: &CompositedLayer) -> Rect {
    layer.absolute_bounds.round_out()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_display::{Color, PaintCommand};

    fn rect_leaf(arena: &mut DisplayArena, x: f32, y: f32, w: f32, h: f32) -> DisplayNodeId {
        arena.push_paint(PaintCommand::Rect {
            rect: Rect::new(x, y, w, h),
            color: Color::BLACK,
        })
    }

    #[test]
    fn siblings_under_the_same_parent_merge_into_one_layer() {
        let mut arena = DisplayArena::new();
        let a = rect_leaf(&mut arena, 0.0, 0.0, 10.0, 10.0);
        let b = rect_leaf(&mut arena, 50.0, 50.0, 10.0, 10.0);
        let blend = arena.push_effect(
            EffectKind::Blend { opacity: 1.0, blend_mode: BlendMode::Normal, source_node: 1 },
            vec![a, b],
        );
        arena.set_root(blend);
        arena.assign_parents();

        let layers = partition_into_layers(&arena);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].items.len(), 2);
    }

    #[test]
    fn different_parents_with_non_intersecting_bounds_still_split_into_separate_layers() {
        let mut arena = DisplayArena::new();
        let a = rect_leaf(&mut arena, 0.0, 0.0, 10.0, 10.0);
        let blend_a = arena.push_effect(
            EffectKind::Blend { opacity: 1.0, blend_mode: BlendMode::Normal, source_node: 1 },
            vec![a],
        );
        let b = rect_leaf(&mut arena, 100.0, 100.0, 10.0, 10.0);
        let blend_b = arena.push_effect(
            EffectKind::Blend { opacity: 1.0, blend_mode: BlendMode::Normal, source_node: 2 },
            vec![b],
        );
        let root = arena.push_effect(EffectKind::Transform { translation: (0.0, 0.0) }, vec![blend_a, blend_b]);
        arena.set_root(root);
        arena.assign_parents();

        let layers = partition_into_layers(&arena);
        assert_eq!(layers.len(), 2);
    }

    /// Scenario 3 / Open Question 2: a bounds intersection with an
    /// existing layer must force a *new* layer to be appended, never
    /// replace the old one — replacing would drop the old layer's
    /// items from the result entirely.
    #[test]
    fn scenario_3_intersection_forces_append_not_replace() {
        let mut arena = DisplayArena::new();
        let a = rect_leaf(&mut arena, 0.0, 0.0, 50.0, 50.0);
        let blend_a = arena.push_effect(
            EffectKind::Blend { opacity: 1.0, blend_mode: BlendMode::Normal, source_node: 1 },
            vec![a],
        );
        // Overlaps `a`'s bounds but has a different parent, so it cannot merge.
        let b = rect_leaf(&mut arena, 10.0, 10.0, 50.0, 50.0);
        let blend_b = arena.push_effect(
            EffectKind::Blend { opacity: 1.0, blend_mode: BlendMode::Normal, source_node: 2 },
            vec![b],
        );
        let root = arena.push_effect(EffectKind::Transform { translation: (0.0, 0.0) }, vec![blend_a, blend_b]);
        arena.set_root(root);
        arena.assign_parents();

        let layers = partition_into_layers(&arena);
        assert_eq!(layers.len(), 2, "intersecting bounds must append a new layer, not replace the old one");
        assert!(layers.iter().any(|l| l.items.contains(&a)));
        assert!(layers.iter().any(|l| l.items.contains(&b)));
    }

    #[test]
    fn every_paint_command_ends_up_in_exactly_one_layer() {
        let mut arena = DisplayArena::new();
        let a = rect_leaf(&mut arena, 0.0, 0.0, 10.0, 10.0);
        let b = rect_leaf(&mut arena, 5.0, 5.0, 10.0, 10.0);
        let c = rect_leaf(&mut arena, 200.0, 200.0, 10.0, 10.0);
        let blend = arena.push_effect(
            EffectKind::Blend { opacity: 1.0, blend_mode: BlendMode::Normal, source_node: 1 },
            vec![a, b],
        );
        let root = arena.push_effect(EffectKind::Transform { translation: (0.0, 0.0) }, vec![blend, c]);
        arena.set_root(root);
        arena.assign_parents();

        let layers = partition_into_layers(&arena);
        let total: usize = layers.iter().map(|l| l.items.len()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn composite_result_draw_list_is_not_empty() {
        let mut arena = DisplayArena::new();
        let a = rect_leaf(&mut arena, 0.0, 0.0, 10.0, 10.0);
        arena.set_root(a);
        arena.assign_parents();

        let result = composite(&arena, &CompositedUpdates::new());
        assert_eq!(result.layers.len(), 1);
        assert!(!result.draw_list.is_empty());
    }
}
