use tracing::debug;

use crate::bands::{Band, BandSet};
use crate::config::Limits;

/// A pointer position already mapped into composite-image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasPoint {
    pub x: f32,
    pub y: f32,
}

impl CanvasPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn manhattan_distance(&self, other: CanvasPoint) -> f32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    /// Deletes the band under the pointer.
    Secondary,
}

/// The gesture in progress between a press and its release.
///
/// Each variant carries only what that gesture needs; `index` always refers
/// to the band being edited in the editor's [`BandSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    ResizingTop {
        index: usize,
    },
    ResizingBottom {
        index: usize,
    },
    /// Pressed inside a band; becomes a move once the pointer travels,
    /// otherwise the release splits the band.
    PendingMoveOrSplit {
        index: usize,
        press: CanvasPoint,
        anchor_y: f32,
        origin: Band,
    },
    Moving {
        index: usize,
        anchor_y: f32,
        origin: Band,
    },
    Creating {
        index: usize,
        anchor_y: f32,
    },
}

/// Advisory cursor shape for a hovering pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverHint {
    Default,
    ResizeEdge,
    MoveBand,
}

/// Pointer-driven editor owning the band set of one composite.
///
/// Only one gesture runs at a time; presses are ignored until the current
/// gesture is released. The band set is merged and disjoint whenever the
/// editor is idle.
#[derive(Debug, Clone)]
pub struct SelectionEditor {
    bands: BandSet,
    height: f32,
    limits: Limits,
    gesture: Gesture,
}

impl SelectionEditor {
    pub fn new(limits: Limits) -> Self {
        Self {
            bands: BandSet::new(),
            height: 0.0,
            limits,
            gesture: Gesture::Idle,
        }
    }

    /// Starts over on a composite of `height` with one full-height band.
    pub fn reset(&mut self, height: f32) {
        self.height = height.max(0.0);
        self.bands.reset_to_full(self.height);
        self.gesture = Gesture::Idle;
    }

    /// Drops every band and any gesture, e.g. when no composite is loaded.
    pub fn clear(&mut self) {
        self.height = 0.0;
        self.bands.clear();
        self.gesture = Gesture::Idle;
    }

    pub fn reset_to_full(&mut self) {
        self.bands.reset_to_full(self.height);
        self.gesture = Gesture::Idle;
    }

    pub fn bands(&self) -> &BandSet {
        &self.bands
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// What the band set will look like once merged; used for live overlays
    /// while a drag is still running.
    pub fn preview(&self) -> BandSet {
        if self.is_active() {
            self.bands.merged()
        } else {
            self.bands.clone()
        }
    }

    /// Snaps to the nearest whole pixel row inside the composite. Band edges
    /// are always whole rows, so planning and export see the same heights.
    fn clamp_y(&self, y: f32) -> f32 {
        y.round().clamp(0.0, self.height)
    }

    /// Handles a press. Returns `true` when the band set changed.
    pub fn pointer_down(&mut self, button: PointerButton, point: CanvasPoint) -> bool {
        if self.is_active() || self.height <= 0.0 {
            return false;
        }
        let y = self.clamp_y(point.y);

        if button == PointerButton::Secondary {
            let removed = self.bands.delete_overlapping(y);
            if let Some(band) = removed {
                debug!(top = band.top, bottom = band.bottom, "deleted band");
            }
            return removed.is_some();
        }

        let margin = self.limits.edge_margin;
        for (index, band) in self.bands.bands().iter().enumerate() {
            if (y - band.top).abs() < margin {
                self.gesture = Gesture::ResizingTop { index };
                return false;
            } else if (y - band.bottom).abs() < margin {
                self.gesture = Gesture::ResizingBottom { index };
                return false;
            } else if band.contains(y) {
                self.gesture = Gesture::PendingMoveOrSplit {
                    index,
                    press: point,
                    anchor_y: y,
                    origin: *band,
                };
                return false;
            }
        }

        let index = self.bands.insert_band(Band::new(y, y));
        self.gesture = Gesture::Creating { index, anchor_y: y };
        true
    }

    /// Applies a drag step to the active gesture. Returns `true` when the
    /// band set changed.
    pub fn pointer_move(&mut self, point: CanvasPoint) -> bool {
        let y = self.clamp_y(point.y);

        if let Gesture::PendingMoveOrSplit {
            index,
            press,
            anchor_y,
            origin,
        } = self.gesture
        {
            if point.manhattan_distance(press) <= self.limits.drag_threshold {
                return false;
            }
            self.gesture = Gesture::Moving {
                index,
                anchor_y,
                origin,
            };
        }

        let index = match self.gesture {
            Gesture::Idle | Gesture::PendingMoveOrSplit { .. } => return false,
            Gesture::ResizingTop { index }
            | Gesture::ResizingBottom { index }
            | Gesture::Moving { index, .. }
            | Gesture::Creating { index, .. } => index,
        };
        let Some(band) = self.bands.get(index) else {
            self.gesture = Gesture::Idle;
            return false;
        };

        let updated = match self.gesture {
            Gesture::ResizingTop { .. } => {
                let top = y.min(band.bottom - self.limits.min_drag_height).max(0.0);
                Band::new(top, band.bottom)
            }
            Gesture::ResizingBottom { .. } => {
                let bottom = y
                    .max(band.top + self.limits.min_drag_height)
                    .min(self.height);
                Band::new(band.top, bottom)
            }
            Gesture::Creating { anchor_y, .. } => Band::new(anchor_y.min(y), anchor_y.max(y)),
            Gesture::Moving {
                anchor_y, origin, ..
            } => shifted_within(origin, y - anchor_y, self.height),
            Gesture::Idle | Gesture::PendingMoveOrSplit { .. } => band,
        };

        if updated == band {
            return false;
        }
        self.bands.replace_at(index, updated)
    }

    /// Finishes the active gesture: a click inside a band splits it,
    /// anything else drops tiny bands and merges. Returns `true` when a
    /// gesture was finished.
    pub fn pointer_up(&mut self, point: CanvasPoint) -> bool {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Idle => false,
            Gesture::PendingMoveOrSplit { index, .. } => {
                let y = self.clamp_y(point.y);
                if !self.try_split(index, y) {
                    self.settle();
                }
                true
            }
            _ => {
                self.settle();
                true
            }
        }
    }

    /// Abandons the active gesture, keeping whatever geometry it produced.
    pub fn cancel(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.gesture = Gesture::Idle;
        self.settle();
        true
    }

    fn try_split(&mut self, index: usize, y: f32) -> bool {
        let Some(band) = self.bands.get(index) else {
            return false;
        };
        let clearance = self.limits.split_clearance;
        if !(band.top + clearance < y && y < band.bottom - clearance) {
            return false;
        }
        self.bands.replace_at(index, Band::new(band.top, y));
        self.bands.insert_band(Band::new(y, band.bottom));
        self.bands.merge();
        debug!(at = y, bands = self.bands.len(), "split band");
        true
    }

    fn settle(&mut self) {
        self.bands.remove_tiny_bands(self.limits.tiny_band_height);
        self.bands.merge();
        self.bands.assert_disjoint();
        debug!(
            bands = self.bands.len(),
            kept = self.bands.total_height(),
            "gesture committed"
        );
    }

    pub fn hover_hint(&self, point: CanvasPoint) -> HoverHint {
        let y = self.clamp_y(point.y);
        let margin = self.limits.edge_margin;
        for band in self.bands.bands() {
            if (y - band.top).abs() < margin || (y - band.bottom).abs() < margin {
                return HoverHint::ResizeEdge;
            } else if band.contains(y) {
                return HoverHint::MoveBand;
            }
        }
        HoverHint::Default
    }
}

/// Moves `origin` by `dy`, keeping its height and staying inside `[0, height]`.
fn shifted_within(origin: Band, dy: f32, height: f32) -> Band {
    let h = origin.height();
    let mut top = origin.top + dy;
    let mut bottom = top + h;
    if top < 0.0 {
        top = 0.0;
        bottom = h;
    }
    if bottom > height {
        bottom = height;
        top = bottom - h;
    }
    Band::new(top, bottom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn editor(height: f32) -> SelectionEditor {
        let mut e = SelectionEditor::new(Limits::default());
        e.reset(height);
        e
    }

    fn pt(y: f32) -> CanvasPoint {
        CanvasPoint::new(400.0, y)
    }

    fn pairs(e: &SelectionEditor) -> Vec<(f32, f32)> {
        e.bands().bands().iter().map(|b| (b.top, b.bottom)).collect()
    }

    fn click(e: &mut SelectionEditor, y: f32) {
        e.pointer_down(PointerButton::Primary, pt(y));
        e.pointer_up(pt(y));
    }

    fn drag(e: &mut SelectionEditor, from: f32, to: f32) {
        e.pointer_down(PointerButton::Primary, pt(from));
        e.pointer_move(pt(to));
        e.pointer_up(pt(to));
    }

    #[test]
    fn click_inside_band_splits_it() {
        let mut e = editor(1000.0);
        click(&mut e, 400.0);
        assert_eq!(pairs(&e), vec![(0.0, 400.0), (400.0, 1000.0)]);
        assert_eq!(e.gesture(), Gesture::Idle);
    }

    #[test]
    fn moving_split_band_into_neighbour_merges_them() {
        let mut e = editor(1000.0);
        click(&mut e, 400.0);
        drag(&mut e, 200.0, 250.0);
        assert_eq!(pairs(&e), vec![(50.0, 1000.0)]);
    }

    #[test]
    fn moved_band_touching_neighbour_stays_separate() {
        let mut e = editor(1000.0);
        drag(&mut e, 985.0, 400.0);
        drag(&mut e, 500.0, 1000.0);
        assert_eq!(pairs(&e), vec![(0.0, 400.0), (500.0, 1000.0)]);

        drag(&mut e, 200.0, 250.0);
        assert_eq!(pairs(&e), vec![(50.0, 450.0), (500.0, 1000.0)]);

        drag(&mut e, 200.0, 250.0);
        assert_eq!(pairs(&e), vec![(100.0, 500.0), (500.0, 1000.0)]);
    }

    #[test]
    fn press_near_top_edge_resizes_top_with_min_height() {
        let mut e = editor(1000.0);
        e.pointer_down(PointerButton::Primary, pt(10.0));
        assert_eq!(e.gesture(), Gesture::ResizingTop { index: 0 });
        e.pointer_move(pt(2000.0));
        assert_eq!(pairs(&e), vec![(990.0, 1000.0)]);
        e.pointer_move(pt(-50.0));
        assert_eq!(pairs(&e), vec![(0.0, 1000.0)]);
        e.pointer_move(pt(300.0));
        e.pointer_up(pt(300.0));
        assert_eq!(pairs(&e), vec![(300.0, 1000.0)]);
    }

    #[test]
    fn press_near_bottom_edge_resizes_bottom() {
        let mut e = editor(1000.0);
        e.pointer_down(PointerButton::Primary, pt(985.0));
        assert_eq!(e.gesture(), Gesture::ResizingBottom { index: 0 });
        e.pointer_move(pt(-100.0));
        assert_eq!(pairs(&e), vec![(0.0, 10.0)]);
        e.pointer_move(pt(600.0));
        e.pointer_up(pt(600.0));
        assert_eq!(pairs(&e), vec![(0.0, 600.0)]);
    }

    #[test]
    fn drag_in_empty_space_creates_band() {
        let mut e = editor(1000.0);
        drag(&mut e, 985.0, 300.0); // shrink to [0, 300]
        assert!(e.pointer_down(PointerButton::Primary, pt(800.0)));
        assert!(matches!(e.gesture(), Gesture::Creating { index: 1, .. }));
        e.pointer_move(pt(600.0));
        assert_eq!(pairs(&e), vec![(0.0, 300.0), (600.0, 800.0)]);
        e.pointer_up(pt(600.0));
        assert_eq!(pairs(&e), vec![(0.0, 300.0), (600.0, 800.0)]);
    }

    #[test]
    fn created_band_overlapping_existing_one_is_merged() {
        let mut e = editor(1000.0);
        drag(&mut e, 985.0, 300.0);
        drag(&mut e, 700.0, 200.0);
        assert_eq!(pairs(&e), vec![(0.0, 700.0)]);
    }

    #[test]
    fn click_in_empty_space_leaves_no_band() {
        let mut e = editor(1000.0);
        drag(&mut e, 985.0, 300.0);
        click(&mut e, 700.0);
        assert_eq!(pairs(&e), vec![(0.0, 300.0)]);
    }

    #[test]
    fn gesture_ending_with_tiny_band_drops_it() {
        let mut e = editor(1000.0);
        drag(&mut e, 985.0, 300.0);
        drag(&mut e, 700.0, 705.0);
        assert_eq!(pairs(&e), vec![(0.0, 300.0)]);
        drag(&mut e, 700.0, 706.0);
        assert_eq!(pairs(&e), vec![(0.0, 300.0), (700.0, 706.0)]);
    }

    #[test]
    fn small_wiggle_still_splits() {
        let mut e = editor(1000.0);
        e.pointer_down(PointerButton::Primary, pt(400.0));
        assert!(!e.pointer_move(CanvasPoint::new(402.0, 403.0)));
        assert!(matches!(e.gesture(), Gesture::PendingMoveOrSplit { .. }));
        e.pointer_up(CanvasPoint::new(402.0, 403.0));
        assert_eq!(pairs(&e), vec![(0.0, 403.0), (403.0, 1000.0)]);
    }

    #[test]
    fn horizontal_travel_promotes_to_move() {
        let mut e = editor(1000.0);
        drag(&mut e, 985.0, 500.0);
        e.pointer_down(PointerButton::Primary, pt(250.0));
        e.pointer_move(CanvasPoint::new(410.0, 250.0));
        assert!(matches!(e.gesture(), Gesture::Moving { .. }));
        e.pointer_up(CanvasPoint::new(410.0, 250.0));
        assert_eq!(pairs(&e), vec![(0.0, 500.0)]);
    }

    #[test]
    fn split_requires_clearance_from_edges() {
        let mut e = editor(1000.0);
        drag(&mut e, 985.0, 100.0); // [0, 100]
        click(&mut e, 50.0);
        assert_eq!(pairs(&e), vec![(0.0, 50.0), (50.0, 100.0)]);

        let limits = Limits {
            edge_margin: 2.0,
            ..Limits::default()
        };
        let mut e = SelectionEditor::new(limits);
        e.reset(1000.0);
        click(&mut e, 5.0);
        assert_eq!(pairs(&e), vec![(0.0, 1000.0)]);
        click(&mut e, 11.0);
        assert_eq!(pairs(&e), vec![(0.0, 11.0), (11.0, 1000.0)]);
    }

    #[test]
    fn move_is_clamped_to_canvas() {
        let mut e = editor(1000.0);
        drag(&mut e, 985.0, 400.0); // [0, 400]
        drag(&mut e, 200.0, 2000.0);
        assert_eq!(pairs(&e), vec![(600.0, 1000.0)]);
        drag(&mut e, 800.0, -500.0);
        assert_eq!(pairs(&e), vec![(0.0, 400.0)]);
    }

    #[test]
    fn secondary_press_deletes_band_under_pointer() {
        let mut e = editor(1000.0);
        click(&mut e, 400.0);
        assert!(e.pointer_down(PointerButton::Secondary, pt(700.0)));
        assert_eq!(pairs(&e), vec![(0.0, 400.0)]);
        assert_eq!(e.gesture(), Gesture::Idle);
        assert!(!e.pointer_down(PointerButton::Secondary, pt(700.0)));
    }

    #[test]
    fn press_is_ignored_while_gesture_active() {
        let mut e = editor(1000.0);
        e.pointer_down(PointerButton::Primary, pt(400.0));
        let before = e.gesture();
        assert!(!e.pointer_down(PointerButton::Secondary, pt(400.0)));
        assert_eq!(e.gesture(), before);
        assert_eq!(e.bands().len(), 1);
    }

    #[test]
    fn preview_merges_without_mutating_bands() {
        let mut e = editor(1000.0);
        click(&mut e, 400.0);
        e.pointer_down(PointerButton::Primary, pt(200.0));
        e.pointer_move(pt(300.0));
        assert_eq!(e.bands().len(), 2);
        assert_eq!(e.preview().bands(), &[Band::new(100.0, 1000.0)]);
        e.pointer_up(pt(300.0));
        assert_eq!(pairs(&e), vec![(100.0, 1000.0)]);
    }

    #[test]
    fn hover_hint_reports_edges_and_interior() {
        let mut e = editor(1000.0);
        drag(&mut e, 985.0, 500.0);
        assert_eq!(e.hover_hint(pt(5.0)), HoverHint::ResizeEdge);
        assert_eq!(e.hover_hint(pt(490.0)), HoverHint::ResizeEdge);
        assert_eq!(e.hover_hint(pt(250.0)), HoverHint::MoveBand);
        assert_eq!(e.hover_hint(pt(800.0)), HoverHint::Default);
    }

    #[test]
    fn cancel_settles_geometry() {
        let mut e = editor(1000.0);
        drag(&mut e, 985.0, 300.0);
        e.pointer_down(PointerButton::Primary, pt(600.0));
        e.pointer_move(pt(603.0));
        assert!(e.cancel());
        assert_eq!(pairs(&e), vec![(0.0, 300.0)]);
        assert!(!e.cancel());
    }

    #[test]
    fn empty_canvas_ignores_input() {
        let mut e = SelectionEditor::new(Limits::default());
        assert!(!e.pointer_down(PointerButton::Primary, pt(10.0)));
        assert!(!e.is_active());
        assert!(e.bands().is_empty());
    }

    #[test]
    fn fractional_pointer_positions_snap_to_rows() {
        let mut e = editor(20000.0);
        drag(&mut e, 5.0, 0.75);
        drag(&mut e, 19995.0, 9600.5);
        drag(&mut e, 9700.75, 19301.0);
        assert_eq!(pairs(&e), vec![(1.0, 9601.0), (9701.0, 19301.0)]);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Click(f32),
        Drag(f32, f32),
        Delete(f32),
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0f32..1000.0).prop_map(Step::Click),
            (-50f32..1050.0, -50f32..1050.0).prop_map(|(a, b)| Step::Drag(a, b)),
            (0f32..1000.0).prop_map(Step::Delete),
        ]
    }

    proptest! {
        #[test]
        fn completed_gestures_leave_disjoint_bands(steps in prop::collection::vec(arb_step(), 1..40)) {
            let mut e = editor(1000.0);
            for step in steps {
                match step {
                    Step::Click(y) => click(&mut e, y),
                    Step::Drag(a, b) => drag(&mut e, a, b),
                    Step::Delete(y) => {
                        e.pointer_down(PointerButton::Secondary, pt(y));
                    }
                }
                prop_assert!(!e.is_active());
                let bands = e.bands().bands();
                prop_assert!(e.bands().is_disjoint());
                for (i, a) in bands.iter().enumerate() {
                    prop_assert!(a.top >= 0.0 && a.bottom <= 1000.0);
                    prop_assert!(a.height() > 0.0);
                    prop_assert_eq!(a.top, a.top.round());
                    prop_assert_eq!(a.bottom, a.bottom.round());
                    for b in &bands[i + 1..] {
                        prop_assert!(!a.overlaps(b));
                    }
                }
            }
        }

        #[test]
        fn split_keeps_total_height(y in 0f32..1000.0) {
            let mut e = editor(1000.0);
            let before = e.bands().total_height();
            click(&mut e, y);
            prop_assert!((e.bands().total_height() - before).abs() < 1e-3);
        }
    }
}
