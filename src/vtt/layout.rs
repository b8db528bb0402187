//! Cue-box layout with collision avoidance.
//!
//! [`process_cues`] walks the active cues in array order, computes an
//! absolutely-positioned box for every cue that lacks a cached one (or was
//! mutated since), and nudges each new box out of the boxes already placed
//! this pass. The search is greedy and order-sensitive: it avoids collisions
//! against earlier cues only, it does not find a globally optimal packing.

use crate::vtt::cue::{Cue, CueAlign, CueLine, CuePosition, WritingDirection};
use std::rc::Rc;

/// An absolutely-positioned rectangle, in container coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxPosition {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxPosition {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        BoxPosition {
            top,
            left,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Whether the rectangles share any interior area.
    pub fn overlaps(&self, other: &BoxPosition) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }

    /// Interior area shared with `other`.
    pub fn overlap_area(&self, other: &BoxPosition) -> f64 {
        if !self.overlaps(other) {
            return 0.0;
        }
        let w = self.right().min(other.right()) - self.left.max(other.left);
        let h = self.bottom().min(other.bottom()) - self.top.max(other.top);
        w * h
    }

    /// Whether `inner` lies entirely within this rectangle.
    pub fn contains_box(&self, inner: &BoxPosition) -> bool {
        inner.left >= self.left
            && inner.right() <= self.right()
            && inner.top >= self.top
            && inner.bottom() <= self.bottom()
    }
}

/// Lay out `cues` inside `container`, reusing cached boxes for unmutated
/// cues. Returns the box of every cue, in cue order; the same boxes are
/// stored on the cues as their display state.
pub fn process_cues(
    container: &BoxPosition,
    cues: &mut [Cue],
    line_height: f64,
) -> Vec<Rc<BoxPosition>> {
    let mut placed: Vec<Rc<BoxPosition>> = Vec::with_capacity(cues.len());
    for cue in cues.iter_mut() {
        if !cue.needs_layout() {
            if let Some(state) = cue.display_state() {
                placed.push(Rc::clone(state));
                continue;
            }
        }
        let initial = initial_box(container, cue, line_height);
        let resolved = place_box(
            initial,
            &placed,
            container,
            line_height,
            push_directions(cue.vertical()),
        );
        let resolved = Rc::new(resolved);
        cue.set_display_state(Rc::clone(&resolved));
        placed.push(resolved);
    }
    placed
}

/// Nudge directions along the axis perpendicular to the writing direction,
/// as `(dx, dy)` unit steps.
fn push_directions(vertical: WritingDirection) -> &'static [(f64, f64)] {
    match vertical {
        WritingDirection::Horizontal => &[(0.0, 1.0), (0.0, -1.0)],
        WritingDirection::VerticalGrowingRight => &[(1.0, 0.0), (-1.0, 0.0)],
        WritingDirection::VerticalGrowingLeft => &[(-1.0, 0.0), (1.0, 0.0)],
    }
}

/// The box a cue asks for before collision avoidance: extent from `size`
/// along the writing axis, placement from `position`/`align`, offset on the
/// other axis from `line`.
fn initial_box(container: &BoxPosition, cue: &Cue, line_height: f64) -> BoxPosition {
    let lines = cue.text_line_count() as f64;
    match cue.vertical() {
        WritingDirection::Horizontal => {
            let width = container.width * cue.size() / 100.0;
            let height = line_height * lines;
            let left = container.left
                + container.width * axis_placement_percent(cue) / 100.0;
            let left = left.clamp(container.left, (container.right() - width).max(container.left));
            let top = container.top
                + cross_axis_offset(cue, container.height, height, line_height);
            let top = top.clamp(container.top, (container.bottom() - height).max(container.top));
            BoxPosition::new(top, left, width, height)
        }
        direction => {
            let width = line_height * lines;
            let height = container.height * cue.size() / 100.0;
            let top = container.top
                + container.height * axis_placement_percent(cue) / 100.0;
            let top = top.clamp(container.top, (container.bottom() - height).max(container.top));
            let offset = cross_axis_offset(cue, container.width, width, line_height);
            let left = match direction {
                WritingDirection::VerticalGrowingRight => container.left + offset,
                // columns grow leftward: the line axis runs from the right edge
                _ => container.right() - width - offset,
            };
            let left = left.clamp(container.left, (container.right() - width).max(container.left));
            BoxPosition::new(top, left, width, height)
        }
    }
}

/// Leading-edge placement along the writing axis, as a percentage of the
/// container extent.
fn axis_placement_percent(cue: &Cue) -> f64 {
    let position = match cue.position() {
        CuePosition::Percent(p) => p,
        CuePosition::Auto => match cue.align() {
            CueAlign::Start | CueAlign::Left => 0.0,
            CueAlign::Center => 50.0,
            CueAlign::End | CueAlign::Right => 100.0,
        },
    };
    match cue.align() {
        CueAlign::Start | CueAlign::Left => position,
        CueAlign::Center => position - cue.size() / 2.0,
        CueAlign::End | CueAlign::Right => position - cue.size(),
    }
}

/// Offset perpendicular to the writing axis. Snap-to-lines quantizes to
/// multiples of the line height, with negative line numbers measured back
/// from the far edge; otherwise `line` is a free percentage of the leftover
/// extent.
fn cross_axis_offset(cue: &Cue, extent: f64, box_extent: f64, line_height: f64) -> f64 {
    if cue.snap_to_lines() {
        let line = match cue.line() {
            CueLine::Number(n) => n.round(),
            CueLine::Auto => -1.0,
        };
        if line >= 0.0 {
            line_height * line
        } else {
            extent + line_height * line
        }
    } else {
        let percent = match cue.line() {
            CueLine::Number(n) => n,
            CueLine::Auto => 100.0,
        };
        (extent - box_extent) * percent / 100.0
    }
}

/// Walk the push directions in order, nudging one line-height at a time.
/// The first collision-free position inside the container wins; failing
/// that, the in-container position with the least overlap fraction.
fn place_box(
    initial: BoxPosition,
    placed: &[Rc<BoxPosition>],
    container: &BoxPosition,
    step: f64,
    directions: &'static [(f64, f64)],
) -> BoxPosition {
    let mut best: Option<(BoxPosition, f64)> = None;

    for &(dx, dy) in directions {
        let mut candidate = initial.clone();
        while candidate.overlaps(container) {
            let inside = container.contains_box(&candidate);
            let overlap = overlap_fraction(&candidate, placed);
            if inside && overlap == 0.0 {
                return candidate;
            }
            if inside
                && best
                    .as_ref()
                    .map(|(_, f)| overlap < *f)
                    .unwrap_or(true)
            {
                best = Some((candidate.clone(), overlap));
            }
            candidate.left += dx * step;
            candidate.top += dy * step;
        }
    }

    best.map(|(b, _)| b).unwrap_or(initial)
}

/// Total area shared with already-placed boxes, as a fraction of the
/// candidate's own area.
fn overlap_fraction(candidate: &BoxPosition, placed: &[Rc<BoxPosition>]) -> f64 {
    if candidate.area() == 0.0 {
        return 0.0;
    }
    let shared: f64 = placed
        .iter()
        .map(|other| candidate.overlap_area(other))
        .sum();
    shared / candidate.area()
}
