//! Layout measurement behind a trait, so drop placement can run against
//! synthetic geometry in tests and against the live DOM in the browser.

/// A viewport point (client coordinates).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Vertical extent of one direct child of the surface, in client coordinates,
/// tagged with the document position where that child starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeBox {
    pub position: usize,
    pub top: f64,
    pub bottom: f64,
}

pub trait PositionResolver {
    /// Top edge of the editable surface, in client coordinates.
    fn surface_top(&self) -> f64;

    /// Boxes of the surface's direct children, in child order.
    fn node_boxes(&self) -> Vec<NodeBox>;

    /// Document position of the caret under `point`, if one can be resolved.
    fn caret_at(&self, point: Point) -> Option<usize>;
}

/// Midpoint of the gap between `upper`'s bottom and `lower`'s top.
pub fn gap_midpoint(upper: &NodeBox, lower: &NodeBox) -> f64 {
    upper.bottom + (lower.top - upper.bottom) / 2.0
}

/// Scan consecutive child pairs and return the first gap midpoint (relative to
/// the surface) within `tolerance` of `pointer_y` (also relative).
///
/// Pairs are taken in child order and not sorted, so the first match wins even
/// when children overlap.
pub fn find_line_gap(boxes: &[NodeBox], surface_top: f64, pointer_y: f64, tolerance: f64) -> Option<f64> {
    boxes.windows(2).find_map(|pair| {
        let mid = gap_midpoint(&pair[0], &pair[1]) - surface_top;
        ((pointer_y - mid).abs() < tolerance).then_some(mid)
    })
}

/// Document position of the first child whose top edge (relative to the
/// surface) lies below `offset`.
pub fn first_node_below(boxes: &[NodeBox], surface_top: f64, offset: f64) -> Option<usize> {
    boxes
        .iter()
        .find(|b| b.top - surface_top > offset)
        .map(|b| b.position)
}

/// Fixed geometry for headless tests.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub(crate) struct FixedLayout {
    pub top: f64,
    pub boxes: Vec<NodeBox>,
    pub caret: Option<usize>,
}

#[cfg(test)]
impl FixedLayout {
    /// One child per line of height `line`, starting at `top`, children at the
    /// given document positions.
    pub fn lines(top: f64, line: f64, positions: &[usize]) -> Self {
        let boxes = positions
            .iter()
            .enumerate()
            .map(|(i, &position)| NodeBox {
                position,
                top: top + i as f64 * line,
                bottom: top + (i + 1) as f64 * line,
            })
            .collect();
        Self {
            top,
            boxes,
            caret: None,
        }
    }

    pub fn with_caret(mut self, caret: Option<usize>) -> Self {
        self.caret = caret;
        self
    }
}

#[cfg(test)]
impl PositionResolver for FixedLayout {
    fn surface_top(&self) -> f64 {
        self.top
    }

    fn node_boxes(&self) -> Vec<NodeBox> {
        self.boxes.clone()
    }

    fn caret_at(&self, _point: Point) -> Option<usize> {
        self.caret
    }
}
