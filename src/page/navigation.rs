//! In-viewer navigation: keys, swipes and carousel controls.

use crate::dom::{Document, Markup, NodeId};

/// Minimum horizontal travel for a touch gesture to count as a swipe.
pub const SWIPE_THRESHOLD: f64 = 50.0;

/// User input that may change the active item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    ArrowLeft,
    ArrowRight,
    /// Touch travel measured from touch start to touch end.
    Swipe { target: NodeId, dx: f64, dy: f64 },
    /// A click anywhere; only navigation controls move the pointer.
    Click(NodeId),
}

/// Direction of a swipe: `+1` for next, `-1` for previous.
pub fn swipe_step(dx: f64, dy: f64) -> Option<isize> {
    if dx.abs() > SWIPE_THRESHOLD && dx.abs() > dy.abs() {
        Some(if dx < 0.0 { 1 } else { -1 })
    } else {
        None
    }
}

/// Pointer to the active slide of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidePointer {
    pub current: usize,
    pub len: usize,
}

impl SlidePointer {
    /// The slide the document currently shows: the first one not hidden, else the first.
    pub fn from_document(doc: &Document, markup: &dyn Markup, container: NodeId) -> Option<Self> {
        let slides = markup.slides(doc, container);
        if slides.is_empty() {
            return None;
        }
        let current = slides
            .iter()
            .position(|s| doc.attr(*s, "aria-hidden") == Some("false"))
            .or_else(|| slides.iter().position(|s| doc.attr(*s, "aria-hidden") != Some("true")))
            .unwrap_or(0);
        Some(Self {
            current,
            len: slides.len(),
        })
    }

    /// Move by `delta`, clamped to the slide range. Returns whether it moved.
    pub fn step(&mut self, delta: isize) -> bool {
        if self.len == 0 {
            return false;
        }
        let target = (self.current as isize + delta).clamp(0, self.len as isize - 1) as usize;
        self.select(target)
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.len || index == self.current {
            return false;
        }
        self.current = index;
        true
    }
}
