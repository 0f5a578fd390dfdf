//! Remote stroke assembly: live fragments from other authors into paths.
//!
//! Each remote author has at most one open `RemoteStroke`, created by
//! `stroke-start` and closed by `stroke-end`. Every `stroke-move` paints one
//! incremental segment onto the `Surface` right away. Fragments for an author
//! with no open stroke are dropped; they show up after disconnect/reconnect
//! races and are harmless.

#[cfg(test)]
#[path = "assembler_test.rs"]
mod assembler_test;

use std::collections::HashMap;

use crate::protocol::{OperationId, Point, Stroke, StrokeStart, Tool, UserId};
use crate::room::Operation;

/// How a segment combines with what is already painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    /// Normal paint over existing pixels.
    Paint,
    /// Destructive blend that removes existing pixels.
    Erase,
}

impl From<Tool> for Blend {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Brush => Blend::Paint,
            Tool::Eraser => Blend::Erase,
        }
    }
}

/// Style applied to one painted segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStyle<'a> {
    pub color: &'a str,
    pub width: f64,
    pub blend: Blend,
}

/// Whatever actually puts pixels on screen.
pub trait Surface {
    /// Wipe everything painted so far.
    fn clear(&mut self);
    /// Paint a straight segment between two points.
    fn draw_segment(&mut self, from: Point, to: Point, style: &SegmentStyle<'_>);
}

/// Paint a whole stroke, segment by segment. A single point paints nothing.
pub fn draw_stroke(surface: &mut impl Surface, stroke: &Stroke) {
    let style = SegmentStyle { color: &stroke.color, width: stroke.width, blend: stroke.tool.into() };
    for pair in stroke.points.windows(2) {
        surface.draw_segment(pair[0], pair[1], &style);
    }
}

/// An in-progress stroke from one remote author.
#[derive(Debug, Clone, PartialEq)]
struct RemoteStroke {
    points: Vec<Point>,
    color: String,
    width: f64,
    tool: Tool,
}

#[derive(Debug, Default)]
pub struct StrokeAssembler {
    sessions: HashMap<UserId, RemoteStroke>,
}

impl StrokeAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or silently replace) the author's stroke with its first point.
    pub fn start(&mut self, author: UserId, start: &StrokeStart) {
        self.sessions.insert(
            author,
            RemoteStroke { points: vec![start.point()], color: start.color.clone(), width: start.width, tool: start.tool },
        );
    }

    /// Paint the segment from the author's last point to `to` and extend the
    /// stroke. Returns `false` when the author has no open stroke.
    pub fn extend(&mut self, author: UserId, to: Point, surface: &mut impl Surface) -> bool {
        let Some(session) = self.sessions.get_mut(&author) else {
            return false;
        };
        if let Some(&from) = session.points.last() {
            let style = SegmentStyle { color: &session.color, width: session.width, blend: session.tool.into() };
            surface.draw_segment(from, to, &style);
        }
        session.points.push(to);
        true
    }

    /// Close the author's stroke into a durable operation carrying the
    /// server-confirmed id. The open stroke is discarded either way.
    pub fn finish(&mut self, author: UserId, operation_id: OperationId) -> Option<Operation> {
        let session = self.sessions.remove(&author)?;
        let stroke = Stroke { tool: session.tool, color: session.color, width: session.width, points: session.points };
        Some(Operation::with_id(operation_id, stroke, author))
    }

    /// Drop the author's open stroke without finalizing it.
    pub fn discard(&mut self, author: &UserId) -> bool {
        self.sessions.remove(author).is_some()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    #[must_use]
    pub fn is_drawing(&self, author: &UserId) -> bool {
        self.sessions.contains_key(author)
    }

    /// Points collected so far for the author's open stroke.
    #[must_use]
    pub fn points(&self, author: &UserId) -> Option<&[Point]> {
        self.sessions.get(author).map(|s| s.points.as_slice())
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.sessions.len()
    }
}
