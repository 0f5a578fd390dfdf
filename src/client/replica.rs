//! Client-local replica of one room.
//!
//! The replica applies server events in arrival order and produces the client
//! events a UI should send for local actions. The server stays authoritative:
//!
//! - `operation-undone` removes by id, whoever the author.
//! - `operation-redone` is echoed to the requester too, so `local_redo` only
//!   asks for the stroke back and waits for the echo before drawing it.
//! - Local strokes keep a provisional id. The server never echoes `stroke-end`
//!   to its author, so a server undo of one's own stroke finds nothing to
//!   remove here; `local_undo` has already popped it.
//! - A peer's undo that pops one's own stroke is therefore not reflected in
//!   the author's replica, although every other replica drops it.

#[cfg(test)]
#[path = "replica_test.rs"]
mod replica_test;

use std::collections::HashMap;

use uuid::Uuid;

use super::assembler::{SegmentStyle, StrokeAssembler, Surface, draw_stroke};
use crate::protocol::{ClientEvent, Point, ServerEvent, Snapshot, Stroke, StrokeStart, Tool, UserId};
use crate::room::{Operation, User};

pub struct CanvasReplica<S: Surface> {
    surface: S,
    self_id: Option<UserId>,
    self_name: Option<String>,
    room_id: Option<String>,
    operations: Vec<Operation>,
    redo_stack: Vec<Operation>,
    /// Other members of the room, keyed by id.
    users: HashMap<UserId, User>,
    assembler: StrokeAssembler,
    draft: Option<Stroke>,
}

impl<S: Surface> CanvasReplica<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            self_id: None,
            self_name: None,
            room_id: None,
            operations: Vec::new(),
            redo_stack: Vec::new(),
            users: HashMap::new(),
            assembler: StrokeAssembler::new(),
            draft: None,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn self_id(&self) -> Option<UserId> {
        self.self_id
    }

    pub fn self_name(&self) -> Option<&str> {
        self.self_name.as_deref()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn assembler(&self) -> &StrokeAssembler {
        &self.assembler
    }

    // =========================================================================
    // SERVER EVENTS
    // =========================================================================

    /// Apply one server event. Returns whether the operation log changed.
    pub fn apply(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::Connected(welcome) => {
                self.self_id = Some(welcome.user_id);
                false
            }
            ServerEvent::InitSnapshot(snapshot) => {
                self.load_snapshot(snapshot);
                true
            }
            ServerEvent::UserJoined(user) => {
                if Some(user.id) != self.self_id {
                    self.users.insert(user.id, user);
                }
                false
            }
            ServerEvent::UserLeft(departure) => {
                self.users.remove(&departure.user_id);
                self.assembler.discard(&departure.user_id);
                false
            }
            ServerEvent::StrokeStart(relayed) => {
                self.assembler.start(relayed.user_id, &relayed.payload);
                false
            }
            ServerEvent::StrokeMove(relayed) => {
                self.assembler
                    .extend(relayed.user_id, relayed.payload, &mut self.surface);
                false
            }
            ServerEvent::StrokeEnd(done) => {
                let Some(op) = self.assembler.finish(done.user_id, done.operation_id) else {
                    return false;
                };
                self.operations.push(op);
                true
            }
            ServerEvent::CursorMove(relayed) => {
                if let Some(user) = self.users.get_mut(&relayed.user_id) {
                    user.cursor = relayed.payload;
                }
                false
            }
            ServerEvent::OperationUndone(undone) => {
                let Some(index) = self
                    .operations
                    .iter()
                    .position(|op| op.id == undone.operation_id)
                else {
                    return false;
                };
                let removed = self.operations.remove(index);
                self.redo_stack.push(removed);
                self.redraw();
                true
            }
            ServerEvent::OperationRedone(op) => {
                draw_stroke(&mut self.surface, &op.stroke);
                self.operations.push(op);
                true
            }
            ServerEvent::CanvasCleared => {
                self.wipe();
                true
            }
            ServerEvent::Error(_) => false,
        }
    }

    fn load_snapshot(&mut self, snapshot: Snapshot) {
        self.self_id = Some(snapshot.user_id);
        self.self_name = Some(snapshot.user_name);
        self.room_id = Some(snapshot.room_id);
        self.operations = snapshot.operations;
        self.redo_stack.clear();
        self.users = snapshot
            .users
            .into_iter()
            .filter(|u| u.id != snapshot.user_id)
            .map(|u| (u.id, u))
            .collect();
        self.assembler.clear();
        self.draft = None;
        self.redraw();
    }

    // =========================================================================
    // LOCAL ACTIONS
    // =========================================================================

    #[must_use]
    pub fn join(&self, room_id: &str) -> ClientEvent {
        ClientEvent::JoinRoom(Some(room_id.to_string()))
    }

    /// Begin a local stroke at `at`.
    pub fn begin_stroke(&mut self, at: Point, color: &str, width: f64, tool: Tool) -> ClientEvent {
        self.draft = Some(Stroke { tool, color: color.to_string(), width, points: vec![at] });
        ClientEvent::StrokeStart(StrokeStart { x: at.x, y: at.y, color: color.to_string(), width, tool })
    }

    /// Extend the local stroke, painting the new segment. `None` when no
    /// stroke is in progress.
    pub fn extend_stroke(&mut self, to: Point) -> Option<ClientEvent> {
        let draft = self.draft.as_mut()?;
        if let Some(&from) = draft.points.last() {
            let style = SegmentStyle { color: &draft.color, width: draft.width, blend: draft.tool.into() };
            self.surface.draw_segment(from, to, &style);
        }
        draft.points.push(to);
        Some(ClientEvent::StrokeMove(to))
    }

    /// Finish the local stroke, record it, and drop the redo history.
    pub fn finish_stroke(&mut self) -> Option<ClientEvent> {
        let stroke = self.draft.take()?;
        let author = self.self_id.unwrap_or(Uuid::nil());
        self.operations.push(Operation::stroke(stroke.clone(), author));
        self.redo_stack.clear();
        Some(ClientEvent::StrokeEnd(stroke))
    }

    /// Pop the newest local entry onto the redo stack and ask the room to undo.
    pub fn local_undo(&mut self) -> Option<ClientEvent> {
        let op = self.operations.pop()?;
        self.redo_stack.push(op);
        self.redraw();
        Some(ClientEvent::Undo)
    }

    /// Ask the room to restore the newest redo entry. It is drawn when the
    /// server echoes `operation-redone`.
    pub fn local_redo(&mut self) -> Option<ClientEvent> {
        let op = self.redo_stack.pop()?;
        Some(ClientEvent::Redo(op.stroke))
    }

    pub fn local_clear(&mut self) -> ClientEvent {
        self.wipe();
        ClientEvent::Clear
    }

    #[must_use]
    pub fn move_cursor(&self, to: Point) -> ClientEvent {
        ClientEvent::CursorMove(to)
    }

    // =========================================================================
    // RENDERING
    // =========================================================================

    /// Clear the surface and replay the whole log.
    pub fn redraw(&mut self) {
        self.surface.clear();
        for op in &self.operations {
            draw_stroke(&mut self.surface, &op.stroke);
        }
    }

    fn wipe(&mut self) {
        self.operations.clear();
        self.redo_stack.clear();
        self.surface.clear();
    }
}
