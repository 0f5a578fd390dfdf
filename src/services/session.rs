//! Session coordinator: per-connection room membership and event handling.
//!
//! DESIGN
//! ======
//! A `Session` is owned by one websocket task and moves through
//! `Unjoined -> Joined(room) -> Joined(other room) -> Unjoined`. It is the
//! only code that changes room membership.
//!
//! Every handler locks the room once, mutates it, and returns a `Delivery`
//! that is fanned out before the lock is released. Events for one room are
//! therefore queued to members in the same order the mutations happened, and
//! a joiner's snapshot is queued ahead of anything that follows it.
//!
//! CONSISTENCY
//! ===========
//! Last writer wins by server arrival. Concurrent undos from different users
//! race on the same tail pop; whoever is processed first removes the newest
//! operation, whoever authored it. Nothing is reordered or reconciled.
//!
//! Every handler except `join` is a silent no-op while unjoined.

use tracing::{debug, info};

use crate::protocol::{
    ClientEvent, Departure, OperationUndone, Point, Relayed, ServerEvent, Snapshot, Stroke, StrokeCompleted,
    StrokeStart, UserId,
};
use crate::room::{Operation, User};
use crate::services::broadcast::{ClientTx, Delivery};
use crate::services::registry::{RoomSlot, SharedRoom};
use crate::state::AppState;

struct Joined {
    room_id: String,
    slot: SharedRoom,
}

pub struct Session {
    user_id: UserId,
    tx: ClientTx,
    joined: Option<Joined>,
}

impl Session {
    #[must_use]
    pub fn new(user_id: UserId, tx: ClientTx) -> Self {
        Self { user_id, tx, joined: None }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Room this connection currently belongs to, if any.
    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.joined.as_ref().map(|j| j.room_id.as_str())
    }

    /// Route one validated client event.
    pub async fn handle(&mut self, state: &AppState, event: ClientEvent) {
        match event {
            ClientEvent::JoinRoom(room_id) => self.join(state, room_id.as_deref()).await,
            ClientEvent::StrokeStart(start) => self.relay_stroke_start(start).await,
            ClientEvent::StrokeMove(point) => self.relay_stroke_move(point).await,
            ClientEvent::StrokeEnd(stroke) => self.record_stroke(stroke).await,
            ClientEvent::CursorMove(point) => self.move_cursor(point).await,
            ClientEvent::Undo => self.undo().await,
            ClientEvent::Redo(stroke) => self.redo(stroke).await,
            ClientEvent::Clear => self.clear().await,
        }
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Join a room, leaving the current one first.
    pub async fn join(&mut self, state: &AppState, requested: Option<&str>) {
        if self.joined.is_some() {
            self.leave(state).await;
        }

        let room_id = state.config.resolve_room(requested).to_string();
        let identity = state.identities.allocate();
        let user = User {
            id: self.user_id,
            name: identity.display_name,
            color: identity.color,
            cursor: Point::default(),
        };
        let user_id = self.user_id;
        let tx = self.tx.clone();

        let (slot, members) = state
            .rooms
            .join_with(&room_id, |slot| {
                slot.room.add_user(user_id, user.clone());
                slot.peers.attach(user_id, tx);

                let snapshot = Snapshot {
                    user_id,
                    user_name: user.name.clone(),
                    user_color: user.color.clone(),
                    room_id: slot.room.id().to_string(),
                    operations: slot.room.list_operations().to_vec(),
                    users: slot.room.list_users(),
                };
                slot.peers.send_to(&user_id, ServerEvent::InitSnapshot(snapshot));
                slot.peers.deliver(Delivery::Others { sender: user_id, event: ServerEvent::UserJoined(user) });
                slot.room.user_count()
            })
            .await;

        info!(%room_id, %user_id, members, "session: joined room");
        self.joined = Some(Joined { room_id, slot });
    }

    /// Leave the current room, tell the remaining members, and sweep empty rooms.
    pub async fn leave(&mut self, state: &AppState) {
        let Some(joined) = self.joined.take() else {
            return;
        };
        let user_id = self.user_id;

        let remaining = {
            let mut slot = joined.slot.lock().await;
            slot.room.remove_user(&user_id);
            slot.peers.detach(&user_id);
            slot.peers.deliver(Delivery::Others {
                sender: user_id,
                event: ServerEvent::UserLeft(Departure { user_id }),
            });
            slot.room.user_count()
        };
        drop(joined.slot);

        let swept = state.rooms.sweep_empty().await;
        info!(room_id = %joined.room_id, %user_id, remaining, swept, "session: left room");
    }

    // =========================================================================
    // STROKES
    // =========================================================================

    /// Relay the first point of a live stroke. Not persisted.
    pub async fn relay_stroke_start(&self, start: StrokeStart) {
        let sender = self.user_id;
        self.in_room(|_| Delivery::Others {
            sender,
            event: ServerEvent::StrokeStart(Relayed { user_id: sender, payload: start }),
        })
        .await;
    }

    /// Relay the next point of a live stroke. Not persisted.
    pub async fn relay_stroke_move(&self, point: Point) {
        let sender = self.user_id;
        self.in_room(|_| Delivery::Others {
            sender,
            event: ServerEvent::StrokeMove(Relayed { user_id: sender, payload: point }),
        })
        .await;
    }

    /// Append a completed stroke to the log and announce it to peers.
    pub async fn record_stroke(&self, stroke: Stroke) {
        let sender = self.user_id;
        self.in_room(|slot| {
            let operation_id = slot.room.append_operation(Operation::stroke(stroke.clone(), sender)).id;
            debug!(room_id = %slot.room.id(), %operation_id, points = stroke.points.len(), "session: stroke recorded");
            Delivery::Others {
                sender,
                event: ServerEvent::StrokeEnd(StrokeCompleted { user_id: sender, operation_id, stroke }),
            }
        })
        .await;
    }

    // =========================================================================
    // PRESENCE
    // =========================================================================

    pub async fn move_cursor(&self, point: Point) {
        let sender = self.user_id;
        self.in_room(|slot| {
            slot.room.update_cursor(&sender, point);
            Delivery::Others { sender, event: ServerEvent::CursorMove(Relayed { user_id: sender, payload: point }) }
        })
        .await;
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    /// Pop the room's newest operation, whoever drew it.
    pub async fn undo(&self) {
        let sender = self.user_id;
        self.in_room(|slot| {
            let Some(op) = slot.room.remove_last_operation() else {
                return Delivery::Silent;
            };
            info!(room_id = %slot.room.id(), user_id = %sender, operation_id = %op.id, "session: undo");
            Delivery::Everyone(ServerEvent::OperationUndone(OperationUndone { operation_id: op.id }))
        })
        .await;
    }

    /// Restore a resubmitted stroke under a fresh id.
    pub async fn redo(&self, stroke: Stroke) {
        let sender = self.user_id;
        self.in_room(|slot| {
            let op = slot.room.append_operation(Operation::stroke(stroke, sender)).clone();
            info!(room_id = %slot.room.id(), user_id = %sender, operation_id = %op.id, "session: redo");
            Delivery::Everyone(ServerEvent::OperationRedone(op))
        })
        .await;
    }

    pub async fn clear(&self) {
        let sender = self.user_id;
        self.in_room(|slot| {
            slot.room.clear();
            info!(room_id = %slot.room.id(), user_id = %sender, "session: canvas cleared");
            Delivery::Everyone(ServerEvent::CanvasCleared)
        })
        .await;
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Run `f` under the current room's lock and deliver its result.
    /// Does nothing while unjoined.
    async fn in_room(&self, f: impl FnOnce(&mut RoomSlot) -> Delivery) {
        let Some(joined) = &self.joined else {
            return;
        };
        let mut slot = joined.slot.lock().await;
        let delivery = f(&mut *slot);
        slot.peers.deliver(delivery);
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
