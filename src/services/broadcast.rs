//! Broadcast router: fan-out of server events to room members.
//!
//! DESIGN
//! ======
//! Each room keeps one outbound channel per connected member. Session
//! handlers decide *what* happened and return a `Delivery`; this module owns
//! *who* receives it:
//! - live fragments and cursors go to everyone but the sender,
//! - authoritative mutations (undo, redo, clear) go to everyone, sender
//!   included, because the server has already applied them.
//!
//! Delivery is fire-and-forget. A full or closed channel drops the event for
//! that recipient only; there is no retry and no acknowledgment.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::protocol::{ServerEvent, UserId};

/// Outbound queue for one connection.
pub type ClientTx = mpsc::Sender<ServerEvent>;

/// Who receives an event, decided by the handler that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Nothing to send (absence, or a no-op mutation).
    Silent,
    /// Every member of the room, sender included.
    Everyone(ServerEvent),
    /// Every member except `sender`.
    Others { sender: UserId, event: ServerEvent },
}

/// Outbound channels of the members currently in one room.
#[derive(Debug, Default)]
pub struct Peers {
    senders: HashMap<UserId, ClientTx>,
}

impl Peers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, id: UserId, tx: ClientTx) {
        self.senders.insert(id, tx);
    }

    pub fn detach(&mut self, id: &UserId) -> bool {
        self.senders.remove(id).is_some()
    }

    #[cfg(test)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Send to exactly one member. Returns whether the event was queued.
    pub fn send_to(&self, id: &UserId, event: ServerEvent) -> bool {
        let Some(tx) = self.senders.get(id) else {
            return false;
        };
        offer(id, tx, event)
    }

    /// Apply a delivery decision. Returns how many members had it queued.
    pub fn deliver(&self, delivery: Delivery) -> usize {
        match delivery {
            Delivery::Silent => 0,
            Delivery::Everyone(event) => self.fan_out(&event, None),
            Delivery::Others { sender, event } => self.fan_out(&event, Some(sender)),
        }
    }

    fn fan_out(&self, event: &ServerEvent, exclude: Option<UserId>) -> usize {
        let mut queued = 0;
        for (id, tx) in &self.senders {
            if exclude == Some(*id) {
                continue;
            }
            if offer(id, tx, event.clone()) {
                queued += 1;
            }
        }
        queued
    }
}

fn offer(id: &UserId, tx: &ClientTx, event: ServerEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            warn!(user_id = %id, event = event.name(), "broadcast: client queue full, dropping event");
            false
        }
        Err(TrySendError::Closed(event)) => {
            debug!(user_id = %id, event = event.name(), "broadcast: client gone, dropping event");
            false
        }
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
