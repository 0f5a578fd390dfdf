//! Room state: the per-room operation log and membership map.
//!
//! DESIGN
//! ======
//! A `Room` is plain data with synchronous methods. It never fails: absence
//! (empty log, unknown user) is reported as `None` or a no-op. Serializing
//! access is the caller's job; the registry keeps each room behind its own
//! mutex so every method runs to completion before the next touches it.
//!
//! The log order is server arrival order of completions. Undo always pops the
//! tail regardless of author.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::{OperationId, Point, Stroke, UserId, now_ms};

// =============================================================================
// USER
// =============================================================================

/// A connected participant and their last-known cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub color: String,
    pub cursor: Point,
}

// =============================================================================
// OPERATION
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Stroke,
}

/// One finalized, immutable stroke record in a room's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    #[serde(flatten)]
    pub stroke: Stroke,
    /// Author of the stroke.
    pub user_id: UserId,
    /// Milliseconds since Unix epoch.
    pub created_at: i64,
}

impl Operation {
    /// Stamp a stroke with a fresh id, its author, and the current time.
    #[must_use]
    pub fn stroke(stroke: Stroke, author: UserId) -> Self {
        Self::with_id(Uuid::new_v4(), stroke, author)
    }

    /// Build an operation whose id was assigned elsewhere.
    #[must_use]
    pub fn with_id(id: OperationId, stroke: Stroke, author: UserId) -> Self {
        Self { id, kind: OperationKind::Stroke, stroke, user_id: author, created_at: now_ms() }
    }
}

// =============================================================================
// ROOM
// =============================================================================

/// Append-only operation log plus the users currently connected to the room.
#[derive(Debug)]
pub struct Room {
    id: String,
    operations: Vec<Operation>,
    users: HashMap<UserId, User>,
}

impl Room {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), operations: Vec::new(), users: HashMap::new() }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append to the end of the log and return the stored operation.
    pub fn append_operation(&mut self, op: Operation) -> &Operation {
        self.operations.push(op);
        let last = self.operations.len() - 1;
        &self.operations[last]
    }

    /// Pop the most recent operation, whoever authored it.
    pub fn remove_last_operation(&mut self) -> Option<Operation> {
        self.operations.pop()
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    #[must_use]
    pub fn list_operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn add_user(&mut self, id: UserId, user: User) {
        self.users.insert(id, user);
    }

    pub fn remove_user(&mut self, id: &UserId) -> Option<User> {
        self.users.remove(id)
    }

    #[must_use]
    pub fn get_user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    #[must_use]
    pub fn list_users(&self) -> Vec<User> {
        self.users.values().cloned().collect()
    }

    /// Record the latest cursor position. No-op for unknown users.
    pub fn update_cursor(&mut self, id: &UserId, cursor: Point) {
        if let Some(user) = self.users.get_mut(id) {
            user.cursor = cursor;
        }
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
