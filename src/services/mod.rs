//! Room core services driven by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Mutations flow one way into room state (via `session`), notifications flow
//! one way out (via `broadcast`). `registry` owns the room map and
//! `identity` hands out display colors and names.

pub mod broadcast;
pub mod identity;
pub mod registry;
pub mod session;
