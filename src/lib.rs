//! Real-time shared drawing rooms.
//!
//! ARCHITECTURE
//! ============
//! The server side keeps one append-only operation log and one membership map
//! per room (`room`, `services`), reached over a tagged websocket protocol
//! (`protocol`, `routes`). The `client` module is the receiving twin: it
//! assembles live stroke fragments from remote authors and keeps a local
//! replica of the room log for a rendering surface to draw.

pub mod client;
pub mod config;
pub mod protocol;
pub mod room;
pub mod routes;
pub mod services;
pub mod state;
