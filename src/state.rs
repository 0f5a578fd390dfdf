//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is built once in `main` and handed to every connection through
//! the Axum `State` extractor. It owns the room registry and the identity
//! allocator; there are no global singletons. Cloning is cheap because every
//! field is Arc-backed.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::identity::IdentityAllocator;
use crate::services::registry::RoomRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub rooms: RoomRegistry,
    pub identities: Arc<IdentityAllocator>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self { config: Arc::new(config), rooms: RoomRegistry::new(), identities: Arc::new(IdentityAllocator::new()) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
