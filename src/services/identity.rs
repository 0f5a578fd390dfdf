//! Identity allocation: display color and generated name per join.
//!
//! DESIGN
//! ======
//! A single atomic counter walks the palette cyclically, independent of room.
//! The creature half of the name is drawn at random. Two concurrent joins
//! always land on different counter values, so they differ in color unless
//! more than a full palette's worth of joins race at once.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// One palette entry: hex color plus the word used in display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub hex: &'static str,
    pub name: &'static str,
}

pub const PALETTE: [PaletteColor; 8] = [
    PaletteColor { hex: "#FF6B6B", name: "Crimson" },
    PaletteColor { hex: "#4ECDC4", name: "Teal" },
    PaletteColor { hex: "#45B7D1", name: "Sky" },
    PaletteColor { hex: "#FFA07A", name: "Coral" },
    PaletteColor { hex: "#98D8C8", name: "Mint" },
    PaletteColor { hex: "#F7DC6F", name: "Golden" },
    PaletteColor { hex: "#BB8FCE", name: "Lavender" },
    PaletteColor { hex: "#85C1E2", name: "Azure" },
];

pub const CREATURES: [&str; 30] = [
    "Panda",
    "Dragon",
    "Phoenix",
    "Tiger",
    "Fox",
    "Wolf",
    "Eagle",
    "Dolphin",
    "Owl",
    "Bear",
    "Hawk",
    "Lion",
    "Falcon",
    "Raven",
    "Lynx",
    "Otter",
    "Jaguar",
    "Leopard",
    "Cheetah",
    "Panther",
    "Cobra",
    "Viper",
    "Sparrow",
    "Hummingbird",
    "Butterfly",
    "Deer",
    "Moose",
    "Elephant",
    "Rhino",
    "Hippo",
];

/// Color and display name handed to a newly joined participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub color: String,
    pub display_name: String,
}

#[derive(Debug, Default)]
pub struct IdentityAllocator {
    counter: AtomicU64,
}

impl IdentityAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identity. Advances the shared counter.
    pub fn allocate(&self) -> Identity {
        let slot = self.counter.fetch_add(1, Ordering::Relaxed);
        let creature = rand::rng().random_range(0..CREATURES.len());
        identity_for(slot, creature)
    }

    /// Number of identities handed out so far.
    #[cfg(test)]
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

/// Identity for a given counter value and creature index.
#[must_use]
pub fn identity_for(slot: u64, creature: usize) -> Identity {
    let palette_len = PALETTE.len() as u64;
    // Remainder is always < PALETTE.len(), so the cast cannot truncate.
    #[allow(clippy::cast_possible_truncation)]
    let color = PALETTE[(slot % palette_len) as usize];
    let creature = CREATURES[creature % CREATURES.len()];
    Identity { color: color.hex.to_string(), display_name: format!("{} {creature}", color.name) }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
