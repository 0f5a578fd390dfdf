//! Client-side twin of the room core.
//!
//! `assembler` turns live fragments from remote authors into painted segments
//! and finalized operations. `replica` is the local copy of a room that a
//! UI drives: it consumes server events, authors local strokes, and keeps the
//! undo/redo stacks. Painting goes through the `Surface` trait.

pub mod assembler;
pub mod replica;

pub use assembler::{Blend, SegmentStyle, StrokeAssembler, Surface, draw_stroke};
pub use replica::CanvasReplica;
