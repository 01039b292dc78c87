//! Input capability for the viewer.
//!
//! The camera and engine read input through [`InputSource`] only, so they run
//! the same against a real window and against a scripted [`InputState`] in
//! tests.
//!
//! # Invariants
//! - Pointer deltas are relative and consumed on read.
//! - Events queued by the platform layer take effect when drained, not when
//!   pushed.

pub mod action;
pub mod state;

pub use action::{Action, KeyBindings};
pub use state::{InputEvent, InputSource, InputState, Key};
