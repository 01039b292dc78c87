//! wgpu render backend for the raymarch viewer.
//!
//! GLSL goes to wgpu unchanged. The fragment uniform block is reflected with
//! naga's GLSL front end so the host can write members by name.
//!
//! # Invariants
//! - The uniform buffer is uploaded whole, once per frame, and only when dirty.
//! - A lost or outdated surface is reconfigured and the frame skipped.

mod gpu;
pub mod reflect;

pub use gpu::{GpuError, OFFSCREEN_FORMAT, WgpuBackend};
