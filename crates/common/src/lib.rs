//! Value types shared by every marchview crate.
//!
//! Nothing here touches the GPU or the window; these are the plain records the
//! camera, scene and engine pass between each other.

mod types;

pub use types::{FrameState, Pose, ShapeDescriptor};
