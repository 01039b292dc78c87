//! Rendering adapter: backend-agnostic interface.
//!
//! # Invariants
//! - Uniform names are resolved once into [`UniformLocation`]s; per-frame code
//!   never looks a name up.
//! - A backend owns exactly one full-screen quad and draws nothing else.
//! - The scene is written into the program once and never touched again.

mod backend;
mod program;
mod scene;
mod uniforms;

pub use backend::{QUAD_VERTICES, QuadPipeline, RenderBackend, RenderError, RenderTarget};
pub use program::{ProgramError, ShaderProgram, ShaderSources};
pub use scene::{Scene, ShapeLayout};
pub use uniforms::{UniformBlock, UniformKind, UniformLayout, UniformLocation, UniformValue};
