use crate::program::ShaderProgram;

/// Corners of the full-screen quad in clip space, in triangle-strip order.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Where the next clear or draw lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// The window surface.
    Screen,
    /// The intermediate color texture of the post-process variant.
    Offscreen,
}

/// Which program a quad draw runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadPipeline {
    /// The raymarch program fed by the uniform block.
    Scene,
    /// The post-process program, sampling the offscreen texture.
    Post,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no frame in flight; call begin_frame first")]
    NoFrame,
    #[error("backend was created without an offscreen target")]
    NoOffscreen,
    #[error("the post pass cannot sample the target it draws into")]
    FeedbackLoop,
    #[error("surface error: {0}")]
    Surface(String),
}

/// A GPU backend, driven in immediate-mode style by the engine.
///
/// One frame is `begin_frame`, any number of `bind_target` / `clear` /
/// `draw_quad`, then `present`. Backends may record into a command buffer
/// but must preserve call order.
pub trait RenderBackend {
    type Program: ShaderProgram;

    fn program_mut(&mut self) -> &mut Self::Program;

    /// Drawable size in pixels.
    fn size(&self) -> (u32, u32);

    fn resize(&mut self, width: u32, height: u32);

    fn has_offscreen(&self) -> bool;

    /// Acquire the next surface image. `Ok(false)` means the frame should be
    /// skipped (surface lost or outdated and since reconfigured).
    fn begin_frame(&mut self) -> Result<bool, RenderError>;

    fn bind_target(&mut self, target: RenderTarget) -> Result<(), RenderError>;

    fn clear(&mut self, color: [f64; 4]) -> Result<(), RenderError>;

    fn draw_quad(&mut self, pipeline: QuadPipeline) -> Result<(), RenderError>;

    fn present(&mut self) -> Result<(), RenderError>;
}
