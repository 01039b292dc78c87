use crate::camera::Camera;
use crate::clock::FrameClock;
use crate::config::ViewerConfig;
use glam::Vec2;
use marchview_common::FrameState;
use marchview_input::{InputEvent, InputSource, Key, KeyBindings};
use marchview_render::{
    ProgramError, QuadPipeline, RenderBackend, RenderError, RenderTarget, Scene, ShaderProgram,
    UniformLocation,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("post-process rendering requested but the backend has no offscreen target")]
    MissingOffscreen,
}

/// Locations written every frame, resolved once at startup.
#[derive(Debug, Clone, Copy)]
struct FrameUniforms {
    resolution: UniformLocation,
    cam_pos: UniformLocation,
    cam_rot: UniformLocation,
    noise: Option<NoiseUniforms>,
}

/// Post-process variant only.
#[derive(Debug, Clone, Copy)]
struct NoiseUniforms {
    seed1: UniformLocation,
    seed2: UniformLocation,
    sample_part: UniformLocation,
}

impl FrameUniforms {
    fn resolve(program: &impl ShaderProgram, post_process: bool) -> Result<Self, ProgramError> {
        let noise = if post_process {
            Some(NoiseUniforms {
                seed1: program.locate("u_seed1")?,
                seed2: program.locate("u_seed2")?,
                sample_part: program.locate("sample_part")?,
            })
        } else {
            None
        };
        Ok(Self {
            resolution: program.locate("resolution")?,
            cam_pos: program.locate("cam_pos")?,
            cam_rot: program.locate("cam_rot")?,
            noise,
        })
    }
}

/// The viewer: one backend, one input source, one camera, one scene.
///
/// Everything is owned here and released when the engine drops.
pub struct Engine<B: RenderBackend, I: InputSource> {
    backend: B,
    input: I,
    camera: Camera,
    bindings: KeyBindings,
    scene: Scene,
    clock: FrameClock,
    uniforms: FrameUniforms,
    rng: StdRng,
    clear_color: [f64; 4],
    sample_part: f32,
    post_process: bool,
    running: bool,
}

impl<B: RenderBackend, I: InputSource> Engine<B, I> {
    /// Resolve uniforms, push the static ones, build the camera and upload the
    /// scene.
    pub fn new(mut backend: B, input: I, config: &ViewerConfig) -> Result<Self, EngineError> {
        let post_process = config.render.post_process;
        if post_process && !backend.has_offscreen() {
            return Err(EngineError::MissingOffscreen);
        }

        let (width, height) = backend.size();
        let program = backend.program_mut();
        let uniforms = FrameUniforms::resolve(&*program, post_process)?;
        program.write(
            uniforms.resolution,
            Vec2::new(width as f32, height as f32).into(),
        )?;

        let shapes = config.scene.clone().unwrap_or_else(Scene::default_shapes);
        let scene = Scene::new(program, shapes)?;

        let mut camera = Camera::new(config.camera.start_position);
        camera.sensitivity = config.camera.sensitivity;
        camera.move_speed = config.camera.move_speed;

        let rng = match config.render.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::info!(
            width,
            height,
            post_process,
            shapes = scene.len(),
            "engine initialized"
        );

        Ok(Self {
            backend,
            input,
            camera,
            bindings: config.bindings.clone(),
            scene,
            clock: FrameClock::new(config.render.target_fps),
            uniforms,
            rng,
            clear_color: config.render.clear_color,
            sample_part: config.render.sample_part,
            post_process,
            running: true,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn frame_state(&self) -> FrameState {
        self.clock.state()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Drain input; a close request or Escape ends the loop after this frame.
    pub fn handle_events(&mut self) {
        for event in self.input.poll_events() {
            match event {
                InputEvent::CloseRequested | InputEvent::KeyPressed(Key::Escape) => {
                    if self.running {
                        tracing::info!(?event, "exit requested");
                    }
                    self.running = false;
                }
                _ => {}
            }
        }
    }

    /// Push this frame's uniforms, then advance the camera. The shader sees the
    /// pose from before this frame's input.
    pub fn update(&mut self) -> Result<(), EngineError> {
        let uniforms = self.uniforms;
        let pose = self.camera.pose;
        let program = self.backend.program_mut();
        program.write(uniforms.cam_pos, pose.position.into())?;
        program.write(uniforms.cam_rot, pose.rotation.into())?;

        if let Some(noise) = uniforms.noise {
            let seed1 = Vec2::new(self.rng.r#gen(), self.rng.r#gen());
            let seed2 = Vec2::new(self.rng.r#gen(), self.rng.r#gen());
            program.write(noise.seed1, seed1.into())?;
            program.write(noise.seed2, seed2.into())?;
            program.write(noise.sample_part, self.sample_part.into())?;
        }

        self.camera.update(&mut self.input, &self.bindings);
        Ok(())
    }

    /// Draw the quad, through the offscreen target when post-processing.
    pub fn render(&mut self) -> Result<(), EngineError> {
        if !self.backend.begin_frame()? {
            tracing::debug!(frame = self.clock.state().frame, "frame skipped");
            return Ok(());
        }
        let clear = self.clear_color;
        let screen_pipeline = if self.post_process {
            self.backend.bind_target(RenderTarget::Offscreen)?;
            self.backend.clear(clear)?;
            self.backend.draw_quad(QuadPipeline::Scene)?;
            QuadPipeline::Post
        } else {
            QuadPipeline::Scene
        };
        self.backend.bind_target(RenderTarget::Screen)?;
        self.backend.clear(clear)?;
        self.backend.draw_quad(screen_pipeline)?;
        self.backend.present()?;
        Ok(())
    }

    /// One loop iteration. An exit request is honoured at the top of the next
    /// iteration, so the current frame always completes.
    pub fn frame(&mut self) -> Result<FrameState, EngineError> {
        self.handle_events();
        self.update()?;
        self.render()?;
        Ok(self.clock.tick())
    }

    pub fn run(&mut self) -> Result<(), EngineError> {
        while self.running {
            self.frame()?;
        }
        tracing::info!(frames = self.clock.state().frame, "engine loop finished");
        Ok(())
    }

    /// Reconfigure the backend and re-push `resolution`.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.backend.resize(width, height);
        let resolution = self.uniforms.resolution;
        self.backend
            .program_mut()
            .write(resolution, Vec2::new(width as f32, height as f32).into())?;
        tracing::debug!(width, height, "resized");
        Ok(())
    }
}
