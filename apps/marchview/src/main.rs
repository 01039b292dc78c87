mod window_input;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use marchview_input::InputEvent;
use marchview_kernel::{Engine, ViewerConfig};
use marchview_render::ShaderSources;
use marchview_render_wgpu::WgpuBackend;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use window_input::WindowInput;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Fullscreen, Window, WindowId};

#[derive(Parser, Debug)]
#[command(name = "marchview", about = "Real-time raymarching viewer")]
struct Cli {
    /// YAML config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding vertex.glsl, fragment.glsl and post.glsl
    #[arg(long)]
    shader_dir: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Borderless fullscreen
    #[arg(long)]
    fullscreen: bool,

    /// Render through an offscreen target and post.glsl
    #[arg(long)]
    post_process: bool,

    /// 1920x1080 fullscreen with post-processing
    #[arg(long)]
    full_hd: bool,

    /// Frame-rate cap, 0 for none
    #[arg(long)]
    fps: Option<u32>,

    /// Seed for the per-frame noise
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn viewer_config(&self) -> Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path)?,
            None => ViewerConfig::default(),
        };
        if self.full_hd {
            let preset = ViewerConfig::full_hd();
            config.window.width = preset.window.width;
            config.window.height = preset.window.height;
            config.window.fullscreen = preset.window.fullscreen;
            config.render.post_process = preset.render.post_process;
        }
        if let Some(dir) = &self.shader_dir {
            config.render.shader_dir = dir.clone();
        }
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        config.window.fullscreen |= self.fullscreen;
        config.render.post_process |= self.post_process;
        if let Some(fps) = self.fps {
            config.render.target_fps = fps;
        }
        if self.seed.is_some() {
            config.render.seed = self.seed;
        }
        Ok(config)
    }
}

type Viewer = Engine<WgpuBackend, WindowInput>;

struct App {
    config: ViewerConfig,
    engine: Option<Viewer>,
    last_error: Option<anyhow::Error>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            engine: None,
            last_error: None,
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<Viewer> {
        let window_config = &self.config.window;
        let mut attrs = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));
        if window_config.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        window_input::capture_cursor(&window);

        let render = &self.config.render;
        let sources = ShaderSources::load(&render.shader_dir, render.post_process)
            .with_context(|| format!("failed to load program from {}", render.shader_dir.display()))?;
        let size = window.inner_size();
        let backend = WgpuBackend::new(
            window.clone(),
            size.width,
            size.height,
            &sources,
            render.post_process,
        )
        .context("failed to initialize GPU backend")?;

        let engine = Engine::new(backend, WindowInput::new(window), &self.config)
            .context("failed to start engine")?;
        Ok(engine)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.last_error = Some(err);
        self.engine = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(engine) => self.engine = Some(engine),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(engine) = &mut self.engine else {
            if matches!(event, WindowEvent::CloseRequested) {
                event_loop.exit();
            }
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                // Redraws may stop once the window is closing, so act now.
                engine.input_mut().push(InputEvent::CloseRequested);
                engine.handle_events();
                if !engine.is_running() {
                    event_loop.exit();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                if let Some(key) = window_input::map_key(code) {
                    let event = match state {
                        ElementState::Pressed => InputEvent::KeyPressed(key),
                        ElementState::Released => InputEvent::KeyReleased(key),
                    };
                    engine.input_mut().push(event);
                }
            }
            WindowEvent::Resized(size) => {
                if let Err(err) = engine.resize(size.width, size.height) {
                    self.fail(event_loop, err.into());
                }
            }
            WindowEvent::RedrawRequested => match engine.frame() {
                Ok(_) if !engine.is_running() => event_loop.exit(),
                Ok(_) => {}
                Err(err) => self.fail(event_loop, err.into()),
            },
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let (DeviceEvent::MouseMotion { delta }, Some(engine)) = (event, &mut self.engine) {
            let delta = Vec2::new(delta.0 as f32, delta.1 as f32);
            engine.input_mut().push(InputEvent::PointerMoved(delta));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(engine) = &self.engine {
            engine.input().request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.take() {
            tracing::info!(frames = engine.frame_state().frame, "shutting down");
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    let config = cli.viewer_config()?;
    tracing::info!(
        width = config.window.width,
        height = config.window.height,
        fullscreen = config.window.fullscreen,
        post_process = config.render.post_process,
        "marchview starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.last_error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ViewerConfig {
        let mut argv = vec!["marchview"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().viewer_config().unwrap()
    }

    #[test]
    fn no_flags_is_the_minimal_viewer() {
        assert_eq!(parse(&[]), ViewerConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--width", "1024", "--height", "768", "--post-process", "--fps", "0", "--seed", "9",
            "--shader-dir", "shaders",
        ]);
        assert_eq!((config.window.width, config.window.height), (1024, 768));
        assert!(config.render.post_process);
        assert_eq!(config.render.target_fps, 0);
        assert_eq!(config.render.seed, Some(9));
        assert_eq!(config.render.shader_dir, PathBuf::from("shaders"));
        assert!(!config.window.fullscreen);
    }

    #[test]
    fn full_hd_preset_yields_to_explicit_size() {
        let config = parse(&["--full-hd", "--width", "2560"]);
        assert_eq!((config.window.width, config.window.height), (2560, 1080));
        assert!(config.window.fullscreen);
        assert!(config.render.post_process);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["marchview", "--config", "/nonexistent/view.yaml"]).unwrap();
        assert!(cli.viewer_config().is_err());
    }
}
