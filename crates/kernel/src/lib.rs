//! Viewer kernel: camera, frame clock, configuration and the engine loop.
//!
//! # Invariants
//! - The engine is the only owner of the backend, input source and camera.
//! - Camera uniforms are pushed before the camera moves, so the shader lags
//!   input by one frame.
//! - Exit requests take effect between frames, never mid-frame.

pub mod camera;
pub mod clock;
pub mod config;
pub mod engine;

pub use camera::Camera;
pub use clock::FrameClock;
pub use config::{CameraConfig, ConfigError, RenderConfig, ViewerConfig, WindowConfig};
pub use engine::{Engine, EngineError};
