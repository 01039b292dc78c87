//! Viewer configuration.
//!
//! Every section defaults independently, so a config file only needs the keys
//! it changes:
//!
//! ```yaml
//! window:
//!   fullscreen: true
//! render:
//!   post_process: true
//!   seed: 7
//! ```

use glam::Vec3;
use marchview_common::ShapeDescriptor;
use marchview_input::KeyBindings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub render: RenderConfig,
    /// Replaces the whole default map; actions left out are unbound.
    pub bindings: KeyBindings,
    /// Replaces the built-in scene when set.
    pub scene: Option<Vec<ShapeDescriptor>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "marchview".into(),
            width: 800,
            height: 600,
            fullscreen: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub start_position: Vec3,
    pub sensitivity: f32,
    /// World units per frame.
    pub move_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            start_position: Vec3::new(0.0, 0.0, -5.0),
            sensitivity: 0.002,
            move_speed: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub shader_dir: PathBuf,
    /// Render through the offscreen target and `post.glsl`.
    pub post_process: bool,
    /// 0 disables the frame-rate cap.
    pub target_fps: u32,
    pub clear_color: [f64; 4],
    /// Written to `sample_part` every frame in the post-process variant.
    pub sample_part: f32,
    /// Seed for the per-frame noise seeds; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("program"),
            post_process: false,
            target_fps: 60,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            sample_part: 1.0,
            seed: None,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            render: RenderConfig::default(),
            bindings: KeyBindings::default(),
            scene: None,
        }
    }
}

impl ViewerConfig {
    pub fn from_yaml(src: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(src)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&src).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// The full-screen 1920×1080 preset with post-processing.
    pub fn full_hd() -> Self {
        let mut config = Self::default();
        config.window.width = 1920;
        config.window.height = 1080;
        config.window.fullscreen = true;
        config.render.post_process = true;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marchview_input::{Action, Key};

    #[test]
    fn defaults_match_minimal_viewer() {
        let config = ViewerConfig::default();
        assert_eq!((config.window.width, config.window.height), (800, 600));
        assert!(!config.render.post_process);
        assert_eq!(config.render.target_fps, 60);
        assert_eq!(config.camera.sensitivity, 0.002);
        assert_eq!(config.camera.move_speed, 0.1);
        assert!(config.scene.is_none());
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let config = ViewerConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = "window:\n  fullscreen: true\nrender:\n  post_process: true\n  seed: 7\n";
        let config = ViewerConfig::from_yaml(yaml).unwrap();
        assert!(config.window.fullscreen);
        assert_eq!(config.window.width, 800);
        assert!(config.render.post_process);
        assert_eq!(config.render.seed, Some(7));
        assert_eq!(config.render.shader_dir, PathBuf::from("program"));
    }

    #[test]
    fn scene_and_bindings_parse() {
        let yaml = r#"
bindings:
  forward: up
  back: down
scene:
  - position: [0.0, 1.0, 0.0]
    size: [1.0, 1.0, 1.0]
    color: [1.0, 0.0, 0.0]
    shape_type: 1
  - position: [0.0, -1.0, 0.0]
    size: [0.0, 1.0, 0.0]
    color: [0.5, 0.5, 0.5]
"#;
        let config = ViewerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.bindings.key_for(Action::Forward), Some(Key::Up));
        assert_eq!(config.bindings.key_for(Action::StrafeLeft), None);

        let scene = config.scene.unwrap();
        assert_eq!(scene.len(), 2);
        assert_eq!(scene[0].shape_type, 1);
        assert_eq!(scene[1].material_type, 0);
        assert_eq!(scene[1].position, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn full_hd_preset() {
        let config = ViewerConfig::full_hd();
        assert_eq!((config.window.width, config.window.height), (1920, 1080));
        assert!(config.window.fullscreen);
        assert!(config.render.post_process);
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let err = ViewerConfig::load(Path::new("/nonexistent/marchview.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("marchview.yaml"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(ViewerConfig::from_yaml("window: [1, 2").is_err());
    }
}
