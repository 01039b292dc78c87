use crate::uniforms::{UniformKind, UniformLocation, UniformValue};
use std::path::{Path, PathBuf};

/// Errors from loading a shader program or writing its uniforms.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error("failed to read shader source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} shader failed to parse:\n{message}")]
    Parse { stage: &'static str, message: String },
    #[error("fragment shader declares no uniform block at set 0, binding 0")]
    MissingUniformBlock,
    #[error("uniform `{0}` not found in shader program")]
    MissingUniform(String),
    #[error("uniform `{0}` declared twice")]
    DuplicateUniform(String),
    #[error("uniform `{name}` holds {expected:?}, got {actual:?}")]
    TypeMismatch {
        name: String,
        expected: UniformKind,
        actual: UniformKind,
    },
    #[error("uniform `{name}` at offset {offset} overruns the {size}-byte block")]
    OutOfBounds { name: String, offset: u32, size: u32 },
}

/// The uniform interface of a linked shader program.
///
/// Resolve each name once with [`locate`](Self::locate), keep the
/// [`UniformLocation`], and write through it every frame.
pub trait ShaderProgram {
    fn locate(&self, name: &str) -> Result<UniformLocation, ProgramError>;

    fn write(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), ProgramError>;

    fn has_uniform(&self, name: &str) -> bool {
        self.locate(name).is_ok()
    }

    /// Resolve and write in one step. For one-off writes only.
    fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<(), ProgramError>
    where
        Self: Sized,
    {
        let location = self.locate(name)?;
        self.write(location, value.into())
    }
}

/// GLSL text for the viewer's programs.
///
/// The raymarch program is `vertex.glsl` + `fragment.glsl`. The post-process
/// pass reuses the vertex stage with `post.glsl`.
#[derive(Debug, Clone)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
    pub post: Option<String>,
}

impl ShaderSources {
    pub const VERTEX_FILE: &'static str = "vertex.glsl";
    pub const FRAGMENT_FILE: &'static str = "fragment.glsl";
    pub const POST_FILE: &'static str = "post.glsl";

    /// Read the program from `dir`. `post.glsl` is required only when
    /// `with_post` is set.
    pub fn load(dir: &Path, with_post: bool) -> Result<Self, ProgramError> {
        let vertex = read_source(&dir.join(Self::VERTEX_FILE))?;
        let fragment = read_source(&dir.join(Self::FRAGMENT_FILE))?;
        let post = if with_post {
            Some(read_source(&dir.join(Self::POST_FILE))?)
        } else {
            None
        };
        tracing::debug!(dir = %dir.display(), with_post, "loaded shader sources");
        Ok(Self {
            vertex,
            fragment,
            post,
        })
    }
}

fn read_source(path: &Path) -> Result<String, ProgramError> {
    std::fs::read_to_string(path).map_err(|source| ProgramError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "marchview-sources-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn load_reads_vertex_and_fragment() {
        let dir = scratch_dir("basic");
        fs::write(dir.join(ShaderSources::VERTEX_FILE), "// vs").unwrap();
        fs::write(dir.join(ShaderSources::FRAGMENT_FILE), "// fs").unwrap();

        let sources = ShaderSources::load(&dir, false).unwrap();
        assert_eq!(sources.vertex, "// vs");
        assert_eq!(sources.fragment, "// fs");
        assert!(sources.post.is_none());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_post_source_names_the_file() {
        let dir = scratch_dir("nopost");
        fs::write(dir.join(ShaderSources::VERTEX_FILE), "// vs").unwrap();
        fs::write(dir.join(ShaderSources::FRAGMENT_FILE), "// fs").unwrap();

        let err = ShaderSources::load(&dir, true).unwrap_err();
        match err {
            ProgramError::Io { path, .. } => assert!(path.ends_with(ShaderSources::POST_FILE)),
            other => panic!("unexpected error: {other}"),
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_fails_on_vertex() {
        let err = ShaderSources::load(Path::new("/nonexistent/marchview"), false).unwrap_err();
        assert!(err.to_string().contains(ShaderSources::VERTEX_FILE));
    }
}
