use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Camera position and orientation.
///
/// `rotation.x` is yaw and `rotation.y` is pitch, both in radians. `rotation.z`
/// is carried so the shader receives a full `vec3` but is never written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Pose {
    /// Pitch limit in either direction. Past this the view would flip.
    pub const PITCH_LIMIT: f32 = FRAC_PI_2;

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
        }
    }

    pub fn yaw(&self) -> f32 {
        self.rotation.x
    }

    pub fn pitch(&self) -> f32 {
        self.rotation.y
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// One object of the raymarched scene, as the shader sees it.
///
/// `shape_type` and `material_type` are opaque tags interpreted by the
/// fragment shader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    pub position: Vec3,
    pub size: Vec3,
    pub color: Vec3,
    #[serde(default)]
    pub shape_type: i32,
    #[serde(default)]
    pub material_type: i32,
}

impl ShapeDescriptor {
    pub fn new(
        position: Vec3,
        size: Vec3,
        color: Vec3,
        shape_type: i32,
        material_type: i32,
    ) -> Self {
        Self {
            position,
            size,
            color,
            shape_type,
            material_type,
        }
    }
}

/// Per-iteration timing owned by the frame clock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameState {
    /// Seconds since the clock started.
    pub elapsed: f32,
    /// Completed iterations.
    pub frame: u64,
    /// Seconds spent on the last iteration, including the rate-limit sleep.
    pub delta: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_default_is_origin() {
        let pose = Pose::default();
        assert_eq!(pose.position, Vec3::ZERO);
        assert_eq!(pose.rotation, Vec3::ZERO);
    }

    #[test]
    fn pose_accessors_read_rotation_axes() {
        let pose = Pose {
            position: Vec3::ZERO,
            rotation: Vec3::new(0.25, -0.5, 0.0),
        };
        assert_eq!(pose.yaw(), 0.25);
        assert_eq!(pose.pitch(), -0.5);
    }

    #[test]
    fn shape_descriptor_new_keeps_tags() {
        let shape = ShapeDescriptor::new(Vec3::X, Vec3::ONE, Vec3::splat(0.5), 1, 2);
        assert_eq!(shape.position, Vec3::X);
        assert_eq!(shape.shape_type, 1);
        assert_eq!(shape.material_type, 2);
    }
}
