use glam::Vec3;
use marchview_common::Pose;
use marchview_input::{Action, InputSource, KeyBindings};

/// Free-fly camera driven by mouse look and held keys.
///
/// Movement is per frame, not per second, and diagonal movement is not
/// normalized: forward + strafe moves √2 × `move_speed`.
#[derive(Debug, Clone)]
pub struct Camera {
    pub pose: Pose,
    pub sensitivity: f32,
    pub move_speed: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, -5.0))
    }
}

impl Camera {
    pub const DEFAULT_SENSITIVITY: f32 = 0.002;
    pub const DEFAULT_MOVE_SPEED: f32 = 0.1;

    pub fn new(position: Vec3) -> Self {
        Self {
            pose: Pose::at(position),
            sensitivity: Self::DEFAULT_SENSITIVITY,
            move_speed: Self::DEFAULT_MOVE_SPEED,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn forward(&self) -> Vec3 {
        let (yaw, pitch) = (self.pose.yaw(), self.pose.pitch());
        Vec3::new(yaw.sin(), pitch.sin(), yaw.cos())
    }

    pub fn right(&self) -> Vec3 {
        let yaw = self.pose.yaw();
        Vec3::new(yaw.cos(), 0.0, -yaw.sin())
    }

    /// Apply one frame of input: mouse look first, then movement along the
    /// freshly rotated basis.
    pub fn update(&mut self, input: &mut impl InputSource, bindings: &KeyBindings) {
        self.look(input);
        self.fly(&*input, bindings);
    }

    fn look(&mut self, input: &mut impl InputSource) {
        let delta = input.take_pointer_delta();
        let rotation = &mut self.pose.rotation;
        rotation.x -= delta.x * self.sensitivity;
        rotation.y += delta.y * self.sensitivity;
        rotation.y = rotation.y.clamp(-Pose::PITCH_LIMIT, Pose::PITCH_LIMIT);
        input.recenter_pointer();
    }

    fn fly(&mut self, input: &impl InputSource, bindings: &KeyBindings) {
        let step = self.move_speed;
        let (forward, right) = (self.forward(), self.right());
        for action in Action::ALL {
            let Some(key) = bindings.key_for(action) else {
                continue;
            };
            if !input.is_held(key) {
                continue;
            }
            self.pose.position += match action {
                Action::Forward => forward * step,
                Action::Back => -forward * step,
                Action::StrafeLeft => -right * step,
                Action::StrafeRight => right * step,
                Action::Up => Vec3::Y * step,
                Action::Down => -Vec3::Y * step,
            };
        }
    }
}
