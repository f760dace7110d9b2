/// Head orientation in degrees. Positive yaw turns toward image right,
/// positive pitch tilts down, positive roll tilts the eye line clockwise.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeadPose {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

pub const MAX_YAW: f64 = 45.0;
pub const MAX_PITCH: f64 = 30.0;
pub const MAX_ROLL: f64 = 30.0;

impl HeadPose {
    /// Builds a pose with every angle clamped to its physical range.
    pub fn clamped(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self {
            yaw: yaw.clamp(-MAX_YAW, MAX_YAW),
            pitch: pitch.clamp(-MAX_PITCH, MAX_PITCH),
            roll: roll.clamp(-MAX_ROLL, MAX_ROLL),
        }
    }
}
