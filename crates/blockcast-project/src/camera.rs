//! Camera basis from an observer pose.
//!
//! Yaw and pitch follow the world's convention: yaw 0 looks along +Z, positive
//! yaw turns toward -X, and positive pitch looks down.

use glam::DVec3;

use crate::pose::ObserverPose;

/// Above this alignment the reference up vector is swapped for +X.
const PARALLEL_LIMIT: f64 = 0.99;

/// Eye position plus an orthonormal look/right/up basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    /// Position of the observer's eyes.
    pub eye: DVec3,
    /// Unit view direction.
    pub look: DVec3,
    /// Unit vector to the observer's right on screen.
    pub right: DVec3,
    /// Unit vector pointing up on screen.
    pub up: DVec3,
}

impl CameraFrame {
    /// Build the frame for an observer standing at `pose`.
    #[must_use]
    pub fn from_pose(pose: &ObserverPose, eye_height: f64) -> Self {
        let eye = pose.position + DVec3::new(0.0, eye_height, 0.0);
        Self::from_angles(eye, pose.yaw, pose.pitch)
    }

    /// Build the frame from an eye position and yaw/pitch in degrees.
    #[must_use]
    pub fn from_angles(eye: DVec3, yaw_degrees: f64, pitch_degrees: f64) -> Self {
        let look = look_direction(yaw_degrees, pitch_degrees);

        // Near-vertical gaze makes the cross product with +Y degenerate.
        let mut up_ref = DVec3::Y;
        if look.dot(up_ref).abs() > PARALLEL_LIMIT {
            up_ref = DVec3::X;
        }

        let right = up_ref.cross(look).normalize_or_zero();
        let up = look.cross(right).normalize_or_zero();

        Self {
            eye,
            look,
            right,
            up,
        }
    }
}

/// Unit view direction for yaw/pitch in degrees.
#[must_use]
pub fn look_direction(yaw_degrees: f64, pitch_degrees: f64) -> DVec3 {
    let (yaw_sin, yaw_cos) = yaw_degrees.to_radians().sin_cos();
    let (pitch_sin, pitch_cos) = pitch_degrees.to_radians().sin_cos();
    DVec3::new(-yaw_sin * pitch_cos, -pitch_sin, yaw_cos * pitch_cos)
}
