use glam::Vec3;

use crate::camera::Camera;

const ELEVATION_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// A camera controller that circles a target point.
///
/// The demo drives it from the keyboard and lets it drift around the scene
/// at `speed` radians per second.
///
/// # Example
/// ```
/// use lensfx::OrbitCamera;
///
/// let mut orbit = OrbitCamera::new().distance(6.0);
/// orbit.advance(0.5);
/// let camera = orbit.camera();
/// assert!((camera.position.length() - 6.0).abs() < 1e-4);
/// ```
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Point the camera orbits around.
    pub target: Vec3,
    pub distance: f32,
    /// Horizontal angle in radians (yaw).
    pub azimuth: f32,
    /// Vertical angle in radians, kept short of the poles.
    pub elevation: f32,
    /// Field of view in degrees.
    pub fov: f32,
    /// Drift speed in radians per second.
    pub speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 5.0,
            azimuth: 0.0,
            elevation: 0.3,
            fov: 60.0,
            speed: 0.25,
            min_distance: 1.0,
            max_distance: 50.0,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: impl Into<Vec3>) -> Self {
        self.target = target.into();
        self
    }

    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Drifts the orbit by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.azimuth = (self.azimuth + self.speed * dt).rem_euclid(std::f32::consts::TAU);
    }

    /// Rotates by the given angles in radians.
    pub fn nudge(&mut self, d_azimuth: f32, d_elevation: f32) {
        self.azimuth += d_azimuth;
        self.elevation = (self.elevation + d_elevation).clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);
    }

    /// Moves toward (positive) or away from (negative) the target.
    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance - amount).clamp(self.min_distance, self.max_distance);
    }

    /// The camera for the current orbit state.
    pub fn camera(&self) -> Camera {
        let offset = Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
            self.distance * self.elevation.cos() * self.azimuth.cos(),
        );
        let position = self.target + offset;

        Camera {
            position,
            forward: (self.target - position).normalize_or(Vec3::NEG_Z),
            ..Camera::new().with_fov(self.fov)
        }
    }
}
