use glam::{Mat4, Vec2, Vec3};

/// A perspective camera for 3D scenes.
///
/// Provides position, orientation, field of view and clip planes. Stereo passes
/// keep a working copy of the scene camera and displace it per eye, so the type
/// is `Copy` and cheap to duplicate every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Fixed aspect ratio. `None` follows the destination's aspect.
    pub aspect: Option<f32>,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_2, // 90 degrees
            aspect: None,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn looking_at(mut self, target_x: f32, target_y: f32, target_z: f32) -> Self {
        let target = Vec3::new(target_x, target_y, target_z);
        self.forward = (target - self.position).normalize_or_zero();
        self
    }

    pub fn facing(mut self, forward: Vec3) -> Self {
        self.forward = forward.normalize_or_zero();
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Overrides the frustum: vertical field of view in degrees and a fixed aspect.
    pub fn set_frustum_perspective(&mut self, fov_degrees: f32, aspect: f32) {
        self.fov = fov_degrees.to_radians();
        self.aspect = Some(aspect);
    }

    /// Compute the right vector from forward and up.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }

    /// The camera's local left axis in world space.
    pub fn left(&self) -> Vec3 {
        -self.right()
    }

    /// Recompute up to be orthogonal to forward and right.
    pub fn orthogonal_up(&self) -> Vec3 {
        self.right().cross(self.forward).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// Projection with 0..1 depth, using the fixed aspect if one is set.
    pub fn projection_matrix(&self, target_aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov,
            self.aspect.unwrap_or(target_aspect),
            self.near,
            self.far,
        )
    }

    /// World-space ray through a texture coordinate (`(0,0)` is the top-left).
    pub fn ray(&self, uv: Vec2, target_aspect: f32) -> (Vec3, Vec3) {
        let aspect = self.aspect.unwrap_or(target_aspect);
        let half_height = (self.fov * 0.5).tan();
        let ndc_x = uv.x * 2.0 - 1.0;
        let ndc_y = 1.0 - uv.y * 2.0;
        let dir = self.forward.normalize_or_zero()
            + self.right() * (ndc_x * half_height * aspect)
            + self.orthogonal_up() * (ndc_y * half_height);
        (self.position, dir.normalize_or_zero())
    }

    /// Linear view-space depth of a world point (positive in front of the camera).
    pub fn view_depth(&self, point: Vec3) -> f32 {
        (point - self.position).dot(self.forward.normalize_or_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn left_is_opposite_right() {
        let camera = Camera::new();
        assert_eq!(camera.right(), Vec3::X);
        assert_eq!(camera.left(), Vec3::NEG_X);
    }

    #[test]
    fn facing_positive_z_has_positive_x_left() {
        let camera = Camera::new().at(0.0, 0.0, 0.0).facing(Vec3::Z);
        assert_eq!(camera.left(), Vec3::X);
    }

    #[test]
    fn center_ray_follows_forward() {
        let camera = Camera::new().at(1.0, 2.0, 3.0);
        let (origin, dir) = camera.ray(Vec2::splat(0.5), 16.0 / 9.0);
        assert_eq!(origin, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(dir.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn top_left_ray_points_up_and_left() {
        let camera = Camera::new();
        let (_, dir) = camera.ray(Vec2::ZERO, 1.0);
        assert!(dir.x < 0.0);
        assert!(dir.y > 0.0);
    }

    #[test]
    fn fixed_aspect_overrides_target() {
        let mut camera = Camera::new();
        camera.set_frustum_perspective(100.0, 1.0);
        assert_eq!(
            camera.projection_matrix(2.0),
            Mat4::perspective_rh(100f32.to_radians(), 1.0, camera.near, camera.far)
        );
    }

    #[test]
    fn view_depth_is_distance_along_forward() {
        let camera = Camera::new().at(0.0, 0.0, 0.0);
        assert_relative_eq!(camera.view_depth(Vec3::new(3.0, 1.0, -7.0)), 7.0);
    }
}
