//! The host's list of drawable objects and lights.
//!
//! Passes never own a [`DrawList`]; the host lends it to the chain for the
//! duration of one frame through [`Frame`](crate::Frame). Shapes are simple
//! analytic primitives so that both the GPU executor (tessellated meshes) and
//! the software executor (ray casting) can draw the same scene.

use glam::Vec3;

/// Ambient term added to every lit surface.
pub const AMBIENT: f32 = 0.15;

/// Maximum number of lights honored per draw.
pub const MAX_LIGHTS: usize = 4;

/// Geometry of a drawable, centered on its position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    /// Axis-aligned box.
    Cuboid { half_extents: Vec3 },
}

/// One object in the draw list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drawable {
    pub shape: Shape,
    pub position: Vec3,
    /// Linear RGBA base color.
    pub color: [f32; 4],
}

impl Drawable {
    pub fn sphere(position: Vec3, radius: f32) -> Self {
        Self {
            shape: Shape::Sphere { radius },
            position,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    pub fn cuboid(position: Vec3, half_extents: Vec3) -> Self {
        Self {
            shape: Shape::Cuboid { half_extents },
            position,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    pub fn color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.color = [r, g, b, 1.0];
        self
    }

    /// Per-axis scale applied to the unit mesh for this shape (unit sphere has radius 0.5,
    /// unit cube has side 1).
    pub fn mesh_scale(&self) -> Vec3 {
        match self.shape {
            Shape::Sphere { radius } => Vec3::splat(radius * 2.0),
            Shape::Cuboid { half_extents } => half_extents * 2.0,
        }
    }
}

/// A directional light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// Direction *towards* the light, normalized.
    pub direction: Vec3,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Light {
    pub fn directional(direction: Vec3, color: [f32; 3], intensity: f32) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            color,
            intensity,
        }
    }
}

/// Lambert shading with a constant ambient term. Only the first
/// [`MAX_LIGHTS`] lights contribute. With no lights the base color is returned
/// unlit.
pub fn shade(base: [f32; 4], normal: Vec3, lights: &[Light]) -> [f32; 4] {
    if lights.is_empty() {
        return base;
    }
    let mut lit = Vec3::splat(AMBIENT);
    for light in lights.iter().take(MAX_LIGHTS) {
        let n_dot_l = normal.dot(light.direction).max(0.0);
        lit += Vec3::from(light.color) * (light.intensity * n_dot_l);
    }
    [base[0] * lit.x, base[1] * lit.y, base[2] * lit.z, base[3]]
}

/// Ordered collection of drawables, owned by the host.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    items: Vec<Drawable>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, drawable: Drawable) -> &mut Self {
        self.items.push(drawable);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Drawable> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl FromIterator<Drawable> for DrawList {
    fn from_iter<I: IntoIterator<Item = Drawable>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn shade_without_lights_is_unlit() {
        let base = [0.2, 0.4, 0.6, 1.0];
        assert_eq!(shade(base, Vec3::Y, &[]), base);
    }

    #[test]
    fn shade_facing_light_adds_ambient() {
        let light = Light::directional(Vec3::Y, [1.0, 1.0, 1.0], 1.0);
        let lit = shade([0.5, 0.5, 0.5, 1.0], Vec3::Y, &[light]);
        assert_relative_eq!(lit[0], 0.5 * (1.0 + AMBIENT));
    }

    #[test]
    fn shade_back_facing_is_ambient_only() {
        let light = Light::directional(Vec3::Y, [1.0, 1.0, 1.0], 1.0);
        let lit = shade([1.0, 1.0, 1.0, 1.0], Vec3::NEG_Y, &[light]);
        assert_relative_eq!(lit[1], AMBIENT);
    }

    #[test]
    fn mesh_scale_matches_unit_meshes() {
        assert_eq!(
            Drawable::sphere(Vec3::ZERO, 1.5).mesh_scale(),
            Vec3::splat(3.0)
        );
        assert_eq!(
            Drawable::cuboid(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0)).mesh_scale(),
            Vec3::new(2.0, 4.0, 6.0)
        );
    }
}
