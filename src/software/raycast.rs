//! Ray intersection against the analytic shapes of a draw list.

use glam::Vec3;

use crate::draw_list::{Drawable, Shape};

/// Nearest intersection along a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Ray parameter; the ray direction is unit length so this is a distance.
    pub t: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Intersects a unit-direction ray with one drawable. Hits closer than
/// `t_min` are ignored.
pub fn intersect(origin: Vec3, dir: Vec3, drawable: &Drawable, t_min: f32) -> Option<Hit> {
    match drawable.shape {
        Shape::Sphere { radius } => sphere(origin, dir, drawable.position, radius, t_min),
        Shape::Cuboid { half_extents } => {
            cuboid(origin, dir, drawable.position, half_extents, t_min)
        }
    }
}

fn sphere(origin: Vec3, dir: Vec3, center: Vec3, radius: f32, t_min: f32) -> Option<Hit> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let t = [-b - root, -b + root].into_iter().find(|&t| t > t_min)?;
    let point = origin + dir * t;
    Some(Hit {
        t,
        point,
        normal: (point - center) / radius,
    })
}

fn cuboid(origin: Vec3, dir: Vec3, center: Vec3, half: Vec3, t_min: f32) -> Option<Hit> {
    let inv = dir.recip();
    let t0 = (center - half - origin) * inv;
    let t1 = (center + half - origin) * inv;
    let near = t0.min(t1);
    let far = t0.max(t1);
    let t_enter = near.max_element();
    let t_exit = far.min_element();
    if t_enter > t_exit || t_exit <= t_min {
        return None;
    }

    let (t, bounds) = if t_enter > t_min {
        (t_enter, near)
    } else {
        (t_exit, far)
    };
    let point = origin + dir * t;

    // The face hit is the slab whose bound equals t.
    let local = (point - center) / half;
    let axis = if (bounds.x - t).abs() <= f32::EPSILON * t.abs().max(1.0) {
        0
    } else if (bounds.y - t).abs() <= f32::EPSILON * t.abs().max(1.0) {
        1
    } else {
        2
    };
    let mut normal = Vec3::ZERO;
    normal[axis] = local[axis].signum();
    Some(Hit { t, point, normal })
}

/// The nearest hit among all drawables.
pub fn nearest<'a>(
    origin: Vec3,
    dir: Vec3,
    drawables: impl Iterator<Item = &'a Drawable>,
    t_min: f32,
) -> Option<(Hit, &'a Drawable)> {
    drawables
        .filter_map(|d| intersect(origin, dir, d, t_min).map(|hit| (hit, d)))
        .min_by(|a, b| a.0.t.total_cmp(&b.0.t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sphere_hit_from_outside() {
        let ball = Drawable::sphere(Vec3::new(0.0, 0.0, -5.0), 1.0);
        let hit = intersect(Vec3::ZERO, Vec3::NEG_Z, &ball, 0.0).unwrap();
        assert_relative_eq!(hit.t, 4.0);
        assert_relative_eq!(hit.normal.z, 1.0);
    }

    #[test]
    fn sphere_miss() {
        let ball = Drawable::sphere(Vec3::new(3.0, 0.0, -5.0), 1.0);
        assert!(intersect(Vec3::ZERO, Vec3::NEG_Z, &ball, 0.0).is_none());
    }

    #[test]
    fn cuboid_face_normal() {
        let cube = Drawable::cuboid(Vec3::new(0.0, 0.0, -5.0), Vec3::ONE);
        let hit = intersect(Vec3::ZERO, Vec3::NEG_Z, &cube, 0.0).unwrap();
        assert_relative_eq!(hit.t, 4.0);
        assert_eq!(hit.normal, Vec3::Z);
    }

    #[test]
    fn cuboid_behind_ray_is_missed() {
        let cube = Drawable::cuboid(Vec3::new(0.0, 0.0, 5.0), Vec3::ONE);
        assert!(intersect(Vec3::ZERO, Vec3::NEG_Z, &cube, 0.0).is_none());
    }

    #[test]
    fn nearest_picks_closest() {
        let list = [
            Drawable::sphere(Vec3::new(0.0, 0.0, -10.0), 1.0),
            Drawable::sphere(Vec3::new(0.0, 0.0, -4.0), 1.0),
        ];
        let (hit, drawable) = nearest(Vec3::ZERO, Vec3::NEG_Z, list.iter(), 0.0).unwrap();
        assert_relative_eq!(hit.t, 3.0);
        assert_eq!(drawable.position.z, -4.0);
    }
}
