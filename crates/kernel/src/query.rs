//! Shape geometry for ray and overlap queries.
//!
//! Boxes are oriented by the entity rotation for ray casts and sphere tests;
//! box-box overlap uses world-space bounding boxes.

use glam::{Mat3, Quat, Vec3};
use keyroom_common::Ray;

use crate::components::Shape;

/// A shape placed in the world.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Placed {
    pub center: Vec3,
    pub rotation: Quat,
    pub shape: Shape,
}

/// Distance along `ray` to the first surface of `placed`, if within `max`.
/// A ray starting inside the shape does not hit it.
pub(crate) fn ray_distance(ray: &Ray, max: f32, placed: &Placed) -> Option<f32> {
    let t = match placed.shape {
        Shape::Sphere { radius } => ray_sphere(ray, placed.center, radius)?,
        Shape::Box { half_extents } => ray_box(ray, placed, Vec3::from(half_extents))?,
    };
    (t <= max).then_some(t)
}

fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let c = oc.length_squared() - radius * radius;
    if c <= 0.0 {
        return None;
    }
    let b = oc.dot(ray.direction);
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

fn ray_box(ray: &Ray, placed: &Placed, half: Vec3) -> Option<f32> {
    let inv = placed.rotation.inverse();
    let origin = inv * (ray.origin - placed.center);
    let dir = inv * ray.direction;

    if origin.abs().cmple(half).all() {
        return None;
    }

    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let (o, d, h) = (origin[axis], dir[axis], half[axis]);
        if d.abs() < 1e-8 {
            if o.abs() > h {
                return None;
            }
            continue;
        }
        let t1 = (-h - o) / d;
        let t2 = (h - o) / d;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }
    if t_max < t_min || t_max < 0.0 {
        return None;
    }
    Some(t_min.max(0.0))
}

/// Whether two placed shapes touch or overlap.
pub(crate) fn overlaps(a: &Placed, b: &Placed) -> bool {
    match (a.shape, b.shape) {
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            a.center.distance_squared(b.center) <= (ra + rb) * (ra + rb)
        }
        (Shape::Sphere { radius }, Shape::Box { half_extents }) => {
            sphere_box(a.center, radius, b, Vec3::from(half_extents))
        }
        (Shape::Box { half_extents }, Shape::Sphere { radius }) => {
            sphere_box(b.center, radius, a, Vec3::from(half_extents))
        }
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
            let ea = world_half_extents(a.rotation, Vec3::from(ha));
            let eb = world_half_extents(b.rotation, Vec3::from(hb));
            (a.center - b.center).abs().cmple(ea + eb).all()
        }
    }
}

fn sphere_box(center: Vec3, radius: f32, boxed: &Placed, half: Vec3) -> bool {
    let local = boxed.rotation.inverse() * (center - boxed.center);
    let closest = local.clamp(-half, half);
    local.distance_squared(closest) <= radius * radius
}

/// Half extents of the axis-aligned box enclosing a rotated box.
fn world_half_extents(rotation: Quat, half: Vec3) -> Vec3 {
    let m = Mat3::from_quat(rotation);
    let abs = Mat3::from_cols(m.x_axis.abs(), m.y_axis.abs(), m.z_axis.abs());
    abs * half
}
