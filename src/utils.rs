use glam::{Vec2, Vec3};

/// Wraps `t` into `[0, length]`.
pub fn repeat(t: f32, length: f32) -> f32 {
    (t - (t / length).floor() * length).clamp(0.0, length)
}

/// Unsigned angle between two vectors. Zero-length input yields a right angle.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let mag = a.length() * b.length();
    let cosine = if mag > 0.0 { a.dot(b) / mag } else { 0.0 };
    cosine.clamp(-1.0, 1.0).acos()
}

pub fn vec2_angle(a: Vec2, b: Vec2) -> f32 {
    angle_between(a.extend(0.0), b.extend(0.0))
}

/// Removes the component of `v` along `normal`; a zero normal leaves `v` as is.
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    let len_sq = normal.length_squared();
    if len_sq <= f32::EPSILON {
        return v;
    }
    v - normal * (v.dot(normal) / len_sq)
}
