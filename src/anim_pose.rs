use std::cmp::Ordering;

use glam::{Quat, Vec3};

use crate::{
    assets::animation::{AnimationClip, Channel, Interpolation, Track},
    sampling_state::SamplingState,
    skeleton::{Skeleton, SkeletonMask},
};

fn bin_search_anim_indices(times: &[f32], val: f32) -> (usize, usize) {
    let n = times.len();
    if n <= 1 {
        return (0, 0);
    }

    match times.binary_search_by(|x| x.partial_cmp(&val).unwrap_or(Ordering::Greater)) {
        Ok(i) => (i, i),          // exact hit, no blend
        Err(0) => (0, 0),         // before first, clamp
        Err(i) if i >= n => (n - 1, n - 1), // after last, clamp
        Err(i) => (i - 1, i),     // between i-1 and i
    }
}

fn compute_keyframe_values<'a, T>(times: &[f32], values: &'a [T], t: f32) -> (&'a T, &'a T, f32) {
    let (i0, i1) = bin_search_anim_indices(times, t);
    let (t0, t1) = (times[i0], times[i1]);
    let (v0, v1) = (&values[i0], &values[i1]);
    let alpha = if i0 == i1 || (t1 - t0).abs() < f32::EPSILON {
        0.0
    } else {
        (t - t0) / (t1 - t0) // normalized interpolation factor
    };
    (v0, v1, alpha)
}

fn interpolate_channel_value_vec3(track: &Track, channel: &Channel<Vec3>, t: f32) -> Option<Vec3> {
    let times = track.times(channel)?;
    if times.is_empty() || times.len() != channel.values.len() {
        return None;
    }
    let (v0, v1, alpha) = compute_keyframe_values(times, &channel.values, t);
    Some(match channel.interpolation {
        Interpolation::Linear => v0.lerp(*v1, alpha),
        Interpolation::Step => *v0,
    })
}

fn interpolate_channel_value_quat(track: &Track, channel: &Channel<Quat>, t: f32) -> Option<Quat> {
    let times = track.times(channel)?;
    if times.is_empty() || times.len() != channel.values.len() {
        return None;
    }
    let (v0, v1, alpha) = compute_keyframe_values(times, &channel.values, t);
    Some(match channel.interpolation {
        Interpolation::Linear => v0.slerp(*v1, alpha),
        Interpolation::Step => *v0,
    })
}

struct TrackSample {
    translation: Option<Vec3>,
    rotation: Option<Quat>,
    scale: Option<Vec3>,
}

fn sample_track(track: &Track, t: f32) -> TrackSample {
    TrackSample {
        translation: track.translation.as_ref().and_then(|c| interpolate_channel_value_vec3(track, c, t)),
        rotation: track.rotation.as_ref().and_then(|c| interpolate_channel_value_quat(track, c, t)),
        scale: track.scale.as_ref().and_then(|c| interpolate_channel_value_vec3(track, c, t)),
    }
}

impl AnimationClip {
    fn clamp_time(&self, t: f32) -> f32 {
        if t.is_nan() {
            0.0
        } else {
            t.clamp(0.0, self.duration.max(0.0))
        }
    }

    /// Overwrites the skeleton's local transforms with this clip's pose at `t`.
    pub fn sample(&self, skeleton: &mut Skeleton, t: f32) {
        let t = self.clamp_time(t);
        for track in &self.tracks {
            let sample = sample_track(track, t);
            let Some(local) = skeleton.local_mut(track.joint as usize) else {
                continue;
            };
            if let Some(translation) = sample.translation {
                local.t = translation;
            }
            if let Some(rotation) = sample.rotation {
                local.r = rotation;
            }
            if let Some(scale) = sample.scale {
                local.s = scale;
            }
        }
        skeleton.update_matrices();
    }

    /// Accumulates this clip's pose at `t` into `state` with the given weight. Joints outside
    /// `mask` are left alone.
    pub fn blended_sample(&self, state: &mut SamplingState, t: f32, weight: f32, mask: Option<&SkeletonMask>) {
        let t = self.clamp_time(t);
        for track in &self.tracks {
            let joint = track.joint as usize;
            if mask.is_some_and(|mask| !mask.contains(joint)) {
                continue;
            }
            if joint >= state.joint_count() {
                continue;
            }
            let sample = sample_track(track, t);
            if let Some(translation) = sample.translation {
                state.blend_position(joint, translation, weight);
            }
            if let Some(rotation) = sample.rotation {
                state.blend_rotation(joint, rotation, weight);
            }
            if let Some(scale) = sample.scale {
                state.blend_scale(joint, scale, weight);
            }
        }
    }
}
