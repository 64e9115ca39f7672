use glam::{Quat, Vec3};

use crate::skeleton::{Skeleton, TRS};

#[derive(Debug, Clone)]
struct JointState {
    original: TRS,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    sum_pos_weight: f32,
    sum_rot_weight: f32,
    sum_scale_weight: f32,
}
impl JointState {
    fn new(original: TRS) -> Self {
        Self {
            original,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ZERO,
            sum_pos_weight: 0.0,
            sum_rot_weight: 0.0,
            sum_scale_weight: 0.0,
        }
    }

    fn reset(&mut self) {
        self.position = Vec3::ZERO;
        self.rotation = Quat::IDENTITY;
        self.scale = Vec3::ZERO;
        self.sum_pos_weight = 0.0;
        self.sum_rot_weight = 0.0;
        self.sum_scale_weight = 0.0;
    }

    fn blend_position(&mut self, pos: Vec3, weight: f32) {
        self.position += pos * weight;
        self.sum_pos_weight += weight;
    }

    fn blend_scale(&mut self, scale: Vec3, weight: f32) {
        self.scale += scale * weight;
        self.sum_scale_weight += weight;
    }

    // Running weighted slerp; the result depends on the order samples arrive in.
    fn blend_rotation(&mut self, rot: Quat, weight: f32) {
        let total = self.sum_rot_weight + weight;
        if total <= 0.0 {
            return;
        }
        self.rotation = self.rotation.slerp(rot, weight / total);
        self.sum_rot_weight = total;
    }

    fn resolve(&mut self) -> TRS {
        if self.sum_pos_weight < 1.0 {
            self.blend_position(self.original.t, 1.0 - self.sum_pos_weight);
        } else if self.sum_pos_weight > 1.0 {
            self.position /= self.sum_pos_weight;
            self.sum_pos_weight = 1.0;
        }
        if self.sum_scale_weight < 1.0 {
            self.blend_scale(self.original.s, 1.0 - self.sum_scale_weight);
        } else if self.sum_scale_weight > 1.0 {
            self.scale /= self.sum_scale_weight;
            self.sum_scale_weight = 1.0;
        }
        if self.sum_rot_weight < 1.0 {
            self.blend_rotation(self.original.r, 1.0 - self.sum_rot_weight);
        }
        self.sum_rot_weight = self.sum_rot_weight.min(1.0);
        TRS {
            t: self.position,
            r: self.rotation.normalize(),
            s: self.scale,
        }
    }
}

/// Scratch accumulator for blending several clips into one skeleton pose per tick.
///
/// Usage per tick is `reset()`, any number of `AnimationClip::blended_sample` calls, then
/// `apply()`. Joints that received less than full weight are topped up from the pose the
/// skeleton had when this state was created.
#[derive(Debug, Clone)]
pub struct SamplingState {
    joints: Vec<JointState>,
}
impl SamplingState {
    pub fn new(skeleton: &Skeleton) -> Self {
        Self {
            joints: skeleton.joints().iter().map(|joint| JointState::new(joint.local)).collect(),
        }
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn reset(&mut self) {
        for joint in &mut self.joints {
            joint.reset();
        }
    }

    pub fn blend_position(&mut self, joint: usize, pos: Vec3, weight: f32) {
        if let Some(state) = self.joints.get_mut(joint) {
            state.blend_position(pos, weight);
        }
    }

    pub fn blend_scale(&mut self, joint: usize, scale: Vec3, weight: f32) {
        if let Some(state) = self.joints.get_mut(joint) {
            state.blend_scale(scale, weight);
        }
    }

    pub fn blend_rotation(&mut self, joint: usize, rot: Quat, weight: f32) {
        if let Some(state) = self.joints.get_mut(joint) {
            state.blend_rotation(rot, weight);
        }
    }

    /// Weight sums (position, rotation, scale) accumulated so far for `joint`.
    pub fn weights(&self, joint: usize) -> Option<(f32, f32, f32)> {
        self.joints
            .get(joint)
            .map(|state| (state.sum_pos_weight, state.sum_rot_weight, state.sum_scale_weight))
    }

    /// Fills weight deficits from the original pose and writes the result to `skeleton`.
    pub fn apply(&mut self, skeleton: &mut Skeleton) {
        for (idx, state) in self.joints.iter_mut().enumerate() {
            let trs = state.resolve();
            if let Some(local) = skeleton.local_mut(idx) {
                *local = trs;
            }
        }
        skeleton.update_matrices();
    }
}
