use std::sync::Arc;

use generational_arena::Index;
use serde::{Deserialize, Serialize};

use crate::{
    assets::animation::AnimationClip,
    blend_tree::BlendTree,
    skeleton::SkeletonMask,
};

use super::{switch_task::SwitchTaskItem, TransitionId};

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct MotionId(pub Index);
impl From<MotionId> for Index {
    fn from(id: MotionId) -> Self {
        id.0
    }
}

/// What happens when motion time leaves [0, duration]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WrapMode {
    /// play through once and hold the last frame
    Once,
    #[default]
    Loop,
    PingPong,
    Clamp,
}
impl WrapMode {
    /// Maps elapsed motion time onto a clip of length `duration`.
    pub fn true_time(self, time: f32, duration: f32) -> f32 {
        if duration <= f32::EPSILON || !time.is_finite() {
            return 0.0;
        }
        match self {
            WrapMode::Once => time.min(duration).max(0.0),
            WrapMode::Clamp => time.clamp(0.0, duration),
            WrapMode::Loop => time.rem_euclid(duration),
            WrapMode::PingPong => {
                let period = duration * 2.0;
                let t2 = time.rem_euclid(period);
                if t2 <= duration { t2 } else { period - t2 }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum MotionAnimation {
    Clip(Arc<AnimationClip>),
    BlendTree(BlendTree),
    /// Several animations played together, each restricted to its own joints.
    Masked(Vec<MaskedLayer>),
}
impl MotionAnimation {
    pub fn is_empty(&self) -> bool {
        match self {
            MotionAnimation::Masked(layers) => layers.iter().all(|layer| layer.animation.is_empty()),
            _ => false,
        }
    }

    fn emit_items(
        &mut self,
        time: f32,
        wrap_mode: WrapMode,
        mask: Option<&Arc<SkeletonMask>>,
        out: &mut Vec<SwitchTaskItem>,
    ) {
        match self {
            MotionAnimation::Clip(clip) => out.push(SwitchTaskItem {
                time: wrap_mode.true_time(time, clip.length()),
                clip: clip.clone(),
                weight: 1.0,
                mask: mask.cloned(),
            }),
            MotionAnimation::BlendTree(tree) => {
                for weighted in tree.result() {
                    out.push(SwitchTaskItem {
                        time: wrap_mode.true_time(time, weighted.clip.length()),
                        clip: weighted.clip.clone(),
                        weight: weighted.weight,
                        mask: mask.cloned(),
                    });
                }
            }
            // the layer's own mask replaces any outer one
            MotionAnimation::Masked(layers) => {
                for layer in layers {
                    layer.animation.emit_items(time, wrap_mode, Some(&layer.mask), out);
                }
            }
        }
    }
}

/// One layer of a `MotionAnimation::Masked`.
#[derive(Debug, Clone)]
pub struct MaskedLayer {
    pub animation: MotionAnimation,
    pub mask: Arc<SkeletonMask>,
}
impl MaskedLayer {
    pub fn new(animation: impl Into<MotionAnimation>, mask: Arc<SkeletonMask>) -> Self {
        Self {
            animation: animation.into(),
            mask,
        }
    }
}
impl From<Arc<AnimationClip>> for MotionAnimation {
    fn from(clip: Arc<AnimationClip>) -> Self {
        MotionAnimation::Clip(clip)
    }
}
impl From<BlendTree> for MotionAnimation {
    fn from(tree: BlendTree) -> Self {
        MotionAnimation::BlendTree(tree)
    }
}

/// A node of the animation graph.
#[derive(Debug, Clone)]
pub struct Motion {
    name: String,
    pub animation: Option<MotionAnimation>,
    pub speed: f32,
    pub wrap_mode: WrapMode,
    /// seconds played since the motion was last switched to, scaled by `speed`
    pub time: f32,
    /// joints outside the mask get nothing from this motion
    pub mask: Option<Arc<SkeletonMask>>,
    pub(crate) outgoing: Vec<TransitionId>,
    pub(crate) incoming: Vec<TransitionId>,
    pub(crate) ephemeral: bool,
}

impl Motion {
    pub fn new(name: impl Into<String>, animation: Option<MotionAnimation>) -> Self {
        Self {
            name: name.into(),
            animation,
            speed: 1.0,
            wrap_mode: WrapMode::Loop,
            time: 0.0,
            mask: None,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            ephemeral: false,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_wrap_mode(mut self, wrap_mode: WrapMode) -> Self {
        self.wrap_mode = wrap_mode;
        self
    }

    pub fn with_mask(mut self, mask: Arc<SkeletonMask>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_animation(&self) -> bool {
        self.animation.as_ref().is_some_and(|animation| !animation.is_empty())
    }

    pub fn outgoing(&self) -> &[TransitionId] {
        &self.outgoing
    }

    pub fn incoming(&self) -> &[TransitionId] {
        &self.incoming
    }

    /// Created by `AnimationGraph::play` and dropped once another motion takes over.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        self.time += dt * self.speed;
    }

    /// Appends this motion's weighted clips, each with its wrap-adjusted play time.
    pub(crate) fn emit_items(&mut self, out: &mut Vec<SwitchTaskItem>) {
        if let Some(animation) = &mut self.animation {
            animation.emit_items(self.time, self.wrap_mode, self.mask.as_ref(), out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{anim_pose::tests::slide_clip, blend_tree::BlendItem1D, skeleton::tests::test_skeleton};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn loop_is_modulo() {
        assert!(close(WrapMode::Loop.true_time(2.5, 1.0), 0.5));
        assert!(close(WrapMode::Loop.true_time(0.25, 1.0), 0.25));
    }

    #[test]
    fn once_holds_last_frame() {
        assert!(close(WrapMode::Once.true_time(0.5, 2.0), 0.5));
        assert!(close(WrapMode::Once.true_time(7.0, 2.0), 2.0));
    }

    #[test]
    fn ping_pong_is_triangle_wave() {
        let mode = WrapMode::PingPong;
        assert!(close(mode.true_time(0.25, 1.0), 0.25));
        assert!(close(mode.true_time(1.25, 1.0), 0.75));
        assert!(close(mode.true_time(2.25, 1.0), 0.25));
        assert!(close(mode.true_time(1.0, 1.0), 1.0));
    }

    #[test]
    fn clamp_stays_in_range() {
        assert!(close(WrapMode::Clamp.true_time(-1.0, 2.0), 0.0));
        assert!(close(WrapMode::Clamp.true_time(3.0, 2.0), 2.0));
    }

    #[test]
    fn zero_length_clip_maps_to_start() {
        for mode in [WrapMode::Once, WrapMode::Loop, WrapMode::PingPong, WrapMode::Clamp] {
            assert_eq!(mode.true_time(3.0, 0.0), 0.0);
        }
    }

    #[test]
    fn advance_scales_by_speed() {
        let mut motion = Motion::new("run", None).with_speed(2.0);
        motion.advance(0.25);
        assert!(close(motion.time, 0.5));
    }

    #[test]
    fn clip_motion_emits_one_item() {
        let clip = Arc::new(slide_clip("walk", 1.0, 1.0));
        let mut motion = Motion::new("walk", Some(clip.into()));
        motion.time = 1.5;
        let mut items = Vec::new();
        motion.emit_items(&mut items);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].weight, 1.0);
        assert!(close(items[0].time, 0.5));
    }

    #[test]
    fn blend_tree_motion_emits_weighted_items() {
        let mut tree = BlendTree::new();
        let walk = tree.add_clip(Arc::new(slide_clip("walk", 1.0, 1.0)));
        let run = tree.add_clip(Arc::new(slide_clip("run", 2.0, 1.0)));
        let speed = tree.add_blender_1d();
        tree.set_samples_1d(
            speed,
            &[BlendItem1D { node: walk, value: 0.0 }, BlendItem1D { node: run, value: 1.0 }],
        )
        .unwrap();
        tree.set_root(speed).unwrap();
        tree.set_input_1d(speed, 0.5).unwrap();

        let mut motion = Motion::new("locomotion", Some(tree.into())).with_wrap_mode(WrapMode::Once);
        motion.time = 1.5;
        let mut items = Vec::new();
        motion.emit_items(&mut items);
        assert_eq!(items.len(), 2);
        assert!(close(items[0].weight, 0.5));
        assert!(close(items[0].time, 1.0));
        assert!(close(items[1].time, 1.5));
    }

    #[test]
    fn masked_layers_carry_their_own_masks() {
        let upper = Arc::new(SkeletonMask::from_subtrees(&test_skeleton(), &["spine"]));
        let lower = Arc::new(SkeletonMask::from_subtrees(&test_skeleton(), &["leg"]));
        let layers = vec![
            MaskedLayer::new(Arc::new(slide_clip("wave", 1.0, 1.0)), upper.clone()),
            MaskedLayer::new(BlendTree::from_clip(Arc::new(slide_clip("walk", 2.0, 1.0))), lower.clone()),
        ];
        let mut motion = Motion::new("wave_and_walk", Some(MotionAnimation::Masked(layers)));
        motion.time = 1.5;
        let mut items = Vec::new();
        motion.emit_items(&mut items);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].clip.name, "wave");
        assert!(close(items[0].time, 0.5));
        assert_eq!(items[0].mask.as_deref(), Some(&*upper));
        assert_eq!(items[1].clip.name, "walk");
        assert!(close(items[1].time, 1.5));
        assert_eq!(items[1].mask.as_deref(), Some(&*lower));
    }

    #[test]
    fn motion_without_layers_has_no_animation() {
        let motion = Motion::new("nothing", Some(MotionAnimation::Masked(Vec::new())));
        assert!(!motion.has_animation());
    }

    #[test]
    fn empty_motion_emits_nothing() {
        let mut items = Vec::new();
        Motion::new("empty", None).emit_items(&mut items);
        assert!(items.is_empty());
    }
}
