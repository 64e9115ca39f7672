use std::{collections::HashMap, sync::Arc};

use crate::{
    animator::{
        motion::{MotionId, WrapMode},
        AnimationGraph,
    },
    assets::animation::AnimationClip,
    config::AnimationConfig,
    error::{AnimError, Result},
    sampling_state::SamplingState,
    skeleton::Skeleton,
};

/// A clip registered under its name for direct playback.
#[derive(Debug, Clone)]
pub struct AnimationState {
    clip: Arc<AnimationClip>,
    pub speed: f32,
    pub wrap_mode: WrapMode,
}
impl AnimationState {
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }
}

/// Drives one skeleton from an animation graph.
#[derive(Debug, Clone)]
pub struct AnimationController {
    graph: AnimationGraph,
    skeleton: Option<Skeleton>,
    sampling_state: Option<SamplingState>,
    states: HashMap<String, AnimationState>,
    pub enabled: bool,
}

impl Default for AnimationController {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationController {
    pub fn new() -> Self {
        Self::with_config(AnimationConfig::default())
    }

    pub fn with_config(config: AnimationConfig) -> Self {
        Self {
            graph: AnimationGraph::with_config(config),
            skeleton: None,
            sampling_state: None,
            states: HashMap::new(),
            enabled: true,
        }
    }

    /// Attaches a skeleton. Its current locals become the rest pose used to fill weight
    /// deficits.
    pub fn set_skeleton(&mut self, skeleton: Skeleton) {
        self.sampling_state = Some(SamplingState::new(&skeleton));
        self.skeleton = Some(skeleton);
    }

    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.skeleton.as_ref()
    }

    pub fn skeleton_mut(&mut self) -> Option<&mut Skeleton> {
        self.skeleton.as_mut()
    }

    pub fn graph(&self) -> &AnimationGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AnimationGraph {
        &mut self.graph
    }

    /// Registers `clip` under its own name with the configured speed and wrap mode.
    pub fn add_clip(&mut self, clip: Arc<AnimationClip>) -> Result<()> {
        if self.states.contains_key(&clip.name) {
            log::warn!("animation state '{}' already exists", clip.name);
            return Err(AnimError::DuplicateState(clip.name.clone()));
        }
        let config = self.graph.config();
        let state = AnimationState {
            speed: config.default_speed,
            wrap_mode: config.default_wrap_mode,
            clip: clip.clone(),
        };
        self.states.insert(clip.name.clone(), state);
        Ok(())
    }

    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        self.states.get(name)
    }

    pub fn state_mut(&mut self, name: &str) -> Option<&mut AnimationState> {
        self.states.get_mut(name)
    }

    /// Cross-fades to the named clip over `fade` seconds.
    pub fn play(&mut self, name: &str, fade: f32) -> Result<MotionId> {
        let Some(state) = self.states.get(name) else {
            log::warn!("animation state '{}' not found", name);
            return Err(AnimError::UnknownState(name.to_string()));
        };
        Ok(self.graph.play(state.clip.clone(), fade, state.speed, state.wrap_mode))
    }

    pub fn play_default(&mut self, name: &str) -> Result<MotionId> {
        self.play(name, self.graph.config().default_cross_fade)
    }

    /// Advances the graph and writes the blended pose. Does nothing until a skeleton is
    /// attached; leaves the pose alone when nothing is playing.
    pub fn update(&mut self, dt: f32) {
        let (Some(skeleton), Some(state)) = (self.skeleton.as_mut(), self.sampling_state.as_mut()) else {
            return;
        };
        self.graph.update(dt);
        let task = self.graph.switch_task();
        if task.animation_count() == 0 {
            return;
        }

        state.reset();
        for (i, item) in task.items().iter().enumerate() {
            let weight = item.weight * task.motion_weight(i);
            if weight <= 0.0 {
                continue;
            }
            item.clip.blended_sample(state, item.time, weight, item.mask.as_deref());
        }
        state.apply(skeleton);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::{anim_pose::tests::slide_clip, skeleton::tests::test_skeleton};

    fn controller() -> AnimationController {
        let mut controller = AnimationController::new();
        controller.set_skeleton(test_skeleton());
        controller.add_clip(Arc::new(slide_clip("walk", 1.0, 4.0))).unwrap();
        controller.add_clip(Arc::new(slide_clip("run", 1.0, 8.0))).unwrap();
        controller
    }

    fn joint1(controller: &AnimationController) -> Vec3 {
        controller.skeleton().unwrap().joint(1).unwrap().local.t
    }

    #[test]
    fn idle_controller_keeps_pose() {
        let mut controller = controller();
        let before = controller.skeleton().unwrap().matrix_updates();
        controller.update(0.1);
        assert_eq!(controller.skeleton().unwrap().matrix_updates(), before);
        assert_eq!(joint1(&controller), Vec3::Y);
    }

    #[test]
    fn instant_play_samples_clip() {
        let mut controller = controller();
        controller.play("walk", 0.0).unwrap();
        controller.update(0.25);
        assert!((joint1(&controller) - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn cross_fade_mixes_both_clips() {
        let mut controller = controller();
        controller.play("walk", 0.0).unwrap();
        controller.update(0.5);
        controller.play("run", 1.0).unwrap();
        controller.update(0.5);
        // walk has looped back to 0.0 and run is at 0.5s (4.0), half and half
        assert!((joint1(&controller) - Vec3::X * 2.0).length() < 1e-4);
        controller.update(0.6);
        // run alone at 1.1s looping to 0.1s
        assert!((joint1(&controller) - Vec3::X * 0.8).length() < 1e-4);
    }

    #[test]
    fn state_speed_is_used() {
        let mut controller = controller();
        controller.state_mut("walk").unwrap().speed = 0.5;
        controller.play("walk", 0.0).unwrap();
        controller.update(0.5);
        assert!((joint1(&controller) - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn duplicate_and_unknown_states() {
        let mut controller = controller();
        assert!(matches!(
            controller.add_clip(Arc::new(slide_clip("walk", 2.0, 1.0))),
            Err(AnimError::DuplicateState(_))
        ));
        assert!(matches!(controller.play("fly", 0.3), Err(AnimError::UnknownState(_))));
    }

    #[test]
    fn no_skeleton_no_tick() {
        let mut controller = AnimationController::new();
        controller.add_clip(Arc::new(slide_clip("walk", 1.0, 1.0))).unwrap();
        let motion = controller.play("walk", 0.0).unwrap();
        controller.update(0.5);
        assert_eq!(controller.graph().motion(motion).unwrap().time, 0.0);
    }
}
