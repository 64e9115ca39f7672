pub mod condition;
pub mod motion;
pub mod switch_task;

use std::{collections::HashMap, sync::Arc};

use generational_arena::{Arena, Index};

use crate::{
    assets::animation::AnimationClip,
    blend_tree::BlendTree,
    config::AnimationConfig,
    error::{AnimError, Result},
};

use condition::{Condition, ConditionOp, ParamType, ParamValue, Parameter};
use motion::{Motion, MotionAnimation, MotionId, WrapMode};
use switch_task::SwitchTask;

pub const ENTRY_MOTION_NAME: &str = "__entry_motion__";

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct TransitionId(pub Index);
impl From<TransitionId> for Index {
    fn from(id: TransitionId) -> Self {
        id.0
    }
}

/// Directed edge between two motions, taken when every condition holds.
#[derive(Debug, Clone)]
pub struct Transition {
    source: MotionId,
    target: MotionId,
    conditions: Vec<Condition>,
    /// cross-fade duration in seconds
    pub cost: f32,
}
impl Transition {
    pub fn source(&self) -> MotionId {
        self.source
    }

    pub fn target(&self) -> MotionId {
        self.target
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn add_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions_satisfied(&self, params: &HashMap<String, Parameter>) -> bool {
        self.conditions.iter().all(|condition| condition.satisfied(params))
    }
}

/// State machine of motions. Each `update` fires at most one transition out of the current
/// motion and then advances the cross-fade.
#[derive(Debug, Clone)]
pub struct AnimationGraph {
    motions: Arena<Motion>,
    transitions: Arena<Transition>,
    entry: MotionId,
    current: MotionId,
    params: HashMap<String, Parameter>,
    switch_task: SwitchTask,
    config: AnimationConfig,
}

impl Default for AnimationGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationGraph {
    pub fn new() -> Self {
        Self::with_config(AnimationConfig::default())
    }

    pub fn with_config(config: AnimationConfig) -> Self {
        let mut motions = Arena::new();
        let entry = MotionId(motions.insert(Motion::new(ENTRY_MOTION_NAME, None)));
        Self {
            motions,
            transitions: Arena::new(),
            entry,
            current: entry,
            params: HashMap::new(),
            switch_task: SwitchTask::new(),
            config,
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    // Motions

    /// Adds a motion using the configured default speed and wrap mode.
    pub fn create_motion(&mut self, name: impl Into<String>, animation: Option<MotionAnimation>) -> MotionId {
        let motion = Motion::new(name, animation)
            .with_speed(self.config.default_speed)
            .with_wrap_mode(self.config.default_wrap_mode);
        self.add_motion(motion)
    }

    pub fn add_motion(&mut self, mut motion: Motion) -> MotionId {
        motion.outgoing.clear();
        motion.incoming.clear();
        MotionId(self.motions.insert(motion))
    }

    /// Removes a motion and every transition touching it. If the motion was the current one,
    /// the graph falls back to its entry motion; if it was only being faded out, the fade ends
    /// and the current motion keeps playing.
    pub fn remove_motion(&mut self, id: MotionId) -> Option<Motion> {
        if id == self.entry {
            log::warn!("the entry motion cannot be removed");
            return None;
        }
        self.clear_transitions(id).ok()?;
        let motion = self.motions.remove(id.0)?;
        if self.current == id || self.switch_task.target() == Some(id) {
            self.current = self.entry;
            self.switch_task.clear();
        } else if self.switch_task.is_source(id) {
            self.switch_task.drop_source();
        }
        Some(motion)
    }

    pub fn motion(&self, id: MotionId) -> Option<&Motion> {
        self.motions.get(id.0)
    }

    pub fn motion_mut(&mut self, id: MotionId) -> Option<&mut Motion> {
        self.motions.get_mut(id.0)
    }

    pub fn find_motion(&self, name: &str) -> Option<MotionId> {
        self.motions
            .iter()
            .find(|(_, motion)| motion.name() == name)
            .map(|(idx, _)| MotionId(idx))
    }

    pub fn motions(&self) -> impl Iterator<Item = (MotionId, &Motion)> {
        self.motions.iter().map(|(idx, motion)| (MotionId(idx), motion))
    }

    pub fn motion_count(&self) -> usize {
        self.motions.len()
    }

    /// The blend tree of a motion, for updating blender inputs between ticks.
    pub fn blend_tree_mut(&mut self, id: MotionId) -> Result<&mut BlendTree> {
        match self.motions.get_mut(id.0) {
            Some(Motion {
                animation: Some(MotionAnimation::BlendTree(tree)),
                ..
            }) => Ok(tree),
            Some(_) => Err(AnimError::NotABlendTree),
            None => Err(unknown_motion(id)),
        }
    }

    pub fn entry_motion(&self) -> MotionId {
        self.entry
    }

    pub fn current_motion(&self) -> MotionId {
        self.current
    }

    pub fn switch_task(&self) -> &SwitchTask {
        &self.switch_task
    }

    // Transitions

    pub fn add_transition(&mut self, source: MotionId, target: MotionId) -> Result<TransitionId> {
        for id in [source, target] {
            if !self.motions.contains(id.0) {
                log::warn!("cannot connect missing motion {:?}", id);
                return Err(unknown_motion(id));
            }
        }
        let id = TransitionId(self.transitions.insert(Transition {
            source,
            target,
            conditions: Vec::new(),
            cost: self.config.default_transition_cost,
        }));
        self.motions[source.0].outgoing.push(id);
        self.motions[target.0].incoming.push(id);
        Ok(id)
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(id.0)
    }

    pub fn transition_mut(&mut self, id: TransitionId) -> Option<&mut Transition> {
        self.transitions.get_mut(id.0)
    }

    pub fn add_condition(&mut self, id: TransitionId, condition: Condition) -> Result<()> {
        let transition = self.transitions.get_mut(id.0).ok_or(AnimError::UnknownTransition)?;
        transition.add_condition(condition);
        Ok(())
    }

    /// Builds a condition on an existing parameter. A missing operand defaults to the
    /// parameter type's default value.
    pub fn make_condition(&self, name: &str, op: ConditionOp, operand: Option<ParamValue>) -> Result<Condition> {
        let Some(param) = self.params.get(name) else {
            log::warn!("condition refers to unknown parameter '{}'", name);
            return Err(AnimError::UnknownParameter(name.to_string()));
        };
        let operand = operand.unwrap_or_else(|| param.param_type().default_value());
        Ok(Condition::new(name, op, operand))
    }

    pub fn remove_transition(&mut self, id: TransitionId) -> Result<Transition> {
        let transition = self.transitions.remove(id.0).ok_or(AnimError::UnknownTransition)?;
        if let Some(source) = self.motions.get_mut(transition.source.0) {
            source.outgoing.retain(|t| *t != id);
        }
        if let Some(target) = self.motions.get_mut(transition.target.0) {
            target.incoming.retain(|t| *t != id);
        }
        Ok(transition)
    }

    /// Deletes every incoming and outgoing transition of `id`.
    pub fn clear_transitions(&mut self, id: MotionId) -> Result<()> {
        let motion = self.motions.get_mut(id.0).ok_or_else(|| unknown_motion(id))?;
        let mut edges = std::mem::take(&mut motion.outgoing);
        edges.append(&mut motion.incoming);
        for edge in edges {
            // self-loops are listed twice
            let _ = self.remove_transition(edge);
        }
        Ok(())
    }

    // Parameters

    /// Creates a parameter at its type's default value, replacing any parameter of the
    /// same name.
    pub fn create_parameter(&mut self, name: impl Into<String>, param_type: ParamType) -> &Parameter {
        let name = name.into();
        self.params.insert(name.clone(), Parameter::new(param_type));
        &self.params[&name]
    }

    pub fn set_parameter(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<()> {
        let value = value.into();
        let Some(param) = self.params.get_mut(name) else {
            log::warn!("parameter '{}' does not exist", name);
            return Err(AnimError::UnknownParameter(name.to_string()));
        };
        if param.param_type() != value.param_type() {
            log::warn!("parameter '{}' is {:?}, ignoring {:?}", name, param.param_type(), value);
            return Err(AnimError::ParameterType {
                name: name.to_string(),
                expected: param.param_type(),
                actual: value.param_type(),
            });
        }
        param.value = value;
        Ok(())
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    // Playback

    pub fn update(&mut self, dt: f32) {
        let fired = self.motions.get(self.current.0).and_then(|motion| {
            motion
                .outgoing
                .iter()
                .filter_map(|id| self.transitions.get(id.0))
                .find(|transition| transition.conditions_satisfied(&self.params))
                .map(|transition| (transition.source, transition.target, transition.cost))
        });
        if let Some((source, target, cost)) = fired {
            self.do_switch(source, target, cost);
        }

        self.switch_task.update(&mut self.motions, dt);
        self.drop_finished_ephemerals();
    }

    fn do_switch(&mut self, source: MotionId, target: MotionId, cost: f32) {
        if source == target {
            return;
        }
        log::debug!(
            "switching {} -> {} over {}s",
            self.motion_name(source),
            self.motion_name(target),
            cost
        );
        self.current = target;
        self.switch_task.reset(Some(source), target, cost, &mut self.motions);
    }

    fn motion_name(&self, id: MotionId) -> &str {
        self.motions.get(id.0).map_or("<removed>", |motion| motion.name())
    }

    fn drop_finished_ephemerals(&mut self) {
        if !self.switch_task.finished() {
            return;
        }
        let stale: Vec<MotionId> = self
            .motions
            .iter()
            .filter(|(idx, motion)| {
                let id = MotionId(*idx);
                motion.ephemeral && id != self.current && !self.switch_task.references(id)
            })
            .map(|(idx, _)| MotionId(idx))
            .collect();
        for id in stale {
            log::debug!("dropping finished motion {}", self.motion_name(id));
            self.remove_motion(id);
        }
    }

    /// Cross-fades from the current motion into a new throwaway motion playing `clip`.
    pub fn play(&mut self, clip: Arc<AnimationClip>, cost: f32, speed: f32, wrap_mode: WrapMode) -> MotionId {
        let mut motion = Motion::new(format!("__play_motion_{}__", clip.name), Some(clip.into()))
            .with_speed(speed)
            .with_wrap_mode(wrap_mode);
        motion.ephemeral = true;
        let id = self.add_motion(motion);
        self.do_switch(self.current, id, cost);
        id
    }

    pub fn linear_switch(&mut self, motion: MotionId, cost: f32) -> Result<()> {
        if !self.motions.contains(motion.0) {
            log::warn!("cannot switch to missing motion {:?}", motion);
            return Err(unknown_motion(motion));
        }
        self.do_switch(self.current, motion, cost);
        Ok(())
    }

    pub fn linear_switch_default(&mut self, motion: MotionId) -> Result<()> {
        self.linear_switch(motion, self.config.default_linear_switch_cost)
    }

    /// Switches without a fade, as if nothing had been playing.
    pub fn direct_switch(&mut self, motion: MotionId) -> Result<()> {
        if !self.motions.contains(motion.0) {
            log::warn!("cannot switch to missing motion {:?}", motion);
            return Err(unknown_motion(motion));
        }
        self.do_switch(self.entry, motion, 0.0);
        Ok(())
    }
}

fn unknown_motion(id: MotionId) -> AnimError {
    AnimError::UnknownMotion(format!("{:?}", id.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim_pose::tests::slide_clip;

    fn clip_motion(graph: &mut AnimationGraph, name: &str, length: f32) -> MotionId {
        graph.create_motion(name, Some(Arc::new(slide_clip(name, length, 1.0)).into()))
    }

    #[test]
    fn starts_at_entry() {
        let graph = AnimationGraph::new();
        assert_eq!(graph.current_motion(), graph.entry_motion());
        assert_eq!(graph.motion(graph.entry_motion()).unwrap().name(), ENTRY_MOTION_NAME);
        assert_eq!(graph.switch_task().animation_count(), 0);
    }

    #[test]
    fn first_satisfied_transition_wins() {
        let mut graph = AnimationGraph::new();
        let idle = clip_motion(&mut graph, "idle", 1.0);
        let walk = clip_motion(&mut graph, "walk", 1.0);
        let run = clip_motion(&mut graph, "run", 1.0);
        graph.create_parameter("speed", ParamType::Number);
        let to_walk = graph.add_transition(idle, walk).unwrap();
        let to_run = graph.add_transition(idle, run).unwrap();
        let moving = graph.make_condition("speed", ConditionOp::Greater, None).unwrap();
        graph.add_condition(to_walk, moving.clone()).unwrap();
        graph.add_condition(to_run, moving).unwrap();

        graph.direct_switch(idle).unwrap();
        graph.update(0.1);
        assert_eq!(graph.current_motion(), idle);

        graph.set_parameter("speed", 2.0_f32).unwrap();
        graph.update(0.1);
        assert_eq!(graph.current_motion(), walk);
    }

    #[test]
    fn transition_without_conditions_fires_immediately() {
        let mut graph = AnimationGraph::new();
        let a = clip_motion(&mut graph, "a", 1.0);
        let b = clip_motion(&mut graph, "b", 1.0);
        let t = graph.add_transition(a, b).unwrap();
        assert_eq!(graph.transition(t).unwrap().cost, 0.3);
        graph.direct_switch(a).unwrap();
        graph.update(0.1);
        assert_eq!(graph.current_motion(), b);
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let mut graph = AnimationGraph::new();
        assert!(matches!(graph.set_parameter("nope", 1.0_f32), Err(AnimError::UnknownParameter(_))));
        assert!(graph.make_condition("nope", ConditionOp::Equal, None).is_err());
    }

    #[test]
    fn parameter_type_mismatch_is_rejected() {
        let mut graph = AnimationGraph::new();
        graph.create_parameter("grounded", ParamType::Boolean);
        assert!(matches!(
            graph.set_parameter("grounded", 1.0_f32),
            Err(AnimError::ParameterType { .. })
        ));
        graph.set_parameter("grounded", true).unwrap();
        assert_eq!(graph.parameter("grounded").unwrap().value(), ParamValue::Boolean(true));
    }

    #[test]
    fn recreating_a_parameter_resets_it() {
        let mut graph = AnimationGraph::new();
        graph.create_parameter("x", ParamType::Number);
        graph.set_parameter("x", 4.0_f32).unwrap();
        let param = graph.create_parameter("x", ParamType::Boolean);
        assert_eq!(param.value(), ParamValue::Boolean(false));
    }

    #[test]
    fn switching_to_self_is_ignored() {
        let mut graph = AnimationGraph::new();
        let a = clip_motion(&mut graph, "a", 1.0);
        graph.direct_switch(a).unwrap();
        graph.update(0.5);
        graph.linear_switch(a, 0.5).unwrap();
        graph.update(0.25);
        assert!((graph.motion(a).unwrap().time - 0.75).abs() < 1e-6);
    }

    #[test]
    fn play_creates_ephemeral_motion_that_is_dropped_later() {
        let mut graph = AnimationGraph::new();
        let a = clip_motion(&mut graph, "a", 1.0);
        graph.direct_switch(a).unwrap();
        graph.update(0.1);

        let clip = Arc::new(slide_clip("wave", 1.0, 1.0));
        let first = graph.play(clip.clone(), 0.2, 1.0, WrapMode::Once);
        assert!(graph.motion(first).unwrap().is_ephemeral());
        assert_eq!(graph.motion(first).unwrap().name(), "__play_motion_wave__");
        graph.update(0.1);
        let second = graph.play(clip, 0.2, 1.0, WrapMode::Once);
        graph.update(0.1);
        assert!(graph.motion(first).is_some());

        graph.update(0.1);
        graph.update(0.1);
        assert!(graph.switch_task().finished());
        assert!(graph.motion(first).is_none());
        assert!(graph.motion(second).is_some());
        assert!(graph.motion(a).is_some());
    }

    #[test]
    fn removing_current_motion_returns_to_entry() {
        let mut graph = AnimationGraph::new();
        let a = clip_motion(&mut graph, "a", 1.0);
        let b = clip_motion(&mut graph, "b", 1.0);
        let t = graph.add_transition(a, b).unwrap();
        graph.direct_switch(a).unwrap();
        graph.update(0.1);

        graph.remove_motion(a).unwrap();
        assert_eq!(graph.current_motion(), graph.entry_motion());
        assert!(graph.transition(t).is_none());
        assert!(graph.motion(b).unwrap().incoming().is_empty());
        graph.update(0.1);
        assert_eq!(graph.switch_task().animation_count(), 0);
    }

    #[test]
    fn removing_faded_out_motion_keeps_target_playing() {
        let mut graph = AnimationGraph::new();
        let a = clip_motion(&mut graph, "a", 1.0);
        let b = clip_motion(&mut graph, "b", 1.0);
        graph.direct_switch(a).unwrap();
        graph.update(0.1);
        graph.linear_switch(b, 1.0).unwrap();
        graph.update(0.1);
        assert_eq!(graph.switch_task().animation_count(), 2);

        graph.remove_motion(a).unwrap();
        assert_eq!(graph.current_motion(), b);
        assert!(graph.switch_task().finished());
        graph.update(0.1);
        assert_eq!(graph.current_motion(), b);
        let task = graph.switch_task();
        assert_eq!(task.animation_count(), 1);
        assert_eq!(task.item(0).unwrap().clip.name, "b");
        assert_eq!(task.motion_weight(0), 1.0);
        assert!((task.item(0).unwrap().time - 0.2).abs() < 1e-5);
    }

    #[test]
    fn entry_motion_cannot_be_removed() {
        let mut graph = AnimationGraph::new();
        assert!(graph.remove_motion(graph.entry_motion()).is_none());
        assert_eq!(graph.motion_count(), 1);
    }

    #[test]
    fn clear_transitions_handles_self_loops() {
        let mut graph = AnimationGraph::new();
        let a = clip_motion(&mut graph, "a", 1.0);
        let b = clip_motion(&mut graph, "b", 1.0);
        graph.add_transition(a, a).unwrap();
        graph.add_transition(a, b).unwrap();
        graph.add_transition(b, a).unwrap();
        graph.clear_transitions(a).unwrap();
        assert!(graph.motion(a).unwrap().outgoing().is_empty());
        assert!(graph.motion(b).unwrap().outgoing().is_empty());
        assert!(graph.motion(b).unwrap().incoming().is_empty());
    }

    #[test]
    fn blend_tree_mut_checks_animation_kind() {
        let mut graph = AnimationGraph::new();
        let a = clip_motion(&mut graph, "a", 1.0);
        let tree = graph.create_motion("tree", Some(BlendTree::new().into()));
        assert!(matches!(graph.blend_tree_mut(a), Err(AnimError::NotABlendTree)));
        assert!(graph.blend_tree_mut(tree).is_ok());
    }

    #[test]
    fn created_motions_use_config_defaults() {
        let config = AnimationConfig {
            default_speed: 2.0,
            default_wrap_mode: WrapMode::PingPong,
            ..Default::default()
        };
        let mut graph = AnimationGraph::with_config(config);
        let m = graph.create_motion("m", None);
        assert_eq!(graph.motion(m).unwrap().speed, 2.0);
        assert_eq!(graph.motion(m).unwrap().wrap_mode, WrapMode::PingPong);
    }
}
