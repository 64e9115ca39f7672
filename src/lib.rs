//! Skeletal animation blending: keyframed clips, parametric blend trees and a motion graph
//! with timed cross-fades, resolved into one skeleton pose per tick.

pub mod anim_pose;
pub mod animator;
pub mod assets;
pub mod blend_tree;
pub mod config;
pub mod controller;
pub mod error;
pub mod sampling_state;
pub mod skeleton;
pub mod system;
pub mod utils;

pub use animator::{
    condition::{Condition, ConditionOp, ParamType, ParamValue, Parameter},
    motion::{MaskedLayer, Motion, MotionAnimation, MotionId, WrapMode},
    switch_task::{SwitchTask, SwitchTaskItem},
    AnimationGraph, Transition, TransitionId,
};
pub use assets::animation::{AnimationClip, Channel, Interpolation, Track};
pub use blend_tree::{
    blender::Blend2DMode, BlendItem1D, BlendItem2D, BlendNode, BlendNodeId, BlendTree, WeightedClip,
};
pub use config::AnimationConfig;
pub use controller::{AnimationController, AnimationState};
pub use error::{AnimError, Result};
pub use sampling_state::SamplingState;
pub use skeleton::{Joint, Skeleton, SkeletonMask, TRS};
pub use system::{AnimationSystem, ControllerId};
