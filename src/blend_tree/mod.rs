pub mod blender;

use std::sync::Arc;

use generational_arena::{Arena, Index};
use glam::Vec2;

use crate::{
    assets::animation::AnimationClip,
    error::{AnimError, Result},
};

use blender::{Blend2DMode, Blender1D, Blender1DResult, Blender2D};

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct BlendNodeId(pub Index);
impl From<BlendNodeId> for Index {
    fn from(id: BlendNodeId) -> Self {
        id.0
    }
}

/// A child of a 1D blender placed at `value` on the blend axis.
#[derive(Debug, Clone, Copy)]
pub struct BlendItem1D {
    pub node: BlendNodeId,
    pub value: f32,
}

/// A child of a 2D blender placed at `value` in the blend plane.
#[derive(Debug, Clone, Copy)]
pub struct BlendItem2D {
    pub node: BlendNodeId,
    pub value: Vec2,
}

#[derive(Debug, Clone)]
pub struct WeightedClip {
    pub clip: Arc<AnimationClip>,
    pub weight: f32,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationBlender1D {
    blender: Blender1D,
    children: Vec<BlendNodeId>,
    input: f32,
    result_buffer: Blender1DResult,
    weighted_children: Vec<(BlendNodeId, f32)>,
}
impl AnimationBlender1D {
    pub fn input(&self) -> f32 {
        self.input
    }

    pub fn children(&self) -> &[BlendNodeId] {
        &self.children
    }

    fn blend(&mut self) -> Vec<(BlendNodeId, f32)> {
        let mut out = std::mem::take(&mut self.weighted_children);
        out.clear();
        self.blender.get(&mut self.result_buffer, self.input);
        for (idx, weight) in self.result_buffer.as_slice() {
            out.push((self.children[*idx], *weight));
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationBlender2D {
    blender: Blender2D,
    mode: Blend2DMode,
    children: Vec<BlendNodeId>,
    input: Vec2,
    result_buffer: Vec<f32>,
    weighted_children: Vec<(BlendNodeId, f32)>,
}
impl AnimationBlender2D {
    pub fn input(&self) -> Vec2 {
        self.input
    }

    pub fn mode(&self) -> Blend2DMode {
        self.mode
    }

    pub fn children(&self) -> &[BlendNodeId] {
        &self.children
    }

    fn blend(&mut self) -> Vec<(BlendNodeId, f32)> {
        let mut out = std::mem::take(&mut self.weighted_children);
        out.clear();
        self.blender.get(self.mode, &mut self.result_buffer, self.input);
        for (idx, weight) in self.result_buffer.iter().enumerate() {
            if *weight != 0.0 {
                out.push((self.children[idx], *weight));
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub enum BlendNode {
    Clip(Arc<AnimationClip>),
    Blend1D(AnimationBlender1D),
    Blend2D(AnimationBlender2D),
}
impl BlendNode {
    fn restore_buffer(&mut self, buffer: Vec<(BlendNodeId, f32)>) {
        match self {
            BlendNode::Clip(_) => (),
            BlendNode::Blend1D(blender) => blender.weighted_children = buffer,
            BlendNode::Blend2D(blender) => blender.weighted_children = buffer,
        }
    }
}

/// A tree of clips and parametric blenders, flattened on demand into a weighted clip list.
///
/// Every mutation goes through the tree so it can raise its dirty flag; `result()` only
/// re-evaluates when the flag is set.
#[derive(Debug, Clone, Default)]
pub struct BlendTree {
    nodes: Arena<BlendNode>,
    root: Option<BlendNodeId>,
    result: Vec<WeightedClip>,
    dirty: bool,
    evaluations: u64,
}

impl BlendTree {
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Default::default()
        }
    }

    /// A tree made of a single clip leaf.
    pub fn from_clip(clip: Arc<AnimationClip>) -> Self {
        let mut tree = Self::new();
        let leaf = tree.add_clip(clip);
        tree.root = Some(leaf);
        tree
    }

    pub fn add_clip(&mut self, clip: Arc<AnimationClip>) -> BlendNodeId {
        BlendNodeId(self.nodes.insert(BlendNode::Clip(clip)))
    }

    pub fn add_blender_1d(&mut self) -> BlendNodeId {
        BlendNodeId(self.nodes.insert(BlendNode::Blend1D(AnimationBlender1D::default())))
    }

    pub fn add_blender_2d(&mut self, mode: Blend2DMode) -> BlendNodeId {
        BlendNodeId(self.nodes.insert(BlendNode::Blend2D(AnimationBlender2D {
            mode,
            ..Default::default()
        })))
    }

    pub fn node(&self, id: BlendNodeId) -> Option<&BlendNode> {
        self.nodes.get(id.0)
    }

    pub fn root(&self) -> Option<BlendNodeId> {
        self.root
    }

    pub fn set_root(&mut self, id: BlendNodeId) -> Result<()> {
        self.ensure_exists(id)?;
        self.root = Some(id);
        self.dirty = true;
        Ok(())
    }

    pub fn set_clip(&mut self, id: BlendNodeId, clip: Arc<AnimationClip>) -> Result<()> {
        match self.nodes.get_mut(id.0) {
            Some(BlendNode::Clip(current)) => *current = clip,
            Some(_) => return Err(AnimError::BlendNodeKind("clip")),
            None => return Err(AnimError::UnknownBlendNode),
        }
        self.dirty = true;
        Ok(())
    }

    pub fn set_samples_1d(&mut self, id: BlendNodeId, samples: &[BlendItem1D]) -> Result<()> {
        for sample in samples {
            self.ensure_exists(sample.node)?;
        }
        let blender = self.blender_1d_mut(id)?;
        let values: Vec<f32> = samples.iter().map(|s| s.value).collect();
        blender.blender.set_samples(&values);
        blender.children = samples.iter().map(|s| s.node).collect();
        self.dirty = true;
        Ok(())
    }

    pub fn set_samples_2d(&mut self, id: BlendNodeId, samples: &[BlendItem2D]) -> Result<()> {
        for sample in samples {
            self.ensure_exists(sample.node)?;
        }
        let blender = self.blender_2d_mut(id)?;
        let values: Vec<Vec2> = samples.iter().map(|s| s.value).collect();
        blender.blender.set_samples(&values);
        blender.children = samples.iter().map(|s| s.node).collect();
        blender.result_buffer.reserve(samples.len());
        self.dirty = true;
        Ok(())
    }

    /// Setting the value already in place does not invalidate the cached result. Non-finite
    /// values are ignored.
    pub fn set_input_1d(&mut self, id: BlendNodeId, value: f32) -> Result<()> {
        let blender = self.blender_1d_mut(id)?;
        if !value.is_finite() {
            log::warn!("ignoring non-finite 1D blend input {}", value);
            return Ok(());
        }
        if blender.input != value {
            blender.input = value;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn set_input_2d(&mut self, id: BlendNodeId, value: Vec2) -> Result<()> {
        let blender = self.blender_2d_mut(id)?;
        if !value.is_finite() {
            log::warn!("ignoring non-finite 2D blend input {}", value);
            return Ok(());
        }
        if blender.input != value {
            blender.input = value;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn set_mode_2d(&mut self, id: BlendNodeId, mode: Blend2DMode) -> Result<()> {
        let blender = self.blender_2d_mut(id)?;
        if blender.mode != mode {
            blender.mode = mode;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// How many times the tree has been flattened.
    pub fn evaluation_count(&self) -> u64 {
        self.evaluations
    }

    /// The flattened `(clip, weight)` list, recomputed only if something changed since the
    /// last call.
    pub fn result(&mut self) -> &[WeightedClip] {
        if self.dirty {
            self.dirty = false;
            self.evaluations += 1;
            self.result.clear();
            if let Some(root) = self.root {
                log::trace!("re-evaluating blend tree ({} nodes)", self.nodes.len());
                evaluate_node(&mut self.nodes, root, &mut self.result, 0);
            }
        }
        &self.result
    }

    fn ensure_exists(&self, id: BlendNodeId) -> Result<()> {
        if self.nodes.contains(id.0) {
            Ok(())
        } else {
            Err(AnimError::UnknownBlendNode)
        }
    }

    fn blender_1d_mut(&mut self, id: BlendNodeId) -> Result<&mut AnimationBlender1D> {
        match self.nodes.get_mut(id.0) {
            Some(BlendNode::Blend1D(blender)) => Ok(blender),
            Some(_) => Err(AnimError::BlendNodeKind("1D blender")),
            None => Err(AnimError::UnknownBlendNode),
        }
    }

    fn blender_2d_mut(&mut self, id: BlendNodeId) -> Result<&mut AnimationBlender2D> {
        match self.nodes.get_mut(id.0) {
            Some(BlendNode::Blend2D(blender)) => Ok(blender),
            Some(_) => Err(AnimError::BlendNodeKind("2D blender")),
            None => Err(AnimError::UnknownBlendNode),
        }
    }
}

fn evaluate_node(nodes: &mut Arena<BlendNode>, id: BlendNodeId, result: &mut Vec<WeightedClip>, depth: usize) {
    if depth > nodes.len() {
        log::warn!("blend tree is cyclic, stopping evaluation at depth {}", depth);
        return;
    }
    let weighted_children = match nodes.get_mut(id.0) {
        None => return,
        Some(BlendNode::Clip(clip)) => {
            result.push(WeightedClip {
                clip: clip.clone(),
                weight: 1.0,
            });
            return;
        }
        Some(BlendNode::Blend1D(blender)) => blender.blend(),
        Some(BlendNode::Blend2D(blender)) => blender.blend(),
    };

    for (child, weight) in &weighted_children {
        let start = result.len();
        evaluate_node(nodes, *child, result, depth + 1);
        for item in &mut result[start..] {
            item.weight *= weight;
        }
    }

    if let Some(node) = nodes.get_mut(id.0) {
        node.restore_buffer(weighted_children);
    }
}
