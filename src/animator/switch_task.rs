use std::sync::Arc;

use generational_arena::Arena;

use crate::{assets::animation::AnimationClip, skeleton::SkeletonMask};

use super::motion::{Motion, MotionId};

/// One clip to blend this tick.
#[derive(Debug, Clone)]
pub struct SwitchTaskItem {
    pub clip: Arc<AnimationClip>,
    /// weight inside the owning motion (1 for a plain clip)
    pub weight: f32,
    /// wrap-adjusted play time
    pub time: f32,
    pub mask: Option<Arc<SkeletonMask>>,
}

/// The cross-fade between two motions.
///
/// Items are rebuilt every update, source motion items first. While fading, source items are
/// weighted by `coefficients().0` and target items by `coefficients().1`.
#[derive(Debug, Clone)]
pub struct SwitchTask {
    source: Option<MotionId>,
    target: Option<MotionId>,
    items: Vec<SwitchTaskItem>,
    source_items: usize,
    elapsed: f32,
    cost: f32,
    coeff1: f32,
    coeff2: f32,
}

impl Default for SwitchTask {
    fn default() -> Self {
        Self {
            source: None,
            target: None,
            items: Vec::new(),
            source_items: 0,
            elapsed: 0.0,
            cost: 0.0,
            coeff1: 0.0,
            coeff2: 1.0,
        }
    }
}

impl SwitchTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts fading from `source` to `target`. The fade is instant when either side has
    /// nothing to play.
    pub(crate) fn reset(&mut self, source: Option<MotionId>, target: MotionId, cost: f32, motions: &mut Arena<Motion>) {
        let animated = |id: Option<MotionId>| {
            id.and_then(|id| motions.get(id.0)).is_some_and(|motion| motion.has_animation())
        };
        self.cost = if animated(source) && animated(Some(target)) {
            cost.max(0.0)
        } else {
            0.0
        };
        self.source = source;
        self.target = Some(target);
        self.items.clear();
        self.source_items = 0;
        self.elapsed = 0.0;
        self.coeff1 = 0.0;
        self.coeff2 = 1.0;
        if let Some(motion) = motions.get_mut(target.0) {
            motion.time = 0.0;
        }
    }

    /// Ends the fade early, keeping only the target's items.
    pub(crate) fn drop_source(&mut self) {
        self.items.drain(..self.source_items);
        self.finish();
    }

    /// Forgets both motions and all items.
    pub(crate) fn clear(&mut self) {
        self.finish();
        self.target = None;
        self.items.clear();
        self.elapsed = 0.0;
        self.cost = 0.0;
    }

    pub(crate) fn update(&mut self, motions: &mut Arena<Motion>, dt: f32) {
        let Some(target) = self.target else {
            return;
        };
        let Some(target_motion) = motions.get_mut(target.0) else {
            self.target = None;
            self.items.clear();
            return;
        };
        target_motion.advance(dt);
        if let Some(source) = self.source {
            match motions.get_mut(source.0) {
                Some(motion) => motion.advance(dt),
                None => self.source = None,
            }
        }

        self.items.clear();
        self.source_items = 0;
        if let Some(source) = self.source {
            if let Some(motion) = motions.get_mut(source.0) {
                motion.emit_items(&mut self.items);
                self.source_items = self.items.len();
            }
        }
        if let Some(target) = motions.get_mut(target.0) {
            target.emit_items(&mut self.items);
        }

        if self.source_items == 0 {
            self.finish();
            return;
        }

        self.elapsed += dt;
        if self.elapsed >= self.cost {
            self.items.drain(..self.source_items);
            self.finish();
            return;
        }
        self.coeff2 = (self.elapsed / self.cost).min(1.0);
        self.coeff1 = 1.0 - self.coeff2;
    }

    fn finish(&mut self) {
        self.source = None;
        self.source_items = 0;
        self.coeff1 = 0.0;
        self.coeff2 = 1.0;
    }

    pub fn source(&self) -> Option<MotionId> {
        self.source
    }

    pub fn target(&self) -> Option<MotionId> {
        self.target
    }

    pub fn animation_count(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[SwitchTaskItem] {
        &self.items
    }

    pub fn item(&self, i: usize) -> Option<&SwitchTaskItem> {
        self.items.get(i)
    }

    /// Cross-fade coefficient for item `i`.
    pub fn motion_weight(&self, i: usize) -> f32 {
        if i < self.source_items { self.coeff1 } else { self.coeff2 }
    }

    /// (source, target)
    pub fn coefficients(&self) -> (f32, f32) {
        (self.coeff1, self.coeff2)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn cost(&self) -> f32 {
        self.cost
    }

    /// No fade is in flight.
    pub fn finished(&self) -> bool {
        self.source.is_none()
    }

    pub(crate) fn references(&self, id: MotionId) -> bool {
        self.source == Some(id) || self.target == Some(id)
    }

    pub(crate) fn is_source(&self, id: MotionId) -> bool {
        self.source == Some(id)
    }
}
