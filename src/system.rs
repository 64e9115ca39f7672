use generational_arena::{Arena, Index};

use crate::{config::AnimationConfig, controller::AnimationController};

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct ControllerId(pub Index);
impl From<ControllerId> for Index {
    fn from(id: ControllerId) -> Self {
        id.0
    }
}

/// Owns every animation controller and ticks the enabled ones.
#[derive(Debug)]
pub struct AnimationSystem {
    controllers: Arena<AnimationController>,
}

impl Default for AnimationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationSystem {
    pub fn new() -> Self {
        Self::with_config(&AnimationConfig::default())
    }

    pub fn with_config(config: &AnimationConfig) -> Self {
        Self {
            controllers: Arena::with_capacity(config.system_capacity),
        }
    }

    pub fn add(&mut self, controller: AnimationController) -> ControllerId {
        ControllerId(self.controllers.insert(controller))
    }

    pub fn remove(&mut self, id: ControllerId) -> Option<AnimationController> {
        self.controllers.remove(id.0)
    }

    pub fn get(&self, id: ControllerId) -> Option<&AnimationController> {
        self.controllers.get(id.0)
    }

    pub fn get_mut(&mut self, id: ControllerId) -> Option<&mut AnimationController> {
        self.controllers.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ControllerId, &AnimationController)> {
        self.controllers.iter().map(|(idx, controller)| (ControllerId(idx), controller))
    }

    /// Steps every enabled controller that has a skeleton.
    pub fn tick(&mut self, dt: f32) {
        for (_, controller) in self.controllers.iter_mut() {
            if controller.enabled && controller.skeleton().is_some() {
                controller.update(dt);
            }
        }
    }
}
