use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TRS {
    pub t: Vec3,
    pub r: Quat,
    pub s: Vec3,
}
impl TRS {
    pub const IDENTITY: Self = Self {
        t: Vec3::ZERO,
        r: Quat::IDENTITY,
        s: Vec3::ONE,
    };

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.s, self.r, self.t)
    }
}
impl Default for TRS {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Joint {
    pub name: Option<String>,
    pub children: Vec<u32>,
    /// local transform, relative to the parent joint
    pub local: TRS,
    #[serde(skip, default = "identity_mat4")]
    pub world: Mat4,
}
impl Joint {
    pub fn new(name: impl Into<String>, local: TRS) -> Self {
        Self {
            name: Some(name.into()),
            children: vec![],
            local,
            world: Mat4::IDENTITY,
        }
    }
}

fn identity_mat4() -> Mat4 {
    Mat4::IDENTITY
}

/// A skeleton instance. The animation code only writes `Joint::local` and then asks for the
/// world matrices to be rebuilt.
#[derive(Debug, Clone)]
pub struct Skeleton {
    joints: Vec<Joint>,
    roots: Vec<u32>,
    matrix_updates: u64,
}
impl Skeleton {
    pub fn new(joints: Vec<Joint>) -> Self {
        let mut has_parent = vec![false; joints.len()];
        for joint in &joints {
            for child in &joint.children {
                if let Some(flag) = has_parent.get_mut(*child as usize) {
                    *flag = true;
                }
            }
        }
        let roots = has_parent
            .iter()
            .enumerate()
            .filter_map(|(idx, parented)| if *parented { None } else { Some(idx as u32) })
            .collect();

        let mut skeleton = Self {
            joints,
            roots,
            matrix_updates: 0,
        };
        skeleton.update_matrices();
        skeleton.matrix_updates = 0;
        skeleton
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joint(&self, idx: usize) -> Option<&Joint> {
        self.joints.get(idx)
    }

    pub fn local_mut(&mut self, idx: usize) -> Option<&mut TRS> {
        self.joints.get_mut(idx).map(|joint| &mut joint.local)
    }

    pub fn find_joint(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|joint| joint.name.as_deref() == Some(name))
    }

    /// Number of world-matrix passes since construction.
    pub fn matrix_updates(&self) -> u64 {
        self.matrix_updates
    }

    /// Rebuilds every joint's world matrix from the local transforms.
    pub fn update_matrices(&mut self) {
        let mut stack: Vec<(usize, Mat4)> = self
            .roots
            .iter()
            .map(|idx| (*idx as usize, Mat4::IDENTITY))
            .collect();
        let mut visited = vec![false; self.joints.len()];

        while let Some((idx, parent_mat)) = stack.pop() {
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            let joint = &mut self.joints[idx];
            let world = parent_mat * joint.local.to_mat4();
            joint.world = world;
            for child in &joint.children {
                if (*child as usize) < visited.len() {
                    stack.push((*child as usize, world));
                }
            }
        }
        self.matrix_updates += 1;
    }
}

/// Per-joint on/off switch restricting which joints a motion may drive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SkeletonMask {
    enabled: Vec<bool>,
}
impl SkeletonMask {
    pub fn all(joint_count: usize) -> Self {
        Self { enabled: vec![true; joint_count] }
    }

    pub fn none(joint_count: usize) -> Self {
        Self { enabled: vec![false; joint_count] }
    }

    /// Enables the named joints and everything below them.
    pub fn from_subtrees(skeleton: &Skeleton, names: &[&str]) -> Self {
        let mut mask = Self::none(skeleton.joint_count());
        let mut stack: Vec<usize> = names.iter().filter_map(|name| skeleton.find_joint(name)).collect();
        while let Some(idx) = stack.pop() {
            if mask.enabled[idx] {
                continue;
            }
            mask.enabled[idx] = true;
            if let Some(joint) = skeleton.joint(idx) {
                stack.extend(
                    joint.children.iter().map(|c| *c as usize).filter(|c| *c < mask.enabled.len()),
                );
            }
        }
        mask
    }

    pub fn set(&mut self, joint: usize, enabled: bool) {
        if let Some(flag) = self.enabled.get_mut(joint) {
            *flag = enabled;
        }
    }

    /// Joints outside the mask's range are excluded.
    pub fn contains(&self, joint: usize) -> bool {
        self.enabled.get(joint).copied().unwrap_or(false)
    }
}
