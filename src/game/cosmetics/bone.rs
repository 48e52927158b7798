// Immutable bone hierarchy for cosmetic geometry
//
// Bones are stored in an arena with parent names only; children are derived
// on demand so the tree never holds reference cycles.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::math::Aabb;

/// Left/right selector for asymmetrically authored cosmetics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// A textured cuboid attached to a bone, in model space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    pub origin: Vec3,
    pub size: Vec3,
    /// Top-left UV corner of the cube's unwrapped faces (pixels)
    #[serde(default)]
    pub uv: Vec2,
}

impl Cube {
    pub fn new(origin: Vec3, size: Vec3) -> Self {
        Self {
            origin,
            size,
            uv: Vec2::ZERO,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_origin_size(self.origin, self.size)
    }
}

/// A named node of the hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub pivot: Vec3,
    /// Euler rotation in degrees
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default)]
    pub cubes: Vec<Cube>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Only shown when the cosmetic is worn on this side
    #[serde(default)]
    pub side: Option<Side>,
}

fn default_visible() -> bool {
    true
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            pivot: Vec3::ZERO,
            rotation: Vec3::ZERO,
            cubes: Vec::new(),
            visible: true,
            side: None,
        }
    }

    pub fn with_cube(mut self, cube: Cube) -> Self {
        self.cubes.push(cube);
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Arena of bones with a name index
///
/// Bones are shared through `Arc`, so derived models reuse every bone they
/// do not change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoneModel {
    bones: Vec<Arc<Bone>>,
    index: HashMap<String, usize>,
}

impl BoneModel {
    /// Build a model; later bones with a duplicate name shadow earlier ones in lookups
    pub fn new(bones: Vec<Bone>) -> Self {
        Self::from_shared(bones.into_iter().map(Arc::new).collect())
    }

    fn from_shared(bones: Vec<Arc<Bone>>) -> Self {
        let index = bones
            .iter()
            .enumerate()
            .map(|(i, bone)| (bone.name.clone(), i))
            .collect();
        Self { bones, index }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter().map(|b| b.as_ref())
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index).map(|b| b.as_ref())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Bone> {
        self.index_of(name).and_then(|i| self.bone(i))
    }

    /// Index of a bone's parent; unknown parents make the bone a root
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        let parent = self.bones.get(index)?.parent.as_deref()?;
        self.index_of(parent).filter(|&p| p != index)
    }

    pub fn roots(&self) -> Vec<usize> {
        (0..self.bones.len())
            .filter(|&i| self.parent_of(i).is_none())
            .collect()
    }

    pub fn children(&self, index: usize) -> Vec<usize> {
        (0..self.bones.len())
            .filter(|&i| self.parent_of(i) == Some(index))
            .collect()
    }

    /// Bone indices ordered so every parent comes before its children
    ///
    /// Bones caught in a parent cycle are left out.
    pub fn topological_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.bones.len());
        let mut stack: Vec<usize> = self.roots();
        stack.reverse();
        while let Some(index) = stack.pop() {
            order.push(index);
            let mut children = self.children(index);
            children.reverse();
            stack.extend(children);
        }
        order
    }

    /// Same hierarchy with every cube overlapping one of `zones` removed
    ///
    /// Untouched bones are shared with `self`.
    pub fn without_cubes_in(&self, zones: &[Aabb]) -> BoneModel {
        if zones.is_empty() {
            return self.clone();
        }

        let bones = self
            .bones
            .iter()
            .map(|bone| {
                let clipped = |cube: &Cube| zones.iter().any(|zone| cube.bounds().overlaps(zone));
                if bone.cubes.iter().any(clipped) {
                    let mut trimmed = Bone::clone(bone);
                    trimmed.cubes.retain(|cube| !clipped(cube));
                    Arc::new(trimmed)
                } else {
                    Arc::clone(bone)
                }
            })
            .collect();

        Self::from_shared(bones)
    }

    /// Check whether two models share the same bone allocation at `index`
    pub fn shares_bone(&self, other: &BoneModel, index: usize) -> bool {
        match (self.bones.get(index), other.bones.get(index)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
