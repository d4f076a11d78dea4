//! Skeletons with explicit bone ids and parents.
use std::collections::BTreeSet;

use glam::Vec3;
use pmo_lib::{ahi::Ahi, Version};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::CreateSkeletonError;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Skeleton {
    /// Bones in their original order.
    /// The order determines the sibling chains for bones with the same parent.
    pub bones: Vec<Bone>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone)]
pub struct Bone {
    pub name: String,
    /// The unique id referenced by [Influence](crate::Influence).
    /// Ids must be contiguous starting from 0.
    pub id: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parent_id: Option<u32>,
    /// The translation relative to the parent bone.
    pub translation: Vec3,
    #[cfg_attr(feature = "serde", serde(default = "default_scale"))]
    pub scale: Vec3,
    #[cfg_attr(feature = "serde", serde(default = "default_chain_id"))]
    pub chain_id: i32,
}

#[cfg(feature = "serde")]
fn default_scale() -> Vec3 {
    Vec3::ONE
}

#[cfg(feature = "serde")]
fn default_chain_id() -> i32 {
    -1
}

impl Bone {
    pub fn new(
        name: impl Into<String>,
        id: u32,
        parent_id: Option<u32>,
        translation: Vec3,
    ) -> Self {
        Self {
            name: name.into(),
            id,
            parent_id,
            translation,
            scale: Vec3::ONE,
            chain_id: -1,
        }
    }
}

impl Skeleton {
    pub fn to_ahi(&self, version: Version) -> Result<Ahi, CreateSkeletonError> {
        let mut ids = BTreeSet::new();
        for bone in &self.bones {
            if !ids.insert(bone.id) {
                return Err(CreateSkeletonError::DuplicateBoneId { id: bone.id });
            }
        }

        // Records are placed by id, so gaps would leave uninitialized records.
        if let Some(id) = (0..self.bones.len() as u32).find(|id| !ids.contains(id)) {
            return Err(CreateSkeletonError::MissingBoneId { id });
        }

        for bone in &self.bones {
            if let Some(parent) = bone.parent_id {
                if !ids.contains(&parent) {
                    return Err(CreateSkeletonError::MissingParent {
                        id: bone.id,
                        parent,
                    });
                }
            }
        }

        let bones = self
            .bones
            .iter()
            .map(|b| pmo_lib::ahi::Bone {
                id: b.id as i32,
                parent: b.parent_id.map(|p| p as i32).unwrap_or(-1),
                first_child: -1,
                next_sibling: -1,
                scale: b.scale.to_array(),
                translation: b.translation.to_array(),
                chain_id: b.chain_id,
                name: b.name.clone(),
            })
            .collect();

        Ok(Ahi::new(version, bones))
    }
}
