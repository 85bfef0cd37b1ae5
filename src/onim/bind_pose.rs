// src/onim/bind_pose.rs

use std::collections::HashMap;

use bevy::log::debug;
use bevy::math::{Quat, Vec3};

use crate::onim::error::{ImportError, Result};
use crate::onim::skeleton::BoneHierarchy;

/// A bone's rest transform relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindPoseEntry {
    pub translation: Vec3,
    pub rotation: Quat,
}

/// Parent-relative rest transforms of every bone, computed once per import.
#[derive(Debug, Clone, Default)]
pub struct BindPose {
    entries: HashMap<String, BindPoseEntry>,
}

impl BindPose {
    pub fn resolve(hierarchy: &impl BoneHierarchy) -> Self {
        let bones = hierarchy.bones();
        let matrices: HashMap<&str, _> = bones.iter().map(|b| (b.name, b.bind_matrix)).collect();

        let entries = bones
            .iter()
            .map(|bone| {
                // Cancel the parent to get relative to parent
                let local = match bone.parent.and_then(|p| matrices.get(p)) {
                    Some(parent) => parent.inverse() * bone.bind_matrix,
                    None => bone.bind_matrix,
                };
                // Bind poses carry no scale; it is dropped here.
                let (_scale, rotation, translation) = local.to_scale_rotation_translation();
                (
                    bone.name.to_string(),
                    BindPoseEntry {
                        translation,
                        rotation: rotation.normalize(),
                    },
                )
            })
            .collect::<HashMap<_, _>>();
        debug!("resolved bind pose for {} bones", entries.len());
        BindPose { entries }
    }

    pub fn get(&self, bone: &str) -> Result<&BindPoseEntry> {
        self.entries
            .get(bone)
            .ok_or_else(|| ImportError::MissingBone(bone.to_string()))
    }

    pub fn contains(&self, bone: &str) -> bool {
        self.entries.contains_key(bone)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
