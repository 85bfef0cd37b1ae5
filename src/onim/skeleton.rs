use std::collections::HashMap;

use bevy::ecs::entity::Entity;
use bevy::log::warn;
use bevy::math::Mat4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneId(pub usize);

/// One bone as the host reports it.
#[derive(Debug, Clone, Copy)]
pub struct HostBone<'a> {
    pub name: &'a str,
    pub parent: Option<&'a str>,
    /// Bone space to armature space, in the bind pose.
    pub bind_matrix: Mat4,
}

/// The host armature the conversion reads its bind pose from.
pub trait BoneHierarchy {
    fn bones(&self) -> Vec<HostBone<'_>>;

    fn is_empty(&self) -> bool {
        self.bones().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BoneData {
    pub id: BoneId,
    pub name: String,
    pub parent: Option<BoneId>,
    pub children: Vec<BoneId>,
    pub bind_matrix: Mat4,
    pub entity: Option<Entity>,
}

#[derive(Default, Debug, Clone)]
pub struct Skeleton {
    pub bones: Vec<BoneData>,            // Arena storing all bone data
    name_to_id: HashMap<String, BoneId>, // Fast lookup of bone ID by name
    roots: Vec<BoneId>,                  // IDs of root bones
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bone. Parents must be added before their children; an unknown
    /// parent name makes the bone a root.
    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        parent_name: Option<&str>,
        bind_matrix: Mat4,
        entity: Option<Entity>,
    ) -> BoneId {
        let name = name.into();
        if let Some(existing) = self.name_to_id.get(&name) {
            warn!("Bone '{}' already exists, keeping the first one", name);
            return *existing;
        }

        let new_id = BoneId(self.bones.len());
        let parent_id = parent_name.and_then(|p_name| self.name_to_id.get(p_name).copied());
        if parent_name.is_some() && parent_id.is_none() {
            warn!("Parent of bone '{}' is unknown, treating it as a root", name);
        }

        self.bones.push(BoneData {
            id: new_id,
            name: name.clone(),
            parent: parent_id,
            children: Vec::new(),
            bind_matrix,
            entity,
        });
        self.name_to_id.insert(name, new_id);

        match parent_id {
            Some(p_id) => self.bones[p_id.0].children.push(new_id),
            None => self.roots.push(new_id),
        }
        new_id
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn get_bone_by_id(&self, id: BoneId) -> Option<&BoneData> {
        self.bones.get(id.0)
    }

    pub fn get_bone_by_name(&self, name: &str) -> Option<&BoneData> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.get_bone_by_id(*id))
    }

    pub fn get_parent(&self, bone_id: BoneId) -> Option<&BoneData> {
        self.get_bone_by_id(bone_id)
            .and_then(|b| b.parent)
            .and_then(|p_id| self.get_bone_by_id(p_id))
    }

    pub fn get_roots(&self) -> Vec<&BoneData> {
        self.roots
            .iter()
            .filter_map(|root_id| self.get_bone_by_id(*root_id))
            .collect()
    }
}

impl BoneHierarchy for Skeleton {
    fn bones(&self) -> Vec<HostBone<'_>> {
        self.bones
            .iter()
            .map(|bone| HostBone {
                name: &bone.name,
                parent: self.get_parent(bone.id).map(|p| p.name.as_str()),
                bind_matrix: bone.bind_matrix,
            })
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}
