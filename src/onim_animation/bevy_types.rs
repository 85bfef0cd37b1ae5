// src/onim_animation/bevy_types.rs

use std::collections::HashMap;

use bevy::prelude::*;

use crate::onim::bone_tags::BoneTagMap;
use crate::onim::loader::{OadAsset, OnimAsset};

/// Host playback rate used to time imported keyframes, in frames per second.
#[derive(Resource, Debug, Clone, Copy)]
pub struct OnimPlaybackRate(pub f32);

impl Default for OnimPlaybackRate {
    fn default() -> Self {
        OnimPlaybackRate(30.0)
    }
}

/// Bone tag to bone name table applied to every import.
#[derive(Resource, Debug, Clone, Default)]
pub struct OnimBoneTags(pub BoneTagMap);

#[derive(Debug, Clone)]
pub enum OnimSource {
    Animation(Handle<OnimAsset>),
    Container(Handle<OadAsset>),
}

/// Put on an armature root to import animations onto the bones below it.
///
/// The bones' current `Transform`s are taken as the bind pose, so insert this
/// before anything poses the armature.
#[derive(Component, Debug, Clone)]
pub struct NeedsOnimImport(pub OnimSource);

/// Per-animation outcome of the last import on this entity.
#[derive(Component, Debug, Clone, Default)]
pub struct OnimImportReport {
    pub outcomes: Vec<(String, Result<String, String>)>,
}

impl OnimImportReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok().map(String::as_str))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e.as_str())))
    }
}

/// Graph nodes of the clips imported onto this entity, by animation name.
#[derive(Component, Debug, Clone, Default)]
pub struct OnimAnimations {
    pub nodes: HashMap<String, AnimationNodeIndex>,
}

/// Every imported clip, keyed by animation name.
#[derive(Resource, Debug, Default)]
pub struct OnimClipLibrary {
    clips: HashMap<String, Handle<AnimationClip>>,
    active: Option<String>,
}

impl OnimClipLibrary {
    pub fn get(&self, name: &str) -> Option<&Handle<AnimationClip>> {
        self.clips.get(name)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// The clip stored most recently.
    pub fn active(&self) -> Option<&Handle<AnimationClip>> {
        self.active.as_deref().and_then(|name| self.clips.get(name))
    }

    /// Stores `clip` under `name`. A clip already stored under that name is
    /// overwritten in place, so existing handles see the new content.
    pub fn store(
        &mut self,
        clips: &mut Assets<AnimationClip>,
        name: &str,
        clip: AnimationClip,
    ) -> Handle<AnimationClip> {
        self.active = Some(name.to_string());
        if let Some(handle) = self.clips.get(name) {
            if let Some(existing) = clips.get_mut(handle) {
                *existing = clip;
                return handle.clone();
            }
        }
        let handle = clips.add(clip);
        self.clips.insert(name.to_string(), handle.clone());
        handle
    }
}
