// src/onim_animation/mod.rs

pub mod animation_setup_system;
pub mod bevy_types;
pub mod clip_builder;

pub use animation_setup_system::{
    ClipStores, import_onim_animations, import_onto_armature, skeleton_from_hierarchy,
};
pub use bevy_types::{
    NeedsOnimImport, OnimAnimations, OnimBoneTags, OnimClipLibrary, OnimImportReport,
    OnimPlaybackRate, OnimSource,
};
pub use clip_builder::build_clip;
