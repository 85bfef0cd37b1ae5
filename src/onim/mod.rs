// src/onim/mod.rs

pub mod bind_pose;
pub mod bone_tags;
pub mod convert;
pub mod error;
pub mod frames;
pub mod import;
pub mod loader;
pub mod parser;
pub mod skeleton;
pub mod tracks;
pub mod types;
