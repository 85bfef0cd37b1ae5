//! This module defines the typed data interpreted from parsed documents.

pub mod document;
pub mod samples;

pub use document::{
    AnimatedChannels, AnimationEntry, BoneRef, ChannelTarget, FramesData, OadDocument,
    OnimDocument, normalize_reference,
};
pub use samples::ChannelSamples;
