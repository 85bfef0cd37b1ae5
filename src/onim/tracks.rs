// src/onim/tracks.rs

use std::fmt;

use bevy::log::{debug, warn};

use crate::onim::error::{ImportError, Result};

/// The animatable attribute a track drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackTarget {
    BoneTranslation(String),
    BoneRotation(String),
    RootTranslation,
    RootRotation,
}

impl TrackTarget {
    /// Group the host files this target's tracks under.
    pub fn group_name(&self) -> &str {
        match self {
            TrackTarget::BoneTranslation(bone) | TrackTarget::BoneRotation(bone) => bone.as_str(),
            TrackTarget::RootTranslation => "Location",
            TrackTarget::RootRotation => "Rotation",
        }
    }

    pub fn bone(&self) -> Option<&str> {
        match self {
            TrackTarget::BoneTranslation(bone) | TrackTarget::BoneRotation(bone) => {
                Some(bone.as_str())
            }
            TrackTarget::RootTranslation | TrackTarget::RootRotation => None,
        }
    }
}

impl fmt::Display for TrackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackTarget::BoneTranslation(bone) => write!(f, "bones/{}/translation", bone),
            TrackTarget::BoneRotation(bone) => write!(f, "bones/{}/rotation", bone),
            TrackTarget::RootTranslation => f.write_str("translation"),
            TrackTarget::RootRotation => f.write_str("rotation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    /// In host frames.
    pub time: f32,
    pub value: f32,
}

/// Keyframes for one scalar component of a target.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack {
    pub target: TrackTarget,
    pub component: usize,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackGroup {
    pub name: String,
    pub tracks: Vec<KeyframeTrack>,
}

/// Every track produced by one animation import.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSet {
    pub name: String,
    pub frame_count: usize,
    pub frame_length: f32,
    pub groups: Vec<TrackGroup>,
}

impl TrackSet {
    pub fn tracks(&self) -> impl Iterator<Item = &KeyframeTrack> {
        self.groups.iter().flat_map(|g| g.tracks.iter())
    }

    pub fn track(&self, target: &TrackTarget, component: usize) -> Option<&KeyframeTrack> {
        self.tracks()
            .find(|t| &t.target == target && t.component == component)
    }

    pub fn group(&self, name: &str) -> Option<&TrackGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Targets in first-seen order, each listed once.
    pub fn targets(&self) -> Vec<&TrackTarget> {
        let mut targets: Vec<&TrackTarget> = Vec::new();
        for track in self.tracks() {
            if !targets.contains(&&track.target) {
                targets.push(&track.target);
            }
        }
        targets
    }

    /// Values of every component of `target` at each keyframe, component-ordered.
    pub fn samples(&self, target: &TrackTarget) -> Vec<(f32, Vec<f32>)> {
        let mut components: Vec<&KeyframeTrack> =
            self.tracks().filter(|t| &t.target == target).collect();
        components.sort_by_key(|t| t.component);
        let Some(first) = components.first() else {
            return Vec::new();
        };
        (0..first.keyframes.len())
            .map(|i| {
                let values = components
                    .iter()
                    .filter_map(|t| t.keyframes.get(i).map(|k| k.value))
                    .collect();
                (first.keyframes[i].time, values)
            })
            .collect()
    }

    /// Time of the last keyframe, in host frames.
    pub fn end_time(&self) -> f32 {
        self.tracks()
            .filter_map(|t| t.keyframes.last())
            .map(|k| k.time)
            .fold(0.0, f32::max)
    }
}

/// Time of one source frame in host frames.
pub fn frame_length(frame_count: u32, duration: f32, frame_rate: f32) -> Result<f32> {
    let length = duration * frame_rate / frame_count as f32;
    if frame_count == 0 || !length.is_finite() || (length <= 0.0 && frame_count > 1) {
        return Err(ImportError::InvalidTiming {
            frames: frame_count,
            duration,
            frame_rate,
        });
    }
    Ok(length)
}

/// Lays converted samples out on the host timeline.
#[derive(Debug)]
pub struct KeyframeTrackBuilder {
    frame_count: usize,
    frame_length: f32,
    duration: f32,
    frame_rate: f32,
    groups: Vec<TrackGroup>,
}

impl KeyframeTrackBuilder {
    pub fn new(frame_count: u32, duration: f32, frame_rate: f32) -> Result<Self> {
        Ok(Self {
            frame_count: frame_count as usize,
            frame_length: frame_length(frame_count, duration, frame_rate)?,
            duration,
            frame_rate,
            groups: Vec::new(),
        })
    }

    pub fn frame_length(&self) -> f32 {
        self.frame_length
    }

    pub fn time_of(&self, frame: usize) -> f32 {
        frame as f32 * self.frame_length
    }

    /// Adds one track per component of `values`. A single sample is held for
    /// the whole animation.
    ///
    /// Key times must increase strictly, so more than one key on a zero
    /// frame length is `InvalidTiming`.
    pub fn add_channel<const N: usize>(
        &mut self,
        target: TrackTarget,
        values: &[[f32; N]],
    ) -> Result<()> {
        if values.is_empty() {
            warn!("{} has no samples, no tracks added", target);
            return Ok(());
        }
        let frames = if values.len() == 1 {
            self.frame_count
        } else {
            if values.len() != self.frame_count {
                warn!(
                    "{} has {} samples but the animation declares {} frames",
                    target,
                    values.len(),
                    self.frame_count
                );
            }
            values.len()
        };
        if frames > 1 && self.frame_length <= 0.0 {
            return Err(ImportError::InvalidTiming {
                frames: frames as u32,
                duration: self.duration,
                frame_rate: self.frame_rate,
            });
        }

        let frame_length = self.frame_length;
        let tracks: Vec<KeyframeTrack> = (0..N)
            .map(|component| KeyframeTrack {
                target: target.clone(),
                component,
                keyframes: (0..frames)
                    .map(|i| Keyframe {
                        time: i as f32 * frame_length,
                        value: values[i.min(values.len() - 1)][component],
                    })
                    .collect(),
            })
            .collect();

        let group_name = target.group_name();
        match self.groups.iter_mut().find(|g| g.name == group_name) {
            Some(group) => group.tracks.extend(tracks),
            None => {
                let group = TrackGroup {
                    name: group_name.to_string(),
                    tracks,
                };
                self.groups.push(group);
            }
        }
        Ok(())
    }

    pub fn finish(self, name: impl Into<String>) -> TrackSet {
        let set = TrackSet {
            name: name.into(),
            frame_count: self.frame_count,
            frame_length: self.frame_length,
            groups: self.groups,
        };
        debug!(
            "built {} tracks in {} groups for '{}'",
            set.tracks().count(),
            set.groups.len(),
            set.name
        );
        set
    }
}

/// Track storage and timing provided by the animation host.
pub trait AnimationHost {
    /// Playback rate in host frames per second.
    fn frame_rate(&self) -> f32;

    /// Stores `tracks` under their name, replacing any set already stored
    /// under that name.
    fn register_tracks(&mut self, tracks: TrackSet);
}

/// In-memory host keeping registered track sets by name.
#[derive(Debug, Clone)]
pub struct TrackLibrary {
    frame_rate: f32,
    sets: Vec<TrackSet>,
    active: Option<String>,
}

impl TrackLibrary {
    pub fn new(frame_rate: f32) -> Self {
        Self {
            frame_rate,
            sets: Vec::new(),
            active: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&TrackSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.iter().map(|s| s.name.as_str())
    }

    /// The most recently registered set.
    pub fn active(&self) -> Option<&TrackSet> {
        self.active.as_deref().and_then(|name| self.get(name))
    }
}

impl Default for TrackLibrary {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl AnimationHost for TrackLibrary {
    fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    fn register_tracks(&mut self, tracks: TrackSet) {
        self.active = Some(tracks.name.clone());
        match self.sets.iter_mut().find(|s| s.name == tracks.name) {
            Some(existing) => *existing = tracks,
            None => self.sets.push(tracks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_length_scales_to_host_rate() {
        assert_eq!(frame_length(10, 1.0, 30.0).unwrap(), 3.0);
        let builder = KeyframeTrackBuilder::new(10, 1.0, 30.0).unwrap();
        assert_eq!(builder.time_of(5), 15.0);
    }

    #[test]
    fn invalid_timing_is_rejected() {
        assert!(frame_length(0, 1.0, 30.0).is_err());
        assert!(frame_length(10, 0.0, 30.0).is_err());
        assert!(frame_length(10, 1.0, f32::NAN).is_err());
    }

    #[test]
    fn zero_frame_length_rejects_extra_samples() {
        // Frames 1, Duration 0: a lone sample is fine, three would share t=0.
        let mut builder = KeyframeTrackBuilder::new(1, 0.0, 30.0).unwrap();
        assert_eq!(builder.frame_length(), 0.0);
        builder
            .add_channel(TrackTarget::RootTranslation, &[[0.0, 0.0, 0.0]])
            .unwrap();

        let target = TrackTarget::BoneTranslation("Pelvis".into());
        let values = [[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0]];
        let err = builder.add_channel(target.clone(), &values).unwrap_err();
        assert!(matches!(err, ImportError::InvalidTiming { frames: 3, .. }));

        let set = builder.finish("pose.onim");
        assert!(set.track(&target, 0).is_none());
    }

    #[test]
    fn one_track_per_component() {
        let mut builder = KeyframeTrackBuilder::new(3, 0.1, 30.0).unwrap();
        let target = TrackTarget::BoneTranslation("Pelvis".into());
        let values = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        builder.add_channel(target.clone(), &values).unwrap();
        let set = builder.finish("walk.onim");

        assert_eq!(set.groups.len(), 1);
        assert_eq!(set.groups[0].name, "Pelvis");
        assert_eq!(set.tracks().count(), 3);
        let y = set.track(&target, 1).unwrap();
        let times: Vec<f32> = y.keyframes.iter().map(|k| k.time).collect();
        let values: Vec<f32> = y.keyframes.iter().map(|k| k.value).collect();
        assert_eq!(values, vec![2.0, 5.0, 8.0]);
        assert!((times[1] - 1.0).abs() < 1e-5 && (times[2] - 2.0).abs() < 1e-5);
        assert_eq!(times[0], 0.0);
    }

    #[test]
    fn single_sample_is_held_for_every_frame() {
        let mut builder = KeyframeTrackBuilder::new(4, 1.0, 24.0).unwrap();
        let target = TrackTarget::RootRotation;
        builder.add_channel(target.clone(), &[[1.0, 0.0, 0.0, 0.0]]).unwrap();
        let set = builder.finish("idle");
        let w = set.track(&target, 0).unwrap();
        assert_eq!(w.keyframes.len(), 4);
        assert!(w.keyframes.iter().all(|k| k.value == 1.0));
        assert_eq!(set.groups[0].name, "Rotation");
    }

    #[test]
    fn targets_of_one_bone_share_a_group() {
        let mut builder = KeyframeTrackBuilder::new(1, 1.0, 30.0).unwrap();
        builder
            .add_channel(TrackTarget::BoneTranslation("Head".into()), &[[0.0; 3]])
            .unwrap();
        builder
            .add_channel(TrackTarget::BoneRotation("Head".into()), &[[1.0, 0.0, 0.0, 0.0]])
            .unwrap();
        let set = builder.finish("nod");
        assert_eq!(set.groups.len(), 1);
        assert_eq!(set.group("Head").unwrap().tracks.len(), 7);
        assert_eq!(set.targets().len(), 2);
        let rot = set.samples(&TrackTarget::BoneRotation("Head".into()));
        assert_eq!(rot, vec![(0.0, vec![1.0, 0.0, 0.0, 0.0])]);
    }

    #[test]
    fn library_replaces_same_name() {
        let mut library = TrackLibrary::new(30.0);
        let mut first = KeyframeTrackBuilder::new(1, 1.0, 30.0).unwrap();
        first.add_channel(TrackTarget::RootTranslation, &[[1.0, 1.0, 1.0]]).unwrap();
        library.register_tracks(first.finish("a.onim"));

        let mut second = KeyframeTrackBuilder::new(1, 1.0, 30.0).unwrap();
        second.add_channel(TrackTarget::RootTranslation, &[[2.0, 2.0, 2.0]]).unwrap();
        library.register_tracks(second.finish("a.onim"));

        assert_eq!(library.len(), 1);
        let stored = library.get("a.onim").unwrap();
        let x = stored.track(&TrackTarget::RootTranslation, 0).unwrap();
        assert_eq!(x.keyframes[0].value, 2.0);
        assert_eq!(library.active().map(|s| s.name.as_str()), Some("a.onim"));
    }
}
