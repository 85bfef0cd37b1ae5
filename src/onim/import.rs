//! Drives `.onim` and `.oad` files through the import pipeline.
//!
//! A single animation goes through the stages of [`ImportStage`] in order.
//! Failing any stage abandons the file before anything reaches the host, so a
//! file either registers all of its tracks or none. Containers import their
//! references one after another and collect each outcome.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use bevy::log::{debug, info, warn};

use crate::onim::bind_pose::BindPose;
use crate::onim::bone_tags::BoneTagMap;
use crate::onim::convert;
use crate::onim::error::{ImportError, Result};
use crate::onim::frames;
use crate::onim::skeleton::BoneHierarchy;
use crate::onim::tracks::{AnimationHost, KeyframeTrackBuilder, TrackSet, TrackTarget};
use crate::onim::types::{ChannelSamples, ChannelTarget, OadDocument, OnimDocument};

/// Pipeline stages, named after the state reached on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Read,
    Parsed,
    BindPoseResolved,
    TimingComputed,
    ChannelsDecoded,
    TracksBuilt,
    Delivered,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportStage::Read => "reading",
            ImportStage::Parsed => "parsing",
            ImportStage::BindPoseResolved => "bind pose resolution",
            ImportStage::TimingComputed => "timing",
            ImportStage::ChannelsDecoded => "channel decoding",
            ImportStage::TracksBuilt => "track building",
            ImportStage::Delivered => "delivery",
        };
        f.write_str(name)
    }
}

/// Result of one `crAnimation` reference of a container.
#[derive(Debug)]
pub struct ContainerOutcome {
    pub reference: String,
    pub path: PathBuf,
    /// Name the animation was registered under.
    pub result: Result<String>,
}

#[derive(Debug)]
pub enum ImportOutcome {
    Animation(String),
    Container(Vec<ContainerOutcome>),
}

/// Animation name used for registration: the file name with its extension.
pub fn animation_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs timing, decoding and track building for an already parsed document.
/// `source` is only used to label errors.
pub fn convert_document(
    source: &Path,
    name: &str,
    document: &OnimDocument,
    bind_pose: &BindPose,
    bone_tags: &BoneTagMap,
    frame_rate: f32,
) -> Result<TrackSet> {
    let mut builder = KeyframeTrackBuilder::new(document.frames, document.duration, frame_rate)
        .map_err(|e| e.in_file(source, ImportStage::TimingComputed))?;
    debug!(
        "{}: {} frames over {}s, frame length {}",
        name,
        document.frames,
        document.duration,
        builder.frame_length()
    );

    let decoded = document
        .channels()
        .map(|(target, data)| frames::decode(data).map(|samples| (target, samples)))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| e.in_file(source, ImportStage::ChannelsDecoded))?;

    for (target, samples) in &decoded {
        add_converted(&mut builder, target, samples, bind_pose, bone_tags)
            .map_err(|e| e.in_file(source, ImportStage::TracksBuilt))?;
    }
    Ok(builder.finish(name))
}

fn add_converted(
    builder: &mut KeyframeTrackBuilder,
    target: &ChannelTarget,
    samples: &ChannelSamples,
    bind_pose: &BindPose,
    bone_tags: &BoneTagMap,
) -> Result<()> {
    match target {
        ChannelTarget::BonePosition(bone) => {
            let bone_name = bone_tags.resolve(bone);
            let values = convert::convert_bone_positions(samples, bind_pose.get(&bone_name)?)?;
            builder.add_channel(TrackTarget::BoneTranslation(bone_name), &values)
        }
        ChannelTarget::BoneRotation(bone) => {
            let bone_name = bone_tags.resolve(bone);
            let values = convert::convert_bone_rotations(samples, bind_pose.get(&bone_name)?)?;
            builder.add_channel(TrackTarget::BoneRotation(bone_name), &values)
        }
        ChannelTarget::ModelPosition => {
            let values = convert::convert_model_positions(samples)?;
            builder.add_channel(TrackTarget::RootTranslation, &values)
        }
        ChannelTarget::ModelRotation => {
            let values = convert::convert_model_rotations(samples)?;
            builder.add_channel(TrackTarget::RootRotation, &values)
        }
    }
}

/// Imports animation files onto one target skeleton.
pub struct Importer<'a, S: BoneHierarchy> {
    skeleton: &'a S,
    bone_tags: BoneTagMap,
}

impl<'a, S: BoneHierarchy> Importer<'a, S> {
    pub fn new(skeleton: &'a S) -> Self {
        Self {
            skeleton,
            bone_tags: BoneTagMap::default(),
        }
    }

    pub fn with_bone_tags(mut self, bone_tags: BoneTagMap) -> Self {
        self.bone_tags = bone_tags;
        self
    }

    fn check_target(&self) -> Result<()> {
        if self.skeleton.is_empty() {
            return Err(ImportError::UnsupportedTarget(
                "target skeleton has no bones".to_string(),
            ));
        }
        Ok(())
    }

    /// Converts one `.onim` file and registers its tracks with `host`.
    /// Returns the registered animation name.
    pub fn import_animation_file(
        &self,
        path: &Path,
        host: &mut impl AnimationHost,
    ) -> Result<String> {
        self.check_target()?;
        let name = animation_name(path);

        let text = fs::read_to_string(path)
            .map_err(|e| ImportError::from(e).in_file(path, ImportStage::Read))?;
        let document =
            OnimDocument::from_text(&text).map_err(|e| e.in_file(path, ImportStage::Parsed))?;
        let bind_pose = BindPose::resolve(self.skeleton);
        let tracks = convert_document(
            path,
            &name,
            &document,
            &bind_pose,
            &self.bone_tags,
            host.frame_rate(),
        )?;

        host.register_tracks(tracks);
        info!("Imported animation '{}' from {}", name, path.display());
        Ok(name)
    }

    /// Imports every animation an `.oad` container references. Only failures
    /// to read the container itself are returned as errors.
    pub fn import_container_file(
        &self,
        path: &Path,
        host: &mut impl AnimationHost,
    ) -> Result<Vec<ContainerOutcome>> {
        self.check_target()?;
        let text = fs::read_to_string(path)
            .map_err(|e| ImportError::from(e).in_file(path, ImportStage::Read))?;
        let container =
            OadDocument::from_text(&text).map_err(|e| e.in_file(path, ImportStage::Parsed))?;

        let container_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let outcomes: Vec<ContainerOutcome> = container
            .references
            .iter()
            .zip(container.resolved_paths(container_dir))
            .map(|(reference, anim_path)| {
                let result = self.import_animation_file(&anim_path, host);
                if let Err(e) = &result {
                    warn!("Skipping '{}' from {}: {}", reference, path.display(), e);
                }
                ContainerOutcome {
                    reference: reference.clone(),
                    path: anim_path,
                    result,
                }
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(
            "Imported {} of {} animations from {}",
            outcomes.len() - failed,
            outcomes.len(),
            path.display()
        );
        Ok(outcomes)
    }

    /// Picks the pipeline from the file extension (`.onim` or `.oad`).
    pub fn import_file(
        &self,
        path: &Path,
        host: &mut impl AnimationHost,
    ) -> Result<ImportOutcome> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("onim") => self.import_animation_file(path, host).map(ImportOutcome::Animation),
            Some("oad") => self.import_container_file(path, host).map(ImportOutcome::Container),
            _ => Err(ImportError::UnsupportedFileType(path.to_path_buf())),
        }
    }
}

/// Imports one `.onim` file with unmapped bone tags.
pub fn import_animation_file(
    path: &Path,
    skeleton: &impl BoneHierarchy,
    host: &mut impl AnimationHost,
) -> Result<String> {
    Importer::new(skeleton).import_animation_file(path, host)
}

/// Imports every animation of an `.oad` container with unmapped bone tags.
pub fn import_container_file(
    path: &Path,
    skeleton: &impl BoneHierarchy,
    host: &mut impl AnimationHost,
) -> Result<Vec<ContainerOutcome>> {
    Importer::new(skeleton).import_container_file(path, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onim::skeleton::Skeleton;
    use bevy::math::{Mat4, Quat, Vec3};

    const WALK: &str = "Version 8 2
{
  Frames 2
  Duration 0.5
  Animation
  {
    BonePosition 0 1
    {
      FramesData MultiChannel
      {
        channel
        {
          1
          2
        }
        channel Static
        {
          0
        }
        channel Static
        {
          0
        }
      }
    }
    AudioEvent
    {
      Event 0 123
    }
    BoneRotation 0 Spine
    {
      FramesData SingleChannel Static
      {
        0 0 0 1
      }
    }
  }
}
";

    fn skeleton() -> Skeleton {
        let mut skeleton = Skeleton::new();
        skeleton.add_bone("root", None, Mat4::IDENTITY, None);
        skeleton.add_bone(
            "Pelvis",
            Some("root"),
            Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            None,
        );
        skeleton.add_bone(
            "Spine",
            Some("Pelvis"),
            Mat4::from_rotation_translation(Quat::from_rotation_z(0.5), Vec3::new(1.0, 1.0, 0.0)),
            None,
        );
        skeleton
    }

    fn convert(text: &str, tags: &BoneTagMap) -> Result<TrackSet> {
        let doc = OnimDocument::from_text(text)?;
        let pose = BindPose::resolve(&skeleton());
        convert_document(Path::new("walk.onim"), "walk.onim", &doc, &pose, tags, 30.0)
    }

    #[test]
    fn converts_channels_relative_to_bind_pose() {
        let tags: BoneTagMap = [(1, "Pelvis")].into_iter().collect();
        let set = convert(WALK, &tags).unwrap();
        assert_eq!(set.frame_count, 2);
        assert!((set.frame_length - 7.5).abs() < 1e-5);

        // Pelvis rests at x=1, so the first frame sits on the bind pose.
        let pelvis = set.samples(&TrackTarget::BoneTranslation("Pelvis".into()));
        assert_eq!(pelvis.len(), 2);
        assert!(Vec3::from_slice(&pelvis[0].1).abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(Vec3::from_slice(&pelvis[1].1).abs_diff_eq(Vec3::X, 1e-5));

        // Spine's identity source rotation cancels its local bind rotation.
        let spine = set.samples(&TrackTarget::BoneRotation("Spine".into()));
        assert_eq!(spine.len(), 2);
        let [w, x, y, z] = [spine[0].1[0], spine[0].1[1], spine[0].1[2], spine[0].1[3]];
        let expected = Quat::from_rotation_z(0.5).inverse();
        assert!(Quat::from_xyzw(x, y, z, w).abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn unmapped_bone_is_missing() {
        let err = convert(WALK, &BoneTagMap::default()).unwrap_err();
        assert!(matches!(err.root_cause(), ImportError::MissingBone(name) if name == "1"));
        assert!(matches!(
            err,
            ImportError::InFile {
                stage: ImportStage::TracksBuilt,
                ..
            }
        ));
    }

    #[test]
    fn zero_duration_with_several_samples_is_invalid_timing() {
        let text = "Version 8 2
{
  Frames 1
  Duration 0
  Animation
  {
    ModelPosition 0
    {
      FramesData MultiChannel
      {
        channel
        {
          0
          1
          2
        }
        channel Static
        {
          0
        }
        channel Static
        {
          0
        }
      }
    }
  }
}
";
        let err = convert(text, &BoneTagMap::default()).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InFile {
                stage: ImportStage::TracksBuilt,
                ..
            }
        ));
        assert!(matches!(
            err.root_cause(),
            ImportError::InvalidTiming { frames: 3, .. }
        ));
    }

    #[test]
    fn empty_skeleton_is_rejected_before_reading() {
        let skeleton = Skeleton::new();
        let mut host = crate::onim::tracks::TrackLibrary::default();
        let err = import_animation_file(Path::new("does/not/exist.onim"), &skeleton, &mut host)
            .unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedTarget(_)));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let skeleton = skeleton();
        let mut host = crate::onim::tracks::TrackLibrary::default();
        let err = Importer::new(&skeleton)
            .import_file(Path::new("walk.wav"), &mut host)
            .unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFileType(_)));
    }
}
