// src/onim_animation/clip_builder.rs

use bevy::prelude::*;
use bevy_animation::animatable::Animatable;
use bevy_animation::animation_curves::{AnimatableCurve, AnimatableKeyframeCurve};
use bevy_animation::{AnimationTargetId, animated_field};

use crate::onim::bind_pose::BindPose;
use crate::onim::tracks::{TrackSet, TrackTarget};

/// Builds a keyframe curve. A lone keyframe is held for `hold` seconds, since
/// keyframe curves need two distinct sample times.
pub fn make_bevy_curve<T: Animatable + Copy>(
    keyframes: &[(f32, T)],
    hold: f32,
) -> Option<AnimatableKeyframeCurve<T>> {
    match keyframes {
        [] => None,
        [(time, value)] => {
            AnimatableKeyframeCurve::new([(*time, *value), (*time + hold, *value)]).ok()
        }
        _ => AnimatableKeyframeCurve::new(keyframes.iter().copied()).ok(),
    }
}

/// Animation target id of a bone, matching the `AnimationTarget` put on it.
pub fn bone_target_id(bone: &str) -> AnimationTargetId {
    AnimationTargetId::from_name(&Name::new(bone.to_string()))
}

fn to_vec3(values: &[f32]) -> Option<Vec3> {
    match values {
        [x, y, z] => Some(Vec3::new(*x, *y, *z)),
        _ => None,
    }
}

// Tracks store quaternions as (w, x, y, z).
fn to_quat(values: &[f32]) -> Option<Quat> {
    match values {
        [w, x, y, z] => Some(Quat::from_xyzw(*x, *y, *z, *w).normalize()),
        _ => None,
    }
}

/// Converts a track set into an `AnimationClip`.
///
/// Track times are host frames and become seconds at `frame_rate`. Bevy's
/// `Transform` is parent-relative, so bone values are composed back onto the
/// bind pose (`bind * pose`). Root tracks drive the entity named `root`.
pub fn build_clip(
    tracks: &TrackSet,
    bind_pose: &BindPose,
    root: &Name,
    frame_rate: f32,
) -> AnimationClip {
    let mut clip = AnimationClip::default();
    let hold = if tracks.frame_length > 0.0 {
        tracks.frame_length / frame_rate
    } else {
        1.0 / frame_rate
    };

    for target in tracks.targets() {
        let samples = tracks.samples(target);
        let seconds = |t: f32| t / frame_rate;

        match target {
            TrackTarget::BoneTranslation(bone) | TrackTarget::BoneRotation(bone) => {
                let Ok(bind) = bind_pose.get(bone) else {
                    warn!("No bind pose for bone '{}', skipping {}", bone, target);
                    continue;
                };
                let target_id = bone_target_id(bone);
                if matches!(target, TrackTarget::BoneTranslation(_)) {
                    let keys: Vec<(f32, Vec3)> = samples
                        .iter()
                        .filter_map(|(t, v)| {
                            to_vec3(v).map(|pose| {
                                (seconds(*t), bind.translation + bind.rotation * pose)
                            })
                        })
                        .collect();
                    if let Some(curve) = make_bevy_curve(&keys, hold) {
                        clip.add_curve_to_target(
                            target_id,
                            AnimatableCurve::new(animated_field!(Transform::translation), curve),
                        );
                    }
                } else {
                    let keys: Vec<(f32, Quat)> = samples
                        .iter()
                        .filter_map(|(t, v)| {
                            to_quat(v).map(|pose| (seconds(*t), (bind.rotation * pose).normalize()))
                        })
                        .collect();
                    if let Some(curve) = make_bevy_curve(&keys, hold) {
                        clip.add_curve_to_target(
                            target_id,
                            AnimatableCurve::new(animated_field!(Transform::rotation), curve),
                        );
                    }
                }
            }
            TrackTarget::RootTranslation => {
                let keys: Vec<(f32, Vec3)> = samples
                    .iter()
                    .filter_map(|(t, v)| to_vec3(v).map(|pos| (seconds(*t), pos)))
                    .collect();
                if let Some(curve) = make_bevy_curve(&keys, hold) {
                    clip.add_curve_to_target(
                        AnimationTargetId::from_name(root),
                        AnimatableCurve::new(animated_field!(Transform::translation), curve),
                    );
                }
            }
            TrackTarget::RootRotation => {
                let keys: Vec<(f32, Quat)> = samples
                    .iter()
                    .filter_map(|(t, v)| to_quat(v).map(|rot| (seconds(*t), rot)))
                    .collect();
                if let Some(curve) = make_bevy_curve(&keys, hold) {
                    clip.add_curve_to_target(
                        AnimationTargetId::from_name(root),
                        AnimatableCurve::new(animated_field!(Transform::rotation), curve),
                    );
                }
            }
        }
    }
    clip
}
