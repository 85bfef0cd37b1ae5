//! Conversion of source-space samples into bind-pose-relative host values.
//!
//! The host composes a pose bone as `bind * pose`. Files store the final
//! parent-relative transform, so bone channels are solved for `pose` here.
//! Rotations come out in the host's `(w, x, y, z)` component order.

use bevy::math::{Quat, Vec3};

use crate::onim::bind_pose::BindPoseEntry;
use crate::onim::error::Result;
use crate::onim::types::ChannelSamples;

/// `(x, y, z, w)` source order to `(w, x, y, z)` host order.
pub fn reorder_quaternion(sample: [f32; 4]) -> [f32; 4] {
    let [x, y, z, w] = sample;
    [w, x, y, z]
}

fn quat_from_host(wxyz: [f32; 4]) -> Quat {
    let [w, x, y, z] = wxyz;
    Quat::from_xyzw(x, y, z, w)
}

pub fn quat_to_host(q: Quat) -> [f32; 4] {
    [q.w, q.x, q.y, q.z]
}

fn vec3_samples(samples: &ChannelSamples) -> Result<Vec<Vec3>> {
    samples.require_arity(3)?;
    Ok(samples.frames().iter().map(|f| Vec3::new(f[0], f[1], f[2])).collect())
}

fn quat_samples(samples: &ChannelSamples) -> Result<Vec<[f32; 4]>> {
    samples.require_arity(4)?;
    Ok(samples
        .frames()
        .iter()
        .map(|f| reorder_quaternion([f[0], f[1], f[2], f[3]]))
        .collect())
}

pub fn convert_bone_positions(
    samples: &ChannelSamples,
    bind: &BindPoseEntry,
) -> Result<Vec<[f32; 3]>> {
    let bind_rot_inv = bind.rotation.inverse();
    Ok(vec3_samples(samples)?
        .into_iter()
        .map(|v| (bind_rot_inv * (v - bind.translation)).to_array())
        .collect())
}

pub fn convert_bone_rotations(
    samples: &ChannelSamples,
    bind: &BindPoseEntry,
) -> Result<Vec<[f32; 4]>> {
    let bind_rot_inv = bind.rotation.inverse();
    Ok(quat_samples(samples)?
        .into_iter()
        .map(|wxyz| quat_to_host(bind_rot_inv * quat_from_host(wxyz)))
        .collect())
}

// TODO: model-level channels are untested against game reference output;
// verify whether the root position also needs bind-pose cancellation.
pub fn convert_model_positions(samples: &ChannelSamples) -> Result<Vec<[f32; 3]>> {
    Ok(vec3_samples(samples)?.into_iter().map(|v| v.to_array()).collect())
}

pub fn convert_model_rotations(samples: &ChannelSamples) -> Result<Vec<[f32; 4]>> {
    quat_samples(samples)
}
