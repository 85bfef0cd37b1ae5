// src/onim_animation/animation_setup_system.rs

use std::collections::{HashMap, HashSet};
use std::path::Path;

use bevy::asset::{LoadState, RecursiveDependencyLoadState};
use bevy::prelude::*;
use bevy_animation::{AnimationTarget, AnimationTargetId};

use crate::onim::bind_pose::BindPose;
use crate::onim::bone_tags::BoneTagMap;
use crate::onim::error::ImportError;
use crate::onim::import::convert_document;
use crate::onim::loader::{OadAsset, OnimAsset};
use crate::onim::skeleton::Skeleton;
use crate::onim::tracks::TrackTarget;

use super::bevy_types::{
    NeedsOnimImport, OnimAnimations, OnimBoneTags, OnimClipLibrary, OnimImportReport,
    OnimPlaybackRate, OnimSource,
};
use super::clip_builder::{bone_target_id, build_clip};

/// Collects the bones below `root` with their bind matrices in root space.
/// The root entity itself is the armature, not a bone.
pub fn skeleton_from_hierarchy(
    root: Entity,
    children_q: &Query<&Children>,
    bones_q: &Query<(&Name, &Transform)>,
) -> Skeleton {
    let mut skeleton = Skeleton::new();
    let mut stack: Vec<(Entity, Option<String>, Mat4)> = Vec::new();

    let push_children = |stack: &mut Vec<(Entity, Option<String>, Mat4)>,
                         entity: Entity,
                         parent: Option<String>,
                         matrix: Mat4| {
        if let Ok(children) = children_q.get(entity) {
            let children: &[Entity] = children;
            // Reverse so the first child is popped first.
            for &child in children.iter().rev() {
                stack.push((child, parent.clone(), matrix));
            }
        }
    };

    push_children(&mut stack, root, None, Mat4::IDENTITY);
    while let Some((entity, parent, parent_matrix)) = stack.pop() {
        let Ok((name, transform)) = bones_q.get(entity) else {
            continue;
        };
        let bind_matrix = parent_matrix * transform.compute_matrix();
        skeleton.add_bone(name.as_str(), parent.as_deref(), bind_matrix, Some(entity));
        push_children(&mut stack, entity, Some(name.as_str().to_string()), bind_matrix);
    }
    skeleton
}

/// Animations a pending import is waiting for. `None` while still loading.
fn ready_animations<'a>(
    source: &OnimSource,
    asset_server: &AssetServer,
    onim_assets: &'a Assets<OnimAsset>,
    oad_assets: &'a Assets<OadAsset>,
) -> Option<Vec<(String, Result<&'a OnimAsset, String>)>> {
    match source {
        OnimSource::Animation(handle) => {
            let path = handle.path().map(|p| p.to_string()).unwrap_or_default();
            match asset_server.load_state(handle.id()) {
                LoadState::Loaded => {
                    let asset = onim_assets
                        .get(handle)
                        .ok_or_else(|| "animation asset was unloaded".to_string());
                    let name = asset.as_ref().map(|a| a.name.clone()).unwrap_or(path);
                    Some(vec![(name, asset)])
                }
                LoadState::Failed(e) => Some(vec![(path, Err(e.to_string()))]),
                _ => None,
            }
        }
        OnimSource::Container(handle) => {
            match asset_server.recursive_dependency_load_state(handle.id()) {
                RecursiveDependencyLoadState::Loaded | RecursiveDependencyLoadState::Failed(_) => {}
                _ => return None,
            }
            let Some(container) = oad_assets.get(handle) else {
                let path = handle.path().map(|p| p.to_string()).unwrap_or_default();
                let reason = match asset_server.load_state(handle.id()) {
                    LoadState::Failed(e) => e.to_string(),
                    _ => "container asset was unloaded".to_string(),
                };
                return Some(vec![(path, Err(reason))]);
            };
            let animations = container
                .references
                .iter()
                .zip(&container.animations)
                .map(|(reference, anim)| {
                    let asset = onim_assets
                        .get(anim)
                        .ok_or_else(|| format!("failed to load '{}'", reference));
                    (reference.clone(), asset)
                })
                .collect();
            Some(animations)
        }
    }
}

/// Clip storage an import writes into.
pub struct ClipStores<'w> {
    pub library: &'w mut OnimClipLibrary,
    pub clips: &'w mut Assets<AnimationClip>,
    pub graphs: &'w mut Assets<AnimationGraph>,
}

/// Converts `animations` onto the bones of `skeleton` and sets `armature` up to
/// play them. Returns the per-animation outcomes.
#[allow(clippy::too_many_arguments)]
pub fn import_onto_armature(
    commands: &mut Commands,
    armature: Entity,
    root_name: &Name,
    skeleton: &Skeleton,
    animations: Vec<(String, Result<&OnimAsset, String>)>,
    frame_rate: f32,
    bone_tags: &BoneTagMap,
    mut stores: ClipStores<'_>,
) -> OnimImportReport {
    let mut report = OnimImportReport::default();
    if skeleton.is_empty() {
        let err = ImportError::UnsupportedTarget(format!("entity {} has no named bones", armature));
        error!("{}", err);
        for (reference, _) in animations {
            report.outcomes.push((reference, Err(err.to_string())));
        }
        return report;
    }
    let bind_pose = BindPose::resolve(skeleton);

    let mut imported: Vec<(String, Handle<AnimationClip>)> = Vec::new();
    let mut tagged: HashSet<Entity> = HashSet::new();

    for (reference, asset) in animations {
        let asset = match asset {
            Ok(asset) => asset,
            Err(reason) => {
                error!("Onim import on {}: {}", armature, reason);
                report.outcomes.push((reference, Err(reason)));
                continue;
            }
        };
        let tracks = match convert_document(
            Path::new(&asset.name),
            &asset.name,
            &asset.document,
            &bind_pose,
            bone_tags,
            frame_rate,
        ) {
            Ok(tracks) => tracks,
            Err(e) => {
                error!("Onim import on {}: {}", armature, e);
                report.outcomes.push((reference, Err(e.to_string())));
                continue;
            }
        };

        let clip = build_clip(&tracks, &bind_pose, root_name, frame_rate);
        let handle = stores.library.store(stores.clips, &tracks.name, clip);
        imported.push((tracks.name.clone(), handle));

        for target in tracks.targets() {
            let (target_entity, target_id) = match target {
                TrackTarget::BoneTranslation(bone) | TrackTarget::BoneRotation(bone) => {
                    let Some(bone_entity) = skeleton.get_bone_by_name(bone).and_then(|b| b.entity)
                    else {
                        continue;
                    };
                    (bone_entity, bone_target_id(bone))
                }
                TrackTarget::RootTranslation | TrackTarget::RootRotation => {
                    (armature, AnimationTargetId::from_name(root_name))
                }
            };
            if tagged.insert(target_entity) {
                commands.entity(target_entity).insert(AnimationTarget {
                    id: target_id,
                    player: armature,
                });
            }
        }
        info!("Imported '{}' onto {}", tracks.name, armature);
        report.outcomes.push((reference, Ok(tracks.name)));
    }

    if !imported.is_empty() {
        let clip_handles = imported.iter().map(|(_, h)| h.clone());
        let (graph, nodes) = AnimationGraph::from_clips(clip_handles);
        let nodes: HashMap<String, AnimationNodeIndex> = imported
            .into_iter()
            .map(|(name, _)| name)
            .zip(nodes)
            .collect();
        commands
            .entity(armature)
            .insert((AnimationGraphHandle(stores.graphs.add(graph)), OnimAnimations { nodes }))
            .insert_if_new(AnimationPlayer::default());
    }
    report
}

/// Imports animations onto every armature marked with [`NeedsOnimImport`]
/// once its assets have finished loading.
pub fn import_onim_animations(
    mut commands: Commands,
    pending_q: Query<(Entity, &NeedsOnimImport, Option<&Name>)>,
    children_q: Query<&Children>,
    bones_q: Query<(&Name, &Transform)>,
    asset_server: Res<AssetServer>,
    onim_assets: Res<Assets<OnimAsset>>,
    oad_assets: Res<Assets<OadAsset>>,
    playback_rate: Res<OnimPlaybackRate>,
    bone_tags: Res<OnimBoneTags>,
    mut library: ResMut<OnimClipLibrary>,
    mut clips: ResMut<Assets<AnimationClip>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
) {
    for (entity, needs_import, root_name) in pending_q.iter() {
        let Some(animations) =
            ready_animations(&needs_import.0, &asset_server, &onim_assets, &oad_assets)
        else {
            continue;
        };
        commands.entity(entity).remove::<NeedsOnimImport>();

        let skeleton = skeleton_from_hierarchy(entity, &children_q, &bones_q);
        let root_name = root_name.cloned().unwrap_or_else(|| Name::new(entity.to_string()));
        let stores = ClipStores {
            library: &mut library,
            clips: &mut clips,
            graphs: &mut graphs,
        };
        let report = import_onto_armature(
            &mut commands,
            entity,
            &root_name,
            &skeleton,
            animations,
            playback_rate.0,
            &bone_tags.0,
            stores,
        );
        commands.entity(entity).insert(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::hierarchy::ChildOf;
    use bevy::ecs::system::RunSystemOnce;

    use crate::onim::types::OnimDocument;

    const WALK: &str = "Version 8 2
{
  Frames 2
  Duration 0.5
  Animation
  {
    BoneRotation 0 Spine
    {
      FramesData SingleChannel Static
      {
        0 0 0 1
      }
    }
    ModelPosition 0
    {
      FramesData SingleChannel Static
      {
        0 0 1
      }
    }
  }
}
";

    fn pelvis_transform() -> Transform {
        Transform::from_xyz(0.0, 1.0, 0.0)
    }

    fn spine_transform() -> Transform {
        Transform::from_xyz(0.0, 0.5, 0.0).with_rotation(Quat::from_rotation_z(0.5))
    }

    fn armature(world: &mut World) -> (Entity, Entity, Entity) {
        let root = world
            .spawn((Name::new("Armature"), Transform::from_xyz(0.0, 0.0, 5.0)))
            .id();
        let pelvis = world
            .spawn((Name::new("Pelvis"), pelvis_transform(), ChildOf(root)))
            .id();
        let spine = world
            .spawn((Name::new("Spine"), spine_transform(), ChildOf(pelvis)))
            .id();
        (root, pelvis, spine)
    }

    fn build_skeleton(world: &mut World, root: Entity) -> Skeleton {
        world
            .run_system_once(
                move |children_q: Query<&Children>, bones_q: Query<(&Name, &Transform)>| {
                    skeleton_from_hierarchy(root, &children_q, &bones_q)
                },
            )
            .unwrap()
    }

    #[test]
    fn skeleton_bind_matrices_are_in_root_space() {
        let mut world = World::new();
        let (root, pelvis, spine) = armature(&mut world);

        let skeleton = build_skeleton(&mut world, root);

        assert_eq!(skeleton.len(), 2);
        let pelvis_bone = skeleton.get_bone_by_name("Pelvis").unwrap();
        assert_eq!(pelvis_bone.entity, Some(pelvis));
        assert!(skeleton.get_parent(pelvis_bone.id).is_none());
        assert!(
            pelvis_bone
                .bind_matrix
                .abs_diff_eq(pelvis_transform().compute_matrix(), 1e-6)
        );

        let spine_bone = skeleton.get_bone_by_name("Spine").unwrap();
        assert_eq!(spine_bone.entity, Some(spine));
        assert_eq!(skeleton.get_parent(spine_bone.id).map(|b| b.id), Some(pelvis_bone.id));
        let expected = pelvis_transform().compute_matrix() * spine_transform().compute_matrix();
        assert!(spine_bone.bind_matrix.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn import_tags_targets_and_reports_outcomes() {
        let mut world = World::new();
        let (root, pelvis, spine) = armature(&mut world);
        world.init_resource::<OnimClipLibrary>();
        world.init_resource::<Assets<AnimationClip>>();
        world.init_resource::<Assets<AnimationGraph>>();
        world.init_resource::<Assets<OnimAsset>>();
        let walk = world.resource_mut::<Assets<OnimAsset>>().add(OnimAsset {
            name: "walk.onim".to_string(),
            document: OnimDocument::from_text(WALK).unwrap(),
        });

        let report = world
            .run_system_once(
                move |mut commands: Commands,
                      children_q: Query<&Children>,
                      bones_q: Query<(&Name, &Transform)>,
                      onim_assets: Res<Assets<OnimAsset>>,
                      mut library: ResMut<OnimClipLibrary>,
                      mut clips: ResMut<Assets<AnimationClip>>,
                      mut graphs: ResMut<Assets<AnimationGraph>>| {
                    let skeleton = skeleton_from_hierarchy(root, &children_q, &bones_q);
                    let walk = onim_assets.get(&walk).ok_or_else(String::new);
                    let animations = vec![
                        ("walk.onim".to_string(), walk),
                        ("run.onim".to_string(), Err("failed to load 'run.onim'".to_string())),
                    ];
                    import_onto_armature(
                        &mut commands,
                        root,
                        &Name::new("Armature"),
                        &skeleton,
                        animations,
                        30.0,
                        &BoneTagMap::default(),
                        ClipStores {
                            library: &mut library,
                            clips: &mut clips,
                            graphs: &mut graphs,
                        },
                    )
                },
            )
            .unwrap();

        assert_eq!(report.succeeded().collect::<Vec<_>>(), vec!["walk.onim"]);
        let failed: Vec<&str> = report.failed().map(|(name, _)| name).collect();
        assert_eq!(failed, vec!["run.onim"]);

        let spine_target = world.get::<AnimationTarget>(spine).unwrap();
        assert_eq!(spine_target.id, bone_target_id("Spine"));
        assert_eq!(spine_target.player, root);
        let root_target = world.get::<AnimationTarget>(root).unwrap();
        assert_eq!(root_target.id, AnimationTargetId::from_name(&Name::new("Armature")));
        // Nothing animates the pelvis.
        assert!(world.get::<AnimationTarget>(pelvis).is_none());

        assert!(world.get::<AnimationPlayer>(root).is_some());
        assert!(world.get::<AnimationGraphHandle>(root).is_some());
        let nodes = &world.get::<OnimAnimations>(root).unwrap().nodes;
        assert!(nodes.contains_key("walk.onim"));
        let library = world.resource::<OnimClipLibrary>();
        assert_eq!(library.len(), 1);
        assert!(library.get("walk.onim").is_some());
    }

    #[test]
    fn armature_without_bones_fails_every_animation() {
        let mut world = World::new();
        let root = world.spawn(Name::new("Empty")).id();
        world.init_resource::<OnimClipLibrary>();
        world.init_resource::<Assets<AnimationClip>>();
        world.init_resource::<Assets<AnimationGraph>>();

        let report = world
            .run_system_once(
                move |mut commands: Commands,
                      mut library: ResMut<OnimClipLibrary>,
                      mut clips: ResMut<Assets<AnimationClip>>,
                      mut graphs: ResMut<Assets<AnimationGraph>>| {
                    import_onto_armature(
                        &mut commands,
                        root,
                        &Name::new("Empty"),
                        &Skeleton::new(),
                        vec![("walk.onim".to_string(), Err("unused".to_string()))],
                        30.0,
                        &BoneTagMap::default(),
                        ClipStores {
                            library: &mut library,
                            clips: &mut clips,
                            graphs: &mut graphs,
                        },
                    )
                },
            )
            .unwrap();

        let failed: Vec<(&str, &str)> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].1.contains("no named bones"));
        assert!(world.get::<AnimationPlayer>(root).is_none());
    }
}
