use bevy::prelude::*;
pub mod onim;
pub mod onim_animation;
use onim::loader::{OadAsset, OadAssetLoader, OnimAsset, OnimAssetLoader};
pub use onim::error::ImportError;
pub use onim::import::{Importer, import_animation_file, import_container_file};
pub use onim::types::*;
use onim_animation::animation_setup_system::import_onim_animations;
use onim_animation::{OnimBoneTags, OnimClipLibrary, OnimPlaybackRate};

/// Loads `.onim` and `.oad` assets and imports them onto armatures marked
/// with [`onim_animation::NeedsOnimImport`].
pub struct OnimPlugin;
impl Plugin for OnimPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<OnimAsset>()
            .init_asset::<OadAsset>()
            .init_asset_loader::<OnimAssetLoader>()
            .init_asset_loader::<OadAssetLoader>()
            .init_resource::<OnimPlaybackRate>()
            .init_resource::<OnimBoneTags>()
            .init_resource::<OnimClipLibrary>()
            .add_systems(Update, import_onim_animations);
    }
}
