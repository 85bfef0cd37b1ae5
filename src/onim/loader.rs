// src/onim/loader.rs
use std::path::{Path, PathBuf};

use bevy::{
    asset::{AssetLoader, LoadContext, io::Reader},
    prelude::*,
};

use crate::onim::error::ImportError;
use crate::onim::import::animation_name;
use crate::onim::types::{OadDocument, OnimDocument};

/// A parsed `.onim` animation, ready to be converted onto a skeleton.
#[derive(Asset, TypePath, Debug)]
pub struct OnimAsset {
    /// File name including the extension; clips are registered under it.
    pub name: String,
    pub document: OnimDocument,
}

/// An `.oad` animation dictionary and the animations it references.
#[derive(Asset, TypePath, Debug)]
pub struct OadAsset {
    /// References as written in the container.
    pub references: Vec<String>,
    /// Asset paths the references resolved to, parallel to `references`.
    pub paths: Vec<PathBuf>,
    #[dependency]
    pub animations: Vec<Handle<OnimAsset>>,
}

async fn read_text(reader: &mut dyn Reader) -> Result<String, ImportError> {
    let mut bytes = Vec::new();
    if let Err(e) = reader.read_to_end(&mut bytes).await {
        error!("Onim loader: Failed to read bytes: {:?}", e);
        return Err(ImportError::Io(e));
    }
    Ok(String::from_utf8(bytes)?)
}

#[derive(Default)]
pub struct OnimAssetLoader;

impl AssetLoader for OnimAssetLoader {
    type Asset = OnimAsset;
    type Settings = ();
    type Error = ImportError;
    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &(),
        load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let path = load_context.path().to_path_buf();
        let text = read_text(reader).await?;
        let document = OnimDocument::from_text(&text)
            .map_err(|e| e.in_file(&path, crate::onim::import::ImportStage::Parsed))?;
        debug!(
            "loaded {}: {} frames, {} entries",
            path.display(),
            document.frames,
            document.entries.len()
        );
        Ok(OnimAsset {
            name: animation_name(&path),
            document,
        })
    }

    fn extensions(&self) -> &[&str] {
        &["onim"]
    }
}

#[derive(Default)]
pub struct OadAssetLoader;

impl AssetLoader for OadAssetLoader {
    type Asset = OadAsset;
    type Settings = ();
    type Error = ImportError;
    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &(),
        load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let path = load_context.path().to_path_buf();
        let text = read_text(reader).await?;
        let container = OadDocument::from_text(&text)
            .map_err(|e| e.in_file(&path, crate::onim::import::ImportStage::Parsed))?;

        // References are relative to the container's own directory.
        let container_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let paths = container.resolved_paths(container_dir);
        let animations = paths
            .iter()
            .map(|p| load_context.load::<OnimAsset>(p.clone()))
            .collect();

        Ok(OadAsset {
            references: container.references,
            paths,
            animations,
        })
    }

    fn extensions(&self) -> &[&str] {
        &["oad"]
    }
}
