use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use bevy_onim::onim::frames;
use bevy_onim::onim::tracks::frame_length;
use bevy_onim::{OadDocument, OnimDocument};

const DUMP_FRAME_RATE: f32 = 30.0;

fn dump_animation(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let document =
        OnimDocument::from_text(&text).with_context(|| format!("parsing {}", path.display()))?;

    println!("{}", path.display());
    println!("  frames:   {}", document.frames);
    println!("  duration: {}s", document.duration);
    match frame_length(document.frames, document.duration, DUMP_FRAME_RATE) {
        Ok(length) => println!("  frame length at {} fps: {}", DUMP_FRAME_RATE, length),
        Err(e) => println!("  frame length: {}", e),
    }
    println!("  animates: {:?}", document.animated_channels());
    for (target, data) in document.channels() {
        match frames::decode(data) {
            Ok(samples) => println!(
                "  {:<24} {} x {}",
                target.to_string(),
                samples.len(),
                samples.arity()
            ),
            Err(e) => println!("  {:<24} undecodable: {}", target.to_string(), e),
        }
    }
    Ok(())
}

fn dump_container(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let container =
        OadDocument::from_text(&text).with_context(|| format!("parsing {}", path.display()))?;

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    println!("{}: {} animations", path.display(), container.references.len());
    for (reference, resolved) in container.references.iter().zip(container.resolved_paths(dir)) {
        let marker = if resolved.is_file() { "" } else { " (missing)" };
        println!("  {} -> {}{}", reference, resolved.display(), marker);
    }
    Ok(())
}

fn main() -> Result<()> {
    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: onim_dump <file.onim | file.oad>");
    };
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("onim") => dump_animation(&path),
        Some("oad") => dump_container(&path),
        _ => bail!("{}: expected an .onim or .oad file", path.display()),
    }
}
