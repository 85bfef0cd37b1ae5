//! Typed views of `.onim` and `.oad` documents.
//!
//! The generic tree from the parser is interpreted here, once, into closed sets
//! of variants. Shapes this crate does not know are rejected or explicitly
//! marked as ignored at this boundary.

use std::fmt;
use std::path::{Path, PathBuf};

use bevy::log::{trace, warn};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::onim::error::{ImportError, Result};
use crate::onim::parser::{Block, Element, Lookup, Record, Token, accessor};

bitflags! {
    /// Which kinds of attribute an animation drives.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
    pub struct AnimatedChannels: u8 {
        const NONE           = 0;
        const BONE_POSITION  = 1 << 0;
        const BONE_ROTATION  = 1 << 1;
        const MODEL_POSITION = 1 << 2;
        const MODEL_ROTATION = 1 << 3;

        const BONES = Self::BONE_POSITION.bits() | Self::BONE_ROTATION.bits();
        const MODEL = Self::MODEL_POSITION.bits() | Self::MODEL_ROTATION.bits();
    }
}

/// How a channel names its bone: GTA IV files use numeric bone tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoneRef {
    Tag(i64),
    Name(String),
}

impl fmt::Display for BoneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoneRef::Tag(tag) => write!(f, "{}", tag),
            BoneRef::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelTarget {
    BonePosition(BoneRef),
    BoneRotation(BoneRef),
    ModelPosition,
    ModelRotation,
}

impl ChannelTarget {
    /// Interprets a target record, or `None` if its key is not a channel kind.
    fn from_record(record: &Record) -> Result<Option<Self>> {
        let target = match record.key() {
            Some("BonePosition") => ChannelTarget::BonePosition(bone_ref(record)?),
            Some("BoneRotation") => ChannelTarget::BoneRotation(bone_ref(record)?),
            Some("ModelPosition") => ChannelTarget::ModelPosition,
            Some("ModelRotation") => ChannelTarget::ModelRotation,
            _ => return Ok(None),
        };
        Ok(Some(target))
    }

    pub fn kind(&self) -> AnimatedChannels {
        match self {
            ChannelTarget::BonePosition(_) => AnimatedChannels::BONE_POSITION,
            ChannelTarget::BoneRotation(_) => AnimatedChannels::BONE_ROTATION,
            ChannelTarget::ModelPosition => AnimatedChannels::MODEL_POSITION,
            ChannelTarget::ModelRotation => AnimatedChannels::MODEL_ROTATION,
        }
    }

    /// Number of values per frame this target expects.
    pub fn arity(&self) -> usize {
        match self {
            ChannelTarget::BonePosition(_) | ChannelTarget::ModelPosition => 3,
            ChannelTarget::BoneRotation(_) | ChannelTarget::ModelRotation => 4,
        }
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTarget::BonePosition(bone) => write!(f, "BonePosition {}", bone),
            ChannelTarget::BoneRotation(bone) => write!(f, "BoneRotation {}", bone),
            ChannelTarget::ModelPosition => f.write_str("ModelPosition"),
            ChannelTarget::ModelRotation => f.write_str("ModelRotation"),
        }
    }
}

// BonePosition <track> <bone>
fn bone_ref(record: &Record) -> Result<BoneRef> {
    match record.get(2) {
        Some(Token::Int(tag)) => Ok(BoneRef::Tag(*tag)),
        Some(Token::Str(name)) => Ok(BoneRef::Name(name.clone())),
        Some(Token::Float(v)) => Err(record.invalid(format!("bone reference {} is not a tag", v))),
        None => Err(record.invalid("channel target has no bone reference")),
    }
}

/// A `FramesData` descriptor and the block it describes, still undecoded.
#[derive(Debug, Clone, PartialEq)]
pub struct FramesData {
    pub descriptor: Record,
    pub data: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationEntry {
    Channel {
        target: ChannelTarget,
        frames: FramesData,
        line: usize,
    },
    /// Sections kept for forward compatibility but not interpreted
    /// (`ActionFlags`, `AudioEvent`, unknown channel kinds).
    Ignored { marker: String, line: usize },
}

/// A parsed `.onim` animation.
#[derive(Debug, Clone, PartialEq)]
pub struct OnimDocument {
    pub frames: u32,
    pub duration: f32,
    pub entries: Vec<AnimationEntry>,
}

impl OnimDocument {
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_root(crate::onim::parser::parse_document(text)?)
    }

    pub fn from_root(root: Block) -> Result<Self> {
        // root[0] is the version block
        let body = body_block(root)?;

        let frames = match accessor::find(&body, "Frames") {
            Some(Lookup::Value(Token::Int(n))) if *n > 0 && *n <= u32::MAX as i64 => *n as u32,
            Some(_) => return Err(invalid_field(&body, "Frames", "a positive integer")),
            None => return Err(ImportError::MissingSection { key: "Frames" }),
        };
        let duration = match accessor::find(&body, "Duration") {
            Some(Lookup::Value(token)) => match token.as_f32() {
                Some(d) if d.is_finite() && d >= 0.0 => d,
                _ => return Err(invalid_field(&body, "Duration", "a non-negative number")),
            },
            Some(Lookup::Tail(_)) => {
                return Err(invalid_field(&body, "Duration", "a single non-negative number"));
            }
            None => return Err(ImportError::MissingSection { key: "Duration" }),
        };

        let animation = take_after(body, "Animation")?;
        let entries = read_entries(animation)?;
        Ok(OnimDocument {
            frames,
            duration,
            entries,
        })
    }

    pub fn channels(&self) -> impl Iterator<Item = (&ChannelTarget, &FramesData)> {
        self.entries.iter().filter_map(|e| match e {
            AnimationEntry::Channel { target, frames, .. } => Some((target, frames)),
            AnimationEntry::Ignored { .. } => None,
        })
    }

    pub fn animated_channels(&self) -> AnimatedChannels {
        self.channels()
            .fold(AnimatedChannels::NONE, |acc, (target, _)| acc | target.kind())
    }
}

fn body_block(root: Block) -> Result<Block> {
    match root.elements.into_iter().nth(1) {
        Some(Element::Block(body)) => Ok(body),
        _ => Err(ImportError::MissingSection { key: "body" }),
    }
}

fn invalid_field(body: &Block, key: &str, expected: &str) -> ImportError {
    let line = accessor::find_record(body, key)
        .map(|r| r.line)
        .unwrap_or(body.line);
    ImportError::InvalidRecord {
        line,
        message: format!("'{}' must be {}", key, expected),
    }
}

fn take_after(body: Block, key: &'static str) -> Result<Block> {
    let Some(index) = accessor::index_of(&body, key) else {
        return Err(ImportError::MissingSection { key });
    };
    match body.elements.into_iter().nth(index + 1) {
        Some(Element::Block(block)) => Ok(block),
        _ => Err(ImportError::MissingSection { key }),
    }
}

fn read_entries(animation: Block) -> Result<Vec<AnimationEntry>> {
    let mut entries = Vec::new();
    let mut elements = animation.elements.into_iter().peekable();

    while let Some(element) = elements.next() {
        let record = match element {
            Element::Record(record) => record,
            Element::Block(block) => {
                trace!("skipping unlabelled block on line {}", block.line);
                continue;
            }
        };

        match ChannelTarget::from_record(&record)? {
            Some(target) => {
                let Some(Element::Block(data_block)) = elements.next() else {
                    return Err(record.invalid(format!("{} has no data block", target)));
                };
                let frames = frames_data(&record, data_block)?;
                entries.push(AnimationEntry::Channel {
                    target,
                    frames,
                    line: record.line,
                });
            }
            None => {
                let marker = record
                    .get(0)
                    .map(Token::to_string)
                    .unwrap_or_default();
                match marker.as_str() {
                    "ActionFlags" | "AudioEvent" => {
                        trace!("ignoring {} section on line {}", marker, record.line)
                    }
                    _ => warn!(
                        "ignoring unknown animation section '{}' on line {}",
                        marker, record.line
                    ),
                }
                // A marker's own block goes with it.
                if matches!(elements.peek(), Some(Element::Block(_))) {
                    elements.next();
                }
                entries.push(AnimationEntry::Ignored {
                    marker,
                    line: record.line,
                });
            }
        }
    }
    Ok(entries)
}

// { FramesData ... \n { ... } }
fn frames_data(target: &Record, block: Block) -> Result<FramesData> {
    let mut parts = block.elements.into_iter();
    match (parts.next(), parts.next()) {
        (Some(Element::Record(descriptor)), Some(Element::Block(data))) => {
            Ok(FramesData { descriptor, data })
        }
        _ => Err(target.invalid("expected a FramesData record followed by its data block")),
    }
}

/// A parsed `.oad` animation dictionary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OadDocument {
    /// Animation references exactly as written in the file.
    pub references: Vec<String>,
}

impl OadDocument {
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_root(crate::onim::parser::parse_document(text)?)
    }

    pub fn from_root(root: Block) -> Result<Self> {
        let body = body_block(root)?;
        let references = body
            .records()
            .filter(|r| r.is_key("crAnimation"))
            .map(|r| {
                r.get(1)
                    .map(Token::to_string)
                    .ok_or_else(|| r.invalid("crAnimation without a path"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(OadDocument { references })
    }

    /// References resolved against the directory holding the container.
    pub fn resolved_paths(&self, container_dir: &Path) -> Vec<PathBuf> {
        self.references
            .iter()
            .map(|r| container_dir.join(normalize_reference(r)))
            .collect()
    }
}

/// Splits a reference on either separator style and rebuilds it natively.
pub fn normalize_reference(reference: &str) -> PathBuf {
    reference
        .split(['/', '\\'])
        .filter(|part| !part.is_empty())
        .collect()
}
