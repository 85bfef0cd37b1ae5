// src/onim/bone_tags.rs

use std::collections::HashMap;

use crate::onim::error::Result;
use crate::onim::parser::{Block, Token};
use crate::onim::types::BoneRef;

/// Maps the numeric bone tags used by animation files to host bone names.
#[derive(Debug, Clone, Default)]
pub struct BoneTagMap {
    names: HashMap<i64, String>,
}

impl BoneTagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: i64, name: impl Into<String>) -> Option<String> {
        self.names.insert(tag, name.into())
    }

    pub fn get(&self, tag: i64) -> Option<&str> {
        self.names.get(&tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reads `<tag> <bone name>` records; names may contain spaces.
    pub fn from_block(block: &Block) -> Result<Self> {
        let mut map = Self::new();
        for record in block.records() {
            let Some(Token::Int(tag)) = record.get(0) else {
                return Err(record.invalid("bone tag must be an integer"));
            };
            if record.len() < 2 {
                return Err(record.invalid(format!("bone tag {} has no name", tag)));
            }
            let name = record.tokens[1..]
                .iter()
                .map(Token::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            map.insert(*tag, name);
        }
        Ok(map)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_block(&crate::onim::parser::parse_document(text)?)
    }

    /// Host bone name for a channel's bone reference. Unmapped tags fall back
    /// to their decimal form.
    pub fn resolve(&self, bone: &BoneRef) -> String {
        match bone {
            BoneRef::Tag(tag) => self
                .get(*tag)
                .map(str::to_string)
                .unwrap_or_else(|| tag.to_string()),
            BoneRef::Name(name) => name.clone(),
        }
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for BoneTagMap {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (tag, name) in iter {
            map.insert(tag, name);
        }
        map
    }
}
