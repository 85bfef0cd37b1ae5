// src/onim/parser/accessor.rs

use super::block::{Block, Element, Record};
use super::tokens::Token;

/// What `find` returns for a matching record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// `Key value` records unwrap to their single value.
    Value(&'a Token),
    /// Any other record yields the tokens after the key.
    Tail(&'a [Token]),
}

impl<'a> Lookup<'a> {
    pub fn value(self) -> Option<&'a Token> {
        match self {
            Lookup::Value(token) => Some(token),
            Lookup::Tail(_) => None,
        }
    }

    pub fn tail(self) -> &'a [Token] {
        match self {
            Lookup::Value(token) => std::slice::from_ref(token),
            Lookup::Tail(tokens) => tokens,
        }
    }
}

/// Index of the first record keyed by `key`.
pub fn index_of(block: &Block, key: &str) -> Option<usize> {
    block
        .elements
        .iter()
        .position(|e| matches!(e, Element::Record(r) if r.is_key(key)))
}

/// The first record whose leading token is `key`.
pub fn find_record<'a>(block: &'a Block, key: &str) -> Option<&'a Record> {
    block.records().find(|r| r.is_key(key))
}

pub fn find<'a>(block: &'a Block, key: &str) -> Option<Lookup<'a>> {
    let record = find_record(block, key)?;
    if record.len() == 2 {
        Some(Lookup::Value(&record.tokens[1]))
    } else {
        Some(Lookup::Tail(&record.tokens[1..]))
    }
}

/// The sibling directly following the first record keyed by `key`.
pub fn after<'a>(block: &'a Block, key: &str) -> Option<&'a Element> {
    let index = index_of(block, key)?;
    block.get(index + 1)
}
