// src/onim/parser/mod.rs

pub mod accessor;
pub mod block;
pub mod tokens;

pub use accessor::{Lookup, after, find, find_record, index_of};
pub use block::{Block, Element, Record, parse_document, parse_lines};
pub use tokens::Token;
