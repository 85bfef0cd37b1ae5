// src/onim/parser/block.rs

use bevy::log::trace;

use super::tokens::Token;
use crate::onim::error::{ImportError, Result};

/// One non-brace line of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub tokens: Vec<Token>,
    /// 1-based source line, kept for diagnostics.
    pub line: usize,
}

impl Record {
    pub fn key(&self) -> Option<&str> {
        self.tokens.first().and_then(Token::as_str)
    }

    pub fn is_key(&self, key: &str) -> bool {
        self.key() == Some(key)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn invalid(&self, message: impl Into<String>) -> ImportError {
        ImportError::InvalidRecord {
            line: self.line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Record(Record),
    Block(Block),
}

impl Element {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Element::Record(r) => Some(r),
            Element::Block(_) => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Element::Block(b) => Some(b),
            Element::Record(_) => None,
        }
    }
}

/// A `{ ... }` region. Blocks are unnamed; the record before one gives it meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub elements: Vec<Element>,
    /// Line of the opening brace, 0 for the root.
    pub line: usize,
}

impl Block {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.elements.iter().filter_map(Element::as_record)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.elements.iter().filter_map(Element::as_block)
    }

    /// Nesting depth of every block in document order, the root being 0.
    pub fn depths(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_depths(0, &mut out);
        out
    }

    fn collect_depths(&self, depth: usize, out: &mut Vec<usize>) {
        out.push(depth);
        for block in self.blocks() {
            block.collect_depths(depth + 1, out);
        }
    }
}

/// Parses brace-delimited text into its root block.
///
/// Every opened block is owned by the stack until its closing brace moves it
/// into its parent, so the finished tree has exactly one owner per block.
pub fn parse_document(text: &str) -> Result<Block> {
    parse_lines(text.lines())
}

pub fn parse_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Block> {
    let mut stack: Vec<Block> = vec![Block::default()];

    for (index, raw) in lines.into_iter().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "{" => stack.push(Block {
                elements: Vec::new(),
                line: line_no,
            }),
            "}" => {
                if stack.len() == 1 {
                    return Err(ImportError::UnexpectedClose { line: line_no });
                }
                let Some(closed) = stack.pop() else {
                    return Err(ImportError::UnexpectedClose { line: line_no });
                };
                current(&mut stack).elements.push(Element::Block(closed));
            }
            _ => {
                let tokens = line
                    .split(' ')
                    .filter(|word| !word.is_empty())
                    .map(Token::parse)
                    .collect();
                current(&mut stack).elements.push(Element::Record(Record {
                    tokens,
                    line: line_no,
                }));
            }
        }
    }

    if stack.len() != 1 {
        let line = stack.last().map(|b| b.line).unwrap_or_default();
        return Err(ImportError::MismatchedBrace { line });
    }
    let root = stack.pop().unwrap_or_default();
    trace!("parsed document with {} top-level elements", root.len());
    Ok(root)
}

fn current(stack: &mut [Block]) -> &mut Block {
    // The root is pushed first and never popped while lines remain.
    let last = stack.len() - 1;
    &mut stack[last]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Version 8 2
{
  Foo Bar 1
  Baz

  {
    1.2 3.4
  }
}
";

    #[test]
    fn builds_nested_tree_in_order() {
        let root = parse_document(SAMPLE).unwrap();
        assert_eq!(root.len(), 2);

        let version = root.get(0).and_then(Element::as_record).unwrap();
        assert_eq!(
            version.tokens,
            vec![Token::Str("Version".into()), Token::Int(8), Token::Int(2)]
        );

        let body = root.get(1).and_then(Element::as_block).unwrap();
        assert_eq!(body.len(), 3);
        assert!(body.get(0).and_then(Element::as_record).unwrap().is_key("Foo"));
        assert!(body.get(1).and_then(Element::as_record).unwrap().is_key("Baz"));
        let inner = body.get(2).and_then(Element::as_block).unwrap();
        let values = &inner.get(0).and_then(Element::as_record).unwrap().tokens;
        assert_eq!(values, &vec![Token::Float(1.2), Token::Float(3.4)]);
    }

    #[test]
    fn records_keep_source_lines() {
        let root = parse_document(SAMPLE).unwrap();
        let body = root.get(1).and_then(Element::as_block).unwrap();
        assert_eq!(body.line, 2);
        assert_eq!(body.get(1).and_then(Element::as_record).unwrap().line, 4);
    }

    #[test]
    fn depth_sequence_follows_braces() {
        let text = "a\n{\n{\n}\nb\n{\n{\nc\n}\n}\n}\n{\n}\n";
        let root = parse_document(text).unwrap();
        assert_eq!(root.depths(), vec![0, 1, 2, 2, 3, 1]);
    }

    #[test]
    fn unclosed_block_is_mismatched() {
        let err = parse_document("Version 1\n{\n  a 1\n  {\n  }\n").unwrap_err();
        assert!(matches!(err, ImportError::MismatchedBrace { line: 2 }));
    }

    #[test]
    fn close_at_root_is_unexpected() {
        let err = parse_document("{\n}\n}\n").unwrap_err();
        assert!(matches!(err, ImportError::UnexpectedClose { line: 3 }));
    }

    #[test]
    fn blank_and_padded_lines_are_tolerated() {
        let root = parse_document("\n   \n  {  \n\t x  2 \n}\n").unwrap();
        let block = root.get(0).and_then(Element::as_block).unwrap();
        let rec = block.get(0).and_then(Element::as_record).unwrap();
        assert_eq!(rec.tokens, vec![Token::Str("x".into()), Token::Int(2)]);
    }
}
