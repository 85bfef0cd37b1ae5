// src/onim/frames.rs

use crate::onim::error::{ImportError, Result};
use crate::onim::parser::{Block, Element, Record, Token};
use crate::onim::types::{ChannelSamples, FramesData};

/// The `FramesData` layouts this decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramesFormat {
    /// `FramesData SingleChannel Static`: one record holding the whole tuple.
    SingleChannelStatic,
    /// `FramesData MultiChannel`: one labelled block of samples per component.
    MultiChannel,
}

impl FramesFormat {
    pub fn from_descriptor(descriptor: &Record) -> Result<Self> {
        let words: Vec<Option<&str>> = descriptor.tokens.iter().map(Token::as_str).collect();
        match words.as_slice() {
            [Some("FramesData"), Some("SingleChannel"), Some("Static")] => {
                Ok(FramesFormat::SingleChannelStatic)
            }
            [Some("FramesData"), Some("MultiChannel"), ..] => Ok(FramesFormat::MultiChannel),
            _ => Err(ImportError::UnknownFrameFormat {
                line: descriptor.line,
                descriptor: describe(descriptor),
            }),
        }
    }
}

fn describe(record: &Record) -> String {
    record
        .tokens
        .iter()
        .map(Token::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn decode(frames: &FramesData) -> Result<ChannelSamples> {
    decode_frames(&frames.descriptor, &frames.data)
}

/// Decodes one channel's data block into frame-major samples.
pub fn decode_frames(descriptor: &Record, data: &Block) -> Result<ChannelSamples> {
    match FramesFormat::from_descriptor(descriptor)? {
        FramesFormat::SingleChannelStatic => {
            let Some(Element::Record(values)) = data.get(0) else {
                return Err(descriptor.invalid("static frame data has no value record"));
            };
            ChannelSamples::new(vec![numbers(values)?])
        }
        FramesFormat::MultiChannel => decode_multi_channel(descriptor, data),
    }
}

fn numbers(record: &Record) -> Result<Vec<f32>> {
    record
        .tokens
        .iter()
        .map(|t| {
            t.as_f32()
                .ok_or_else(|| record.invalid(format!("'{}' is not a number", t)))
        })
        .collect()
}

fn decode_multi_channel(descriptor: &Record, data: &Block) -> Result<ChannelSamples> {
    // Label records sit at even indices, sample blocks at odd ones.
    let mut channels = data
        .iter()
        .skip(1)
        .step_by(2)
        .map(|element| match element {
            Element::Block(block) => channel_values(block),
            Element::Record(record) => Err(record.invalid("expected a channel sample block")),
        })
        .collect::<Result<Vec<Vec<f32>>>>()?;

    if channels.is_empty() {
        return Err(descriptor.invalid("MultiChannel frame data has no channels"));
    }

    // Length 1 means constant for the whole animation.
    let count = channels.iter().map(Vec::len).max().unwrap_or_default();
    for channel in channels.iter_mut() {
        if channel.len() == 1 {
            let value = channel[0];
            channel.resize(count, value);
        }
    }
    if channels.iter().any(|c| c.len() != count) {
        return Err(ImportError::ChannelLengthMismatch {
            lengths: channels.iter().map(Vec::len).collect(),
        });
    }

    let frames = (0..count)
        .map(|i| channels.iter().map(|channel| channel[i]).collect())
        .collect();
    ChannelSamples::new(frames)
}

// Each sample is the first token of its own record.
fn channel_values(block: &Block) -> Result<Vec<f32>> {
    block
        .iter()
        .map(|element| {
            let Element::Record(record) = element else {
                return Err(ImportError::InvalidRecord {
                    line: block.line,
                    message: "nested block inside channel samples".to_string(),
                });
            };
            record
                .get(0)
                .and_then(Token::as_f32)
                .ok_or_else(|| record.invalid("channel sample is not a number"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onim::parser::parse_document;

    /// Parses `descriptor` followed by a `{ body }` block.
    fn frames(descriptor: &str, body: &str) -> (Record, Block) {
        let text = format!("{}\n{{\n{}\n}}\n", descriptor, body);
        let root = parse_document(&text).unwrap();
        let record = root.get(0).and_then(Element::as_record).cloned().unwrap();
        let block = root.get(1).and_then(Element::as_block).cloned().unwrap();
        (record, block)
    }

    fn channel(values: &[&str]) -> String {
        format!("channel\n{{\n{}\n}}", values.join("\n"))
    }

    #[test]
    fn single_static_is_one_frame() {
        let (d, b) = frames("FramesData SingleChannel Static", "0.5 1 -2.25");
        let samples = decode_frames(&d, &b).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples.frame(0), Some(&[0.5, 1.0, -2.25][..]));
    }

    #[test]
    fn multi_channel_broadcasts_static_channels() {
        let body = [
            channel(&["7"]),
            channel(&["0", "1", "2", "3", "4"]),
            channel(&["-1.5"]),
        ]
        .join("\n");
        let (d, b) = frames("FramesData MultiChannel", &body);
        let samples = decode_frames(&d, &b).unwrap();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples.arity(), 3);
        for (i, frame) in samples.frames().iter().enumerate() {
            assert_eq!(frame, &vec![7.0, i as f32, -1.5]);
        }
    }

    #[test]
    fn mismatched_channels_fail() {
        let body = [
            channel(&["0", "1", "2", "3", "4"]),
            channel(&["0", "1", "2", "3"]),
        ]
        .join("\n");
        let (d, b) = frames("FramesData MultiChannel", &body);
        let err = decode_frames(&d, &b).unwrap_err();
        match err {
            ImportError::ChannelLengthMismatch { lengths } => assert_eq!(lengths, vec![5, 4]),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_descriptor_is_rejected() {
        let (d, b) = frames("FramesData SingleChannel Compressed", "1 2 3");
        let err = decode_frames(&d, &b).unwrap_err();
        assert!(matches!(err, ImportError::UnknownFrameFormat { line: 1, .. }));
    }

    #[test]
    fn non_numeric_samples_are_invalid() {
        let (d, b) = frames("FramesData MultiChannel", &channel(&["1", "oops"]));
        assert!(matches!(
            decode_frames(&d, &b).unwrap_err(),
            ImportError::InvalidRecord { .. }
        ));
    }

    #[test]
    fn empty_multi_channel_is_invalid() {
        let (d, b) = frames("FramesData MultiChannel", "");
        assert!(decode_frames(&d, &b).is_err());
    }
}
