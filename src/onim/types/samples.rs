use crate::onim::error::{ImportError, Result};

/// Frame-major samples of one animated attribute.
///
/// Every frame holds exactly `arity` values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelSamples {
    arity: usize,
    frames: Vec<Vec<f32>>,
}

impl ChannelSamples {
    pub fn new(frames: Vec<Vec<f32>>) -> Result<Self> {
        let arity = frames.first().map(Vec::len).unwrap_or_default();
        if let Some(bad) = frames.iter().find(|f| f.len() != arity) {
            return Err(ImportError::ArityMismatch {
                expected: arity,
                found: bad.len(),
            });
        }
        Ok(Self { arity, frames })
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    /// Fails unless every frame has `expected` components.
    pub fn require_arity(&self, expected: usize) -> Result<()> {
        if self.arity == expected {
            Ok(())
        } else {
            Err(ImportError::ArityMismatch {
                expected,
                found: self.arity,
            })
        }
    }

    /// Repeats a single-frame sequence `count` times. Longer sequences are untouched.
    pub fn broadcast(mut self, count: usize) -> Self {
        if self.frames.len() == 1 && count > 1 {
            let only = self.frames.remove(0);
            self.frames = vec![only; count];
        }
        self
    }
}
