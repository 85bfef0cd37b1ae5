use std::path::PathBuf;
use std::string::FromUtf8Error;

use thiserror::Error;

use super::import::ImportStage;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF8 Error: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("mismatched braces: block opened on line {line} is never closed")]
    MismatchedBrace { line: usize },

    #[error("unexpected '}}' on line {line} with no open block")]
    UnexpectedClose { line: usize },

    #[error("unknown FramesData format on line {line}: {descriptor}")]
    UnknownFrameFormat { line: usize, descriptor: String },

    #[error("channel lengths disagree after broadcasting static channels: {lengths:?}")]
    ChannelLengthMismatch { lengths: Vec<usize> },

    #[error("bone '{0}' is not part of the target skeleton")]
    MissingBone(String),

    #[error("unsupported import target: {0}")]
    UnsupportedTarget(String),

    #[error("missing required section '{key}'")]
    MissingSection { key: &'static str },

    #[error("invalid record on line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    #[error("expected {expected}-component samples, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("cannot time {frames} frames over {duration}s at {frame_rate} fps")]
    InvalidTiming {
        frames: u32,
        duration: f32,
        frame_rate: f32,
    },

    #[error("unsupported file type: {}", .0.display())]
    UnsupportedFileType(PathBuf),

    #[error("{}: {stage} failed: {source}", .path.display())]
    InFile {
        path: PathBuf,
        stage: ImportStage,
        #[source]
        source: Box<ImportError>,
    },
}

impl ImportError {
    /// Attaches the file and pipeline stage an error came from.
    pub fn in_file(self, path: impl Into<PathBuf>, stage: ImportStage) -> Self {
        ImportError::InFile {
            path: path.into(),
            stage,
            source: Box::new(self),
        }
    }

    /// The underlying error kind, looking through file context.
    pub fn root_cause(&self) -> &ImportError {
        match self {
            ImportError::InFile { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

// Define a crate-wide Result type alias
pub type Result<T> = std::result::Result<T, ImportError>;
