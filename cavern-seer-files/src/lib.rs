use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("The file's magic value does not match the expectation {magic:#010x}")]
    InvalidMagicValue { magic: u32 },

    #[error("The file is violating the expected format, because: {reason}")]
    FormatError { reason: &'static str },

    #[error("Line {line}: {reason}")]
    LineError { line: usize, reason: String },

    /// Represents an empty source, e.g. a wall trace without a single point.
    #[error("Source contains no data")]
    EmptySource,

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    UTF8ConversationError(#[from] std::str::Utf8Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

pub mod common;
pub mod gltf;
pub mod mtl;
pub mod obj;
pub mod wall_trace;
