//! Codec error types

use thiserror::Error;

/// Raw buffer decode error
///
/// Per-frame: callers drop the frame and keep capturing.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Buffer length is not `width * height * 4`
    #[error("raw buffer has {actual} bytes, expected {expected}")]
    BufferSize {
        /// Expected byte count
        expected: usize,
        /// Received byte count
        actual: usize,
    },

    /// Zero-sized image
    #[error("image has zero extent ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Downscale divisor of zero
    #[error("invalid scale {scale}, must be >= 1")]
    InvalidScale { scale: u32 },

    /// Downscaled image would be empty
    #[error("scale {scale} leaves no pixels of a {width}x{height} image")]
    ScaleTooLarge { width: u32, height: u32, scale: u32 },

    /// Array reshape failure
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Codec Result alias
pub type Result<T> = std::result::Result<T, CodecError>;
