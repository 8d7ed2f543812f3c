//! Error taxonomy for rendering and the post-render hook.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while rendering a greyline composite.
#[derive(Error, Debug)]
pub enum GreylineError {
    /// An input file could not be read or parsed as an image.
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Day, night and mask do not share the same pixel dimensions.
    #[error("{layer} image is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        layer: &'static str,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// The output could not be encoded or written.
    #[error("failed to write {}: {reason}", .path.display())]
    Encode { path: PathBuf, reason: String },

    /// The watermark geometry cannot be applied to the canvas.
    #[error("invalid watermark placement: {reason}")]
    InvalidPlacement { reason: String },

    /// An explicit hour was NaN or infinite.
    #[error("hour must be a finite number, got {0}")]
    InvalidHour(f64),

    /// The desktop background tool could not be launched.
    #[error("{tool} failed: {source}")]
    ExternalHook {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl GreylineError {
    pub(crate) fn placement(reason: impl Into<String>) -> Self {
        Self::InvalidPlacement {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_names_layer_and_sizes() {
        let err = GreylineError::DimensionMismatch {
            layer: "mask",
            expected_width: 4,
            expected_height: 2,
            actual_width: 8,
            actual_height: 2,
        };
        assert_eq!(err.to_string(), "mask image is 8x2, expected 4x2");
    }

    #[test]
    fn encode_error_mentions_path() {
        let err = GreylineError::Encode {
            path: PathBuf::from("out/render.xyz"),
            reason: "unsupported format".to_string(),
        };
        assert!(err.to_string().contains("out/render.xyz"));
        assert!(err.to_string().contains("unsupported format"));
    }
}
