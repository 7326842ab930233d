use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for background removal.
///
/// Every variant renders with the same `Background removal failed:` prefix so callers that
/// only look at the message see a single, recognisable failure marker, while the
/// underlying cause stays reachable through `source()`.
#[derive(Error, Debug)]
pub enum BgRemoveError {
    #[error("Background removal failed: invalid base64 payload: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<base64::DecodeError>,
    },

    #[error("Background removal failed: unsupported or corrupt image: {source}")]
    ImageFormat {
        #[source]
        source: image::ImageError,
    },

    #[error("Background removal failed: segmentation failed: {message}")]
    Segmentation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Background removal failed: {operation} failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Background removal failed: PNG encoding failed: {source}")]
    Encode {
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, BgRemoveError>;

impl BgRemoveError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            source: None,
        }
    }

    pub fn segmentation(message: impl Into<String>) -> Self {
        Self::Segmentation {
            message: message.into(),
            source: None,
        }
    }

    /// モデルの読み込み・推論など、原因となるエラーを持つセグメンテーション失敗
    pub fn segmentation_caused_by(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Segmentation {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn io(path: impl Into<PathBuf>, operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }
}

/// Image helpers report through `anyhow`; at the library boundary those failures belong to
/// the segmentation stage, which is the only caller of the helpers.
impl From<anyhow::Error> for BgRemoveError {
    fn from(err: anyhow::Error) -> Self {
        Self::Segmentation {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}

/// Fallback for I/O errors raised without path context. Code that knows the path should
/// build `BgRemoveError::Io` itself.
impl From<std::io::Error> for BgRemoveError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("unknown"),
            operation: "I/O".to_string(),
            source: err,
        }
    }
}

/// Image crate errors raised while reading bytes are format errors. I/O failures inside the
/// decoder keep their I/O classification.
impl From<image::ImageError> for BgRemoveError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(source) => Self::from(source),
            source => Self::ImageFormat { source },
        }
    }
}

impl From<base64::DecodeError> for BgRemoveError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decode {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// ONNX Runtime failures happen inside the segmentation capability.
impl From<ort::Error> for BgRemoveError {
    fn from(err: ort::Error) -> Self {
        Self::segmentation_caused_by(format!("ort operation: {}", err), err)
    }
}

/// Shape errors only come out of tensor handling around inference.
impl From<ndarray::ShapeError> for BgRemoveError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::segmentation_caused_by(format!("tensor shape conversion: {}", err), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_every_variant_carries_failure_marker() {
        let errors = vec![
            BgRemoveError::decode("empty payload"),
            BgRemoveError::segmentation("model exploded"),
            BgRemoveError::io(
                "in.png",
                "open",
                std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            ),
        ];

        for err in errors {
            assert!(
                err.to_string().starts_with("Background removal failed:"),
                "unexpected message: {}",
                err
            );
        }
    }

    #[test]
    fn test_base64_error_keeps_source() {
        use base64::Engine as _;

        let err = base64::engine::general_purpose::STANDARD
            .decode("@@@@")
            .unwrap_err();
        let err = BgRemoveError::from(err);

        assert!(matches!(err, BgRemoveError::Decode { .. }));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_inference_errors_are_segmentation_errors() {
        let err = ndarray::Array1::<f32>::zeros(3)
            .into_shape_with_order((2, 2))
            .unwrap_err();
        let err = BgRemoveError::from(err);

        assert!(matches!(err, BgRemoveError::Segmentation { .. }));
        assert!(err.to_string().contains("tensor shape conversion"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_image_io_error_maps_to_io_variant() {
        let err = image::ImageError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));

        assert!(matches!(BgRemoveError::from(err), BgRemoveError::Io { .. }));
    }
}
