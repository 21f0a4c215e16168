use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template image is empty")]
    EmptyTemplate,

    #[error("Unsupported template format: {0}")]
    UnsupportedImage(String),

    #[error("Failed to decode template: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Invalid page layout: {0}")]
    InvalidLayout(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),
}
