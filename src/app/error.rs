use std::path::PathBuf;

use thiserror::Error;

/// Why a physical device was skipped during selection.
#[derive(Debug, Error)]
#[error("Missing {0}.")]
pub struct SuitabilityError(pub &'static str);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No physical devices were found.")]
    NoPhysicalDevice,
    #[error("Failed to find suitable physical device.")]
    UnsuitablePhysicalDevice,
    #[error("Validation layer requested but not supported.")]
    MissingValidationLayer,
    #[error("Missing {0} queue family.")]
    MissingQueueFamily(&'static str),
    #[error("Surface reports no supported formats.")]
    NoSurfaceFormat,
    #[error("Failed to find suitable memory type.")]
    NoSuitableMemoryType,
    #[error("Shape has no vertices or no indices.")]
    EmptyGeometry,
    #[error("Shape indices are invalid: {0}.")]
    InvalidIndices(String),
    #[error("Failed to load shader `{path}`.")]
    ShaderLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid engine configuration: {0}.")]
    InvalidConfig(&'static str),
}
