//! Error types for GPU buffer operations.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while managing GPU-backed frames.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Texture allocation failed.
    #[error("texture creation failed: {0}")]
    TextureCreation(String),

    /// Mapping a texture for external access failed.
    #[error("resource mapping failed: {0}")]
    Map(String),

    /// Copying between resources failed.
    #[error("resource copy failed: {0}")]
    ResourceCopy(String),

    /// Color conversion or plane readback failed.
    #[error("pixel conversion failed: {0}")]
    Conversion(String),

    /// A fence wait exceeded its budget.
    #[error("GPU sync wait timed out after {0:?}")]
    SyncTimeout(Duration),

    /// The graphics device was lost.
    #[error("graphics device lost")]
    DeviceLost,
}
