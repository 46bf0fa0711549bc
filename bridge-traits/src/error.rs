use thiserror::Error;

use crate::renderer::RendererError;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Renderer error: {0}")]
    Renderer(#[from] RendererError),
}

impl BridgeError {
    /// Returns the renderer error carried by this value, if any.
    pub fn as_renderer_error(&self) -> Option<&RendererError> {
        match self {
            BridgeError::Renderer(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
