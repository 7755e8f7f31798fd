use std::path::PathBuf;

use thiserror::Error;
use vulkanalia::vk;

use crate::vulkan::{ChainError, SuitabilityError};

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Broad classification the frame loop uses to decide what is fatal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Setup failed before the first frame could be drawn.
    Initialization,
    /// A Vulkan call failed while drawing.
    Runtime,
    /// The swapchain no longer matches the surface.
    SwapchainOutOfDate,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to load Vulkan: {0}")]
    Loader(String),

    #[error("Validation layer requested but not supported.")]
    ValidationLayerMissing,

    #[error("Failed to find suitable physical device.")]
    NoSuitableDevice,

    #[error(transparent)]
    Unsuitable(#[from] SuitabilityError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Failed to read shader `{}`: {source}", path.display())]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid shader bytecode `{0}`.")]
    ShaderBytecode(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("Swapchain is out of date.")]
    SwapchainOutOfDate,

    #[error("Vulkan setup failed: {0}")]
    Setup(vk::ErrorCode),

    #[error("Vulkan error: {0}")]
    Vulkan(vk::ErrorCode),
}

impl From<vk::ErrorCode> for RenderError {
    fn from(code: vk::ErrorCode) -> Self {
        match code {
            vk::ErrorCode::OUT_OF_DATE_KHR => RenderError::SwapchainOutOfDate,
            code => RenderError::Vulkan(code),
        }
    }
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::SwapchainOutOfDate => ErrorKind::SwapchainOutOfDate,
            RenderError::Vulkan(_) => ErrorKind::Runtime,
            _ => ErrorKind::Initialization,
        }
    }

    /// Marks a Vulkan failure as having happened while the renderer was
    /// being built rather than while drawing.
    pub fn during_setup(self) -> Self {
        match self {
            RenderError::Vulkan(code) => RenderError::Setup(code),
            error => error,
        }
    }

    /// Only a stale swapchain could be recovered from, by recreating it.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::SwapchainOutOfDate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vulkan::Resource;

    #[test]
    fn out_of_date_code_maps_to_recoverable_error() {
        let error = RenderError::from(vk::ErrorCode::OUT_OF_DATE_KHR);
        assert!(matches!(error, RenderError::SwapchainOutOfDate));
        assert_eq!(error.kind(), ErrorKind::SwapchainOutOfDate);
        assert!(error.is_recoverable());
    }

    #[test]
    fn other_codes_are_not_recoverable() {
        let error = RenderError::from(vk::ErrorCode::DEVICE_LOST);
        assert!(matches!(error, RenderError::Vulkan(vk::ErrorCode::DEVICE_LOST)));
        assert_eq!(error.kind(), ErrorKind::Runtime);
        assert!(!error.is_recoverable());
    }

    #[test]
    fn vulkan_failures_during_setup_are_initialization_errors() {
        let error = RenderError::from(vk::ErrorCode::INITIALIZATION_FAILED).during_setup();
        assert!(matches!(error, RenderError::Setup(vk::ErrorCode::INITIALIZATION_FAILED)));
        assert_eq!(error.kind(), ErrorKind::Initialization);
        assert!(!error.is_recoverable());

        let missing = RenderError::NoSuitableDevice.during_setup();
        assert!(matches!(missing, RenderError::NoSuitableDevice));
    }

    #[test]
    fn setup_failures_are_initialization_errors() {
        assert_eq!(RenderError::NoSuitableDevice.kind(), ErrorKind::Initialization);
        assert_eq!(
            RenderError::from(SuitabilityError("discrete GPU")).kind(),
            ErrorKind::Initialization
        );
        assert_eq!(
            RenderError::ValidationLayerMissing.kind(),
            ErrorKind::Initialization
        );
        assert_eq!(
            RenderError::from(ChainError(Resource::Swapchain)).kind(),
            ErrorKind::Initialization
        );

        let missing = RenderError::ShaderRead {
            path: PathBuf::from("shaders/vert.spv"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(missing.kind(), ErrorKind::Initialization);
        assert!(missing.to_string().contains("shaders/vert.spv"));
    }
}
