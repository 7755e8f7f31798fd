use log::*;
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::{KhrSurfaceExtension, KhrSwapchainExtension};

use super::device::{QueueFamilyIndices, SuitabilityError, VulkanDevice};
use super::instance::VulkanInstance;
use super::surface::VulkanSurface;
use crate::error::Result;

/// What an adapter can do with the surface.
#[derive(Clone, Debug)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub unsafe fn get(
        instance: &VulkanInstance,
        surface: &VulkanSurface,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let instance = &instance.vk_instance;
        Ok(Self {
            capabilities: instance
                .get_physical_device_surface_capabilities_khr(physical_device, surface.vk_surface)?,
            formats: instance
                .get_physical_device_surface_formats_khr(physical_device, surface.vk_surface)?,
            present_modes: instance.get_physical_device_surface_present_modes_khr(
                physical_device,
                surface.vk_surface,
            )?,
        })
    }

    pub fn check(&self) -> std::result::Result<(), SuitabilityError> {
        if self.formats.is_empty() || self.present_modes.is_empty() {
            Err(SuitabilityError("sufficient swapchain support"))
        } else {
            Ok(())
        }
    }
}

pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .cloned()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .unwrap_or_else(|| formats[0])
}

pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    present_modes
        .iter()
        .cloned()
        .find(|m| *m == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Uses the surface's own extent unless it leaves the choice to us, in which
/// case the window size is clamped into the supported range.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_size: (u32, u32),
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let (width, height) = window_size;
    vk::Extent2D::builder()
        .width(width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ))
        .height(height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ))
        .build()
}

/// One more than the minimum, capped by the maximum when there is one.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count != 0 && image_count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        image_count
    }
}

/// How swapchain images are shared between the graphics and present queues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSharing {
    pub mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
}

impl ImageSharing {
    pub fn for_families(indices: QueueFamilyIndices) -> Self {
        if indices.graphics != indices.present {
            Self {
                mode: vk::SharingMode::CONCURRENT,
                queue_family_indices: vec![indices.graphics, indices.present],
            }
        } else {
            Self {
                mode: vk::SharingMode::EXCLUSIVE,
                queue_family_indices: Vec::new(),
            }
        }
    }
}

/// The swapchain parameters negotiated with an adapter.
#[derive(Clone, Debug)]
pub struct SwapchainSettings {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub sharing: ImageSharing,
}

impl SwapchainSettings {
    pub fn negotiate(
        support: &SwapchainSupport,
        indices: QueueFamilyIndices,
        window_size: (u32, u32),
    ) -> Self {
        Self {
            surface_format: choose_surface_format(&support.formats),
            present_mode: choose_present_mode(&support.present_modes),
            extent: choose_extent(&support.capabilities, window_size),
            image_count: choose_image_count(&support.capabilities),
            pre_transform: support.capabilities.current_transform,
            sharing: ImageSharing::for_families(indices),
        }
    }

    pub fn create_info(&self, surface: vk::SurfaceKHR) -> vk::SwapchainCreateInfoKHRBuilder<'_> {
        vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(self.image_count)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(self.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(self.sharing.mode)
            .queue_family_indices(&self.sharing.queue_family_indices)
            .pre_transform(self.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null())
    }
}

/// The ring of presentable images.
#[derive(Debug)]
pub struct VulkanSwapchain {
    pub vk_swapchain: vk::SwapchainKHR,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
}

impl VulkanSwapchain {
    pub unsafe fn create(
        window_size: (u32, u32),
        surface: &VulkanSurface,
        device: &VulkanDevice,
    ) -> Result<VulkanSwapchain> {
        let selection = &device.selection;
        let settings =
            SwapchainSettings::negotiate(&selection.support, selection.indices, window_size);

        let info = settings.create_info(surface.vk_surface);
        let vk_swapchain = device.vk_device.create_swapchain_khr(&info, None)?;
        let images = device.vk_device.get_swapchain_images_khr(vk_swapchain)?;

        info!(
            "Created swapchain ({:?}, {:?}, {}x{}, {} images, {:?} sharing).",
            settings.surface_format.format,
            settings.present_mode,
            settings.extent.width,
            settings.extent.height,
            images.len(),
            settings.sharing.mode,
        );

        Ok(VulkanSwapchain {
            vk_swapchain,
            format: settings.surface_format.format,
            extent: settings.extent,
            images,
        })
    }

    pub fn destroyer(&self, device: &VulkanDevice) -> impl FnOnce() + 'static {
        let (device, swapchain) = (device.vk_device.clone(), self.vk_swapchain);
        move || unsafe { device.destroy_swapchain_khr(swapchain, None) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    #[test]
    fn prefers_bgra_srgb_format() {
        let preferred = format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR);
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            preferred,
        ];
        assert_eq!(choose_surface_format(&formats), preferred);
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ];
        assert_eq!(choose_surface_format(&formats), formats[0]);
    }

    #[test]
    fn prefers_mailbox_present_mode() {
        let modes = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
        ];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn falls_back_to_fifo() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn image_count_is_min_plus_one_within_max() {
        assert_eq!(choose_image_count(&capabilities(1, 0)), 2);
        assert_eq!(choose_image_count(&capabilities(2, 2)), 2);
        assert_eq!(choose_image_count(&capabilities(1, 8)), 2);
        assert_eq!(choose_image_count(&capabilities(3, 0)), 4);
    }

    #[test]
    fn extent_is_clamped_when_surface_leaves_it_open() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        };

        let extent = choose_extent(&capabilities, (8000, 10));
        assert_eq!((extent.width, extent.height), (4096, 10));

        let extent = choose_extent(&capabilities, (8000, 0));
        assert_eq!((extent.width, extent.height), (4096, 1));
    }

    #[test]
    fn extent_uses_current_extent_verbatim() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 720,
                height: 560,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 100,
                height: 100,
            },
            ..Default::default()
        };

        let extent = choose_extent(&capabilities, (1920, 1080));
        assert_eq!((extent.width, extent.height), (720, 560));
    }

    #[test]
    fn distinct_families_share_images_concurrently() {
        let sharing = ImageSharing::for_families(QueueFamilyIndices {
            graphics: 0,
            present: 2,
        });
        assert_eq!(sharing.mode, vk::SharingMode::CONCURRENT);
        assert_eq!(sharing.queue_family_indices, vec![0, 2]);
    }

    #[test]
    fn same_family_owns_images_exclusively() {
        let sharing = ImageSharing::for_families(QueueFamilyIndices {
            graphics: 1,
            present: 1,
        });
        assert_eq!(sharing.mode, vk::SharingMode::EXCLUSIVE);
        assert!(sharing.queue_family_indices.is_empty());
    }

    fn support() -> SwapchainSupport {
        SwapchainSupport {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 3,
                current_extent: vk::Extent2D {
                    width: 720,
                    height: 560,
                },
                ..Default::default()
            },
            formats: vec![format(
                vk::Format::B8G8R8A8_SRGB,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        }
    }

    #[test]
    fn create_info_lists_both_families_for_concurrent_sharing() {
        let indices = QueueFamilyIndices {
            graphics: 0,
            present: 1,
        };
        let settings = SwapchainSettings::negotiate(&support(), indices, (720, 560));
        let info = settings.create_info(vk::SurfaceKHR::null());

        assert_eq!(info.image_sharing_mode, vk::SharingMode::CONCURRENT);
        assert_eq!(info.queue_family_index_count, 2);
        assert_eq!(info.min_image_count, 3);
        assert_eq!(info.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(info.image_format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn create_info_lists_no_families_for_exclusive_sharing() {
        let indices = QueueFamilyIndices {
            graphics: 0,
            present: 0,
        };
        let settings = SwapchainSettings::negotiate(&support(), indices, (720, 560));
        let info = settings.create_info(vk::SurfaceKHR::null());

        assert_eq!(info.image_sharing_mode, vk::SharingMode::EXCLUSIVE);
        assert_eq!(info.queue_family_index_count, 0);
    }

    #[test]
    fn empty_support_is_unsuitable() {
        let mut support = support();
        assert!(support.check().is_ok());

        support.present_modes.clear();
        assert!(support.check().is_err());
    }
}
