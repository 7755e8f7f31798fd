use log::*;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use vulkanalia::{
    vk::{self, DeviceV1_0, HasBuilder, InstanceV1_0, KhrSurfaceExtension},
    Device, Entry,
};

use super::{
    constants, instance::VulkanInstance, surface::VulkanSurface, swapchain::SwapchainSupport,
};
use crate::error::{RenderError, Result};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Missing {0}.")]
pub struct SuitabilityError(pub &'static str);

/// The adapter chosen for rendering and what it supports.
#[derive(Clone, Debug)]
pub struct DeviceSelection {
    pub physical_device: vk::PhysicalDevice,
    pub indices: QueueFamilyIndices,
    pub support: SwapchainSupport,
}

#[derive(Debug)]
pub struct VulkanDevice {
    pub vk_device: Device,
    pub selection: DeviceSelection,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

impl VulkanDevice {
    unsafe fn pick_physical_device(
        instance: &VulkanInstance,
        surface: &VulkanSurface,
    ) -> Result<DeviceSelection> {
        let physical_devices = instance.vk_instance.enumerate_physical_devices()?;
        first_suitable(
            &physical_devices,
            |physical_device| {
                instance
                    .vk_instance
                    .get_physical_device_properties(physical_device)
                    .device_name
                    .to_string()
            },
            |physical_device| VulkanDevice::check_physical_device(instance, surface, physical_device),
        )
    }

    unsafe fn check_physical_device(
        instance: &VulkanInstance,
        surface: &VulkanSurface,
        physical_device: vk::PhysicalDevice,
    ) -> Result<DeviceSelection> {
        let properties = instance
            .vk_instance
            .get_physical_device_properties(physical_device);
        let features = instance
            .vk_instance
            .get_physical_device_features(physical_device);
        check_properties(&properties, &features)?;

        let indices = QueueFamilyIndices::get(instance, surface, physical_device)?;

        let extensions = instance
            .vk_instance
            .enumerate_device_extension_properties(physical_device, None)?;
        check_extensions(&extensions)?;

        let support = SwapchainSupport::get(instance, surface, physical_device)?;
        support.check()?;

        Ok(DeviceSelection {
            physical_device,
            indices,
            support,
        })
    }

    pub unsafe fn new(
        entry: &Entry,
        instance: &VulkanInstance,
        surface: &VulkanSurface,
    ) -> Result<VulkanDevice> {
        let selection = VulkanDevice::pick_physical_device(instance, surface)?;
        let indices = selection.indices;

        let queue_priorities = &[1.0];
        let queue_infos = indices
            .unique()
            .into_iter()
            .map(|i| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(i)
                    .queue_priorities(queue_priorities)
            })
            .collect::<Vec<_>>();

        let layers = if constants::VALIDATION_ENABLED {
            vec![constants::VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let mut extensions = constants::DEVICE_EXTENSIONS
            .iter()
            .map(|n| n.as_ptr())
            .collect::<Vec<_>>();

        // Required by Vulkan SDK on macOS since 1.3.216.
        if cfg!(target_os = "macos") && entry.version()? >= constants::PORTABILITY_MACOS_VERSION {
            extensions.push(vk::KHR_PORTABILITY_SUBSET_EXTENSION.name.as_ptr());
        }

        let features = vk::PhysicalDeviceFeatures::builder();

        let info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = instance
            .vk_instance
            .create_device(selection.physical_device, &info, None)?;

        let graphics_queue = device.get_device_queue(indices.graphics, 0);
        let present_queue = device.get_device_queue(indices.present, 0);

        info!(
            "Created logical device (graphics family {}, present family {}).",
            indices.graphics, indices.present
        );

        Ok(VulkanDevice {
            vk_device: device,
            selection,
            graphics_queue,
            present_queue,
        })
    }

    pub unsafe fn wait_idle(&self) -> Result<()> {
        self.vk_device.device_wait_idle()?;
        Ok(())
    }

    pub fn destroyer(&self) -> impl FnOnce() + 'static {
        let device = self.vk_device.clone();
        move || unsafe { device.destroy_device(None) }
    }
}

/// The first device `check` accepts. A device whose check fails for any
/// reason, including a failed query, is skipped.
pub fn first_suitable<D, T, N, C>(
    devices: &[D],
    mut name: N,
    mut check: C,
) -> Result<T>
where
    D: Copy,
    N: FnMut(D) -> String,
    C: FnMut(D) -> Result<T>,
{
    for device in devices.iter().copied() {
        match check(device) {
            Ok(selection) => {
                info!("Selected physical device (`{}`).", name(device));
                return Ok(selection);
            }
            Err(RenderError::Unsuitable(error)) => {
                warn!("Skipping physical device (`{}`): {}", name(device), error);
            }
            Err(error) => {
                warn!("Skipping physical device (`{}`), query failed: {}", name(device), error);
            }
        }
    }
    Err(RenderError::NoSuitableDevice)
}

/// Only discrete GPUs with geometry shader support are considered.
pub fn check_properties(
    properties: &vk::PhysicalDeviceProperties,
    features: &vk::PhysicalDeviceFeatures,
) -> std::result::Result<(), SuitabilityError> {
    if properties.device_type != vk::PhysicalDeviceType::DISCRETE_GPU {
        return Err(SuitabilityError("discrete GPU"));
    }
    if features.geometry_shader != vk::TRUE {
        return Err(SuitabilityError("geometry shader support"));
    }
    Ok(())
}

pub fn check_extensions(
    available: &[vk::ExtensionProperties],
) -> std::result::Result<(), SuitabilityError> {
    let available = available
        .iter()
        .map(|e| e.extension_name)
        .collect::<HashSet<_>>();

    if constants::DEVICE_EXTENSIONS
        .iter()
        .all(|e| available.contains(e))
    {
        Ok(())
    } else {
        Err(SuitabilityError("required device extensions"))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    unsafe fn get(
        instance: &VulkanInstance,
        surface: &VulkanSurface,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Self> {
        let properties = instance
            .vk_instance
            .get_physical_device_queue_family_properties(physical_device);

        QueueFamilyIndices::find(&properties, |index| {
            Ok(instance.vk_instance.get_physical_device_surface_support_khr(
                physical_device,
                index,
                surface.vk_surface,
            )?)
        })
    }

    /// The first graphics family and the first family that can present,
    /// searched independently.
    pub fn find<F>(properties: &[vk::QueueFamilyProperties], mut supports_present: F) -> Result<Self>
    where
        F: FnMut(u32) -> Result<bool>,
    {
        let graphics = properties
            .iter()
            .position(|p| p.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|i| i as u32);

        let mut present = None;
        for index in 0..properties.len() as u32 {
            if supports_present(index)? {
                present = Some(index);
                break;
            }
        }

        match (graphics, present) {
            (Some(graphics), Some(present)) => Ok(Self { graphics, present }),
            (None, _) => Err(SuitabilityError("graphics queue family").into()),
            (_, None) => Err(SuitabilityError("present queue family").into()),
        }
    }

    /// The distinct families a queue must be created for.
    pub fn unique(&self) -> Vec<u32> {
        [self.graphics, self.present]
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
