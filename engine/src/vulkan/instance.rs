use log::*;
use std::collections::HashSet;
use std::ffi::CStr;
use std::os::raw::c_void;
use vulkanalia::prelude::v1_0::*;
use vulkanalia::vk::ExtDebugUtilsExtension;
use vulkanalia::Entry;
use vulkanalia::Instance;

use super::constants;
use crate::config::EngineConfig;
use crate::error::{RenderError, Result};
use crate::window::PlatformWindow;

/// The Vulkan instance together with the extensions it was created with.
#[derive(Debug)]
pub struct VulkanInstance {
    pub vk_instance: Instance,
    pub extensions: Vec<vk::ExtensionName>,
    messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanInstance {
    pub unsafe fn new(
        window: &PlatformWindow,
        entry: &Entry,
        config: &EngineConfig,
    ) -> Result<VulkanInstance> {
        // Application Info
        let application_info = vk::ApplicationInfo::builder()
            .application_name(config.application_name)
            .application_version(vk::make_version(1, 0, 0))
            .engine_name(config.engine_name)
            .engine_version(vk::make_version(1, 0, 0))
            .api_version(vk::make_version(1, 0, 0));

        // Layers
        let available_layers = entry
            .enumerate_instance_layer_properties()?
            .iter()
            .map(|l| l.layer_name)
            .collect::<HashSet<_>>();

        if constants::VALIDATION_ENABLED && !available_layers.contains(&constants::VALIDATION_LAYER)
        {
            return Err(RenderError::ValidationLayerMissing);
        }

        let layers = if constants::VALIDATION_ENABLED {
            vec![constants::VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        let (extensions, flags) = VulkanInstance::extensions(window, entry)?;
        let extension_names = extensions.iter().map(|e| e.as_ptr()).collect::<Vec<_>>();

        // Create
        let mut info = vk::InstanceCreateInfo::builder()
            .application_info(&application_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extension_names)
            .flags(flags);

        // Also covers messages from create_instance and destroy_instance.
        let mut debug_info = messenger_info();

        if constants::VALIDATION_ENABLED {
            info = info.push_next(&mut debug_info);
        }

        let instance = entry.create_instance(&info, None)?;
        info!("Created Vulkan instance with {} extensions.", extensions.len());

        // Messenger
        let messenger = if constants::VALIDATION_ENABLED {
            match instance.create_debug_utils_messenger_ext(&debug_info, None) {
                Ok(messenger) => Some(messenger),
                Err(error) => {
                    instance.destroy_instance(None);
                    return Err(error.into());
                }
            }
        } else {
            None
        };

        Ok(VulkanInstance {
            vk_instance: instance,
            extensions,
            messenger,
        })
    }

    /// What the window needs, plus portability on recent macOS SDKs and
    /// debug utils when validating.
    unsafe fn extensions(
        window: &PlatformWindow,
        entry: &Entry,
    ) -> Result<(Vec<vk::ExtensionName>, vk::InstanceCreateFlags)> {
        for (i, extension) in entry
            .enumerate_instance_extension_properties(None)?
            .iter()
            .enumerate()
        {
            debug!("Available instance extension {}: {}", i + 1, extension.extension_name);
        }

        let mut extensions = window
            .required_extensions()
            .iter()
            .map(|e| **e)
            .collect::<Vec<_>>();

        // Required by Vulkan SDK on macOS since 1.3.216.
        let flags = if cfg!(target_os = "macos")
            && entry.version()? >= constants::PORTABILITY_MACOS_VERSION
        {
            info!("Enabling extensions for macOS portability.");
            extensions.push(vk::KHR_GET_PHYSICAL_DEVICE_PROPERTIES2_EXTENSION.name);
            extensions.push(vk::KHR_PORTABILITY_ENUMERATION_EXTENSION.name);
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        };

        if constants::VALIDATION_ENABLED {
            extensions.push(vk::EXT_DEBUG_UTILS_EXTENSION.name);
        }

        Ok((extensions, flags))
    }

    pub fn destroyer(&self) -> impl FnOnce() + 'static {
        let instance = self.vk_instance.clone();
        move || unsafe { instance.destroy_instance(None) }
    }

    /// Present only when validation is enabled.
    pub fn messenger_destroyer(&self) -> Option<impl FnOnce() + 'static> {
        let instance = self.vk_instance.clone();
        self.messenger.map(|messenger| {
            move || unsafe { instance.destroy_debug_utils_messenger_ext(messenger, None) }
        })
    }
}

fn messenger_info() -> vk::DebugUtilsMessengerCreateInfoEXTBuilder<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(vk::DebugUtilsMessageSeverityFlagsEXT::all())
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .user_callback(Some(debug_callback))
}

extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    type_: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _: *mut c_void,
) -> vk::Bool32 {
    let data = unsafe { *data };
    let message = unsafe { CStr::from_ptr(data.message) }.to_string_lossy();

    if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        error!("({:?}) {}", type_, message);
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        warn!("({:?}) {}", type_, message);
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::INFO {
        debug!("({:?}) {}", type_, message);
    } else {
        trace!("({:?}) {}", type_, message);
    }

    vk::FALSE
}
