use super::app_data;
use super::app_defines;
use super::config::EngineConfig;
use super::error::EngineError;

use anyhow::Result;
use log::*;
use std::collections::HashSet;
use std::ffi::{c_void, CStr, CString};
use vulkanalia::prelude::v1_2::*;
use vulkanalia::vk::ExtDebugUtilsExtension;
use vulkanalia::window as vk_window;
use winit::window::Window;

pub unsafe fn create(window: &Window, entry: &Entry, config: &EngineConfig, data: &mut app_data::Data) -> Result<Instance> {
    // Application Info

    let app_name = CString::new(config.app_name.as_str())?;
    let application_info = vk::ApplicationInfo::builder()
        .application_name(app_name.as_bytes_with_nul())
        .application_version(config.app_version.to_vk())
        .engine_name(app_defines::ENGINE_NAME)
        .engine_version(app_defines::ENGINE_VERSION)
        .api_version(app_defines::MIN_API_VERSION);

    // Layers

    let available_layers = entry
        .enumerate_instance_layer_properties()?
        .iter()
        .map(|l| l.layer_name)
        .collect::<HashSet<_>>();

    if app_defines::VALIDATION_ENABLED && !available_layers.contains(&app_defines::VALIDATION_LAYER) {
        return Err(EngineError::MissingValidationLayer.into());
    }

    let layers = if app_defines::VALIDATION_ENABLED {
        vec![app_defines::VALIDATION_LAYER.as_ptr()]
    } else {
        Vec::new()
    };

    // Extensions

    let mut extensions = vk_window::get_required_instance_extensions(window)
        .iter()
        .map(|e| e.as_ptr())
        .collect::<Vec<_>>();

    if app_defines::VALIDATION_ENABLED {
        extensions.push(vk::EXT_DEBUG_UTILS_EXTENSION.name.as_ptr());
    }

    // Required by Vulkan SDK on macOS since 1.3.216.
    let flags = if cfg!(target_os = "macos") && entry.version()? >= app_defines::PORTABILITY_MACOS_VERSION {
        info!("Enabling extensions for macOS portability.");
        extensions.push(vk::KHR_GET_PHYSICAL_DEVICE_PROPERTIES2_EXTENSION.name.as_ptr());
        extensions.push(vk::KHR_PORTABILITY_ENUMERATION_EXTENSION.name.as_ptr());
        vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
    } else {
        vk::InstanceCreateFlags::empty()
    };

    // Create

    let mut info = vk::InstanceCreateInfo::builder()
        .application_info(&application_info)
        .enabled_layer_names(&layers)
        .enabled_extension_names(&extensions)
        .flags(flags);

    let mut debug_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(vk::DebugUtilsMessageSeverityFlagsEXT::all())
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .user_callback(Some(debug_callback));

    // Also covers messages emitted while creating and destroying the instance.
    if app_defines::VALIDATION_ENABLED {
        info = info.push_next(&mut debug_info);
    }

    let instance = entry.create_instance(&info, None)?;

    if app_defines::VALIDATION_ENABLED {
        data.messenger = match instance.create_debug_utils_messenger_ext(&debug_info, None) {
            Ok(messenger) => messenger,
            Err(e) => {
                instance.destroy_instance(None);
                return Err(e.into());
            }
        };
    }

    info!("Created instance for `{}` {:?}.", config.app_name, config.app_version);

    Ok(instance)
}

/// Log level a validation message is reported at.
fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Level {
    if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        Level::Error
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        Level::Warn
    } else if severity >= vk::DebugUtilsMessageSeverityFlagsEXT::INFO {
        Level::Debug
    } else {
        Level::Trace
    }
}

extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    type_: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _: *mut c_void,
) -> vk::Bool32 {
    let data = unsafe { *data };
    let message = unsafe { CStr::from_ptr(data.message) }.to_string_lossy();

    log!(severity_level(severity), "({:?}) {}", type_, message);

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_severities_map_to_log_levels() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as Severity;

        assert_eq!(severity_level(Severity::ERROR), Level::Error);
        assert_eq!(severity_level(Severity::WARNING), Level::Warn);
        assert_eq!(severity_level(Severity::INFO), Level::Debug);
        assert_eq!(severity_level(Severity::VERBOSE), Level::Trace);
    }
}
