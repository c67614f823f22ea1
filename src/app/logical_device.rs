use super::app_data;
use super::app_defines;

use anyhow::Result;
use log::*;
use std::collections::HashSet;
use vulkanalia::prelude::v1_2::*;

/// Creates the logical device with dynamic rendering and synchronization2
/// turned on, and fetches the graphics and present queues.
pub unsafe fn create(entry: &Entry, instance: &Instance, data: &mut app_data::Data) -> Result<Device> {
    // Queue Create Infos

    let indices = data.queue_families;

    let mut unique_indices = HashSet::new();
    unique_indices.insert(indices.graphics);
    unique_indices.insert(indices.present);

    let queue_priorities = &[1.0];
    let queue_infos = unique_indices
        .iter()
        .map(|i| {
            vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(*i)
                .queue_priorities(queue_priorities)
        })
        .collect::<Vec<_>>();

    // Layers

    let layers = if app_defines::VALIDATION_ENABLED {
        vec![app_defines::VALIDATION_LAYER.as_ptr()]
    } else {
        vec![]
    };

    // Extensions

    let mut extensions = app_defines::DEVICE_EXTENSIONS.iter().map(|n| n.as_ptr()).collect::<Vec<_>>();

    if cfg!(target_os = "macos") && entry.version()? >= app_defines::PORTABILITY_MACOS_VERSION {
        extensions.push(vk::KHR_PORTABILITY_SUBSET_EXTENSION.name.as_ptr());
    }

    // Features

    let features = vk::PhysicalDeviceFeatures::builder();
    let mut features_13 = vk::PhysicalDeviceVulkan13Features::builder()
        .dynamic_rendering(true)
        .synchronization2(true);

    // Create

    let info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(&queue_infos)
        .enabled_layer_names(&layers)
        .enabled_extension_names(&extensions)
        .enabled_features(&features)
        .push_next(&mut features_13);

    let device = instance.create_device(data.physical_device, &info, None)?;

    // Queues

    data.graphics_queue = device.get_device_queue(indices.graphics, 0);
    data.present_queue = device.get_device_queue(indices.present, 0);

    debug!(
        "Created logical device (graphics family {}, present family {}).",
        indices.graphics, indices.present
    );

    Ok(device)
}
